use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchbook_core::repository::BookingRepository;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_uuid(value: &Value, field: &str) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
    let raw = value[field]
        .as_str()
        .ok_or_else(|| format!("Missing {}", field))?;
    Ok(Uuid::parse_str(raw)?)
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn save_housing_request(
        &self,
        request: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = parse_uuid(request, "id")?;

        sqlx::query(
            r#"
            INSERT INTO housing_requests
                (id, trip_id, listing_id, renter_user_id, host_user_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(parse_uuid(request, "trip_id")?)
        .bind(parse_uuid(request, "listing_id")?)
        .bind(request["renter_user_id"].as_str().ok_or("Missing renter_user_id")?)
        .bind(request["host_user_id"].as_str().ok_or("Missing host_user_id")?)
        .bind(request["status"].as_str().unwrap_or("PENDING"))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_request_status(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("UPDATE housing_requests SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_match(
        &self,
        booking_match: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = parse_uuid(booking_match, "id")?;

        // The unique constraint on housing_request_id backs the
        // one-match-per-request invariant even if the in-memory guard is
        // bypassed.
        sqlx::query(
            r#"
            INSERT INTO matches
                (id, housing_request_id, trip_id, listing_id, monthly_rent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(parse_uuid(booking_match, "housing_request_id")?)
        .bind(parse_uuid(booking_match, "trip_id")?)
        .bind(parse_uuid(booking_match, "listing_id")?)
        .bind(booking_match["monthly_rent"].as_i64().unwrap_or(0) as i32)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn record_signature(
        &self,
        match_id: Uuid,
        party: &str,
        signed_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let column = match party {
            "landlord" => "landlord_signed_at",
            "tenant" => "tenant_signed_at",
            other => return Err(format!("Unknown signature party: {}", other).into()),
        };

        let sql = format!(
            "UPDATE matches SET {} = $1, updated_at = NOW() WHERE id = $2 AND {} IS NULL",
            column, column
        );
        sqlx::query(&sql)
            .bind(signed_at)
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_payment_authorized(
        &self,
        match_id: Uuid,
        authorization_id: &str,
        authorized_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            UPDATE matches
            SET payment_authorized_at = $1, payment_authorization_id = $2, updated_at = NOW()
            WHERE id = $3 AND payment_authorized_at IS NULL
            "#,
        )
        .bind(authorized_at)
        .bind(authorization_id)
        .bind(match_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_booking(
        &self,
        booking: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = parse_uuid(booking, "id")?;

        // match_id is unique: a replayed authorization cannot insert a
        // second booking row.
        sqlx::query(
            r#"
            INSERT INTO bookings (id, match_id, trip_id, listing_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(parse_uuid(booking, "match_id")?)
        .bind(parse_uuid(booking, "trip_id")?)
        .bind(parse_uuid(booking, "listing_id")?)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }
}
