use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchbook_core::repository::SessionRepository;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Durable mirror of the guest-session state. The re-parenting step runs in
/// a single Postgres transaction so no reader sees a half-migrated session.
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
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

fn parse_timestamp(
    value: &Value,
    field: &str,
) -> Result<DateTime<Utc>, Box<dyn std::error::Error + Send + Sync>> {
    let raw = value[field]
        .as_str()
        .ok_or_else(|| format!("Missing {}", field))?;
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn save_session(
        &self,
        session: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = parse_uuid(session, "id")?;
        let location_string = session["location_string"]
            .as_str()
            .ok_or("Missing location_string")?;

        sqlx::query(
            r#"
            INSERT INTO guest_sessions
                (id, location_string, latitude, longitude, num_adults, num_children, num_pets, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(location_string)
        .bind(session["latitude"].as_f64().unwrap_or(0.0))
        .bind(session["longitude"].as_f64().unwrap_or(0.0))
        .bind(session["num_adults"].as_i64().unwrap_or(0) as i32)
        .bind(session["num_children"].as_i64().unwrap_or(0) as i32)
        .bind(session["num_pets"].as_i64().unwrap_or(0) as i32)
        .bind(parse_timestamp(session, "expires_at")?)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn save_trip(
        &self,
        trip: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = parse_uuid(trip, "id")?;
        let user_id = trip["user_id"].as_str().ok_or("Missing user_id")?;
        let location_string = trip["location_string"]
            .as_str()
            .ok_or("Missing location_string")?;

        sqlx::query(
            r#"
            INSERT INTO trips
                (id, user_id, location_string, latitude, longitude, num_adults, num_children, num_pets, min_price, max_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(location_string)
        .bind(trip["latitude"].as_f64().unwrap_or(0.0))
        .bind(trip["longitude"].as_f64().unwrap_or(0.0))
        .bind(trip["num_adults"].as_i64().unwrap_or(0) as i32)
        .bind(trip["num_children"].as_i64().unwrap_or(0) as i32)
        .bind(trip["num_pets"].as_i64().unwrap_or(0) as i32)
        .bind(trip["min_price"].as_i64().map(|v| v as i32))
        .bind(trip["max_price"].as_i64().map(|v| v as i32))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn upsert_favorite(
        &self,
        favorite: &Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let id = parse_uuid(favorite, "id")?;
        let listing_id = parse_uuid(favorite, "listing_id")?;
        let guest_session_id = favorite["guest_session_id"]
            .as_str()
            .map(Uuid::parse_str)
            .transpose()?;
        let trip_id = favorite["trip_id"].as_str().map(Uuid::parse_str).transpose()?;
        let table = if favorite["kind"].as_str() == Some("dislike") {
            "dislikes"
        } else {
            "favorites"
        };

        // The partial unique indexes absorb duplicate (owner, listing) pairs.
        let sql = format!(
            r#"
            INSERT INTO {} (id, listing_id, guest_session_id, trip_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
            table
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(listing_id)
            .bind(guest_session_id)
            .bind(trip_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_converted(
        &self,
        session_id: Uuid,
        trip_id: Uuid,
        converted_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        for table in ["favorites", "dislikes"] {
            // Re-parent rows that do not collide with an existing trip row.
            let reassign = format!(
                r#"
                UPDATE {table} SET trip_id = $1, guest_session_id = NULL
                WHERE guest_session_id = $2
                  AND listing_id NOT IN (SELECT listing_id FROM {table} WHERE trip_id = $1)
                "#,
            );
            sqlx::query(&reassign)
                .bind(trip_id)
                .bind(session_id)
                .execute(&mut *tx)
                .await?;

            // Colliding rows are deduplicated, never duplicated.
            let dedupe = format!("DELETE FROM {table} WHERE guest_session_id = $1");
            sqlx::query(&dedupe)
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE guest_sessions SET converted_at = $1, trip_id = $2
            WHERE id = $3 AND converted_at IS NULL
            "#,
        )
        .bind(converted_at)
        .bind(trip_id)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Converted by a concurrent run; keep its result, discard ours.
            tx.rollback().await?;
            tracing::debug!(%session_id, "Session already converted, skipping durable write");
            return Ok(());
        }

        tx.commit().await?;
        Ok(())
    }
}
