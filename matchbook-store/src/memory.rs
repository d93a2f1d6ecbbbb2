use async_trait::async_trait;
use chrono::{DateTime, Utc};
use matchbook_core::repository::{BookingRepository, SessionRepository};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory stand-ins for the Postgres repositories, used by tests and
/// local development. They apply the same conflict rules the SQL schema
/// enforces so test assertions exercise the durable path too.
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<Uuid, Value>>,
    trips: RwLock<HashMap<Uuid, Value>>,
    favorites: RwLock<Vec<Value>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session(&self, id: &Uuid) -> Option<Value> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn favorites_for_trip(&self, trip_id: &Uuid) -> Vec<Value> {
        let key = trip_id.to_string();
        self.favorites
            .read()
            .await
            .iter()
            .filter(|f| f["trip_id"].as_str() == Some(key.as_str()))
            .cloned()
            .collect()
    }
}

fn owner_key(row: &Value) -> (Option<String>, Option<String>, Option<String>) {
    (
        row["guest_session_id"].as_str().map(str::to_string),
        row["trip_id"].as_str().map(str::to_string),
        row["listing_id"].as_str().map(str::to_string),
    )
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn save_session(
        &self,
        session: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = Uuid::parse_str(session["id"].as_str().ok_or("Missing id")?)?;
        self.sessions
            .write()
            .await
            .entry(id)
            .or_insert_with(|| session.clone());
        Ok(id)
    }

    async fn save_trip(
        &self,
        trip: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = Uuid::parse_str(trip["id"].as_str().ok_or("Missing id")?)?;
        self.trips
            .write()
            .await
            .entry(id)
            .or_insert_with(|| trip.clone());
        Ok(id)
    }

    async fn upsert_favorite(
        &self,
        favorite: &Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.favorites.write().await;
        let key = owner_key(favorite);
        let kind = favorite["kind"].clone();
        let duplicate = rows
            .iter()
            .any(|r| owner_key(r) == key && r["kind"] == kind);
        if !duplicate {
            rows.push(favorite.clone());
        }
        Ok(())
    }

    async fn mark_converted(
        &self,
        session_id: Uuid,
        trip_id: Uuid,
        converted_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| format!("Unknown session {}", session_id))?;
        if !session["converted_at"].is_null() {
            return Ok(());
        }
        session["converted_at"] = json!(converted_at.to_rfc3339());
        session["trip_id"] = json!(trip_id.to_string());

        let session_key = session_id.to_string();
        let trip_key = trip_id.to_string();
        let mut rows = self.favorites.write().await;
        // Collisions are per kind: a dislike never collides with a favorite.
        let trip_rows: Vec<(Value, Value)> = rows
            .iter()
            .filter(|r| r["trip_id"].as_str() == Some(trip_key.as_str()))
            .map(|r| (r["kind"].clone(), r["listing_id"].clone()))
            .collect();
        // Re-parent non-colliding rows, drop the rest (dedupe, same as SQL).
        rows.retain_mut(|row| {
            if row["guest_session_id"].as_str() != Some(session_key.as_str()) {
                return true;
            }
            if trip_rows.contains(&(row["kind"].clone(), row["listing_id"].clone())) {
                return false;
            }
            row["guest_session_id"] = Value::Null;
            row["trip_id"] = json!(trip_key);
            true
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBookingRepository {
    requests: RwLock<HashMap<Uuid, Value>>,
    matches: RwLock<HashMap<Uuid, Value>>,
    bookings: RwLock<Vec<Value>>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bookings_for_match(&self, match_id: &Uuid) -> Vec<Value> {
        let key = match_id.to_string();
        self.bookings
            .read()
            .await
            .iter()
            .filter(|b| b["match_id"].as_str() == Some(key.as_str()))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn save_housing_request(
        &self,
        request: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = Uuid::parse_str(request["id"].as_str().ok_or("Missing id")?)?;
        self.requests.write().await.insert(id, request.clone());
        Ok(id)
    }

    async fn update_request_status(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(request) = self.requests.write().await.get_mut(&id) {
            request["status"] = json!(status);
        }
        Ok(())
    }

    async fn save_match(
        &self,
        booking_match: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = Uuid::parse_str(booking_match["id"].as_str().ok_or("Missing id")?)?;
        let mut matches = self.matches.write().await;
        let request_id = &booking_match["housing_request_id"];
        if matches
            .values()
            .any(|m| &m["housing_request_id"] == request_id)
        {
            return Err(format!("Duplicate match for housing request {}", request_id).into());
        }
        matches.insert(id, booking_match.clone());
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
        if let Some(row) = self.matches.write().await.get_mut(&match_id) {
            if row[column].is_null() {
                row[column] = json!(signed_at.to_rfc3339());
            }
        }
        Ok(())
    }

    async fn mark_payment_authorized(
        &self,
        match_id: Uuid,
        authorization_id: &str,
        authorized_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(row) = self.matches.write().await.get_mut(&match_id) {
            if row["payment_authorized_at"].is_null() {
                row["payment_authorized_at"] = json!(authorized_at.to_rfc3339());
                row["payment_authorization_id"] = json!(authorization_id);
            }
        }
        Ok(())
    }

    async fn save_booking(
        &self,
        booking: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let id = Uuid::parse_str(booking["id"].as_str().ok_or("Missing id")?)?;
        let mut rows = self.bookings.write().await;
        let match_id = &booking["match_id"];
        if !rows.iter().any(|b| &b["match_id"] == match_id) {
            rows.push(booking.clone());
        }
        Ok(id)
    }
}
