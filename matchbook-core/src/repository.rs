use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Durable persistence seam for the guest-session side of the system.
///
/// The in-memory managers are authoritative for request handling; these
/// repositories record the same state durably. Payloads are JSON projections
/// of the domain models so the trait lives below every domain crate.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save_session(
        &self,
        session: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn save_trip(
        &self,
        trip: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    /// Insert a favorite or dislike row, ignoring duplicates for the same
    /// (owner, listing) pair.
    async fn upsert_favorite(
        &self,
        favorite: &Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Record a completed conversion: re-parent the session's rows to the
    /// trip and stamp `converted_at`, all in one transaction.
    async fn mark_converted(
        &self,
        session_id: Uuid,
        trip_id: Uuid,
        converted_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Durable persistence seam for the booking progression.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn save_housing_request(
        &self,
        request: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_request_status(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn save_match(
        &self,
        booking_match: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn record_signature(
        &self,
        match_id: Uuid,
        party: &str,
        signed_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn mark_payment_authorized(
        &self,
        match_id: Uuid,
        authorization_id: &str,
        authorized_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn save_booking(
        &self,
        booking: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;
}
