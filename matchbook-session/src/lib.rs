pub mod ledger;
pub mod migration;
pub mod models;
pub mod store;
pub mod trips;

pub use ledger::FavoriteLedger;
pub use migration::{MigrationOutcome, MigrationProcessor};
pub use store::GuestSessionStore;
pub use trips::TripManager;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Guest session not found: {0}")]
    SessionNotFound(String),

    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Guest session already converted: {0}")]
    AlreadyConverted(String),

    #[error("Guest session expired: {0}")]
    SessionExpired(String),
}
