pub mod listings;
pub mod models;
pub mod payment;
pub mod progression;

pub use listings::ListingDirectory;
pub use payment::PaymentOrchestrator;
pub use progression::BookingProgression;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    #[error("Housing request not found: {0}")]
    RequestNotFound(String),

    #[error("Match not found: {0}")]
    MatchNotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Only the host may perform this action")]
    NotHost,

    #[error("Housing request already has a match: {0}")]
    AlreadyMatched(String),

    #[error("Both parties must sign before payment authorization")]
    SignaturesIncomplete,

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Payment provider error: {0}")]
    ProviderError(String),
}
