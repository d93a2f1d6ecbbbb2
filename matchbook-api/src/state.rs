use matchbook_booking::{BookingProgression, ListingDirectory, PaymentOrchestrator};
use matchbook_core::repository::{BookingRepository, SessionRepository};
use matchbook_session::{FavoriteLedger, GuestSessionStore, TripManager};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Verification-side auth settings. Tokens are minted by the identity
/// provider, so only the shared secret lives here.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Guest-session working state. One lock guards the session store, trip
/// manager, and ledger together: holding the write guard is the transaction
/// boundary that makes migration indivisible to readers.
pub struct SessionState {
    pub store: GuestSessionStore,
    pub trips: TripManager,
    pub ledger: FavoriteLedger,
}

pub struct BookingState {
    pub listings: ListingDirectory,
    pub progression: BookingProgression,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<SessionState>>,
    pub bookings: Arc<RwLock<BookingState>>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub payments: Arc<PaymentOrchestrator>,
    pub auth: AuthConfig,
    pub business_rules: matchbook_store::app_config::BusinessRules,
}

impl AppState {
    pub fn session_state(rules: &matchbook_store::app_config::BusinessRules) -> SessionState {
        SessionState {
            store: GuestSessionStore::with_ttl_days(rules.guest_session_ttl_days),
            trips: TripManager::new(),
            ledger: FavoriteLedger::new(),
        }
    }

    pub fn booking_state() -> BookingState {
        BookingState {
            listings: ListingDirectory::new(),
            progression: BookingProgression::new(),
        }
    }
}
