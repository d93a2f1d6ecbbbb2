use crate::ledger::FavoriteLedger;
use crate::models::{FavoriteOwner, Trip};
use crate::store::GuestSessionStore;
use crate::trips::TripManager;
use crate::SessionError;
use chrono::Utc;
use uuid::Uuid;

/// What a single migration run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No session for the presented token; nothing to do.
    NoSession,
    /// Session was converted by an earlier run; nothing to do.
    AlreadyConverted { trip_id: Option<Uuid> },
    Converted {
        trip_id: Uuid,
        favorites_moved: usize,
        favorites_deduplicated: usize,
    },
}

/// Converts a guest session into a trip once the bearer signs in.
///
/// The whole run executes under one `&mut` borrow of session state: resolve
/// or create the target trip, stamp `converted_at`/`trip_id`, and re-parent
/// the ledger rows as a single indivisible step. No reader can observe a
/// half-migrated session, and a session converts at most once.
pub struct MigrationProcessor;

impl MigrationProcessor {
    pub fn run(
        sessions: &mut GuestSessionStore,
        trips: &mut TripManager,
        ledger: &mut FavoriteLedger,
        session_id: &Uuid,
        user_id: &str,
    ) -> Result<MigrationOutcome, SessionError> {
        let session = match sessions.get(session_id) {
            None => return Ok(MigrationOutcome::NoSession),
            Some(session) if session.is_converted() => {
                return Ok(MigrationOutcome::AlreadyConverted {
                    trip_id: session.trip_id,
                })
            }
            Some(session) => session.clone(),
        };

        let trip: Trip = trips.resolve_for_session(user_id, &session);

        sessions.mark_converted(session_id, trip.id, Utc::now())?;
        let summary = ledger.reassign(
            FavoriteOwner::Guest(*session_id),
            FavoriteOwner::Trip(trip.id),
        );

        tracing::info!(
            session_id = %session_id,
            trip_id = %trip.id,
            moved = summary.moved,
            deduplicated = summary.deduplicated,
            "Guest session converted"
        );

        Ok(MigrationOutcome::Converted {
            trip_id: trip.id,
            favorites_moved: summary.moved,
            favorites_deduplicated: summary.deduplicated,
        })
    }
}
