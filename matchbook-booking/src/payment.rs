use crate::progression::BookingProgression;
use crate::models::Booking;
use crate::BookingError;
use matchbook_core::payment::PaymentAdapter;
use std::sync::Arc;
use uuid::Uuid;

/// Drives payment authorization for a match through the provider adapter and
/// commits the result to the progression.
///
/// The precondition (both lease signatures present) is checked before the
/// provider is contacted; a gated match never reaches the provider at all.
/// Provider declines surface as typed failures and are never retried here.
pub struct PaymentOrchestrator {
    adapter: Arc<dyn PaymentAdapter>,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(adapter: Arc<dyn PaymentAdapter>, currency: String) -> Self {
        Self { adapter, currency }
    }

    pub async fn authorize(
        &self,
        progression: &mut BookingProgression,
        match_id: &Uuid,
        payment_method_id: &str,
    ) -> Result<Booking, BookingError> {
        let booking_match = progression
            .get_match(match_id)
            .ok_or_else(|| BookingError::MatchNotFound(match_id.to_string()))?;

        if !booking_match.fully_signed() {
            return Err(BookingError::SignaturesIncomplete);
        }

        // Replayed authorization: do not charge again, return the booking.
        if booking_match.payment_authorized() {
            if let Some(existing_auth) = booking_match.payment_authorization_id.clone() {
                return progression.commit_authorization(match_id, &existing_auth);
            }
        }

        let amount = booking_match.monthly_rent;
        let authorization = self
            .adapter
            .authorize(*match_id, payment_method_id, amount, &self.currency)
            .await
            .map_err(|e| BookingError::ProviderError(e.to_string()))?;

        if !authorization.is_authorized() {
            let reason = authorization
                .decline_reason
                .unwrap_or_else(|| "declined".to_string());
            tracing::warn!(match_id = %match_id, %reason, "Payment authorization declined");
            return Err(BookingError::PaymentDeclined(reason));
        }

        progression.commit_authorization(match_id, &authorization.id)
    }
}
