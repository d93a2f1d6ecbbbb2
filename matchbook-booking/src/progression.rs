use crate::models::{
    Booking, BookingMatch, HousingRequest, HousingRequestStatus, Listing, SignatureParty,
};
use crate::BookingError;
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

/// Sequential booking gate:
/// `HousingRequest(pending) -> approved [creates Match] -> both signatures ->
/// payment authorization -> Booking`.
///
/// Declined requests are terminal. Every transition either fully succeeds or
/// is fully rejected; uniqueness of match-per-request and booking-per-match
/// is enforced with indexes here and with unique constraints in Postgres.
pub struct BookingProgression {
    requests: HashMap<Uuid, HousingRequest>,
    matches: HashMap<Uuid, BookingMatch>,
    match_by_request: HashMap<Uuid, Uuid>,
    bookings: HashMap<Uuid, Booking>,
    booking_by_match: HashMap<Uuid, Uuid>,
}

impl BookingProgression {
    pub fn new() -> Self {
        Self {
            requests: HashMap::new(),
            matches: HashMap::new(),
            match_by_request: HashMap::new(),
            bookings: HashMap::new(),
            booking_by_match: HashMap::new(),
        }
    }

    pub fn submit_request(
        &mut self,
        trip_id: Uuid,
        listing: &Listing,
        renter_user_id: String,
    ) -> HousingRequest {
        let request = HousingRequest::new(trip_id, listing, renter_user_id);
        self.requests.insert(request.id, request.clone());
        request
    }

    pub fn get_request(&self, request_id: &Uuid) -> Option<&HousingRequest> {
        self.requests.get(request_id)
    }

    pub fn get_match(&self, match_id: &Uuid) -> Option<&BookingMatch> {
        self.matches.get(match_id)
    }

    pub fn match_for_request(&self, request_id: &Uuid) -> Option<&BookingMatch> {
        self.match_by_request
            .get(request_id)
            .and_then(|id| self.matches.get(id))
    }

    pub fn booking_for_match(&self, match_id: &Uuid) -> Option<&Booking> {
        self.booking_by_match
            .get(match_id)
            .and_then(|id| self.bookings.get(id))
    }

    /// Transition: Pending -> Approved. Host-only; creates exactly one match
    /// per request. A second approval is rejected, never duplicated.
    pub fn approve_request(
        &mut self,
        request_id: &Uuid,
        acting_user_id: &str,
        monthly_rent: i32,
    ) -> Result<BookingMatch, BookingError> {
        // Uniqueness check first, before the request is borrowed mutably.
        if self.match_by_request.contains_key(request_id) {
            return Err(BookingError::AlreadyMatched(request_id.to_string()));
        }
        let request = self.get_request_mut(request_id)?;

        if request.host_user_id != acting_user_id {
            return Err(BookingError::NotHost);
        }
        if request.status != HousingRequestStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: request.status.to_string(),
                to: HousingRequestStatus::Approved.to_string(),
            });
        }

        request.status = HousingRequestStatus::Approved;
        request.updated_at = Utc::now();

        let booking_match = BookingMatch::new(request, monthly_rent);
        self.match_by_request.insert(*request_id, booking_match.id);
        self.matches
            .insert(booking_match.id, booking_match.clone());

        tracing::info!(
            request_id = %request_id,
            match_id = %booking_match.id,
            "Housing request approved, match created"
        );
        Ok(booking_match)
    }

    /// Transition: Pending -> Declined. Host-only and terminal; no match is
    /// ever created for a declined request.
    pub fn decline_request(
        &mut self,
        request_id: &Uuid,
        acting_user_id: &str,
    ) -> Result<HousingRequest, BookingError> {
        let request = self.get_request_mut(request_id)?;

        if request.host_user_id != acting_user_id {
            return Err(BookingError::NotHost);
        }
        if request.status != HousingRequestStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: request.status.to_string(),
                to: HousingRequestStatus::Declined.to_string(),
            });
        }

        request.status = HousingRequestStatus::Declined;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    /// Record a party's signature completion. Parties are independent and
    /// order-independent; re-signing keeps the original timestamp.
    pub fn record_signature(
        &mut self,
        match_id: &Uuid,
        party: SignatureParty,
    ) -> Result<BookingMatch, BookingError> {
        let booking_match = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| BookingError::MatchNotFound(match_id.to_string()))?;

        let now = Utc::now();
        let slot = match party {
            SignatureParty::Landlord => &mut booking_match.landlord_signed_at,
            SignatureParty::Tenant => &mut booking_match.tenant_signed_at,
        };
        if slot.is_none() {
            *slot = Some(now);
            booking_match.updated_at = now;
            tracing::info!(match_id = %match_id, party = party.as_str(), "Lease signature recorded");
        }

        Ok(booking_match.clone())
    }

    /// Commit a successful payment authorization and create the booking.
    ///
    /// Guarded precondition: both signatures must be present. Idempotent:
    /// a match that is already authorized returns its existing booking and
    /// records nothing new.
    pub fn commit_authorization(
        &mut self,
        match_id: &Uuid,
        authorization_id: &str,
    ) -> Result<Booking, BookingError> {
        let booking_match = self
            .matches
            .get_mut(match_id)
            .ok_or_else(|| BookingError::MatchNotFound(match_id.to_string()))?;

        if !booking_match.fully_signed() {
            return Err(BookingError::SignaturesIncomplete);
        }

        if booking_match.payment_authorized() {
            // Already authorized; the existing booking is the answer.
            return self
                .booking_for_match(match_id)
                .cloned()
                .ok_or_else(|| BookingError::MatchNotFound(match_id.to_string()));
        }

        let now = Utc::now();
        booking_match.payment_authorized_at = Some(now);
        booking_match.payment_authorization_id = Some(authorization_id.to_string());
        booking_match.updated_at = now;

        let booking = Booking::new(booking_match);
        self.booking_by_match.insert(*match_id, booking.id);
        self.bookings.insert(booking.id, booking.clone());

        tracing::info!(
            match_id = %match_id,
            booking_id = %booking.id,
            "Payment authorized, booking created"
        );
        Ok(booking)
    }

    fn get_request_mut(&mut self, request_id: &Uuid) -> Result<&mut HousingRequest, BookingError> {
        self.requests
            .get_mut(request_id)
            .ok_or_else(|| BookingError::RequestNotFound(request_id.to_string()))
    }
}

impl Default for BookingProgression {
    fn default() -> Self {
        Self::new()
    }
}
