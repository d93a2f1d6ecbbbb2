use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use matchbook_booking::models::{Booking, BookingMatch, SignatureParty};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/matches/{match_id}", get(get_match))
        .route("/v1/matches/{match_id}/signatures", post(record_signature))
        .route("/v1/matches/{match_id}/payment", post(authorize_payment))
        .route("/v1/matches/{match_id}/booking", get(get_booking))
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub booking_match: Option<BookingMatch>,
}

async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Json<MatchResponse> {
    let bookings = state.bookings.read().await;
    Json(MatchResponse {
        booking_match: bookings.progression.get_match(&match_id).cloned(),
    })
}

#[derive(Debug, Deserialize)]
struct SignatureRequest {
    party: SignatureParty,
}

/// Completion signal from the document-signing surface. Parties sign in any
/// order; the match is fully signed once both timestamps are set.
async fn record_signature(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SignatureRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let booking_match = {
        let mut bookings = state.bookings.write().await;
        bookings
            .progression
            .record_signature(&match_id, req.party)
            .map_err(AppError::booking)?
    };

    if let Some(signed_at) = booking_match.signed_at(req.party) {
        state
            .booking_repo
            .record_signature(match_id, req.party.as_str(), signed_at)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    Ok(Json(MatchResponse {
        booking_match: Some(booking_match),
    }))
}

#[derive(Debug, Deserialize)]
struct PaymentRequest {
    payment_method_id: String,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking: Option<Booking>,
}

/// Authorize payment for a fully signed match and create its booking.
/// Rejected with a precondition failure while either signature is missing;
/// replays return the existing booking without contacting the provider.
async fn authorize_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    // Only the renter on the match may authorize payment.
    let trip_id = {
        let bookings = state.bookings.read().await;
        bookings
            .progression
            .get_match(&match_id)
            .ok_or_else(|| AppError::NotFoundError(match_id.to_string()))?
            .trip_id
    };
    {
        let sessions = state.sessions.read().await;
        sessions
            .trips
            .get_owned(&trip_id, &claims.sub)
            .map_err(|_| AppError::AuthorizationError("Not the renter on this match".to_string()))?;
    }

    let (booking, authorized_at, authorization_id) = {
        let mut bookings = state.bookings.write().await;
        let inner = &mut *bookings;
        let booking = state
            .payments
            .authorize(&mut inner.progression, &match_id, &req.payment_method_id)
            .await
            .map_err(AppError::booking)?;
        let committed = inner
            .progression
            .get_match(&match_id)
            .ok_or_else(|| AppError::NotFoundError(match_id.to_string()))?;
        (
            booking,
            committed.payment_authorized_at,
            committed.payment_authorization_id.clone(),
        )
    };

    if let (Some(authorized_at), Some(authorization_id)) = (authorized_at, authorization_id) {
        state
            .booking_repo
            .mark_payment_authorized(match_id, &authorization_id, authorized_at)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }
    let record = serde_json::to_value(&booking)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    state
        .booking_repo
        .save_booking(&record)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(BookingResponse {
        booking: Some(booking),
    }))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Json<BookingResponse> {
    let bookings = state.bookings.read().await;
    Json(BookingResponse {
        booking: bookings.progression.booking_for_match(&match_id).cloned(),
    })
}
