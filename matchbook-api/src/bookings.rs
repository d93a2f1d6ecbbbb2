use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use matchbook_booking::models::{HousingRequest, HousingRequestStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::matches::MatchResponse;
use crate::middleware::auth::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/housing-requests", post(submit_request))
        .route("/v1/housing-requests/{request_id}", get(get_request))
        .route("/v1/housing-requests/{request_id}/approve", post(approve_request))
        .route("/v1/housing-requests/{request_id}/decline", post(decline_request))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    trip_id: Uuid,
    listing_id: Uuid,
}

#[derive(Debug, Serialize)]
struct HousingRequestResponse {
    housing_request: Option<HousingRequest>,
}

async fn submit_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<HousingRequestResponse>, AppError> {
    // The applying trip must belong to the caller.
    {
        let sessions = state.sessions.read().await;
        sessions
            .trips
            .get_owned(&req.trip_id, &claims.sub)
            .map_err(AppError::session)?;
    }

    let request = {
        let mut bookings = state.bookings.write().await;
        let listing = bookings
            .listings
            .get(&req.listing_id)
            .map_err(AppError::booking)?
            .clone();
        bookings
            .progression
            .submit_request(req.trip_id, &listing, claims.sub)
    };

    let record = serde_json::to_value(&request)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    state
        .booking_repo
        .save_housing_request(&record)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(HousingRequestResponse {
        housing_request: Some(request),
    }))
}

async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Json<HousingRequestResponse> {
    let bookings = state.bookings.read().await;
    Json(HousingRequestResponse {
        housing_request: bookings.progression.get_request(&request_id).cloned(),
    })
}

async fn approve_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    let booking_match = {
        let mut bookings = state.bookings.write().await;
        let listing_id = bookings
            .progression
            .get_request(&request_id)
            .ok_or_else(|| AppError::NotFoundError(request_id.to_string()))?
            .listing_id;
        let monthly_rent = bookings
            .listings
            .get(&listing_id)
            .map_err(AppError::booking)?
            .monthly_rent;
        bookings
            .progression
            .approve_request(&request_id, &claims.sub, monthly_rent)
            .map_err(AppError::booking)?
    };

    state
        .booking_repo
        .update_request_status(request_id, &HousingRequestStatus::Approved.to_string())
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let record = serde_json::to_value(&booking_match)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    state
        .booking_repo
        .save_match(&record)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(MatchResponse {
        booking_match: Some(booking_match),
    }))
}

async fn decline_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<HousingRequestResponse>, AppError> {
    let request = {
        let mut bookings = state.bookings.write().await;
        bookings
            .progression
            .decline_request(&request_id, &claims.sub)
            .map_err(AppError::booking)?
    };

    state
        .booking_repo
        .update_request_status(request_id, &HousingRequestStatus::Declined.to_string())
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(HousingRequestResponse {
        housing_request: Some(request),
    }))
}
