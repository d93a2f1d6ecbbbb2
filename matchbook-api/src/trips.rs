use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use matchbook_session::models::{FavoriteOwner, LocationContext, Trip};
use matchbook_session::{MigrationOutcome, MigrationProcessor};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::guest::{removal_cookie, session_id_from_jar};
use crate::middleware::auth::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", post(create_trip).get(list_trips))
        .route("/v1/trips/{trip_id}/favorites", get(trip_favorites))
        .route("/v1/sessions/sync", post(sync_session))
}

#[derive(Debug, Serialize)]
struct TripResponse {
    trip: Trip,
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(context): Json<LocationContext>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = {
        let mut sessions = state.sessions.write().await;
        sessions.trips.create_trip(claims.sub, context)
    };

    let record = serde_json::to_value(&trip)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    state
        .session_repo
        .save_trip(&record)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(TripResponse { trip }))
}

#[derive(Debug, Serialize)]
struct TripsResponse {
    trips: Vec<Trip>,
}

async fn list_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<TripsResponse> {
    let sessions = state.sessions.read().await;
    Json(TripsResponse {
        trips: sessions.trips.trips_for_user(&claims.sub),
    })
}

#[derive(Debug, Serialize)]
struct FavoritesResponse {
    favorites: Vec<Value>,
}

async fn trip_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<FavoritesResponse>, AppError> {
    let sessions = state.sessions.read().await;
    sessions
        .trips
        .get_owned(&trip_id, &claims.sub)
        .map_err(AppError::session)?;

    let favorites = sessions
        .ledger
        .favorites_for(FavoriteOwner::Trip(trip_id))
        .iter()
        .map(|f| f.record())
        .collect();
    Ok(Json(FavoritesResponse { favorites }))
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    converted: bool,
    trip_id: Option<Uuid>,
    favorites_moved: usize,
}

/// Runs the migration processor for the signed-in caller if an unconverted
/// guest-session cookie rides the request. The whole conversion happens
/// under one write guard; the durable write mirrors it in one transaction.
/// The guest cookie is cleared from the response either way.
async fn sync_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SyncResponse>), AppError> {
    let Some(session_id) = session_id_from_jar(&jar) else {
        return Ok((
            jar,
            Json(SyncResponse {
                converted: false,
                trip_id: None,
                favorites_moved: 0,
            }),
        ));
    };

    let (outcome, trip_record, converted_at) = {
        let mut sessions = state.sessions.write().await;
        let inner = &mut *sessions;
        let outcome = MigrationProcessor::run(
            &mut inner.store,
            &mut inner.trips,
            &mut inner.ledger,
            &session_id,
            &claims.sub,
        )
        .map_err(AppError::session)?;

        let trip_id = match &outcome {
            MigrationOutcome::Converted { trip_id, .. } => Some(*trip_id),
            MigrationOutcome::AlreadyConverted { trip_id } => *trip_id,
            MigrationOutcome::NoSession => None,
        };
        let trip = trip_id.and_then(|id| inner.trips.get(&id).cloned());
        let converted_at = inner.store.get(&session_id).and_then(|s| s.converted_at);
        (outcome, trip, converted_at)
    };

    // The durable mirror is written on every sync of the same cookie, not
    // just the converting one, so a write that failed on a prior attempt is
    // repaired by the retry. Both repository calls are idempotent.
    if let Some(trip) = &trip_record {
        let record = serde_json::to_value(trip)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        state
            .session_repo
            .save_trip(&record)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        state
            .session_repo
            .mark_converted(
                session_id,
                trip.id,
                converted_at.unwrap_or_else(chrono::Utc::now),
            )
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    let jar = jar.remove(removal_cookie());
    let response = match outcome {
        MigrationOutcome::Converted {
            trip_id,
            favorites_moved,
            ..
        } => SyncResponse {
            converted: true,
            trip_id: Some(trip_id),
            favorites_moved,
        },
        MigrationOutcome::AlreadyConverted { trip_id } => SyncResponse {
            converted: true,
            trip_id,
            favorites_moved: 0,
        },
        MigrationOutcome::NoSession => SyncResponse {
            converted: false,
            trip_id: None,
            favorites_moved: 0,
        },
    };
    Ok((jar, Json(response)))
}
