use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use matchbook_booking::models::Listing;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/v1/listings", get(list_listings))
}

pub fn host_routes() -> Router<AppState> {
    Router::new().route("/v1/listings", post(create_listing))
}

#[derive(Debug, Deserialize)]
struct CreateListingRequest {
    title: String,
    location_string: String,
    monthly_rent: i32,
}

#[derive(Debug, Serialize)]
struct ListingResponse {
    listing: Listing,
}

async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListingRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    if req.monthly_rent <= 0 {
        return Err(AppError::ValidationError(
            "monthly_rent must be positive".to_string(),
        ));
    }

    let mut bookings = state.bookings.write().await;
    let listing = bookings.listings.register(Listing::new(
        claims.sub,
        req.title,
        req.location_string,
        req.monthly_rent,
    ));
    Ok(Json(ListingResponse { listing }))
}

#[derive(Debug, Serialize)]
struct ListingsResponse {
    listings: Vec<Listing>,
}

async fn list_listings(State(state): State<AppState>) -> Json<ListingsResponse> {
    let bookings = state.bookings.read().await;
    Json(ListingsResponse {
        listings: bookings.listings.list(),
    })
}
