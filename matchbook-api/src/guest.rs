use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use matchbook_session::models::{FavoriteOwner, LocationContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Cookie carrying the opaque guest session token. Possession of the token
/// is the only capability check on guest mutations.
pub const GUEST_COOKIE: &str = "matchbook_guest_session_id";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/guest/sessions", post(create_session))
        .route("/v1/guest/sessions/{session_id}", get(session_status))
        .route("/v1/guest/favorites", post(add_favorite).get(list_favorites))
        .route("/v1/guest/dislikes", post(add_dislike))
}

pub fn session_id_from_jar(jar: &CookieJar) -> Option<Uuid> {
    jar.get(GUEST_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

/// Requested lifetime matches the session TTL. Browser platforms may clamp
/// the effective expiry; that is tolerated, not compensated for.
fn guest_cookie(session_id: Uuid, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((GUEST_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::days(ttl_days))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(GUEST_COOKIE);
    cookie.set_path("/");
    cookie
}

#[derive(Debug, Deserialize)]
struct ReactionRequest {
    listing_id: Uuid,
    #[serde(default)]
    context: Option<LocationContext>,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    guest_session: Value,
}

async fn create_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(context): Json<LocationContext>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.store.create_session(context)
    };

    let record = serde_json::to_value(&session)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    state
        .session_repo
        .save_session(&record)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let jar = jar.add(guest_cookie(
        session.id,
        state.business_rules.guest_session_ttl_days,
    ));
    Ok((jar, Json(SessionResponse { guest_session: record })))
}

/// Conversion readiness probe. Clients poll this after sign-in until the
/// migration processor has run; an unknown id answers with a null resource
/// rather than an error.
async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Json<SessionResponse> {
    let sessions = state.sessions.read().await;
    let body = match sessions.store.get(&session_id) {
        Some(session) => json!({
            "id": session.id,
            "converted": session.is_converted(),
            "converted_at": session.converted_at.map(|t| t.to_rfc3339()),
            "trip_id": session.trip_id,
        }),
        None => Value::Null,
    };
    Json(SessionResponse {
        guest_session: body,
    })
}

#[derive(Debug, Serialize)]
struct ReactionResponse {
    favorite: Option<Value>,
    dislike: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ReactionKind {
    Favorite,
    Dislike,
}

async fn add_favorite(
    state: State<AppState>,
    jar: CookieJar,
    req: Json<ReactionRequest>,
) -> Result<(CookieJar, Json<ReactionResponse>), AppError> {
    add_reaction(state, jar, req, ReactionKind::Favorite).await
}

async fn add_dislike(
    state: State<AppState>,
    jar: CookieJar,
    req: Json<ReactionRequest>,
) -> Result<(CookieJar, Json<ReactionResponse>), AppError> {
    add_reaction(state, jar, req, ReactionKind::Dislike).await
}

/// A like from a visitor with no session lazily creates one; subsequent
/// likes ride the cookie. Duplicate (session, listing) pairs collapse in the
/// ledger, so double-clicks and concurrent tabs cannot fan out into rows.
async fn add_reaction(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<ReactionRequest>,
    kind: ReactionKind,
) -> Result<(CookieJar, Json<ReactionResponse>), AppError> {
    let existing_id = session_id_from_jar(&jar);

    let (session_record, row) = {
        let mut sessions = state.sessions.write().await;

        // A converted session is closed to new rows (it migrates at most
        // once); a stale cookie gets a fresh session instead.
        let (session_id, session_record) = match existing_id {
            Some(id)
                if sessions
                    .store
                    .get_active(&id)
                    .is_ok_and(|s| !s.is_converted()) =>
            {
                (id, None)
            }
            _ => {
                let session = sessions
                    .store
                    .create_session(req.context.clone().unwrap_or_default());
                let record = serde_json::to_value(&session)
                    .map_err(|e| AppError::InternalServerError(e.to_string()))?;
                (session.id, Some(record))
            }
        };

        let owner = FavoriteOwner::Guest(session_id);
        let mut row = match kind {
            ReactionKind::Favorite => sessions.ledger.add_favorite(owner, req.listing_id).record(),
            ReactionKind::Dislike => sessions.ledger.add_dislike(owner, req.listing_id).record(),
        };
        row["kind"] = json!(match kind {
            ReactionKind::Favorite => "favorite",
            ReactionKind::Dislike => "dislike",
        });
        (session_record, row)
    };

    if let Some(record) = &session_record {
        state
            .session_repo
            .save_session(record)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }
    state
        .session_repo
        .upsert_favorite(&row)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let jar = match &session_record {
        Some(record) => {
            let id = record["id"]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| AppError::InternalServerError("Malformed session id".to_string()))?;
            jar.add(guest_cookie(id, state.business_rules.guest_session_ttl_days))
        }
        None => jar,
    };

    let response = match kind {
        ReactionKind::Favorite => ReactionResponse {
            favorite: Some(row),
            dislike: None,
        },
        ReactionKind::Dislike => ReactionResponse {
            favorite: None,
            dislike: Some(row),
        },
    };
    Ok((jar, Json(response)))
}

#[derive(Debug, Serialize)]
struct FavoritesResponse {
    favorites: Vec<Value>,
}

async fn list_favorites(State(state): State<AppState>, jar: CookieJar) -> Json<FavoritesResponse> {
    let favorites = match session_id_from_jar(&jar) {
        Some(session_id) => {
            let sessions = state.sessions.read().await;
            sessions
                .ledger
                .favorites_for(FavoriteOwner::Guest(session_id))
                .iter()
                .map(|f| f.record())
                .collect()
        }
        None => Vec::new(),
    };
    Json(FavoritesResponse { favorites })
}
