mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{assert_status, guest_cookie_from, json_body, token_for, TestContext};
use matchbook_core::poll::{await_ready, PollConfig};
use matchbook_core::repository::SessionRepository;
use matchbook_store::MemorySessionRepository;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn austin_context() -> Value {
    json!({
        "location_string": "Austin, TX",
        "latitude": 30.2672,
        "longitude": -97.7431,
        "num_adults": 2,
    })
}

async fn create_listing(ctx: &TestContext, host_token: &str, title: &str) -> Uuid {
    let response = ctx
        .request(
            "POST",
            "/v1/listings",
            Some(json!({
                "title": title,
                "location_string": "Austin, TX",
                "monthly_rent": 2200_00,
            })),
            Some(host_token),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let body = json_body(response).await;
    Uuid::parse_str(body["listing"]["id"].as_str().unwrap()).unwrap()
}

async fn create_trip(ctx: &TestContext, token: &str) -> Uuid {
    let response = ctx
        .request("POST", "/v1/trips", Some(austin_context()), Some(token), None)
        .await;
    assert_status(&response, StatusCode::OK);
    let body = json_body(response).await;
    Uuid::parse_str(body["trip"]["id"].as_str().unwrap()).unwrap()
}

/// Walks a listing all the way to an approved, fully signed match and
/// returns the match id.
async fn signed_match(
    ctx: &TestContext,
    host_token: &str,
    renter_token: &str,
) -> Uuid {
    let listing_id = create_listing(ctx, host_token, "Downtown loft").await;
    let trip_id = create_trip(ctx, renter_token).await;

    let response = ctx
        .request(
            "POST",
            "/v1/housing-requests",
            Some(json!({ "trip_id": trip_id, "listing_id": listing_id })),
            Some(renter_token),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let request_id = json_body(response).await["housing_request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = ctx
        .request(
            "POST",
            &format!("/v1/housing-requests/{}/approve", request_id),
            None,
            Some(host_token),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let match_id = json_body(response).await["match"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    for party in ["landlord", "tenant"] {
        let response = ctx
            .request(
                "POST",
                &format!("/v1/matches/{}/signatures", match_id),
                Some(json!({ "party": party })),
                Some(renter_token),
                None,
            )
            .await;
        assert_status(&response, StatusCode::OK);
    }

    Uuid::parse_str(&match_id).unwrap()
}

#[tokio::test]
async fn test_guest_favorites_follow_user_through_sync() {
    let ctx = TestContext::new();
    let listing_1 = Uuid::new_v4();
    let listing_2 = Uuid::new_v4();

    // First like from a fresh visitor creates the session and sets the cookie.
    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": listing_1, "context": austin_context() })),
            None,
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let cookie = guest_cookie_from(&response).expect("guest cookie issued");
    let session_id = cookie.split('=').nth(1).unwrap().to_string();

    // Second like rides the cookie; no new session is created.
    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": listing_2 })),
            None,
            Some(&cookie),
        )
        .await;
    assert_status(&response, StatusCode::OK);
    assert!(guest_cookie_from(&response).is_none());

    // Sign in and sync.
    let token = token_for("renter_1");
    let response = ctx
        .request("POST", "/v1/sessions/sync", None, Some(&token), Some(&cookie))
        .await;
    assert_status(&response, StatusCode::OK);
    let cleared = guest_cookie_from(&response).expect("cookie cleared in response");
    assert_eq!(cleared, "matchbook_guest_session_id=");
    let sync = json_body(response).await;
    assert_eq!(sync["converted"], json!(true));
    assert_eq!(sync["favorites_moved"], json!(2));
    let trip_id = sync["trip_id"].as_str().unwrap().to_string();

    // Clients poll conversion readiness before fetching trip favorites.
    let poll = PollConfig {
        max_attempts: 5,
        interval: Duration::from_millis(10),
    };
    let status_uri = format!("/v1/guest/sessions/{}", session_id);
    let ctx_ref = &ctx;
    let uri_ref = status_uri.as_str();
    let ready = await_ready(poll, move || async move {
        let response = ctx_ref.request("GET", uri_ref, None, None, None).await;
        json_body(response).await["guest_session"]["converted"] == json!(true)
    })
    .await;
    assert!(ready);

    let response = ctx
        .request(
            "GET",
            &format!("/v1/trips/{}/favorites", trip_id),
            None,
            Some(&token),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let favorites = json_body(response).await["favorites"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["listing_id"].as_str().unwrap().to_string())
        .collect::<HashSet<_>>();
    assert_eq!(
        favorites,
        HashSet::from([listing_1.to_string(), listing_2.to_string()])
    );

    // Durable side saw the re-parented rows too.
    let trip_uuid = Uuid::parse_str(&trip_id).unwrap();
    assert_eq!(ctx.session_repo.favorites_for_trip(&trip_uuid).await.len(), 2);
}

#[tokio::test]
async fn test_sync_without_cookie_is_a_noop() {
    let ctx = TestContext::new();
    let token = token_for("renter_1");

    let response = ctx
        .request("POST", "/v1/sessions/sync", None, Some(&token), None)
        .await;
    assert_status(&response, StatusCode::OK);
    let sync = json_body(response).await;
    assert_eq!(sync["converted"], json!(false));
    assert_eq!(sync["trip_id"], Value::Null);
}

/// Session repository whose next conversion write fails, standing in for a
/// database outage between the in-memory commit and the durable one.
struct OutageSessionRepository {
    inner: Arc<MemorySessionRepository>,
    fail_next_conversion: AtomicBool,
}

#[async_trait]
impl SessionRepository for OutageSessionRepository {
    async fn save_session(
        &self,
        session: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        self.inner.save_session(session).await
    }

    async fn save_trip(
        &self,
        trip: &Value,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        self.inner.save_trip(trip).await
    }

    async fn upsert_favorite(
        &self,
        favorite: &Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.inner.upsert_favorite(favorite).await
    }

    async fn mark_converted(
        &self,
        session_id: Uuid,
        trip_id: Uuid,
        converted_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_next_conversion.swap(false, Ordering::SeqCst) {
            return Err("connection reset".into());
        }
        self.inner
            .mark_converted(session_id, trip_id, converted_at)
            .await
    }
}

#[tokio::test]
async fn test_sync_retry_repairs_failed_durable_write() {
    let memory = Arc::new(MemorySessionRepository::new());
    let durable = Arc::new(OutageSessionRepository {
        inner: memory.clone(),
        fail_next_conversion: AtomicBool::new(true),
    });
    let ctx = TestContext::with_session_repo(durable, memory.clone());
    let token = token_for("renter_1");

    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": Uuid::new_v4(), "context": austin_context() })),
            None,
            None,
        )
        .await;
    let cookie = guest_cookie_from(&response).unwrap();
    let session_id = Uuid::parse_str(cookie.split('=').nth(1).unwrap()).unwrap();

    // Conversion commits in memory, then the durable write dies.
    let first = ctx
        .request("POST", "/v1/sessions/sync", None, Some(&token), Some(&cookie))
        .await;
    assert_status(&first, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(memory.session(&session_id).await.unwrap()["converted_at"].is_null());

    // The retry takes the already-converted arm and still replays the
    // durable write, repairing the mirror.
    let second = ctx
        .request("POST", "/v1/sessions/sync", None, Some(&token), Some(&cookie))
        .await;
    assert_status(&second, StatusCode::OK);
    let body = json_body(second).await;
    assert_eq!(body["converted"], json!(true));
    let trip_id = Uuid::parse_str(body["trip_id"].as_str().unwrap()).unwrap();

    let row = memory.session(&session_id).await.unwrap();
    assert!(!row["converted_at"].is_null());
    assert_eq!(memory.favorites_for_trip(&trip_id).await.len(), 1);
}

#[tokio::test]
async fn test_second_sync_of_same_session_conflicts() {
    let ctx = TestContext::new();
    let token = token_for("renter_1");

    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": Uuid::new_v4(), "context": austin_context() })),
            None,
            None,
        )
        .await;
    let cookie = guest_cookie_from(&response).unwrap();

    let first = ctx
        .request("POST", "/v1/sessions/sync", None, Some(&token), Some(&cookie))
        .await;
    assert_status(&first, StatusCode::OK);

    // The cookie is gone from real clients, but a replayed request must not
    // migrate anything twice.
    let second = ctx
        .request("POST", "/v1/sessions/sync", None, Some(&token), Some(&cookie))
        .await;
    assert_status(&second, StatusCode::OK);
    let body = json_body(second).await;
    assert_eq!(body["converted"], json!(true));
    assert_eq!(body["favorites_moved"], json!(0));
}

#[tokio::test]
async fn test_stale_cookie_after_conversion_gets_fresh_session() {
    let ctx = TestContext::new();
    let token = token_for("renter_1");

    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": Uuid::new_v4(), "context": austin_context() })),
            None,
            None,
        )
        .await;
    let stale_cookie = guest_cookie_from(&response).unwrap();

    let response = ctx
        .request(
            "POST",
            "/v1/sessions/sync",
            None,
            Some(&token),
            Some(&stale_cookie),
        )
        .await;
    assert_status(&response, StatusCode::OK);

    // A like riding the converted session's cookie must open a new session,
    // not append rows the migration can never pick up.
    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": Uuid::new_v4() })),
            None,
            Some(&stale_cookie),
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let fresh_cookie = guest_cookie_from(&response).expect("fresh session cookie issued");
    assert_ne!(fresh_cookie, stale_cookie);
}

#[tokio::test]
async fn test_double_like_stays_a_single_favorite() {
    let ctx = TestContext::new();
    let listing_id = Uuid::new_v4();

    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": listing_id, "context": austin_context() })),
            None,
            None,
        )
        .await;
    let cookie = guest_cookie_from(&response).unwrap();
    let first_id = json_body(response).await["favorite"]["id"].clone();

    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": listing_id })),
            None,
            Some(&cookie),
        )
        .await;
    assert_status(&response, StatusCode::OK);
    assert_eq!(json_body(response).await["favorite"]["id"], first_id);

    let response = ctx
        .request("GET", "/v1/guest/favorites", None, None, Some(&cookie))
        .await;
    assert_eq!(json_body(response).await["favorites"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dislikes_stay_out_of_favorites() {
    let ctx = TestContext::new();
    let liked = Uuid::new_v4();
    let disliked = Uuid::new_v4();

    let response = ctx
        .request(
            "POST",
            "/v1/guest/favorites",
            Some(json!({ "listing_id": liked, "context": austin_context() })),
            None,
            None,
        )
        .await;
    let cookie = guest_cookie_from(&response).unwrap();

    let response = ctx
        .request(
            "POST",
            "/v1/guest/dislikes",
            Some(json!({ "listing_id": disliked })),
            None,
            Some(&cookie),
        )
        .await;
    assert_status(&response, StatusCode::OK);

    let response = ctx
        .request("GET", "/v1/guest/favorites", None, None, Some(&cookie))
        .await;
    let favorites = json_body(response).await["favorites"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["listing_id"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(favorites, vec![liked.to_string()]);
}

#[tokio::test]
async fn test_full_booking_flow() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let match_id = signed_match(&ctx, &host, &renter).await;

    let response = ctx
        .request(
            "POST",
            &format!("/v1/matches/{}/payment", match_id),
            Some(json!({ "payment_method_id": "pm_card_visa" })),
            Some(&renter),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let booking = json_body(response).await["booking"].clone();
    assert_eq!(booking["match_id"].as_str().unwrap(), match_id.to_string());

    let response = ctx
        .request(
            "GET",
            &format!("/v1/matches/{}/booking", match_id),
            None,
            Some(&renter),
            None,
        )
        .await;
    assert_eq!(json_body(response).await["booking"]["id"], booking["id"]);

    // Exactly one durable booking row.
    assert_eq!(ctx.booking_repo.bookings_for_match(&match_id).await.len(), 1);
}

#[tokio::test]
async fn test_payment_rejected_until_fully_signed() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let listing_id = create_listing(&ctx, &host, "Garden studio").await;
    let trip_id = create_trip(&ctx, &renter).await;

    let response = ctx
        .request(
            "POST",
            "/v1/housing-requests",
            Some(json!({ "trip_id": trip_id, "listing_id": listing_id })),
            Some(&renter),
            None,
        )
        .await;
    let request_id = json_body(response).await["housing_request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = ctx
        .request(
            "POST",
            &format!("/v1/housing-requests/{}/approve", request_id),
            None,
            Some(&host),
            None,
        )
        .await;
    let match_id = json_body(response).await["match"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Only the landlord has signed.
    ctx.request(
        "POST",
        &format!("/v1/matches/{}/signatures", match_id),
        Some(json!({ "party": "landlord" })),
        Some(&renter),
        None,
    )
    .await;

    let response = ctx
        .request(
            "POST",
            &format!("/v1/matches/{}/payment", match_id),
            Some(json!({ "payment_method_id": "pm_card_visa" })),
            Some(&renter),
            None,
        )
        .await;
    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .request(
            "GET",
            &format!("/v1/matches/{}/booking", match_id),
            None,
            Some(&renter),
            None,
        )
        .await;
    assert_eq!(json_body(response).await["booking"], Value::Null);
}

#[tokio::test]
async fn test_only_host_may_approve() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let listing_id = create_listing(&ctx, &host, "Downtown loft").await;
    let trip_id = create_trip(&ctx, &renter).await;

    let response = ctx
        .request(
            "POST",
            "/v1/housing-requests",
            Some(json!({ "trip_id": trip_id, "listing_id": listing_id })),
            Some(&renter),
            None,
        )
        .await;
    let request_id = json_body(response).await["housing_request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = ctx
        .request(
            "POST",
            &format!("/v1/housing-requests/{}/approve", request_id),
            None,
            Some(&renter),
            None,
        )
        .await;
    assert_status(&response, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_double_approve_conflicts() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let listing_id = create_listing(&ctx, &host, "Downtown loft").await;
    let trip_id = create_trip(&ctx, &renter).await;

    let response = ctx
        .request(
            "POST",
            "/v1/housing-requests",
            Some(json!({ "trip_id": trip_id, "listing_id": listing_id })),
            Some(&renter),
            None,
        )
        .await;
    let request_id = json_body(response).await["housing_request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let approve_uri = format!("/v1/housing-requests/{}/approve", request_id);
    let first = ctx.request("POST", &approve_uri, None, Some(&host), None).await;
    assert_status(&first, StatusCode::OK);

    let second = ctx.request("POST", &approve_uri, None, Some(&host), None).await;
    assert_status(&second, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_declined_request_cannot_be_approved() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let listing_id = create_listing(&ctx, &host, "Downtown loft").await;
    let trip_id = create_trip(&ctx, &renter).await;

    let response = ctx
        .request(
            "POST",
            "/v1/housing-requests",
            Some(json!({ "trip_id": trip_id, "listing_id": listing_id })),
            Some(&renter),
            None,
        )
        .await;
    let request_id = json_body(response).await["housing_request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = ctx
        .request(
            "POST",
            &format!("/v1/housing-requests/{}/decline", request_id),
            None,
            Some(&host),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    assert_eq!(
        json_body(response).await["housing_request"]["status"],
        json!("DECLINED")
    );

    let response = ctx
        .request(
            "POST",
            &format!("/v1/housing-requests/{}/approve", request_id),
            None,
            Some(&host),
            None,
        )
        .await;
    assert_status(&response, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_declined_card_returns_payment_required() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let match_id = signed_match(&ctx, &host, &renter).await;

    let response = ctx
        .request(
            "POST",
            &format!("/v1/matches/{}/payment", match_id),
            Some(json!({ "payment_method_id": "pm_card_declined" })),
            Some(&renter),
            None,
        )
        .await;
    assert_status(&response, StatusCode::PAYMENT_REQUIRED);

    // A declined attempt leaves the gate open for a retry with a good card.
    let response = ctx
        .request(
            "POST",
            &format!("/v1/matches/{}/payment", match_id),
            Some(json!({ "payment_method_id": "pm_card_visa" })),
            Some(&renter),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
}

#[tokio::test]
async fn test_gateway_failure_returns_bad_gateway() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let match_id = signed_match(&ctx, &host, &renter).await;

    let response = ctx
        .request(
            "POST",
            &format!("/v1/matches/{}/payment", match_id),
            Some(json!({ "payment_method_id": "pm_gateway_failure" })),
            Some(&renter),
            None,
        )
        .await;
    assert_status(&response, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_repeated_authorization_returns_same_booking() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let match_id = signed_match(&ctx, &host, &renter).await;
    let pay_uri = format!("/v1/matches/{}/payment", match_id);
    let body = json!({ "payment_method_id": "pm_card_visa" });

    let first = ctx
        .request("POST", &pay_uri, Some(body.clone()), Some(&renter), None)
        .await;
    assert_status(&first, StatusCode::OK);
    let first_id = json_body(first).await["booking"]["id"].clone();

    let second = ctx
        .request("POST", &pay_uri, Some(body), Some(&renter), None)
        .await;
    assert_status(&second, StatusCode::OK);
    assert_eq!(json_body(second).await["booking"]["id"], first_id);

    assert_eq!(ctx.booking_repo.bookings_for_match(&match_id).await.len(), 1);
}

#[tokio::test]
async fn test_only_renter_may_authorize_payment() {
    let ctx = TestContext::new();
    let host = token_for("host_1");
    let renter = token_for("renter_1");

    let match_id = signed_match(&ctx, &host, &renter).await;

    let response = ctx
        .request(
            "POST",
            &format!("/v1/matches/{}/payment", match_id),
            Some(json!({ "payment_method_id": "pm_card_visa" })),
            Some(&token_for("someone_else")),
            None,
        )
        .await;
    assert_status(&response, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let response = ctx.request("GET", "/v1/trips", None, None, None).await;
    assert_status(&response, StatusCode::UNAUTHORIZED);

    let response = ctx
        .request("GET", "/v1/trips", None, Some("not-a-jwt"), None)
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);

    // The public listing feed stays open.
    let response = ctx.request("GET", "/v1/listings", None, None, None).await;
    assert_status(&response, StatusCode::OK);
}
