use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use matchbook_api::app;
use matchbook_api::middleware::auth::Claims;
use matchbook_api::state::{AppState, AuthConfig};
use matchbook_booking::PaymentOrchestrator;
use matchbook_core::payment::MockPaymentAdapter;
use matchbook_core::repository::SessionRepository;
use matchbook_store::app_config::BusinessRules;
use matchbook_store::{MemoryBookingRepository, MemorySessionRepository};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";

/// One app instance over in-memory repositories. The typed repository
/// handles stay available for asserting on the durable write-through.
pub struct TestContext {
    pub app: Router,
    pub session_repo: Arc<MemorySessionRepository>,
    pub booking_repo: Arc<MemoryBookingRepository>,
}

impl TestContext {
    pub fn new() -> Self {
        let session_repo = Arc::new(MemorySessionRepository::new());
        Self::with_session_repo(session_repo.clone(), session_repo)
    }

    /// Build the app over a wrapped session repository while keeping the
    /// underlying in-memory handle for assertions.
    pub fn with_session_repo(
        durable: Arc<dyn SessionRepository>,
        session_repo: Arc<MemorySessionRepository>,
    ) -> Self {
        let booking_repo = Arc::new(MemoryBookingRepository::new());
        let rules = BusinessRules {
            guest_session_ttl_days: 3650,
            payment_currency: "USD".to_string(),
        };

        let state = AppState {
            sessions: Arc::new(RwLock::new(AppState::session_state(&rules))),
            bookings: Arc::new(RwLock::new(AppState::booking_state())),
            session_repo: durable,
            booking_repo: booking_repo.clone(),
            payments: Arc::new(PaymentOrchestrator::new(
                Arc::new(MockPaymentAdapter),
                rules.payment_currency.clone(),
            )),
            auth: AuthConfig {
                secret: TEST_SECRET.to_string(),
            },
            business_rules: rules,
        };

        Self {
            app: app(state),
            session_repo,
            booking_repo,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        let request = builder.body(body).unwrap();

        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub fn token_for(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pulls the guest session cookie pair out of a response's Set-Cookie
/// headers, if one was issued.
pub fn guest_cookie_from(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find(|h| h.starts_with("matchbook_guest_session_id="))
        .and_then(|h| h.split(';').next())
        .map(str::to_string)
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
