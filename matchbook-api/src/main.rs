use std::net::SocketAddr;
use std::sync::Arc;

use matchbook_api::{
    app,
    state::{AppState, AuthConfig},
};
use matchbook_booking::PaymentOrchestrator;
use matchbook_core::payment::MockPaymentAdapter;
use matchbook_store::{DbClient, PgBookingRepository, PgSessionRepository};
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "matchbook_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = matchbook_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Matchbook API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let payments = PaymentOrchestrator::new(
        Arc::new(MockPaymentAdapter),
        config.business_rules.payment_currency.clone(),
    );

    let app_state = AppState {
        sessions: Arc::new(RwLock::new(AppState::session_state(&config.business_rules))),
        bookings: Arc::new(RwLock::new(AppState::booking_state())),
        session_repo: Arc::new(PgSessionRepository::new(db.pool.clone())),
        booking_repo: Arc::new(PgBookingRepository::new(db.pool.clone())),
        payments: Arc::new(payments),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
