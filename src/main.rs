//! boxoffice server entry point.
//!
//! Wires PostgreSQL, Redis, and the payment gateway client together and
//! starts the Axum HTTP server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use boxoffice::api;
use boxoffice::api::idempotency::IdempotencyGate;
use boxoffice::app_state::AppState;
use boxoffice::cache::{self, RedisIdempotencyStore, RedisSoftLockStore};
use boxoffice::config::BoxofficeConfig;
use boxoffice::domain::{EventBus, SignatureVerifier};
use boxoffice::gateway::HttpPaymentGateway;
use boxoffice::persistence::{BookingStore, PostgresBookingStore};
use boxoffice::service::{BookingService, CatalogService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = BoxofficeConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting boxoffice");

    // Connect PostgreSQL and apply migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let store = Arc::new(PostgresBookingStore::new(pool));

    // Connect Redis
    let redis = cache::redis::connect(&config.redis_url).await?;
    let locks = Arc::new(RedisSoftLockStore::new(
        redis.clone(),
        config.soft_lock_ttl_secs,
    ));
    let idempotency_store = Arc::new(RedisIdempotencyStore::new(
        redis,
        config.idempotency_ttl_secs,
    ));

    // Build domain and service layers
    let event_bus = EventBus::new(config.event_bus_capacity);
    let verifier = SignatureVerifier::new(
        config.payment_key_secret.clone(),
        config.payment_webhook_secret.clone(),
    );
    let payment_gateway = Arc::new(HttpPaymentGateway::new(
        config.payment_base_url.clone(),
        config.payment_key_id.clone(),
        config.payment_key_secret.clone(),
        config.payment_currency.clone(),
    ));
    let booking_service = Arc::new(BookingService::new(
        Arc::clone(&store) as Arc<dyn BookingStore>,
        locks,
        payment_gateway,
        verifier,
        event_bus.clone(),
    ));
    let catalog_service = Arc::new(CatalogService::new(
        Arc::clone(&store) as Arc<dyn BookingStore>,
    ));
    let idempotency = Arc::new(IdempotencyGate::new(idempotency_store));

    // Persist booking events off the hot path
    if config.event_log_enabled {
        spawn_event_log_writer(&event_bus, Arc::clone(&store));
    }

    // Build application state
    let app_state = AppState {
        booking_service,
        catalog_service,
        idempotency,
        payment_key_id: config.payment_key_id.clone(),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Drains the event bus into the durable event log.
fn spawn_event_log_writer(event_bus: &EventBus, store: Arc<PostgresBookingStore>) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let payload = match serde_json::to_value(&event) {
                        Ok(payload) => payload,
                        Err(error) => {
                            tracing::error!(%error, "failed to serialize booking event");
                            continue;
                        }
                    };
                    if let Err(error) = store
                        .append_event(event.order_id(), event.event_type_str(), &payload)
                        .await
                    {
                        tracing::error!(%error, "failed to append booking event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event log writer lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install ctrl+c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
