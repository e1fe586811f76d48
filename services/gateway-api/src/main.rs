//! Hermes Gateway API
//!
//! Multi-tenant gateway and campaign orchestrator in front of an upstream
//! WhatsApp HTTP service.
//!
//! ## Surfaces
//!
//! - `GET /health`, `GET /ready`, `GET /metrics`
//! - `/internal/**` - provisioning, header `x-internal-api-key`
//! - `/v1/**` - customer sessions/contacts, header `x-api-key`
//! - `/wa/**` - transparent proxy, header `token` or `Authorization: Bearer`
//! - `/bulk/**` - campaigns and bulk executions, header `x-api-key`
//! - `/bulk/cron/process` - unauthenticated scheduler kick
//! - `/webhook/wa` - upstream event intake

mod config;
mod error;
mod extractors;
mod handlers;
mod jobs;
mod middleware;
mod state;
mod stats;
mod webhook;

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::routing::{any, get, post, put};
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::stats::StatsRecorder;

// Proxied image uploads can legitimately take close to the 60s upstream
// budget; the outer timeout only catches wedged connections.
const OUTER_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("gateway_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hermes Gateway API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(port = config.port, upstream = %config.wa_server_url, "Configuration loaded");

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool and apply migrations
    let pool = hermes_db::create_pool(&config.database_url).await?;
    hermes_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created");

    // Fire-and-forget accounting drains through this recorder on shutdown
    let repos = hermes_db::pg::Repositories::new(pool.clone());
    let (recorder, recorder_handle) = StatsRecorder::new(repos, 1024);

    // Create application state
    let state = AppState::new(pool, config.clone(), recorder);

    // Background work: subscription sweep + campaign scheduler
    let background_jobs = jobs::spawn_background_jobs(&state);

    // Build HTTP router
    let app = build_router(state.clone(), metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let service: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
        app.into_make_service_with_connect_info();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the periodic tasks and drop our state clone so every
    // accounting sender is gone, then drain what is already queued
    background_jobs.shutdown();
    drop(state);
    recorder_handle.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Internal provisioning surface
    let internal = Router::new()
        .route("/me", get(handlers::internal::me))
        .route(
            "/users",
            get(handlers::internal::list_users).post(handlers::internal::upsert_user),
        )
        .route("/users/{id}", put(handlers::internal::update_user))
        .route("/users/{id}/apikey", get(handlers::internal::get_user_api_key))
        .route(
            "/users/{id}/apikey/rotate",
            post(handlers::internal::rotate_user_api_key),
        );

    // Customer surface
    let v1 = Router::new()
        .route("/me", get(handlers::sessions::me))
        .route(
            "/sessions",
            get(handlers::sessions::list_sessions).post(handlers::sessions::create_session),
        )
        .route(
            "/sessions/{session_id}",
            put(handlers::sessions::update_session).delete(handlers::sessions::delete_session),
        )
        .route(
            "/sessions/{session_id}/settings",
            get(handlers::sessions::get_settings).put(handlers::sessions::update_settings),
        )
        .route(
            "/sessions/{session_id}/contacts",
            get(handlers::sessions::list_contacts),
        )
        .route(
            "/sessions/{session_id}/contacts/sync",
            post(handlers::sessions::sync_contacts),
        );

    // Campaign surface
    let bulk = Router::new()
        .route(
            "/campaigns",
            get(handlers::bulk::list_campaigns).post(handlers::bulk::create_campaign),
        )
        .route(
            "/campaigns/{id}",
            get(handlers::bulk::get_campaign)
                .put(handlers::bulk::update_campaign)
                .delete(handlers::bulk::delete_campaign),
        )
        .route("/campaigns/execute", post(handlers::bulk::execute_campaign))
        .route("/executions", get(handlers::bulk::list_bulk_campaigns))
        .route(
            "/executions/{id}",
            get(handlers::bulk::get_bulk_campaign).delete(handlers::bulk::delete_bulk_campaign),
        )
        .route(
            "/contacts",
            post(handlers::bulk::add_contacts).delete(handlers::bulk::delete_contacts),
        )
        .route("/contacts/sync", post(handlers::bulk::sync_contacts))
        .route("/cron/process", post(handlers::bulk::cron_process));

    // Build middleware stack (order matters - outermost first)
    let middleware_stack = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(OUTER_TIMEOUT))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::public_rate_limit,
        ));

    // Health routes (no timeout, no rate limiting - must always respond)
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/internal", internal)
        .nest("/v1", v1)
        .nest("/bulk", bulk)
        .route("/wa", any(handlers::gateway::wa_gateway))
        .route("/wa/{*path}", any(handlers::gateway::wa_gateway))
        .route("/webhook/wa", get(webhook::verify).post(webhook::receive))
        .layer(middleware_stack)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!(
        "gateway_proxied_requests_total",
        "Requests forwarded to the upstream by path class"
    );
    metrics::describe_counter!(
        "gateway_messages_total",
        "Message sends accounted by type and result"
    );
    metrics::describe_counter!(
        "gateway_rate_limited_total",
        "Requests rejected by the public rate limiter"
    );
    metrics::describe_counter!(
        "webhook_events_total",
        "Webhook envelopes ingested by event type"
    );
    metrics::describe_counter!(
        "webhook_messages_total",
        "Messages persisted from webhook events by direction"
    );
    metrics::describe_counter!(
        "subscriptions_expired_total",
        "Subscriptions flipped to expired by the sweep"
    );
    metrics::describe_counter!(
        "campaigns_dispatched_total",
        "Bulk campaigns handed to a dispatcher by the scheduler"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
