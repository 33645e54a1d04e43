//! Citizen Registry Service Binary
//!
//! Runs the citizen registry as a REST API service with:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string
//! - `STORE_BACKEND`: "postgres" or "memory" (default: postgres when `DATABASE_URL` is set)
//! - `PORT`: Service port (default: 8080)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... cargo run --bin citizen_registry_service --features service
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use citizen_registry::config::{LogFormat, ServiceConfig, StoreBackend};
use citizen_registry::service::{create_router, ServiceState};
use citizen_registry::{InMemoryCitizenStore, PostgresCitizenStore};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "citizen_registry=info,citizen_registry_service=info,tower_http=info,sqlx=warn".into());

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .init();
        }
    }
}

/// Request logging middleware that adds correlation ID and timing
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let trace_id = request
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    info!(
        target: "citizen_registry_service::access",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

async fn build_router(config: &ServiceConfig) -> Result<Router, Box<dyn std::error::Error>> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store. Imports are lost on restart!");
            Ok(create_router(ServiceState::new(InMemoryCitizenStore::new(), "memory")))
        }
        StoreBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let connect_start = Instant::now();

            let store = match tokio::time::timeout(Duration::from_secs(30), PostgresCitizenStore::from_env()).await {
                Ok(Ok(store)) => store,
                Ok(Err(e)) => {
                    error!(error = %e, "Failed to connect to PostgreSQL");
                    return Err(e.into());
                }
                Err(_) => {
                    error!("PostgreSQL connection timeout after 30s");
                    return Err("Database connection timeout".into());
                }
            };

            let stats = store.pool_stats();
            info!(
                latency_ms = connect_start.elapsed().as_millis() as u64,
                pool_size = stats.size,
                pool_max = stats.max,
                "PostgreSQL connection established"
            );
            Ok(create_router(ServiceState::new(store, "postgres")))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env();
    init_tracing(config.log_format);

    let version = env!("CARGO_PKG_VERSION");
    info!(version = version, backend = %config.backend, "Starting Citizen Registry Service");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(&config)
        .await?
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config.bind_addr().parse()?;
    info!(address = %addr, version = version, "Citizen Registry Service listening");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Citizen Registry Service shutdown complete");

    Ok(())
}
