//! # Discovery Demo Service - Main Entry Point
//!
//! A minimal service wired to the discovery client: it registers itself with
//! the registry daemon on startup, serves the `/health` endpoint that the
//! daemon's check polls (plus `/metrics` for Prometheus), resolves its
//! configured dependencies once at boot, and deregisters on SIGTERM/SIGINT.
//!
//! Registration is spawned, not awaited: the process serves traffic whether
//! or not the registry accepted it, and a registration failure only costs
//! discoverability.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use consul_discovery::observability::logging;
use consul_discovery::{
    ConsulRegistry, DiscoveryConfig, DiscoveryError, DiscoveryResolver, DiscoveryResult,
    ServiceHandle,
};

#[derive(Clone)]
struct AppState {
    service_name: String,
    metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> DiscoveryResult<()> {
    logging::init();

    info!("🚀 Starting discovery demo service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config().await?;

    let registry = Arc::new(ConsulRegistry::new(&config.registry)?);
    let handle = Arc::new(ServiceHandle::new(registry.clone(), config.descriptor()));

    let metrics_handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        DiscoveryError::config(format!("Failed to install metrics recorder: {}", e))
    })?;

    // Registration must not gate serving; the daemon's first health poll will
    // find the endpoint below already up
    let registration = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = registration.register().await {
            error!("Registration failed, continuing unregistered: {}", e);
        }
    });

    let resolver =
        DiscoveryResolver::new(registry.clone()).with_fallbacks(config.fallbacks.clone());
    resolve_dependencies(&resolver, &config.dependencies).await;

    let state = AppState {
        service_name: config.service.name.clone(),
        metrics: metrics_handle,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DiscoveryError::config(format!("Failed to bind {}: {}", addr, e)))?;

    info!("🌐 {} serving on {}", config.service.name, addr);
    info!("📊 Metrics available on http://{}/metrics", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Whatever ended the server, the registry must hear we are gone
    handle.shutdown().await;

    served.map_err(|e| DiscoveryError::config(format!("Server error: {}", e)))?;

    info!("✅ Shutdown complete");
    Ok(())
}

/// Load configuration from `DISCOVERY_CONFIG_PATH` when set, otherwise from
/// defaults plus environment variables
async fn load_config() -> DiscoveryResult<DiscoveryConfig> {
    match std::env::var("DISCOVERY_CONFIG_PATH") {
        Ok(path) => {
            info!("📋 Loading configuration from {}", path);
            DiscoveryConfig::load_from_file(&path).await
        }
        Err(_) => DiscoveryConfig::from_env(),
    }
}

/// Resolve the configured dependency names once and log where they live
async fn resolve_dependencies(resolver: &DiscoveryResolver, dependencies: &[String]) {
    for name in dependencies {
        match resolver.resolve_url(name).await {
            Ok(url) => info!("🔗 Dependency {} at {}", name, url),
            Err(e) => warn!("Dependency {} is not resolvable yet: {}", name, e),
        }
    }
}

/// The endpoint the registration's health check points at
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.service_name,
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}

/// Wait for SIGTERM or SIGINT
async fn shutdown_signal() {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("Failed to install SIGTERM handler");
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("Failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("📡 Received SIGTERM, initiating graceful shutdown...");
        }
        _ = sigint.recv() => {
            info!("📡 Received SIGINT (Ctrl+C), initiating graceful shutdown...");
        }
    }
}
