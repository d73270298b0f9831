use crate::config::Listener;
use crate::counter;
use crate::db::CoverageStore;
use crate::metrics_defs::STORE_HEALTH_FAILURES;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Identity reported by `/` and `/health`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServiceInfo {
    /// Short name, e.g. "key-service".
    pub name: &'static str,
    /// Human readable title, e.g. "Coverage Key Service".
    pub title: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
struct CommonState {
    info: ServiceInfo,
    store: Arc<dyn CoverageStore>,
}

#[derive(Serialize, Debug)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
}

#[derive(Serialize, Debug)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    database: &'static str,
}

/// `GET /` and `GET /health`, shared by every service.
pub fn common_routes(info: ServiceInfo, store: Arc<dyn CoverageStore>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(CommonState { info, store })
}

async fn root(State(state): State<CommonState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: state.info.title,
        version: state.info.version,
    })
}

/// Always answers 200; database reachability is reported in the body.
async fn health(State(state): State<CommonState>) -> Json<HealthResponse> {
    let (status, database) = match state.store.health_check().await {
        Ok(()) => ("healthy", "connected"),
        Err(e) => {
            counter!(STORE_HEALTH_FAILURES).increment(1);
            tracing::error!(error = %e, "Database health check failed");
            ("unhealthy", "disconnected")
        }
    };

    Json(HealthResponse {
        status,
        service: state.info.name,
        database,
    })
}

/// Bind `listener` and serve `router` until ctrl-c or SIGTERM.
pub async fn serve(listener: &Listener, router: Router) -> Result<(), std::io::Error> {
    let addr = listener.addr();
    let tcp = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(tcp, router.layer(TraceLayer::new_for_http()))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
