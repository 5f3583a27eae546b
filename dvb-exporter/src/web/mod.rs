//! HTTP server exposing the metrics endpoint.

pub mod landing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::{debug, error, info};
use tower_http::trace::TraceLayer;

use linux_dvb::DeviceTree;

use crate::collector::Collector;
use crate::metrics::{self, gather_observations, render, HandlerMetrics};

/// State shared by every request.
pub struct AppState<T> {
    pub collector: Collector<T>,
    pub namespace: String,
    pub telemetry_path: String,
    pub handler_metrics: HandlerMetrics,
}

impl<T: DeviceTree> AppState<T> {
    pub fn new(
        tree: T,
        namespace: impl Into<String>,
        telemetry_path: impl Into<String>,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            collector: Collector::new(tree),
            namespace: namespace.into(),
            telemetry_path: telemetry_path.into(),
            handler_metrics: HandlerMetrics::new()?,
        })
    }
}

/// Build the router: the landing page at `/` and metrics at the telemetry path.
pub fn build_router<T>(state: Arc<AppState<T>>) -> Router
where
    T: DeviceTree + Send + Sync + 'static,
{
    let telemetry_path = state.telemetry_path.clone();
    Router::new()
        .route("/", get(landing::index::<T>))
        .route(&telemetry_path, get(scrape::<T>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C.
pub async fn serve<T>(listen_addr: SocketAddr, state: Arc<AppState<T>>) -> std::io::Result<()>
where
    T: DeviceTree + Send + Sync + 'static,
{
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn internal_error(message: String) -> Response {
    error!("{}", message);
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

/// Run one collection pass and encode it together with the handler metrics.
async fn scrape<T>(State(state): State<Arc<AppState<T>>>) -> Response
where
    T: DeviceTree + Send + Sync + 'static,
{
    let started = Instant::now();
    let _in_flight = state.handler_metrics.start();

    // Device ioctls block; keep them off the async workers.
    let pass_state = Arc::clone(&state);
    let gathered = tokio::task::spawn_blocking(move || {
        let observations = pass_state.collector.collect();
        gather_observations(&observations, &pass_state.namespace)
    })
    .await;

    let response = match gathered {
        Ok(Ok(mut families)) => {
            families.extend(state.handler_metrics.gather());
            match render(families) {
                Ok(body) => (
                    StatusCode::OK,
                    [(CONTENT_TYPE, metrics::CONTENT_TYPE)],
                    body,
                )
                    .into_response(),
                Err(e) => internal_error(format!("Failed to encode metrics: {}", e)),
            }
        }
        Ok(Err(e)) => internal_error(format!("Failed to gather metrics: {}", e)),
        Err(e) => internal_error(format!("Collection task failed: {}", e)),
    };

    state.handler_metrics.record(response.status().as_u16());
    debug!(
        "Scrape finished: status={}, elapsed={:?}",
        response.status(),
        started.elapsed()
    );
    response
}
