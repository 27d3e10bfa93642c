//! HTTP exposition endpoint
//!
//! Gathering runs the blocking scrape cycle, so it is moved off the async
//! workers with `spawn_blocking`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{error, info};

/// Encode every metric in `registry` in the text exposition format
pub fn render_metrics(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n<head><title>Pika Exporter v{version}</title></head>\n<body>\n\
         <h1>Pika Exporter v{version}</h1>\n\
         <p><a href='{path}'>Metrics</a></p>\n</body>\n</html>\n",
        version = env!("CARGO_PKG_VERSION"),
        path = telemetry_path,
    )
}

async fn metrics_handler(registry: Arc<Registry>) -> Response {
    let rendered = tokio::task::spawn_blocking(move || render_metrics(&registry)).await;
    match rendered {
        Ok(Ok(body)) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("# Error encoding metrics: {}", e)).into_response()
        }
        Err(e) => {
            error!("Metrics gathering task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Routes: `telemetry_path` serves metrics, `/` a landing page
pub fn router(registry: Arc<Registry>, telemetry_path: &str) -> Router {
    let page = landing_page(telemetry_path);
    Router::new()
        .route(
            telemetry_path,
            get(move || {
                let registry = registry.clone();
                async move { metrics_handler(registry).await }
            }),
        )
        .route("/", get(move || async move { Html(page) }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serve until Ctrl+C
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
