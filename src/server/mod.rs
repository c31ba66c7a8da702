//! HTTP server: shared state, routing and startup

mod handlers;
pub mod response;
mod socket;

use crate::config::ServerConfig;
use crate::pdf::pdfium_available;
use crate::progress::{ProgressHub, ProgressReporter, SESSION_HEADER};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub progress: ProgressHub,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            progress: ProgressHub::new(),
        }
    }

    /// Progress reporter for the session named in the request headers
    pub fn reporter(&self, headers: &HeaderMap) -> ProgressReporter {
        let sid = headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|sid| !sid.is_empty());
        self.progress.reporter(sid)
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/merge", post(handlers::merge))
        .route("/split", post(handlers::split))
        .route("/compress", post(handlers::compress))
        .route("/pdf-to-jpg", post(handlers::pdf_to_jpg))
        .route("/images-to-pdf", post(handlers::images_to_pdf))
        .route("/protect", post(handlers::protect))
        .route("/add-watermark", post(handlers::add_watermark))
        .route("/download/{filename}", get(handlers::download))
        .route("/health", get(handlers::health_check))
        .route("/ws", get(socket::socket_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.workspace_root).await?;
    tokio::fs::create_dir_all(&config.processed_dir).await?;

    if !pdfium_available() {
        tracing::warn!("PDFium library not found, image conversion and watermarking will fail");
    }

    let addr = config.bind_addr().await?;
    let app = router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "PDF tools server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("PDF tools server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_reporter_from_header() {
        let state = AppState::new(ServerConfig::default());
        let (sid, _rx) = state.progress.register();

        let mut headers = HeaderMap::new();
        assert_eq!(state.reporter(&headers).sid(), None);

        headers.insert(SESSION_HEADER, HeaderValue::from_str(&sid).unwrap());
        assert_eq!(state.reporter(&headers).sid(), Some(sid.as_str()));

        headers.insert(SESSION_HEADER, HeaderValue::from_static("   "));
        assert_eq!(state.reporter(&headers).sid(), None);
    }
}
