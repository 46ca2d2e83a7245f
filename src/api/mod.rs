//! HTTP server for the locallens application.
//!
//! One axum router carries the persistence API, the relay endpoints, and the
//! static front end. Method routing on `/articles` gives wrong-verb requests
//! their 405 without any hand-written check.

mod handlers;

pub use handlers::*;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::{ArticleStore, Config, GeocodeClient, LensError, NewsClient, Result};

/// Shared handles available to every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ArticleStore>,
    pub geocode: Arc<GeocodeClient>,
    pub news: Arc<NewsClient>,
}

impl AppState {
    pub fn new(store: Arc<ArticleStore>, geocode: GeocodeClient, news: NewsClient) -> Self {
        Self {
            store,
            geocode: Arc::new(geocode),
            news: Arc::new(news),
        }
    }
}

/// Builds the application router: API routes plus the static view layer.
pub fn create_router(state: AppState, assets_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/articles",
            post(save_article).get(list_articles).delete(delete_article),
        )
        .route("/api/geocode", get(geocode_address))
        .route("/api/news", get(local_news))
        .layer(cors)
        .fallback_service(ServeDir::new(assets_dir))
        .with_state(state)
}

/// Runs the HTTP server until a shutdown signal arrives.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let router = create_router(state, &config.assets_dir);
    let addr = config.listen_addr()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("API documentation:");
    info!("  POST   /articles - Save an article");
    info!("  GET    /articles?userId=<token> - List saved articles");
    info!("  DELETE /articles - Delete a saved article");
    info!("  GET    /api/geocode?address=<text> - Geocode an address");
    info!("  GET    /api/news?lat=<f>&lng=<f> - Local news for a position");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(LensError::Io)?;

    Ok(())
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
