//! HTTP API for the news feed.
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/api/news/` | `{ news, total_count, last_updated }`, optional `?category=` |
//! | GET | `/api/news/{id}/` | one [`NewsItem`] or 404 `{ "error": "News article not found" }` |
//! | GET | `/api/health/` | `{ "status": "ok" }` |
//!
//! Paths are served with and without the trailing slash. A panic inside a
//! handler becomes a 500 with the panic message in the error body.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, Method, Request, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::aggregator::NewsAggregator;
use crate::config::ServerConfig;
use crate::error::{AppError, LookupError};
use crate::models::{ErrorBody, NewsItem, NewsListResponse};

/// Category value meaning "no filter", as used by the frontend tabs.
const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

/// Build the application router around a shared aggregator.
pub fn router(aggregator: Arc<NewsAggregator>, server: &ServerConfig) -> Router {
    let routes = Router::new()
        .route("/api/news", get(list_news))
        .route("/api/news/", get(list_news))
        .route("/api/news/{id}", get(news_detail))
        .route("/api/news/{id}/", get(news_detail))
        .route("/api/health", get(health))
        .route("/api/health/", get(health))
        .with_state(aggregator);
    with_middleware(routes, server)
}

/// Wrap `routes` in the service middleware: panic-to-500, CORS and request tracing.
///
/// # Arguments
///
/// * `routes` - Fully routed application, state already applied
/// * `server` - Supplies the CORS allow-list; invalid origins are logged and skipped
pub fn with_middleware(routes: Router, server: &ServerConfig) -> Router {
    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

async fn list_news(
    State(aggregator): State<Arc<NewsAggregator>>,
    Query(query): Query<NewsQuery>,
) -> Json<NewsListResponse> {
    let run = aggregator.run_at(Utc::now()).await;
    let news = filter_category(run.items, query.category.as_deref());
    Json(NewsListResponse::new(news, run.generated_at))
}

async fn news_detail(
    State(aggregator): State<Arc<NewsAggregator>>,
    Path(id): Path<String>,
) -> Result<Json<NewsItem>, AppError> {
    let index: i64 = id.trim().parse().map_err(|_| LookupError::NotFound)?;
    let item = aggregator.get_by_id(index).await?;
    Ok(Json(item))
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// Keep only items in `category`; `None`, empty and "All" keep everything.
pub fn filter_category(items: Vec<NewsItem>, category: Option<&str>) -> Vec<NewsItem> {
    match category.map(str::trim) {
        None | Some("") => items,
        Some(c) if c.eq_ignore_ascii_case(ALL_CATEGORIES) => items,
        Some(c) => items.into_iter().filter(|item| item.in_category(c)).collect(),
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };
    error!(%message, "Handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(message))).into_response()
}

/// Bind `server.address()` and serve until Ctrl+C or SIGTERM.
pub async fn serve(aggregator: Arc<NewsAggregator>, server: &ServerConfig) -> std::io::Result<()> {
    let app = router(aggregator, server);

    let address = server.address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
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
}
