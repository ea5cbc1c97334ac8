pub mod handlers;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::error::AppError;
use crate::store::SqliteRepository;

/// Shared state behind the router. The store sits behind a mutex; handlers
/// take the lock, do their synchronous read/append work, and release it
/// before the response is serialized, so the lock never spans an await.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<SqliteRepository>>,
}

impl AppState {
    pub fn new(store: SqliteRepository) -> AppState {
        AppState {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn store(&self) -> Result<MutexGuard<'_, SqliteRepository>, AppError> {
        self.store
            .lock()
            .map_err(|_| AppError::internal("repository lock poisoned"))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/attendance/export", get(handlers::reports::export_summary))
        .route("/reports/generate", post(handlers::reports::generate_report))
        .route("/reports/download", post(handlers::reports::download_report))
        .route("/reports/stats", get(handlers::reports::report_stats))
        .route("/stats/completion-rate", get(handlers::stats::completion_rate))
        .route("/stats/dashboard", get(handlers::stats::dashboard))
        .route("/stats/weekly-trend", get(handlers::stats::weekly_trend))
        .route("/stats/today-lectures", get(handlers::stats::today_lectures))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
