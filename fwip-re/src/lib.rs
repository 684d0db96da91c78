//! fwip-re library interface
//!
//! Exposes the engine's services, storage, and router for integration
//! testing.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

use fwip_common::events::EventBus;
use fwip_common::params::EngineParams;

/// Application state shared across handlers and background jobs
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Engine parameters, resolved at startup (defaults + settings table)
    pub params: Arc<EngineParams>,
    /// Guards the analyzer: at most one batch in flight, whether scheduled
    /// or triggered through the API
    pub analyzer_lock: Arc<Mutex<()>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, params: EngineParams) -> Self {
        Self {
            db,
            event_bus,
            params: Arc::new(params),
            analyzer_lock: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::routing_routes())
        .merge(api::queue_routes())
        .merge(api::correction_routes())
        .merge(api::pattern_routes())
        .merge(api::rule_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
}
