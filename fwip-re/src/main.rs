//! fwip-re - Routing Engine service
//!
//! Scores AI-extracted invoice fields, routes documents into processing
//! paths, and runs the self-learning loop: correction pattern analysis and
//! automatic rule rollback.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fwip_common::events::EventBus;
use fwip_common::params::EngineParams;
use fwip_re::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting fwip-re (Routing Engine) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve root folder and open the database
    let root_folder = fwip_common::config::resolve_root_folder(None);
    let db_path = fwip_common::config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Database: {}", db_path.display());

    let db_pool = fwip_re::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Parameters: compiled defaults overridden by the settings table.
    // An invalid parameter set refuses to start.
    let params = EngineParams::load(&db_pool).await?;
    info!(
        "Engine parameters loaded (auto-approve >= {}, quick-review >= {})",
        params.auto_approve_threshold, params.quick_review_threshold
    );

    let event_bus = EventBus::new(100);
    let state = AppState::new(db_pool, event_bus, params);

    // Background jobs
    fwip_re::scheduler::spawn_analyzer(state.clone());
    fwip_re::scheduler::spawn_rollback_monitor(state.clone());

    let app = fwip_re::build_router(state);

    let bind_address = fwip_common::config::load_toml_config(None)
        .unwrap_or_default()
        .bind_address
        .unwrap_or_else(|| "127.0.0.1:5741".to_string());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
