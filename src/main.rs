use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vempain_website::auth::SystemClock;
use vempain_website::build_router;
use vempain_website::config::{config, server_port};
use vempain_website::database::repository::{PgAclStore, PgPageStore, PgTokenStore, PgUserStore};
use vempain_website::database::DatabaseManager;
use vempain_website::state::{AppState, Stores};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config();

    let default_filter = if vempain_website::is_development!() {
        "vempain_website=debug,tower_http=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    info!("Starting Vempain website backend in {:?} mode", config.environment);

    if config.auth.uses_fallback_secret() {
        warn!("!!! JWT_SECRET is not set; sessions are signed with the well-known fallback secret !!!");
        if vempain_website::is_production!() {
            warn!("!!! Running in production with the fallback secret: any client can forge tokens !!!");
        }
    }

    let database = DatabaseManager::connect(&config.database).await?;
    let pool = database.pool().clone();
    let stores = Stores {
        tokens: Arc::new(PgTokenStore::new(pool.clone())),
        acls: Arc::new(PgAclStore::new(pool.clone())),
        pages: Arc::new(PgPageStore::new(pool.clone())),
        users: Arc::new(PgUserStore::new(pool)),
    };

    let state = AppState::new(config, stores, Arc::new(SystemClock));
    if state.debug_routes_enabled() {
        info!("Debug routes enabled at /api/debug/*");
    }
    let app = build_router(state, &config.security);

    let bind_addr = format!("0.0.0.0:{}", server_port());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Vempain website backend listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    database.close().await;
    Ok(())
}
