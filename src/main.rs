use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info, warn};

use guardpost::{
    config::Config,
    create_router,
    database::{create_database_pool, run_migrations},
    store::{MemoryStore, PgStore, Store},
    utils::TokenKeys,
    AppState,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    if let Err(e) = run().await {
        error!("guardpost failed to start: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_database_pool(url, config.database_max_connections).await?;
            run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set, keeping all data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let tokens = TokenKeys::new(&config.jwt_secret, config.access_token_expire_minutes);
    let app = create_router(AppState::new(store, tokens), config.cors_origin.as_deref());

    let addr = config.bind_address();
    info!("guardpost listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
