use sea_orm::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront::entities::{primary_settup, setup_schema};
use storefront::services::SandboxGateway;
use storefront::{create_api_router, Config, Shop};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    setup_schema(&db).await?;
    primary_settup(&db, config.seed_password.as_deref()).await?;

    let shop = Arc::new(Shop::new(db, Arc::new(SandboxGateway), config.policy.clone()));
    let app = create_api_router(shop, Arc::from(config.secret.as_str()));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Running");
    axum::serve(listener, app).await?;
    Ok(())
}
