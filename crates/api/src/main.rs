use std::sync::Arc;

use anyhow::Context;

use clavis_api::app;
use clavis_api::config::AppConfig;
use clavis_infra::{PostgresClaimsStore, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clavis_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    run_migrations(&pool).await.context("migrations failed")?;

    let store = Arc::new(PostgresClaimsStore::new(pool));
    let bind_addr = config.bind_addr.clone();
    let app = app::build_app(config, store);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
