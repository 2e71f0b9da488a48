use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vagafacil::{auth, config::Config, db, state::AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    db::migrate(&pool).await?;

    if let Some(seed) = &config.admin_seed {
        auth::ensure_admin(&pool, seed).await?;
    }
    if db::count_admins(&pool).await? == 0 {
        tracing::warn!("no admin account; set ADMIN_EMAIL and ADMIN_PASSWORD to create one");
    }

    if db::get_configuration(&pool).await?.is_none() {
        tracing::info!("configuration not set yet; visitors will see defaults");
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let app_state = AppState {
        pool,
        config: Arc::new(config),
    };
    let app = vagafacil::app(app_state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
