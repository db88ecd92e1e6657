//! Server entry point.

use tracing_subscriber::EnvFilter;

use gbadge_api::auth::AuthConfig;
use gbadge_api::state::{AppConfig, AppState};
use gbadge_api::{app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env();

    let pool = match &config.database_url {
        Some(url) => {
            let pool = db::connect(url).await?;
            tracing::info!("connected to mirror database");
            Some(pool)
        }
        None => None,
    };

    let auth_config = match &config.api_token {
        Some(token) => AuthConfig::new(token.clone()),
        None => {
            tracing::warn!("API_TOKEN not set; authentication is disabled");
            AuthConfig::disabled()
        }
    };

    let state = AppState::new(&config, pool)?;
    let router = app(state, auth_config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, base_url = %config.public_base_url, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
