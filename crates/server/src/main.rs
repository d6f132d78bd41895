//! folio-server entry point.
//!
//! Serves calendar export status/download and stored media over HTTP.
//! Logs are JSON on stderr.

use anyhow::Result;
use folio_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod auth;
mod error;
mod routes;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let state = AppState::from_config(&config).await?;
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, db = %config.db_path.display(), "folio-server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
