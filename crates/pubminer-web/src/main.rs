//! PubMiner Web Server
//!
//! Run with: cargo run -p pubminer-web

use std::net::SocketAddr;

use pubminer_common::Config;
use pubminer_ingestion::QueryChain;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting PubMiner Web Server...");

    let config = Config::load()?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let chain = QueryChain::from_config(config.eutils)?;
    let app = pubminer_web::router::build_router(pubminer_web::state::AppState::new(chain));

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
