//! greeting-mcp server binary.
//!
//! Reads configuration from the environment (and `.env`), then serves until
//! Ctrl-C.

use std::sync::Arc;

use dotenvy::dotenv;
use greeting_mcp::{BoxError, Config, HttpServer, ScalekitVerifier, tools};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        port = config.port,
        base_url = %config.base_url(),
        discovery = %config.resource_server().discovery_path(),
        "Starting greeting MCP server"
    );

    let verifier = match ScalekitVerifier::new(config.scalekit_settings()) {
        Ok(verifier) => {
            tracing::info!(jwks_url = %verifier.jwks_url(), "Token verifier ready");
            Some(verifier)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Token verifier unavailable; protected requests will get 503"
            );
            None
        }
    };

    if config.metadata_document().is_none() {
        tracing::warn!("PROTECTED_RESOURCE_METADATA is not set; discovery will return 500");
    }

    let registry = Arc::new(tools::default_registry()?);
    tracing::info!(tools = registry.len(), "Tools registered");

    HttpServer::from_config(&config, registry, verifier)
        .serve(&config.bind_addr())
        .await?;

    Ok(())
}
