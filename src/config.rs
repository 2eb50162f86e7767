//! Server configuration loaded from the environment.
//!
//! Variables are read without a prefix (`PORT`, `SK_ENV_URL`, ...). The
//! binary loads a `.env` file first, so local development can keep them
//! there.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::auth::{ResourceServer, ScalekitSettings};
use crate::secret::SecretString;

/// Name reported in `initialize` and `/health`.
pub const SERVER_NAME: &str = "Greeting MCP";

/// Version reported in `initialize` and `/health`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Why the configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn default_port() -> u16 {
    3002
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Default `tracing` filter directive.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Scalekit environment URL; also the token issuer.
    #[serde(default)]
    pub sk_env_url: String,

    #[serde(default)]
    pub sk_client_id: String,

    #[serde(default)]
    pub sk_client_secret: SecretString,

    /// Defaults to `http://localhost:<port>/`.
    #[serde(default)]
    pub expected_audience: Option<String>,

    /// Raw protected-resource metadata JSON served at the discovery route.
    #[serde(default)]
    pub protected_resource_metadata: Option<String>,

    /// Externally visible base URL. Defaults to `http://localhost:<port>`.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Appended to `/.well-known/oauth-protected-resource`.
    #[serde(default)]
    pub discovery_suffix: String,

    #[serde(default = "default_timeout_secs")]
    pub token_validation_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub enforce_tool_scopes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            log_level: default_log_level(),
            sk_env_url: String::new(),
            sk_client_id: String::new(),
            sk_client_secret: SecretString::default(),
            expected_audience: None,
            protected_resource_metadata: None,
            public_base_url: None,
            discovery_suffix: String::new(),
            token_validation_timeout_secs: default_timeout_secs(),
            enforce_tool_scopes: true,
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::from_env::<Config>()?.validated()
    }

    /// Load from explicit key/value pairs.
    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)?.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.sk_client_secret =
            SecretString::with_label(self.sk_client_secret.expose(), "SK_CLIENT_SECRET");

        if self.token_validation_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "TOKEN_VALIDATION_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(url) = non_blank(&self.public_base_url) {
            Url::parse(url).map_err(|e| ConfigError::Invalid {
                field: "PUBLIC_BASE_URL",
                reason: e.to_string(),
            })?;
        }
        Ok(self)
    }

    /// Address the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        non_blank(&self.public_base_url)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn audience(&self) -> String {
        non_blank(&self.expected_audience)
            .map(String::from)
            .unwrap_or_else(|| format!("http://localhost:{}/", self.port))
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.token_validation_timeout_secs)
    }

    /// The configured metadata document; blank counts as unset.
    pub fn metadata_document(&self) -> Option<&str> {
        non_blank(&self.protected_resource_metadata)
    }

    pub fn resource_server(&self) -> ResourceServer {
        ResourceServer::new(self.base_url()).discovery_suffix(self.discovery_suffix.as_str())
    }

    pub fn scalekit_settings(&self) -> ScalekitSettings {
        ScalekitSettings {
            env_url: self.sk_env_url.clone(),
            client_id: self.sk_client_id.clone(),
            client_secret: self.sk_client_secret.clone(),
            expected_audience: self.audience(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
