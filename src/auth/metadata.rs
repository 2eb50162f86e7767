//! Protected Resource Metadata (RFC 9728 Section 3).
//!
//! The metadata document is supplied verbatim through configuration and served
//! at `/.well-known/oauth-protected-resource<suffix>`. [`ResourceServer`] owns
//! both the route and the URL advertised in `WWW-Authenticate` challenges, so
//! the two cannot drift apart.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::www_authenticate;

/// Path prefix of the discovery endpoint.
pub const WELL_KNOWN_PATH: &str = "/.well-known/oauth-protected-resource";

/// Public identity of this resource server.
///
/// # Example
///
/// ```rust
/// use greeting_mcp::auth::ResourceServer;
///
/// let server = ResourceServer::new("http://localhost:3002").discovery_suffix("/mcp");
/// assert_eq!(server.discovery_path(), "/.well-known/oauth-protected-resource/mcp");
/// assert_eq!(
///     server.metadata_url(),
///     "http://localhost:3002/.well-known/oauth-protected-resource/mcp"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceServer {
    base_url: String,
    discovery_suffix: String,
}

impl ResourceServer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            discovery_suffix: String::new(),
        }
    }

    /// Set the path suffix appended to the well-known path (e.g. `/mcp`).
    ///
    /// A missing leading slash is added; a trailing slash is dropped.
    pub fn discovery_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        let suffix = suffix.trim_matches('/');
        self.discovery_suffix = if suffix.is_empty() {
            String::new()
        } else {
            format!("/{}", suffix)
        };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Route path the metadata document is mounted on.
    pub fn discovery_path(&self) -> String {
        format!("{}{}", WELL_KNOWN_PATH, self.discovery_suffix)
    }

    /// Absolute URL of the metadata document.
    pub fn metadata_url(&self) -> String {
        format!("{}{}", self.base_url, self.discovery_path())
    }

    /// Challenge sent with every authentication rejection.
    pub fn www_authenticate(&self) -> String {
        www_authenticate(&self.metadata_url())
    }
}

/// Typed view of a protected-resource metadata document.
///
/// Every field is optional on input; unknown fields land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization_servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bearer_methods_supported: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProtectedResourceMetadata {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            bearer_methods_supported: vec!["header".to_string()],
            ..Default::default()
        }
    }

    /// Add an authorization server issuer URL.
    pub fn authorization_server(mut self, issuer_url: impl Into<String>) -> Self {
        self.authorization_servers.push(issuer_url.into());
        self
    }

    /// Add a supported OAuth scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes_supported.push(scope.into());
        self
    }

    pub fn resource_documentation(mut self, url: impl Into<String>) -> Self {
        self.resource_documentation = Some(url.into());
        self
    }
}

/// Why the metadata document cannot be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("PROTECTED_RESOURCE_METADATA config missing")]
    Missing,

    #[error("Invalid metadata configuration")]
    Invalid,
}

impl IntoResponse for MetadataError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Serves the metadata document parsed once from configuration.
///
/// The parse outcome, document or error, is fixed for the provider's
/// lifetime.
#[derive(Debug, Clone)]
pub struct MetadataProvider {
    document: Result<Arc<Value>, MetadataError>,
}

impl MetadataProvider {
    /// Parse the raw configured document. `None` means unset.
    pub fn from_config(raw: Option<&str>) -> Self {
        let document = match raw {
            None => Err(MetadataError::Missing),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value @ Value::Object(_)) => Ok(Arc::new(value)),
                Ok(_) => {
                    tracing::error!("Protected resource metadata is not a JSON object");
                    Err(MetadataError::Invalid)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to parse protected resource metadata");
                    Err(MetadataError::Invalid)
                }
            },
        };
        Self { document }
    }

    /// Serve a programmatically built document.
    pub fn from_metadata(metadata: &ProtectedResourceMetadata) -> Self {
        let document = serde_json::to_value(metadata)
            .map(Arc::new)
            .map_err(|_| MetadataError::Invalid);
        Self { document }
    }

    /// The configured document, or why it is unavailable.
    pub fn get_metadata(&self) -> Result<Arc<Value>, MetadataError> {
        match &self.document {
            Ok(document) => {
                let view: ProtectedResourceMetadata =
                    serde_json::from_value(document.as_ref().clone()).unwrap_or_default();
                tracing::info!(
                    authorization_server = view.authorization_servers.first().map(String::as_str),
                    scopes_supported = ?view.scopes_supported,
                    "Serving protected resource metadata"
                );
                Ok(document.clone())
            }
            Err(e) => {
                tracing::error!(error = %e, "Protected resource metadata unavailable");
                Err(*e)
            }
        }
    }
}
