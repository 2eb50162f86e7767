//! # greeting-mcp
//!
//! A minimal OAuth-protected [Model Context Protocol](https://modelcontextprotocol.io)
//! server exposing a single tool, `greet_user`, over JSON-RPC 2.0 on HTTP.
//!
//! Every request flows through the same pipeline:
//!
//! ```text
//! HTTP request
//!   -> CORS
//!   -> AuthLayer (allow, or 401/503/504 with WWW-Authenticate)
//!   -> McpTracingLayer
//!   -> Dispatcher (initialize | tools/list | tools/call | anything else -> {})
//!   -> ToolRegistry lookup -> handler
//!   -> JSON-RPC response
//! ```
//!
//! Bearer tokens are validated by a [`TokenVerifier`]; the production
//! [`ScalekitVerifier`] checks JWTs against the identity provider's published
//! signing keys. Clients discover the authorization server through the
//! protected-resource metadata served at `/.well-known/oauth-protected-resource`
//! (RFC 9728).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use greeting_mcp::{BoxError, Config, HttpServer, ScalekitVerifier, tools};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BoxError> {
//!     let config = Config::from_env()?;
//!     let verifier = ScalekitVerifier::new(config.scalekit_settings()).ok();
//!     let registry = Arc::new(tools::default_registry()?);
//!
//!     HttpServer::from_config(&config, registry, verifier)
//!         .serve(&config.bind_addr())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Dispatching Without HTTP
//!
//! ```rust
//! use std::sync::Arc;
//! use greeting_mcp::{Dispatcher, JsonRpcRequest, tools};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::new(Arc::new(tools::default_registry().unwrap()));
//! let request = JsonRpcRequest::new(1, "tools/call")
//!     .with_params(json!({"name": "greet_user", "arguments": {}}));
//! let response = dispatcher.dispatch(request, None).await;
//! assert!(response.as_error().is_none());
//! # }
//! ```
//!
//! With the `testing` feature, [`testing::TestClient`] and
//! [`testing::StaticVerifier`] drive the dispatcher and the auth gate in
//! tests.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod secret;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tool;
pub mod tools;
pub mod tracing_layer;
pub mod transport;

// Re-exports
pub use auth::{
    AuthDecision, AuthError, AuthGate, AuthLayer, MetadataError, MetadataProvider,
    ProtectedResourceMetadata, ResourceServer, ScalekitSettings, ScalekitVerifier, TokenClaims,
    TokenVerifier, VerifierError,
};
pub use config::{Config, ConfigError};
pub use dispatch::{DispatchRequest, DispatchResponse, Dispatcher};
pub use error::{BoxError, Error, ErrorCode, JsonRpcError, Result};
pub use protocol::{
    CallToolParams, CallToolResult, Content, Implementation, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, LATEST_PROTOCOL_VERSION, ListToolsResult, McpMethod, RequestId,
    ToolDefinition,
};
pub use registry::ToolRegistry;
pub use secret::SecretString;
pub use tool::{Tool, ToolBuilder, ToolHandler};
pub use tracing_layer::{McpTracingLayer, McpTracingService};
pub use transport::HttpServer;

#[cfg(any(test, feature = "testing"))]
pub use testing::{StaticVerifier, TestClient};
