//! OAuth 2.1 resource-server support.
//!
//! The server validates bearer tokens issued by an external authorization
//! server (Scalekit) and publishes Protected Resource Metadata so clients can
//! discover where to obtain them.
//!
//! - [`ResourceServer`] / [`MetadataProvider`]: the discovery endpoint and
//!   the `WWW-Authenticate` challenge that points at it (RFC 9728).
//! - [`TokenVerifier`] / [`ScalekitVerifier`]: token validation.
//! - [`AuthGate`] / [`AuthLayer`]: the per-request allow/reject decision.
//! - [`ScopeRequirement`]: per-tool scope checks applied by the dispatcher.
//!
//! # Discovery Flow
//!
//! 1. Client calls the MCP endpoint without a token
//! 2. Server returns `401` with `WWW-Authenticate: Bearer realm="OAuth", resource_metadata="..."`
//! 3. Client fetches the metadata document to find the authorization server
//! 4. Client obtains a token and retries with `Authorization: Bearer <token>`

pub mod error;
pub mod gate;
pub mod metadata;
pub mod scope;
pub mod verifier;

pub use error::{AuthError, Rejection};
pub use gate::{AuthDecision, AuthGate, AuthLayer, AuthService};
pub use metadata::{MetadataError, MetadataProvider, ProtectedResourceMetadata, ResourceServer};
pub use scope::ScopeRequirement;
pub use verifier::{
    ScalekitSettings, ScalekitVerifier, ScalekitVerifierBuilder, TokenAudience, TokenClaims,
    TokenVerifier, VerifierError,
};
