//! The auth gate: decides whether an HTTP request may reach the dispatcher.
//!
//! [`AuthGate::evaluate`] holds the decision logic; [`AuthLayer`] and
//! [`AuthService`] apply it to every request flowing through an axum router
//! and inject the validated [`TokenClaims`] into request extensions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, header};
use axum::response::{IntoResponse, Response};
use tower::Layer;

use super::error::{AuthError, Rejection};
use super::metadata::ResourceServer;
use super::verifier::{TokenClaims, TokenVerifier};

/// Path of the unauthenticated health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Default upper bound on a single token verification.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of [`AuthGate::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    /// Proceed. Claims are present when a token was validated.
    Allow(Option<TokenClaims>),
    /// Stop here and answer with the rejection.
    Reject(Rejection),
}

/// Bearer-token gate in front of the JSON-RPC endpoints.
///
/// A `None` verifier means the identity provider could not be configured at
/// startup; protected requests are then refused with 503 instead of being
/// let through.
#[derive(Debug, Clone)]
pub struct AuthGate<V> {
    verifier: Option<V>,
    resource: ResourceServer,
    timeout: Duration,
}

impl<V: TokenVerifier> AuthGate<V> {
    pub fn new(verifier: Option<V>, resource: ResourceServer) -> Self {
        Self {
            verifier,
            resource,
            timeout: DEFAULT_VALIDATION_TIMEOUT,
        }
    }

    /// Set the verification timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn resource(&self) -> &ResourceServer {
        &self.resource
    }

    /// Whether a path bypasses authentication.
    pub fn is_public(path: &str) -> bool {
        path.contains("/.well-known/") || path == HEALTH_PATH
    }

    fn reject(&self, error: AuthError) -> AuthDecision {
        AuthDecision::Reject(Rejection::new(error, self.resource.www_authenticate()))
    }

    /// Decide whether a request to `path` with `headers` may proceed.
    ///
    /// Never fails: every verifier error becomes a rejection.
    pub async fn evaluate(&self, path: &str, headers: &HeaderMap) -> AuthDecision {
        if Self::is_public(path) {
            tracing::debug!(path, "Public path, skipping authentication");
            return AuthDecision::Allow(None);
        }

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let Some(token) = token else {
            tracing::warn!(path, "Missing bearer token");
            return self.reject(AuthError::MissingToken);
        };

        let Some(verifier) = &self.verifier else {
            tracing::error!(path, "Token verifier unavailable");
            return self.reject(AuthError::ServiceUnavailable);
        };

        tracing::debug!(path, token_len = token.len(), "Validating bearer token");

        match tokio::time::timeout(self.timeout, verifier.verify(token)).await {
            Ok(Ok(claims)) => {
                tracing::info!(
                    path,
                    sub = claims.sub.as_deref(),
                    client_id = claims.client_id.as_deref(),
                    "Token validated"
                );
                AuthDecision::Allow(Some(claims))
            }
            Ok(Err(e)) => {
                tracing::warn!(path, error = %e, "Token validation failed");
                self.reject(AuthError::InvalidToken)
            }
            Err(_) => {
                tracing::warn!(
                    path,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Token validation timed out"
                );
                self.reject(AuthError::Timeout)
            }
        }
    }
}

/// Tower layer that runs every request through an [`AuthGate`].
///
/// # Example
///
/// ```rust
/// use greeting_mcp::auth::{
///     AuthGate, AuthLayer, ResourceServer, ScalekitSettings, ScalekitVerifier,
/// };
///
/// let verifier = ScalekitVerifier::new(ScalekitSettings {
///     env_url: "https://acme.scalekit.dev".into(),
///     client_id: "skc_123".into(),
///     client_secret: "secret".into(),
///     expected_audience: "http://localhost:3002/".into(),
/// })
/// .ok();
/// let gate = AuthGate::new(verifier, ResourceServer::new("http://localhost:3002"));
/// let app: axum::Router = axum::Router::new().layer(AuthLayer::new(gate));
/// ```
#[derive(Debug, Clone)]
pub struct AuthLayer<V> {
    gate: Arc<AuthGate<V>>,
}

impl<V: TokenVerifier> AuthLayer<V> {
    pub fn new(gate: AuthGate<V>) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}

impl<S, V: TokenVerifier> Layer<S> for AuthLayer<V> {
    type Service = AuthService<S, V>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Tower service created by [`AuthLayer`].
///
/// Rejected requests are answered directly; allowed ones continue to the
/// inner service with their claims in the request extensions.
#[derive(Debug, Clone)]
pub struct AuthService<S, V> {
    inner: S,
    gate: Arc<AuthGate<V>>,
}

impl<S, V> tower_service::Service<Request<Body>> for AuthService<S, V>
where
    S: tower_service::Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    V: TokenVerifier,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        // Use the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let path = req.uri().path().to_string();
            let decision = gate.evaluate(&path, req.headers()).await;
            match decision {
                AuthDecision::Allow(claims) => {
                    if let Some(claims) = claims {
                        req.extensions_mut().insert(claims);
                    }
                    inner.call(req).await
                }
                AuthDecision::Reject(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}
