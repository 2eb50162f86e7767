//! HTTP transport for the greeting server
//!
//! Serves JSON-RPC 2.0 over plain `POST` (no SSE, no sessions) on `/` and
//! `/mcp`, plus the unauthenticated health and discovery endpoints. Every
//! request passes through CORS, then the [`AuthLayer`], then the handler.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use greeting_mcp::{Config, HttpServer, ScalekitVerifier, tools};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), greeting_mcp::BoxError> {
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

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower::{Layer, ServiceExt};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::gate::HEALTH_PATH;
use crate::auth::{AuthGate, AuthLayer, MetadataProvider, TokenClaims, TokenVerifier};
use crate::config::{Config, SERVER_NAME, SERVER_VERSION};
use crate::dispatch::{DispatchRequest, Dispatcher};
use crate::error::{Error, JsonRpcError, Result};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, McpMethod, RequestId};
use crate::registry::ToolRegistry;
use crate::tracing_layer::{McpTracingLayer, McpTracingService};

/// Largest request body accepted on the JSON-RPC endpoints.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// How long browsers may cache a CORS preflight answer.
const CORS_MAX_AGE: Duration = Duration::from_secs(86400);

/// Paths the JSON-RPC endpoint is mounted on.
pub const RPC_PATHS: [&str; 2] = ["/", "/mcp"];

struct AppState {
    service: McpTracingService<Dispatcher>,
    metadata: MetadataProvider,
    server_name: String,
    server_version: String,
}

/// Assembles the axum application.
///
/// The discovery route is taken from the gate's
/// [`ResourceServer`](crate::auth::ResourceServer), the same value that
/// produces the `WWW-Authenticate` challenge.
pub struct HttpServer<V> {
    dispatcher: Dispatcher,
    metadata: MetadataProvider,
    gate: AuthGate<V>,
    tracing: McpTracingLayer,
}

impl<V: TokenVerifier> HttpServer<V> {
    pub fn new(dispatcher: Dispatcher, metadata: MetadataProvider, gate: AuthGate<V>) -> Self {
        Self {
            dispatcher,
            metadata,
            gate,
            tracing: McpTracingLayer::new(),
        }
    }

    /// Wire everything from configuration. A `None` verifier makes every
    /// protected request fail with 503.
    pub fn from_config(config: &Config, registry: Arc<ToolRegistry>, verifier: Option<V>) -> Self {
        let dispatcher = Dispatcher::new(registry)
            .server_info(SERVER_NAME, SERVER_VERSION)
            .enforce_scopes(config.enforce_tool_scopes);
        let metadata = MetadataProvider::from_config(config.metadata_document());
        let gate =
            AuthGate::new(verifier, config.resource_server()).timeout(config.validation_timeout());
        Self::new(dispatcher, metadata, gate)
    }

    /// Replace the request tracing layer (e.g. to warn about slow requests).
    pub fn tracing(mut self, layer: McpTracingLayer) -> Self {
        self.tracing = layer;
        self
    }

    /// Build the axum router with auth and CORS applied.
    pub fn into_router(self) -> Router {
        let discovery_path = self.gate.resource().discovery_path();
        let info = self.dispatcher.info().clone();

        let state = Arc::new(AppState {
            service: self.tracing.layer(self.dispatcher),
            metadata: self.metadata,
            server_name: info.name,
            server_version: info.version,
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                HeaderName::from_static("mcp-protocol-version"),
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
            ])
            .expose_headers([header::WWW_AUTHENTICATE])
            .max_age(CORS_MAX_AGE);

        let mut router = Router::new()
            .route(&discovery_path, get(handle_metadata))
            .route(HEALTH_PATH, get(handle_health));
        for path in RPC_PATHS {
            router = router.route(path, post(handle_post));
        }

        router
            .with_state(state)
            .layer(AuthLayer::new(self.gate))
            .layer(cors)
    }

    /// Serve until the process receives Ctrl-C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        self.serve_with_shutdown(addr, async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, addr: &str, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!("MCP HTTP server listening on {}", addr);

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| Error::Transport(format!("Server error: {}", e)))?;

        tracing::info!("MCP HTTP server stopped");
        Ok(())
    }
}

async fn handle_metadata(State(state): State<Arc<AppState>>) -> Response {
    match state.metadata.get_metadata() {
        Ok(document) => axum::Json(document.as_ref().clone()).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "server": state.server_name,
        "version": state.server_version,
    }))
    .into_response()
}

fn internal_error(id: RequestId) -> Response {
    let body = JsonRpcResponse::error(id, JsonRpcError::internal_error());
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}

async fn handle_post(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let claims = req.extensions().get::<TokenClaims>().cloned();

    let body = match axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read request body");
            return internal_error(RequestId::default());
        }
    };

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse JSON-RPC request");
            return internal_error(RequestId::recover(&String::from_utf8_lossy(&body)));
        }
    };

    let method = match McpMethod::from_jsonrpc(&request) {
        Ok(method) => method,
        Err(e) => {
            tracing::error!(method = %request.method, error = %e, "Invalid request params");
            return internal_error(request.id);
        }
    };

    let dispatch = DispatchRequest {
        id: request.id,
        method,
        claims,
    };
    let response = match state.service.clone().oneshot(dispatch).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let status = match &response.inner {
        Err(e) if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, axum::Json(response.into_jsonrpc())).into_response()
}
