//! RPC dispatcher - routes parsed JSON-RPC requests to their handlers
//!
//! The [`Dispatcher`] implements Tower's `Service` trait over
//! [`DispatchRequest`], so it composes with middleware such as
//! [`McpTracingLayer`](crate::McpTracingLayer). Failures never surface as
//! service errors; they are carried in [`DispatchResponse::inner`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::Serialize;
use serde_json::Value;
use tower_service::Service;

use crate::auth::{ScopeRequirement, TokenClaims};
use crate::error::JsonRpcError;
use crate::protocol::{
    CallToolParams, EmptyResult, Implementation, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, LATEST_PROTOCOL_VERSION, ListToolsResult, LoggingCapability, McpMethod,
    RequestId, ServerCapabilities, ToolsCapability,
};
use crate::registry::ToolRegistry;

/// A request on its way into the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub id: RequestId,
    pub method: McpMethod,
    /// Claims of the validated caller, if the request was authenticated.
    pub claims: Option<TokenClaims>,
}

/// The dispatcher's answer, paired with the id it answers.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub id: RequestId,
    pub inner: Result<Value, JsonRpcError>,
}

impl DispatchResponse {
    pub fn into_jsonrpc(self) -> JsonRpcResponse {
        match self.inner {
            Ok(result) => JsonRpcResponse::result(self.id, result),
            Err(error) => JsonRpcResponse::error(self.id, error),
        }
    }
}

/// Routes `initialize`, `tools/list` and `tools/call`; acknowledges anything
/// else with an empty result.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use greeting_mcp::{Dispatcher, JsonRpcRequest, tools};
///
/// # tokio_test_block_on(async {
/// let registry = Arc::new(tools::default_registry().unwrap());
/// let dispatcher = Dispatcher::new(registry).server_info("Greeting MCP", "1.0.0");
///
/// let response = dispatcher
///     .dispatch(JsonRpcRequest::new(1, "initialize"), None)
///     .await;
/// assert!(response.as_error().is_none());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: Implementation,
    enforce_scopes: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_info: Implementation::new("greeting-mcp", env!("CARGO_PKG_VERSION")),
            enforce_scopes: true,
        }
    }

    /// Set the name and version reported by `initialize`.
    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_info = Implementation::new(name, version);
        self
    }

    /// Enable or disable per-tool scope checks (on by default).
    pub fn enforce_scopes(mut self, enforce: bool) -> Self {
        self.enforce_scopes = enforce;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn info(&self) -> &Implementation {
        &self.server_info
    }

    /// Dispatch a full JSON-RPC envelope.
    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        claims: Option<TokenClaims>,
    ) -> JsonRpcResponse {
        let id = request.id.clone();
        let method = match McpMethod::from_jsonrpc(&request) {
            Ok(method) => method,
            Err(e) => {
                tracing::error!(method = %request.method, error = %e, "Invalid request params");
                return JsonRpcResponse::error(id, JsonRpcError::internal_error());
            }
        };

        let response = self.handle(method, claims.as_ref()).await;
        DispatchResponse {
            id,
            inner: response,
        }
        .into_jsonrpc()
    }

    async fn handle(
        &self,
        method: McpMethod,
        claims: Option<&TokenClaims>,
    ) -> Result<Value, JsonRpcError> {
        match method {
            McpMethod::Initialize => {
                tracing::info!("Handling initialize request");
                to_result(&InitializeResult {
                    protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
                    capabilities: ServerCapabilities {
                        logging: Some(LoggingCapability::default()),
                        tools: Some(ToolsCapability::default()),
                    },
                    server_info: self.server_info.clone(),
                })
            }
            McpMethod::ListTools => {
                tracing::info!("Handling tools/list request");
                to_result(&ListToolsResult {
                    tools: self.registry.list().map(|t| t.definition()).collect(),
                })
            }
            McpMethod::CallTool(params) => self.call_tool(params, claims).await,
            McpMethod::Other(method) => {
                tracing::debug!(method = %method, "Acknowledging unhandled method");
                to_result(&EmptyResult::default())
            }
        }
    }

    async fn call_tool(
        &self,
        params: CallToolParams,
        claims: Option<&TokenClaims>,
    ) -> Result<Value, JsonRpcError> {
        tracing::info!(tool = %params.name, "Handling tools/call request");

        let tool = self.registry.get(&params.name).ok_or_else(|| {
            tracing::warn!(tool = %params.name, "Tool not found");
            JsonRpcError::tool_not_found()
        })?;

        if let Some(claims) = claims.filter(|_| self.enforce_scopes) {
            let requirement = ScopeRequirement::all(tool.required_scopes.iter().cloned());
            if let Err(missing) = requirement.check(claims) {
                tracing::warn!(tool = %tool.name, missing = ?missing, "Insufficient scope");
                return Err(JsonRpcError::insufficient_scope(&missing));
            }
        }

        let handler = tool.handler().ok_or_else(|| {
            tracing::warn!(tool = %tool.name, "Tool has no handler");
            JsonRpcError::tool_not_registered()
        })?;

        match handler.call(params.arguments).await {
            Ok(result) => {
                tracing::info!(tool = %tool.name, "Tool execution completed");
                to_result(&result)
            }
            Err(e) => {
                tracing::error!(tool = %tool.name, error = %e, "Tool execution failed");
                Err(JsonRpcError::internal_error())
            }
        }
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize result");
        JsonRpcError::internal_error()
    })
}

impl Service<DispatchRequest> for Dispatcher {
    type Response = DispatchResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<DispatchResponse, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: DispatchRequest) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move {
            let inner = dispatcher.handle(req.method, req.claims.as_ref()).await;
            Ok(DispatchResponse { id: req.id, inner })
        })
    }
}
