//! Test utilities.
//!
//! - [`StaticVerifier`]: a [`TokenVerifier`] backed by a fixed token table,
//!   optionally slowed down to exercise the gate's timeout.
//! - [`TestClient`]: drives a [`Dispatcher`] without HTTP or JSON-RPC
//!   plumbing.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use greeting_mcp::{Dispatcher, TestClient, tools};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(tools::default_registry().unwrap());
//! let mut client = TestClient::new(Dispatcher::new(registry));
//!
//! let init = client.initialize().await;
//! assert_eq!(init["protocolVersion"], "2025-06-18");
//!
//! let result = client.call_tool("greet_user", json!({"name": "Ada"})).await;
//! assert_eq!(result.all_text(), "Hi Ada, welcome to Scalekit!");
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::auth::{TokenClaims, TokenVerifier, VerifierError};
use crate::dispatch::Dispatcher;
use crate::error::JsonRpcError;
use crate::protocol::{CallToolResult, JsonRpcRequest, JsonRpcResponse};

/// Verifier that accepts exactly the tokens it was given.
#[derive(Debug, Clone, Default)]
pub struct StaticVerifier {
    tokens: Arc<HashMap<String, TokenClaims>>,
    delay: Option<Duration>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token`, yielding `claims`.
    pub fn token(mut self, token: impl Into<String>, claims: TokenClaims) -> Self {
        Arc::make_mut(&mut self.tokens).insert(token.into(), claims);
        self
    }

    /// Sleep before answering.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<TokenClaims, VerifierError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| VerifierError::Rejected("unknown token".to_string()))
    }
}

/// Dispatcher-level client for tests.
///
/// Request ids are assigned sequentially starting at 1. Methods that return
/// results panic on JSON-RPC errors; use [`send`](Self::send) to inspect
/// errors.
pub struct TestClient {
    dispatcher: Dispatcher,
    claims: Option<TokenClaims>,
    next_id: i64,
}

impl TestClient {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            claims: None,
            next_id: 1,
        }
    }

    /// Attach claims to every subsequent request, as the auth gate would.
    pub fn with_claims(mut self, claims: TokenClaims) -> Self {
        self.claims = Some(claims);
        self
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Send a request and return the full response envelope.
    pub async fn send(&mut self, method: &str, params: Option<Value>) -> JsonRpcResponse {
        let mut req = JsonRpcRequest::new(self.next_id(), method);
        if let Some(params) = params {
            req = req.with_params(params);
        }
        self.dispatcher.dispatch(req, self.claims.clone()).await
    }

    /// Send a request and return its result. Panics on error.
    pub async fn send_request(&mut self, method: &str, params: Option<Value>) -> Value {
        match self.send(method, params).await {
            JsonRpcResponse::Result(r) => r.result,
            JsonRpcResponse::Error(e) => {
                panic!("{} failed: {} ({})", method, e.error.message, e.error.code)
            }
        }
    }

    pub async fn initialize(&mut self) -> Value {
        self.send_request("initialize", None).await
    }

    /// The tools array from `tools/list`.
    pub async fn list_tools(&mut self) -> Vec<Value> {
        let result = self.send_request("tools/list", None).await;
        result
            .get("tools")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
    }

    /// Call a tool by name. Panics on JSON-RPC errors.
    pub async fn call_tool(&mut self, name: &str, args: Value) -> CallToolResult {
        let raw = self
            .send_request(
                "tools/call",
                Some(serde_json::json!({ "name": name, "arguments": args })),
            )
            .await;
        serde_json::from_value(raw).expect("failed to deserialize CallToolResult")
    }

    /// Call a tool and return the JSON-RPC error. Panics if the call succeeds.
    pub async fn call_tool_expect_error(&mut self, name: &str, args: Value) -> JsonRpcError {
        let response = self
            .send(
                "tools/call",
                Some(serde_json::json!({ "name": name, "arguments": args })),
            )
            .await;
        match response {
            JsonRpcResponse::Error(e) => e.error,
            JsonRpcResponse::Result(r) => {
                panic!("expected tool '{}' to fail, got {}", name, r.result)
            }
        }
    }
}
