//! MCP protocol types based on JSON-RPC 2.0
//!
//! Only the slice of MCP this server speaks: `initialize`, `tools/list`,
//! `tools/call`, and a permissive acknowledgement for everything else.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, JsonRpcError};

/// The JSON-RPC version. MUST be "2.0".
pub const JSONRPC_VERSION: &str = "2.0";

/// The MCP protocol version announced by `initialize`.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Request id used when the client omitted one or it could not be recovered.
pub const DEFAULT_REQUEST_ID: i64 = 1;

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// JSON-RPC 2.0 response (success)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResultResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

/// JSON-RPC 2.0 response (error)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JsonRpcError,
}

/// JSON-RPC 2.0 response (either success or error)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponse {
    Result(JsonRpcResultResponse),
    Error(JsonRpcErrorResponse),
}

impl JsonRpcResponse {
    pub fn result(id: RequestId, result: Value) -> Self {
        Self::Result(JsonRpcResultResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        })
    }

    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self::Error(JsonRpcErrorResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error,
        })
    }

    pub fn id(&self) -> &RequestId {
        match self {
            JsonRpcResponse::Result(r) => &r.id,
            JsonRpcResponse::Error(e) => &e.id,
        }
    }

    /// Returns the error object, if this is an error response.
    pub fn as_error(&self) -> Option<&JsonRpcError> {
        match self {
            JsonRpcResponse::Result(_) => None,
            JsonRpcResponse::Error(e) => Some(&e.error),
        }
    }
}

/// Request ID - string, any JSON number, or an explicit `null`.
///
/// Numbers keep their original representation so floats and values beyond
/// `i64` are echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(serde_json::Number),
    Null,
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId::Number(DEFAULT_REQUEST_ID.into())
    }
}

impl RequestId {
    /// Best-effort recovery of the id from a raw body that failed to parse
    /// as a full request. Falls back to the default sentinel.
    pub fn recover(body: &str) -> Self {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("id").cloned())
            .and_then(|id| serde_json::from_value(id).ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Null => f.write_str("null"),
        }
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

impl From<i32> for RequestId {
    fn from(n: i32) -> Self {
        RequestId::Number(n.into())
    }
}

// =============================================================================
// MCP methods
// =============================================================================

/// Method names understood by the dispatcher
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

/// High-level MCP request (parsed from a JSON-RPC envelope)
#[derive(Debug, Clone, PartialEq)]
pub enum McpMethod {
    /// Initialize session
    Initialize,
    /// List available tools
    ListTools,
    /// Call a tool
    CallTool(CallToolParams),
    /// Any other method; acknowledged with an empty result
    Other(String),
}

impl McpMethod {
    /// Parse the method and its params from a JSON-RPC request.
    ///
    /// Only `tools/call` inspects params; malformed params there are an error.
    pub fn from_jsonrpc(req: &JsonRpcRequest) -> Result<Self, Error> {
        match req.method.as_str() {
            methods::INITIALIZE => Ok(McpMethod::Initialize),
            methods::TOOLS_LIST => Ok(McpMethod::ListTools),
            methods::TOOLS_CALL => {
                let params = match &req.params {
                    Some(Value::Null) | None => CallToolParams::default(),
                    Some(params) => serde_json::from_value(params.clone())?,
                };
                Ok(McpMethod::CallTool(params))
            }
            other => Ok(McpMethod::Other(other.to_string())),
        }
    }

    pub fn method_name(&self) -> &str {
        match self {
            McpMethod::Initialize => methods::INITIALIZE,
            McpMethod::ListTools => methods::TOOLS_LIST,
            McpMethod::CallTool(_) => methods::TOOLS_CALL,
            McpMethod::Other(method) => method,
        }
    }
}

/// The `{}` result
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmptyResult {}

// =============================================================================
// Initialize
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Logging capability declaration
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoggingCapability {}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

// =============================================================================
// Tools
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDefinition>,
}

/// Tool definition as returned by tools/list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CallToolParams {
    /// Empty when the client sent no name or a non-string one; no tool can
    /// be registered under the empty name.
    #[serde(default, deserialize_with = "lenient_tool_name")]
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

fn lenient_tool_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(name) => Ok(name),
        _ => Ok(String::new()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Concatenated text of all text content items.
    pub fn all_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                Content::Text { text } => text.as_str(),
            })
            .collect()
    }
}

/// Content types for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_defaults_to_sentinel() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "tools/list"})).unwrap();
        assert_eq!(req.id, RequestId::from(1_i64));
        assert!(req.params.is_none());
    }

    #[test]
    fn test_request_requires_method() {
        let result = serde_json::from_value::<JsonRpcRequest>(json!({"jsonrpc": "2.0", "id": 3}));
        assert!(result.is_err());
    }

    #[test]
    fn test_string_id_preserved() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "abc", "method": "x"})).unwrap();
        assert_eq!(req.id, RequestId::String("abc".to_string()));
    }

    #[test]
    fn test_wide_and_null_ids_round_trip() {
        for id in [json!(1.5), json!(u64::MAX), json!(-0.25), json!(null)] {
            let req: JsonRpcRequest =
                serde_json::from_value(json!({"id": id, "method": "tools/list"})).unwrap();
            let resp = JsonRpcResponse::result(req.id, json!({}));
            assert_eq!(serde_json::to_value(&resp).unwrap()["id"], id);
        }

        let req: JsonRpcRequest =
            serde_json::from_value(json!({"id": null, "method": "x"})).unwrap();
        assert_eq!(req.id, RequestId::Null);
        assert_eq!(RequestId::recover(r#"{"id": null"#), RequestId::from(1_i64));
        assert_eq!(RequestId::recover(r#"{"id": 2.5}"#).to_string(), "2.5");
    }

    #[test]
    fn test_non_string_tool_name_is_empty() {
        let call = JsonRpcRequest::new(1, "tools/call")
            .with_params(json!({"name": 5, "arguments": {}}));
        match McpMethod::from_jsonrpc(&call).unwrap() {
            McpMethod::CallTool(params) => assert_eq!(params.name, ""),
            other => panic!("Expected CallTool, got {:?}", other),
        }
    }

    #[test]
    fn test_recover_id() {
        assert_eq!(
            RequestId::recover(r#"{"id": 42, "params": 1}"#),
            RequestId::from(42_i64)
        );
        assert_eq!(RequestId::recover("not json"), RequestId::from(1_i64));
        assert_eq!(RequestId::recover(r#"{"id": [1]}"#), RequestId::from(1_i64));
    }

    #[test]
    fn test_parse_methods() {
        let init = JsonRpcRequest::new(1, "initialize");
        assert_eq!(McpMethod::from_jsonrpc(&init).unwrap(), McpMethod::Initialize);

        let list = JsonRpcRequest::new(1, "tools/list");
        assert_eq!(McpMethod::from_jsonrpc(&list).unwrap(), McpMethod::ListTools);

        let call = JsonRpcRequest::new(1, "tools/call")
            .with_params(json!({"name": "greet_user", "arguments": {"name": "Ada"}}));
        match McpMethod::from_jsonrpc(&call).unwrap() {
            McpMethod::CallTool(params) => {
                assert_eq!(params.name, "greet_user");
                assert_eq!(params.arguments["name"], "Ada");
            }
            other => panic!("Expected CallTool, got {:?}", other),
        }

        let other = JsonRpcRequest::new(1, "notifications/initialized");
        assert_eq!(
            McpMethod::from_jsonrpc(&other).unwrap(),
            McpMethod::Other("notifications/initialized".to_string())
        );
    }

    #[test]
    fn test_call_tool_without_params_defaults() {
        let call = JsonRpcRequest::new(1, "tools/call");
        match McpMethod::from_jsonrpc(&call).unwrap() {
            McpMethod::CallTool(params) => {
                assert_eq!(params.name, "");
                assert!(params.arguments.is_null());
            }
            other => panic!("Expected CallTool, got {:?}", other),
        }
    }

    #[test]
    fn test_call_tool_with_non_object_params_fails() {
        let call = JsonRpcRequest::new(1, "tools/call").with_params(json!([1, 2]));
        assert!(McpMethod::from_jsonrpc(&call).is_err());
    }

    #[test]
    fn test_initialize_result_serialization() {
        let result = InitializeResult {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                logging: Some(LoggingCapability::default()),
                tools: Some(ToolsCapability::default()),
            },
            server_info: Implementation::new("Greeting MCP", "1.0.0"),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["protocolVersion"], "2025-06-18");
        assert_eq!(json["capabilities"], json!({"logging": {}, "tools": {}}));
        assert_eq!(json["serverInfo"]["name"], "Greeting MCP");
    }

    #[test]
    fn test_call_tool_result_text() {
        let result = CallToolResult::text("hello");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, json!({"content": [{"type": "text", "text": "hello"}]}));
        assert_eq!(result.all_text(), "hello");
    }

    #[test]
    fn test_error_response_shape() {
        let resp = JsonRpcResponse::error(RequestId::from(7_i64), JsonRpcError::tool_not_found());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["error"]["code"], -32601);
        assert!(json.get("result").is_none());
    }
}
