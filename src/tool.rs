//! Tool definition and builder API
//!
//! A [`Tool`] is the unit the registry stores: a unique name, a description,
//! the scopes a caller must hold, a JSON Schema for its input, and an
//! optional handler. Tools are assembled with [`ToolBuilder`]:
//!
//! ```rust
//! use greeting_mcp::{CallToolResult, ToolBuilder};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct EchoInput {
//!     /// Text to echo back
//!     text: String,
//! }
//!
//! let tool = ToolBuilder::new("echo")
//!     .description("Echo the input")
//!     .required_scope("echo:use")
//!     .input::<EchoInput>()
//!     .handler(|args| async move {
//!         let text = args["text"].as_str().unwrap_or_default().to_string();
//!         Ok(CallToolResult::text(text))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(tool.name, "echo");
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::{CallToolResult, ToolDefinition};

/// Validates a tool name.
///
/// Tool names must be 1-128 characters and contain only alphanumeric
/// characters, underscores, hyphens, and dots.
pub fn validate_tool_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::tool("Tool name cannot be empty"));
    }
    if name.len() > 128 {
        return Err(Error::tool(format!(
            "Tool name '{}' exceeds maximum length of 128 characters (got {})",
            name,
            name.len()
        )));
    }
    if let Some(invalid_char) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-' && *c != '.')
    {
        return Err(Error::tool(format!(
            "Tool name '{}' contains invalid character '{}'. Only alphanumeric, underscore, hyphen, and dot are allowed.",
            name, invalid_char
        )));
    }
    Ok(())
}

/// A boxed future for tool handlers
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tool handler trait - the core abstraction for tool execution
///
/// Handlers receive the raw `arguments` value from `tools/call` (which may be
/// `null` when the client sent none) and decide for themselves how lenient to
/// be about its shape.
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with the given arguments
    fn call(&self, args: Value) -> BoxFuture<'_, Result<CallToolResult>>;
}

struct FnHandler<F> {
    handler: F,
}

impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
{
    fn call(&self, args: Value) -> BoxFuture<'_, Result<CallToolResult>> {
        Box::pin((self.handler)(args))
    }
}

/// A registered tool
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// Scopes a caller must hold, in declaration order
    pub required_scopes: Vec<String>,
    pub input_schema: Value,
    handler: Option<Arc<dyn ToolHandler>>,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("required_scopes", &self.required_scopes)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Create a new tool builder
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder::new(name)
    }

    /// Get the tool definition for tools/list
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Whether a handler was attached at registration.
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// The handler, if any.
    pub fn handler(&self) -> Option<Arc<dyn ToolHandler>> {
        self.handler.clone()
    }
}

/// Builder for [`Tool`]s
pub struct ToolBuilder {
    name: String,
    description: String,
    required_scopes: Vec<String>,
    input_schema: Value,
    handler: Option<Arc<dyn ToolHandler>>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required_scopes: Vec::new(),
            input_schema: serde_json::json!({ "type": "object" }),
            handler: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a scope the caller must hold. Repeated scopes are kept once.
    pub fn required_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.required_scopes.contains(&scope) {
            self.required_scopes.push(scope);
        }
        self
    }

    /// Derive the input schema from a type.
    pub fn input<I: JsonSchema>(mut self) -> Self {
        self.input_schema = input_schema_for::<I>();
        self
    }

    /// Use an explicit JSON Schema for the input.
    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
    {
        self.handler = Some(Arc::new(FnHandler { handler }));
        self
    }

    /// Build the tool.
    ///
    /// Returns an error if the tool name is invalid. A tool built without a
    /// handler is valid: it is listed, but calls to it are refused.
    pub fn build(self) -> Result<Tool> {
        validate_tool_name(&self.name)?;
        Ok(Tool {
            name: self.name,
            description: self.description,
            required_scopes: self.required_scopes,
            input_schema: self.input_schema,
            handler: self.handler,
        })
    }
}

/// JSON Schema for a tool input type, without the `$schema`/`title` keys
/// schemars adds at the root.
fn input_schema_for<I: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(I);
    let mut value =
        serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}
