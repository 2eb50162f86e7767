//! The `greet_user` tool.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::CallToolResult;
use crate::tool::{Tool, ToolBuilder};

pub const NAME: &str = "greet_user";

pub const DESCRIPTION: &str = "Greets the user with a personalized message. This tool can be used to provide a friendly greeting based on the name of the user.";

/// Scope a caller must hold to invoke the tool.
pub const REQUIRED_SCOPE: &str = "usr:read";

/// Name used when the caller did not supply one.
pub const ANONYMOUS: &str = "Anonymous";

/// Input accepted by `greet_user`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GreetInput {
    /// The name of the user to greet
    pub name: String,
}

/// Build the `greet_user` tool.
pub fn tool() -> Result<Tool> {
    ToolBuilder::new(NAME)
        .description(DESCRIPTION)
        .required_scope(REQUIRED_SCOPE)
        .input::<GreetInput>()
        .handler(|args: Value| async move { greet(&args).map(CallToolResult::text) })
        .build()
}

/// Compose the greeting for a `tools/call` argument object.
///
/// A missing or `null` name greets [`ANONYMOUS`]; other non-string values are
/// rendered as their JSON text.
pub fn greet(args: &Value) -> Result<String> {
    let name = match args {
        Value::Null => None,
        Value::Object(map) => map.get("name").filter(|v| !v.is_null()),
        other => {
            return Err(Error::tool(format!(
                "arguments must be an object, got {}",
                json_type(other)
            )));
        }
    };

    let name = match name {
        None => ANONYMOUS.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    };

    Ok(format!("Hi {}, welcome to Scalekit!", name))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
