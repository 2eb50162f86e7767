//! Tools served by this crate.

pub mod greeting;

use crate::error::Result;
use crate::registry::ToolRegistry;

/// Registry holding every tool this server exposes.
pub fn default_registry() -> Result<ToolRegistry> {
    Ok(ToolRegistry::new().with_tool(greeting::tool()?))
}
