//! Startup-time tool registry.
//!
//! The [`ToolRegistry`] is filled once while the server is being assembled and
//! then shared read-only (behind an `Arc`) by every request.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use greeting_mcp::{ToolBuilder, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(ToolBuilder::new("echo").description("Echo input").build().unwrap());
//!
//! let registry = Arc::new(registry);
//! assert!(registry.get("echo").is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::tool::Tool;

/// Name-indexed collection of tools, listed in registration order.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any existing tool with the same name.
    ///
    /// A replaced tool keeps its original position in [`list`](Self::list).
    pub fn register(&mut self, tool: Tool) {
        match self.index.get(&tool.name) {
            Some(&pos) => {
                tracing::warn!(tool = %tool.name, "Replacing previously registered tool");
                self.tools[pos] = Arc::new(tool);
            }
            None => {
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(Arc::new(tool));
            }
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.register(tool);
        self
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.index.get(name).map(|&pos| self.tools[pos].clone())
    }

    /// All tools in registration order.
    pub fn list(&self) -> impl Iterator<Item = &Arc<Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolBuilder;

    fn tool(name: &str, description: &str) -> Tool {
        ToolBuilder::new(name)
            .description(description)
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(tool("a", "first"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().description, "first");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let registry = ToolRegistry::new()
            .with_tool(tool("zeta", ""))
            .with_tool(tool("alpha", ""))
            .with_tool(tool("mid", ""));

        let names: Vec<_> = registry.list().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_name_overwrites_in_place() {
        let registry = ToolRegistry::new()
            .with_tool(tool("a", "old"))
            .with_tool(tool("b", ""))
            .with_tool(tool("a", "new"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a").unwrap().description, "new");
        let names: Vec<_> = registry.list().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
