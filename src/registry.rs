//! Registry of available tools, local and proxied.
//!
//! Populated once at startup and read-only afterwards; lookups during
//! steady-state operation need no synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::ProxyTransport;
use crate::error::{Error, Result};
use crate::protocol::ToolDefinition;
use crate::tools::Tool;

/// How a registered tool is executed.
pub enum Handler {
    /// Locally-defined tool invoked in-process.
    Local(Arc<dyn Tool>),
    /// Tool served by a mounted provider; calls are forwarded verbatim.
    Proxied {
        /// Transport bound to the provider that owns the tool.
        transport: Arc<dyn ProxyTransport>,
        /// The tool's original (un-namespaced) name on the provider side.
        remote_name: String,
    },
}

impl Handler {
    /// Human-readable source label, used in name-conflict diagnostics.
    pub fn source(&self) -> String {
        match self {
            Handler::Local(_) => "local".into(),
            Handler::Proxied { remote_name, .. } => format!("proxied ({remote_name})"),
        }
    }
}

/// A registered tool: its listing definition plus its handler.
pub struct ToolDescriptor {
    /// Definition surfaced through `tools/list`.
    pub definition: ToolDefinition,
    /// How calls to this tool execute.
    pub handler: Handler,
}

/// Mapping from tool name to descriptor across all sources.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool descriptor.
    ///
    /// A second registration under an existing name is a configuration
    /// error; the first registration is never overwritten.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        let name = descriptor.definition.name.clone();
        if let Some(existing) = self.tools.get(&name) {
            return Err(Error::NameConflict {
                name,
                existing: existing.handler.source(),
                attempted: descriptor.handler.source(),
            });
        }
        self.tools.insert(name, descriptor);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Tool definitions, sorted by name for deterministic listings.
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<ToolDefinition> =
            self.tools.values().map(|d| d.definition.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry has no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::{ContentItem, ToolCallResult};
    use crate::tools::ToolContext;

    struct NoopTool(&'static str);

    #[async_trait::async_trait]
    impl Tool for NoopTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.0.into(),
                description: "noop".into(),
                input_schema: json!({"type": "object", "properties": {}}),
            }
        }

        async fn execute(
            &self,
            _arguments: serde_json::Value,
            _context: &ToolContext,
        ) -> crate::Result<ToolCallResult> {
            Ok(ToolCallResult {
                content: vec![ContentItem::text("ok")],
                is_error: false,
            })
        }
    }

    fn descriptor(name: &'static str) -> ToolDescriptor {
        let tool = NoopTool(name);
        ToolDescriptor {
            definition: tool.definition(),
            handler: Handler::Local(Arc::new(tool)),
        }
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(descriptor("fourth_login")).unwrap();

        assert!(registry.resolve("fourth_login").is_some());
        assert!(registry.resolve("fourth_logout").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_name_is_a_configuration_error() {
        let mut registry = ToolRegistry::new();
        registry.register(descriptor("fourth_login")).unwrap();

        let err = registry.register(descriptor("fourth_login")).unwrap_err();
        match err {
            Error::NameConflict { name, .. } => assert_eq!(name, "fourth_login"),
            other => panic!("expected NameConflict, got {other:?}"),
        }
        // The original registration survives.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn list_is_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(descriptor("zeta")).unwrap();
        registry.register(descriptor("alpha")).unwrap();
        registry.register(descriptor("mid")).unwrap();

        let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
