//! Tool trait, invocation context, and the Fourth workflow tool set.
//!
//! Composite workflow tools issue their steps through [`ToolContext::call`],
//! which routes back into the dispatch layer, so a workflow step lands on a
//! proxied browser tool exactly the way a direct client call would.

pub mod auth;
pub mod extraction;
pub mod navigation;
pub mod wrappers;

use std::sync::Arc;

use uuid::Uuid;

use crate::dispatch::Dispatch;
use crate::error::{Error, Result};
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::registry::{Handler, ToolDescriptor, ToolRegistry};

/// Tool trait for implementing locally-handled MCP tools.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &ToolContext,
    ) -> Result<ToolCallResult>;
}

/// Sink for best-effort fractional progress during a long-running call.
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    /// Report a progress fraction with a human-readable milestone message.
    async fn report(&self, progress: f64, total: f64, message: &str);
}

/// Progress sink that discards everything. Used when the caller did not
/// request progress notifications.
pub struct NullProgress;

#[async_trait::async_trait]
impl ProgressSink for NullProgress {
    async fn report(&self, _progress: f64, _total: f64, _message: &str) {}
}

/// Per-call ephemeral state passed by reference through a tool invocation.
///
/// Never shared across calls; dropped when the call ends.
pub struct ToolContext {
    /// Unique id of this invocation, carried through log spans.
    pub call_id: Uuid,
    /// Dispatch interface workflow steps are issued through.
    pub dispatch: Arc<dyn Dispatch>,
    /// Progress channel for this call.
    pub progress: Arc<dyn ProgressSink>,
}

impl ToolContext {
    /// Create a context for a new invocation.
    pub fn new(dispatch: Arc<dyn Dispatch>, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            dispatch,
            progress,
        }
    }

    /// Dispatch a call to another registered tool.
    pub async fn call(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        self.dispatch.call(name, args, self).await
    }

    /// Report fractional progress against a total of 1.0.
    pub async fn report_progress(&self, progress: f64, message: &str) {
        self.progress.report(progress, 1.0, message).await;
    }
}

/// Configuration shared by the Fourth workflow tools.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Base URL of the Fourth application.
    pub base_url: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.fourth.com".into(),
        }
    }
}

/// Register the Fourth workflow tools and the type-normalizing wrapper.
///
/// Must run after the playwright provider mount so a name collision with a
/// proxied tool is caught here, at startup.
pub fn register_workflows(registry: &mut ToolRegistry, config: &WorkflowConfig) -> Result<()> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(auth::LoginTool),
        Arc::new(auth::UserContextTool),
        Arc::new(navigation::NavigateModuleTool::new(config.base_url.clone())),
        Arc::new(navigation::WaitForLoadTool),
        Arc::new(extraction::ExtractTableTool),
        Arc::new(extraction::ExtractReportTool),
        Arc::new(wrappers::BrowserWaitForTool),
    ];

    for tool in tools {
        registry.register(ToolDescriptor {
            definition: tool.definition(),
            handler: Handler::Local(tool),
        })?;
    }

    Ok(())
}

/// Parse a tool's argument payload into its typed args struct.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(arguments: serde_json::Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| Error::InvalidParams(e.to_string()))
}
