//! Dispatch routing: resolve a tool name and invoke the right handler.
//!
//! The router is stateless; side effects are entirely those of the invoked
//! handler. Results are uniform `serde_json::Value`s across local and
//! proxied tools: a proxied result is relayed verbatim, a local
//! `ToolCallResult` is serialized into the same shape.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::registry::{Handler, ToolRegistry};
use crate::tools::ToolContext;

/// Minimal opaque RPC channel to a mounted provider.
#[async_trait::async_trait]
pub trait ProxyTransport: Send + Sync {
    /// Invoke a tool on the provider, forwarding the arguments unchanged.
    async fn call_tool(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value>;
}

/// Abstract dispatch interface workflow steps are issued through.
#[async_trait::async_trait]
pub trait Dispatch: Send + Sync {
    /// Resolve and invoke a tool by name.
    async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> Result<serde_json::Value>;
}

/// Routes invocations against a startup-populated registry.
pub struct Router {
    registry: Arc<ToolRegistry>,
}

impl Router {
    /// Create a router over the given registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve `name` and invoke its handler with the given arguments.
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> Result<serde_json::Value> {
        let descriptor = self
            .registry
            .resolve(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        match &descriptor.handler {
            Handler::Proxied {
                transport,
                remote_name,
            } => transport.call_tool(remote_name, args).await,
            Handler::Local(tool) => {
                let result = tool.execute(args, context).await?;
                Ok(serde_json::to_value(result)?)
            }
        }
    }
}

#[async_trait::async_trait]
impl Dispatch for Router {
    async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> Result<serde_json::Value> {
        self.invoke(name, args, context).await
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_support::ScriptedDispatch;
    use super::*;
    use crate::registry::ToolDescriptor;
    use crate::protocol::ToolDefinition;
    use crate::tools::{NullProgress, ToolContext};

    struct RecordingTransport {
        calls: std::sync::Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait::async_trait]
    impl ProxyTransport for RecordingTransport {
        async fn call_tool(
            &self,
            name: &str,
            args: serde_json::Value,
        ) -> Result<serde_json::Value> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), args.clone()));
            Ok(json!({"content": [{"type": "text", "text": "upstream"}]}))
        }
    }

    fn context(dispatch: Arc<dyn Dispatch>) -> ToolContext {
        ToolContext::new(dispatch, Arc::new(NullProgress))
    }

    #[tokio::test]
    async fn unknown_name_is_tool_not_found() {
        let registry = Arc::new(ToolRegistry::new());
        let router = Arc::new(Router::new(registry));
        let ctx = context(router.clone());

        let err = router.invoke("missing", json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn proxied_call_forwards_arguments_unchanged() {
        let transport = Arc::new(RecordingTransport {
            calls: std::sync::Mutex::new(Vec::new()),
        });

        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDescriptor {
                definition: ToolDefinition {
                    name: "playwright_browser_navigate".into(),
                    description: "proxied".into(),
                    input_schema: json!({"type": "object"}),
                },
                handler: Handler::Proxied {
                    transport: transport.clone(),
                    remote_name: "browser_navigate".into(),
                },
            })
            .unwrap();

        let router = Arc::new(Router::new(Arc::new(registry)));
        let ctx = context(router.clone());

        let args = json!({"url": "https://app.fourth.com", "nested": {"a": [1, 2]}});
        let result = router
            .invoke("playwright_browser_navigate", args.clone(), &ctx)
            .await
            .unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "browser_navigate");
        assert_eq!(calls[0].1, args);
        assert_eq!(result["content"][0]["text"], "upstream");
    }

    #[tokio::test]
    async fn scripted_dispatch_surfaces_upstream_errors() {
        let dispatch = ScriptedDispatch::new();
        dispatch.push_err("browser crashed");
        let ctx = context(dispatch.clone());

        let err = ctx
            .call("playwright_browser_snapshot", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { tool, .. } if tool == "playwright_browser_snapshot"));
    }
}
