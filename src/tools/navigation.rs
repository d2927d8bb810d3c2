//! Fourth navigation workflow tools: module navigation and load waiting.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tools::{parse_args, Tool, ToolContext};

/// Known Fourth module paths, constant for the process lifetime.
const FOURTH_MODULES: &[(&str, &str)] = &[
    ("dashboard", "/dashboard"),
    ("scheduling", "/scheduling"),
    ("labor", "/labor"),
    ("inventory", "/inventory"),
    ("recipes", "/recipes"),
    ("purchasing", "/purchasing"),
    ("reports", "/reports"),
    ("admin", "/admin"),
    ("employees", "/employees"),
    ("timekeeping", "/timekeeping"),
    ("forecasting", "/forecasting"),
    ("menu", "/menu"),
    ("operations", "/operations"),
];

fn module_path(keyword: &str) -> Option<&'static str> {
    FOURTH_MODULES
        .iter()
        .find(|(name, _)| *name == keyword)
        .map(|(_, path)| *path)
}

fn module_names() -> Vec<&'static str> {
    FOURTH_MODULES.iter().map(|(name, _)| *name).collect()
}

/// Navigate to a Fourth module by keyword.
///
/// `"list"` is reserved: it returns the keyword set without navigating.
/// An unknown keyword is a routine caller mistake, answered with a
/// structured error result listing the valid keywords, never a thrown
/// failure.
pub struct NavigateModuleTool {
    base_url: String,
}

impl NavigateModuleTool {
    /// Create the tool with the given default application base URL.
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }
}

#[derive(Debug, Deserialize)]
struct NavigateModuleArgs {
    module: String,
    base_url: Option<String>,
}

#[async_trait::async_trait]
impl Tool for NavigateModuleTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fourth_navigate_module".into(),
            description: "Navigate to a specific Fourth module by name (e.g., 'scheduling', 'inventory', 'reports'). Use 'list' to see all available modules.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "module": {
                        "type": "string",
                        "description": "Module name, or 'list' for all available modules"
                    },
                    "base_url": {
                        "type": "string",
                        "description": "Base URL of the Fourth application"
                    }
                },
                "required": ["module"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &ToolContext,
    ) -> Result<ToolCallResult> {
        let args: NavigateModuleArgs = parse_args(arguments)?;
        let result = self.run(args, context).await?;
        ToolCallResult::json(&result)
    }
}

impl NavigateModuleTool {
    async fn run(&self, args: NavigateModuleArgs, ctx: &ToolContext) -> Result<serde_json::Value> {
        if args.module == "list" {
            return Ok(json!({"available_modules": module_names()}));
        }

        let keyword = args.module.to_lowercase();
        let Some(path) = module_path(&keyword) else {
            return Ok(json!({
                "error": format!("Unknown module: {}", args.module),
                "available_modules": module_names(),
            }));
        };

        let base = args.base_url.unwrap_or_else(|| self.base_url.clone());
        let url = format!("{}{}", base.trim_end_matches('/'), path);

        ctx.report_progress(0.3, &format!("Navigating to {keyword}"))
            .await;
        ctx.call("playwright_browser_navigate", json!({"url": url}))
            .await?;

        ctx.report_progress(0.8, "Waiting for page load").await;
        let snapshot = ctx.call("playwright_browser_snapshot", json!({})).await?;

        Ok(json!({
            "module": keyword,
            "url": url,
            "snapshot": snapshot,
        }))
    }
}

/// Wait for the Fourth SPA to render content.
///
/// Polls the page snapshot once per second until it is non-empty or the
/// timeout is exhausted. Exhaustion is an anticipated caller state and
/// yields `loaded: false`, not an error.
pub struct WaitForLoadTool;

#[derive(Debug, Deserialize)]
struct WaitForLoadArgs {
    timeout_seconds: Option<u64>,
}

const DEFAULT_LOAD_TIMEOUT_SECONDS: u64 = 10;

#[async_trait::async_trait]
impl Tool for WaitForLoadTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fourth_wait_for_load".into(),
            description: "Wait for the Fourth SPA to fully load by polling the page snapshot until content appears or the timeout is reached. Useful after navigation or login.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "timeout_seconds": {
                        "type": "integer",
                        "description": "Maximum wait time in seconds",
                        "default": DEFAULT_LOAD_TIMEOUT_SECONDS
                    }
                },
                "required": []
            }),
        }
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &ToolContext,
    ) -> Result<ToolCallResult> {
        let args: WaitForLoadArgs = parse_args(arguments)?;
        let result = run_wait_for_load(args, context).await?;
        ToolCallResult::json(&result)
    }
}

async fn run_wait_for_load(args: WaitForLoadArgs, ctx: &ToolContext) -> Result<serde_json::Value> {
    let timeout = args.timeout_seconds.unwrap_or(DEFAULT_LOAD_TIMEOUT_SECONDS);

    for attempt in 0..timeout {
        ctx.report_progress(
            attempt as f64 / timeout as f64,
            &format!("Checking page load ({}s)", attempt + 1),
        )
        .await;

        let snapshot = ctx.call("playwright_browser_snapshot", json!({})).await?;

        // Any rendered text counts as loaded, static page chrome included.
        if !snapshot_text(&snapshot).trim().is_empty() {
            return Ok(json!({
                "loaded": true,
                "wait_seconds": attempt + 1,
                "snapshot": snapshot,
            }));
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Ok(json!({
        "loaded": false,
        "wait_seconds": timeout,
        "message": "Page did not fully load within timeout",
    }))
}

/// Flatten a tool result's text content for the emptiness check.
pub(crate) fn snapshot_text(result: &serde_json::Value) -> String {
    if let Some(items) = result.get("content").and_then(serde_json::Value::as_array) {
        return items
            .iter()
            .filter_map(|item| item.get("text").and_then(serde_json::Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");
    }

    match result {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Object(map) if map.is_empty() => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dispatch::test_support::ScriptedDispatch;
    use crate::tools::test_support::context_with;

    fn navigate_tool() -> NavigateModuleTool {
        NavigateModuleTool::new("https://app.fourth.com".into())
    }

    #[tokio::test]
    async fn list_keyword_returns_modules_without_navigating() {
        let dispatch = ScriptedDispatch::new();
        let (ctx, _progress) = context_with(dispatch.clone());

        let result = navigate_tool()
            .run(
                NavigateModuleArgs {
                    module: "list".into(),
                    base_url: None,
                },
                &ctx,
            )
            .await
            .unwrap();

        let modules = result["available_modules"].as_array().unwrap();
        assert_eq!(modules.len(), FOURTH_MODULES.len());
        assert!(dispatch.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_module_is_a_structured_error_result() {
        let dispatch = ScriptedDispatch::new();
        let (ctx, _progress) = context_with(dispatch.clone());

        let result = navigate_tool()
            .run(
                NavigateModuleArgs {
                    module: "reporting".into(),
                    base_url: None,
                },
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(result["error"], "Unknown module: reporting");
        assert_eq!(
            result["available_modules"].as_array().unwrap().len(),
            FOURTH_MODULES.len()
        );
        assert!(dispatch.calls().is_empty());
    }

    #[tokio::test]
    async fn valid_module_navigates_then_snapshots() {
        let dispatch = ScriptedDispatch::new();
        let (ctx, progress) = context_with(dispatch.clone());

        let result = navigate_tool()
            .run(
                NavigateModuleArgs {
                    module: "Reports".into(),
                    base_url: None,
                },
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(result["module"], "reports");
        assert_eq!(result["url"], "https://app.fourth.com/reports");

        let calls = dispatch.calls();
        assert_eq!(calls[0].0, "playwright_browser_navigate");
        assert_eq!(calls[0].1["url"], "https://app.fourth.com/reports");
        assert_eq!(calls[1].0, "playwright_browser_snapshot");

        let fractions = progress.fractions();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_load_returns_on_first_content() {
        let dispatch = ScriptedDispatch::new();
        dispatch.push_text("");
        dispatch.push_text("  ");
        dispatch.push_text("main content area");
        let (ctx, progress) = context_with(dispatch.clone());

        let result = run_wait_for_load(
            WaitForLoadArgs {
                timeout_seconds: Some(3),
            },
            &ctx,
        )
        .await
        .unwrap();

        assert_eq!(result["loaded"], true);
        assert_eq!(result["wait_seconds"], 3);
        assert_eq!(dispatch.calls().len(), 3);

        let fractions = progress.fractions();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_load_timeout_is_not_an_error() {
        let dispatch = ScriptedDispatch::new();
        dispatch.push_text("");
        dispatch.push_text("");
        let (ctx, _progress) = context_with(dispatch.clone());

        let result = run_wait_for_load(
            WaitForLoadArgs {
                timeout_seconds: Some(2),
            },
            &ctx,
        )
        .await
        .unwrap();

        assert_eq!(result["loaded"], false);
        assert_eq!(result["wait_seconds"], 2);
        assert_eq!(dispatch.calls().len(), 2);
    }

    #[test]
    fn snapshot_text_flattens_content_items() {
        let value = json!({"content": [
            {"type": "text", "text": "header"},
            {"type": "image", "data": "...", "mimeType": "image/png"},
            {"type": "text", "text": "body"}
        ]});
        assert_eq!(snapshot_text(&value), "header\nbody");

        assert_eq!(snapshot_text(&json!({"content": []})), "");
        assert_eq!(snapshot_text(&serde_json::Value::Null), "");
        assert_eq!(snapshot_text(&json!({})), "");
        assert_eq!(snapshot_text(&json!("raw text")), "raw text");
    }
}
