//! Type-normalizing wrappers in front of proxied tools.

use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::protocol::{ContentItem, ToolCallResult, ToolDefinition};
use crate::tools::{parse_args, Tool, ToolContext};

/// Wrapper around `playwright_browser_wait_for` with proper type handling.
///
/// Callers supply `time` in any numeric representation (integer, float, or
/// numeric string); it is coerced to float seconds before forwarding. Absent
/// fields are omitted from the forwarded payload entirely; the downstream
/// tool distinguishes "absent" from "explicitly empty".
pub struct BrowserWaitForTool;

#[derive(Debug, Deserialize)]
struct WaitForArgs {
    time: Option<serde_json::Value>,
    text: Option<String>,
    #[serde(rename = "textGone")]
    text_gone: Option<String>,
}

#[async_trait::async_trait]
impl Tool for BrowserWaitForTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "browser_wait_for".into(),
            description: "Wait for text to appear/disappear or a specified time to pass. The time parameter is in SECONDS, not milliseconds: pass 2 for a 2-second wait, not 2000.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "time": {
                        "type": "number",
                        "description": "Time to wait in SECONDS (e.g., 2 for 2 seconds)"
                    },
                    "text": {
                        "type": "string",
                        "description": "Text to wait for on the page"
                    },
                    "textGone": {
                        "type": "string",
                        "description": "Text to wait to disappear from the page"
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
        let args: WaitForArgs = parse_args(arguments)?;
        let forwarded = normalize_args(args)?;

        let result = context
            .call("playwright_browser_wait_for", forwarded)
            .await?;

        // Relay the upstream result; wrap as text if it is not already in
        // tool-result shape.
        Ok(serde_json::from_value(result.clone()).unwrap_or_else(|_| ToolCallResult {
            content: vec![ContentItem::text(result.to_string())],
            is_error: false,
        }))
    }
}

/// Build the forwarded payload: coerce present fields to their canonical
/// type, omit absent ones.
fn normalize_args(args: WaitForArgs) -> Result<serde_json::Value> {
    let mut forwarded = serde_json::Map::new();

    if let Some(time) = &args.time {
        forwarded.insert("time".into(), json!(coerce_seconds(time)?));
    }
    if let Some(text) = args.text {
        forwarded.insert("text".into(), json!(text));
    }
    if let Some(text_gone) = args.text_gone {
        forwarded.insert("textGone".into(), json!(text_gone));
    }

    Ok(serde_json::Value::Object(forwarded))
}

/// Coerce a loosely-typed duration to float seconds.
fn coerce_seconds(value: &serde_json::Value) -> Result<f64> {
    if let Some(seconds) = value.as_f64() {
        return Ok(seconds);
    }
    if let Some(text) = value.as_str() {
        if let Ok(seconds) = text.trim().parse::<f64>() {
            return Ok(seconds);
        }
    }
    Err(Error::InvalidParams(format!(
        "time must be a number of seconds, got {value}"
    )))
}
