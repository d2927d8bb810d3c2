//! Fourth data extraction workflow tools.
//!
//! These tools capture state and hand it back with an extraction
//! instruction; structural parsing of the captured payloads is the
//! downstream consumer's responsibility, not this layer's.

use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tools::{parse_args, Tool, ToolContext};

/// Extract a data table from the current Fourth page.
pub struct ExtractTableTool;

#[derive(Debug, Deserialize)]
struct ExtractTableArgs {
    table_description: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ExtractTableTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fourth_extract_table".into(),
            description: "Extract structured data from a Fourth data table. Captures a snapshot of the current page and returns it with an extraction instruction for further processing.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_description": {
                        "type": "string",
                        "description": "Which table to extract (e.g., 'employee schedule table', 'inventory list')",
                        "default": "main data table"
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
        let args: ExtractTableArgs = parse_args(arguments)?;
        let table_description = args
            .table_description
            .unwrap_or_else(|| "main data table".into());

        context
            .report_progress(0.3, "Capturing page snapshot")
            .await;
        let snapshot = context
            .call("playwright_browser_snapshot", json!({}))
            .await?;

        let result = json!({
            "table_description": table_description,
            "snapshot": snapshot,
            "instruction": format!(
                "Parse the snapshot to extract the '{table_description}' as structured data. \
                 Return rows as a list of objects keyed by column header. \
                 Include pagination info if present."
            ),
        });
        ToolCallResult::json(&result)
    }
}

/// Generate a structured report capture from the current Fourth page,
/// optionally with a screenshot for visual data (charts, graphs).
pub struct ExtractReportTool;

#[derive(Debug, Deserialize)]
struct ExtractReportArgs {
    report_name: Option<String>,
    #[serde(default)]
    include_screenshot: bool,
}

#[async_trait::async_trait]
impl Tool for ExtractReportTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fourth_extract_report".into(),
            description: "Generate a structured report from the current Fourth page. Captures the accessibility snapshot and optionally a screenshot for visual data extraction.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "report_name": {
                        "type": "string",
                        "description": "Name/description of the report being extracted",
                        "default": "current report"
                    },
                    "include_screenshot": {
                        "type": "boolean",
                        "description": "Whether to also capture a screenshot for visual data",
                        "default": false
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
        let args: ExtractReportArgs = parse_args(arguments)?;
        let report_name = args.report_name.unwrap_or_else(|| "current report".into());

        let mut results = serde_json::Map::new();
        results.insert("report_name".into(), json!(report_name));

        context
            .report_progress(0.2, "Capturing accessibility snapshot")
            .await;
        let snapshot = context
            .call("playwright_browser_snapshot", json!({}))
            .await?;
        results.insert("snapshot".into(), snapshot);

        if args.include_screenshot {
            context.report_progress(0.6, "Capturing screenshot").await;
            let screenshot = context
                .call("playwright_browser_take_screenshot", json!({}))
                .await?;
            results.insert("screenshot".into(), screenshot);
        }

        results.insert(
            "instruction".into(),
            json!(format!(
                "Extract all data from the '{report_name}' report. Include: \
                 1) Report title and date range, \
                 2) Summary metrics/KPIs, \
                 3) Table data as structured rows, \
                 4) Any chart/graph descriptions if screenshot provided."
            )),
        );

        ToolCallResult::json(&serde_json::Value::Object(results))
    }
}
