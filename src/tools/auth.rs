//! Fourth authentication workflow tools.

use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tools::{parse_args, Tool, ToolContext};

/// Multi-step login workflow against a Fourth application.
///
/// Navigate, optionally enter via SSO, fill credentials, submit, then
/// capture a verification snapshot. A failed step aborts the workflow;
/// no step is retried.
pub struct LoginTool;

#[derive(Debug, Deserialize)]
struct LoginArgs {
    url: String,
    username: String,
    password: String,
    sso_provider: Option<String>,
}

#[async_trait::async_trait]
impl Tool for LoginTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fourth_login".into(),
            description: "Log into a Fourth application, including SSO handling. Drives the mounted Playwright tools through the full login flow and captures a verification snapshot.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Fourth application URL (e.g., https://app.fourth.com)"
                    },
                    "username": {
                        "type": "string",
                        "description": "Login username or email"
                    },
                    "password": {
                        "type": "string",
                        "description": "Login password"
                    },
                    "sso_provider": {
                        "type": "string",
                        "description": "Optional SSO provider name (e.g., 'azure', 'okta')"
                    }
                },
                "required": ["url", "username", "password"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &ToolContext,
    ) -> Result<ToolCallResult> {
        let args: LoginArgs = parse_args(arguments)?;
        let result = run_login(args, context).await?;
        ToolCallResult::json(&result)
    }
}

async fn run_login(args: LoginArgs, ctx: &ToolContext) -> Result<serde_json::Value> {
    let url = normalize_url(&args.url);

    ctx.report_progress(0.1, "Navigating to login page").await;
    ctx.call("playwright_browser_navigate", json!({"url": url}))
        .await?;

    ctx.report_progress(0.3, "Entering credentials").await;

    if let Some(provider) = &args.sso_provider {
        ctx.call(
            "playwright_browser_click",
            json!({
                "element": format!("SSO login button for {provider}"),
                "ref": "sso-button",
            }),
        )
        .await?;
    }

    ctx.call(
        "playwright_browser_type",
        json!({
            "element": "username field",
            "ref": "username",
            "text": args.username,
        }),
    )
    .await?;

    ctx.call(
        "playwright_browser_type",
        json!({
            "element": "password field",
            "ref": "password",
            "text": args.password,
        }),
    )
    .await?;

    ctx.report_progress(0.6, "Submitting login").await;
    ctx.call(
        "playwright_browser_click",
        json!({
            "element": "login submit button",
            "ref": "submit",
        }),
    )
    .await?;

    ctx.report_progress(0.9, "Verifying login success").await;
    let snapshot = ctx.call("playwright_browser_snapshot", json!({})).await?;

    Ok(json!({
        "status": "logged_in",
        "url": url,
        "sso": args.sso_provider.as_deref().unwrap_or("direct"),
        "snapshot": snapshot,
    }))
}

/// Trim surrounding whitespace and any trailing slash so result URLs are
/// not sensitive to input formatting.
fn normalize_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Snapshot of the current Fourth session's user context.
///
/// Captures state only; interpreting the snapshot (user name, role, active
/// location, permissions) is the caller's job, spelled out in the returned
/// instruction.
pub struct UserContextTool;

#[async_trait::async_trait]
impl Tool for UserContextTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "fourth_get_user_context".into(),
            description: "Get the current Fourth user context: user, permissions, and active restaurant/location as shown in the application UI. Requires an active browser session (call fourth_login first).".into(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        context: &ToolContext,
    ) -> Result<ToolCallResult> {
        let snapshot = context
            .call("playwright_browser_snapshot", json!({}))
            .await?;

        let result = json!({
            "snapshot": snapshot,
            "instruction": "Parse the snapshot to extract: current user name, role, active restaurant/location, and any visible permissions or menu items.",
        });
        ToolCallResult::json(&result)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dispatch::test_support::ScriptedDispatch;
    use crate::error::Error;
    use crate::tools::test_support::context_with;

    fn login_args(sso_provider: Option<&str>) -> LoginArgs {
        LoginArgs {
            url: "https://app.fourth.com/".into(),
            username: "manager@example.com".into(),
            password: "hunter2".into(),
            sso_provider: sso_provider.map(String::from),
        }
    }

    #[tokio::test]
    async fn direct_login_runs_all_steps_in_order() {
        let dispatch = ScriptedDispatch::new();
        let (ctx, progress) = context_with(dispatch.clone());

        let result = run_login(login_args(None), &ctx).await.unwrap();

        assert_eq!(result["status"], "logged_in");
        assert_eq!(result["sso"], "direct");
        assert_eq!(result["url"], "https://app.fourth.com");

        assert_eq!(
            dispatch.call_names(),
            vec![
                "playwright_browser_navigate",
                "playwright_browser_type",
                "playwright_browser_type",
                "playwright_browser_click",
                "playwright_browser_snapshot",
            ]
        );

        // Milestones arrive in non-decreasing order.
        let fractions = progress.fractions();
        assert_eq!(fractions, vec![0.1, 0.3, 0.6, 0.9]);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn sso_login_clicks_the_provider_button_first() {
        let dispatch = ScriptedDispatch::new();
        let (ctx, _progress) = context_with(dispatch.clone());

        let result = run_login(login_args(Some("okta")), &ctx).await.unwrap();
        assert_eq!(result["sso"], "okta");

        let calls = dispatch.calls();
        assert_eq!(calls[1].0, "playwright_browser_click");
        assert_eq!(calls[1].1["ref"], "sso-button");
        assert_eq!(
            calls[1].1["element"],
            "SSO login button for okta"
        );
    }

    #[tokio::test]
    async fn failed_navigation_aborts_before_credentials() {
        let dispatch = ScriptedDispatch::new();
        dispatch.push_err("net::ERR_NAME_NOT_RESOLVED");
        let (ctx, _progress) = context_with(dispatch.clone());

        let err = run_login(login_args(None), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { tool, .. } if tool == "playwright_browser_navigate"));

        // Nothing past the failed step ever issued: no typing, no submit.
        assert_eq!(dispatch.calls().len(), 1);
    }

    #[tokio::test]
    async fn user_context_captures_without_navigating() {
        let dispatch = ScriptedDispatch::new();
        dispatch.push_text("header: Jane Doe (Regional Manager)");
        let (ctx, _progress) = context_with(dispatch.clone());

        let result = UserContextTool.execute(json!({}), &ctx).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(dispatch.call_names(), vec!["playwright_browser_snapshot"]);
    }

    #[test]
    fn url_normalization() {
        assert_eq!(normalize_url(" https://app.fourth.com/ "), "https://app.fourth.com");
        assert_eq!(normalize_url("https://app.fourth.com"), "https://app.fourth.com");
    }
}
