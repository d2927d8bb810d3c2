//! MCP gateway server implementation.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};

use crate::dispatch::Router;
use crate::error::{codes, Result};
use crate::protocol::{
    ClientCapabilities, InitializeParams, InitializeResult, JsonRpcId, JsonRpcRequest,
    JsonRpcResponse, ListResourcesResult, ListToolsResult, McpMessage, ProgressParams,
    ReadResourceParams, ReadResourceResult, ResourcesCapability, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolsCapability,
};
use crate::providers::skills::SkillsCatalog;
use crate::registry::ToolRegistry;
use crate::tools::{NullProgress, ProgressSink, ToolContext};

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name.
pub const SERVER_NAME: &str = "fourth-playwright-mcp";

/// Server version.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Usage guidance returned from `initialize` for the client model.
pub const SERVER_INSTRUCTIONS: &str = r#"## Browser Automation Guidelines

1. **Snapshot before acting.** Always call playwright_browser_snapshot before clicking or typing.
   Never act on stale element references.

2. **browser_wait_for time is in SECONDS, not milliseconds.**
   Pass 2 for a 2-second wait, not 2000. The time parameter must be a number.

3. **fourth_get_user_context requires an active browser session.**
   Call fourth_login first to authenticate before requesting user context.

4. **Use playwright_browser_snapshot (accessibility tree) for element targeting.**
   Only use playwright_browser_take_screenshot for human-readable output or documentation.

5. **After navigation, wait for the page to stabilise before snapshotting.**
   Use browser_wait_for with { "text": "expected-element" } rather than
   a fixed time wait where possible.

6. **Tab management:** playwright_browser_tabs with action "close" without an index
   closes the current tab and auto-switches to the previous one."#;

/// MCP server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialization.
    Uninitialized,
    /// Server is initialized and ready.
    Ready,
    /// Server is shutting down.
    ShuttingDown,
}

/// Shared line writer for the protocol stream. Each message is serialized
/// to a single line and written under one lock acquisition, so responses
/// and progress notifications from concurrent calls never interleave.
#[derive(Clone)]
pub struct MessageWriter {
    inner: Arc<Mutex<tokio::io::Stdout>>,
}

impl MessageWriter {
    /// Create a writer over this process's stdout.
    pub fn stdout() -> Self {
        Self {
            inner: Arc::new(Mutex::new(tokio::io::stdout())),
        }
    }

    /// Serialize and write one message line.
    pub async fn write_line(&self, message: &impl serde::Serialize) -> Result<()> {
        let json = serde_json::to_string(message)?;
        tracing::debug!("Sending: {}", json);
        let mut out = self.inner.lock().await;
        out.write_all(json.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

/// Progress sink that emits `notifications/progress` on the protocol
/// stream, correlated with the originating request's progress token.
pub struct StdioProgressSink {
    token: JsonRpcId,
    writer: MessageWriter,
}

impl StdioProgressSink {
    /// Create a sink bound to the given progress token.
    pub fn new(token: JsonRpcId, writer: MessageWriter) -> Self {
        Self { token, writer }
    }
}

#[async_trait::async_trait]
impl ProgressSink for StdioProgressSink {
    async fn report(&self, progress: f64, total: f64, message: &str) {
        let params = ProgressParams {
            progress_token: self.token.clone(),
            progress,
            total: Some(total),
            message: Some(message.to_string()),
        };
        let notification = JsonRpcRequest::notification(
            "notifications/progress",
            serde_json::to_value(params).ok(),
        );
        // Best-effort telemetry; a failed write never fails the call.
        if let Err(e) = self.writer.write_line(&notification).await {
            tracing::debug!("progress notification dropped: {}", e);
        }
    }
}

/// MCP gateway server over a startup-populated tool registry.
pub struct McpServer {
    state: Arc<RwLock<ServerState>>,
    registry: Arc<ToolRegistry>,
    router: Arc<Router>,
    skills: Arc<SkillsCatalog>,
    writer: MessageWriter,
    #[allow(dead_code)]
    client_capabilities: Arc<RwLock<Option<ClientCapabilities>>>,
}

impl McpServer {
    /// Create a server over a fully-populated registry and skills catalog.
    pub fn new(registry: ToolRegistry, skills: SkillsCatalog) -> Self {
        let registry = Arc::new(registry);
        let router = Arc::new(Router::new(registry.clone()));
        Self {
            state: Arc::new(RwLock::new(ServerState::Uninitialized)),
            registry,
            router,
            skills: Arc::new(skills),
            writer: MessageWriter::stdout(),
            client_capabilities: Arc::new(RwLock::new(None)),
        }
    }

    /// Fixed health indicator.
    pub fn health() -> serde_json::Value {
        serde_json::json!({
            "status": "healthy",
            "server": SERVER_NAME,
        })
    }

    /// Run the server on stdio.
    ///
    /// Each request is handled on its own task so one slow tool call never
    /// stalls the others; notifications are handled inline.
    pub async fn run_stdio(self: Arc<Self>) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        tracing::info!("MCP gateway starting on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }

            tracing::debug!("Received: {}", line);

            let server = Arc::clone(&self);
            tokio::spawn(async move {
                if let Some(response) = server.handle_message(&line).await {
                    if let Err(e) = server.writer.write_line(&response).await {
                        tracing::error!("failed to write response: {}", e);
                    }
                }
            });

            // Check if we should exit
            if *self.state.read().await == ServerState::ShuttingDown {
                break;
            }
        }

        tracing::info!("MCP gateway shutting down");
        Ok(())
    }

    /// Handle an incoming message.
    pub async fn handle_message(&self, json: &str) -> Option<JsonRpcResponse> {
        match McpMessage::parse(json) {
            Ok(McpMessage::Request(request)) => Some(self.handle_request(request).await),
            Ok(McpMessage::Notification(notification)) => {
                self.handle_notification(notification).await;
                None
            }
            Ok(McpMessage::Response(_)) => {
                // We don't expect responses in this direction
                None
            }
            Err(e) => Some(JsonRpcResponse::error(
                None,
                codes::PARSE_ERROR,
                e.to_string(),
            )),
        }
    }

    /// Handle a JSON-RPC request.
    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params).await,
            "tools/list" => self.handle_tools_list(id).await,
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => self.handle_resources_list(id).await,
            "resources/read" => self.handle_resources_read(id, request.params).await,
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "health" => JsonRpcResponse::success(id, Self::health()),
            "shutdown" => {
                *self.state.write().await = ServerState::ShuttingDown;
                JsonRpcResponse::success(id, serde_json::json!({}))
            }
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("method not found: {}", request.method),
            ),
        }
    }

    /// Handle a notification (no response expected).
    async fn handle_notification(&self, notification: JsonRpcRequest) {
        match notification.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            "exit" => {
                *self.state.write().await = ServerState::ShuttingDown;
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    /// Handle initialize request.
    async fn handle_initialize(
        &self,
        id: Option<JsonRpcId>,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        // Parse params
        let params: InitializeParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("invalid initialize params: {}", e),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    "initialize params required",
                );
            }
        };

        *self.client_capabilities.write().await = Some(params.capabilities);
        *self.state.write().await = ServerState::Ready;

        // Return capabilities
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
                logging: None,
            },
            server_info: ServerInfo {
                name: SERVER_NAME.into(),
                version: SERVER_VERSION.into(),
            },
            instructions: Some(SERVER_INSTRUCTIONS.into()),
        };

        JsonRpcResponse::success(id, result)
    }

    /// Handle tools/list request.
    async fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        let state = *self.state.read().await;
        if state != ServerState::Ready {
            return JsonRpcResponse::error(id, codes::INTERNAL_ERROR, "server not initialized");
        }

        let tools = self.registry.list();
        let result = ListToolsResult { tools };

        JsonRpcResponse::success(id, result)
    }

    /// Handle tools/call request.
    async fn handle_tools_call(
        &self,
        id: Option<JsonRpcId>,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let state = *self.state.read().await;
        if state != ServerState::Ready {
            return JsonRpcResponse::error(id, codes::INTERNAL_ERROR, "server not initialized");
        }

        // Parse params
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("invalid tool call params: {}", e),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    "tool call params required",
                );
            }
        };

        // Progress notifications only when the caller asked for them.
        let progress: Arc<dyn ProgressSink> =
            match params.meta.as_ref().and_then(|m| m.progress_token.clone()) {
                Some(token) => Arc::new(StdioProgressSink::new(token, self.writer.clone())),
                None => Arc::new(NullProgress),
            };

        let context = ToolContext::new(self.router.clone(), progress);
        tracing::info!(tool = %params.name, call_id = %context.call_id, "tool call");

        match self
            .router
            .invoke(&params.name, params.arguments, &context)
            .await
        {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::error!(tool = %params.name, call_id = %context.call_id, "Tool failed: {}", e);
                JsonRpcResponse::error(id, e.code(), e.to_string())
            }
        }
    }

    /// Handle resources/list request.
    async fn handle_resources_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        let state = *self.state.read().await;
        if state != ServerState::Ready {
            return JsonRpcResponse::error(id, codes::INTERNAL_ERROR, "server not initialized");
        }

        let result = ListResourcesResult {
            resources: self.skills.resources(),
        };
        JsonRpcResponse::success(id, result)
    }

    /// Handle resources/read request.
    async fn handle_resources_read(
        &self,
        id: Option<JsonRpcId>,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let state = *self.state.read().await;
        if state != ServerState::Ready {
            return JsonRpcResponse::error(id, codes::INTERNAL_ERROR, "server not initialized");
        }

        let params: ReadResourceParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("invalid resource read params: {}", e),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    "resource read params required",
                );
            }
        };

        match self.skills.read(&params.uri).await {
            Ok(contents) => JsonRpcResponse::success(
                id,
                ReadResourceResult {
                    contents: vec![contents],
                },
            ),
            Err(e) => JsonRpcResponse::error(id, e.code(), e.to_string()),
        }
    }
}
