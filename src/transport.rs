//! Stdio subprocess transport for mounted tool providers.
//!
//! Line-delimited JSON-RPC 2.0 over a child process's stdin/stdout. The
//! transport is a single shared channel; calls through it are serialized by
//! an internal mutex, so concurrent gateway invocations queue rather than
//! interleave on the wire. The child is spawned kill-on-drop; dropping the
//! last handle terminates it.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::dispatch::ProxyTransport;
use crate::error::{Error, Result};
use crate::protocol::{JsonRpcId, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ToolDefinition};
use crate::server::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};

/// Default per-request timeout. Browser operations can be slow; anything
/// past this is treated as an unreachable upstream.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Launch description for a provider subprocess: command, fixed arguments,
/// and an explicit environment (never the full ambient one).
#[derive(Debug, Clone)]
pub struct SubprocessSpec {
    /// Executable to launch.
    pub command: String,
    /// Fixed startup arguments.
    pub args: Vec<String>,
    /// Complete environment for the child.
    pub env: HashMap<String, String>,
}

#[derive(Debug)]
struct TransportInner {
    // Held so the process handle lives exactly as long as the transport.
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: i64,
}

/// JSON-RPC client over a provider subprocess's stdio.
#[derive(Debug)]
pub struct StdioTransport {
    inner: Mutex<TransportInner>,
    request_timeout: Duration,
}

impl StdioTransport {
    /// Spawn the subprocess and perform the MCP initialize handshake.
    pub async fn connect(spec: SubprocessSpec) -> Result<Self> {
        Self::connect_with_timeout(spec, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Spawn with a custom per-request timeout.
    pub async fn connect_with_timeout(
        spec: SubprocessSpec,
        request_timeout: Duration,
    ) -> Result<Self> {
        tracing::info!(command = %spec.command, "spawning provider subprocess");

        let mut child = Command::new(&spec.command)
            .args(&spec.args)
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Internal("child stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("child stdout not captured".into()))?;

        let transport = Self {
            inner: Mutex::new(TransportInner {
                _child: child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
                next_id: 0,
            }),
            request_timeout,
        };

        transport.initialize().await?;
        Ok(transport)
    }

    async fn initialize(&self) -> Result<()> {
        let result = self
            .request(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": SERVER_NAME,
                        "version": SERVER_VERSION,
                    },
                })),
            )
            .await?;

        if let Some(info) = result.get("serverInfo") {
            tracing::info!(server_info = %info, "provider initialized");
        }

        self.notify("notifications/initialized", None).await
    }

    /// Discover the provider's full tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let result = self.request("tools/list", None).await?;
        let list: ListToolsResult = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    /// Send a request and wait for its matching response.
    async fn request(&self, method: &str, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        inner.next_id += 1;
        let id = inner.next_id;

        let request = JsonRpcRequest::new(JsonRpcId::Number(id), method, params);
        let line = serde_json::to_string(&request)?;
        inner.stdin.write_all(line.as_bytes()).await?;
        inner.stdin.write_all(b"\n").await?;
        inner.stdin.flush().await?;

        let response = timeout(self.request_timeout, read_response(&mut inner.stdout, id))
            .await
            .map_err(|_| Error::Upstream {
                tool: method.to_string(),
                message: format!(
                    "no response within {}s",
                    self.request_timeout.as_secs()
                ),
            })??;

        if let Some(error) = response.error {
            return Err(Error::JsonRpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    /// Send a notification (no response expected).
    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let notification = JsonRpcRequest::notification(method, params);
        let line = serde_json::to_string(&notification)?;
        guard.stdin.write_all(line.as_bytes()).await?;
        guard.stdin.write_all(b"\n").await?;
        guard.stdin.flush().await?;
        Ok(())
    }
}

/// Read lines until the response with the given id arrives, skipping
/// notifications the provider emits in between.
async fn read_response(
    lines: &mut Lines<BufReader<ChildStdout>>,
    id: i64,
) -> Result<JsonRpcResponse> {
    loop {
        let Some(line) = lines.next_line().await? else {
            return Err(Error::Internal("provider closed its stdout".into()));
        };
        if line.trim().is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("skipping unparseable provider output: {}", e);
                continue;
            }
        };

        if value.get("method").is_some() {
            // Provider-originated notification; not ours to answer.
            tracing::debug!(method = ?value.get("method"), "provider notification");
            continue;
        }

        let response: JsonRpcResponse = serde_json::from_value(value)?;
        if response.id != Some(JsonRpcId::Number(id)) {
            // Stale response from an earlier timed-out request.
            continue;
        }
        return Ok(response);
    }
}

#[async_trait::async_trait]
impl ProxyTransport for StdioTransport {
    async fn call_tool(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        let params = serde_json::json!({
            "name": name,
            "arguments": args,
        });

        self.request("tools/call", Some(params))
            .await
            .map_err(|e| match e {
                upstream @ Error::Upstream { .. } => upstream,
                other => Error::Upstream {
                    tool: name.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    // Shell stand-in for a provider: answers the handshake, discovery, and
    // one tool call with canned responses keyed to the transport's
    // deterministic request ids (1, 2, 3).
    const FAKE_PROVIDER: &str = r#"
read _init
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"fake-provider","version":"0.0.1"}}}'
read _initialized
read _list
printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"browser_snapshot","description":"Capture page state","inputSchema":{"type":"object","properties":{}}}]}}'
read _call
printf '%s\n' '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"page body"}],"isError":false}}'
"#;

    fn fake_spec() -> SubprocessSpec {
        SubprocessSpec {
            command: "/bin/sh".into(),
            args: vec!["-c".into(), FAKE_PROVIDER.into()],
            env: HashMap::new(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn handshake_discovery_and_call() {
        let transport =
            StdioTransport::connect_with_timeout(fake_spec(), Duration::from_secs(5))
                .await
                .unwrap();

        let tools = transport.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "browser_snapshot");

        let result = assert_ok!(
            transport
                .call_tool("browser_snapshot", serde_json::json!({}))
                .await
        );
        assert_eq!(result["content"][0]["text"], "page body");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unresponsive_provider_times_out() {
        let spec = SubprocessSpec {
            command: "/bin/sh".into(),
            args: vec!["-c".into(), "sleep 30".into()],
            env: HashMap::new(),
        };

        let err = StdioTransport::connect_with_timeout(spec, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { tool, .. } if tool == "initialize"));
    }
}
