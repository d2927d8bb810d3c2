//! Playwright MCP subprocess mount.
//!
//! Spawns `@playwright/mcp` over stdio, discovers its tool catalog (70+
//! browser automation tools), and registers each one under the
//! `playwright_` namespace. Mount failure is fatal: the gateway must not
//! start with a namespace that silently exposes no tools.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::ToolDefinition;
use crate::registry::{Handler, ToolDescriptor, ToolRegistry};
use crate::transport::{StdioTransport, SubprocessSpec};

/// Namespace prefix applied to every discovered playwright tool.
pub const NAMESPACE: &str = "playwright";

// Always forwarded to the subprocess, empty if unset.
const ENV_ALWAYS: &[&str] = &["PATH", "NODE_PATH"];

// Forwarded only when set in the gateway's environment.
const ENV_OPTIONAL: &[&str] = &[
    "PLAYWRIGHT_BROWSERS_PATH",
    "DISPLAY",
    "PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH",
];

/// Launch configuration for the playwright provider.
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Explicit launcher override; when unset, a local
    /// `node_modules/.bin/npx` is preferred over `npx` from PATH.
    pub command: Option<String>,
    /// npm package to launch.
    pub package: String,
    /// Whether the browser runs headless.
    pub headless: bool,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            command: None,
            package: "@playwright/mcp".into(),
            headless: true,
        }
    }
}

impl PlaywrightConfig {
    /// Resolve the launcher command.
    pub fn resolve_command(&self) -> String {
        if let Some(command) = &self.command {
            return command.clone();
        }
        let local = Path::new("node_modules/.bin/npx");
        if local.exists() {
            return local.to_string_lossy().into_owned();
        }
        "npx".into()
    }

    /// Fixed startup arguments for the subprocess.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), self.package.clone()];
        if self.headless {
            args.push("--headless".into());
        }
        args.push("--isolated".into());
        args.push("--no-sandbox".into());
        args
    }

    /// Full subprocess launch description.
    pub fn spec(&self) -> SubprocessSpec {
        SubprocessSpec {
            command: self.resolve_command(),
            args: self.launch_args(),
            env: forwarded_env(|key| std::env::var(key).ok()),
        }
    }
}

/// Build the child environment from the allow-list. The ambient environment
/// is never forwarded wholesale.
pub fn forwarded_env(lookup: impl Fn(&str) -> Option<String>) -> HashMap<String, String> {
    let mut env = HashMap::new();

    for key in ENV_ALWAYS {
        env.insert((*key).to_string(), lookup(key).unwrap_or_default());
    }

    let home = lookup("HOME")
        .or_else(|| lookup("USERPROFILE"))
        .unwrap_or_default();
    env.insert("HOME".into(), home);

    for key in ENV_OPTIONAL {
        if let Some(value) = lookup(key) {
            env.insert((*key).to_string(), value);
        }
    }

    env
}

/// A mounted playwright provider. Owns the subprocess lifetime: when the
/// last transport handle is dropped, the child is terminated.
pub struct PlaywrightMount {
    /// Handle to the running subprocess transport.
    pub transport: Arc<StdioTransport>,
    /// Number of tools registered under the namespace.
    pub tool_count: usize,
}

/// Spawn the provider, discover its tools, and register each one as
/// `playwright_<tool>`.
pub async fn mount(registry: &mut ToolRegistry, config: &PlaywrightConfig) -> Result<PlaywrightMount> {
    let spec = config.spec();

    let transport = StdioTransport::connect(spec).await.map_err(|e| Error::Mount {
        namespace: NAMESPACE.into(),
        message: e.to_string(),
    })?;

    let tools = transport.list_tools().await.map_err(|e| Error::Mount {
        namespace: NAMESPACE.into(),
        message: format!("tool discovery failed: {e}"),
    })?;

    if tools.is_empty() {
        return Err(Error::Mount {
            namespace: NAMESPACE.into(),
            message: "provider exposed no tools".into(),
        });
    }

    let transport = Arc::new(transport);
    let tool_count = tools.len();

    for tool in tools {
        let remote_name = tool.name.clone();
        registry.register(ToolDescriptor {
            definition: ToolDefinition {
                name: format!("{NAMESPACE}_{remote_name}"),
                description: tool.description,
                input_schema: tool.input_schema,
            },
            handler: Handler::Proxied {
                transport: transport.clone(),
                remote_name,
            },
        })?;
    }

    tracing::info!(tools = tool_count, "mounted {} provider", NAMESPACE);

    Ok(PlaywrightMount {
        transport,
        tool_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_allow_list_always_includes_core_vars() {
        let env = forwarded_env(|key| match key {
            "PATH" => Some("/usr/bin".into()),
            "HOME" => Some("/home/svc".into()),
            _ => None,
        });

        assert_eq!(env["PATH"], "/usr/bin");
        assert_eq!(env["NODE_PATH"], "");
        assert_eq!(env["HOME"], "/home/svc");
        assert!(!env.contains_key("DISPLAY"));
    }

    #[test]
    fn env_allow_list_forwards_optional_vars_when_set() {
        let env = forwarded_env(|key| match key {
            "DISPLAY" => Some(":0".into()),
            "PLAYWRIGHT_BROWSERS_PATH" => Some("/opt/browsers".into()),
            _ => None,
        });

        assert_eq!(env["DISPLAY"], ":0");
        assert_eq!(env["PLAYWRIGHT_BROWSERS_PATH"], "/opt/browsers");
        // Ambient secrets are never picked up implicitly.
        assert_eq!(env.len(), ENV_ALWAYS.len() + 1 + 2);
    }

    #[test]
    fn home_falls_back_to_userprofile() {
        let env = forwarded_env(|key| match key {
            "USERPROFILE" => Some(r"C:\Users\svc".into()),
            _ => None,
        });
        assert_eq!(env["HOME"], r"C:\Users\svc");
    }

    #[test]
    fn launch_args_reflect_headless_setting() {
        let headless = PlaywrightConfig::default();
        assert_eq!(
            headless.launch_args(),
            vec!["-y", "@playwright/mcp", "--headless", "--isolated", "--no-sandbox"]
        );

        let visible = PlaywrightConfig {
            headless: false,
            ..Default::default()
        };
        assert!(!visible.launch_args().contains(&"--headless".to_string()));
        assert!(visible.launch_args().contains(&"--isolated".to_string()));
    }

    #[test]
    fn explicit_command_override_wins() {
        let config = PlaywrightConfig {
            command: Some("/opt/custom/npx".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_command(), "/opt/custom/npx");
    }
}
