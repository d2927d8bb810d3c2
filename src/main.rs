//! fourth-mcp - MCP gateway for Fourth browser automation
//!
//! This binary mounts the @playwright/mcp subprocess, scans the skills
//! catalog, registers the Fourth workflow tools, and serves the combined
//! tool surface over stdio.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fourth_playwright_mcp::auth::OAuthConfig;
use fourth_playwright_mcp::providers::{playwright, skills::SkillsCatalog};
use fourth_playwright_mcp::server::{SERVER_NAME, SERVER_VERSION};
use fourth_playwright_mcp::tools::{register_workflows, WorkflowConfig};
use fourth_playwright_mcp::{McpServer, ToolRegistry};

/// MCP gateway for Fourth browser automation.
#[derive(Parser, Debug)]
#[command(name = "fourth-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run in stdio mode (standard MCP transport).
    #[arg(long, default_value = "true")]
    stdio: bool,

    /// Show the automated browser window (non-headless mode).
    #[arg(long)]
    visible: bool,

    /// Launcher for the @playwright/mcp subprocess (default: npx,
    /// preferring a local node_modules/.bin/npx).
    #[arg(long)]
    playwright_cmd: Option<String>,

    /// Root directory of the skills catalog.
    #[arg(long, default_value = "skills")]
    skills_dir: PathBuf,

    /// Base URL of the Fourth application for module navigation.
    #[arg(long, default_value = "https://app.fourth.com")]
    base_url: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Log to stderr (not stdout, which is used for MCP protocol)
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);

    match run(args).await {
        Ok(()) => {
            tracing::info!("Gateway exited cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    match OAuthConfig::from_env() {
        Some(oauth) => {
            tracing::info!(client_id = %oauth.client_id, "OAuth credential exchange configured")
        }
        None => tracing::info!("OAUTH_CLIENT_ID not set; running without OAuth"),
    }

    let mut registry = ToolRegistry::new();

    // Mount @playwright/mcp subprocess (70+ browser automation tools).
    // A failed mount is fatal: never start with an empty namespace.
    let playwright_config = playwright::PlaywrightConfig {
        command: args.playwright_cmd.clone(),
        headless: !args.visible,
        ..Default::default()
    };
    if !playwright_config.headless {
        tracing::info!("Browser will be visible (non-headless mode)");
    }
    let mount = playwright::mount(&mut registry, &playwright_config)
        .await
        .context("mounting @playwright/mcp provider")?;

    // Skills directory provider; an absent root yields an empty catalog.
    let skills =
        SkillsCatalog::scan(&args.skills_dir).context("scanning skills catalog")?;

    // Custom Fourth workflow tools and wrappers.
    register_workflows(&mut registry, &WorkflowConfig { base_url: args.base_url })
        .context("registering workflow tools")?;

    tracing::info!(tools = registry.len(), "tool registry assembled");

    let server = Arc::new(McpServer::new(registry, skills));

    #[cfg(feature = "http")]
    {
        use std::net::SocketAddr;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .context("parsing health listen address")?;
        tokio::spawn(async move {
            if let Err(e) = fourth_playwright_mcp::http::serve_health(addr).await {
                tracing::error!("health endpoint error: {}", e);
            }
        });
    }

    if args.stdio {
        server.run_stdio().await?;
    } else {
        anyhow::bail!("only stdio mode is currently supported");
    }

    // The mount holder going out of scope terminates the subprocess.
    drop(mount);
    Ok(())
}
