//! # fourth-playwright-mcp
//!
//! MCP (Model Context Protocol) gateway for Fourth browser automation.
//!
//! This crate fronts heterogeneous automation capabilities with one uniform
//! tool-call surface: the full `@playwright/mcp` browser tool catalog
//! (mounted as a stdio subprocess under the `playwright_` namespace), a
//! static skills resource catalog, and a set of composite Fourth workflow
//! tools that chain browser steps with progress reporting.
//!
//! ## Available Tools
//!
//! - `playwright_*`: the proxied browser automation catalog (70+ tools)
//! - `fourth_login`: full login flow with optional SSO handling
//! - `fourth_get_user_context`: capture the signed-in user's context
//! - `fourth_navigate_module`: jump to a Fourth module by keyword
//! - `fourth_wait_for_load`: poll until the SPA renders content
//! - `fourth_extract_table` / `fourth_extract_report`: page data capture
//! - `browser_wait_for`: type-normalizing wrapper over the playwright wait
//!
//! ## Usage with Claude Desktop
//!
//! Add to your MCP configuration:
//!
//! ```json
//! {
//!   "servers": {
//!     "fourth": {
//!       "command": "fourth-mcp",
//!       "args": ["--stdio"],
//!       "env": {}
//!     }
//!   }
//! }
//! ```
//!
//! ## Startup Model
//!
//! The tool registry is assembled once at boot (provider mount first, then
//! the workflow tools) and is read-only afterwards. A duplicate tool name
//! or a failed provider mount aborts startup; the gateway never runs
//! partially mounted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod dispatch;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod protocol;
pub mod providers;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;

pub use dispatch::{Dispatch, ProxyTransport, Router};
pub use error::{Error, Result};
pub use protocol::{JsonRpcRequest, JsonRpcResponse, McpMessage};
pub use registry::{Handler, ToolDescriptor, ToolRegistry};
pub use server::McpServer;
pub use tools::{Tool, ToolContext};
