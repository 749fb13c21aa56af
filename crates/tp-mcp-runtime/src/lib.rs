//! MCP serving for the TensorPool tool surface.
//!
//! Wraps a [`tp_mcp_core::Toolbox`] in an `rmcp` server handler that can be
//! mounted in an `axum` router (streamable HTTP) or served over stdio.
//!
//! # Example
//!
//! ```ignore
//! use tp_mcp_core::{Config, Credential, Toolbox};
//! use tp_mcp_runtime::McpService;
//!
//! let (config, _) = Config::load_resolved()?;
//! let credential = Credential::resolve(&config.credential)?;
//! let service = McpService::new(Toolbox::new(config.cli, credential));
//! let router = axum::Router::new().nest_service("/mcp", service.streamable_http_service());
//! ```

pub mod transports;

pub use transports::mcp::McpService;
