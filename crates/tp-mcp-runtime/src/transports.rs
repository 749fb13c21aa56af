//! Transport layer implementations for serving the toolbox.
//!
//! Each transport adapts [`Toolbox`](tp_mcp_core::Toolbox) to a wire
//! protocol. Only MCP is provided; stdio and streamable HTTP are both
//! handled by `rmcp` on top of the same [`McpService`](mcp::McpService).

/// Model Context Protocol (MCP) transport implementation.
///
/// Provides `McpService`, which answers `tools/list` from the toolbox catalog
/// and dispatches `tools/call` to the matching tool.
pub mod mcp;
