//! `tp-mcp serve` command implementation.
//!
//! Runs the MCP server in one of two modes:
//!
//! - **HTTP mode**: streamable HTTP endpoint on a configurable address/path
//! - **stdio mode**: MCP over standard input/output for desktop clients
//!
//! Flags override the `[server]` section of `tp-mcp.toml`.

use std::{future::Future, net::SocketAddr};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use rmcp::{
    service::ServiceExt,
    transport::{stdio, streamable_http_server::StreamableHttpServerConfig},
};
use tokio::signal;
use tp_mcp_core::{Config, Toolbox};
use tp_mcp_runtime::McpService;
use tracing::info;

use super::build_toolbox;

/// Command-line arguments for the serve subcommand.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (defaults to `[server] addr`).
    #[arg(short = 'a', long)]
    pub addr: Option<String>,

    /// HTTP path for the MCP endpoint (defaults to `[server] path`).
    #[arg(long)]
    pub path: Option<String>,

    /// Run in stdio mode instead of HTTP mode.
    #[arg(long, default_value_t = false)]
    pub stdio: bool,
}

impl ServeArgs {
    fn addr<'a>(&'a self, config: &'a Config) -> &'a str {
        self.addr.as_deref().unwrap_or(&config.server.addr)
    }

    fn path(&self, config: &Config) -> String {
        normalize_path(self.path.as_deref().unwrap_or(&config.server.path))
    }
}

/// Runs the MCP server until Ctrl+C.
pub async fn run(args: &ServeArgs, config: &Config) -> Result<()> {
    let toolbox = build_toolbox(config)?;

    if args.stdio {
        return run_stdio(toolbox).await;
    }

    let shutdown = async {
        let _ = signal::ctrl_c().await;
        info!("Received shutdown signal");
    };
    run_http(args, config, toolbox, shutdown).await
}

/// Serves streamable HTTP until `shutdown` completes.
async fn run_http<F>(args: &ServeArgs, config: &Config, toolbox: Toolbox, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    println!("{} Starting MCP server...", style("→").cyan());
    println!(
        "{} Loaded {} tool(s)",
        style("✓").green().bold(),
        Toolbox::tools().len()
    );

    let addr: SocketAddr = args
        .addr(config)
        .parse()
        .with_context(|| format!("invalid --addr value: {}", args.addr(config)))?;
    let path = args.path(config);

    let service = McpService::new(toolbox).streamable_http_service_with_config(
        StreamableHttpServerConfig {
            // Stateless mode keeps compatibility with MCP clients that don't
            // send the initialized notification after initialize.
            stateful_mode: false,
            ..Default::default()
        },
    );
    let router = axum::Router::new().nest_service(path.as_str(), service);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind MCP server on {addr}"))?;

    info!(address = %addr, path = %path, "Starting MCP server");

    println!(
        "{} MCP server running on http://{}{}",
        style("✓").green().bold(),
        addr,
        path
    );
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("mcp server error")?;

    info!("MCP server stopped");
    Ok(())
}

/// Serves MCP over stdin/stdout. Status lines go to stderr.
async fn run_stdio(toolbox: Toolbox) -> Result<()> {
    eprintln!("{} Starting MCP stdio server...", style("→").cyan());

    let running = McpService::new(toolbox)
        .serve(stdio())
        .await
        .context("failed to start MCP stdio server")?;

    eprintln!(
        "{} MCP stdio server running with {} tool(s)",
        style("✓").green().bold(),
        Toolbox::tools().len()
    );

    let cancel = running.cancellation_token();
    let mut waiting = Box::pin(running.waiting());

    tokio::select! {
        result = &mut waiting => {
            result.context("mcp stdio server exited")?;
        }
        _ = signal::ctrl_c() => {
            cancel.cancel();
            let _ = waiting.await;
        }
    }

    info!("MCP stdio server stopped");
    Ok(())
}

/// Ensures an HTTP path starts with `/`; empty means `/mcp`.
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/mcp".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct ServeArgsCli {
        #[command(flatten)]
        serve: ServeArgs,
    }

    fn parse(argv: &[&str]) -> ServeArgs {
        ServeArgsCli::try_parse_from(argv)
            .expect("args should parse")
            .serve
    }

    #[test]
    fn test_serve_args_fall_back_to_config() {
        let args = parse(&["test"]);
        let config = Config::default();

        assert_eq!(args.addr(&config), "127.0.0.1:8000");
        assert_eq!(args.path(&config), "/mcp");
        assert!(!args.stdio);
    }

    #[test]
    fn test_serve_flags_override_config() {
        let args = parse(&["test", "--addr", "0.0.0.0:9000", "--path", "tools", "--stdio"]);
        let mut config = Config::default();
        config.server.path = "/from-file".to_string();

        assert_eq!(args.addr(&config), "0.0.0.0:9000");
        assert_eq!(args.path(&config), "/tools");
        assert!(args.stdio);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/mcp");
        assert_eq!(normalize_path("/custom"), "/custom");
        assert_eq!(normalize_path("custom"), "/custom");
    }

    #[tokio::test]
    async fn test_run_http_rejects_invalid_addr() {
        let args = parse(&["test", "--addr", "not-an-address"]);
        let config = Config::default();
        let toolbox = build_toolbox(&config).unwrap();

        let err = run_http(&args, &config, toolbox, async {})
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid --addr value: not-an-address"));
    }
}
