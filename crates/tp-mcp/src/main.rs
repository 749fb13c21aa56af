//! MCP server exposing TensorPool GPU clusters and jobs to agents.
//!
//! Usage:
//! ```bash
//! tp-mcp serve                       # Streamable HTTP on 127.0.0.1:8000/mcp
//! tp-mcp serve --stdio               # MCP over stdin/stdout
//! tp-mcp list                        # Show the tool catalog
//! tp-mcp call <tool> <json|@file>    # Run one tool locally
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_LOG_DIRECTIVE: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "tp-mcp", author, version, about)]
struct Cli {
    /// Path to a `tp-mcp.toml` config file (defaults to the nearest one).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Per-invocation timeout for the `tp` CLI, in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the tools over MCP
    Serve(commands::serve::ServeArgs),

    /// List available tools
    List(commands::list::ListArgs),

    /// Call a tool directly
    Call(commands::call::CallArgs),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serve(_) => f.debug_tuple("Serve").finish(),
            Self::List(_) => f.debug_tuple("List").finish(),
            Self::Call(_) => f.debug_tuple("Call").finish(),
        }
    }
}

/// `RUST_LOG` when set and valid, otherwise [`DEFAULT_LOG_DIRECTIVE`].
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the stdio transport.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::List(args) => commands::list::run(args),
        Command::Serve(args) => {
            let config = commands::load_config(cli.config.as_deref(), cli.timeout)?;
            commands::serve::run(args, &config).await
        }
        Command::Call(args) => {
            let config = commands::load_config(cli.config.as_deref(), cli.timeout)?;
            commands::call::run(args, &config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    fn parse(argv: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(argv.iter().copied())
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("  ")).to_string(), "info");
    }

    #[test]
    fn test_log_filter_rust_log_replaces_default() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(
            log_filter(Some("tp_mcp_core=debug")).to_string(),
            "tp_mcp_core=debug"
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let err = parse(&["tp-mcp"]).expect_err("expected clap parse error");
        assert!(
            matches!(
                err.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
            ),
            "unexpected error kind: {:?}",
            err.kind()
        );
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        let err = parse(&["tp-mcp", "deploy"]).expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_cli_serve_defaults_defer_to_config() -> Result<(), clap::Error> {
        let cli = parse(&["tp-mcp", "serve"])?;

        let Command::Serve(args) = cli.command else {
            panic!("expected Command::Serve");
        };

        assert!(args.addr.is_none());
        assert!(args.path.is_none());
        assert!(!args.stdio);
        assert!(cli.config.is_none());
        assert!(cli.timeout.is_none());
        Ok(())
    }

    #[test]
    fn test_cli_global_flags_accepted_after_subcommand() -> Result<(), clap::Error> {
        let cli = parse(&[
            "tp-mcp",
            "serve",
            "--stdio",
            "--config",
            "ops/tp-mcp.toml",
            "--timeout",
            "30",
        ])?;

        assert_eq!(cli.config, Some(PathBuf::from("ops/tp-mcp.toml")));
        assert_eq!(cli.timeout, Some(30));
        Ok(())
    }

    #[test]
    fn test_cli_call_requires_input_argument() {
        let err = parse(&["tp-mcp", "call", "cluster_list"]).expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_list_defaults_to_table_format() -> Result<(), clap::Error> {
        let cli = parse(&["tp-mcp", "list"])?;

        let Command::List(args) = cli.command else {
            panic!("expected Command::List");
        };

        assert_eq!(args.format, "table");
        Ok(())
    }

    #[test]
    fn test_command_debug_shows_variant_name_only() -> Result<(), clap::Error> {
        for (argv, expected) in [
            ("tp-mcp serve", "Serve"),
            ("tp-mcp list", "List"),
            ("tp-mcp call job_list {}", "Call"),
        ] {
            let cli = parse(&argv.split_whitespace().collect::<Vec<_>>())?;
            assert_eq!(format!("{:?}", cli.command), expected, "for argv: {argv}");
        }
        Ok(())
    }
}
