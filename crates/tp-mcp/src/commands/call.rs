//! `tp-mcp call` command implementation.
//!
//! Runs one tool in-process, exactly as the MCP server would, and prints the
//! text it returns.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use tp_mcp_core::Config;

use super::build_toolbox;

/// Arguments for the `call` command.
#[derive(Args)]
pub struct CallArgs {
    /// Tool name (e.g., "cluster_list").
    pub tool: String,

    /// Input JSON (inline or @file.json).
    pub input: String,
}

pub async fn run(args: &CallArgs, config: &Config) -> Result<()> {
    let input = read_input(&args.input)?;

    println!(
        "{} Calling tool: {}",
        style("→").cyan(),
        style(&args.tool).bold()
    );

    let toolbox = build_toolbox(config)?;
    let output = toolbox
        .call(&args.tool, Some(input))
        .await
        .context("failed to call tool")?;

    if output.is_error {
        println!("{} Error:", style("✗").red().bold());
        println!("{output}");
        anyhow::bail!("tool {} reported an error", args.tool);
    }

    println!("{} Result:", style("✓").green().bold());
    println!("{output}");
    Ok(())
}

/// Parses the input argument, reading it from a file when prefixed with `@`.
fn read_input(input: &str) -> Result<serde_json::Value> {
    let json = if let Some(path) = input.strip_prefix('@') {
        let path = PathBuf::from(path);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?
    } else {
        input.to_string()
    };

    let value: serde_json::Value = serde_json::from_str(&json).context("invalid input JSON")?;
    if !value.is_object() {
        anyhow::bail!("input must be a JSON object");
    }
    Ok(value)
}
