//! List the tools served by `tp-mcp`.
//!
//! Supports a human-readable table and JSON with full input schemas.

use anyhow::Result;
use clap::Args;
use console::style;
use tp_mcp_core::{ToolInfo, Toolbox};

/// Truncates a description to 40 characters, ending in `...` when cut.
fn truncate_description(description: &str) -> String {
    const MAX_DESCRIPTION_CHARS: usize = 40;
    const ELLIPSIS: &str = "...";
    const TRUNCATED_CHARS: usize = MAX_DESCRIPTION_CHARS - ELLIPSIS.len();

    let mut chars = description.chars();
    let head: String = chars.by_ref().take(MAX_DESCRIPTION_CHARS).collect();

    if chars.next().is_none() {
        return head;
    }

    let prefix: String = head.chars().take(TRUNCATED_CHARS).collect();
    format!("{prefix}{ELLIPSIS}")
}

/// Command-line arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Output format: "table" for human-readable table or "json" for
    /// machine-readable JSON
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Prints the tool catalog.
pub fn run(args: &ListArgs) -> Result<()> {
    let tools = Toolbox::tools();

    if args.format == "json" {
        let tools_json: Vec<serde_json::Value> = tools.iter().map(tool_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&tools_json)?);
        return Ok(());
    }

    println!(
        "{:<20} {:<22} {}",
        style("TOOL").bold(),
        style("TITLE").bold(),
        style("DESCRIPTION").bold()
    );
    println!("{}", "-".repeat(80));

    for tool in &tools {
        println!(
            "{:<20} {:<22} {}",
            tool.name,
            tool.title,
            truncate_description(tool.description)
        );
    }

    println!("\n{} {} tool(s) available", style("✓").green(), tools.len());
    Ok(())
}

fn tool_to_json(tool: &ToolInfo) -> serde_json::Value {
    serde_json::json!({
        "name": tool.name,
        "title": tool.title,
        "description": tool.description,
        "inputSchema": tool.input_schema,
    })
}
