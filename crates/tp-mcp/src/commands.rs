//! CLI command implementations for `tp-mcp`.
//!
//! - **`serve`**: run the MCP server over streamable HTTP or stdio
//! - **`list`**: print the tool catalog
//! - **`call`**: run a single tool locally with JSON input
//!
//! Each command module exports an `*Args` struct implementing `clap::Args`
//! and a `run` function.

use std::path::Path;

use anyhow::{Context, Result};
use tp_mcp_core::{Config, Credential, Toolbox};
use tracing::{debug, info, warn};

pub mod call;
pub mod list;
pub mod serve;

/// Loads `tp-mcp.toml` from `path`, or resolves it from the environment and
/// the current directory, then applies the `--timeout` override.
pub fn load_config(path: Option<&Path>, timeout_secs: Option<u64>) -> Result<Config> {
    let (mut config, source) = match path {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("failed to load config: {}", path.display()))?;
            (config, Some(path.to_path_buf()))
        }
        None => Config::load_resolved().context("failed to load tp-mcp.toml")?,
    };

    if let Some(secs) = timeout_secs {
        config.cli.timeout_secs = secs;
    }

    match source {
        Some(path) => info!(path = %path.display(), "Loaded config"),
        None => debug!("No config file found, using defaults"),
    }
    Ok(config)
}

/// Resolves the API key and builds the toolbox.
///
/// A missing key is not fatal; each CLI-backed tool reports it on call.
pub fn build_toolbox(config: &Config) -> Result<Toolbox> {
    let credential =
        Credential::resolve(&config.credential).context("failed to read credentials file")?;
    if !credential.is_present() {
        warn!(env_var = credential.env_var(), "API key is not set");
    }
    Ok(Toolbox::new(config.cli.clone(), credential))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_config_reads_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(
            &path,
            "[cli]\nbinary = \"/opt/tp/bin/tp\"\ntimeout_secs = 90\n\n[server]\naddr = \"0.0.0.0:9000\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path), None).unwrap();

        assert_eq!(config.cli.binary, Path::new("/opt/tp/bin/tp"));
        assert_eq!(config.cli.timeout_secs, 90);
        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert_eq!(config.server.path, "/mcp");
    }

    #[test]
    fn test_timeout_flag_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tp-mcp.toml");
        fs::write(&path, "[cli]\ntimeout_secs = 90\n").unwrap();

        let config = load_config(Some(&path), Some(5)).unwrap();

        assert_eq!(config.cli.timeout_secs, 5);
    }

    #[test]
    fn test_load_config_reports_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");

        let err = load_config(Some(&path), None).unwrap_err();

        assert!(err.to_string().starts_with("failed to load config: "));
    }
}
