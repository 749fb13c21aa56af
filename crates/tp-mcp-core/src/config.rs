//! Configuration for the TensorPool MCP adapter.
//!
//! # Configuration Types
//!
//! - **Config**: settings from `tp-mcp.toml` - CLI location, timeout,
//!   credential variable and server address
//! - **`CredentialsConfig`**: the API key from
//!   `~/.config/tp-mcp/credentials.toml`
//! - **Credential**: the resolved API key handed to the invoker
//!
//! # Resolution Algorithm
//!
//! `tp-mcp.toml` is located with:
//!
//! 1. Environment variable override (`TP_MCP_CONFIG`)
//! 2. Current directory
//! 3. Parent directories (walk up to filesystem root)
//!
//! A missing file is not an error; every field has a default.
//!
//! The credential is read from the configured environment variable first and
//! falls back to the credentials file (`TP_MCP_CREDENTIALS` or the XDG config
//! directory).

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Project config file name.
pub const CONFIG_FILE_NAME: &str = "tp-mcp.toml";

/// Environment variable pointing at an explicit `tp-mcp.toml`.
pub const CONFIG_PATH_ENV: &str = "TP_MCP_CONFIG";

/// Environment variable pointing at an explicit credentials file.
pub const CREDENTIALS_PATH_ENV: &str = "TP_MCP_CREDENTIALS";

/// Errors that can occur during configuration resolution or loading.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error when reading a config file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error when a config file is malformed.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings from `tp-mcp.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How to run the `tp` CLI.
    #[serde(default)]
    pub cli: CliConfig,

    /// Where the API key comes from.
    #[serde(default)]
    pub credential: CredentialConfig,

    /// MCP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[cli]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Executable name (looked up on `PATH`) or path.
    pub binary: PathBuf,

    /// Per-invocation timeout in seconds.
    pub timeout_secs: u64,

    /// Remedy shown when the executable is missing.
    pub install_hint: String,

    /// Directory for temporary public key files; the system temp dir if unset.
    pub key_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tp"),
            timeout_secs: 600,
            install_hint: "uv add tensorpool".to_string(),
            key_dir: None,
        }
    }
}

impl CliConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[credential]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialConfig {
    /// Variable the `tp` CLI reads its API key from.
    pub env_var: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            env_var: "TENSORPOOL_API_KEY".to_string(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address for the streamable HTTP transport.
    pub addr: String,

    /// HTTP path of the MCP endpoint.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            path: "/mcp".to_string(),
        }
    }
}

impl Config {
    /// Loads and parses a config file from the given path.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads config using the resolution algorithm, starting in the current
    /// directory.
    ///
    /// Returns the config together with the path it came from, or defaults
    /// and `None` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn load_resolved() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let current = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Self::resolve_from(env_path.as_deref(), &current)
    }

    /// Resolution with explicit inputs: `env_path` (if it exists), then
    /// `start` and its ancestors.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn resolve_from(
        env_path: Option<&Path>,
        start: &Path,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        // Step 1: Environment variable override
        if let Some(path) = env_path
            && path.exists()
        {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        // Step 2 and 3: start directory, then walk up
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok((config, Some(candidate)));
            }
        }

        Ok((Self::default(), None))
    }
}

/// Credentials file (`~/.config/tp-mcp/credentials.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// TensorPool API key.
    pub api_key: Option<String>,
}

impl CredentialsConfig {
    /// Loads the credentials file from `TP_MCP_CREDENTIALS` or the XDG config
    /// directory. Returns `Ok(None)` when neither exists.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file exists but cannot be read or
    /// parsed.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        let path = std::env::var_os(CREDENTIALS_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|dir| dir.join("tp-mcp").join("credentials.toml")));
        match path {
            Some(path) if path.is_file() => Self::load(&path).map(Some),
            _ => Ok(None),
        }
    }

    /// Loads a credentials file from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The API key passed to the `tp` CLI, resolved once at startup.
///
/// The value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    env_var: String,
    value: Option<String>,
}

impl Credential {
    /// Creates a credential; empty values count as missing.
    #[must_use]
    pub fn new(env_var: impl Into<String>, value: Option<String>) -> Self {
        Self {
            env_var: env_var.into(),
            value: value.filter(|v| !v.trim().is_empty()),
        }
    }

    /// Resolves the credential from the environment, then the credentials
    /// file.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` only if a credentials file exists and is
    /// malformed.
    pub fn resolve(config: &CredentialConfig) -> Result<Self, ConfigError> {
        let from_env = Self::new(&*config.env_var, std::env::var(&config.env_var).ok());
        if from_env.is_present() {
            return Ok(from_env);
        }
        let from_file = CredentialsConfig::load_resolved()?.and_then(|c| c.api_key);
        Ok(Self::new(&*config.env_var, from_file))
    }

    /// Name of the environment variable the CLI expects.
    #[must_use]
    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("env_var", &self.env_var)
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults_match_tp_cli() {
        let config = Config::default();
        assert_eq!(config.cli.binary, PathBuf::from("tp"));
        assert_eq!(config.cli.timeout(), Duration::from_secs(600));
        assert_eq!(config.cli.install_hint, "uv add tensorpool");
        assert_eq!(config.credential.env_var, "TENSORPOOL_API_KEY");
        assert_eq!(config.server.addr, "127.0.0.1:8000");
        assert_eq!(config.server.path, "/mcp");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"[cli]
binary = "/opt/tp/bin/tp"
timeout_secs = 30
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.cli.binary, PathBuf::from("/opt/tp/bin/tp"));
        assert_eq!(config.cli.timeout_secs, 30);
        assert_eq!(config.cli.install_hint, "uv add tensorpool");
        assert_eq!(config.credential, CredentialConfig::default());
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[cli]\ntimeout = 5\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn test_resolve_walks_up_directories() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("deeply/nested/project");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[credential]\nenv_var = \"TP_KEY\"\n",
        )
        .unwrap();

        let (config, path) = Config::resolve_from(None, &nested).unwrap();

        assert_eq!(config.credential.env_var, "TP_KEY");
        assert_eq!(path, Some(temp.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_env_path_overrides_directory_search() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "[cli]\ntimeout_secs = 1\n").unwrap();
        let explicit = temp.path().join("explicit.toml");
        fs::write(&explicit, "[cli]\ntimeout_secs = 2\n").unwrap();

        let (config, path) = Config::resolve_from(Some(&explicit), temp.path()).unwrap();

        assert_eq!(config.cli.timeout_secs, 2);
        assert_eq!(path, Some(explicit));
    }

    #[test]
    fn test_missing_env_path_falls_back_to_search() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "[cli]\ntimeout_secs = 7\n").unwrap();

        let (config, _) =
            Config::resolve_from(Some(&temp.path().join("missing.toml")), temp.path()).unwrap();

        assert_eq!(config.cli.timeout_secs, 7);
    }

    #[test]
    fn test_credentials_file_parses_api_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("credentials.toml");
        fs::write(&path, "api_key = \"tp-from-file\"\n").unwrap();

        let creds = CredentialsConfig::load(&path).unwrap();
        assert_eq!(creds.api_key.as_deref(), Some("tp-from-file"));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let credential = Credential::new("TENSORPOOL_API_KEY", Some("   ".to_string()));
        assert!(!credential.is_present());
        assert_eq!(credential.value(), None);
    }

    #[test]
    fn test_credential_debug_redacts_value() {
        let credential = Credential::new("TENSORPOOL_API_KEY", Some("tp-secret".to_string()));
        let debug = format!("{credential:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("tp-secret"));
    }
}
