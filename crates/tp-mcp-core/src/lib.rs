//! Core types for exposing the TensorPool `tp` CLI as agent tools.
//!
//! # Key Components
//!
//! - **Invoker**: runs `tp` through a [`ProcessRunner`] and renders the
//!   outcome as agent-readable text ([`Invoker`])
//! - **Toolbox**: the cluster and job operations and their catalog
//!   ([`Toolbox`])
//! - **SSH keys**: public key validation and scoped key files
//! - **Job configs**: `tp.config.toml` rendering
//! - **Config**: `tp-mcp.toml` resolution and credential lookup
//!
//! # Example
//!
//! ```ignore
//! use tp_mcp_core::{Config, Credential, Toolbox};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (config, _path) = Config::load_resolved()?;
//! let credential = Credential::resolve(&config.credential)?;
//! let toolbox = Toolbox::new(config.cli, credential);
//!
//! let output = toolbox.call("cluster_list", None).await?;
//! println!("{output}");
//! # Ok(())
//! # }
//! ```

mod config;
mod invoker;
mod job_config;
mod ssh_key;
mod toolbox;

/// Configuration loading and credential resolution.
pub use config::{
    CONFIG_FILE_NAME, CONFIG_PATH_ENV, CREDENTIALS_PATH_ENV, CliConfig, Config, ConfigError,
    Credential, CredentialConfig, CredentialsConfig, ServerConfig,
};

/// Subprocess execution and result rendering.
pub use invoker::{
    InvokeError, Invoker, ProcessOutput, ProcessRequest, ProcessRunner, RunError, RunFuture,
    TokioProcessRunner,
};

/// `tp.config.toml` generation.
pub use job_config::{DEFAULT_FILENAME, JobConfig, JobConfigError};

/// Public key validation and temporary key files.
pub use ssh_key::{KeyError, PRIVATE_KEY_MARKERS, PUBLIC_KEY_PREFIXES, PublicKey, ScopedKeyFile};

/// The tool surface.
pub use toolbox::{
    ClusterCreateInput, ClusterDestroyInput, ClusterIdInput, JobCancelInput, JobIdInput,
    JobPullInput, JobPushInput, JobWriteConfigInput, OrgScopeInput, ToolInfo, ToolOutput, Toolbox,
    ToolboxError,
};
