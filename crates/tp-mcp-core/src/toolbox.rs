//! The tool surface: cluster and job operations backed by the `tp` CLI.
//!
//! Each operation takes a typed input, performs its own validation or local
//! side effect, and returns a [`ToolOutput`]. Failures never escape as Rust
//! errors; they are rendered into the output text so the calling agent always
//! gets something it can act on. Only protocol-level problems (unknown tool
//! name, arguments that do not match the schema) surface as
//! [`ToolboxError`] from [`Toolbox::call`].

use std::{fmt, path::PathBuf, sync::Arc};

use schemars::JsonSchema;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::{
    config::{CliConfig, Credential},
    invoker::{Invoker, ProcessRunner},
    job_config::{DEFAULT_FILENAME, JobConfig},
    ssh_key::{PublicKey, ScopedKeyFile},
};

/// Errors for calls that never reach a tool.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ToolboxError {
    /// No tool with this name exists.
    #[error("tool not found: {0}")]
    UnknownTool(String),

    /// The arguments do not match the tool's input schema.
    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Text handed back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    /// Whether the text describes a failure or refusal.
    pub is_error: bool,
}

impl ToolOutput {
    #[must_use]
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Descriptor of one tool for listing over a transport.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// JSON schema of the input object.
    pub input_schema: JsonValue,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterCreateInput {
    /// OpenSSH public key text (single line), e.g. 'ssh-ed25519 AAAA... user@host'
    pub ssh_public_key: String,
    /// Instance type, e.g. 1xH100, 8xH200, 8xB200
    pub instance_type: String,
    /// Number of nodes (1 for single-node; >1 for multi-node types)
    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,
    /// Optional cluster name
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OrgScopeInput {
    /// List organization resources instead of only your own
    #[serde(default)]
    pub org: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterIdInput {
    /// Cluster id
    pub cluster_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterDestroyInput {
    /// Cluster id
    pub cluster_id: String,
    /// Must be true to actually destroy the cluster
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JobWriteConfigInput {
    /// Directory to write the config in
    pub workdir: String,
    /// Instance type, e.g. "1xH100"
    pub instance_type: String,
    /// Shell commands to run sequentially, e.g. ["pip install -r requirements.txt", "python train.py"]
    pub commands: Vec<String>,
    /// Files, directories or globs to save, e.g. ["checkpoints/"]
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Paths or globs to exclude from upload, e.g. [".venv"]
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Config filename
    #[serde(default = "default_filename")]
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JobPushInput {
    /// Path to tp.config.toml
    pub config_path: String,
    /// Optional working directory for the push
    #[serde(default)]
    pub workdir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JobIdInput {
    /// Job id
    pub job_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JobPullInput {
    /// Job id
    pub job_id: String,
    /// Overwrite existing files
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JobCancelInput {
    /// Job id
    pub job_id: String,
    /// Must be true to actually cancel the job
    #[serde(default)]
    pub confirm: bool,
}

fn default_num_nodes() -> u32 {
    1
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

/// Cluster and job operations over a shared [`Invoker`].
#[derive(Debug, Clone)]
pub struct Toolbox {
    invoker: Invoker,
}

impl Toolbox {
    /// Creates a toolbox that runs the real `tp` binary.
    #[must_use]
    pub fn new(cli: CliConfig, credential: Credential) -> Self {
        Self::from_invoker(Invoker::new(cli, credential))
    }

    /// Creates a toolbox with a custom process runner.
    #[must_use]
    pub fn with_runner(
        cli: CliConfig,
        credential: Credential,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self::from_invoker(Invoker::with_runner(cli, credential, runner))
    }

    #[must_use]
    pub fn from_invoker(invoker: Invoker) -> Self {
        Self { invoker }
    }

    /// Descriptors for every tool, in a stable order.
    #[must_use]
    pub fn tools() -> Vec<ToolInfo> {
        vec![
            info::<ClusterCreateInput>(
                "cluster_create",
                "Create cluster",
                "Create a TensorPool GPU cluster using an SSH public key.",
            ),
            info::<OrgScopeInput>(
                "cluster_list",
                "List clusters",
                "List your TensorPool clusters.",
            ),
            info::<ClusterIdInput>(
                "cluster_info",
                "Cluster info",
                "Get info for a TensorPool cluster by id.",
            ),
            info::<ClusterDestroyInput>(
                "cluster_destroy",
                "Destroy cluster",
                "Destroy a TensorPool cluster by id (requires confirm=true).",
            ),
            info::<JobWriteConfigInput>(
                "job_write_config",
                "Write tp.config.toml",
                "Generate a tp.config.toml for tp job push.",
            ),
            info::<JobPushInput>(
                "job_push",
                "Push job",
                "Submit a job using tp job push <config_path>.",
            ),
            info::<OrgScopeInput>("job_list", "List jobs", "List TensorPool jobs."),
            info::<JobIdInput>(
                "job_info",
                "Job info",
                "Get detailed information about a job.",
            ),
            info::<JobPullInput>(
                "job_pull",
                "Pull job outputs",
                "Download output files from a completed job.",
            ),
            info::<JobCancelInput>(
                "job_cancel",
                "Cancel job",
                "Cancel a running job (requires confirm=true).",
            ),
        ]
    }

    /// Dispatches a call by tool name with JSON arguments.
    ///
    /// Missing arguments are treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ToolboxError::UnknownTool`] for unrecognized names and
    /// [`ToolboxError::InvalidArguments`] when deserialization fails. Tool
    /// failures are reported inside the [`ToolOutput`] instead.
    pub async fn call(&self, name: &str, arguments: Option<JsonValue>) -> Result<ToolOutput, ToolboxError> {
        let args = arguments.unwrap_or_else(|| JsonValue::Object(serde_json::Map::new()));
        info!(tool = %name, "Calling tool");

        let output = match name {
            "cluster_create" => self.cluster_create(parse(name, args)?).await,
            "cluster_list" => self.cluster_list(parse(name, args)?).await,
            "cluster_info" => self.cluster_info(parse(name, args)?).await,
            "cluster_destroy" => self.cluster_destroy(parse(name, args)?).await,
            "job_write_config" => self.job_write_config(parse(name, args)?),
            "job_push" => self.job_push(parse(name, args)?).await,
            "job_list" => self.job_list(parse(name, args)?).await,
            "job_info" => self.job_info(parse(name, args)?).await,
            "job_pull" => self.job_pull(parse(name, args)?).await,
            "job_cancel" => self.job_cancel(parse(name, args)?).await,
            _ => return Err(ToolboxError::UnknownTool(name.to_string())),
        };

        if output.is_error {
            warn!(tool = %name, "Tool reported an error");
        }
        Ok(output)
    }

    /// `tp cluster create -i <keyfile> -t <type> [-n <nodes>] [--name <name>]`.
    ///
    /// The key is validated before anything touches the filesystem; the
    /// temporary key file is deleted on every exit path.
    pub async fn cluster_create(&self, input: ClusterCreateInput) -> ToolOutput {
        let key = match PublicKey::parse(&input.ssh_public_key) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Rejected SSH public key");
                return ToolOutput::error(format!("ERROR: {e}"));
            }
        };

        let key_file = match ScopedKeyFile::create(&key, self.invoker.cli().key_dir.as_deref()) {
            Ok(file) => file,
            Err(e) => return ToolOutput::error(format!("ERROR: failed to write public key file: {e}")),
        };

        let mut args = vec![
            "cluster".to_string(),
            "create".to_string(),
            "-i".to_string(),
            key_file.path().display().to_string(),
            "-t".to_string(),
            input.instance_type,
        ];
        if input.num_nodes > 1 {
            args.extend(["-n".to_string(), input.num_nodes.to_string()]);
        }
        if let Some(name) = input.name.filter(|name| !name.is_empty()) {
            args.extend(["--name".to_string(), name]);
        }

        let output = self.run(args, None).await;
        key_file.remove();
        output
    }

    /// `tp cluster list [--org]`.
    pub async fn cluster_list(&self, input: OrgScopeInput) -> ToolOutput {
        self.run(with_flag(&["cluster", "list"], "--org", input.org), None)
            .await
    }

    /// `tp cluster info <id>`.
    pub async fn cluster_info(&self, input: ClusterIdInput) -> ToolOutput {
        self.run(words(&["cluster", "info", &input.cluster_id]), None)
            .await
    }

    /// `tp cluster destroy <id>`, only when `confirm` is set.
    pub async fn cluster_destroy(&self, input: ClusterDestroyInput) -> ToolOutput {
        if !input.confirm {
            info!(cluster_id = %input.cluster_id, "Refusing unconfirmed cluster destroy");
            return ToolOutput::error("Refusing to destroy cluster: set confirm=true to proceed.");
        }
        self.run(words(&["cluster", "destroy", &input.cluster_id]), None)
            .await
    }

    /// Writes a `tp.config.toml`; purely local, needs no credential.
    pub fn job_write_config(&self, input: JobWriteConfigInput) -> ToolOutput {
        let config = JobConfig {
            instance_type: input.instance_type,
            commands: input.commands,
            outputs: input.outputs,
            ignore: input.ignore,
        };
        match config.write_to(&PathBuf::from(input.workdir), &input.filename) {
            Ok(path) => ToolOutput::ok(format!("Wrote {}", path.display())),
            Err(e) => ToolOutput::error(format!("ERROR: {e}")),
        }
    }

    /// `tp job push <config_path>`, run from `workdir` when given.
    pub async fn job_push(&self, input: JobPushInput) -> ToolOutput {
        let cwd = input.workdir.filter(|dir| !dir.is_empty()).map(PathBuf::from);
        self.run(words(&["job", "push", &input.config_path]), cwd)
            .await
    }

    /// `tp job list [--org]`.
    pub async fn job_list(&self, input: OrgScopeInput) -> ToolOutput {
        self.run(with_flag(&["job", "list"], "--org", input.org), None)
            .await
    }

    /// `tp job info <id>`.
    pub async fn job_info(&self, input: JobIdInput) -> ToolOutput {
        self.run(words(&["job", "info", &input.job_id]), None).await
    }

    /// `tp job pull <id> [--force]`.
    pub async fn job_pull(&self, input: JobPullInput) -> ToolOutput {
        self.run(
            with_flag(&["job", "pull", &input.job_id], "--force", input.force),
            None,
        )
        .await
    }

    /// `tp job cancel <id>`, only when `confirm` is set.
    pub async fn job_cancel(&self, input: JobCancelInput) -> ToolOutput {
        if !input.confirm {
            info!(job_id = %input.job_id, "Refusing unconfirmed job cancel");
            return ToolOutput::error("Refusing to cancel job: set confirm=true to proceed.");
        }
        self.run(words(&["job", "cancel", &input.job_id]), None)
            .await
    }

    async fn run(&self, args: Vec<String>, cwd: Option<PathBuf>) -> ToolOutput {
        match self.invoker.invoke(args, cwd.as_deref()).await {
            Ok(text) => ToolOutput::ok(text),
            Err(e) => ToolOutput::error(e.render()),
        }
    }
}

fn info<T: JsonSchema>(
    name: &'static str,
    title: &'static str,
    description: &'static str,
) -> ToolInfo {
    let schema = schemars::schema_for!(T);
    ToolInfo {
        name,
        title,
        description,
        input_schema: serde_json::to_value(&schema)
            .unwrap_or_else(|_| serde_json::json!({ "type": "object" })),
    }
}

fn parse<T: DeserializeOwned>(tool: &str, args: JsonValue) -> Result<T, ToolboxError> {
    serde_json::from_value(args).map_err(|source| ToolboxError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn words(words: &[&str]) -> Vec<String> {
    words.iter().map(ToString::to_string).collect()
}

fn with_flag(base: &[&str], flag: &str, enabled: bool) -> Vec<String> {
    let mut args = words(base);
    if enabled {
        args.push(flag.to_string());
    }
    args
}
