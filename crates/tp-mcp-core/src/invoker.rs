//! External process invocation for the `tp` CLI.
//!
//! The [`Invoker`] turns an argument vector into a single text result that a
//! language-model agent can read. Process execution itself sits behind the
//! [`ProcessRunner`] trait so tests can substitute a fake without spawning
//! anything.
//!
//! # Result rendering
//!
//! | outcome | rendered text |
//! |---|---|
//! | exit 0 | trimmed stdout, or `OK` when empty |
//! | exit != 0 | `ERROR (exit=N)` followed by both streams |
//! | credential missing | `ERROR: <VAR> is not set in the environment.` |
//! | binary missing | `ERROR: '<tp>' CLI not found. Install with: <hint>` |
//! | timeout | `ERROR: Command timed out after Ns: <command>` |
//! | other spawn failure | `ERROR: failed to run <command>: <cause>` |

use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{CliConfig, Credential};

/// A single subprocess execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Executable name or path.
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory for the child, inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment.
    pub env: Vec<(String, String)>,
    /// Wall-clock limit for the child.
    pub timeout: Duration,
}

impl ProcessRequest {
    /// Renders the request as a shell-quoted command line for messages.
    ///
    /// Only the program's file name is shown, never the environment.
    #[must_use]
    pub fn display_command(&self) -> String {
        let program = self
            .program
            .file_name()
            .map_or_else(|| self.program.to_string_lossy(), |name| name.to_string_lossy());
        std::iter::once(program.as_ref())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the child was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Errors raised by a [`ProcessRunner`] before a child produced an exit status.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RunError {
    /// The executable could not be located.
    #[error("executable not found: {0}")]
    NotFound(PathBuf),

    /// The child exceeded its timeout and was killed.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// Any other spawn or wait failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Future returned by [`ProcessRunner::run`].
pub type RunFuture<'a> = BoxFuture<'a, Result<ProcessOutput, RunError>>;

/// Executes subprocesses on behalf of the [`Invoker`].
///
/// # Example
///
/// ```ignore
/// struct AlwaysOk;
///
/// impl ProcessRunner for AlwaysOk {
///     fn run(&self, _request: ProcessRequest) -> RunFuture<'_> {
///         Box::pin(async { Ok(ProcessOutput::default()) })
///     }
/// }
/// ```
pub trait ProcessRunner: Send + Sync {
    /// Runs the request to completion, timeout, or failure.
    fn run(&self, request: ProcessRequest) -> RunFuture<'_>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// The child inherits the parent environment. Dropping the returned future
/// (including on timeout) kills the child.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl ProcessRunner for TokioProcessRunner {
    fn run(&self, request: ProcessRequest) -> RunFuture<'_> {
        Box::pin(async move {
            let mut command = Command::new(&request.program);
            command
                .args(&request.args)
                .envs(request.env.iter().map(|(key, value)| (key, value)))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(cwd) = &request.cwd {
                // spawn reports a missing cwd as NotFound, same as a missing binary.
                if !cwd.is_dir() {
                    return Err(RunError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("working directory does not exist: {}", cwd.display()),
                    )));
                }
                command.current_dir(cwd);
            }

            let child = command.spawn().map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RunError::NotFound(request.program.clone()),
                _ => RunError::Io(e),
            })?;

            let output = tokio::time::timeout(request.timeout, child.wait_with_output())
                .await
                .map_err(|_| RunError::TimedOut(request.timeout))??;

            Ok(ProcessOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// Failures of a single invocation, as reported to the agent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InvokeError {
    /// The credential variable had no value; nothing was spawned.
    #[error("{0} is not set in the environment.")]
    MissingCredential(String),

    /// The CLI executable was not found.
    #[error("'{program}' CLI not found. Install with: {hint}")]
    NotFound { program: String, hint: String },

    /// The CLI ran past its timeout.
    #[error("Command timed out after {}s: {command}", .timeout.as_secs())]
    TimedOut { timeout: Duration, command: String },

    /// The CLI could not be spawned for another reason.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The CLI exited with a nonzero code.
    #[error("{command} exited with code {code}")]
    Failed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },
}

impl InvokeError {
    /// Renders the error as the text handed back to the agent.
    ///
    /// Nonzero exits carry both streams so the caller can reason about them.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Failed {
                code,
                stdout,
                stderr,
                ..
            } => format!("ERROR (exit={code})\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}"),
            other => format!("ERROR: {other}"),
        }
    }
}

/// Runs the `tp` CLI and collapses each run into a single string.
///
/// Cheap to clone; the runner is shared behind an [`Arc`].
#[derive(Clone)]
pub struct Invoker {
    cli: CliConfig,
    credential: Credential,
    runner: Arc<dyn ProcessRunner>,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("cli", &self.cli)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl Invoker {
    /// Creates an invoker that spawns real processes.
    #[must_use]
    pub fn new(cli: CliConfig, credential: Credential) -> Self {
        Self::with_runner(cli, credential, Arc::new(TokioProcessRunner))
    }

    /// Creates an invoker with a custom process runner.
    #[must_use]
    pub fn with_runner(
        cli: CliConfig,
        credential: Credential,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            cli,
            credential,
            runner,
        }
    }

    /// Returns the CLI settings this invoker was built with.
    #[must_use]
    pub fn cli(&self) -> &CliConfig {
        &self.cli
    }

    /// Runs `tp <args>` and returns trimmed stdout (or `OK`) on success.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] when the credential is missing (no process
    /// is started), the binary is missing, the timeout expires, spawning
    /// fails, or the CLI exits nonzero.
    pub async fn invoke(&self, args: Vec<String>, cwd: Option<&Path>) -> Result<String, InvokeError> {
        let Some(secret) = self.credential.value() else {
            warn!(variable = %self.credential.env_var(), "Credential missing, not invoking CLI");
            return Err(InvokeError::MissingCredential(
                self.credential.env_var().to_string(),
            ));
        };

        let request = ProcessRequest {
            program: self.cli.binary.clone(),
            args,
            cwd: cwd.map(Path::to_path_buf),
            env: vec![(self.credential.env_var().to_string(), secret.to_string())],
            timeout: self.cli.timeout(),
        };
        let command = request.display_command();

        info!(command = %command, "Invoking CLI");

        let output = self.runner.run(request).await.map_err(|e| {
            warn!(command = %command, error = %e, "CLI invocation failed");
            match e {
                RunError::NotFound(_) => InvokeError::NotFound {
                    program: self.cli.binary.display().to_string(),
                    hint: self.cli.install_hint.clone(),
                },
                RunError::TimedOut(timeout) => InvokeError::TimedOut {
                    timeout,
                    command: command.clone(),
                },
                RunError::Io(source) => InvokeError::Spawn {
                    command: command.clone(),
                    source,
                },
            }
        })?;

        debug!(
            command = %command,
            exit_code = output.exit_code,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "CLI exited"
        );

        let stdout = output.stdout.trim();
        if output.exit_code == 0 {
            return Ok(if stdout.is_empty() {
                "OK".to_string()
            } else {
                stdout.to_string()
            });
        }

        warn!(command = %command, exit_code = output.exit_code, "CLI exited nonzero");
        Err(InvokeError::Failed {
            command,
            code: output.exit_code,
            stdout: stdout.to_string(),
            stderr: output.stderr.trim().to_string(),
        })
    }

    /// Like [`Self::invoke`], with errors rendered into the returned text.
    pub async fn invoke_text(&self, args: Vec<String>, cwd: Option<&Path>) -> String {
        match self.invoke(args, cwd).await {
            Ok(text) => text,
            Err(e) => e.render(),
        }
    }
}

/// Quotes a single word for display the way a POSIX shell would accept it.
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r#"'"'"'"#))
    }
}
