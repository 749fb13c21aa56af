//! `tp.config.toml` generation for `tp job push`.
//!
//! The document is flat: one string field and three list fields, each list
//! entry on its own line and comma-terminated.

use std::{
    fmt::Write as _,
    fs, io,
    path::{Component, Path, PathBuf},
};

use tracing::info;

/// Default file name expected by `tp job push`.
pub const DEFAULT_FILENAME: &str = "tp.config.toml";

/// Errors produced while writing a job config.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JobConfigError {
    /// The working directory could not be resolved to an absolute path.
    #[error("invalid workdir '{path}': {source}")]
    Workdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Creating the directory or writing the file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Contents of a `tp.config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobConfig {
    pub instance_type: String,
    /// Shell commands run sequentially on the instance.
    pub commands: Vec<String>,
    /// Files, directories or globs saved after the job.
    pub outputs: Vec<String>,
    /// Paths or globs excluded from upload.
    pub ignore: Vec<String>,
}

impl JobConfig {
    /// Renders the TOML document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "instance_type = {}", quote(&self.instance_type));
        for (key, values) in [
            ("commands", &self.commands),
            ("outputs", &self.outputs),
            ("ignore", &self.ignore),
        ] {
            let _ = writeln!(out, "{key} = {}", render_list(values));
        }
        out
    }

    /// Writes the document to `workdir/filename` and returns the full path.
    ///
    /// A leading `~` in `workdir` is expanded, relative paths are resolved
    /// against the current directory, and `.`/`..` segments are collapsed.
    /// Missing directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`JobConfigError`] if the path cannot be resolved or the file
    /// cannot be written.
    pub fn write_to(&self, workdir: &Path, filename: &str) -> Result<PathBuf, JobConfigError> {
        let expanded = expand_home(workdir);
        let dir = std::path::absolute(&expanded)
            .map(|dir| normalize(&dir))
            .map_err(|source| JobConfigError::Workdir {
                path: expanded.clone(),
                source,
            })?;
        let path = dir.join(filename);

        let write = || -> io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, self.render())
        };
        write().map_err(|source| JobConfigError::Write {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), commands = self.commands.len(), "Wrote job config");
        Ok(path)
    }
}

fn quote(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn render_list(values: &[String]) -> String {
    if values.is_empty() {
        return "[]".to_string();
    }
    let mut out = String::from("[\n");
    for value in values {
        let _ = writeln!(out, "  {},", quote(value));
    }
    out.push(']');
    out
}

/// Collapses `.` and `..` lexically; symlinks are left alone.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Expands a leading `~` to the home directory, if one is known.
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_render_lists_in_order_with_empty_outputs() {
        let config = JobConfig {
            instance_type: "1xH100".to_string(),
            commands: strings(&["a", "b"]),
            outputs: Vec::new(),
            ignore: strings(&[".venv"]),
        };

        assert_eq!(
            config.render(),
            "instance_type = \"1xH100\"\n\
             commands = [\n  \"a\",\n  \"b\",\n]\n\
             outputs = []\n\
             ignore = [\n  \".venv\",\n]\n"
        );
    }

    #[test]
    fn test_render_is_valid_toml() {
        let config = JobConfig {
            instance_type: "8xB200".to_string(),
            commands: strings(&[
                "pip install -r requirements.txt",
                r#"python train.py --tag "run 1" C:\data"#,
            ]),
            outputs: strings(&["checkpoints/", "*.log"]),
            ignore: Vec::new(),
        };

        let parsed: toml::Table = toml::from_str(&config.render()).expect("rendered TOML parses");

        assert_eq!(parsed["instance_type"].as_str(), Some("8xB200"));
        let commands: Vec<_> = parsed["commands"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(toml::Value::as_str)
            .collect();
        assert_eq!(commands, config.commands);
        assert_eq!(parsed["outputs"].as_array().unwrap().len(), 2);
        assert!(parsed["ignore"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_write_creates_missing_directories() {
        let temp = TempDir::new().unwrap();
        let workdir = temp.path().join("nested/project");
        let config = JobConfig {
            instance_type: "1xH100".to_string(),
            commands: strings(&["python train.py"]),
            ..JobConfig::default()
        };

        let path = config.write_to(&workdir, DEFAULT_FILENAME).unwrap();

        assert_eq!(path, workdir.join(DEFAULT_FILENAME));
        assert_eq!(fs::read_to_string(&path).unwrap(), config.render());
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let first = JobConfig {
            instance_type: "1xH100".to_string(),
            ..JobConfig::default()
        };
        let second = JobConfig {
            instance_type: "8xH200".to_string(),
            ..JobConfig::default()
        };

        first.write_to(temp.path(), "custom.toml").unwrap();
        let path = second.write_to(temp.path(), "custom.toml").unwrap();

        assert!(fs::read_to_string(path).unwrap().contains("8xH200"));
    }

    #[test]
    fn test_write_reports_unwritable_target() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let err = JobConfig::default()
            .write_to(&blocker, DEFAULT_FILENAME)
            .expect_err("writing below a regular file must fail");

        assert!(matches!(err, JobConfigError::Write { .. }));
        assert!(err.to_string().starts_with("failed to write "));
    }

    #[test]
    fn test_write_collapses_parent_segments() {
        let temp = TempDir::new().unwrap();
        let workdir = temp.path().join("a/./../b");

        let path = JobConfig::default()
            .write_to(&workdir, DEFAULT_FILENAME)
            .unwrap();

        assert_eq!(path, temp.path().join("b").join(DEFAULT_FILENAME));
        assert!(path.is_file());
    }

    #[test]
    fn test_normalize_stops_at_root() {
        assert_eq!(normalize(Path::new("/x/../../y")), PathBuf::from("/y"));
        assert_eq!(normalize(Path::new("/x/./y/..")), PathBuf::from("/x"));
    }

    #[test]
    fn test_expand_home_only_touches_leading_tilde() {
        assert_eq!(expand_home(Path::new("/abs/~")), PathBuf::from("/abs/~"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/jobs")), home.join("jobs"));
        }
    }
}
