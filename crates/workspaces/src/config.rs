//! Configuration and per-invocation options.

use crate::closure::ClosurePolicy;
use crate::discovery::read_yaml_file;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File the configuration is read from, relative to the monorepo root.
pub const CONFIG_FILE: &str = ".yarnrc.yml";

/// Default filename of every scoped lockfile.
pub const DEFAULT_LOCKFILE_FILENAME: &str = "yarn.lock-workspace";

/// Default filename of the canonical lockfile slot.
pub const DEFAULT_CANONICAL_LOCKFILE: &str = "yarn.lock";

/// Recognised configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Members to produce lockfiles for, by name. `None` means all members.
    pub workspace_lockfiles: Option<Vec<String>>,
    /// Filename written in each member directory.
    pub workspace_lockfile_filename: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_lockfiles: None,
            workspace_lockfile_filename: DEFAULT_LOCKFILE_FILENAME.to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from `<root>/.yarnrc.yml`.
    ///
    /// A missing file yields the defaults. Unrelated keys are ignored. A
    /// `workspaceLockfiles` value that is not a list of strings means all
    /// members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be read,
    /// [`Error::Yaml`] if it is not valid YAML, or
    /// [`Error::InvalidWorkspaceConfig`] if `workspaceLockfileFilename` is not
    /// a plain file name.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let value: serde_yaml::Value = read_yaml_file(&path)?;
        Self::from_value(&value, &path)
    }

    /// Parses configuration from YAML text. `origin` is used in errors.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_yaml(contents: &str, origin: &Path) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|source| Error::Yaml {
                source,
                path: Some(origin.to_path_buf()),
            })?;
        Self::from_value(&value, origin)
    }

    fn from_value(value: &serde_yaml::Value, origin: &Path) -> Result<Self> {
        let mut config = Self::default();
        let Some(map) = value.as_mapping() else {
            return Ok(config);
        };

        if let Some(serde_yaml::Value::Sequence(items)) = map.get("workspaceLockfiles") {
            config.workspace_lockfiles = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
        }

        if let Some(filename) = map.get("workspaceLockfileFilename") {
            let filename = filename
                .as_str()
                .ok_or_else(|| invalid(origin, "workspaceLockfileFilename must be a string"))?;
            config = config.with_filename(filename, origin)?;
        }

        debug!(
            path = %origin.display(),
            targets = ?config.workspace_lockfiles,
            filename = %config.workspace_lockfile_filename,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Replaces the lockfile filename after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkspaceConfig`] if `filename` is empty or
    /// contains a path separator.
    pub fn with_filename(mut self, filename: &str, origin: &Path) -> Result<Self> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(invalid(
                origin,
                &format!("workspaceLockfileFilename '{filename}' is not a plain file name"),
            ));
        }
        self.workspace_lockfile_filename = filename.to_string();
        Ok(self)
    }
}

fn invalid(origin: &Path, message: &str) -> Error {
    Error::InvalidWorkspaceConfig {
        path: origin.to_path_buf(),
        message: message.to_string(),
    }
}

/// Knobs of one invocation that are not persisted configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Targets processed concurrently.
    pub jobs: usize,
    /// Stop scheduling targets after the first failure.
    pub fail_fast: bool,
    /// Compute and serialize but do not write.
    pub dry_run: bool,
    /// Which scopes the closure follows.
    pub closure_policy: ClosurePolicy,
    /// Name of the slot the swap writer borrows.
    pub canonical_lockfile_name: String,
    /// Yarn cache folder to verify archives against, if any.
    pub cache_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            fail_fast: false,
            dry_run: false,
            closure_policy: ClosurePolicy::default(),
            canonical_lockfile_name: DEFAULT_CANONICAL_LOCKFILE.to_string(),
            cache_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(yaml: &str) -> Result<Config> {
        Config::from_yaml(yaml, Path::new(".yarnrc.yml"))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workspace_lockfiles, None);
        assert_eq!(config.workspace_lockfile_filename, "yarn.lock-workspace");

        let options = RunOptions::default();
        assert_eq!(options.canonical_lockfile_name, "yarn.lock");
        assert_eq!(options.closure_policy, ClosurePolicy::Uniform);
    }

    #[test]
    fn test_reads_both_options() {
        let config = parse(
            "nodeLinker: node-modules\n\
             workspaceLockfiles:\n  - a\n  - \"@scope/b\"\n\
             workspaceLockfileFilename: scoped.lock\n",
        )
        .unwrap();

        assert_eq!(
            config.workspace_lockfiles,
            Some(vec!["a".to_string(), "@scope/b".to_string()])
        );
        assert_eq!(config.workspace_lockfile_filename, "scoped.lock");
    }

    #[test]
    fn test_non_list_means_all_members() {
        for yaml in [
            "workspaceLockfiles: true\n",
            "workspaceLockfiles: a\n",
            "workspaceLockfiles:\n  - a\n  - 3\n",
        ] {
            assert_eq!(parse(yaml).unwrap().workspace_lockfiles, None, "{yaml}");
        }
    }

    #[test]
    fn test_rejects_path_filename() {
        let result = parse("workspaceLockfileFilename: ../yarn.lock\n");
        assert!(matches!(result, Err(Error::InvalidWorkspaceConfig { .. })));

        let result = parse("workspaceLockfileFilename: 12\n");
        assert!(matches!(result, Err(Error::InvalidWorkspaceConfig { .. })));
    }

    #[test]
    fn test_load_from_root() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Config::load(temp.path()).unwrap(), Config::default());

        std::fs::write(
            temp.path().join(".yarnrc.yml"),
            "workspaceLockfiles: [web]\n",
        )
        .unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.workspace_lockfiles, Some(vec!["web".to_string()]));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(parse("a: [unclosed\n"), Err(Error::Yaml { .. })));
    }

    #[test]
    fn test_load_reports_yaml_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".yarnrc.yml");
        std::fs::write(&path, "workspaceLockfiles: [web\n").unwrap();

        match Config::load(temp.path()) {
            Err(Error::Yaml { path: Some(p), .. }) => assert_eq!(p, path),
            other => panic!("expected a yaml error, got {other:?}"),
        }
    }
}
