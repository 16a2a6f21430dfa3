//! Error types for workspace lockfile operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workspace lockfile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scoping and writing workspace lockfiles.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Workspace root directory not found.
    #[error("Workspace not found at path: {path}")]
    #[diagnostic(
        code(lockscope::workspaces::workspace_not_found),
        help("Ensure the path points to a monorepo root containing a package.json")
    )]
    WorkspaceNotFound {
        /// The path that was searched.
        path: PathBuf,
    },

    /// Invalid workspace configuration.
    #[error("Invalid workspace configuration at {path}: {message}")]
    #[diagnostic(
        code(lockscope::workspaces::invalid_config),
        help("Check the configuration file for syntax errors or wrongly typed fields")
    )]
    InvalidWorkspaceConfig {
        /// Path to the invalid configuration file.
        path: PathBuf,
        /// Description of what is invalid.
        message: String,
    },

    /// Lockfile not found.
    #[error("Lockfile not found at path: {path}")]
    #[diagnostic(
        code(lockscope::workspaces::lockfile_not_found),
        help("Run 'yarn install' at the monorepo root to generate the root lockfile")
    )]
    LockfileNotFound {
        /// The path where the lockfile was expected.
        path: PathBuf,
    },

    /// Failed to parse lockfile.
    #[error("Failed to parse lockfile at {path}: {message}")]
    #[diagnostic(
        code(lockscope::workspaces::lockfile_parse_failed),
        help("The lockfile may be corrupted. Try regenerating it with 'yarn install'")
    )]
    LockfileParseFailed {
        /// Path to the lockfile.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// A descriptor or locator string could not be parsed.
    #[error("Invalid descriptor '{value}': {message}")]
    #[diagnostic(
        code(lockscope::workspaces::invalid_descriptor),
        help("Descriptors have the form 'name@range' or '@scope/name@range'")
    )]
    InvalidDescriptor {
        /// The offending string.
        value: String,
        /// Why it was rejected.
        message: String,
    },

    /// Workspace member not found.
    #[error("Workspace member '{name}' not found in workspace at {workspace_root}")]
    #[diagnostic(
        code(lockscope::workspaces::member_not_found),
        help("Check that the name matches the 'name' field of a workspace package.json")
    )]
    MemberNotFound {
        /// Name of the missing member.
        name: String,
        /// Root of the workspace where the member was expected.
        workspace_root: PathBuf,
    },

    /// A descriptor in the closure could not be resolved.
    #[error("Failed to resolve {descriptor}: {message}")]
    #[diagnostic(
        code(lockscope::workspaces::resolution_failed),
        help("Run 'yarn install' at the monorepo root so the root lockfile covers this range")
    )]
    Resolution {
        /// The descriptor that failed to resolve.
        descriptor: String,
        /// Why resolution failed.
        message: String,
    },

    /// A resolved package artifact could not be fetched.
    #[error("Failed to fetch {locator}: {message}")]
    #[diagnostic(
        code(lockscope::workspaces::fetch_failed),
        help("Check the package cache and network access, then re-run 'yarn install'")
    )]
    Fetch {
        /// The locator whose artifact is unavailable.
        locator: String,
        /// Why fetching failed.
        message: String,
    },

    /// An internal consistency check failed.
    #[error("Internal invariant violated: {message}")]
    #[diagnostic(
        code(lockscope::workspaces::invariant_violation),
        help("This is a bug. Re-run with RUST_LOG=debug and report the output")
    )]
    InvariantViolation {
        /// Description of the broken invariant.
        message: String,
    },

    /// The canonical lockfile slot could not be restored after a failed swap.
    #[error(
        "Manual recovery needed in {dir}: {message} (original lockfile preserved at {stash}, expected at {canonical})"
    )]
    #[diagnostic(
        code(lockscope::workspaces::recovery_required),
        help("Move the preserved file back to its canonical name before running yarn again")
    )]
    RecoveryRequired {
        /// Directory left in an inconsistent state.
        dir: PathBuf,
        /// Where the original canonical lockfile currently lives.
        stash: PathBuf,
        /// Where it belongs.
        canonical: PathBuf,
        /// What went wrong during restoration.
        message: String,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(lockscope::workspaces::io_error),
        help("Check that the referenced paths exist and that you have permission to read or write them")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(lockscope::workspaces::json_error),
        help("Ensure the package.json has valid syntax")
    )]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },

    /// YAML parsing error.
    #[error("YAML parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(lockscope::workspaces::yaml_error),
        help("Ensure the YAML has valid syntax")
    )]
    Yaml {
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Builds an [`Error::Io`] for an operation on a path.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }

    /// Short label for the failure kind, used in per-target reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => "ResolutionError",
            Self::Fetch { .. } => "FetchError",
            Self::InvariantViolation { .. } => "InvariantViolation",
            Self::Io { .. } | Self::RecoveryRequired { .. } => "FilesystemError",
            Self::MemberNotFound { .. } => "MemberNotFound",
            Self::WorkspaceNotFound { .. }
            | Self::InvalidWorkspaceConfig { .. }
            | Self::Json { .. }
            | Self::Yaml { .. } => "ConfigurationError",
            Self::LockfileNotFound { .. }
            | Self::LockfileParseFailed { .. }
            | Self::InvalidDescriptor { .. } => "LockfileError",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source, path: None }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Yaml { source, path: None }
    }
}
