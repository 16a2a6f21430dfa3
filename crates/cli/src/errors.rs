//! CLI error types with miette diagnostics

use miette::Diagnostic;
use thiserror::Error;

/// Errors a command can end with
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Library errors keep their own code and help text.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] lockscope_workspaces::Error),

    #[error("Invalid command line argument: {argument}")]
    #[diagnostic(code(lockscope::cli::invalid_argument))]
    InvalidArgument {
        argument: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("File operation '{operation}' failed for {}", path.display())]
    #[diagnostic(
        code(lockscope::cli::file_error),
        help("Check file permissions and ensure the path exists")
    )]
    FileError {
        operation: String,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write command output")]
    #[diagnostic(code(lockscope::cli::output_error))]
    Output {
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} workspace lockfiles could not be generated")]
    #[diagnostic(
        code(lockscope::cli::targets_failed),
        help("Each failure is listed above. Re-run with --level debug for details")
    )]
    TargetsFailed { failed: usize, total: usize },
}

impl CliError {
    pub fn invalid_argument(argument: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<std::path::PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileError {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::Output { source }
    }
}

pub type CliResult<T> = Result<T, CliError>;
