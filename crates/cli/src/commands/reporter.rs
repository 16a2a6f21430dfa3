//! Line-per-target progress output.

use lockscope_workspaces::{Error, Ident, Reporter};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Writes `✓ Wrote <path>` or `✗ <member>: <error>` for every finished target.
pub struct StreamReporter<W> {
    out: Mutex<W>,
    dry_run: bool,
}

impl<W: Write + Send> StreamReporter<W> {
    pub fn new(out: W, dry_run: bool) -> Self {
        Self {
            out: Mutex::new(out),
            dry_run,
        }
    }

    /// Writes a line that is not tied to a finished target.
    pub fn line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}") {
            tracing::warn!(error = %e, "Failed to write progress line");
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Reporter for StreamReporter<W> {
    fn success(&self, _target: &Ident, path: &Path) {
        let verb = if self.dry_run { "Would write" } else { "Wrote" };
        self.line(&format!("✓ {verb} {}", path.display()));
    }

    fn failure(&self, target: &Ident, error: &Error) {
        self.line(&format!("✗ {target}: {error}"));
    }
}
