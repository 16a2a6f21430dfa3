use crate::errors::{CliError, CliResult};
use lockscope_workspaces::{
    ClosurePolicy, Ident, PackageJsonDiscovery, ProjectGraph, WorkspaceDiscovery, compute_closure,
};
use std::io::Write;
use std::path::Path;
use tracing::instrument;

/// Prints the closure of `name`, one member per line with its relative path.
#[instrument(skip(out))]
pub fn execute<W: Write>(
    name: &str,
    cwd: &Path,
    policy: ClosurePolicy,
    mut out: W,
) -> CliResult<()> {
    let root = std::fs::canonicalize(cwd).map_err(|e| CliError::file_error("canonicalize", cwd, e))?;
    let graph = ProjectGraph::from_workspace(PackageJsonDiscovery.discover(&root)?);

    let closure = compute_closure(&graph, &Ident::new(name), policy)?;
    for ident in &closure {
        let path = graph
            .member(ident)
            .map_or_else(|| "?".to_string(), |member| member.relative_path());
        writeln!(out, "{ident}\t{path}")?;
    }
    Ok(())
}
