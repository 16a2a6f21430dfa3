use super::reporter::StreamReporter;
use crate::errors::{CliError, CliResult};
use lockscope_workspaces::{
    BatchContext, BatchReport, ClosurePolicy, Config, RunOptions, generate_lockfiles,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Cache folder checked by `--verify-cache`, relative to the monorepo root.
const CACHE_FOLDER: &str = ".yarn/cache";

#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub cwd: PathBuf,
    pub workspaces: Vec<String>,
    pub filename: Option<String>,
    pub jobs: usize,
    pub fail_fast: bool,
    pub dry_run: bool,
    pub closure_policy: ClosurePolicy,
    pub verify_cache: bool,
}

/// Configuration from `.yarnrc.yml` with command line overrides applied.
fn build_config(root: &Path, args: &GenerateArgs) -> CliResult<Config> {
    let mut config = Config::load(root)?;
    if !args.workspaces.is_empty() {
        config.workspace_lockfiles = Some(args.workspaces.clone());
    }
    if let Some(filename) = &args.filename {
        config = config
            .with_filename(filename, Path::new("--filename"))
            .map_err(|_| {
                CliError::invalid_argument(
                    format!("--filename {filename}"),
                    "The lockfile name must be a plain file name without directories",
                )
            })?;
    }
    Ok(config)
}

fn build_options(root: &Path, args: &GenerateArgs) -> CliResult<RunOptions> {
    if args.jobs == 0 {
        return Err(CliError::invalid_argument(
            "--jobs 0",
            "Use at least one job",
        ));
    }
    Ok(RunOptions {
        jobs: args.jobs,
        fail_fast: args.fail_fast,
        dry_run: args.dry_run,
        closure_policy: args.closure_policy,
        cache_dir: args.verify_cache.then(|| root.join(CACHE_FOLDER)),
        ..RunOptions::default()
    })
}

/// Runs the batch and reports one line per member to `out`.
///
/// Returns the report even when members failed; the caller decides the exit
/// status.
#[instrument(skip(out), fields(cwd = %args.cwd.display()))]
pub async fn execute<W: Write + Send>(args: GenerateArgs, out: W) -> CliResult<BatchReport> {
    let root = std::fs::canonicalize(&args.cwd)
        .map_err(|e| CliError::file_error("canonicalize", &args.cwd, e))?;
    let config = build_config(&root, &args)?;
    let options = build_options(&root, &args)?;

    let ctx = BatchContext::load(&root, config, options)?;
    let reporter = StreamReporter::new(out, args.dry_run);
    let report = generate_lockfiles(&ctx, &reporter).await;

    for skipped in &report.skipped {
        reporter.line(&format!("- {skipped}: skipped after an earlier failure"));
    }
    Ok(report)
}

/// Turns a finished batch into the command's outcome.
pub fn check(report: &BatchReport) -> CliResult<()> {
    if report.is_success() {
        return Ok(());
    }
    let failed = report.failures.len() + report.skipped.len();
    Err(CliError::TargetsFailed {
        failed,
        total: failed + report.successes.len(),
    })
}
