//! Batch driver: one scoped lockfile per target member.
//!
//! Each target runs closure, resolution, scoping, serialization and the swap
//! write in sequence. Targets run concurrently up to [`RunOptions::jobs`] and
//! fail independently of each other.

use crate::closure::compute_closure;
use crate::config::{Config, RunOptions};
use crate::core::traits::{Fetcher, LockfileParser, Resolver, WorkspaceDiscovery};
use crate::core::types::{Ident, ReuseSnapshot};
use crate::discovery::PackageJsonDiscovery;
use crate::error::{Error, Result};
use crate::graph::ProjectGraph;
use crate::parsers::YarnBerryLockfileParser;
use crate::resolution::{ResolveRequest, SnapshotFetcher, SnapshotResolver, ensure_resolved};
use crate::scope::extract_scope;
use crate::serializer::serialize;
use crate::swap::SwapWriter;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Receives one notification per finished target.
pub trait Reporter: Send + Sync {
    /// A lockfile was written to `path` (or would have been, on a dry run).
    fn success(&self, target: &Ident, path: &Path);

    /// The target failed; nothing was written for it.
    fn failure(&self, target: &Ident, error: &Error);
}

/// Reporter that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn success(&self, target: &Ident, path: &Path) {
        info!(workspace = %target, path = %path.display(), "Wrote workspace lockfile");
    }

    fn failure(&self, target: &Ident, error: &Error) {
        tracing::error!(workspace = %target, kind = error.kind(), error = %error, "Target failed");
    }
}

/// Outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Targets whose lockfile was written, with its path.
    pub successes: Vec<(Ident, PathBuf)>,
    /// Targets that failed, with the reason.
    pub failures: Vec<(Ident, Error)>,
    /// Targets never started because an earlier one failed with `fail_fast`.
    pub skipped: Vec<Ident>,
}

impl BatchReport {
    /// Returns true if every target succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Shared, read-only state of one batch.
pub struct BatchContext {
    /// Full workspace graph.
    pub graph: ProjectGraph,
    /// Parsed root lockfile.
    pub snapshot: Arc<ReuseSnapshot>,
    /// Recognised configuration.
    pub config: Config,
    /// Invocation knobs.
    pub options: RunOptions,
    /// Resolver for descriptors the snapshot misses.
    pub resolver: Arc<dyn Resolver>,
    /// Fetcher every hard-linked package goes through.
    pub fetcher: Arc<dyn Fetcher>,
    /// Writer publishing each lockfile.
    pub writer: SwapWriter,
}

impl std::fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchContext")
            .field("root", &self.graph.root())
            .field("members", &self.graph.member_count())
            .field("config", &self.config)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BatchContext {
    /// Builds a context whose resolver and fetcher answer from `snapshot`.
    #[must_use]
    pub fn new(
        graph: ProjectGraph,
        snapshot: Arc<ReuseSnapshot>,
        config: Config,
        options: RunOptions,
    ) -> Self {
        let mut fetcher = SnapshotFetcher::new(Arc::clone(&snapshot));
        if let Some(cache_dir) = &options.cache_dir {
            fetcher = fetcher.with_cache_dir(cache_dir.clone());
        }

        Self {
            graph,
            resolver: Arc::new(SnapshotResolver::new(Arc::clone(&snapshot))),
            fetcher: Arc::new(fetcher),
            snapshot,
            config,
            options,
            writer: SwapWriter::new(),
        }
    }

    /// Discovers the monorepo at `root` and parses its root lockfile.
    ///
    /// # Errors
    ///
    /// Propagates discovery errors, and returns [`Error::LockfileNotFound`]
    /// or [`Error::LockfileParseFailed`] for a missing or unreadable root
    /// lockfile.
    pub fn load(root: &Path, config: Config, options: RunOptions) -> Result<Self> {
        let workspace = PackageJsonDiscovery.discover(root)?;
        let lockfile = workspace
            .lockfile
            .clone()
            .unwrap_or_else(|| root.join(&options.canonical_lockfile_name));
        let snapshot = YarnBerryLockfileParser.parse(&lockfile)?;
        debug!(
            root = %root.display(),
            members = workspace.member_count(),
            packages = snapshot.resolutions.package_count(),
            "Loaded monorepo"
        );

        Ok(Self::new(
            ProjectGraph::from_workspace(workspace),
            Arc::new(snapshot),
            config,
            options,
        ))
    }

    /// Replaces the resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the fetcher.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Selected targets, in configuration order or member discovery order.
    ///
    /// Configured names that are not members come back as
    /// [`Error::MemberNotFound`].
    #[must_use]
    pub fn targets(&self) -> Vec<(Ident, Result<()>)> {
        match &self.config.workspace_lockfiles {
            None => self
                .graph
                .members()
                .map(|member| (member.ident.clone(), Ok(())))
                .collect(),
            Some(names) => names
                .iter()
                .map(|name| {
                    let ident = Ident::new(name.as_str());
                    let known = self.graph.require_member(&ident).map(|_| ());
                    (ident, known)
                })
                .collect(),
        }
    }
}

/// Produces the scoped lockfile of one target and returns where it went.
///
/// # Errors
///
/// Any closure, resolution, scoping or write error for this target. Nothing
/// is written unless every earlier step succeeded.
#[tracing::instrument(name = "scoped_lockfile", fields(workspace = %target), skip_all)]
pub async fn generate_lockfile(ctx: &BatchContext, target: &Ident) -> Result<PathBuf> {
    let member = ctx.graph.require_member(target)?;
    let policy = ctx.options.closure_policy;

    let closure = compute_closure(&ctx.graph, target, policy)?;
    let resolutions = ensure_resolved(ResolveRequest {
        graph: &ctx.graph,
        closure: &closure,
        target,
        policy,
        snapshot: Some(ctx.snapshot.as_ref()),
        resolver: ctx.resolver.as_ref(),
        fetcher: ctx.fetcher.as_ref(),
    })
    .await?;
    let view = extract_scope(&closure, &resolutions, target, ctx.snapshot.metadata.clone())?;
    let content = serialize(&view);

    let dir = member.cwd(ctx.graph.root());
    let filename = &ctx.config.workspace_lockfile_filename;
    if ctx.options.dry_run {
        debug!(dir = %dir.display(), bytes = content.len(), "Dry run, not writing");
        return Ok(dir.join(filename));
    }
    ctx.writer
        .publish(&dir, &ctx.options.canonical_lockfile_name, filename, &content)
        .await
}

/// Runs [`generate_lockfile`] for every selected target.
///
/// Failures are isolated per target. With `fail_fast`, targets not yet
/// started when the first failure is seen are skipped.
pub async fn generate_lockfiles(ctx: &BatchContext, reporter: &dyn Reporter) -> BatchReport {
    let stop = AtomicBool::new(false);
    let jobs = ctx.options.jobs.max(1);

    let outcomes: Vec<(Ident, Option<Result<PathBuf>>)> =
        stream::iter(ctx.targets())
            .map(|(target, known)| {
                let stop = &stop;
                async move {
                    if stop.load(Ordering::SeqCst) {
                        return (target, None);
                    }
                    let outcome = match known {
                        Ok(()) => generate_lockfile(ctx, &target).await,
                        Err(error) => Err(error),
                    };
                    match &outcome {
                        Ok(path) => reporter.success(&target, path),
                        Err(error) => {
                            reporter.failure(&target, error);
                            if ctx.options.fail_fast {
                                stop.store(true, Ordering::SeqCst);
                            }
                        }
                    }
                    (target, Some(outcome))
                }
            })
            .buffer_unordered(jobs)
            .collect()
            .await;

    let mut report = BatchReport::default();
    for (target, outcome) in outcomes {
        match outcome {
            Some(Ok(path)) => report.successes.push((target, path)),
            Some(Err(error)) => report.failures.push((target, error)),
            None => report.skipped.push(target),
        }
    }
    report.successes.sort_by(|a, b| a.0.cmp(&b.0));
    report.failures.sort_by(|a, b| a.0.cmp(&b.0));
    report.skipped.sort();

    info!(
        written = report.successes.len(),
        failed = report.failures.len(),
        skipped = report.skipped.len(),
        "Workspace lockfile batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        Descriptor, Locator, LockfileMetadata, Manifest, PackageEntry, ResolutionMap, Workspace,
        WorkspaceMember,
    };
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl Reporter for Recorder {
        fn success(&self, target: &Ident, _path: &Path) {
            self.lines.lock().unwrap().push(format!("ok {target}"));
        }

        fn failure(&self, target: &Ident, error: &Error) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("err {target} {}", error.kind()));
        }
    }

    fn member(root: &Path, name: &str, deps: &[(&str, &str)]) -> WorkspaceMember {
        let mut manifest = Manifest {
            name: Some(Ident::new(name)),
            version: Some("1.0.0".to_string()),
            ..Manifest::default()
        };
        for (dep, range) in deps {
            let d = Descriptor::from_manifest(Ident::new(*dep), range);
            manifest.dependencies.insert(d.ident.clone(), d);
        }
        let path = PathBuf::from("packages").join(name);
        std::fs::create_dir_all(root.join(&path)).unwrap();
        WorkspaceMember::new(Ident::new(name), path.clone(), path.join("package.json"), manifest)
    }

    /// `a` needs lodash, `b` needs a range missing from the snapshot.
    fn context(root: &Path, options: RunOptions, config: Config) -> BatchContext {
        let mut workspace = Workspace::new(root.to_path_buf());
        workspace.add_member(member(root, "a", &[("lodash", "^4.17.0")]));
        workspace.add_member(member(root, "b", &[("left-pad", "^9.0.0")]));

        let mut map = ResolutionMap::new();
        let lodash = Locator::parse("lodash@npm:4.17.21").unwrap();
        map.insert(
            Descriptor::parse("lodash@npm:^4.17.0").unwrap(),
            PackageEntry::new(lodash, "4.17.21"),
        );
        let snapshot = ReuseSnapshot::new(LockfileMetadata::default(), map);

        BatchContext::new(
            ProjectGraph::from_workspace(workspace),
            Arc::new(snapshot),
            config,
            options,
        )
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_target() {
        let temp = TempDir::new().unwrap();
        let ctx = context(temp.path(), RunOptions::default(), Config::default());
        let recorder = Recorder::default();

        let report = generate_lockfiles(&ctx, &recorder).await;

        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.successes[0].0.as_str(), "a");
        assert!(report.successes[0].1.ends_with("packages/a/yarn.lock-workspace"));
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].1, Error::Resolution { .. }));
        assert!(!temp.path().join("packages/b/yarn.lock-workspace").exists());

        let mut lines = recorder.lines.lock().unwrap().clone();
        lines.sort();
        assert_eq!(lines, vec!["err b ResolutionError", "ok a"]);
    }

    #[tokio::test]
    async fn test_unknown_configured_target() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            workspace_lockfiles: Some(vec!["a".to_string(), "ghost".to_string()]),
            ..Config::default()
        };
        let ctx = context(temp.path(), RunOptions::default(), config);

        let report = generate_lockfiles(&ctx, &TracingReporter).await;

        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.failures[0].0.as_str(), "ghost");
        assert!(matches!(report.failures[0].1, Error::MemberNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_targets() {
        let temp = TempDir::new().unwrap();
        let options = RunOptions {
            jobs: 1,
            fail_fast: true,
            ..RunOptions::default()
        };
        let config = Config {
            workspace_lockfiles: Some(vec!["b".to_string(), "a".to_string()]),
            ..Config::default()
        };
        let ctx = context(temp.path(), options, config);

        let report = generate_lockfiles(&ctx, &TracingReporter).await;

        assert!(report.successes.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.skipped, vec![Ident::new("a")]);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let config = Config {
            workspace_lockfiles: Some(vec!["a".to_string()]),
            ..Config::default()
        };
        let ctx = context(temp.path(), options, config);

        let report = generate_lockfiles(&ctx, &TracingReporter).await;

        assert!(report.is_success());
        assert!(!report.successes[0].1.exists());
    }
}
