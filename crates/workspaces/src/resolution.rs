//! Resolution and fetch adapter.
//!
//! [`ensure_resolved`] produces the complete [`ResolutionMap`] for one
//! closure: workspace descriptors resolve locally, everything else is reused
//! from the root lockfile snapshot or handed to the [`Resolver`], and every
//! hard-linked package is then passed through the [`Fetcher`]. Any failure
//! aborts the whole computation; no partial map is ever returned.

use crate::closure::ClosurePolicy;
use crate::core::traits::{Fetcher, Resolver};
use crate::core::types::{
    DependencyScope, Descriptor, Ident, LinkType, Locator, PackageEntry, ResolutionMap,
    ReuseSnapshot, WorkspaceMember,
};
use crate::error::{Error, Result};
use crate::graph::ProjectGraph;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

/// Everything [`ensure_resolved`] needs for one target.
#[derive(Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// Full workspace graph.
    pub graph: &'a ProjectGraph,
    /// Closure of the target, as computed with `policy`.
    pub closure: &'a BTreeSet<Ident>,
    /// The target member.
    pub target: &'a Ident,
    /// Policy the closure was computed with.
    pub policy: ClosurePolicy,
    /// Root lockfile to reuse resolutions from.
    pub snapshot: Option<&'a ReuseSnapshot>,
    /// Resolver for descriptors the snapshot does not cover.
    pub resolver: &'a dyn Resolver,
    /// Fetcher every hard-linked package is passed through.
    pub fetcher: &'a dyn Fetcher,
}

/// Resolves and fetches every descriptor the closure needs.
///
/// # Errors
///
/// - [`Error::Resolution`] if any descriptor cannot be resolved
/// - [`Error::Fetch`] if any artifact cannot be fetched
/// - [`Error::InvariantViolation`] if a hard descriptor designates a member
///   outside the closure
pub async fn ensure_resolved(request: ResolveRequest<'_>) -> Result<ResolutionMap> {
    let mut map = ResolutionMap::new();
    let mut seen: BTreeSet<Descriptor> = BTreeSet::new();
    let mut layer: Vec<Descriptor> = Vec::new();

    // Closure members resolve to themselves
    let members = request
        .closure
        .iter()
        .map(|ident| request.graph.require_member(ident))
        .collect::<Result<Vec<_>>>()?;
    for member in &members {
        let include_dev = request.policy.includes_dev(&member.ident == request.target);
        map.insert(
            member.locator().to_descriptor(),
            workspace_entry(member, include_dev),
        );
    }

    let mut skipped = Vec::new();
    for member in &members {
        let include_dev = request.policy.includes_dev(&member.ident == request.target);
        for (scope, descriptor) in resolvable_descriptors(member, include_dev) {
            if !seen.insert(descriptor.clone()) {
                continue;
            }

            match request.graph.member_by_descriptor(descriptor) {
                Some(dependency) if request.closure.contains(&dependency.ident) => {
                    map.alias(descriptor.clone(), dependency.locator());
                }
                Some(dependency) if scope == DependencyScope::OptionalDependencies => {
                    debug!(
                        member = %member.ident,
                        dependency = %dependency.ident,
                        "Skipping optional workspace dependency outside the closure"
                    );
                    skipped.push((member.locator(), descriptor.ident.clone()));
                }
                Some(dependency) => {
                    return Err(Error::InvariantViolation {
                        message: format!(
                            "{} depends on workspace {} which is missing from the closure of {}",
                            member.ident, dependency.ident, request.target
                        ),
                    });
                }
                None => layer.push(descriptor.clone()),
            }
        }
    }
    for (locator, ident) in skipped {
        if let Some(mut entry) = map.entry(&locator).cloned() {
            entry.dependencies.remove(&ident);
            map.insert_package(entry);
        }
    }

    let mut reused = 0usize;
    let mut resolved_fresh = 0usize;
    while !layer.is_empty() {
        let mut resolved = Vec::with_capacity(layer.len());
        let mut fresh = Vec::new();
        for descriptor in layer.drain(..) {
            match request.snapshot.and_then(|s| s.resolutions.resolve(&descriptor)) {
                Some(entry) => {
                    trace!(
                        descriptor = %descriptor,
                        locator = %entry.resolution,
                        "Reusing root resolution"
                    );
                    resolved.push((descriptor, entry.clone()));
                }
                None => fresh.push(descriptor),
            }
        }

        reused += resolved.len();
        resolved_fresh += fresh.len();
        let fresh_entries =
            try_join_all(fresh.iter().map(|d| request.resolver.resolve(d))).await?;
        resolved.extend(fresh.into_iter().zip(fresh_entries));

        let mut next = Vec::new();
        for (descriptor, entry) in resolved {
            // Compat patches are keyed off the descriptor they patch
            if let Some(snapshot) = request.snapshot {
                for (patch, _) in snapshot.resolutions.builtin_patches_of(&descriptor) {
                    if seen.insert(patch.clone()) {
                        next.push(patch.clone());
                    }
                }
            }
            if map.entry(&entry.resolution).is_some() {
                map.alias(descriptor, entry.resolution);
                continue;
            }
            for dependency in entry.dependencies.values() {
                if seen.insert(dependency.clone()) {
                    next.push(dependency.clone());
                }
            }
            map.insert(descriptor, entry);
        }
        layer = next;
    }

    fetch_all(&mut map, request.fetcher).await?;

    debug!(
        workspace = %request.target,
        packages = map.package_count(),
        reused,
        resolved = resolved_fresh,
        "Resolved closure"
    );
    Ok(map)
}

/// Passes every hard-linked registry package through the fetcher and records
/// the checksums it reports.
async fn fetch_all(map: &mut ResolutionMap, fetcher: &dyn Fetcher) -> Result<()> {
    let fetches = map
        .packages()
        .filter(|entry| needs_artifact(entry))
        .map(|entry| async move {
            let checksum = fetcher.fetch(entry).await?;
            Ok::<_, Error>((entry.resolution.clone(), checksum))
        });
    let fetched = try_join_all(fetches).await?;

    for (locator, checksum) in fetched {
        let Some(checksum) = checksum else { continue };
        if let Some(mut entry) = map.entry(&locator).cloned() {
            entry.checksum = Some(checksum);
            map.insert_package(entry);
        }
    }
    Ok(())
}

fn needs_artifact(entry: &PackageEntry) -> bool {
    entry.link_type == LinkType::Hard && !entry.resolution.is_workspace()
}

/// The lockfile entry for a closure member. Dev dependencies are dropped when
/// the policy does not follow them for this member, so every descriptor the
/// entry lists also gets a resolution.
fn workspace_entry(member: &WorkspaceMember, include_dev: bool) -> PackageEntry {
    let mut entry = PackageEntry::for_workspace(member);
    if !include_dev {
        let manifest = &member.manifest;
        entry.dependencies.retain(|ident, _| {
            manifest.dependencies.contains_key(ident)
                || manifest.optional_dependencies.contains_key(ident)
        });
    }
    entry
}

/// Descriptors of `member` that must resolve, tagged with their scope.
/// Peer dependencies are provided by the dependent and are not resolved.
fn resolvable_descriptors(
    member: &WorkspaceMember,
    include_dev: bool,
) -> impl Iterator<Item = (DependencyScope, &Descriptor)> {
    let scopes: &[DependencyScope] = if include_dev {
        &[
            DependencyScope::Dependencies,
            DependencyScope::OptionalDependencies,
            DependencyScope::DevDependencies,
        ]
    } else {
        &[
            DependencyScope::Dependencies,
            DependencyScope::OptionalDependencies,
        ]
    };
    scopes.iter().flat_map(move |&scope| {
        member
            .manifest
            .get_for_scope(scope)
            .values()
            .map(move |descriptor| (scope, descriptor))
    })
}

/// Resolver answering from the root lockfile.
#[derive(Debug, Clone)]
pub struct SnapshotResolver {
    snapshot: Arc<ReuseSnapshot>,
}

impl SnapshotResolver {
    /// Creates a resolver over `snapshot`.
    #[must_use]
    pub fn new(snapshot: Arc<ReuseSnapshot>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl Resolver for SnapshotResolver {
    async fn resolve(&self, descriptor: &Descriptor) -> Result<PackageEntry> {
        self.snapshot
            .resolutions
            .resolve(descriptor)
            .cloned()
            .ok_or_else(|| Error::Resolution {
                descriptor: descriptor.to_string(),
                message: "no matching entry in the root lockfile".to_string(),
            })
    }
}

/// Fetcher backed by the root lockfile and, optionally, the Yarn cache folder.
///
/// Without a cache folder it only reports the checksum recorded in the root
/// lockfile. With one, a package whose archive is missing from the cache
/// fails with [`Error::Fetch`].
#[derive(Debug)]
pub struct SnapshotFetcher {
    snapshot: Arc<ReuseSnapshot>,
    cache_dir: Option<PathBuf>,
    cache_index: OnceCell<BTreeSet<String>>,
}

impl SnapshotFetcher {
    /// Creates a fetcher that trusts the root lockfile.
    #[must_use]
    pub fn new(snapshot: Arc<ReuseSnapshot>) -> Self {
        Self {
            snapshot,
            cache_dir: None,
            cache_index: OnceCell::new(),
        }
    }

    /// Requires every archive to be present in `cache_dir`.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    async fn cache_index(&self, cache_dir: &Path, locator: &Locator) -> Result<&BTreeSet<String>> {
        self.cache_index
            .get_or_try_init(|| async {
                let mut entries =
                    tokio::fs::read_dir(cache_dir)
                        .await
                        .map_err(|e| Error::Fetch {
                            locator: locator.to_string(),
                            message: format!("cannot read cache folder {}: {e}", cache_dir.display()),
                        })?;
                let mut names = BTreeSet::new();
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| Error::io(e, cache_dir, "listing the package cache"))?
                {
                    if let Some(name) = entry.file_name().to_str() {
                        names.insert(name.to_string());
                    }
                }
                debug!(cache = %cache_dir.display(), archives = names.len(), "Indexed package cache");
                Ok(names)
            })
            .await
    }
}

#[async_trait]
impl Fetcher for SnapshotFetcher {
    async fn fetch(&self, entry: &PackageEntry) -> Result<Option<String>> {
        if !needs_artifact(entry) {
            return Ok(None);
        }

        if let Some(cache_dir) = &self.cache_dir {
            let index = self.cache_index(cache_dir, &entry.resolution).await?;
            let prefix = format!("{}-", entry.resolution.cache_slug());
            let cached = index
                .range(prefix.clone()..)
                .next()
                .is_some_and(|name| name.starts_with(&prefix));
            if !cached {
                return Err(Error::Fetch {
                    locator: entry.resolution.to_string(),
                    message: format!("no archive in {}", cache_dir.display()),
                });
            }
        }

        Ok(entry.checksum.clone().or_else(|| {
            self.snapshot
                .resolutions
                .entry(&entry.resolution)
                .and_then(|e| e.checksum.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::compute_closure;
    use crate::core::types::{LockfileMetadata, Manifest, Workspace};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ==========================================================================
    // Test doubles
    // ==========================================================================

    /// Resolves from a fixed table and records every call.
    #[derive(Default)]
    struct TableResolver {
        table: HashMap<Descriptor, PackageEntry>,
        calls: Mutex<Vec<Descriptor>>,
    }

    impl TableResolver {
        fn with(mut self, descriptor: &str, entry: PackageEntry) -> Self {
            self.table.insert(Descriptor::parse(descriptor).unwrap(), entry);
            self
        }

        fn calls(&self) -> Vec<Descriptor> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Resolver for TableResolver {
        async fn resolve(&self, descriptor: &Descriptor) -> Result<PackageEntry> {
            self.calls.lock().unwrap().push(descriptor.clone());
            self.table.get(descriptor).cloned().ok_or_else(|| Error::Resolution {
                descriptor: descriptor.to_string(),
                message: "not in table".to_string(),
            })
        }
    }

    /// Succeeds with a fixed checksum, or fails for one locator.
    struct StubFetcher {
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, entry: &PackageEntry) -> Result<Option<String>> {
            if self.fail_for.as_deref() == Some(entry.resolution.to_string().as_str()) {
                return Err(Error::Fetch {
                    locator: entry.resolution.to_string(),
                    message: "network unreachable".to_string(),
                });
            }
            Ok(Some(format!("10c0/{}", entry.resolution.cache_slug())))
        }
    }

    const OK_FETCHER: StubFetcher = StubFetcher { fail_for: None };

    fn member(name: &str, path: &str, deps: &[(DependencyScope, &str, &str)]) -> WorkspaceMember {
        let mut manifest = Manifest {
            name: Some(Ident::new(name)),
            version: Some("1.0.0".to_string()),
            ..Manifest::default()
        };
        for (scope, dep, range) in deps {
            let d = Descriptor::from_manifest(Ident::new(*dep), range);
            manifest.get_for_scope_mut(*scope).insert(d.ident.clone(), d);
        }
        WorkspaceMember::new(
            Ident::new(name),
            PathBuf::from(path),
            PathBuf::from(path).join("package.json"),
            manifest,
        )
    }

    fn graph(members: Vec<WorkspaceMember>) -> ProjectGraph {
        let mut workspace = Workspace::new(PathBuf::from("/repo"));
        for m in members {
            workspace.add_member(m);
        }
        ProjectGraph::from_workspace(workspace)
    }

    fn npm(locator: &str, version: &str, deps: &[(&str, &str)]) -> PackageEntry {
        let mut entry = PackageEntry::new(Locator::parse(locator).unwrap(), version);
        for (name, range) in deps {
            let ident = Ident::new(*name);
            entry
                .dependencies
                .insert(ident.clone(), Descriptor::new(ident, *range));
        }
        entry
    }

    fn abc_graph() -> ProjectGraph {
        graph(vec![
            member(
                "a",
                "packages/a",
                &[
                    (DependencyScope::Dependencies, "b", "workspace:*"),
                    (DependencyScope::Dependencies, "lodash", "^4.17.0"),
                ],
            ),
            member(
                "b",
                "packages/b",
                &[(DependencyScope::DevDependencies, "left-pad", "^1.3.0")],
            ),
            member("c", "packages/c", &[(DependencyScope::Dependencies, "react", "^18.0.0")]),
        ])
    }

    async fn run(
        g: &ProjectGraph,
        target: &str,
        policy: ClosurePolicy,
        snapshot: Option<&ReuseSnapshot>,
        resolver: &dyn Resolver,
        fetcher: &dyn Fetcher,
    ) -> Result<ResolutionMap> {
        let target = Ident::new(target);
        let closure = compute_closure(g, &target, policy)?;
        ensure_resolved(ResolveRequest {
            graph: g,
            closure: &closure,
            target: &target,
            policy,
            snapshot,
            resolver,
            fetcher,
        })
        .await
    }

    // ==========================================================================
    // ensure_resolved
    // ==========================================================================

    #[tokio::test]
    async fn test_resolves_closure_with_fresh_resolver() {
        let g = abc_graph();
        let resolver = TableResolver::default()
            .with("lodash@npm:^4.17.0", npm("lodash@npm:4.17.21", "4.17.21", &[]))
            .with("left-pad@npm:^1.3.0", npm("left-pad@npm:1.3.0", "1.3.0", &[]));

        let map = run(&g, "a", ClosurePolicy::Uniform, None, &resolver, &OK_FETCHER)
            .await
            .unwrap();

        assert_eq!(map.package_count(), 4);
        let b = map
            .resolve(&Descriptor::parse("b@workspace:*").unwrap())
            .unwrap();
        assert_eq!(b.resolution.reference, "workspace:packages/b");
        assert!(map.find_package(|l| l.ident.as_str() == "react").is_none());
        assert!(map.find_package(|l| l.ident.as_str() == "c").is_none());

        let lodash = map
            .entry(&Locator::parse("lodash@npm:4.17.21").unwrap())
            .unwrap();
        assert_eq!(lodash.checksum.as_deref(), Some("10c0/lodash-npm-4.17.21"));
    }

    #[tokio::test]
    async fn test_transitive_registry_dependencies_are_followed() {
        let g = graph(vec![member(
            "a",
            "packages/a",
            &[(DependencyScope::Dependencies, "react", "^18.0.0")],
        )]);
        let resolver = TableResolver::default()
            .with(
                "react@npm:^18.0.0",
                npm("react@npm:18.2.0", "18.2.0", &[("loose-envify", "npm:^1.1.0")]),
            )
            .with(
                "loose-envify@npm:^1.1.0",
                npm("loose-envify@npm:1.4.0", "1.4.0", &[("js-tokens", "npm:^4.0.0")]),
            )
            .with("js-tokens@npm:^4.0.0", npm("js-tokens@npm:4.0.0", "4.0.0", &[]));

        let map = run(&g, "a", ClosurePolicy::Uniform, None, &resolver, &OK_FETCHER)
            .await
            .unwrap();

        assert_eq!(map.package_count(), 4);
        assert_eq!(resolver.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_entries_are_reused() {
        let g = abc_graph();
        let mut resolutions = ResolutionMap::new();
        resolutions.insert(
            Descriptor::parse("lodash@npm:^4.17.0").unwrap(),
            npm("lodash@npm:4.17.21", "4.17.21", &[]),
        );
        let snapshot = ReuseSnapshot::new(LockfileMetadata::default(), resolutions);
        let resolver = TableResolver::default()
            .with("left-pad@npm:^1.3.0", npm("left-pad@npm:1.3.0", "1.3.0", &[]));

        let map = run(
            &g,
            "a",
            ClosurePolicy::Uniform,
            Some(&snapshot),
            &resolver,
            &OK_FETCHER,
        )
        .await
        .unwrap();

        assert_eq!(map.package_count(), 4);
        assert_eq!(
            resolver.calls(),
            vec![Descriptor::parse("left-pad@npm:^1.3.0").unwrap()]
        );
    }

    #[tokio::test]
    async fn test_compat_patches_ride_along() {
        let g = graph(vec![member(
            "a",
            "packages/a",
            &[(DependencyScope::DevDependencies, "typescript", "^5.0.0")],
        )]);
        let patch = "typescript@patch:typescript@npm%3A^5.0.0#optional!builtin<compat/typescript>";
        let patched = "typescript@patch:typescript@npm%3A5.4.5#optional!builtin<compat/typescript>::version=5.4.5&hash=5adc0c";
        let mut resolutions = ResolutionMap::new();
        resolutions.insert(
            Descriptor::parse("typescript@npm:^5.0.0").unwrap(),
            npm("typescript@npm:5.4.5", "5.4.5", &[]),
        );
        resolutions.insert(Descriptor::parse(patch).unwrap(), npm(patched, "5.4.5", &[]));
        let snapshot = ReuseSnapshot::new(LockfileMetadata::default(), resolutions);
        let resolver = TableResolver::default();

        let map = run(
            &g,
            "a",
            ClosurePolicy::Uniform,
            Some(&snapshot),
            &resolver,
            &OK_FETCHER,
        )
        .await
        .unwrap();

        assert_eq!(map.package_count(), 3);
        let entry = map.resolve(&Descriptor::parse(patch).unwrap()).unwrap();
        assert_eq!(entry.resolution.to_string(), patched);
        assert_eq!(entry.checksum.as_deref(), Some("10c0/typescript-patch"));
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_descriptor_fails_whole_target() {
        let g = abc_graph();
        let resolver = TableResolver::default()
            .with("lodash@npm:^4.17.0", npm("lodash@npm:4.17.21", "4.17.21", &[]));

        let result = run(&g, "a", ClosurePolicy::Uniform, None, &resolver, &OK_FETCHER).await;

        match result {
            Err(Error::Resolution { descriptor, .. }) => {
                assert_eq!(descriptor, "left-pad@npm:^1.3.0");
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_whole_target() {
        let g = abc_graph();
        let resolver = TableResolver::default()
            .with("lodash@npm:^4.17.0", npm("lodash@npm:4.17.21", "4.17.21", &[]))
            .with("left-pad@npm:^1.3.0", npm("left-pad@npm:1.3.0", "1.3.0", &[]));
        let fetcher = StubFetcher {
            fail_for: Some("left-pad@npm:1.3.0".to_string()),
        };

        let result = run(&g, "a", ClosurePolicy::Uniform, None, &resolver, &fetcher).await;
        assert!(matches!(result, Err(Error::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_target_dev_only_skips_dev_of_dependencies() {
        let g = abc_graph();
        let resolver = TableResolver::default()
            .with("lodash@npm:^4.17.0", npm("lodash@npm:4.17.21", "4.17.21", &[]));

        let map = run(
            &g,
            "a",
            ClosurePolicy::TargetDevOnly,
            None,
            &resolver,
            &OK_FETCHER,
        )
        .await
        .unwrap();

        assert_eq!(map.package_count(), 3);
        let b = map
            .entry(&Locator::parse("b@workspace:packages/b").unwrap())
            .unwrap();
        assert!(b.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_optional_member_outside_closure_is_skipped() {
        let g = graph(vec![
            member(
                "a",
                "packages/a",
                &[(DependencyScope::OptionalDependencies, "b", "workspace:*")],
            ),
            member("b", "packages/b", &[]),
        ]);
        let resolver = TableResolver::default();

        let map = run(&g, "a", ClosurePolicy::Uniform, None, &resolver, &OK_FETCHER)
            .await
            .unwrap();

        assert_eq!(map.package_count(), 1);
        assert!(resolver.calls().is_empty());
        let a = map
            .entry(&Locator::parse("a@workspace:packages/a").unwrap())
            .unwrap();
        assert!(a.dependencies.is_empty());
    }

    // ==========================================================================
    // SnapshotResolver / SnapshotFetcher
    // ==========================================================================

    fn snapshot_with_lodash() -> Arc<ReuseSnapshot> {
        let mut resolutions = ResolutionMap::new();
        let mut lodash = npm("lodash@npm:4.17.21", "4.17.21", &[]);
        lodash.checksum = Some("10c0/abc".to_string());
        resolutions.insert(Descriptor::parse("lodash@npm:^4.17.0").unwrap(), lodash);
        Arc::new(ReuseSnapshot::new(LockfileMetadata::default(), resolutions))
    }

    #[tokio::test]
    async fn test_snapshot_resolver() {
        let resolver = SnapshotResolver::new(snapshot_with_lodash());

        let entry = resolver
            .resolve(&Descriptor::parse("lodash@npm:^4.17.0").unwrap())
            .await
            .unwrap();
        assert_eq!(entry.version, "4.17.21");

        let missing = resolver
            .resolve(&Descriptor::parse("lodash@npm:^5.0.0").unwrap())
            .await;
        assert!(matches!(missing, Err(Error::Resolution { .. })));
    }

    #[tokio::test]
    async fn test_snapshot_fetcher_reports_checksums() {
        let fetcher = SnapshotFetcher::new(snapshot_with_lodash());

        let lodash = npm("lodash@npm:4.17.21", "4.17.21", &[]);
        assert_eq!(
            fetcher.fetch(&lodash).await.unwrap().as_deref(),
            Some("10c0/abc")
        );

        let mut workspace = npm("a@workspace:packages/a", "1.0.0", &[]);
        workspace.link_type = LinkType::Soft;
        assert_eq!(fetcher.fetch(&workspace).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_fetcher_verifies_cache() {
        let cache = tempfile::TempDir::new().unwrap();
        std::fs::write(
            cache.path().join("lodash-npm-4.17.21-6382451519-a4d3e5b8c2.zip"),
            b"",
        )
        .unwrap();
        let fetcher =
            SnapshotFetcher::new(snapshot_with_lodash()).with_cache_dir(cache.path().to_path_buf());

        let lodash = npm("lodash@npm:4.17.21", "4.17.21", &[]);
        assert!(fetcher.fetch(&lodash).await.is_ok());

        let react = npm("react@npm:18.2.0", "18.2.0", &[]);
        assert!(matches!(
            fetcher.fetch(&react).await,
            Err(Error::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_snapshot_fetcher_missing_cache_dir() {
        let fetcher = SnapshotFetcher::new(snapshot_with_lodash())
            .with_cache_dir(PathBuf::from("/nonexistent/.yarn/cache"));

        let lodash = npm("lodash@npm:4.17.21", "4.17.21", &[]);
        assert!(matches!(
            fetcher.fetch(&lodash).await,
            Err(Error::Fetch { .. })
        ));
    }
}
