//! Core types for representing workspaces, descriptors, locators and lockfile entries.

use crate::core::range;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Protocol prefix used by workspace references and ranges.
pub const WORKSPACE_PROTOCOL: &str = "workspace:";

/// The path-independent reference a package uses to point at itself.
pub const SELF_REFERENCE: &str = "workspace:.";

/// Version the host records for every soft-linked workspace entry.
pub const WORKSPACE_VERSION: &str = "0.0.0-use.local";

const PATCH_PROTOCOL: &str = "patch:";

/// A package name, optionally scoped (`@scope/name`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    /// Creates an ident from a package name.
    ///
    /// # Example
    ///
    /// ```
    /// use lockscope_workspaces::Ident;
    ///
    /// let ident = Ident::new("@babel/core");
    /// assert_eq!(ident.scope(), Some("babel"));
    /// assert_eq!(ident.name(), "core");
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the full name, including the scope.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the scope without the leading `@`, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.0
            .strip_prefix('@')
            .and_then(|rest| rest.split_once('/'))
            .map(|(scope, _)| scope)
    }

    /// Returns the unscoped part of the name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.0.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// Filesystem-safe form of the ident (`@scope/name` becomes `@scope-name`).
    #[must_use]
    pub fn slug(&self) -> String {
        self.0.replace('/', "-")
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Splits `name@rest` (or `@scope/name@rest`) into its two halves.
fn split_ident(value: &str) -> Result<(Ident, &str)> {
    let search_from = usize::from(value.starts_with('@'));
    let at = value[search_from..]
        .find('@')
        .map(|idx| idx + search_from)
        .ok_or_else(|| Error::InvalidDescriptor {
            value: value.to_string(),
            message: "missing '@' separator".to_string(),
        })?;

    let (name, rest) = (&value[..at], &value[at + 1..]);
    if name.is_empty() || name == "@" || (name.starts_with('@') && !name.contains('/')) {
        return Err(Error::InvalidDescriptor {
            value: value.to_string(),
            message: "invalid package name".to_string(),
        });
    }

    Ok((Ident::new(name), rest))
}

/// An unresolved dependency request: an ident plus a range or protocol string.
///
/// Two descriptors are equal iff their ident and range match exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    /// Requested package.
    pub ident: Ident,
    /// Range or protocol string (e.g. `npm:^1.0.0`, `workspace:*`).
    pub range: String,
}

impl Descriptor {
    /// Creates a descriptor without normalising the range.
    pub fn new(ident: Ident, range: impl Into<String>) -> Self {
        Self {
            ident,
            range: range.into(),
        }
    }

    /// Creates a descriptor from a manifest entry, applying the default `npm:`
    /// protocol to semver ranges and dist-tags.
    ///
    /// # Example
    ///
    /// ```
    /// use lockscope_workspaces::{Descriptor, Ident};
    ///
    /// let d = Descriptor::from_manifest(Ident::new("lodash"), "^4.17.0");
    /// assert_eq!(d.range, "npm:^4.17.0");
    ///
    /// let d = Descriptor::from_manifest(Ident::new("b"), "workspace:*");
    /// assert_eq!(d.range, "workspace:*");
    /// ```
    pub fn from_manifest(ident: Ident, range: &str) -> Self {
        let range = range.trim();
        let normalized = if has_protocol(range) || range.starts_with(['.', '/', '~']) {
            range.to_string()
        } else if range::is_valid_range(range) || is_tag(range) {
            format!("npm:{range}")
        } else {
            range.to_string()
        };
        Self::new(ident, normalized)
    }

    /// Parses `name@range` or `@scope/name@range`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`] when there is no `@` separator or
    /// the name part is malformed.
    pub fn parse(value: &str) -> Result<Self> {
        let (ident, range) = split_ident(value.trim())?;
        Ok(Self::new(ident, range))
    }

    /// Returns the protocol (without the trailing colon), if any.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        protocol_of(&self.range)
    }

    /// Returns true if the range uses the `workspace:` protocol.
    #[must_use]
    pub fn is_workspace(&self) -> bool {
        self.range.starts_with(WORKSPACE_PROTOCOL)
    }

    /// For an implicit compat patch such as
    /// `typescript@patch:typescript@npm%3A^5.0.0#optional!builtin<compat/typescript>`,
    /// the descriptor it patches (`typescript@npm:^5.0.0`).
    #[must_use]
    pub fn builtin_patch_source(&self) -> Option<Self> {
        let (source, patch) = self.range.strip_prefix(PATCH_PROTOCOL)?.split_once('#')?;
        if !patch.contains("builtin<") {
            return None;
        }
        let source = Self::parse(&source.replace("%3A", ":").replace("%40", "@")).ok()?;
        (source.ident == self.ident).then_some(source)
    }

    /// Returns the range with any `npm:` prefix removed.
    #[must_use]
    pub fn npm_range(&self) -> &str {
        self.range.strip_prefix("npm:").unwrap_or(&self.range)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ident, self.range)
    }
}

/// A resolved package: an ident plus the concrete reference it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Resolved package.
    pub ident: Ident,
    /// Concrete reference (e.g. `npm:1.2.3`, `workspace:packages/foo`).
    pub reference: String,
}

impl Locator {
    /// Creates a locator.
    pub fn new(ident: Ident, reference: impl Into<String>) -> Self {
        Self {
            ident,
            reference: reference.into(),
        }
    }

    /// Creates the locator of a workspace living at `path` (relative to the
    /// monorepo root).
    #[must_use]
    pub fn workspace(ident: Ident, path: &Path) -> Self {
        Self::new(ident, format!("{WORKSPACE_PROTOCOL}{}", portable_path(path)))
    }

    /// Parses `name@reference` or `@scope/name@reference`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`] for malformed input.
    pub fn parse(value: &str) -> Result<Self> {
        let (ident, reference) = split_ident(value.trim())?;
        Ok(Self::new(ident, reference))
    }

    /// Returns true if the reference uses the `workspace:` protocol.
    #[must_use]
    pub fn is_workspace(&self) -> bool {
        self.reference.starts_with(WORKSPACE_PROTOCOL)
    }

    /// Returns true if this is the path-independent self-reference.
    #[must_use]
    pub fn is_self_reference(&self) -> bool {
        self.reference == SELF_REFERENCE
    }

    /// Leading part of the cache archive name (`npm:1.2.3` becomes
    /// `<ident>-npm-1.2.3`). Other protocols name their archives by a hash,
    /// so only `<ident>-<protocol>` is predictable for them.
    #[must_use]
    pub fn cache_slug(&self) -> String {
        let reference: String = match self.reference.split_once(':') {
            Some(("npm", _)) | None => self
                .reference
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '-' })
                .collect(),
            Some((protocol, _)) => protocol.to_string(),
        };
        format!("{}-{}", self.ident.slug(), reference)
    }

    /// Converts the locator into the descriptor that pins it exactly.
    #[must_use]
    pub fn to_descriptor(&self) -> Descriptor {
        Descriptor::new(self.ident.clone(), self.reference.clone())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ident, self.reference)
    }
}

fn protocol_of(range: &str) -> Option<&str> {
    let colon = range.find(':')?;
    let protocol = &range[..colon];
    protocol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(protocol)
        .filter(|p| !p.is_empty())
}

fn has_protocol(range: &str) -> bool {
    protocol_of(range).is_some()
}

fn is_tag(range: &str) -> bool {
    !range.is_empty()
        && !range.starts_with(['v', 'V'])
        && range
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Renders a relative path with forward slashes, `.` for the empty path.
#[must_use]
pub fn portable_path(path: &Path) -> String {
    let rendered = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .filter(|c| c != ".")
        .collect::<Vec<_>>()
        .join("/");
    if rendered.is_empty() {
        ".".to_string()
    } else {
        rendered
    }
}

/// A dependency category declared in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyScope {
    /// `dependencies`
    Dependencies,
    /// `devDependencies`
    DevDependencies,
    /// `peerDependencies`
    PeerDependencies,
    /// `optionalDependencies`
    OptionalDependencies,
}

impl DependencyScope {
    /// Every scope, in manifest order.
    pub const ALL: [Self; 4] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::PeerDependencies,
        Self::OptionalDependencies,
    ];

    /// Scopes whose workspace edges pull packages into a closure.
    pub const HARD: [Self; 3] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::PeerDependencies,
    ];

    /// The `package.json` field name for this scope.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::PeerDependencies => "peerDependencies",
            Self::OptionalDependencies => "optionalDependencies",
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// The dependency-relevant parts of a `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Package name.
    pub name: Option<Ident>,
    /// Declared version.
    pub version: Option<String>,
    /// `dependencies`
    pub dependencies: BTreeMap<Ident, Descriptor>,
    /// `devDependencies`
    pub dev_dependencies: BTreeMap<Ident, Descriptor>,
    /// `peerDependencies`
    pub peer_dependencies: BTreeMap<Ident, Descriptor>,
    /// `optionalDependencies`
    pub optional_dependencies: BTreeMap<Ident, Descriptor>,
    /// `dependenciesMeta`
    pub dependencies_meta: BTreeMap<String, DependencyMeta>,
    /// `peerDependenciesMeta`
    pub peer_dependencies_meta: BTreeMap<String, PeerDependencyMeta>,
    /// `bin`, normalised to a name -> path map.
    pub bin: BTreeMap<String, String>,
}

impl Manifest {
    /// Returns the descriptors declared for `scope`.
    #[must_use]
    pub fn get_for_scope(&self, scope: DependencyScope) -> &BTreeMap<Ident, Descriptor> {
        match scope {
            DependencyScope::Dependencies => &self.dependencies,
            DependencyScope::DevDependencies => &self.dev_dependencies,
            DependencyScope::PeerDependencies => &self.peer_dependencies,
            DependencyScope::OptionalDependencies => &self.optional_dependencies,
        }
    }

    /// Mutable access to the descriptors declared for `scope`.
    pub fn get_for_scope_mut(&mut self, scope: DependencyScope) -> &mut BTreeMap<Ident, Descriptor> {
        match scope {
            DependencyScope::Dependencies => &mut self.dependencies,
            DependencyScope::DevDependencies => &mut self.dev_dependencies,
            DependencyScope::PeerDependencies => &mut self.peer_dependencies,
            DependencyScope::OptionalDependencies => &mut self.optional_dependencies,
        }
    }
}

/// Represents a complete monorepo with all its workspace members.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    /// The root directory of the monorepo.
    pub root: PathBuf,

    /// All workspace members, the root package included.
    pub members: Vec<WorkspaceMember>,

    /// Path to the root lockfile, if present.
    pub lockfile: Option<PathBuf>,
}

impl Workspace {
    /// Creates a new empty workspace.
    ///
    /// # Example
    ///
    /// ```
    /// use lockscope_workspaces::Workspace;
    /// use std::path::PathBuf;
    ///
    /// let workspace = Workspace::new(PathBuf::from("/path/to/monorepo"));
    /// assert_eq!(workspace.member_count(), 0);
    /// ```
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            members: Vec::new(),
            lockfile: None,
        }
    }

    /// Adds a member to the workspace.
    pub fn add_member(&mut self, member: WorkspaceMember) {
        self.members.push(member);
    }

    /// Returns the number of workspace members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// A single package within the monorepo.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceMember {
    /// The package ident.
    pub ident: Ident,

    /// Path relative to the monorepo root (`.` for the root package).
    pub path: PathBuf,

    /// Path to the member's `package.json`.
    pub manifest_path: PathBuf,

    /// Parsed manifest.
    pub manifest: Manifest,
}

impl WorkspaceMember {
    /// Builds a member from its relative path and manifest.
    #[must_use]
    pub fn new(ident: Ident, path: PathBuf, manifest_path: PathBuf, manifest: Manifest) -> Self {
        Self {
            ident,
            path,
            manifest_path,
            manifest,
        }
    }

    /// The locator this member resolves to in the root lockfile.
    #[must_use]
    pub fn locator(&self) -> Locator {
        Locator::workspace(self.ident.clone(), &self.path)
    }

    /// The member's relative path in portable form.
    #[must_use]
    pub fn relative_path(&self) -> String {
        portable_path(&self.path)
    }

    /// Absolute directory of the member under `root`.
    #[must_use]
    pub fn cwd(&self, root: &Path) -> PathBuf {
        if self.relative_path() == "." {
            root.to_path_buf()
        } else {
            root.join(&self.path)
        }
    }

    /// Declared version, or the placeholder the host uses for unversioned workspaces.
    #[must_use]
    pub fn version(&self) -> &str {
        self.manifest.version.as_deref().unwrap_or(WORKSPACE_VERSION)
    }
}

/// How a package is made available to its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Unpacked from an archive.
    #[default]
    Hard,
    /// Symlinked to a local directory (workspaces, portals).
    Soft,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hard => f.write_str("hard"),
            Self::Soft => f.write_str("soft"),
        }
    }
}

/// Per-dependency install settings (`dependenciesMeta`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyMeta {
    /// Whether build scripts may run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built: Option<bool>,
    /// Whether the dependency is optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    /// Whether the package must be unpacked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unplugged: Option<bool>,
}

/// Per-peer settings (`peerDependenciesMeta`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDependencyMeta {
    /// Whether the peer may be absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// One resolved package, as recorded in a lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Resolved version.
    pub version: String,
    /// The locator this entry describes.
    pub resolution: Locator,
    /// Dependencies restated as descriptors.
    pub dependencies: BTreeMap<Ident, Descriptor>,
    /// Peer dependencies restated as descriptors.
    pub peer_dependencies: BTreeMap<Ident, Descriptor>,
    /// `dependenciesMeta`
    pub dependencies_meta: BTreeMap<String, DependencyMeta>,
    /// `peerDependenciesMeta`
    pub peer_dependencies_meta: BTreeMap<String, PeerDependencyMeta>,
    /// Executables exposed by the package.
    pub bin: BTreeMap<String, String>,
    /// Archive checksum, absent for soft links.
    pub checksum: Option<String>,
    /// Platform conditions (e.g. `os=darwin`).
    pub conditions: Option<String>,
    /// `node` for registry packages, `unknown` for workspaces.
    pub language_name: String,
    /// Link type.
    pub link_type: LinkType,
}

impl PackageEntry {
    /// Creates an entry with no dependencies and no metadata.
    #[must_use]
    pub fn new(resolution: Locator, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            resolution,
            dependencies: BTreeMap::new(),
            peer_dependencies: BTreeMap::new(),
            dependencies_meta: BTreeMap::new(),
            peer_dependencies_meta: BTreeMap::new(),
            bin: BTreeMap::new(),
            checksum: None,
            conditions: None,
            language_name: "node".to_string(),
            link_type: LinkType::Hard,
        }
    }

    /// Synthesises the entry the host writes for a workspace member. The
    /// declared version is not recorded; soft links always carry
    /// [`WORKSPACE_VERSION`].
    #[must_use]
    pub fn for_workspace(member: &WorkspaceMember) -> Self {
        let manifest = &member.manifest;
        let mut entry = Self::new(member.locator(), WORKSPACE_VERSION);
        entry.dependencies = manifest
            .dependencies
            .iter()
            .chain(&manifest.optional_dependencies)
            .chain(&manifest.dev_dependencies)
            .map(|(ident, descriptor)| (ident.clone(), descriptor.clone()))
            .collect();
        entry.peer_dependencies = manifest.peer_dependencies.clone();
        entry.dependencies_meta = manifest.dependencies_meta.clone();
        entry.peer_dependencies_meta = manifest.peer_dependencies_meta.clone();
        entry.bin = manifest.bin.clone();
        entry.language_name = "unknown".to_string();
        entry.link_type = LinkType::Soft;
        entry
    }
}

/// The `__metadata` block of a lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockfileMetadata {
    /// Lockfile format version.
    pub version: u32,
    /// Cache key the checksums were computed with.
    pub cache_key: Option<String>,
}

impl Default for LockfileMetadata {
    fn default() -> Self {
        Self {
            version: 8,
            cache_key: Some("10c0".to_string()),
        }
    }
}

/// Descriptor -> locator and locator -> entry maps produced by a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionMap {
    resolutions: BTreeMap<Descriptor, Locator>,
    packages: BTreeMap<Locator, PackageEntry>,
}

impl ResolutionMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `descriptor` resolves to `entry.resolution`, storing the entry.
    pub fn insert(&mut self, descriptor: Descriptor, entry: PackageEntry) {
        self.resolutions
            .insert(descriptor, entry.resolution.clone());
        self.packages.insert(entry.resolution.clone(), entry);
    }

    /// Records a descriptor alias for an already stored locator.
    pub fn alias(&mut self, descriptor: Descriptor, locator: Locator) {
        self.resolutions.insert(descriptor, locator);
    }

    /// Looks up the locator a descriptor resolved to.
    #[must_use]
    pub fn locator_for(&self, descriptor: &Descriptor) -> Option<&Locator> {
        self.resolutions.get(descriptor)
    }

    /// Looks up the entry for a locator.
    #[must_use]
    pub fn entry(&self, locator: &Locator) -> Option<&PackageEntry> {
        self.packages.get(locator)
    }

    /// Resolves a descriptor all the way to its entry.
    #[must_use]
    pub fn resolve(&self, descriptor: &Descriptor) -> Option<&PackageEntry> {
        self.locator_for(descriptor).and_then(|l| self.entry(l))
    }

    /// All descriptors that resolve to `locator`, sorted.
    #[must_use]
    pub fn descriptors_for(&self, locator: &Locator) -> Vec<&Descriptor> {
        self.resolutions
            .iter()
            .filter(|(_, l)| *l == locator)
            .map(|(d, _)| d)
            .collect()
    }

    /// Finds the stored entry of a package by ident and predicate.
    pub fn find_package(&self, mut predicate: impl FnMut(&Locator) -> bool) -> Option<&PackageEntry> {
        self.packages.values().find(|e| predicate(&e.resolution))
    }

    /// Iterates descriptor -> locator pairs in order.
    pub fn resolutions(&self) -> impl Iterator<Item = (&Descriptor, &Locator)> {
        self.resolutions.iter()
    }

    /// Iterates stored entries in locator order.
    pub fn packages(&self) -> impl Iterator<Item = &PackageEntry> {
        self.packages.values()
    }

    /// Iterates stored entries mutably, in locator order.
    ///
    /// Callers must not change an entry's `resolution`; use
    /// [`remove_package`](Self::remove_package) and
    /// [`insert_package`](Self::insert_package) for that.
    pub fn packages_mut(&mut self) -> impl Iterator<Item = &mut PackageEntry> {
        self.packages.values_mut()
    }

    /// Number of distinct packages.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Returns true if no package has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Removes a package and every descriptor pointing at it, returning the entry.
    pub fn remove_package(&mut self, locator: &Locator) -> Option<PackageEntry> {
        self.resolutions.retain(|_, l| l != locator);
        self.packages.remove(locator)
    }

    /// Compat patch descriptors recorded for `source`, e.g. the
    /// `typescript@patch:…#optional!builtin<compat/typescript>` companion of
    /// `typescript@npm:^5.0.0`. No dependency lists these; they ride along
    /// with the descriptor they patch.
    pub fn builtin_patches_of<'a>(
        &'a self,
        source: &'a Descriptor,
    ) -> impl Iterator<Item = (&'a Descriptor, &'a Locator)> {
        let start = Descriptor::new(source.ident.clone(), PATCH_PROTOCOL);
        self.resolutions
            .range(start..)
            .take_while(move |(d, _)| {
                d.ident == source.ident && d.range.starts_with(PATCH_PROTOCOL)
            })
            .filter(move |(d, _)| d.builtin_patch_source().as_ref() == Some(source))
    }

    /// Stores an entry without recording a descriptor for it.
    pub fn insert_package(&mut self, entry: PackageEntry) {
        self.packages.insert(entry.resolution.clone(), entry);
    }

    /// Keeps only the packages whose locator is in `keep`, together with
    /// the descriptors that resolve to them.
    pub fn retain_packages(&mut self, keep: &BTreeSet<Locator>) {
        self.packages.retain(|l, _| keep.contains(l));
        self.resolutions.retain(|_, l| keep.contains(l));
    }
}

/// The parsed root lockfile: an immutable record of a completed
/// resolve+fetch pass over the whole monorepo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReuseSnapshot {
    /// `__metadata` of the root lockfile.
    pub metadata: LockfileMetadata,
    /// Every resolution recorded in the root lockfile.
    pub resolutions: ResolutionMap,
}

impl ReuseSnapshot {
    /// Wraps parsed lockfile data.
    #[must_use]
    pub fn new(metadata: LockfileMetadata, resolutions: ResolutionMap) -> Self {
        Self {
            metadata,
            resolutions,
        }
    }
}

/// The reduced lockfile handed to the serializer for one target package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedLockfile {
    /// `__metadata` block to emit.
    pub metadata: LockfileMetadata,
    /// Packages reachable from the closure, self-reference normalised.
    pub resolutions: ResolutionMap,
    /// The target's own (rewritten) locator.
    pub self_locator: Locator,
}
