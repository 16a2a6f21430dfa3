//! Core abstractions for workspace lockfile scoping.
//!
//! - **Traits** define the seams to discovery, lockfile parsing, and the
//!   host's resolver and fetcher
//! - **Types** provide idents, descriptors, locators, manifests and the
//!   resolution maps that flow between components
//! - **Range** implements npm semver range matching used for workspace
//!   matching and descriptor normalisation

pub mod range;
pub mod traits;
pub mod types;

pub use traits::{Fetcher, LockfileParser, Resolver, WorkspaceDiscovery};
pub use types::{
    DependencyMeta, DependencyScope, Descriptor, Ident, LinkType, Locator, LockfileMetadata,
    Manifest, PackageEntry, PeerDependencyMeta, ResolutionMap, ReuseSnapshot, SELF_REFERENCE,
    ScopedLockfile, WORKSPACE_PROTOCOL, WORKSPACE_VERSION, Workspace, WorkspaceMember,
};
