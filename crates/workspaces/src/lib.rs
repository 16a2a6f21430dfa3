// Transitive dependencies bring in multiple versions of foldhash and unicode-width
#![allow(clippy::multiple_crate_versions)]

//! Per-workspace scoped lockfiles for Yarn monorepos.
//!
//! For every member of a monorepo this crate produces a self-contained
//! lockfile covering only what that member needs, so it can be built or
//! installed in isolation.
//!
//! # Architecture
//!
//! One target runs through five stages:
//!
//! 1. [`compute_closure`] - the members the target needs, found by a fixed
//!    point over `dependencies`, `devDependencies` and `peerDependencies`
//! 2. [`ensure_resolved`] - resolutions for that closure, reused from the root
//!    lockfile where possible and handed to a [`Resolver`] and [`Fetcher`]
//!    otherwise; all or nothing
//! 3. [`extract_scope`] - prunes to what the closure reaches and rewrites the
//!    target's locator to `workspace:.`
//! 4. [`serialize`] - Yarn Berry lockfile text
//! 5. [`SwapWriter::publish`] - writes through the canonical `yarn.lock` slot
//!    and always restores it
//!
//! [`generate_lockfiles`] runs this for every selected member with bounded
//! parallelism and isolates failures per target.
//!
//! # Configuration
//!
//! [`Config`] carries the two recognised options, `workspaceLockfiles` and
//! `workspaceLockfileFilename`, read from `.yarnrc.yml`. [`RunOptions`] holds
//! the knobs of a single invocation.
//!
//! # Example
//!
//! ```rust,ignore
//! use lockscope_workspaces::{BatchContext, Config, RunOptions, TracingReporter, generate_lockfiles};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let ctx = BatchContext::load(root, Config::load(root)?, RunOptions::default())?;
//! let report = generate_lockfiles(&ctx, &TracingReporter).await;
//! for (ident, path) in &report.successes {
//!     println!("{ident}: {}", path.display());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod closure;
pub mod config;
pub mod core;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod parsers;
pub mod resolution;
pub mod scope;
pub mod serializer;
pub mod swap;

pub use batch::{
    BatchContext, BatchReport, Reporter, TracingReporter, generate_lockfile, generate_lockfiles,
};
pub use closure::{ClosurePolicy, compute_closure};
pub use config::{Config, RunOptions};
pub use core::{
    DependencyMeta, DependencyScope, Descriptor, Fetcher, Ident, LinkType, Locator,
    LockfileMetadata, LockfileParser, Manifest, PackageEntry, PeerDependencyMeta, ResolutionMap,
    Resolver, ReuseSnapshot, ScopedLockfile, Workspace, WorkspaceDiscovery, WorkspaceMember,
};
pub use discovery::PackageJsonDiscovery;
pub use error::{Error, Result};
pub use graph::ProjectGraph;
pub use parsers::YarnBerryLockfileParser;
pub use resolution::{ResolveRequest, SnapshotFetcher, SnapshotResolver, ensure_resolved};
pub use scope::extract_scope;
pub use serializer::serialize;
pub use swap::SwapWriter;
