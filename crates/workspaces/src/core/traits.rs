//! Core traits for workspace discovery, lockfile parsing, resolution and fetching.

use crate::core::types::{Descriptor, PackageEntry, ReuseSnapshot, Workspace, WorkspaceMember};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Discovers workspace configuration from a root directory.
///
/// Implementations handle the package manager-specific logic for finding
/// workspace members, validating their structure, and building a complete
/// workspace representation.
pub trait WorkspaceDiscovery {
    /// Discovers the complete workspace configuration from a root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The workspace configuration file is not found
    /// - The configuration is invalid
    /// - Members cannot be discovered or validated
    fn discover(&self, root: &Path) -> Result<Workspace>;

    /// Finds all workspace members using glob patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if member discovery fails (e.g., invalid glob patterns,
    /// I/O errors).
    fn find_members(&self, root: &Path) -> Result<Vec<WorkspaceMember>>;

    /// Validates that a potential workspace member has the required manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if validation cannot be performed (e.g., I/O errors).
    /// Returns `Ok(false)` if the member is invalid, `Ok(true)` if valid.
    fn validate_member(&self, member_path: &Path) -> Result<bool>;
}

/// Parses a monorepo lockfile into a reusable snapshot.
pub trait LockfileParser {
    /// Parses a lockfile file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The lockfile cannot be read
    /// - The lockfile format is invalid or corrupted
    /// - Required fields are missing
    fn parse(&self, lockfile_path: &Path) -> Result<ReuseSnapshot>;
}

/// Resolves a descriptor to a concrete package.
///
/// This is the seam to the host's resolution engine. Implementations must be
/// deterministic within a run: the same descriptor always yields the same
/// locator.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves `descriptor` to the entry of the package it designates.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Resolution`] when no package satisfies the
    /// descriptor.
    async fn resolve(&self, descriptor: &Descriptor) -> Result<PackageEntry>;
}

/// Makes a resolved package's artifact available in the shared cache.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the artifact for `entry`, returning its checksum if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Fetch`] when the artifact cannot be retrieved.
    async fn fetch(&self, entry: &PackageEntry) -> Result<Option<String>>;
}
