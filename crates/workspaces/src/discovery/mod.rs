//! Monorepo discovery.
//!
//! This module provides the [`WorkspaceDiscovery`](crate::WorkspaceDiscovery)
//! implementation for Yarn monorepos configured through the root
//! `package.json` `workspaces` field, plus the JSON and YAML file helpers
//! used by discovery and the configuration loader.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lockscope_workspaces::{PackageJsonDiscovery, WorkspaceDiscovery};
//! use std::path::Path;
//!
//! let workspace = PackageJsonDiscovery.discover(Path::new("."))?;
//! println!("Found {} members", workspace.member_count());
//! ```

use crate::error::{Error, Result};
use glob::Pattern;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub mod package_json;

pub use package_json::PackageJsonDiscovery;

/// Directory names never descended into while matching member globs.
const PRUNED_DIRS: [&str; 6] = ["node_modules", ".git", ".yarn", "target", "dist", ".pnp"];

/// Resolves glob patterns to directories below `root`.
///
/// Patterns prefixed with `!` exclude matches. Dependency and VCS directories
/// are pruned from the walk.
///
/// # Returns
///
/// A sorted list of unique absolute paths (rooted under `root`).
///
/// # Errors
///
/// Returns an error if a pattern is not a valid glob.
pub fn resolve_glob_patterns(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let compile = |raw: &str| {
        // Yarn accepts "packages/*/" as well as "packages/*"
        let trimmed = raw.trim_start_matches("./").trim_end_matches('/');
        Pattern::new(trimmed).map_err(|e| Error::InvalidWorkspaceConfig {
            path: root.join("package.json"),
            message: format!("invalid workspace pattern '{raw}': {e}"),
        })
    };

    let mut inclusion_patterns = Vec::new();
    let mut exclusion_patterns = Vec::new();

    for p in patterns {
        if let Some(stripped) = p.strip_prefix('!') {
            exclusion_patterns.push(compile(stripped)?);
        } else {
            inclusion_patterns.push(compile(p)?);
        }
    }

    let mut matched_paths = BTreeSet::new();
    let walker = WalkDir::new(root).follow_links(false).into_iter();

    for entry in walker
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .is_some_and(|name| PRUNED_DIRS.contains(&name))
        })
        .filter_map(std::result::Result::ok)
    {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let Ok(rel_path) = path.strip_prefix(root) else {
            continue;
        };

        if exclusion_patterns.iter().any(|p| p.matches_path(rel_path)) {
            continue;
        }
        if inclusion_patterns.iter().any(|p| p.matches_path(rel_path)) {
            matched_paths.insert(path.to_path_buf());
        }
    }

    Ok(matched_paths.into_iter().collect())
}

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed as valid JSON.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(e, path, "reading json file"))?;

    serde_json::from_str(&content).map_err(|e| Error::Json {
        source: e,
        path: Some(path.to_path_buf()),
    })
}

/// Reads and parses a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed as valid YAML.
pub fn read_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(e, path, "reading yaml file"))?;

    serde_yaml::from_str(&content).map_err(|e| Error::Yaml {
        source: e,
        path: Some(path.to_path_buf()),
    })
}
