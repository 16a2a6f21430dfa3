//! Discovery implementation for Yarn workspaces via package.json.

use crate::core::traits::WorkspaceDiscovery;
use crate::core::types::{
    DependencyMeta, DependencyScope, Descriptor, Ident, Manifest, PeerDependencyMeta, Workspace,
    WorkspaceMember,
};
use crate::discovery::{read_json_file, resolve_glob_patterns};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ident the host assigns to an unnamed root package.
const UNNAMED_ROOT: &str = "root-workspace-0b6124";

/// Discovers workspaces configured in the root `package.json`.
///
/// Both the array form and the object form (`{ "packages": [...] }`) of the
/// `workspaces` field are accepted. The root package is always a member, with
/// path `.`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageJsonDiscovery;

impl WorkspaceDiscovery for PackageJsonDiscovery {
    fn discover(&self, root: &Path) -> Result<Workspace> {
        let package_json_path = root.join("package.json");
        if !package_json_path.exists() {
            return Err(Error::WorkspaceNotFound {
                path: root.to_path_buf(),
            });
        }

        let package_json: PackageJson = read_json_file(&package_json_path)?;
        let root_ident = package_json
            .name
            .clone()
            .map_or_else(|| Ident::new(UNNAMED_ROOT), Ident::new);

        let mut workspace = Workspace::new(root.to_path_buf());
        workspace.add_member(WorkspaceMember::new(
            root_ident,
            PathBuf::from("."),
            package_json_path,
            package_json.into_manifest(),
        ));
        for member in self.find_members(root)? {
            workspace.add_member(member);
        }

        let lockfile = root.join("yarn.lock");
        workspace.lockfile = lockfile.exists().then_some(lockfile);

        debug!(
            root = %root.display(),
            members = workspace.member_count(),
            "Discovered workspace"
        );
        Ok(workspace)
    }

    fn find_members(&self, root: &Path) -> Result<Vec<WorkspaceMember>> {
        let package_json: PackageJson = read_json_file(&root.join("package.json"))?;

        let patterns = match package_json.workspaces {
            Some(WorkspacesField::Array(patterns)) => patterns,
            Some(WorkspacesField::Object { packages }) => packages,
            None => return Ok(Vec::new()),
        };

        let mut members = Vec::new();
        for path in resolve_glob_patterns(root, &patterns)? {
            if !self.validate_member(&path)? {
                debug!(path = %path.display(), "Skipping directory without a named package.json");
                continue;
            }

            let manifest_path = path.join("package.json");
            let member_pkg: PackageJson = read_json_file(&manifest_path)?;
            let Some(name) = member_pkg.name.clone() else {
                continue;
            };

            members.push(WorkspaceMember::new(
                Ident::new(name),
                path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
                manifest_path,
                member_pkg.into_manifest(),
            ));
        }

        members.sort_by(|a, b| a.ident.cmp(&b.ident));
        Ok(members)
    }

    /// Validates whether a directory is a valid workspace member.
    ///
    /// Directories without a `package.json`, with invalid JSON, or without a
    /// `name` field are skipped (`Ok(false)`). Only I/O errors propagate.
    fn validate_member(&self, member_path: &Path) -> Result<bool> {
        let manifest_path = member_path.join("package.json");
        if !manifest_path.exists() {
            return Ok(false);
        }

        match read_json_file::<PackageJson>(&manifest_path) {
            Ok(pkg) => Ok(pkg.name.is_some()),
            Err(Error::Json { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    workspaces: Option<WorkspacesField>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dependencies_meta: BTreeMap<String, DependencyMeta>,
    #[serde(default)]
    peer_dependencies_meta: BTreeMap<String, PeerDependencyMeta>,
    bin: Option<BinField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    Array(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BinField {
    Single(String),
    Map(BTreeMap<String, String>),
}

impl PackageJson {
    fn into_manifest(self) -> Manifest {
        let name = self.name.map(Ident::new);
        let bin = match self.bin {
            Some(BinField::Single(path)) => name
                .as_ref()
                .map(|ident| BTreeMap::from([(ident.name().to_string(), path)]))
                .unwrap_or_default(),
            Some(BinField::Map(map)) => map,
            None => BTreeMap::new(),
        };

        let mut manifest = Manifest {
            name,
            version: self.version,
            dependencies_meta: self.dependencies_meta,
            peer_dependencies_meta: self.peer_dependencies_meta,
            bin,
            ..Manifest::default()
        };

        let scopes = [
            (DependencyScope::Dependencies, self.dependencies),
            (DependencyScope::DevDependencies, self.dev_dependencies),
            (DependencyScope::PeerDependencies, self.peer_dependencies),
            (DependencyScope::OptionalDependencies, self.optional_dependencies),
        ];
        for (scope, entries) in scopes {
            let target = manifest.get_for_scope_mut(scope);
            for (name, range) in entries {
                let ident = Ident::new(name);
                target.insert(ident.clone(), Descriptor::from_manifest(ident, &range));
            }
        }

        manifest
    }
}
