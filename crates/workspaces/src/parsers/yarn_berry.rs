//! Yarn Berry (v2+) `yarn.lock` parser.
//!
//! The root lockfile is a YAML mapping. The `__metadata` block carries the
//! format version and cache key; every other key is a comma-separated list of
//! descriptors sharing one package entry. Each descriptor becomes an alias of
//! the entry's locator in the snapshot's [`ResolutionMap`].

use crate::core::traits::LockfileParser;
use crate::core::types::{
    DependencyMeta, Descriptor, Ident, LinkType, Locator, LockfileMetadata, PackageEntry,
    PeerDependencyMeta, ResolutionMap, ReuseSnapshot,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

const METADATA_KEY: &str = "__metadata";

/// Parser for Yarn Berry (v2+) `yarn.lock` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct YarnBerryLockfileParser;

impl YarnBerryLockfileParser {
    /// Parses lockfile text. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockfileParseFailed`] when the text is not a Yarn
    /// Berry lockfile or an entry is malformed.
    pub fn parse_str(&self, contents: &str, origin: &Path) -> Result<ReuseSnapshot> {
        let parse_error = |message: String| Error::LockfileParseFailed {
            path: origin.to_path_buf(),
            message,
        };

        // Parse as YAML value first to separate the metadata block
        let value: Value =
            serde_yaml::from_str(contents).map_err(|source| parse_error(source.to_string()))?;
        let mut map = match value {
            Value::Mapping(map) => map,
            Value::Null => serde_yaml::Mapping::new(),
            _ => return Err(parse_error("Expected YAML mapping at root level".to_string())),
        };

        let metadata = match map.remove(METADATA_KEY) {
            Some(raw) => serde_yaml::from_value::<RawMetadata>(raw)
                .map_err(|source| parse_error(format!("Invalid __metadata block: {source}")))?
                .into_metadata(),
            None => LockfileMetadata::default(),
        };

        let packages: BTreeMap<String, RawPackage> =
            serde_yaml::from_value(Value::Mapping(map))
                .map_err(|source| parse_error(format!("Failed to deserialize packages: {source}")))?;

        let mut resolutions = ResolutionMap::new();
        for (key, raw) in packages {
            let entry = raw.into_entry(&key).map_err(parse_error)?;
            let locator = entry.resolution.clone();
            resolutions.insert_package(entry);

            for descriptor in key.split(", ") {
                let descriptor = Descriptor::parse(descriptor)
                    .map_err(|e| parse_error(format!("Invalid key '{key}': {e}")))?;
                resolutions.alias(descriptor, locator.clone());
            }
        }

        debug!(
            lockfile = %origin.display(),
            packages = resolutions.package_count(),
            version = metadata.version,
            "Parsed root lockfile"
        );
        Ok(ReuseSnapshot::new(metadata, resolutions))
    }
}

impl LockfileParser for YarnBerryLockfileParser {
    fn parse(&self, lockfile_path: &Path) -> Result<ReuseSnapshot> {
        if !lockfile_path.exists() {
            return Err(Error::LockfileNotFound {
                path: lockfile_path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(lockfile_path)
            .map_err(|e| Error::io(e, lockfile_path, "reading yarn.lock"))?;
        self.parse_str(&contents, lockfile_path)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default, deserialize_with = "scalar")]
    version: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    cache_key: Option<String>,
}

impl RawMetadata {
    fn into_metadata(self) -> LockfileMetadata {
        let defaults = LockfileMetadata::default();
        LockfileMetadata {
            version: self
                .version
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.version),
            cache_key: self.cache_key,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPackage {
    #[serde(default, deserialize_with = "scalar")]
    version: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    resolution: Option<String>,
    #[serde(default, deserialize_with = "scalar_map")]
    dependencies: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map")]
    peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dependencies_meta: BTreeMap<String, DependencyMeta>,
    #[serde(default)]
    peer_dependencies_meta: BTreeMap<String, PeerDependencyMeta>,
    #[serde(default, deserialize_with = "scalar_map")]
    bin: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "scalar")]
    checksum: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    conditions: Option<String>,
    #[serde(default)]
    language_name: Option<String>,
    #[serde(default)]
    link_type: Option<LinkType>,
}

impl RawPackage {
    fn into_entry(self, key: &str) -> std::result::Result<PackageEntry, String> {
        let resolution = self
            .resolution
            .ok_or_else(|| format!("Package {key} has no resolution"))?;
        let resolution = Locator::parse(&resolution)
            .map_err(|e| format!("Package {key} has an invalid resolution: {e}"))?;
        let version = self
            .version
            .ok_or_else(|| format!("Package {key} has no version"))?;

        let mut entry = PackageEntry::new(resolution, version);
        entry.dependencies = into_descriptors(self.dependencies);
        entry.peer_dependencies = into_descriptors(self.peer_dependencies);
        entry.dependencies_meta = self.dependencies_meta;
        entry.peer_dependencies_meta = self.peer_dependencies_meta;
        entry.bin = self.bin;
        entry.checksum = self.checksum;
        entry.conditions = self.conditions;
        if let Some(language_name) = self.language_name {
            entry.language_name = language_name;
        }
        entry.link_type = self.link_type.unwrap_or_default();
        Ok(entry)
    }
}

fn into_descriptors(deps: BTreeMap<String, String>) -> BTreeMap<Ident, Descriptor> {
    deps.into_iter()
        .map(|(name, range)| {
            let ident = Ident::new(name);
            (ident.clone(), Descriptor::new(ident, range))
        })
        .collect()
}

/// Renders a YAML scalar as the string Yarn wrote; unquoted versions such as
/// `2` or cache keys such as `8` come back from YAML as numbers.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar_to_string))
}

fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOCKFILE: &str = r#"# This file is generated by running "yarn install" inside your project.
# Manual changes might be lost - proceed with caution!

__metadata:
  version: 8
  cacheKey: 10c0

"a@workspace:*, a@workspace:packages/a":
  version: 0.0.0-use.local
  resolution: "a@workspace:packages/a"
  dependencies:
    b: "workspace:*"
    lodash: "npm:^4.17.21"
  languageName: unknown
  linkType: soft

"lodash@npm:^4.17.20, lodash@npm:^4.17.21":
  version: 4.17.21
  resolution: "lodash@npm:4.17.21"
  checksum: 10c0/d8cbea072bb08655bb4c989da418994b073a608dffa608b09ac04b43a791b12aeae7cd7ad919aa4c925f33b48490b5cfe6c1f71d827956071dae2e7bb3a6b74
  languageName: node
  linkType: hard

"@types/node@npm:^20.0.0":
  version: 20.1.0
  resolution: "@types/node@npm:20.1.0"
  bin:
    tsc: bin/tsc
  conditions: os=darwin
  languageName: node
  linkType: hard
"#;

    #[test]
    fn test_parses_metadata_and_entries() {
        let snapshot = YarnBerryLockfileParser
            .parse_str(LOCKFILE, Path::new("yarn.lock"))
            .unwrap();

        assert_eq!(snapshot.metadata.version, 8);
        assert_eq!(snapshot.metadata.cache_key.as_deref(), Some("10c0"));
        assert_eq!(snapshot.resolutions.package_count(), 3);

        let lodash = Locator::parse("lodash@npm:4.17.21").unwrap();
        assert_eq!(snapshot.resolutions.descriptors_for(&lodash).len(), 2);
        let entry = snapshot.resolutions.entry(&lodash).unwrap();
        assert_eq!(entry.version, "4.17.21");
        assert!(entry.checksum.as_deref().unwrap().starts_with("10c0/"));
        assert_eq!(entry.link_type, LinkType::Hard);
    }

    #[test]
    fn test_parses_workspace_entry_dependencies() {
        let snapshot = YarnBerryLockfileParser
            .parse_str(LOCKFILE, Path::new("yarn.lock"))
            .unwrap();

        let a = snapshot
            .resolutions
            .resolve(&Descriptor::parse("a@workspace:*").unwrap())
            .unwrap();
        assert_eq!(a.resolution.reference, "workspace:packages/a");
        assert_eq!(a.link_type, LinkType::Soft);
        assert_eq!(a.language_name, "unknown");
        assert_eq!(a.dependencies[&Ident::new("b")].range, "workspace:*");
    }

    #[test]
    fn test_parses_scoped_entry_with_bin_and_conditions() {
        let snapshot = YarnBerryLockfileParser
            .parse_str(LOCKFILE, Path::new("yarn.lock"))
            .unwrap();

        let types = snapshot
            .resolutions
            .resolve(&Descriptor::parse("@types/node@npm:^20.0.0").unwrap())
            .unwrap();
        assert_eq!(types.bin.get("tsc").map(String::as_str), Some("bin/tsc"));
        assert_eq!(types.conditions.as_deref(), Some("os=darwin"));
    }

    #[test]
    fn test_numeric_scalars_are_stringified() {
        let yaml = r#"
__metadata:
  version: 6
  cacheKey: 8

"x@npm:^2":
  version: 2
  resolution: "x@npm:2"
  linkType: hard
"#;
        let snapshot = YarnBerryLockfileParser
            .parse_str(yaml, Path::new("yarn.lock"))
            .unwrap();

        assert_eq!(snapshot.metadata.version, 6);
        assert_eq!(snapshot.metadata.cache_key.as_deref(), Some("8"));
        let entry = snapshot.resolutions.packages().next().unwrap();
        assert_eq!(entry.version, "2");
    }

    #[test]
    fn test_missing_resolution_is_an_error() {
        let yaml = "\"x@npm:^1.0.0\":\n  version: 1.0.0\n";
        let result = YarnBerryLockfileParser.parse_str(yaml, Path::new("yarn.lock"));

        assert!(matches!(result, Err(Error::LockfileParseFailed { .. })));
    }

    #[test]
    fn test_non_mapping_root_is_an_error() {
        let result = YarnBerryLockfileParser.parse_str("- a\n- b\n", Path::new("yarn.lock"));
        assert!(matches!(result, Err(Error::LockfileParseFailed { .. })));
    }

    #[test]
    fn test_parse_from_file_and_missing_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LOCKFILE.as_bytes()).unwrap();

        let snapshot = YarnBerryLockfileParser.parse(file.path()).unwrap();
        assert_eq!(snapshot.resolutions.package_count(), 3);

        let missing = YarnBerryLockfileParser.parse(Path::new("/nonexistent/yarn.lock"));
        assert!(matches!(missing, Err(Error::LockfileNotFound { .. })));
    }
}
