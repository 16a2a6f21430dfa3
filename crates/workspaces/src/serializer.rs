//! Yarn Berry lockfile serializer.
//!
//! Emits one block per locator, keyed by the sorted descriptors that resolve
//! to it. Fields follow Yarn's priority order (`version`, `resolution`,
//! `dependencies`, `peerDependencies`, `dependenciesMeta`,
//! `peerDependenciesMeta`) and then alphabetical order. Output is a pure
//! function of the view: serializing an unchanged view is byte-identical.

use crate::core::types::{DependencyMeta, Descriptor, Locator, PackageEntry, ScopedLockfile};
use std::collections::BTreeMap;

const HEADER: &str = "# This file is generated by running \"yarn install\" inside your project.\n\
# Manual changes might be lost - proceed with caution!\n\n";

/// Characters a plain scalar may not start with.
const LEADING_INDICATORS: &[char] = &[
    '-', '?', ':', ',', ']', '[', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
    ' ', '\t', '\r', '\n',
];

/// Characters a plain scalar may not contain after its first character.
const INNER_INDICATORS: &[char] = &[',', ']', '[', '{', '}', ':', '#', '\r', '\n'];

/// Renders a scoped view as `yarn.lock` text.
///
/// # Example
///
/// ```rust,ignore
/// let text = lockscope_workspaces::serialize(&view);
/// assert!(text.contains("__metadata:"));
/// ```
#[must_use]
pub fn serialize(view: &ScopedLockfile) -> String {
    let mut out = String::from(HEADER);

    out.push_str("__metadata:\n");
    out.push_str(&format!("  version: {}\n", view.metadata.version));
    if let Some(cache_key) = &view.metadata.cache_key {
        field(&mut out, 1, "cacheKey", cache_key);
    }

    let mut keys: BTreeMap<&Locator, Vec<String>> = BTreeMap::new();
    for (descriptor, locator) in view.resolutions.resolutions() {
        keys.entry(locator).or_default().push(descriptor.to_string());
    }

    let mut blocks: BTreeMap<String, &PackageEntry> = BTreeMap::new();
    for entry in view.resolutions.packages() {
        let Some(descriptors) = keys.get_mut(&entry.resolution) else {
            continue;
        };
        descriptors.sort();
        descriptors.dedup();
        blocks.insert(descriptors.join(", "), entry);
    }

    for (key, entry) in blocks {
        out.push('\n');
        out.push_str(&format!("{}:\n", scalar(&key)));
        write_entry(&mut out, entry);
    }

    out
}

fn write_entry(out: &mut String, entry: &PackageEntry) {
    field(out, 1, "version", &entry.version);
    field(out, 1, "resolution", &entry.resolution.to_string());
    descriptor_map(out, "dependencies", entry.dependencies.values());
    descriptor_map(out, "peerDependencies", entry.peer_dependencies.values());

    if !entry.dependencies_meta.is_empty() {
        out.push_str("  dependenciesMeta:\n");
        for (name, meta) in &entry.dependencies_meta {
            flags(out, name, &dependency_meta_flags(meta));
        }
    }
    if !entry.peer_dependencies_meta.is_empty() {
        out.push_str("  peerDependenciesMeta:\n");
        for (name, meta) in &entry.peer_dependencies_meta {
            flags(out, name, &[("optional", meta.optional)]);
        }
    }

    if !entry.bin.is_empty() {
        out.push_str("  bin:\n");
        for (name, path) in &entry.bin {
            field(out, 2, name, path);
        }
    }
    if let Some(checksum) = &entry.checksum {
        field(out, 1, "checksum", checksum);
    }
    if let Some(conditions) = &entry.conditions {
        field(out, 1, "conditions", conditions);
    }
    field(out, 1, "languageName", &entry.language_name);
    field(out, 1, "linkType", &entry.link_type.to_string());
}

fn descriptor_map<'a>(
    out: &mut String,
    name: &str,
    descriptors: impl Iterator<Item = &'a Descriptor>,
) {
    let mut descriptors = descriptors.peekable();
    if descriptors.peek().is_none() {
        return;
    }
    out.push_str(&format!("  {name}:\n"));
    for descriptor in descriptors {
        field(out, 2, descriptor.ident.as_str(), &descriptor.range);
    }
}

fn dependency_meta_flags(meta: &DependencyMeta) -> [(&'static str, Option<bool>); 3] {
    [
        ("built", meta.built),
        ("optional", meta.optional),
        ("unplugged", meta.unplugged),
    ]
}

fn flags(out: &mut String, name: &str, flags: &[(&str, Option<bool>)]) {
    let set: Vec<(&str, bool)> = flags
        .iter()
        .filter_map(|(key, value)| value.map(|v| (*key, v)))
        .collect();
    if set.is_empty() {
        return;
    }
    out.push_str(&format!("    {}:\n", scalar(name)));
    for (key, value) in set {
        out.push_str(&format!("      {key}: {value}\n"));
    }
}

fn field(out: &mut String, depth: usize, key: &str, value: &str) {
    out.push_str(&format!(
        "{}{}: {}\n",
        "  ".repeat(depth),
        scalar(key),
        scalar(value)
    ));
}

/// Returns `value` as-is when it is a plain YAML scalar, JSON-quoted otherwise.
fn scalar(value: &str) -> String {
    if is_plain(value) {
        value.to_string()
    } else {
        serde_json::Value::String(value.to_string()).to_string()
    }
}

fn is_plain(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if LEADING_INDICATORS.contains(&first) {
        return false;
    }
    let rest = chars.as_str();
    !rest.contains(INNER_INDICATORS) && !rest.ends_with([' ', '\t'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Ident, LinkType, LockfileMetadata, PeerDependencyMeta, ResolutionMap};
    use crate::parsers::YarnBerryLockfileParser;
    use std::path::Path;

    fn view() -> ScopedLockfile {
        let mut map = ResolutionMap::new();

        let self_locator = Locator::parse("a@workspace:.").unwrap();
        let mut a = PackageEntry::new(self_locator.clone(), "1.0.0");
        a.language_name = "unknown".to_string();
        a.link_type = LinkType::Soft;
        for (name, range) in [("b", "workspace:*"), ("@scope/lib", "npm:^2.0.0")] {
            let ident = Ident::new(name);
            a.dependencies
                .insert(ident.clone(), Descriptor::new(ident, range));
        }
        let react = Ident::new("react");
        a.peer_dependencies
            .insert(react.clone(), Descriptor::new(react, "npm:>=18"));
        a.peer_dependencies_meta.insert(
            "react".to_string(),
            PeerDependencyMeta {
                optional: Some(true),
            },
        );
        a.dependencies_meta.insert(
            "@scope/lib".to_string(),
            DependencyMeta {
                built: Some(false),
                ..DependencyMeta::default()
            },
        );
        map.insert(Descriptor::parse("a@workspace:.").unwrap(), a);

        let b_locator = Locator::parse("b@workspace:packages/b").unwrap();
        let mut b = PackageEntry::new(b_locator.clone(), "0.0.0-use.local");
        b.language_name = "unknown".to_string();
        b.link_type = LinkType::Soft;
        map.insert(Descriptor::parse("b@workspace:*").unwrap(), b);
        map.alias(Descriptor::parse("b@workspace:packages/b").unwrap(), b_locator);

        let lib_locator = Locator::parse("@scope/lib@npm:2.3.1").unwrap();
        let mut lib = PackageEntry::new(lib_locator, "2.3.1");
        lib.checksum = Some("10c0/deadbeef".to_string());
        lib.bin.insert("lib".to_string(), "bin/lib.js".to_string());
        map.insert(Descriptor::parse("@scope/lib@npm:^2.0.0").unwrap(), lib);

        ScopedLockfile {
            metadata: LockfileMetadata::default(),
            resolutions: map,
            self_locator,
        }
    }

    #[test]
    fn test_golden_output() {
        let expected = r#"# This file is generated by running "yarn install" inside your project.
# Manual changes might be lost - proceed with caution!

__metadata:
  version: 8
  cacheKey: 10c0

"@scope/lib@npm:^2.0.0":
  version: 2.3.1
  resolution: "@scope/lib@npm:2.3.1"
  bin:
    lib: bin/lib.js
  checksum: 10c0/deadbeef
  languageName: node
  linkType: hard

"a@workspace:.":
  version: 1.0.0
  resolution: "a@workspace:."
  dependencies:
    "@scope/lib": "npm:^2.0.0"
    b: "workspace:*"
  peerDependencies:
    react: "npm:>=18"
  dependenciesMeta:
    "@scope/lib":
      built: false
  peerDependenciesMeta:
    react:
      optional: true
  languageName: unknown
  linkType: soft

"b@workspace:*, b@workspace:packages/b":
  version: 0.0.0-use.local
  resolution: "b@workspace:packages/b"
  languageName: unknown
  linkType: soft
"#;
        assert_eq!(serialize(&view()), expected);
    }

    #[test]
    fn test_output_is_stable() {
        let view = view();
        assert_eq!(serialize(&view), serialize(&view.clone()));
    }

    #[test]
    fn test_output_parses_back() {
        let text = serialize(&view());
        let snapshot = YarnBerryLockfileParser
            .parse_str(&text, Path::new("yarn.lock-workspace"))
            .unwrap();

        assert_eq!(snapshot.resolutions, view().resolutions);
    }

    #[test]
    fn test_plain_scalar_rules() {
        assert!(is_plain("4.17.21"));
        assert!(is_plain("10c0/abc+def="));
        assert!(is_plain("os=darwin & cpu=arm64"));
        assert!(is_plain("^1.0.0"));
        assert!(!is_plain(""));
        assert!(!is_plain("@babel/core"));
        assert!(!is_plain("npm:1.0.0"));
        assert!(!is_plain("a, b"));
        assert!(!is_plain("-dash"));
        assert!(!is_plain("trailing "));
        assert_eq!(scalar("say \"hi\""), r#""say \"hi\"""#);
    }

    #[test]
    fn test_locator_without_descriptor_is_omitted() {
        let mut view = view();
        let orphan = Locator::parse("orphan@npm:1.0.0").unwrap();
        view.resolutions
            .insert_package(PackageEntry::new(orphan, "1.0.0"));

        assert!(!serialize(&view).contains("orphan"));
    }
}
