//! Lockfile scope extraction.
//!
//! Reduces a closure's [`ResolutionMap`] to the packages reachable from the
//! closure members and rewrites the target's own locator to the
//! path-independent `workspace:.` form, keeping the descriptor that produced
//! it in step.

use crate::core::types::{
    Descriptor, Ident, Locator, LockfileMetadata, ResolutionMap, SELF_REFERENCE, ScopedLockfile,
};
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Builds the scoped view of `resolutions` for `target`.
///
/// Only locators reachable from the closure members' workspace locators
/// through entry dependencies are kept, together with the compat patch
/// entries of every descriptor followed. Registry locators and the other
/// members' locators pass through unchanged. Applying this to an already
/// normalised view returns it unchanged.
///
/// # Errors
///
/// Returns [`Error::InvariantViolation`] if the target or another closure
/// member has no workspace locator in `resolutions`.
pub fn extract_scope(
    closure: &BTreeSet<Ident>,
    resolutions: &ResolutionMap,
    target: &Ident,
    metadata: LockfileMetadata,
) -> Result<ScopedLockfile> {
    let target_locator = workspace_locator(resolutions, target)?;

    let mut roots = Vec::with_capacity(closure.len());
    for ident in closure {
        roots.push(workspace_locator(resolutions, ident)?);
    }

    let keep = reachable(resolutions, roots);
    let mut scoped = resolutions.clone();
    scoped.retain_packages(&keep);
    debug!(
        workspace = %target,
        kept = keep.len(),
        dropped = resolutions.package_count().saturating_sub(keep.len()),
        "Pruned resolutions to closure"
    );

    let self_locator = rewrite_self_reference(&mut scoped, &target_locator)?;

    Ok(ScopedLockfile {
        metadata,
        resolutions: scoped,
        self_locator,
    })
}

fn workspace_locator(resolutions: &ResolutionMap, ident: &Ident) -> Result<Locator> {
    resolutions
        .find_package(|locator| &locator.ident == ident && locator.is_workspace())
        .map(|entry| entry.resolution.clone())
        .ok_or_else(|| Error::InvariantViolation {
            message: format!("workspace {ident} has no resolution after a successful resolve"),
        })
}

fn reachable(resolutions: &ResolutionMap, roots: Vec<Locator>) -> BTreeSet<Locator> {
    let mut keep: BTreeSet<Locator> = roots.iter().cloned().collect();
    let mut worklist = roots;

    while let Some(locator) = worklist.pop() {
        let Some(entry) = resolutions.entry(&locator) else {
            continue;
        };
        for descriptor in entry.dependencies.values() {
            let Some(dependency) = resolutions.locator_for(descriptor) else {
                trace!(descriptor = %descriptor, from = %locator, "Unresolved dependency");
                continue;
            };
            let patches = resolutions.builtin_patches_of(descriptor).map(|(_, l)| l);
            for dependency in std::iter::once(dependency).chain(patches) {
                if keep.insert(dependency.clone()) {
                    worklist.push(dependency.clone());
                }
            }
        }
    }

    keep
}

/// Rewrites `old` to `<ident>@workspace:.` and returns the new locator.
///
/// The descriptor whose range equals the old reference becomes
/// `<ident>@workspace:.`, as do dependency descriptors in other entries that
/// used that range. Every other descriptor resolving to `old` is re-pointed at
/// the new locator.
fn rewrite_self_reference(scoped: &mut ResolutionMap, old: &Locator) -> Result<Locator> {
    if !old.is_workspace() || old.is_self_reference() {
        return Ok(old.clone());
    }

    let new = Locator::new(old.ident.clone(), SELF_REFERENCE);
    let descriptors: Vec<Descriptor> = scoped.descriptors_for(old).into_iter().cloned().collect();
    let mut entry = scoped
        .remove_package(old)
        .ok_or_else(|| Error::InvariantViolation {
            message: format!("target locator {old} vanished while scoping"),
        })?;
    entry.resolution = new.clone();
    scoped.insert_package(entry);

    for descriptor in descriptors {
        if descriptor.range == old.reference {
            scoped.alias(Descriptor::new(old.ident.clone(), SELF_REFERENCE), new.clone());
        } else {
            scoped.alias(descriptor, new.clone());
        }
    }

    for entry in scoped.packages_mut() {
        if let Some(dependency) = entry.dependencies.get_mut(&old.ident)
            && dependency.range == old.reference
        {
            dependency.range = SELF_REFERENCE.to_string();
        }
    }

    debug!(from = %old, to = %new, "Rewrote self reference");
    Ok(new)
}
