//! Workspace closure computation.
//!
//! The closure of a target is the set of members reachable from it through
//! hard (`dependencies`, `devDependencies`, `peerDependencies`) workspace
//! edges. It is computed with a worklist so members discovered late still get
//! their own edges followed.

use crate::core::types::{DependencyScope, Ident};
use crate::error::Result;
use crate::graph::ProjectGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Which hard scopes are followed for which members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosurePolicy {
    /// Every member contributes all hard scopes.
    #[default]
    Uniform,
    /// Only the target contributes `devDependencies`; other members
    /// contribute `dependencies` and `peerDependencies`.
    TargetDevOnly,
}

impl ClosurePolicy {
    /// Scopes followed for a member, `is_target` telling whether the member is
    /// the closure's target.
    #[must_use]
    pub fn scopes(self, is_target: bool) -> &'static [DependencyScope] {
        const TRANSITIVE: [DependencyScope; 2] = [
            DependencyScope::Dependencies,
            DependencyScope::PeerDependencies,
        ];
        match self {
            Self::Uniform => &DependencyScope::HARD,
            Self::TargetDevOnly if is_target => &DependencyScope::HARD,
            Self::TargetDevOnly => &TRANSITIVE,
        }
    }

    /// Returns true if `devDependencies` of the member are part of its
    /// closure contribution.
    #[must_use]
    pub fn includes_dev(self, is_target: bool) -> bool {
        self.scopes(is_target)
            .contains(&DependencyScope::DevDependencies)
    }
}

impl fmt::Display for ClosurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => f.write_str("uniform"),
            Self::TargetDevOnly => f.write_str("target-dev-only"),
        }
    }
}

/// Computes the set of members `target` needs, the target included.
///
/// The result does not depend on member order or scope order. A target with
/// only external dependencies yields `{target}`.
///
/// # Example
///
/// ```rust,ignore
/// use lockscope_workspaces::{ClosurePolicy, Ident, compute_closure};
///
/// let closure = compute_closure(&graph, &Ident::new("a"), ClosurePolicy::Uniform)?;
/// assert!(closure.contains(&Ident::new("a")));
/// ```
///
/// # Errors
///
/// Returns [`crate::Error::MemberNotFound`] if the target is not a member.
pub fn compute_closure(
    graph: &ProjectGraph,
    target: &Ident,
    policy: ClosurePolicy,
) -> Result<BTreeSet<Ident>> {
    let target_member = graph.require_member(target)?;

    let mut closure = BTreeSet::from([target_member.ident.clone()]);
    let mut worklist = vec![target_member.ident.clone()];

    while let Some(ident) = worklist.pop() {
        let is_target = &ident == target;
        for &scope in policy.scopes(is_target) {
            for dependency in graph.workspace_dependencies(&ident, scope) {
                if closure.insert(dependency.ident.clone()) {
                    worklist.push(dependency.ident.clone());
                }
            }
        }
    }

    debug!(
        workspace = %target,
        policy = %policy,
        size = closure.len(),
        "Computed workspace closure"
    );
    Ok(closure)
}
