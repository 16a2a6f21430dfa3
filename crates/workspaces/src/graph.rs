//! Workspace dependency graph using petgraph.
//!
//! Nodes are workspace members, edges point from a dependent to the member one
//! of its descriptors designates and are labelled with the declaring scope.
//! The graph is built once per run and never mutated afterwards.

use crate::core::range;
use crate::core::types::{
    DependencyScope, Descriptor, Ident, WORKSPACE_PROTOCOL, Workspace, WorkspaceMember,
};
use crate::error::{Error, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Workspace ranges that accept any version of the designated member.
const WORKSPACE_WILDCARDS: [&str; 3] = ["*", "^", "~"];

/// In-memory view of every member of a monorepo and the workspace edges
/// between them.
#[derive(Debug, Clone)]
pub struct ProjectGraph {
    root: PathBuf,
    graph: DiGraph<WorkspaceMember, DependencyScope>,
    by_ident: HashMap<Ident, NodeIndex>,
    by_path: HashMap<String, NodeIndex>,
}

impl ProjectGraph {
    /// Builds the graph from a discovered workspace.
    ///
    /// Members keep their discovery order. Descriptors that designate another
    /// member (in any scope, optional included) become edges.
    #[must_use]
    pub fn from_workspace(workspace: Workspace) -> Self {
        let mut project = Self {
            root: workspace.root,
            graph: DiGraph::new(),
            by_ident: HashMap::new(),
            by_path: HashMap::new(),
        };

        for member in workspace.members {
            let ident = member.ident.clone();
            let path = member.relative_path();
            let node = project.graph.add_node(member);
            project.by_ident.insert(ident, node);
            project.by_path.insert(path, node);
        }

        let mut edges = Vec::new();
        for from in project.graph.node_indices() {
            let manifest = &project.graph[from].manifest;
            for scope in DependencyScope::ALL {
                for descriptor in manifest.get_for_scope(scope).values() {
                    if let Some(to) = project.node_by_descriptor(descriptor) {
                        edges.push((from, to, scope));
                    }
                }
            }
        }
        for (from, to, scope) in edges {
            project.graph.add_edge(from, to, scope);
        }

        debug!(
            members = project.graph.node_count(),
            edges = project.graph.edge_count(),
            "Built workspace graph"
        );
        project
    }

    /// Monorepo root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Iterates members in discovery order.
    pub fn members(&self) -> impl Iterator<Item = &WorkspaceMember> {
        self.graph.node_weights()
    }

    /// Looks up a member by ident.
    #[must_use]
    pub fn member(&self, ident: &Ident) -> Option<&WorkspaceMember> {
        self.by_ident.get(ident).map(|&node| &self.graph[node])
    }

    /// Looks up a member by ident, failing with [`Error::MemberNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] when no member has that ident.
    pub fn require_member(&self, ident: &Ident) -> Result<&WorkspaceMember> {
        self.member(ident).ok_or_else(|| Error::MemberNotFound {
            name: ident.to_string(),
            workspace_root: self.root.clone(),
        })
    }

    /// Returns the member a descriptor designates, if any.
    ///
    /// - `workspace:<path>` matches the member at that relative path.
    /// - `workspace:*`, `workspace:^`, `workspace:~` match the member with the
    ///   same ident; `workspace:<range>` additionally requires its version to
    ///   satisfy the range.
    /// - A plain semver range on a member's ident matches when the member's
    ///   version satisfies it.
    #[must_use]
    pub fn member_by_descriptor(&self, descriptor: &Descriptor) -> Option<&WorkspaceMember> {
        self.node_by_descriptor(descriptor).map(|node| &self.graph[node])
    }

    /// Members that `ident` depends on through `scope`, sorted by ident.
    #[must_use]
    pub fn workspace_dependencies(
        &self,
        ident: &Ident,
        scope: DependencyScope,
    ) -> Vec<&WorkspaceMember> {
        let Some(&node) = self.by_ident.get(ident) else {
            return Vec::new();
        };

        let mut deps: Vec<&WorkspaceMember> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter(|edge| *edge.weight() == scope)
            .map(|edge| &self.graph[edge.target()])
            .collect();
        deps.sort_by(|a, b| a.ident.cmp(&b.ident));
        deps.dedup_by(|a, b| a.ident == b.ident);
        deps
    }

    fn node_by_descriptor(&self, descriptor: &Descriptor) -> Option<NodeIndex> {
        if let Some(selector) = descriptor.range.strip_prefix(WORKSPACE_PROTOCOL) {
            if WORKSPACE_WILDCARDS.contains(&selector) {
                return self.by_ident.get(&descriptor.ident).copied();
            }
            if range::is_valid_range(selector) {
                return self
                    .by_ident
                    .get(&descriptor.ident)
                    .copied()
                    .filter(|&node| range::satisfies(selector, self.graph[node].version()));
            }

            let path = selector.trim_start_matches("./").trim_end_matches('/');
            let path = if path.is_empty() { "." } else { path };
            return self.by_path.get(path).copied();
        }

        if !matches!(descriptor.protocol(), None | Some("npm")) {
            return None;
        }
        let selector = descriptor.npm_range();
        self.by_ident
            .get(&descriptor.ident)
            .copied()
            .filter(|&node| range::satisfies(selector, self.graph[node].version()))
    }
}
