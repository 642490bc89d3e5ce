use crate::graph::{EdgeKind, EntrypointCause, GcGraph, NodeIdx};
use crate::passes::activeness::{Activeness, ActivenessInfo};
use crate::passes::mark_live::Liveness;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use scenegc_scene::{NodeId, NodeKind, TypeTag};
use serde::Serialize;
use std::fmt;

/// A problem that was recovered from. None of these abort a run.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No plugin is registered for the type or any of its supertypes. The node was kept.
    UnregisteredType { node: NodeId, ty: TypeTag },
    /// The type resolves to several plugins at the same distance. The node was kept.
    AmbiguousPluginResolution {
        node: NodeId,
        ty: TypeTag,
        candidates: Vec<TypeTag>,
    },
    /// The plugin returned an error. The node was kept.
    PluginCallbackFailure {
        node: NodeId,
        ty: TypeTag,
        error: String,
    },
    /// A plugin declared an edge or mutation involving a node that is not in the scene.
    DanglingDeclaration { node: NodeId, target: NodeId },
    /// The parent of a node is not in the scene.
    UnresolvedParent { node: NodeId, parent: NodeId },
    /// The scene refused to remove a dead node.
    RemovalFailed { node: NodeId, error: String },
    /// An external reference pointed at a node that was removed.
    DanglingReferenceAfterPrune {
        holder: NodeId,
        node: NodeId,
        property: Option<String>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnregisteredType { node, ty } => {
                write!(f, "no plugin for type {} of node {}", ty, node)
            }
            Diagnostic::AmbiguousPluginResolution {
                node,
                ty,
                candidates,
            } => {
                write!(f, "type {} of node {} resolves to ", ty, node)?;
                for (i, candidate) in candidates.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", candidate)?;
                }
                Ok(())
            }
            Diagnostic::PluginCallbackFailure { node, ty, error } => {
                write!(f, "plugin for {} failed on node {}: {}", ty, node, error)
            }
            Diagnostic::DanglingDeclaration { node, target } => {
                write!(f, "node {} declared a dependency on missing node {}", node, target)
            }
            Diagnostic::UnresolvedParent { node, parent } => {
                write!(f, "node {} refers to missing parent {}", node, parent)
            }
            Diagnostic::RemovalFailed { node, error } => {
                write!(f, "could not remove node {}: {}", node, error)
            }
            Diagnostic::DanglingReferenceAfterPrune {
                holder,
                node,
                property,
            } => {
                write!(f, "{} refers to removed node {}", holder, node)?;
                if let Some(property) = property {
                    write!(f, " through {}", property)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EdgeSummary {
    pub node: NodeId,
    pub kind: EdgeKind,
    pub flags: Vec<&'static str>,
    /// Whether the node on the other end is live.
    pub live: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PrunedNode {
    pub node: NodeId,
    pub ty: TypeTag,
    pub kind: NodeKind,
    pub activeness: Activeness,
    pub entrypoint: Option<EntrypointCause>,
    pub dependencies: Vec<EdgeSummary>,
    pub dependents: Vec<EdgeSummary>,
}

/// Explains every node the collector wants to remove.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct GcReport {
    pub kept: usize,
    pub pruned: Vec<PrunedNode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GcReport {
    pub fn build(
        graph: &GcGraph,
        activeness: &ActivenessInfo,
        liveness: &Liveness,
        diagnostics: &[Diagnostic],
    ) -> GcReport {
        let summarize = |idx: NodeIdx, direction: Direction| {
            graph
                .edges_directed(idx, direction)
                .map(|edge| {
                    let other = match direction {
                        Direction::Outgoing => edge.target(),
                        Direction::Incoming => edge.source(),
                    };
                    let node = graph[other].id;
                    EdgeSummary {
                        node,
                        kind: edge.weight().kind,
                        flags: edge.weight().flags.names(),
                        live: liveness.is_live(node),
                    }
                })
                .collect::<Vec<_>>()
        };

        let mut pruned = Vec::new();
        let mut kept = 0;
        for idx in graph.node_indices() {
            let node = &graph[idx];
            if !liveness.is_dead(node.id) {
                kept += 1;
                continue;
            }
            pruned.push(PrunedNode {
                node: node.id,
                ty: node.ty.clone(),
                kind: node.kind,
                activeness: activeness.get(idx),
                entrypoint: node.entrypoint.clone(),
                dependencies: summarize(idx, Direction::Outgoing),
                dependents: summarize(idx, Direction::Incoming),
            });
        }
        pruned.sort_by_key(|node| node.node);

        GcReport {
            kept,
            pruned,
            diagnostics: diagnostics.to_vec(),
        }
    }

    pub fn pruned_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pruned.iter().map(|node| node.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_serialization() {
        let diagnostic = Diagnostic::DanglingReferenceAfterPrune {
            holder: NodeId(3),
            node: NodeId(8),
            property: Some("m_IsActive".to_string()),
        };
        assert_eq!(
            diagnostic.to_string(),
            "3 refers to removed node 8 through m_IsActive"
        );
        assert_eq!(
            serde_json::to_value(&diagnostic).unwrap(),
            serde_json::json!({
                "kind": "dangling_reference_after_prune",
                "holder": 3,
                "node": 8,
                "property": "m_IsActive",
            })
        );
    }
}
