//! Removes dead nodes from the scene and records what happened to every node so that references
//! held outside of the scene can be rewritten.

use crate::passes::mark_live::Liveness;
use crate::report::Diagnostic;
use indexmap::IndexMap;
use scenegc_scene::{NodeId, Scene};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MappedObject {
    Kept(NodeId),
    Removed,
}

/// What became of every node that was in the scene before sweeping.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct ObjectMapping {
    entries: IndexMap<NodeId, MappedObject>,
}

impl ObjectMapping {
    pub fn get(&self, node: NodeId) -> Option<MappedObject> {
        self.entries.get(&node).copied()
    }

    /// Returns the new id of `node`, or None if it was removed. Ids the mapping does not know are
    /// returned unchanged.
    pub fn resolve(&self, node: NodeId) -> Option<NodeId> {
        match self.entries.get(&node) {
            Some(MappedObject::Kept(new)) => Some(*new),
            Some(MappedObject::Removed) => None,
            None => Some(node),
        }
    }

    /// Remaps an animation binding of `property` on `node`.
    pub fn map_property(&self, node: NodeId, property: &str) -> Option<(NodeId, String)> {
        self.resolve(node).map(|new| (new, property.to_string()))
    }

    pub fn removed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries
            .iter()
            .filter(|(_, mapped)| **mapped == MappedObject::Removed)
            .map(|(&id, _)| id)
    }

    pub fn removed_count(&self) -> usize {
        self.removed().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Points every reference at the node's new id. References to removed nodes are nulled and
    /// reported.
    pub fn rewrite_references(
        &self,
        references: &[ExternalReference],
    ) -> (Vec<ExternalReference>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let rewritten = references
            .iter()
            .map(|reference| {
                let target = reference.target.and_then(|target| {
                    let resolved = self.resolve(target);
                    if resolved.is_none() {
                        warn!(
                            "Reference held by {} points to removed node {}",
                            reference.holder, target
                        );
                        diagnostics.push(Diagnostic::DanglingReferenceAfterPrune {
                            holder: reference.holder,
                            node: target,
                            property: reference.property.clone(),
                        });
                    }
                    resolved
                });
                ExternalReference {
                    holder: reference.holder,
                    target,
                    property: reference.property.clone(),
                }
            })
            .collect();
        (rewritten, diagnostics)
    }
}

/// A reference to a scene node held by something outside of the scene, such as an animation clip
/// binding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub holder: NodeId,
    pub target: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

/// Removes every analyzed node that is dead, children before parents.
///
/// Nodes the liveness map does not know about are kept. A node the scene refuses to remove is
/// kept and reported.
pub fn sweep<S: Scene + ?Sized>(scene: &mut S, liveness: &Liveness) -> (ObjectMapping, Vec<Diagnostic>) {
    let mut entries: IndexMap<NodeId, MappedObject> = scene
        .node_ids()
        .into_iter()
        .map(|id| (id, MappedObject::Kept(id)))
        .collect();

    let mut dead: Vec<(usize, NodeId)> = entries
        .keys()
        .filter(|&&id| liveness.is_dead(id))
        .map(|&id| (scene.depth(id), id))
        .collect();
    dead.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut diagnostics = Vec::new();
    for (_, id) in dead {
        match scene.remove_node(id) {
            Ok(()) => {
                trace!("Removed node {}", id);
                entries.insert(id, MappedObject::Removed);
            }
            Err(err) => {
                warn!("Could not remove dead node {}: {}", id, err);
                diagnostics.push(Diagnostic::RemovalFailed {
                    node: id,
                    error: err.to_string(),
                });
            }
        }
    }

    (ObjectMapping { entries }, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_and_rewrite() {
        let mut mapping = ObjectMapping::default();
        mapping.entries.insert(NodeId(1), MappedObject::Kept(NodeId(1)));
        mapping.entries.insert(NodeId(2), MappedObject::Removed);

        assert_eq!(mapping.resolve(NodeId(1)), Some(NodeId(1)));
        assert_eq!(mapping.resolve(NodeId(2)), None);
        assert_eq!(mapping.resolve(NodeId(9)), Some(NodeId(9)));
        assert_eq!(
            mapping.map_property(NodeId(1), "m_Enabled"),
            Some((NodeId(1), "m_Enabled".to_string()))
        );
        assert_eq!(mapping.map_property(NodeId(2), "m_Enabled"), None);

        let references = [
            ExternalReference {
                holder: NodeId(5),
                target: Some(NodeId(1)),
                property: None,
            },
            ExternalReference {
                holder: NodeId(5),
                target: Some(NodeId(2)),
                property: Some("m_IsActive".to_string()),
            },
            ExternalReference {
                holder: NodeId(6),
                target: None,
                property: None,
            },
        ];
        let (rewritten, diagnostics) = mapping.rewrite_references(&references);
        assert_eq!(rewritten[0], references[0]);
        assert_eq!(rewritten[1].target, None);
        assert_eq!(rewritten[2], references[2]);
        assert_eq!(
            diagnostics,
            [Diagnostic::DanglingReferenceAfterPrune {
                holder: NodeId(5),
                node: NodeId(2),
                property: Some("m_IsActive".to_string()),
            }]
        );
    }
}
