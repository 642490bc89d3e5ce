use crate::{FieldValue, NodeId, NodeKind, Scene, SceneError, TypeTag};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

fn default_enabled() -> bool {
    true
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct SceneNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub ty: TypeTag,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, FieldValue>,
}

#[derive(Serialize, Deserialize, Default)]
struct SceneFile {
    #[serde(default)]
    nodes: Vec<SceneNode>,
}

/// An in-memory scene snapshot.
///
/// Nodes keep their insertion order, parents are always inserted before their children.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
#[serde(try_from = "SceneFile", into = "SceneFile")]
pub struct MemoryScene {
    nodes: IndexMap<NodeId, SceneNode>,
    children: FxHashMap<NodeId, SmallVec<[NodeId; 4]>>,
    next_id: u64,
}

impl MemoryScene {
    pub fn new() -> MemoryScene {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children
            .get(&node)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// Inserts a fully described node. Its parent must already be part of the scene.
    pub fn insert(&mut self, node: SceneNode) -> Result<NodeId, SceneError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(SceneError::DuplicateNode(id));
        }
        if let Some(parent) = node.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(SceneError::MissingParent { node: id, parent });
            }
            self.children.entry(parent).or_default().push(id);
        }
        self.next_id = self.next_id.max(u64::from(id.0) + 1);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Adds a node with a freshly allocated id.
    pub fn add_node(
        &mut self,
        ty: impl Into<TypeTag>,
        kind: NodeKind,
        parent: Option<NodeId>,
    ) -> Result<NodeId, SceneError> {
        let id = u32::try_from(self.next_id).map_err(|_| SceneError::IdsExhausted)?;
        self.insert(SceneNode {
            id: NodeId(id),
            ty: ty.into(),
            kind,
            parent,
            enabled: true,
            fields: IndexMap::new(),
        })
    }

    pub fn set_enabled(&mut self, node: NodeId, enabled: bool) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&node)
            .ok_or(SceneError::NodeNotFound(node))?;
        node.enabled = enabled;
        Ok(())
    }

    pub fn set_field(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: FieldValue,
    ) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&node)
            .ok_or(SceneError::NodeNotFound(node))?;
        node.fields.insert(name.into(), value);
        Ok(())
    }
}

impl Scene for MemoryScene {
    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn node_type(&self, node: NodeId) -> Option<&TypeTag> {
        self.nodes.get(&node).map(|n| &n.ty)
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn is_enabled(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.enabled)
    }

    fn field(&self, node: NodeId, name: &str) -> Option<&FieldValue> {
        self.nodes.get(&node).and_then(|n| n.fields.get(name))
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), SceneError> {
        if !self.children(node).is_empty() {
            return Err(SceneError::HasChildren(node));
        }
        let removed = self
            .nodes
            .shift_remove(&node)
            .ok_or(SceneError::NodeNotFound(node))?;
        if let Some(parent) = removed.parent
            && let Some(siblings) = self.children.get_mut(&parent)
        {
            siblings.retain(|&mut child| child != node);
        }
        self.children.remove(&node);
        trace!("Removed node {} ({})", node, removed.ty);
        Ok(())
    }
}

impl TryFrom<SceneFile> for MemoryScene {
    type Error = SceneError;

    fn try_from(file: SceneFile) -> Result<MemoryScene, SceneError> {
        let mut pending: IndexMap<NodeId, SceneNode> = IndexMap::with_capacity(file.nodes.len());
        for node in file.nodes {
            let id = node.id;
            if pending.insert(id, node).is_some() {
                return Err(SceneError::DuplicateNode(id));
            }
        }

        // Parents may be listed after their children in the file, so insert in hierarchy order.
        let mut scene = MemoryScene::new();
        let mut on_path = FxHashSet::default();
        let ids: Vec<NodeId> = pending.keys().copied().collect();
        for id in ids {
            let mut path = Vec::new();
            let mut current = Some(id);
            while let Some(node) = current {
                if scene.contains(node) {
                    break;
                }
                let Some(data) = pending.get(&node) else {
                    let child = path.last().copied().unwrap_or(id);
                    return Err(SceneError::MissingParent {
                        node: child,
                        parent: node,
                    });
                };
                if !on_path.insert(node) {
                    return Err(SceneError::HierarchyCycle(node));
                }
                path.push(node);
                current = data.parent;
            }
            for node in path.into_iter().rev() {
                on_path.remove(&node);
                if let Some(data) = pending.swap_remove(&node) {
                    scene.insert(data)?;
                }
            }
        }
        Ok(scene)
    }
}

impl From<MemoryScene> for SceneFile {
    fn from(scene: MemoryScene) -> SceneFile {
        SceneFile {
            nodes: scene.nodes.into_values().collect(),
        }
    }
}
