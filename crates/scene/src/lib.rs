mod animation;
mod memory;

pub use animation::{AnimatedProperties, AnimatedProperty, AnimationIndex};
pub use memory::{MemoryScene, SceneNode};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Property toggled by animations to activate or deactivate a transform.
pub const IS_ACTIVE_PROPERTY: &str = "m_IsActive";
/// Property toggled by animations to enable or disable a component.
pub const ENABLED_PROPERTY: &str = "m_Enabled";

/// Stable identity of a node in the host scene.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug, Hash)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The runtime type of a node, e.g. `Transform` or `SkinnedMeshRenderer`.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Debug, Hash)]
#[serde(transparent)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub const fn from_static(name: &'static str) -> TypeTag {
        TypeTag(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> TypeTag {
        TypeTag(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeTag {
    fn from(name: &'static str) -> TypeTag {
        TypeTag::from_static(name)
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A hierarchy element. Its enabled flag is the object's active flag.
    Transform,
    /// A behaviour attached to a transform.
    Component,
}

impl NodeKind {
    /// The property path an animation writes to toggle a node of this kind.
    pub const fn enabled_property(self) -> &'static str {
        match self {
            NodeKind::Transform => IS_ACTIVE_PROPERTY,
            NodeKind::Component => ENABLED_PROPERTY,
        }
    }
}

/// A serialized field of a node. References to other nodes may be missing (`None`), which is how
/// hosts represent a reference to a destroyed object.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Ref(Option<NodeId>),
    Refs(Vec<Option<NodeId>>),
}

impl FieldValue {
    /// Returns every node referenced by this field, skipping missing references.
    pub fn node_refs(&self) -> impl Iterator<Item = NodeId> + '_ {
        let (single, many): (Option<NodeId>, &[Option<NodeId>]) = match self {
            FieldValue::Ref(node) => (*node, &[]),
            FieldValue::Refs(nodes) => (None, nodes),
            _ => (None, &[]),
        };
        single.into_iter().chain(many.iter().flatten().copied())
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldValue::Ref(_) | FieldValue::Refs(_))
    }

    /// A short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::Ref(_) => "ref",
            FieldValue::Refs(_) => "refs",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("node {0} exists more than once")]
    DuplicateNode(NodeId),

    #[error("node {node} refers to missing parent {parent}")]
    MissingParent { node: NodeId, parent: NodeId },

    #[error("node {0} is part of a parent cycle")]
    HierarchyCycle(NodeId),

    #[error("node {0} still has children")]
    HasChildren(NodeId),

    #[error("no node ids left to allocate")]
    IdsExhausted,
}

/// Access to the host scene graph.
///
/// The analysis only ever reads through this trait, except for [`Scene::remove_node`] which is
/// called by the pruning step once the analysis has finished.
pub trait Scene {
    /// Returns the ids of every node currently in the scene, in a stable order.
    fn node_ids(&self) -> Vec<NodeId>;

    fn node_count(&self) -> usize {
        self.node_ids().len()
    }

    fn contains(&self, node: NodeId) -> bool;

    /// Returns the runtime type of `node`, or None if it does not exist.
    fn node_type(&self, node: NodeId) -> Option<&TypeTag>;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Returns the parent of `node`. Components return the transform they are attached to.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Returns the node's own enabled flag, regardless of its ancestors.
    fn is_enabled(&self, node: NodeId) -> bool;

    /// Returns a serialized field of `node` by name.
    fn field(&self, node: NodeId, name: &str) -> Option<&FieldValue>;

    /// Destroys `node`. Nodes must be removed after all of their children.
    fn remove_node(&mut self, node: NodeId) -> Result<(), SceneError>;

    /// Returns true if `node` and all of its ancestors are enabled. Nodes on a parent cycle are
    /// never active.
    fn is_active_in_hierarchy(&self, node: NodeId) -> bool {
        let mut steps = self.node_count();
        let mut current = Some(node);
        while let Some(node) = current {
            if steps == 0 || !self.contains(node) || !self.is_enabled(node) {
                return false;
            }
            steps -= 1;
            current = self.parent(node);
        }
        true
    }

    /// Number of ancestors of `node`. Stops counting at the node count if the parents form a
    /// cycle.
    fn depth(&self, node: NodeId) -> usize {
        let limit = self.node_count();
        let mut depth = 0;
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if depth == limit {
                break;
            }
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_node_refs_skip_missing() {
        let refs = FieldValue::Refs(vec![Some(NodeId(1)), None, Some(NodeId(4))]);
        assert_eq!(refs.node_refs().collect::<Vec<_>>(), [NodeId(1), NodeId(4)]);

        let single = FieldValue::Ref(Some(NodeId(7)));
        assert_eq!(single.node_refs().collect::<Vec<_>>(), [NodeId(7)]);

        assert_eq!(FieldValue::Bool(true).node_refs().count(), 0);
        assert_eq!(FieldValue::Ref(None).node_refs().count(), 0);
    }

    #[test]
    fn enabled_property_by_kind() {
        assert_eq!(NodeKind::Transform.enabled_property(), "m_IsActive");
        assert_eq!(NodeKind::Component.enabled_property(), "m_Enabled");
    }

    /// Two transforms that are each other's parent.
    struct Loop {
        ids: [NodeId; 2],
    }

    impl Scene for Loop {
        fn node_ids(&self) -> Vec<NodeId> {
            self.ids.to_vec()
        }

        fn contains(&self, node: NodeId) -> bool {
            self.ids.contains(&node)
        }

        fn node_type(&self, _: NodeId) -> Option<&TypeTag> {
            None
        }

        fn kind(&self, _: NodeId) -> Option<NodeKind> {
            Some(NodeKind::Transform)
        }

        fn parent(&self, node: NodeId) -> Option<NodeId> {
            self.ids.iter().copied().find(|&other| other != node)
        }

        fn is_enabled(&self, _: NodeId) -> bool {
            true
        }

        fn field(&self, _: NodeId, _: &str) -> Option<&FieldValue> {
            None
        }

        fn remove_node(&mut self, node: NodeId) -> Result<(), SceneError> {
            Err(SceneError::HierarchyCycle(node))
        }
    }

    #[test]
    fn parent_walks_stop_on_cycles() {
        let scene = Loop {
            ids: [NodeId(0), NodeId(1)],
        };
        assert_eq!(scene.depth(NodeId(0)), 2);
        assert!(!scene.is_active_in_hierarchy(NodeId(1)));
    }
}
