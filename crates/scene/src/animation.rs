use crate::NodeId;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Answers which nodes may write a property of another node at runtime, as reported by the
/// animation analysis of the host.
pub trait AnimationIndex {
    /// Returns the writers of `property` on `node`. Empty if the property is never animated.
    fn writers(&self, node: NodeId, property: &str) -> &[NodeId];

    /// Calls `f` once for every animated `(node, property)` pair with its writers.
    fn for_each_record(&self, f: &mut dyn FnMut(NodeId, &str, &[NodeId]));
}

/// A scene without animations.
impl AnimationIndex for () {
    fn writers(&self, _: NodeId, _: &str) -> &[NodeId] {
        &[]
    }

    fn for_each_record(&self, _: &mut dyn FnMut(NodeId, &str, &[NodeId])) {}
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct AnimatedProperty {
    pub node: NodeId,
    pub property: String,
    pub writers: Vec<NodeId>,
}

/// A plain table of animated properties.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
#[serde(from = "Vec<AnimatedProperty>", into = "Vec<AnimatedProperty>")]
pub struct AnimatedProperties {
    properties: FxHashMap<NodeId, IndexMap<String, Vec<NodeId>>>,
}

impl AnimatedProperties {
    pub fn new() -> AnimatedProperties {
        Default::default()
    }

    /// Records that `writer` may write `property` of `node`.
    pub fn add_writer(&mut self, node: NodeId, property: impl Into<String>, writer: NodeId) {
        let writers = self
            .properties
            .entry(node)
            .or_default()
            .entry(property.into())
            .or_default();
        if !writers.contains(&writer) {
            writers.push(writer);
        }
    }

    pub fn len(&self) -> usize {
        self.properties.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnimationIndex for AnimatedProperties {
    fn writers(&self, node: NodeId, property: &str) -> &[NodeId] {
        self.properties
            .get(&node)
            .and_then(|props| props.get(property))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn for_each_record(&self, f: &mut dyn FnMut(NodeId, &str, &[NodeId])) {
        let mut nodes: Vec<_> = self.properties.keys().copied().collect();
        nodes.sort_unstable();
        for node in nodes {
            for (property, writers) in &self.properties[&node] {
                f(node, property.as_str(), writers.as_slice());
            }
        }
    }
}

impl From<Vec<AnimatedProperty>> for AnimatedProperties {
    fn from(records: Vec<AnimatedProperty>) -> AnimatedProperties {
        let mut properties = AnimatedProperties::new();
        for record in records {
            for writer in record.writers {
                properties.add_writer(record.node, record.property.clone(), writer);
            }
        }
        properties
    }
}

impl From<AnimatedProperties> for Vec<AnimatedProperty> {
    fn from(properties: AnimatedProperties) -> Vec<AnimatedProperty> {
        let mut records = Vec::new();
        properties.for_each_record(&mut |node, property, writers| {
            records.push(AnimatedProperty {
                node,
                property: property.to_string(),
                writers: writers.to_vec(),
            })
        });
        records
    }
}
