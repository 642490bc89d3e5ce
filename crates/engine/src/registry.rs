//! # [`NodeRegistry`]
//!
//! Maps node types to the plugin that declares their dependencies and runtime mutations.
//!
//! Types are resolved by exact match first. If a type has no plugin of its own, the declared
//! supertypes are searched breadth first and the nearest registered ancestor is used. Two distinct
//! registered ancestors at the same distance are a configuration error.

use crate::graph::EdgeFlags;
use rustc_hash::{FxHashMap, FxHashSet};
use scenegc_scene::{FieldValue, NodeId, NodeKind, Scene, TypeTag};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("type {0} already has a registered plugin")]
    DuplicateRegistration(TypeTag),

    #[error("type {ty} resolves to more than one plugin: {}", DisplayList(.candidates))]
    AmbiguousPluginResolution {
        ty: TypeTag,
        candidates: Vec<TypeTag>,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no plugin registered for type {0}")]
    Unregistered(TypeTag),

    #[error("type {ty} resolves to more than one plugin: {}", DisplayList(.candidates))]
    Ambiguous {
        ty: TypeTag,
        candidates: Vec<TypeTag>,
    },
}

impl LookupError {
    /// Unregistered types are not a configuration error, ambiguous ones are.
    pub fn into_registry_error(self) -> Option<RegistryError> {
        match self {
            LookupError::Unregistered(_) => None,
            LookupError::Ambiguous { ty, candidates } => {
                Some(RegistryError::AmbiguousPluginResolution { ty, candidates })
            }
        }
    }
}

struct DisplayList<'a>(&'a [TypeTag]);

impl fmt::Display for DisplayList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ty)?;
        }
        Ok(())
    }
}

/// Failure of a plugin callback for one node instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("field `{field}` should be {expected} but is {found}")]
    MalformedField {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Invalid(String),
}

/// A read-only view of one node handed to plugins.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    id: NodeId,
    scene: &'a dyn Scene,
}

impl<'a> NodeView<'a> {
    pub fn new(scene: &'a dyn Scene, id: NodeId) -> NodeView<'a> {
        NodeView { id, scene }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn scene(&self) -> &'a dyn Scene {
        self.scene
    }

    pub fn node_type(&self) -> Option<&'a TypeTag> {
        self.scene.node_type(self.id)
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.scene.kind(self.id)
    }

    /// The parent node. For components this is the transform they are attached to.
    pub fn parent(&self) -> Option<NodeId> {
        self.scene.parent(self.id)
    }

    pub fn is_enabled(&self) -> bool {
        self.scene.is_enabled(self.id)
    }

    pub fn field(&self, name: &str) -> Option<&'a FieldValue> {
        self.scene.field(self.id, name)
    }

    /// Reads a single node reference. A missing field or a missing reference is `None`.
    pub fn node_ref(&self, field: &'static str) -> Result<Option<NodeId>, PluginError> {
        match self.field(field) {
            None => Ok(None),
            Some(FieldValue::Ref(node)) => Ok(*node),
            Some(other) => Err(PluginError::MalformedField {
                field,
                expected: "ref",
                found: other.type_name(),
            }),
        }
    }

    /// Reads a list of node references, skipping missing ones. A missing field is empty.
    pub fn node_refs(&self, field: &'static str) -> Result<Vec<NodeId>, PluginError> {
        match self.field(field) {
            None => Ok(Vec::new()),
            Some(value) if value.is_reference() => Ok(value.node_refs().collect()),
            Some(other) => Err(PluginError::MalformedField {
                field,
                expected: "refs",
                found: other.type_name(),
            }),
        }
    }

    /// Like [`NodeView::node_refs`] but the field has to be present.
    pub fn require_node_refs(&self, field: &'static str) -> Result<Vec<NodeId>, PluginError> {
        if self.field(field).is_none() {
            return Err(PluginError::MissingField(field));
        }
        self.node_refs(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub flags: EdgeFlags,
}

/// Collects the dependencies declared by the plugin of one node.
#[derive(Debug)]
pub struct DependencySink {
    node: NodeId,
    edges: Vec<DeclaredEdge>,
    entrypoint: bool,
}

impl DependencySink {
    pub fn new(node: NodeId) -> DependencySink {
        DependencySink {
            node,
            edges: Vec::new(),
            entrypoint: false,
        }
    }

    /// The node the sink is collecting for.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Declares that the node being collected depends on `target`.
    pub fn depend_on(&mut self, target: NodeId, flags: EdgeFlags) {
        self.add_edge(self.node, target, flags);
    }

    pub fn depend_on_all(&mut self, targets: impl IntoIterator<Item = NodeId>, flags: EdgeFlags) {
        for target in targets {
            self.depend_on(target, flags);
        }
    }

    /// Declares that `source` depends on `target`. Plugins use this for edges whose existence is
    /// caused by their node but start somewhere else, e.g. a transform driven by a constraint.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, flags: EdgeFlags) {
        self.edges.push(DeclaredEdge {
            source,
            target,
            flags,
        });
    }

    /// The node is observable on its own and has to be kept.
    pub fn mark_entrypoint(&mut self) {
        self.entrypoint = true;
    }

    pub fn is_entrypoint(&self) -> bool {
        self.entrypoint
    }

    pub fn edges(&self) -> &[DeclaredEdge] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<DeclaredEdge> {
        self.edges
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutatedProperty {
    /// The enabled flag of the target, whatever its path is for the target's kind.
    Enabled,
    Path(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredMutation {
    pub target: NodeId,
    pub property: MutatedProperty,
}

/// Collects the properties the plugin's node may write at runtime.
#[derive(Debug)]
pub struct MutationSink {
    node: NodeId,
    mutations: Vec<DeclaredMutation>,
}

impl MutationSink {
    pub fn new(node: NodeId) -> MutationSink {
        MutationSink {
            node,
            mutations: Vec::new(),
        }
    }

    /// The writer of every mutation collected by this sink.
    pub fn writer(&self) -> NodeId {
        self.node
    }

    pub fn mutates(&mut self, target: NodeId, property: impl Into<String>) {
        self.mutations.push(DeclaredMutation {
            target,
            property: MutatedProperty::Path(property.into()),
        });
    }

    /// The node may enable or disable `target`.
    pub fn toggles(&mut self, target: NodeId) {
        self.mutations.push(DeclaredMutation {
            target,
            property: MutatedProperty::Enabled,
        });
    }

    pub fn mutations(&self) -> &[DeclaredMutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<DeclaredMutation> {
        self.mutations
    }
}

/// Describes the dependencies of one node type.
pub trait NodePlugin: Send + Sync {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError>;

    fn declare_mutations(
        &self,
        _node: &NodeView<'_>,
        _mutations: &mut MutationSink,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// This name should only be used for debugging purposes.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The plugin a type resolved to.
pub struct Resolution<'r> {
    pub plugin: &'r dyn NodePlugin,
    /// The type the plugin is registered for. Differs from the looked up type on fallback.
    pub registered_as: &'r TypeTag,
}

#[derive(Default)]
pub struct NodeRegistry {
    plugins: FxHashMap<TypeTag, Box<dyn NodePlugin>>,
    supertypes: FxHashMap<TypeTag, SmallVec<[TypeTag; 2]>>,
}

impl NodeRegistry {
    pub fn new() -> NodeRegistry {
        Default::default()
    }

    pub fn register(
        &mut self,
        ty: impl Into<TypeTag>,
        plugin: impl NodePlugin + 'static,
    ) -> Result<(), RegistryError> {
        let ty = ty.into();
        if self.plugins.contains_key(&ty) {
            return Err(RegistryError::DuplicateRegistration(ty));
        }
        self.plugins.insert(ty, Box::new(plugin));
        Ok(())
    }

    /// Declares the direct supertypes of `ty`, used when `ty` has no plugin of its own.
    pub fn declare_supertypes(
        &mut self,
        ty: impl Into<TypeTag>,
        bases: impl IntoIterator<Item = TypeTag>,
    ) {
        let entry = self.supertypes.entry(ty.into()).or_default();
        for base in bases {
            if !entry.contains(&base) {
                entry.push(base);
            }
        }
    }

    pub fn is_registered(&self, ty: &TypeTag) -> bool {
        self.plugins.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn lookup(&self, ty: &TypeTag) -> Result<&dyn NodePlugin, LookupError> {
        self.resolve(ty).map(|resolution| resolution.plugin)
    }

    pub fn resolve(&self, ty: &TypeTag) -> Result<Resolution<'_>, LookupError> {
        if let Some((registered_as, plugin)) = self.plugins.get_key_value(ty) {
            return Ok(Resolution {
                plugin: plugin.as_ref(),
                registered_as,
            });
        }

        let mut visited = FxHashSet::default();
        visited.insert(ty);
        let mut level: Vec<&TypeTag> = self.direct_supertypes(ty).collect();
        while !level.is_empty() {
            let mut found: SmallVec<[&TypeTag; 2]> = SmallVec::new();
            for &base in &level {
                if self.plugins.contains_key(base) && !found.contains(&base) {
                    found.push(base);
                }
            }
            match found.as_slice() {
                [] => {}
                [base] => {
                    let (registered_as, plugin) = self
                        .plugins
                        .get_key_value(*base)
                        .ok_or_else(|| LookupError::Unregistered(ty.clone()))?;
                    return Ok(Resolution {
                        plugin: plugin.as_ref(),
                        registered_as,
                    });
                }
                candidates => {
                    let mut candidates: Vec<TypeTag> =
                        candidates.iter().map(|&ty| ty.clone()).collect();
                    candidates.sort();
                    return Err(LookupError::Ambiguous {
                        ty: ty.clone(),
                        candidates,
                    });
                }
            }

            let mut next = Vec::new();
            for base in level {
                if visited.insert(base) {
                    next.extend(self.direct_supertypes(base).filter(|t| !visited.contains(t)));
                }
            }
            level = next;
        }
        Err(LookupError::Unregistered(ty.clone()))
    }

    fn direct_supertypes<'r>(&'r self, ty: &TypeTag) -> impl Iterator<Item = &'r TypeTag> + use<'r> {
        self.supertypes.get(ty).into_iter().flatten()
    }

    /// Checks that every type with declared supertypes resolves unambiguously.
    ///
    /// This is meant to run once after all plugins are loaded.
    pub fn validate(&self) -> Vec<RegistryError> {
        let mut types: Vec<&TypeTag> = self.supertypes.keys().collect();
        types.sort();
        types
            .into_iter()
            .filter_map(|ty| match self.resolve(ty) {
                Ok(_) => None,
                Err(err) => err.into_registry_error(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl NodePlugin for Named {
        fn declare_dependencies(
            &self,
            _: &NodeView<'_>,
            _: &mut DependencySink,
        ) -> Result<(), PluginError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn tag(name: &'static str) -> TypeTag {
        TypeTag::from_static(name)
    }

    #[test]
    fn duplicate_registration() {
        let mut registry = NodeRegistry::new();
        registry.register("Animator", Named("first")).unwrap();
        assert_eq!(
            registry.register("Animator", Named("second")),
            Err(RegistryError::DuplicateRegistration(tag("Animator")))
        );
        assert_eq!(registry.lookup(&tag("Animator")).unwrap().name(), "first");
    }

    #[test]
    fn exact_type_wins_over_base() {
        let mut registry = NodeRegistry::new();
        registry.register("Renderer", Named("renderer")).unwrap();
        registry
            .register("SkinnedMeshRenderer", Named("skinned"))
            .unwrap();
        registry.declare_supertypes("SkinnedMeshRenderer", [tag("Renderer")]);
        registry.declare_supertypes("MeshRenderer", [tag("Renderer")]);

        assert_eq!(
            registry.lookup(&tag("SkinnedMeshRenderer")).unwrap().name(),
            "skinned"
        );
        let resolution = registry.resolve(&tag("MeshRenderer")).unwrap();
        assert_eq!(resolution.plugin.name(), "renderer");
        assert_eq!(resolution.registered_as, &tag("Renderer"));
    }

    #[test]
    fn nearest_ancestor_is_used() {
        let mut registry = NodeRegistry::new();
        registry.register("Component", Named("component")).unwrap();
        registry.register("Behaviour", Named("behaviour")).unwrap();
        registry.declare_supertypes("Behaviour", [tag("Component")]);
        registry.declare_supertypes("Constraint", [tag("Behaviour")]);
        registry.declare_supertypes("AimConstraint", [tag("Constraint")]);

        assert_eq!(
            registry.lookup(&tag("AimConstraint")).unwrap().name(),
            "behaviour"
        );
    }

    #[test]
    fn ambiguous_resolution() {
        let mut registry = NodeRegistry::new();
        registry.register("Renderer", Named("renderer")).unwrap();
        registry.register("Behaviour", Named("behaviour")).unwrap();
        registry.declare_supertypes("Hybrid", [tag("Renderer"), tag("Behaviour")]);

        let err = registry.lookup(&tag("Hybrid")).err().unwrap();
        assert_eq!(
            err,
            LookupError::Ambiguous {
                ty: tag("Hybrid"),
                candidates: vec![tag("Behaviour"), tag("Renderer")],
            }
        );
        assert_eq!(
            registry.validate(),
            vec![RegistryError::AmbiguousPluginResolution {
                ty: tag("Hybrid"),
                candidates: vec![tag("Behaviour"), tag("Renderer")],
            }]
        );
    }

    #[test]
    fn diamond_through_one_base_is_not_ambiguous() {
        let mut registry = NodeRegistry::new();
        registry.register("Component", Named("component")).unwrap();
        registry.declare_supertypes("Left", [tag("Component")]);
        registry.declare_supertypes("Right", [tag("Component")]);
        registry.declare_supertypes("Diamond", [tag("Left"), tag("Right")]);

        assert_eq!(registry.lookup(&tag("Diamond")).unwrap().name(), "component");
        assert!(registry.validate().is_empty());
    }

    #[test]
    fn unregistered_type() {
        let mut registry = NodeRegistry::new();
        registry.declare_supertypes("Cycle", [tag("Cycle")]);
        assert_eq!(
            registry.lookup(&tag("Unknown")).err(),
            Some(LookupError::Unregistered(tag("Unknown")))
        );
        assert_eq!(
            registry.lookup(&tag("Cycle")).err(),
            Some(LookupError::Unregistered(tag("Cycle")))
        );
    }
}
