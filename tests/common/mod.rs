#![allow(dead_code)]

use scenegc_engine::{
    Analysis, Collector, DependencySink, EdgeFlags, EntrypointRegistry, GcOptions, GcOutcome,
    MutationSink, NodePlugin, NodeRegistry, NodeView, PluginError, TaskMonitor,
};
use scenegc_plugins::TransformPlugin;
use scenegc_scene::{AnimatedProperties, FieldValue, MemoryScene, NodeId, NodeKind, Scene, TypeTag};

pub const LINK: TypeTag = TypeTag::from_static("Link");
pub const FAILING: TypeTag = TypeTag::from_static("Failing");

/// The fields a `Link` node lists its dependencies in, with the qualifiers they get.
pub const LINK_FIELDS: [(&str, EdgeFlags); 4] = [
    ("plain", EdgeFlags::empty()),
    ("even_if_disabled", EdgeFlags::EVEN_IF_SOURCE_DISABLED),
    ("only_if_enabled", EdgeFlags::ONLY_IF_TARGET_CAN_BE_ENABLED),
    ("both", EdgeFlags::all()),
];

pub fn field_for(flags: EdgeFlags) -> &'static str {
    LINK_FIELDS
        .iter()
        .find(|(_, f)| *f == flags)
        .map(|(name, _)| *name)
        .unwrap()
}

/// A generic test component: depends on whatever its fields list, is an entrypoint if `entry` is
/// set and toggles everything listed in `toggles`.
pub struct LinkPlugin;

impl NodePlugin for LinkPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        if let Some(FieldValue::Bool(true)) = node.field("entry") {
            deps.mark_entrypoint();
        }
        for (field, flags) in LINK_FIELDS {
            deps.depend_on_all(node.node_refs(field)?, flags);
        }
        Ok(())
    }

    fn declare_mutations(
        &self,
        node: &NodeView<'_>,
        mutations: &mut MutationSink,
    ) -> Result<(), PluginError> {
        for target in node.node_refs("toggles")? {
            mutations.toggles(target);
        }
        Ok(())
    }
}

/// Declares its `plain` dependencies, then fails.
pub struct FailingPlugin;

impl NodePlugin for FailingPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        deps.depend_on_all(node.node_refs("plain")?, EdgeFlags::empty());
        Err(PluginError::Invalid("broken component".to_string()))
    }
}

pub fn test_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry
        .register(TypeTag::from_static("Transform"), TransformPlugin)
        .unwrap();
    registry.register(LINK, LinkPlugin).unwrap();
    registry.register(FAILING, FailingPlugin).unwrap();
    registry
}

#[derive(Default, Clone)]
pub struct TestScene {
    pub scene: MemoryScene,
    pub animations: AnimatedProperties,
}

impl TestScene {
    pub fn new() -> TestScene {
        Default::default()
    }

    pub fn transform(&mut self, parent: Option<NodeId>) -> NodeId {
        self.scene
            .add_node("Transform", NodeKind::Transform, parent)
            .unwrap()
    }

    /// Adds a `Link` component to `parent`.
    pub fn link(&mut self, parent: NodeId) -> NodeId {
        self.scene
            .add_node(LINK, NodeKind::Component, Some(parent))
            .unwrap()
    }

    pub fn add(&mut self, ty: TypeTag, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        self.scene.add_node(ty, kind, parent).unwrap()
    }

    pub fn disable(&mut self, node: NodeId) {
        self.scene.set_enabled(node, false).unwrap();
    }

    pub fn entry(&mut self, node: NodeId) {
        self.scene
            .set_field(node, "entry", FieldValue::Bool(true))
            .unwrap();
    }

    fn push_ref(&mut self, node: NodeId, field: &str, target: NodeId) {
        let mut refs = match self.scene.field(node, field) {
            Some(FieldValue::Refs(refs)) => refs.clone(),
            _ => Vec::new(),
        };
        refs.push(Some(target));
        self.scene
            .set_field(node, field, FieldValue::Refs(refs))
            .unwrap();
    }

    /// Declares `from -> to` on the `Link` node `from`.
    pub fn edge(&mut self, from: NodeId, to: NodeId, flags: EdgeFlags) {
        self.push_ref(from, field_for(flags), to);
    }

    /// `writer` toggles `target` through its plugin.
    pub fn toggles(&mut self, writer: NodeId, target: NodeId) {
        self.push_ref(writer, "toggles", target);
    }

    /// An animation somewhere writes the enabled property of `node`.
    pub fn animate(&mut self, node: NodeId) {
        let kind = self.scene.kind(node).unwrap();
        self.animations
            .add_writer(node, kind.enabled_property(), NodeId(u32::MAX));
    }

    pub fn analyze(&self) -> Analysis {
        self.analyze_with(&EntrypointRegistry::new())
    }

    pub fn analyze_with(&self, entrypoints: &EntrypointRegistry) -> Analysis {
        let registry = test_registry();
        Collector::new(&registry, entrypoints)
            .analyze(
                &self.scene,
                &self.animations,
                &GcOptions::default(),
                TaskMonitor::new(),
            )
            .unwrap()
    }

    pub fn collect(&mut self, flags: &str) -> GcOutcome {
        let registry = test_registry();
        let entrypoints = EntrypointRegistry::new();
        Collector::new(&registry, &entrypoints)
            .collect(
                &mut self.scene,
                &self.animations,
                &GcOptions::parse(flags),
                TaskMonitor::new(),
            )
            .unwrap()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.scene.contains(node)
    }
}
