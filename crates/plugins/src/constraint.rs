use scenegc_engine::{DependencySink, EdgeFlags, NodePlugin, NodeView, PluginError};

/// Constraints drive the transform they are attached to from a list of sources.
///
/// The owner keeps the constraint alive as long as the constraint can be enabled, and a live
/// constraint keeps all of its sources alive. `sources` is required.
pub struct ConstraintPlugin;

impl NodePlugin for ConstraintPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        if let Some(owner) = node.parent() {
            deps.add_edge(owner, node.id(), EdgeFlags::ONLY_IF_TARGET_CAN_BE_ENABLED);
        }
        deps.depend_on_all(node.require_node_refs("sources")?, EdgeFlags::empty());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "constraint"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::declare;
    use crate::types;
    use scenegc_scene::{FieldValue, MemoryScene, NodeKind};

    #[test]
    fn owner_and_sources() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node(types::TRANSFORM, NodeKind::Transform, None).unwrap();
        let owner = scene
            .add_node(types::TRANSFORM, NodeKind::Transform, Some(root))
            .unwrap();
        let source = scene
            .add_node(types::TRANSFORM, NodeKind::Transform, Some(root))
            .unwrap();
        let constraint = scene
            .add_node(types::PARENT_CONSTRAINT, NodeKind::Component, Some(owner))
            .unwrap();
        scene
            .set_field(constraint, "sources", FieldValue::Refs(vec![Some(source)]))
            .unwrap();

        let declared = declare(&ConstraintPlugin, &scene, constraint).unwrap();
        assert!(!declared.entrypoint);
        assert_eq!(
            declared.edges,
            [
                (owner, constraint, EdgeFlags::ONLY_IF_TARGET_CAN_BE_ENABLED),
                (constraint, source, EdgeFlags::empty()),
            ]
        );
    }

    #[test]
    fn sources_are_required() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node(types::TRANSFORM, NodeKind::Transform, None).unwrap();
        let constraint = scene
            .add_node(types::AIM_CONSTRAINT, NodeKind::Component, Some(root))
            .unwrap();
        assert_eq!(
            declare(&ConstraintPlugin, &scene, constraint).err(),
            Some(PluginError::MissingField("sources"))
        );

        scene
            .set_field(constraint, "sources", FieldValue::Text("head".to_string()))
            .unwrap();
        assert_eq!(
            declare(&ConstraintPlugin, &scene, constraint).err(),
            Some(PluginError::MalformedField {
                field: "sources",
                expected: "refs",
                found: "text",
            })
        );
    }
}
