use scenegc_engine::{DependencySink, EdgeFlags, NodePlugin, NodeView, PluginError};

/// The avatar descriptor defines the avatar. Its view anchor is used even while the descriptor
/// itself is disabled.
pub struct AvatarDescriptorPlugin;

impl NodePlugin for AvatarDescriptorPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        deps.mark_entrypoint();
        if let Some(anchor) = node.node_ref("view_anchor")? {
            deps.depend_on(anchor, EdgeFlags::EVEN_IF_SOURCE_DISABLED);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "avatar_descriptor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::declare;
    use crate::types;
    use scenegc_scene::{FieldValue, MemoryScene, NodeKind};

    #[test]
    fn view_anchor_even_if_disabled() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node(types::TRANSFORM, NodeKind::Transform, None).unwrap();
        let head = scene
            .add_node(types::TRANSFORM, NodeKind::Transform, Some(root))
            .unwrap();
        let descriptor = scene
            .add_node(types::AVATAR_DESCRIPTOR, NodeKind::Component, Some(root))
            .unwrap();
        scene
            .set_field(descriptor, "view_anchor", FieldValue::Ref(Some(head)))
            .unwrap();

        let declared = declare(&AvatarDescriptorPlugin, &scene, descriptor).unwrap();
        assert!(declared.entrypoint);
        assert_eq!(
            declared.edges,
            [(descriptor, head, EdgeFlags::EVEN_IF_SOURCE_DISABLED)]
        );
    }
}
