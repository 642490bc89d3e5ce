use scenegc_engine::{DependencySink, EdgeFlags, NodePlugin, NodeView, PluginError};

/// Renderers draw something, so they are always kept. What they reference only matters while
/// they can actually draw.
pub struct RendererPlugin;

impl NodePlugin for RendererPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        deps.mark_entrypoint();
        if let Some(anchor) = node.node_ref("probe_anchor")? {
            deps.depend_on(anchor, EdgeFlags::empty());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "renderer"
    }
}

/// A renderer deformed by a skeleton.
pub struct SkinnedMeshRendererPlugin;

impl NodePlugin for SkinnedMeshRendererPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        RendererPlugin.declare_dependencies(node, deps)?;
        if let Some(root_bone) = node.node_ref("root_bone")? {
            deps.depend_on(root_bone, EdgeFlags::empty());
        }
        deps.depend_on_all(node.node_refs("bones")?, EdgeFlags::empty());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "skinned_mesh_renderer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::declare;
    use crate::types;
    use scenegc_scene::{FieldValue, MemoryScene, NodeKind};

    #[test]
    fn skinned_renderer_depends_on_bones() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node(types::TRANSFORM, NodeKind::Transform, None).unwrap();
        let hips = scene
            .add_node(types::TRANSFORM, NodeKind::Transform, Some(root))
            .unwrap();
        let spine = scene
            .add_node(types::TRANSFORM, NodeKind::Transform, Some(hips))
            .unwrap();
        let anchor = scene
            .add_node(types::TRANSFORM, NodeKind::Transform, Some(root))
            .unwrap();
        let body = scene
            .add_node(types::SKINNED_MESH_RENDERER, NodeKind::Component, Some(root))
            .unwrap();
        scene
            .set_field(body, "probe_anchor", FieldValue::Ref(Some(anchor)))
            .unwrap();
        scene
            .set_field(body, "root_bone", FieldValue::Ref(Some(hips)))
            .unwrap();
        scene
            .set_field(body, "bones", FieldValue::Refs(vec![Some(hips), Some(spine)]))
            .unwrap();

        let declared = declare(&SkinnedMeshRendererPlugin, &scene, body).unwrap();
        assert!(declared.entrypoint);
        let none = EdgeFlags::empty();
        assert_eq!(
            declared.edges,
            [
                (body, anchor, none),
                (body, hips, none),
                (body, hips, none),
                (body, spine, none),
            ]
        );
    }

    #[test]
    fn plain_renderer_without_anchor() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node(types::TRANSFORM, NodeKind::Transform, None).unwrap();
        let mesh = scene
            .add_node(types::MESH_RENDERER, NodeKind::Component, Some(root))
            .unwrap();

        let declared = declare(&RendererPlugin, &scene, mesh).unwrap();
        assert!(declared.entrypoint);
        assert!(declared.edges.is_empty());
    }
}
