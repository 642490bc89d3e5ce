use scenegc_engine::{DependencySink, EdgeFlags, NodePlugin, NodeView, PluginError};

/// Secondary motion on a chain of transforms starting at `root_transform`, the owner by default.
///
/// The chain keeps the bone component alive while it can be enabled. The component needs its
/// root and every collider in `colliders`.
pub struct PhysBonePlugin;

impl NodePlugin for PhysBonePlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        if let Some(root) = node.node_ref("root_transform")?.or(node.parent()) {
            deps.add_edge(root, node.id(), EdgeFlags::ONLY_IF_TARGET_CAN_BE_ENABLED);
            deps.depend_on(root, EdgeFlags::empty());
        }
        deps.depend_on_all(node.node_refs("colliders")?, EdgeFlags::empty());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "phys_bone"
    }
}

pub struct PhysBoneColliderPlugin;

impl NodePlugin for PhysBoneColliderPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        if let Some(root) = node.node_ref("root_transform")?.or(node.parent()) {
            deps.depend_on(root, EdgeFlags::empty());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "phys_bone_collider"
    }
}
