use scenegc_engine::{DependencySink, EdgeFlags, MutationSink, NodePlugin, NodeView, PluginError};

/// Animators play back clips, which is observable on its own.
///
/// Fields:
/// - `avatar_root`: ref, the transform the rig is bound to
/// - `drives`: refs, nodes whose enabled flag the animator's layers toggle
pub struct AnimatorPlugin;

impl NodePlugin for AnimatorPlugin {
    fn declare_dependencies(
        &self,
        node: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        deps.mark_entrypoint();
        if let Some(root) = node.node_ref("avatar_root")? {
            deps.depend_on(root, EdgeFlags::empty());
        }
        Ok(())
    }

    fn declare_mutations(
        &self,
        node: &NodeView<'_>,
        mutations: &mut MutationSink,
    ) -> Result<(), PluginError> {
        for target in node.node_refs("drives")? {
            mutations.toggles(target);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "animator"
    }
}
