use scenegc_engine::{DependencySink, NodePlugin, NodeView, PluginError};

/// Transforms only need their parent, which the hierarchy edge already covers.
pub struct TransformPlugin;

impl NodePlugin for TransformPlugin {
    fn declare_dependencies(
        &self,
        _: &NodeView<'_>,
        _: &mut DependencySink,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "transform"
    }
}

/// Fallback for behaviours without a dedicated plugin. Nothing is known about what they do, so
/// they are kept.
pub struct BehaviourPlugin;

impl NodePlugin for BehaviourPlugin {
    fn declare_dependencies(
        &self,
        _: &NodeView<'_>,
        deps: &mut DependencySink,
    ) -> Result<(), PluginError> {
        deps.mark_entrypoint();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "behaviour"
    }
}
