//! # [`MarkEntrypoints`]
//!
//! Applies the structural entrypoint rules of the [`EntrypointRegistry`](crate::entrypoints::EntrypointRegistry)
//! on top of the entrypoints already marked while collecting dependencies.

use super::{AnalysisInfos, Pass};
use crate::graph::GcGraph;
use crate::registry::NodeView;
use crate::{GcInput, GcOptions};
use itertools::Itertools;
use scenegc_scene::Scene;
use tracing::trace;

pub struct MarkEntrypoints;

impl<S: Scene> Pass<S> for MarkEntrypoints {
    fn run_pass(
        &self,
        graph: &mut GcGraph,
        _: &GcOptions,
        input: &GcInput<'_, S>,
        _: &mut AnalysisInfos,
    ) {
        let scene: &dyn Scene = input.scene;
        for idx in graph.node_indices().collect_vec() {
            let view = NodeView::new(scene, graph[idx].id);
            if let Some(cause) = input.entrypoints.classify(&view) {
                graph[idx].mark_entrypoint(cause);
            }
        }

        trace!(
            "{} entrypoints",
            graph
                .node_weights()
                .filter(|node| node.is_entrypoint())
                .count()
        );
    }

    fn status_message(&self) -> &'static str {
        "Marking entrypoints"
    }
}
