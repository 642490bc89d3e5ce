use super::{AnalysisInfo, AnalysisInfos, Pass};
use crate::graph::GcGraph;
use crate::{GcInput, GcOptions};
use petgraph::dot::Dot;
use scenegc_scene::Scene;

/// Graphviz rendering of the analysis graph.
#[derive(Debug, Default)]
pub struct DotExport(pub String);

impl AnalysisInfo for DotExport {}

pub struct ExportGraph;

impl<S: Scene> Pass<S> for ExportGraph {
    fn run_pass(
        &self,
        graph: &mut GcGraph,
        _: &GcOptions,
        _: &GcInput<'_, S>,
        analysis_infos: &mut AnalysisInfos,
    ) {
        let dot = format!("{}", Dot::with_config(&*graph, &[]));
        analysis_infos.insert_analysis(DotExport(dot));
    }

    fn should_run(&self, options: &GcOptions) -> bool {
        options.export_dot
    }

    fn status_message(&self) -> &'static str {
        "Exporting graph"
    }
}
