pub mod activeness;
pub mod collect_dependencies;
mod export_graph;
mod mark_entrypoints;
pub mod mark_live;

use crate::dump::GraphDumper;
use crate::graph::GcGraph;
use crate::report::Diagnostic;
use crate::task_monitor::TaskMonitor;
use crate::{GcInput, GcOptions};
use scenegc_scene::Scene;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

pub use export_graph::DotExport;

pub const fn make_default_pass_manager<'p, S: Scene>() -> PassManager<'p, S> {
    PassManager::new(&[
        &collect_dependencies::CollectDependencies,
        &mark_entrypoints::MarkEntrypoints,
        &activeness::ComputeActiveness,
        &mark_live::MarkLive,
        &export_graph::ExportGraph,
    ])
}

pub trait AnalysisInfo: Any {}

#[derive(Default)]
pub struct AnalysisInfos {
    analysis_infos: HashMap<TypeId, Box<dyn AnalysisInfo>>,
}

impl AnalysisInfos {
    pub fn insert_analysis<A: AnalysisInfo>(&mut self, analysis: A) {
        self.analysis_infos
            .insert(TypeId::of::<A>(), Box::new(analysis));
    }

    pub fn get_analysis<A: AnalysisInfo>(&self) -> Option<&A> {
        let type_id = TypeId::of::<A>();
        self.analysis_infos
            .get(&type_id)
            .and_then(|ai| (ai.as_ref() as &dyn Any).downcast_ref())
    }

    pub fn get_analysis_mut<A: AnalysisInfo>(&mut self) -> Option<&mut A> {
        let type_id = TypeId::of::<A>();
        self.analysis_infos
            .get_mut(&type_id)
            .and_then(|ai| (ai.as_mut() as &mut dyn Any).downcast_mut())
    }

    pub fn take_analysis<A: AnalysisInfo>(&mut self) -> Option<A> {
        let type_id = TypeId::of::<A>();
        let ai = self.analysis_infos.remove(&type_id)?;
        (ai as Box<dyn Any>).downcast::<A>().ok().map(|ai| *ai)
    }
}

/// Recovered problems found while analyzing.
#[derive(Default, Debug)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl AnalysisInfo for Diagnostics {}

impl AnalysisInfos {
    pub fn report(&mut self, diagnostic: Diagnostic) {
        match self.get_analysis_mut::<Diagnostics>() {
            Some(diagnostics) => diagnostics.0.push(diagnostic),
            None => self.insert_analysis(Diagnostics(vec![diagnostic])),
        }
    }
}

pub struct PassManager<'p, S: Scene> {
    passes: &'p [&'p dyn Pass<S>],
}

impl<'p, S: Scene> PassManager<'p, S> {
    pub const fn new(passes: &'p [&dyn Pass<S>]) -> Self {
        Self { passes }
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Runs every enabled pass in order. Returns early, with a partial graph, if the monitor
    /// gets cancelled.
    pub fn run_passes(
        &self,
        options: &GcOptions,
        input: &GcInput<'_, S>,
        analysis_infos: &mut AnalysisInfos,
        monitor: Arc<TaskMonitor>,
    ) -> GcGraph {
        let mut graph = GcGraph::default();

        for &pass in self.passes {
            if !pass.should_run(options) {
                trace!("Skipping pass: {}", pass.name());
                monitor.inc_progress();
                continue;
            }

            if monitor.cancelled() {
                return graph;
            }

            trace!("Running pass: {}", pass.name());
            monitor.set_message(pass.status_message().to_string());
            let start = Instant::now();

            pass.run_pass(&mut graph, options, input, analysis_infos);

            trace!("Completed pass in {:?}", start.elapsed());
            trace!("node_count: {}", graph.node_count());
            trace!("edge_count: {}", graph.edge_count());
            monitor.inc_progress();

            if options.print_after_all {
                debug!("Printing graph after pass: {}", pass.name());
                eprintln!("{}", GraphDumper::with_analysis(&graph, analysis_infos));
            }
        }

        graph
    }
}

pub trait Pass<S: Scene> {
    fn run_pass(
        &self,
        graph: &mut GcGraph,
        options: &GcOptions,
        input: &GcInput<'_, S>,
        analysis_infos: &mut AnalysisInfos,
    );

    /// This name should only be use for debugging purposes,
    /// it is not a valid identifier of the pass.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn should_run(&self, _: &GcOptions) -> bool {
        // Every analysis pass is mandatory unless it says otherwise
        true
    }

    fn status_message(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Counter(usize);

    impl AnalysisInfo for Counter {}

    #[test]
    fn analysis_infos_by_type() {
        let mut infos = AnalysisInfos::default();
        assert!(infos.get_analysis::<Counter>().is_none());

        infos.insert_analysis(Counter(2));
        infos.get_analysis_mut::<Counter>().unwrap().0 += 1;
        assert_eq!(infos.get_analysis::<Counter>(), Some(&Counter(3)));

        assert_eq!(infos.take_analysis::<Counter>(), Some(Counter(3)));
        assert!(infos.get_analysis::<Counter>().is_none());
    }
}
