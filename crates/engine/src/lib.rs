mod dump;
mod entrypoints;
mod graph;
pub mod passes;
mod prune;
mod registry;
mod report;
mod task_monitor;

use passes::activeness::ActivenessInfo;
use passes::collect_dependencies::index_nodes;
use passes::{make_default_pass_manager, AnalysisInfos, Diagnostics, DotExport};
use rustc_hash::FxHashMap;
use scenegc_scene::{AnimationIndex, NodeId, Scene, SceneError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

pub use dump::{DumpGraph, GraphDumper};
pub use entrypoints::EntrypointRegistry;
pub use graph::{
    Dependency, EdgeFlags, EdgeKind, EntrypointCause, GcGraph, GcNode, NodeIdx,
};
pub use passes::activeness::Activeness;
pub use passes::mark_live::{LiveReason, Liveness, Verdict};
pub use prune::{sweep, ExternalReference, MappedObject, ObjectMapping};
pub use registry::{
    DeclaredEdge, DeclaredMutation, DependencySink, LookupError, MutatedProperty, MutationSink,
    NodePlugin, NodeRegistry, NodeView, PluginError, RegistryError, Resolution,
};
pub use report::{Diagnostic, EdgeSummary, GcReport, PrunedNode};
pub use task_monitor::TaskMonitor;

#[derive(Default, PartialEq, Eq, Debug, Clone)]
pub struct GcOptions {
    /// Analyze only, never remove anything from the scene.
    pub dry_run: bool,
    /// Produce a report explaining every pruned node.
    pub report: bool,
    /// Print out the analysis graph after every pass
    pub print_after_all: bool,
    /// Print out the analysis graph before removing anything
    pub print_before_sweep: bool,
    /// Render the analysis graph as a Graphviz dot file
    pub export_dot: bool,
}

impl GcOptions {
    pub fn parse(str: &str) -> GcOptions {
        let mut co: GcOptions = Default::default();
        let options = str.split_whitespace();
        for option in options {
            if option.starts_with("--") {
                match option {
                    "--dry-run" => co.dry_run = true,
                    "--report" => co.report = true,
                    "--print-after-all" => co.print_after_all = true,
                    "--print-before-sweep" => co.print_before_sweep = true,
                    "--export-dot" => co.export_dot = true,
                    _ => warn!("Unrecognized option: {}", option),
                }
            } else if let Some(str) = option.strip_prefix('-') {
                for c in str.chars() {
                    let lower = c.to_lowercase().to_string();
                    match lower.as_str() {
                        "n" => co.dry_run = true,
                        "r" => co.report = true,
                        "d" => co.export_dot = true,
                        _ => warn!("Unrecognized option: -{}", c),
                    }
                }
            } else {
                warn!("Unrecognized option: {}", option);
            }
        }
        co
    }
}

/// Everything the passes read. Nothing in here is mutated while analyzing.
pub struct GcInput<'a, S: Scene> {
    pub scene: &'a S,
    pub registry: &'a NodeRegistry,
    pub entrypoints: &'a EntrypointRegistry,
    pub animations: &'a dyn AnimationIndex,
}

#[derive(Error, Debug)]
pub enum GcError {
    #[error("collection was cancelled")]
    Cancelled,

    #[error("analysis did not produce {0}")]
    MissingAnalysis(&'static str),

    #[error("could not read scene: {0}")]
    Scene(#[from] SceneError),
}

/// The result of analyzing a scene. Owns its graph, nothing is shared between runs.
pub struct Analysis {
    graph: GcGraph,
    index: FxHashMap<NodeId, NodeIdx>,
    activeness: ActivenessInfo,
    liveness: Liveness,
    diagnostics: Vec<Diagnostic>,
    dot: Option<String>,
}

impl Analysis {
    pub fn graph(&self) -> &GcGraph {
        &self.graph
    }

    pub fn node(&self, node: NodeId) -> Option<&GcNode> {
        self.index.get(&node).map(|&idx| &self.graph[idx])
    }

    pub fn activeness(&self, node: NodeId) -> Option<Activeness> {
        self.index.get(&node).map(|&idx| self.activeness.get(idx))
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Only present when running with [`GcOptions::export_dot`].
    pub fn dot(&self) -> Option<&str> {
        self.dot.as_deref()
    }

    pub fn report(&self) -> GcReport {
        GcReport::build(
            &self.graph,
            &self.activeness,
            &self.liveness,
            &self.diagnostics,
        )
    }

    pub fn dump_to_string(&self) -> String {
        GraphDumper::new(&self.graph)
            .activeness(&self.activeness)
            .liveness(&self.liveness)
            .to_string()
    }
}

pub struct GcOutcome {
    pub analysis: Analysis,
    /// None on a dry run.
    pub mapping: Option<ObjectMapping>,
}

impl GcOutcome {
    pub fn removed_count(&self) -> usize {
        self.mapping
            .as_ref()
            .map(ObjectMapping::removed_count)
            .unwrap_or(0)
    }
}

/// Runs the analysis passes over a scene and removes what is dead.
///
/// The registries are only borrowed, so one set of plugins can drive any number of runs.
pub struct Collector<'r> {
    registry: &'r NodeRegistry,
    entrypoints: &'r EntrypointRegistry,
}

impl<'r> Collector<'r> {
    pub fn new(registry: &'r NodeRegistry, entrypoints: &'r EntrypointRegistry) -> Collector<'r> {
        Collector {
            registry,
            entrypoints,
        }
    }

    pub fn analyze<S: Scene>(
        &self,
        scene: &S,
        animations: &dyn AnimationIndex,
        options: &GcOptions,
        monitor: Arc<TaskMonitor>,
    ) -> Result<Analysis, GcError> {
        debug!("Starting analysis");
        let start = Instant::now();

        for id in scene.node_ids() {
            if scene.node_type(id).is_none() {
                return Err(SceneError::NodeNotFound(id).into());
            }
        }

        let input = GcInput {
            scene,
            registry: self.registry,
            entrypoints: self.entrypoints,
            animations,
        };
        let pass_manager = make_default_pass_manager::<S>();
        // One more step for the sweep.
        monitor.set_max_progress(pass_manager.len() + 1);

        let mut analysis_infos = AnalysisInfos::default();
        let graph = pass_manager.run_passes(options, &input, &mut analysis_infos, monitor.clone());
        if monitor.cancelled() {
            debug!("Analysis cancelled");
            return Err(GcError::Cancelled);
        }

        let activeness = analysis_infos
            .take_analysis::<ActivenessInfo>()
            .ok_or(GcError::MissingAnalysis("activeness"))?;
        let liveness = analysis_infos
            .take_analysis::<Liveness>()
            .ok_or(GcError::MissingAnalysis("liveness"))?;
        let diagnostics = analysis_infos
            .take_analysis::<Diagnostics>()
            .unwrap_or_default()
            .0;
        let dot = analysis_infos
            .take_analysis::<DotExport>()
            .map(|dot| dot.0);

        debug!("Analysis completed in {:?}", start.elapsed());
        Ok(Analysis {
            index: index_nodes(&graph),
            graph,
            activeness,
            liveness,
            diagnostics,
            dot,
        })
    }

    /// Analyzes `scene` and removes every dead node from it, unless running with
    /// [`GcOptions::dry_run`]. A cancelled run leaves the scene untouched.
    pub fn collect<S: Scene>(
        &self,
        scene: &mut S,
        animations: &dyn AnimationIndex,
        options: &GcOptions,
        monitor: Arc<TaskMonitor>,
    ) -> Result<GcOutcome, GcError> {
        let mut analysis = self.analyze(&*scene, animations, options, monitor.clone())?;

        if options.print_before_sweep {
            eprintln!("{}", analysis.dump_to_string());
        }

        if monitor.cancelled() {
            debug!("Collection cancelled before sweeping");
            return Err(GcError::Cancelled);
        }

        if options.dry_run {
            monitor.inc_progress();
            return Ok(GcOutcome {
                analysis,
                mapping: None,
            });
        }

        monitor.set_message("Removing dead nodes".to_string());
        let (mapping, diagnostics) = sweep(scene, &analysis.liveness);
        analysis.diagnostics.extend(diagnostics);
        monitor.inc_progress();
        debug!(
            "Removed {} of {} nodes",
            mapping.removed_count(),
            mapping.len()
        );

        Ok(GcOutcome {
            analysis,
            mapping: Some(mapping),
        })
    }
}
