//! Textual dump of the analysis graph, one node per line:
//!
//! ```text
//! scene {
//!   %3 = MeshRenderer component enabled, active, live *declared, [%1:HE, %7:T]
//! }
//! ```
//!
//! Edges are listed as `%target:flags` with `H` for hierarchy edges, `M` for edges from a node to
//! whatever toggles it, `E` for
//! `EVEN_IF_SOURCE_DISABLED` and `T` for `ONLY_IF_TARGET_CAN_BE_ENABLED`.

use crate::graph::{GcGraph, GcNode, NodeIdx};
use crate::passes::activeness::ActivenessInfo;
use crate::passes::mark_live::Liveness;
use crate::passes::AnalysisInfos;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use scenegc_scene::NodeKind;
use std::fmt;

fn dump_node(f: &mut fmt::Formatter<'_>, dumper: &GraphDumper<'_>, idx: NodeIdx) -> fmt::Result {
    let node: &GcNode = &dumper.graph[idx];
    let kind = match node.kind {
        NodeKind::Transform => "transform",
        NodeKind::Component => "component",
    };
    let enabled = if node.enabled { "enabled" } else { "disabled" };
    write!(f, "  %{} = {} {} {}", node.id, node.ty, kind, enabled)?;

    if let Some(activeness) = dumper.activeness {
        write!(f, ", {}", activeness.get(idx))?;
    }
    if let Some(liveness) = dumper.liveness {
        let verdict = if liveness.is_live(node.id) { "live" } else { "dead" };
        write!(f, ", {}", verdict)?;
    }
    if let Some(cause) = &node.entrypoint {
        write!(f, " *{}", cause)?;
    }

    write!(f, ", [")?;
    let mut first = true;
    for edge in dumper.graph.edges_directed(idx, Direction::Outgoing) {
        if !first {
            write!(f, ", ")?;
        } else {
            first = false;
        }
        write!(f, "%{}:{}", dumper.graph[edge.target()].id, edge.weight())?;
    }
    write!(f, "]")
}

pub struct GraphDumper<'a> {
    graph: &'a GcGraph,
    activeness: Option<&'a ActivenessInfo>,
    liveness: Option<&'a Liveness>,
}

impl<'a> GraphDumper<'a> {
    pub fn new(graph: &'a GcGraph) -> GraphDumper<'a> {
        GraphDumper {
            graph,
            activeness: None,
            liveness: None,
        }
    }

    /// Includes whatever activeness and liveness results have been computed so far.
    pub fn with_analysis(graph: &'a GcGraph, analysis_infos: &'a AnalysisInfos) -> GraphDumper<'a> {
        GraphDumper {
            graph,
            activeness: analysis_infos.get_analysis(),
            liveness: analysis_infos.get_analysis(),
        }
    }

    pub fn activeness(mut self, activeness: &'a ActivenessInfo) -> Self {
        self.activeness = Some(activeness);
        self
    }

    pub fn liveness(mut self, liveness: &'a Liveness) -> Self {
        self.liveness = Some(liveness);
        self
    }
}

impl fmt::Display for GraphDumper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scene {{")?;
        for idx in self.graph.node_indices() {
            dump_node(f, self, idx)?;
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}

pub trait DumpGraph {
    fn dump_to_string(&self) -> String;
}

impl DumpGraph for GcGraph {
    fn dump_to_string(&self) -> String {
        format!("{}", GraphDumper::new(self))
    }
}
