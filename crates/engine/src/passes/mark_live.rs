//! # [`MarkLive`]
//!
//! Marks every node reachable from an entrypoint through a traversable edge.
//!
//! An edge `n -> m` is followed if it is [`EVEN_IF_SOURCE_DISABLED`](EdgeFlags::EVEN_IF_SOURCE_DISABLED)
//! or `n` can be active. An edge that is
//! [`ONLY_IF_TARGET_CAN_BE_ENABLED`](EdgeFlags::ONLY_IF_TARGET_CAN_BE_ENABLED) additionally requires
//! that `m` can be active. Every node is visited at most once and every edge looked at at most once.

use super::activeness::ActivenessInfo;
use super::{AnalysisInfo, AnalysisInfos, Pass};
use crate::graph::{EdgeFlags, EdgeKind, EntrypointCause, GcGraph};
use crate::{GcInput, GcOptions};
use indexmap::IndexMap;
use petgraph::visit::{EdgeRef, VisitMap, Visitable};
use petgraph::Direction;
use scenegc_scene::{NodeId, Scene};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::trace;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LiveReason {
    Entrypoint { cause: EntrypointCause },
    Edge { from: NodeId, kind: EdgeKind },
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Live(LiveReason),
    Dead,
}

/// The verdict for every analyzed node, ordered by id.
#[derive(Serialize, Default, Debug, Clone)]
#[serde(transparent)]
pub struct Liveness {
    verdicts: IndexMap<NodeId, Verdict>,
}

impl Liveness {
    pub fn verdict(&self, node: NodeId) -> Option<&Verdict> {
        self.verdicts.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.verdicts.contains_key(&node)
    }

    pub fn is_live(&self, node: NodeId) -> bool {
        matches!(self.verdicts.get(&node), Some(Verdict::Live(_)))
    }

    /// Only nodes that were analyzed can be dead.
    pub fn is_dead(&self, node: NodeId) -> bool {
        matches!(self.verdicts.get(&node), Some(Verdict::Dead))
    }

    pub fn reason(&self, node: NodeId) -> Option<&LiveReason> {
        match self.verdicts.get(&node) {
            Some(Verdict::Live(reason)) => Some(reason),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Verdict)> + '_ {
        self.verdicts.iter().map(|(&id, verdict)| (id, verdict))
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, verdict)| matches!(verdict, Verdict::Live(_)))
            .map(|(id, _)| id)
    }

    pub fn dead_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, verdict)| **verdict == Verdict::Dead)
            .map(|(id, _)| id)
    }
}

impl AnalysisInfo for Liveness {}

pub struct MarkLive;

impl<S: Scene> Pass<S> for MarkLive {
    fn run_pass(
        &self,
        graph: &mut GcGraph,
        _: &GcOptions,
        _: &GcInput<'_, S>,
        analysis_infos: &mut AnalysisInfos,
    ) {
        let liveness = match analysis_infos.get_analysis::<ActivenessInfo>() {
            Some(activeness) => mark_live(graph, activeness),
            None => mark_live(graph, &ActivenessInfo::default()),
        };
        trace!(
            "{} of {} nodes are live",
            liveness.live_nodes().count(),
            liveness.len()
        );
        analysis_infos.insert_analysis(liveness);
    }

    fn status_message(&self) -> &'static str {
        "Marking live nodes"
    }
}

pub fn mark_live(graph: &GcGraph, activeness: &ActivenessInfo) -> Liveness {
    let mut visited = graph.visit_map();
    let mut reasons = IndexMap::new();
    let mut queue = VecDeque::new();

    for idx in graph.node_indices() {
        if let Some(cause) = &graph[idx].entrypoint {
            visited.visit(idx);
            reasons.insert(
                graph[idx].id,
                LiveReason::Entrypoint {
                    cause: cause.clone(),
                },
            );
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        let source_active = activeness.get(idx).can_be_active();
        for edge in graph.edges_directed(idx, Direction::Outgoing) {
            let dep = edge.weight();
            if !source_active && !dep.flags.contains(EdgeFlags::EVEN_IF_SOURCE_DISABLED) {
                continue;
            }
            let target = edge.target();
            if dep.flags.contains(EdgeFlags::ONLY_IF_TARGET_CAN_BE_ENABLED)
                && !activeness.get(target).can_be_active()
            {
                continue;
            }
            if visited.visit(target) {
                reasons.insert(
                    graph[target].id,
                    LiveReason::Edge {
                        from: graph[idx].id,
                        kind: dep.kind,
                    },
                );
                queue.push_back(target);
            }
        }
    }

    let mut verdicts: IndexMap<NodeId, Verdict> = graph
        .node_weights()
        .map(|node| {
            let verdict = match reasons.swap_remove(&node.id) {
                Some(reason) => Verdict::Live(reason),
                None => Verdict::Dead,
            };
            (node.id, verdict)
        })
        .collect();
    verdicts.sort_keys();
    Liveness { verdicts }
}
