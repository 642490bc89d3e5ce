//! # [`ComputeActiveness`]
//!
//! Classifies every node as [`Activeness::AlwaysActive`], [`Activeness::AlwaysInactive`] or
//! [`Activeness::Variable`] from the hierarchy as it is before anything gets removed.
//!
//! A node is active when it and all of its ancestors are enabled. If any node on that chain has its
//! enabled property written by something at runtime, the node is `Variable`. No attempt is made to
//! prove that a writer never sets the property to `true`.

use super::collect_dependencies::MutationMap;
use super::{AnalysisInfo, AnalysisInfos, Pass};
use crate::graph::{GcGraph, NodeIdx};
use crate::{GcInput, GcOptions};
use rustc_hash::FxHashMap;
use scenegc_scene::Scene;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;
use tracing::warn;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Activeness {
    AlwaysActive,
    AlwaysInactive,
    Variable,
}

impl Activeness {
    pub fn can_be_active(self) -> bool {
        self != Activeness::AlwaysInactive
    }
}

impl fmt::Display for Activeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activeness::AlwaysActive => write!(f, "active"),
            Activeness::AlwaysInactive => write!(f, "inactive"),
            Activeness::Variable => write!(f, "variable"),
        }
    }
}

#[derive(Default, Debug)]
pub struct ActivenessInfo {
    values: Vec<Option<Activeness>>,
}

impl ActivenessInfo {
    /// Nodes that were never classified are reported as `Variable`.
    pub fn get(&self, idx: NodeIdx) -> Activeness {
        self.values
            .get(idx.index())
            .copied()
            .flatten()
            .unwrap_or(Activeness::Variable)
    }

    pub fn set(&mut self, idx: NodeIdx, activeness: Activeness) {
        if self.values.len() <= idx.index() {
            self.values.resize(idx.index() + 1, None);
        }
        self.values[idx.index()] = Some(activeness);
    }

    pub fn count(&self, activeness: Activeness) -> usize {
        self.values
            .iter()
            .filter(|&&value| value == Some(activeness))
            .count()
    }
}

impl AnalysisInfo for ActivenessInfo {}

pub struct ComputeActiveness;

impl<S: Scene> Pass<S> for ComputeActiveness {
    fn run_pass(
        &self,
        graph: &mut GcGraph,
        _: &GcOptions,
        _: &GcInput<'_, S>,
        analysis_infos: &mut AnalysisInfos,
    ) {
        let info = match analysis_infos.get_analysis::<MutationMap>() {
            Some(mutations) => compute_activeness(graph, mutations),
            None => compute_activeness(graph, &MutationMap::default()),
        };
        analysis_infos.insert_analysis(info);
    }

    fn status_message(&self) -> &'static str {
        "Computing activeness"
    }
}

#[derive(Clone, Copy)]
struct ChainState {
    enabled: bool,
    animated: bool,
}

/// Walks the hierarchy breadth-first from the roots so every parent is classified before its
/// children.
pub fn compute_activeness(graph: &GcGraph, mutations: &MutationMap) -> ActivenessInfo {
    let mut children: FxHashMap<NodeIdx, SmallVec<[NodeIdx; 4]>> = FxHashMap::default();
    let mut queue = VecDeque::new();
    for idx in graph.node_indices() {
        match graph[idx].parent {
            Some(parent) => children.entry(parent).or_default().push(idx),
            None => queue.push_back(idx),
        }
    }

    let mut states: FxHashMap<NodeIdx, ChainState> = FxHashMap::default();
    let mut info = ActivenessInfo::default();
    while let Some(idx) = queue.pop_front() {
        let node = &graph[idx];
        let own = ChainState {
            enabled: node.enabled,
            animated: mutations.is_mutated(idx, node.kind.enabled_property()),
        };
        let state = match node.parent.and_then(|parent| states.get(&parent)) {
            Some(parent) => ChainState {
                enabled: own.enabled && parent.enabled,
                animated: own.animated || parent.animated,
            },
            None => own,
        };
        states.insert(idx, state);

        let activeness = match state {
            ChainState { animated: true, .. } => Activeness::Variable,
            ChainState { enabled: true, .. } => Activeness::AlwaysActive,
            ChainState { enabled: false, .. } => Activeness::AlwaysInactive,
        };
        info.set(idx, activeness);

        if let Some(children) = children.get(&idx) {
            queue.extend(children.iter().copied());
        }
    }

    let unreached = graph.node_count() - states.len();
    if unreached > 0 {
        warn!(
            "{} nodes are not reachable from a hierarchy root, treating them as variable",
            unreached
        );
        for idx in graph.node_indices() {
            if !states.contains_key(&idx) {
                info.set(idx, Activeness::Variable);
            }
        }
    }

    info
}
