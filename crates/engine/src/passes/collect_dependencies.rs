//! # [`CollectDependencies`]
//!
//! This pass populates the graph with one node per scene node, the structural hierarchy edges and
//! every edge declared by the node plugins. It also builds the [`MutationMap`] from the plugins
//! and the animation index.
//! This pass is *mandatory*. Without it, the graph will never be populated.
//!
//! Nodes are never dropped on failure. A node whose type has no plugin, resolves to more than one
//! plugin, or whose plugin fails is made an entrypoint instead.

use super::{AnalysisInfo, AnalysisInfos, Pass};
use crate::graph::{Dependency, EntrypointCause, GcGraph, GcNode, NodeIdx};
use crate::registry::{
    DeclaredEdge, DeclaredMutation, DependencySink, LookupError, MutatedProperty, MutationSink,
    NodePlugin, NodeView, PluginError,
};
use crate::report::Diagnostic;
use crate::{GcInput, GcOptions};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use scenegc_scene::{NodeId, NodeKind, Scene};
use smallvec::SmallVec;
use tracing::{trace, warn};

/// The nodes that may write each property at runtime.
#[derive(Default, Debug)]
pub struct MutationMap {
    properties: FxHashMap<NodeIdx, FxHashMap<String, SmallVec<[NodeId; 2]>>>,
}

impl MutationMap {
    /// Returns false if `writer` was already known to write `property`.
    pub fn add(&mut self, node: NodeIdx, property: &str, writer: NodeId) -> bool {
        let props = self.properties.entry(node).or_default();
        let writers = match props.get_mut(property) {
            Some(writers) => writers,
            None => props.entry(property.to_string()).or_default(),
        };
        if writers.contains(&writer) {
            return false;
        }
        writers.push(writer);
        true
    }

    pub fn writers(&self, node: NodeIdx, property: &str) -> &[NodeId] {
        self.properties
            .get(&node)
            .and_then(|props| props.get(property))
            .map(|writers| writers.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_mutated(&self, node: NodeIdx, property: &str) -> bool {
        !self.writers(node, property).is_empty()
    }

    /// Number of mutated `(node, property)` pairs.
    pub fn len(&self) -> usize {
        self.properties.values().map(|props| props.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnalysisInfo for MutationMap {}

pub struct CollectDependencies;

impl<S: Scene> Pass<S> for CollectDependencies {
    fn run_pass(
        &self,
        graph: &mut GcGraph,
        _: &GcOptions,
        input: &GcInput<'_, S>,
        analysis_infos: &mut AnalysisInfos,
    ) {
        let mut state = CollectState {
            scene: input.scene,
            graph,
            index: FxHashMap::default(),
            mutations: MutationMap::default(),
            diagnostics: Vec::new(),
        };
        state.add_nodes();
        state.add_hierarchy();
        state.declare_dependencies(input);
        state.add_animations(input);

        let CollectState {
            mutations,
            diagnostics,
            ..
        } = state;
        trace!("Collected {} mutated properties", mutations.len());
        analysis_infos.insert_analysis(mutations);
        for diagnostic in diagnostics {
            analysis_infos.report(diagnostic);
        }
    }

    fn status_message(&self) -> &'static str {
        "Collecting dependencies"
    }
}

struct CollectState<'a, S: Scene> {
    scene: &'a S,
    graph: &'a mut GcGraph,
    index: FxHashMap<NodeId, NodeIdx>,
    mutations: MutationMap,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, S: Scene> CollectState<'a, S> {
    fn add_nodes(&mut self) {
        for id in self.scene.node_ids() {
            let Some(ty) = self.scene.node_type(id) else {
                continue;
            };
            let idx = self.graph.add_node(GcNode {
                id,
                ty: ty.clone(),
                kind: self.scene.kind(id).unwrap_or(NodeKind::Component),
                parent: None,
                enabled: self.scene.is_enabled(id),
                entrypoint: None,
            });
            self.index.insert(id, idx);
        }
    }

    fn add_hierarchy(&mut self) {
        for idx in self.graph.node_indices().collect_vec() {
            let id = self.graph[idx].id;
            let Some(parent) = self.scene.parent(id) else {
                continue;
            };
            match self.index.get(&parent) {
                Some(&parent_idx) => {
                    self.graph[idx].parent = Some(parent_idx);
                    self.graph.add_edge(idx, parent_idx, Dependency::hierarchy());
                }
                None => {
                    warn!("Node {} refers to missing parent {}", id, parent);
                    self.diagnostics
                        .push(Diagnostic::UnresolvedParent { node: id, parent });
                }
            }
        }
    }

    fn declare_dependencies(&mut self, input: &GcInput<'_, S>) {
        let scene: &dyn Scene = self.scene;
        for idx in self.graph.node_indices().collect_vec() {
            let id = self.graph[idx].id;
            let ty = self.graph[idx].ty.clone();
            let view = NodeView::new(scene, id);

            let plugin = match input.registry.lookup(&ty) {
                Ok(plugin) => plugin,
                Err(LookupError::Unregistered(_)) => {
                    trace!("No plugin for {}, keeping node {}", ty, id);
                    self.graph[idx].mark_entrypoint(EntrypointCause::Unregistered);
                    self.diagnostics
                        .push(Diagnostic::UnregisteredType { node: id, ty });
                    continue;
                }
                Err(LookupError::Ambiguous { candidates, .. }) => {
                    warn!("Ambiguous plugin for {} on node {}, keeping it", ty, id);
                    self.graph[idx].mark_entrypoint(EntrypointCause::Ambiguous);
                    self.diagnostics.push(Diagnostic::AmbiguousPluginResolution {
                        node: id,
                        ty,
                        candidates,
                    });
                    continue;
                }
            };

            let mut deps = DependencySink::new(id);
            let mut mutations = MutationSink::new(id);
            let result = run_plugin(plugin, &view, &mut deps, &mut mutations);

            // Declarations made before a failure are kept.
            if deps.is_entrypoint() {
                self.graph[idx].mark_entrypoint(EntrypointCause::Declared);
            }
            for edge in deps.into_edges() {
                self.add_declared_edge(id, edge);
            }
            for mutation in mutations.into_mutations() {
                self.add_declared_mutation(id, mutation);
            }

            if let Err(err) = result {
                warn!(
                    "Plugin {} failed on {} node {}, keeping it: {}",
                    plugin.name(),
                    ty,
                    id,
                    err
                );
                self.graph[idx].mark_entrypoint(EntrypointCause::CallbackFailure);
                self.diagnostics.push(Diagnostic::PluginCallbackFailure {
                    node: id,
                    ty,
                    error: err.to_string(),
                });
            }
        }
    }

    fn add_declared_edge(&mut self, declared_by: NodeId, edge: DeclaredEdge) {
        let (Some(&source), Some(&target)) =
            (self.index.get(&edge.source), self.index.get(&edge.target))
        else {
            let missing = if self.index.contains_key(&edge.source) {
                edge.target
            } else {
                edge.source
            };
            warn!(
                "Node {} declared an edge {} -> {} to missing node {}",
                declared_by, edge.source, edge.target, missing
            );
            self.diagnostics.push(Diagnostic::DanglingDeclaration {
                node: declared_by,
                target: missing,
            });
            return;
        };
        self.graph
            .add_edge(source, target, Dependency::declared(edge.flags));
    }

    fn add_declared_mutation(&mut self, writer: NodeId, mutation: DeclaredMutation) {
        let Some(&target) = self.index.get(&mutation.target) else {
            warn!(
                "Node {} declared a mutation of missing node {}",
                writer, mutation.target
            );
            self.diagnostics.push(Diagnostic::DanglingDeclaration {
                node: writer,
                target: mutation.target,
            });
            return;
        };
        let enabled = self.graph[target].kind.enabled_property();
        let property = match &mutation.property {
            MutatedProperty::Enabled => enabled,
            MutatedProperty::Path(property) => property.as_str(),
        };
        if self.mutations.add(target, property, writer) && property == enabled {
            add_writer_edge(self.graph, &self.index, target, writer);
        }
    }

    fn add_animations(&mut self, input: &GcInput<'_, S>) {
        let index = &self.index;
        let graph = &mut *self.graph;
        let mutations = &mut self.mutations;
        let mut unknown = 0;
        input.animations.for_each_record(&mut |node, property, writers| {
            let Some(&idx) = index.get(&node) else {
                unknown += 1;
                return;
            };
            let toggles = property == graph[idx].kind.enabled_property();
            for &writer in writers {
                if mutations.add(idx, property, writer) && toggles {
                    add_writer_edge(graph, index, idx, writer);
                }
            }
        });
        if unknown > 0 {
            trace!("Ignored {} animated properties of unknown nodes", unknown);
        }
    }
}

/// Whoever may enable `target` stays as long as something depends on `target` being enabled.
/// Writers outside the scene, such as animation clips, have no node to keep.
fn add_writer_edge(
    graph: &mut GcGraph,
    index: &FxHashMap<NodeId, NodeIdx>,
    target: NodeIdx,
    writer: NodeId,
) {
    match index.get(&writer) {
        Some(&writer_idx) if writer_idx != target => {
            graph.add_edge(target, writer_idx, Dependency::mutation());
        }
        _ => {}
    }
}

fn run_plugin(
    plugin: &dyn NodePlugin,
    view: &NodeView<'_>,
    deps: &mut DependencySink,
    mutations: &mut MutationSink,
) -> Result<(), PluginError> {
    let declared = plugin.declare_dependencies(view, deps);
    // Collected even if the dependencies failed.
    let mutated = plugin.declare_mutations(view, mutations);
    declared.and(mutated)
}

/// Maps the ids of the scene to the nodes of an analysis graph.
pub fn index_nodes(graph: &GcGraph) -> FxHashMap<NodeId, NodeIdx> {
    graph
        .node_indices()
        .map(|idx| (graph[idx].id, idx))
        .collect()
}
