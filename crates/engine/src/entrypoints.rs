use crate::graph::EntrypointCause;
use crate::registry::NodeView;
use rustc_hash::FxHashSet;
use scenegc_scene::TypeTag;

type InstancePredicate = Box<dyn Fn(&NodeView<'_>) -> bool + Send + Sync>;

/// Nodes that are kept regardless of what depends on them.
///
/// Plugins can mark their own nodes as entrypoints while declaring dependencies. This registry
/// adds the structural ones on top: hierarchy roots, an allow-list of types and arbitrary
/// per-instance predicates.
pub struct EntrypointRegistry {
    types: FxHashSet<TypeTag>,
    predicates: Vec<(&'static str, InstancePredicate)>,
    roots: bool,
}

impl Default for EntrypointRegistry {
    fn default() -> Self {
        EntrypointRegistry {
            types: FxHashSet::default(),
            predicates: Vec::new(),
            roots: true,
        }
    }
}

impl EntrypointRegistry {
    pub fn new() -> EntrypointRegistry {
        Default::default()
    }

    pub fn add_type(&mut self, ty: impl Into<TypeTag>) {
        self.types.insert(ty.into());
    }

    pub fn add_predicate(
        &mut self,
        name: &'static str,
        predicate: impl Fn(&NodeView<'_>) -> bool + Send + Sync + 'static,
    ) {
        self.predicates.push((name, Box::new(predicate)));
    }

    /// Whether nodes without a parent are entrypoints. Enabled by default.
    pub fn set_roots_are_entrypoints(&mut self, roots: bool) {
        self.roots = roots;
    }

    pub fn contains_type(&self, ty: &TypeTag) -> bool {
        self.types.contains(ty)
    }

    pub fn classify(&self, node: &NodeView<'_>) -> Option<EntrypointCause> {
        if self.roots && node.parent().is_none() {
            return Some(EntrypointCause::Root);
        }
        if node.node_type().is_some_and(|ty| self.types.contains(ty)) {
            return Some(EntrypointCause::FixedType);
        }
        self.predicates
            .iter()
            .find(|(_, predicate)| predicate(node))
            .map(|&(name, _)| EntrypointCause::Predicate(name))
    }
}
