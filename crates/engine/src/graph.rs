use bitflags::bitflags;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use scenegc_scene::{NodeId, NodeKind, TypeTag};
use serde::Serialize;
use std::fmt;

pub type NodeIdx = NodeIndex;

bitflags! {
    /// Qualifiers of a dependency edge.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EdgeFlags: u8 {
        /// The edge is followed even when the source can never be active.
        const EVEN_IF_SOURCE_DISABLED = 1 << 0;
        /// The edge only keeps the target alive if the target can be active.
        const ONLY_IF_TARGET_CAN_BE_ENABLED = 1 << 1;
    }
}

impl EdgeFlags {
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Structural containment: a node needs its parent to exist.
    Hierarchy,
    /// Declared by the plugin of a node type.
    Dependency,
    /// A node whose enabled flag is written at runtime needs its writer.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub kind: EdgeKind,
    pub flags: EdgeFlags,
}

impl Dependency {
    pub fn hierarchy() -> Dependency {
        Dependency {
            kind: EdgeKind::Hierarchy,
            flags: EdgeFlags::EVEN_IF_SOURCE_DISABLED,
        }
    }

    pub fn declared(flags: EdgeFlags) -> Dependency {
        Dependency {
            kind: EdgeKind::Dependency,
            flags,
        }
    }

    pub fn mutation() -> Dependency {
        Dependency {
            kind: EdgeKind::Mutation,
            flags: EdgeFlags::EVEN_IF_SOURCE_DISABLED,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EdgeKind::Hierarchy => write!(f, "H")?,
            EdgeKind::Mutation => write!(f, "M")?,
            EdgeKind::Dependency => {}
        }
        if self.flags.contains(EdgeFlags::EVEN_IF_SOURCE_DISABLED) {
            write!(f, "E")?;
        }
        if self.flags.contains(EdgeFlags::ONLY_IF_TARGET_CAN_BE_ENABLED) {
            write!(f, "T")?;
        }
        Ok(())
    }
}

/// Why a node was seeded as live before marking.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntrypointCause {
    /// The node's plugin marked it.
    Declared,
    /// The node's type is on the entrypoint allow-list.
    FixedType,
    /// An instance predicate of the entrypoint registry matched.
    Predicate(&'static str),
    /// The node has no parent.
    Root,
    /// No plugin is registered for the node's type.
    Unregistered,
    /// The node's type resolves to more than one plugin.
    Ambiguous,
    /// The node's plugin failed.
    CallbackFailure,
}

impl fmt::Display for EntrypointCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrypointCause::Declared => write!(f, "declared"),
            EntrypointCause::FixedType => write!(f, "fixed_type"),
            EntrypointCause::Predicate(name) => write!(f, "predicate({})", name),
            EntrypointCause::Root => write!(f, "root"),
            EntrypointCause::Unregistered => write!(f, "unregistered"),
            EntrypointCause::Ambiguous => write!(f, "ambiguous"),
            EntrypointCause::CallbackFailure => write!(f, "callback_failure"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GcNode {
    pub id: NodeId,
    pub ty: TypeTag,
    pub kind: NodeKind,
    pub parent: Option<NodeIdx>,
    pub enabled: bool,
    pub entrypoint: Option<EntrypointCause>,
}

impl GcNode {
    pub fn is_entrypoint(&self) -> bool {
        self.entrypoint.is_some()
    }

    /// Marks the node as an entrypoint, keeping the first cause.
    pub fn mark_entrypoint(&mut self, cause: EntrypointCause) {
        self.entrypoint.get_or_insert(cause);
    }
}

impl fmt::Display for GcNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.ty, self.id)?;
        if !self.enabled {
            write!(f, " (disabled)")?;
        }
        if self.is_entrypoint() {
            write!(f, " *")?;
        }
        Ok(())
    }
}

pub type GcGraph = StableGraph<GcNode, Dependency>;
