//! Dependency declarations for the component types of a typical avatar scene.

mod animator;
mod basic;
mod constraint;
mod descriptor;
mod physbone;
mod renderer;

pub use animator::AnimatorPlugin;
pub use basic::{BehaviourPlugin, TransformPlugin};
pub use constraint::ConstraintPlugin;
pub use descriptor::AvatarDescriptorPlugin;
pub use physbone::{PhysBoneColliderPlugin, PhysBonePlugin};
pub use renderer::{RendererPlugin, SkinnedMeshRendererPlugin};

use scenegc_engine::{EntrypointRegistry, NodeRegistry, NodeView, RegistryError};
use scenegc_scene::FieldValue;
use tracing::debug;

pub mod types {
    use scenegc_scene::TypeTag;

    pub const COMPONENT: TypeTag = TypeTag::from_static("Component");
    pub const TRANSFORM: TypeTag = TypeTag::from_static("Transform");
    pub const BEHAVIOUR: TypeTag = TypeTag::from_static("Behaviour");
    pub const ANIMATOR: TypeTag = TypeTag::from_static("Animator");
    pub const RENDERER: TypeTag = TypeTag::from_static("Renderer");
    pub const MESH_RENDERER: TypeTag = TypeTag::from_static("MeshRenderer");
    pub const SKINNED_MESH_RENDERER: TypeTag = TypeTag::from_static("SkinnedMeshRenderer");
    pub const CONSTRAINT: TypeTag = TypeTag::from_static("Constraint");
    pub const PARENT_CONSTRAINT: TypeTag = TypeTag::from_static("ParentConstraint");
    pub const POSITION_CONSTRAINT: TypeTag = TypeTag::from_static("PositionConstraint");
    pub const ROTATION_CONSTRAINT: TypeTag = TypeTag::from_static("RotationConstraint");
    pub const AIM_CONSTRAINT: TypeTag = TypeTag::from_static("AimConstraint");
    pub const PHYS_BONE: TypeTag = TypeTag::from_static("PhysBone");
    pub const PHYS_BONE_COLLIDER: TypeTag = TypeTag::from_static("PhysBoneCollider");
    pub const AVATAR_DESCRIPTOR: TypeTag = TypeTag::from_static("AvatarDescriptor");
}

/// Bool field that pins a node regardless of its type.
pub const KEEP_FIELD: &str = "keep";

fn declare_type_hierarchy(registry: &mut NodeRegistry) {
    use types::*;

    registry.declare_supertypes(TRANSFORM, [COMPONENT]);
    registry.declare_supertypes(BEHAVIOUR, [COMPONENT]);
    registry.declare_supertypes(RENDERER, [COMPONENT]);

    for ty in [ANIMATOR, CONSTRAINT, PHYS_BONE, PHYS_BONE_COLLIDER, AVATAR_DESCRIPTOR] {
        registry.declare_supertypes(ty, [BEHAVIOUR]);
    }
    for ty in [
        PARENT_CONSTRAINT,
        POSITION_CONSTRAINT,
        ROTATION_CONSTRAINT,
        AIM_CONSTRAINT,
    ] {
        registry.declare_supertypes(ty, [CONSTRAINT]);
    }
    registry.declare_supertypes(MESH_RENDERER, [RENDERER]);
    registry.declare_supertypes(SKINNED_MESH_RENDERER, [RENDERER]);
}

/// Builds a registry with every bundled plugin.
pub fn default_registry() -> Result<NodeRegistry, RegistryError> {
    let mut registry = NodeRegistry::new();
    declare_type_hierarchy(&mut registry);

    registry.register(types::TRANSFORM, TransformPlugin)?;
    registry.register(types::BEHAVIOUR, BehaviourPlugin)?;
    registry.register(types::ANIMATOR, AnimatorPlugin)?;
    registry.register(types::RENDERER, RendererPlugin)?;
    registry.register(types::SKINNED_MESH_RENDERER, SkinnedMeshRendererPlugin)?;
    registry.register(types::CONSTRAINT, ConstraintPlugin)?;
    registry.register(types::PHYS_BONE, PhysBonePlugin)?;
    registry.register(types::PHYS_BONE_COLLIDER, PhysBoneColliderPlugin)?;
    registry.register(types::AVATAR_DESCRIPTOR, AvatarDescriptorPlugin)?;

    debug!("Registered {} bundled plugins", registry.len());
    Ok(registry)
}

fn is_marked_keep(node: &NodeView<'_>) -> bool {
    matches!(node.field(KEEP_FIELD), Some(FieldValue::Bool(true)))
}

/// Avatar descriptors and nodes with `keep: true` are always kept.
pub fn default_entrypoints() -> EntrypointRegistry {
    let mut entrypoints = EntrypointRegistry::new();
    entrypoints.add_type(types::AVATAR_DESCRIPTOR);
    entrypoints.add_predicate("marked_keep", is_marked_keep);
    entrypoints
}
