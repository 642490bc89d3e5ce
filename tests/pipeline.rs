use scenegc_engine::{
    Activeness, Collector, EntrypointCause, ExternalReference, GcOptions, MappedObject,
    TaskMonitor,
};
use scenegc_plugins::{default_entrypoints, default_registry};
use scenegc_scene::{AnimatedProperties, MemoryScene, NodeId, Scene};
use serde_json::json;

fn avatar() -> MemoryScene {
    let scene = json!({
        "nodes": [
            { "id": 0, "type": "Transform", "kind": "transform" },
            { "id": 1, "type": "AvatarDescriptor", "kind": "component", "parent": 0,
              "fields": { "view_anchor": { "ref": 3 } } },
            { "id": 2, "type": "Transform", "kind": "transform", "parent": 0 },
            { "id": 3, "type": "Transform", "kind": "transform", "parent": 2 },
            { "id": 4, "type": "Transform", "kind": "transform", "parent": 2 },
            { "id": 5, "type": "Transform", "kind": "transform", "parent": 0 },
            { "id": 6, "type": "SkinnedMeshRenderer", "kind": "component", "parent": 5,
              "fields": { "root_bone": { "ref": 4 }, "bones": { "refs": [4, 3, null] } } },
            { "id": 7, "type": "Transform", "kind": "transform", "parent": 3, "enabled": false },
            { "id": 8, "type": "MeshRenderer", "kind": "component", "parent": 7 },
            { "id": 9, "type": "Animator", "kind": "component", "parent": 0,
              "fields": { "avatar_root": { "ref": 0 }, "drives": { "refs": [7] } } },
            { "id": 10, "type": "Transform", "kind": "transform", "parent": 0, "enabled": false },
            { "id": 11, "type": "MeshRenderer", "kind": "component", "parent": 10 },
            { "id": 12, "type": "PhysBone", "kind": "component", "parent": 10,
              "fields": { "colliders": { "refs": [15] } } },
            { "id": 13, "type": "ParentConstraint", "kind": "component", "parent": 7,
              "fields": { "sources": { "refs": [3] } } },
            { "id": 14, "type": "Transform", "kind": "transform", "parent": 0 },
            { "id": 15, "type": "PhysBoneCollider", "kind": "component", "parent": 14 }
        ]
    });
    serde_json::from_value(scene).unwrap()
}

#[test]
fn prune_avatar() {
    let mut scene = avatar();
    let registry = default_registry().unwrap();
    let entrypoints = default_entrypoints();
    let animations = AnimatedProperties::new();

    let outcome = Collector::new(&registry, &entrypoints)
        .collect(
            &mut scene,
            &animations,
            &GcOptions::parse("--report"),
            TaskMonitor::new(),
        )
        .unwrap();
    let analysis = &outcome.analysis;

    assert!(analysis.diagnostics().is_empty(), "{:?}", analysis.diagnostics());
    assert_eq!(
        analysis.node(NodeId(1)).unwrap().entrypoint,
        Some(EntrypointCause::Declared)
    );
    assert_eq!(analysis.activeness(NodeId(8)), Some(Activeness::Variable));
    assert_eq!(analysis.activeness(NodeId(13)), Some(Activeness::Variable));
    assert_eq!(analysis.activeness(NodeId(12)), Some(Activeness::AlwaysInactive));

    let pruned: Vec<NodeId> = analysis.report().pruned_ids().collect();
    assert_eq!(pruned, [NodeId(12), NodeId(14), NodeId(15)]);

    let mapping = outcome.mapping.as_ref().unwrap();
    assert_eq!(mapping.removed_count(), 3);
    assert_eq!(mapping.get(NodeId(13)), Some(MappedObject::Kept(NodeId(13))));
    assert_eq!(scene.len(), 13);
    for removed in [12, 14, 15] {
        assert!(!scene.contains(NodeId(removed)));
    }

    let bindings = [ExternalReference {
        holder: NodeId(9),
        target: Some(NodeId(12)),
        property: Some("m_Enabled".to_string()),
    }];
    let (rewritten, diagnostics) = mapping.rewrite_references(&bindings);
    assert_eq!(rewritten[0].target, None);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn animation_index_keeps_toggled_physbone() {
    let mut scene = avatar();
    let registry = default_registry().unwrap();
    let entrypoints = default_entrypoints();
    // Something toggles the disabled prop at runtime, so its bone and collider stay.
    let mut animations = AnimatedProperties::new();
    animations.add_writer(NodeId(10), "m_IsActive", NodeId(9));

    let outcome = Collector::new(&registry, &entrypoints)
        .collect(
            &mut scene,
            &animations,
            &GcOptions::default(),
            TaskMonitor::new(),
        )
        .unwrap();

    assert_eq!(
        outcome.analysis.activeness(NodeId(12)),
        Some(Activeness::Variable)
    );
    assert_eq!(outcome.removed_count(), 0);
    assert_eq!(scene.len(), 16);
}

#[test]
fn pruned_scene_serializes() {
    let mut scene = avatar();
    let registry = default_registry().unwrap();
    let entrypoints = default_entrypoints();
    Collector::new(&registry, &entrypoints)
        .collect(&mut scene, &(), &GcOptions::default(), TaskMonitor::new())
        .unwrap();

    let json = serde_json::to_value(&scene).unwrap();
    let reloaded: MemoryScene = serde_json::from_value(json).unwrap();
    assert_eq!(reloaded.node_ids(), scene.node_ids());
}
