mod support;

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use probeplan::{
    ProbeHandle, ProbeKind, ResolvedPose,
    collision::{ColliderOwner, CollisionEngine, CollisionWorld, probe_candidates},
    float_types::{Real, rapier3d::prelude::SharedShape},
};
use support::approx_eq;

fn upright_at(x: Real) -> ResolvedPose {
    ResolvedPose {
        tip: Point3::new(x, 0.0, 0.0),
        rotation: UnitQuaternion::identity(),
        up: Vector3::y(),
        forward: Vector3::z(),
        right: Vector3::x(),
    }
}

#[test]
fn candidate_count_follows_the_probe_kind() {
    let pose = upright_at(0.0);
    assert_eq!(probe_candidates(&ProbeKind::Neuropixels1.geometry(), &pose).len(), 2);
    assert_eq!(probe_candidates(&ProbeKind::Neuropixels24.geometry(), &pose).len(), 5);
    assert_eq!(probe_candidates(&ProbeKind::Ucla256F.geometry(), &pose).len(), 3);
    assert_eq!(probe_candidates(&ProbeKind::Pipette50.geometry(), &pose).len(), 1);
}

#[test]
fn body_sits_on_top_of_the_shank() {
    let geometry = ProbeKind::Neuropixels1.geometry();
    let candidates = probe_candidates(&geometry, &upright_at(0.0));
    let body = &candidates[1];
    assert!(approx_eq(body.position.translation.vector.y, 10.0 + 1.5, 1e-12));
}

#[test]
fn a_probe_never_collides_with_itself() {
    let geometry = ProbeKind::Neuropixels1.geometry();
    let mut world = CollisionWorld::new();
    world.set_probe_colliders(ProbeHandle(0), probe_candidates(&geometry, &upright_at(0.0)));
    assert_eq!(world.len(), 2);

    let mut moved = probe_candidates(&geometry, &upright_at(0.1));
    world.tag_candidates(ProbeHandle(0), &mut moved);
    assert!(moved.iter().all(|c| c.handle.is_some()));
    assert!(world.others_for(ProbeHandle(0)).is_empty());
    assert!(CollisionEngine::test(&moved, &world.others_for(ProbeHandle(0))).is_none());
}

#[test]
fn overlapping_bodies_are_a_hit() {
    let geometry = ProbeKind::Neuropixels1.geometry();
    let mut world = CollisionWorld::new();
    world.set_probe_colliders(ProbeHandle(0), probe_candidates(&geometry, &upright_at(0.0)));

    // bodies are 0.9 mm wide, 0.4 mm apart: 0.5 mm of overlap
    let close = probe_candidates(&geometry, &upright_at(0.4));
    let others = world.others_for(ProbeHandle(1));
    let hit = CollisionEngine::test(&close, &others).expect("bodies overlap");
    assert_eq!(hit.owner, ColliderOwner::Probe(ProbeHandle(0)));
    assert_eq!(hit.candidate, 1);
    assert!(approx_eq(hit.depth, 0.5, 1e-6), "{}", hit.depth);

    let all = CollisionEngine::contacts(&close, &others);
    assert_eq!(all.len(), 1);

    let far = probe_candidates(&geometry, &upright_at(5.0));
    assert!(CollisionEngine::test(&far, &others).is_none());
}

#[test]
fn touching_without_penetration_is_not_a_hit() {
    let geometry = ProbeKind::Neuropixels1.geometry();
    let mut world = CollisionWorld::new();
    world.set_probe_colliders(ProbeHandle(0), probe_candidates(&geometry, &upright_at(0.0)));
    let apart = probe_candidates(&geometry, &upright_at(0.95));
    assert!(CollisionEngine::test(&apart, &world.others_for(ProbeHandle(1))).is_none());
}

#[test]
fn committed_colliders_move_in_place() {
    let geometry = ProbeKind::Neuropixels1.geometry();
    let mut world = CollisionWorld::new();
    world.set_probe_colliders(ProbeHandle(3), probe_candidates(&geometry, &upright_at(0.0)));
    let handles = world.probe_colliders(ProbeHandle(3)).to_vec();

    world.set_probe_colliders(ProbeHandle(3), probe_candidates(&geometry, &upright_at(2.0)));
    assert_eq!(world.probe_colliders(ProbeHandle(3)), handles.as_slice());
    let shank = world.collider(handles[0]).unwrap();
    assert!(approx_eq(shank.position().translation.vector.x, 2.0, 1e-12));

    // a different layout rebuilds the set
    let four = ProbeKind::Neuropixels24.geometry();
    world.set_probe_colliders(ProbeHandle(3), probe_candidates(&four, &upright_at(2.0)));
    assert_eq!(world.probe_colliders(ProbeHandle(3)).len(), 5);
    assert_eq!(world.len(), 5);

    world.remove_probe(ProbeHandle(3));
    assert!(world.is_empty());
    assert!(world.probe_colliders(ProbeHandle(3)).is_empty());
}

#[test]
fn rigs_can_be_hidden_and_removed() {
    let geometry = ProbeKind::Neuropixels1.geometry();
    let mut world = CollisionWorld::new();
    let handle = world.add_rig_collider(
        "headframe",
        SharedShape::cuboid(2.0, 0.5, 2.0),
        Isometry3::translation(0.0, 5.0, 0.0),
    );
    assert_eq!(world.owner(handle), Some(&ColliderOwner::Rig("headframe".into())));

    let probe = probe_candidates(&geometry, &upright_at(0.0));
    let hit = CollisionEngine::test(&probe, &world.others_for(ProbeHandle(0))).expect("shank crosses the rig");
    assert_eq!(hit.other, handle);

    assert!(world.set_rig_visible("headframe", false));
    assert_eq!(world.rig_visible("headframe"), Some(false));
    assert!(CollisionEngine::test(&probe, &world.others_for(ProbeHandle(0))).is_none());

    assert!(world.set_rig_visible("headframe", true));
    assert!(world.remove_rig("headframe"));
    assert!(!world.remove_rig("headframe"));
    assert_eq!(world.rig_visible("headframe"), None);
    assert!(world.is_empty());
}
