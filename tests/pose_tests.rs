mod support;

use nalgebra::Vector3;
use probeplan::{
    AffineTransform, CoordinateTransform, IdentityTransform, PoseResolver, ProbeInsertion, ProbeKind,
    float_types::Real, pose::PendingDepth,
};
use std::sync::Arc;
use support::{approx_point, approx_vec, ccf};

fn insertion(transform: Arc<dyn CoordinateTransform>, angles: Vector3<Real>) -> ProbeInsertion {
    ProbeInsertion::new(Vector3::new(1.0, -1.5, 2.0), angles, ProbeKind::Neuropixels1, ccf(), transform)
}

#[test]
fn zero_angles_point_straight_down() {
    for transform in [
        Arc::new(IdentityTransform) as Arc<dyn CoordinateTransform>,
        Arc::new(AffineTransform::intuitive()),
        Arc::new(AffineTransform::dorr2008_ibl()),
    ] {
        let mut ins = insertion(transform, Vector3::zeros());
        let pose = PoseResolver::resolve(&mut ins, &mut PendingDepth::default());
        assert!(approx_vec(&pose.up, &Vector3::y(), 1e-9), "{}", ins.transform().name());
        assert!(approx_vec(&pose.forward, &Vector3::z(), 1e-9));
        assert!(approx_vec(&pose.right, &Vector3::x(), 1e-9));
    }
}

#[test]
fn resolving_twice_is_idempotent() {
    let mut ins = insertion(Arc::new(AffineTransform::qiu2018()), Vector3::new(35.0, -25.0, 10.0));
    let mut pending = PendingDepth::default();
    let first = PoseResolver::resolve(&mut ins, &mut pending);
    let apmldv = ins.apmldv();
    let second = PoseResolver::resolve(&mut ins, &mut pending);
    assert_eq!(first, second);
    assert_eq!(ins.apmldv(), apmldv);
    assert_eq!(PoseResolver::peek(&ins), first);
}

#[test]
fn pending_depth_is_folded_exactly_once() {
    let mut ins = insertion(Arc::new(IdentityTransform), Vector3::zeros());
    let before = PoseResolver::peek(&ins);

    let mut pending = PendingDepth::new(1.0);
    let driven = PoseResolver::resolve(&mut ins, &mut pending);
    assert!(pending.is_zero());
    // canonical DV grows downward
    assert!(approx_vec(&ins.apmldv(), &Vector3::new(1.0, -1.5, 3.0), 1e-12));
    assert!(approx_point(&driven.tip, &(before.tip - Vector3::y()), 1e-12));

    let again = PoseResolver::resolve(&mut ins, &mut pending);
    assert_eq!(again, driven);
}

#[test]
fn depth_follows_a_tilted_shaft() {
    let mut ins = insertion(Arc::new(IdentityTransform), Vector3::new(20.0, -30.0, 0.0));
    let before = PoseResolver::peek(&ins);
    let after = PoseResolver::resolve(&mut ins, &mut PendingDepth::new(2.0));
    let moved = after.tip - before.tip;
    assert!(approx_vec(&moved, &(-before.up * 2.0), 1e-9));
    assert!(approx_vec(&after.up, &before.up, 1e-12));
}

#[test]
fn frame_stays_orthonormal_under_anisotropic_scale() {
    for transform in [
        Arc::new(AffineTransform::qiu2018()) as Arc<dyn CoordinateTransform>,
        Arc::new(AffineTransform::dorr2008()),
    ] {
        let mut ins = insertion(transform, Vector3::new(30.0, -40.0, 15.0));
        let pose = PoseResolver::resolve(&mut ins, &mut PendingDepth::default());
        assert!((pose.up.norm() - 1.0).abs() < 1e-9);
        assert!((pose.forward.norm() - 1.0).abs() < 1e-9);
        assert!(pose.up.dot(&pose.forward).abs() < 1e-9);
        assert!(approx_vec(&(pose.rotation * Vector3::y()), &pose.up, 1e-9));
        assert!(approx_vec(&(pose.rotation * Vector3::z()), &pose.forward, 1e-9));
        assert!(approx_vec(&pose.right, &pose.up.cross(&pose.forward), 1e-9));
    }
}

#[test]
fn tip_matches_the_insertion_position() {
    let mut ins = insertion(Arc::new(AffineTransform::dorr2008()), Vector3::new(-15.0, -10.0, 0.0));
    let pose = PoseResolver::resolve(&mut ins, &mut PendingDepth::default());
    assert!(approx_point(&pose.tip, &ins.position_world(), 1e-12));
}

#[test]
fn four_shank_tips_sit_along_the_right_axis() {
    let mut ins = insertion(Arc::new(IdentityTransform), Vector3::new(90.0, 0.0, 0.0));
    let pose = PoseResolver::resolve(&mut ins, &mut PendingDepth::default());
    let geometry = ProbeKind::Neuropixels24.geometry();
    let tips = pose.shank_tips(&geometry);
    assert_eq!(tips.len(), 4);
    for (i, tip) in tips.iter().enumerate() {
        let expected = pose.tip + pose.right * (0.25 * i as Real);
        assert!(approx_point(tip, &expected, 1e-12));
    }
    assert!(approx_point(&pose.point_along_shank(3.0), &(pose.tip + pose.up * 3.0), 1e-12));
}
