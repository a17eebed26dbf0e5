use orrery::scene::{Camera, Curve, Scene, ViewContext};
use orrery::vrutil::{estimate_stable_curve_width, safe_ray_plane_intersection, DEFAULT_PLANE_ANGLE_THRESH};
use orrery_geom::{Frame, Quaternion, Ray3, Vec3};

fn view_down_neg_z() -> ViewContext {
    let pose = Frame::new(Vec3::zero(), Quaternion::look_forward(Vec3::neg_z(), Vec3::pos_y()));
    ViewContext::new(Camera::perspective(pose, 1.0, 1.0, 0.01, 100.0))
}

#[test]
fn curve_behind_the_viewer_has_no_width_estimate() {
    let view = view_down_neg_z();
    let scene = Scene::default();
    let behind: Vec<Vec3> = (0..40).map(|i| Vec3::new(i as f32 * 0.1 - 2.0, 0.0, 3.0)).collect();
    let width = estimate_stable_curve_width(&view, &scene, &Frame::identity(), &Curve::new(behind, false), 2.0);
    assert_eq!(width, 0.0);
}

#[test]
fn curve_in_view_has_positive_width() {
    let view = view_down_neg_z();
    let scene = Scene::default();
    let ahead: Vec<Vec3> = (0..20).map(|i| Vec3::new(i as f32 * 0.05 - 0.5, 0.0, -4.0)).collect();
    let width = estimate_stable_curve_width(&view, &scene, &Frame::identity(), &Curve::new(ahead, false), 2.0);
    assert!(width > 0.0);
}

#[test]
fn grazing_plane_hits_stay_bounded() {
    // horizontal plane through the origin seen from just above it
    let plane_origin = Vec3::zero();
    let normal = Vec3::pos_y();
    let forward = Vec3::neg_z();
    let mut farthest: f32 = 0.0;
    for k in 1..8 {
        let height = 10f32.powi(-k);
        let ray = Ray3::new(Vec3::new(0.0, height, 5.0), Vec3::new(0.3, -height * 1e-3, -1.0));
        let p = safe_ray_plane_intersection(&ray, forward, plane_origin, normal, DEFAULT_PLANE_ANGLE_THRESH);
        assert!(p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        farthest = farthest.max((p - plane_origin).magnitude());
    }
    assert!(farthest < 10.0, "grazing hit drifted to {}", farthest);
}

#[test]
fn steep_plane_hits_are_exact() {
    let ray = Ray3::new(Vec3::new(1.0, 4.0, 2.0), Vec3::neg_y());
    let p = safe_ray_plane_intersection(&ray, Vec3::neg_z(), Vec3::zero(), Vec3::pos_y(), DEFAULT_PLANE_ANGLE_THRESH);
    assert!(p.approx_eq(Vec3::new(1.0, 0.0, 2.0), 1e-5));
}
