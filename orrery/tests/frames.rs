use orrery::scene::{CoordSpace, SceneObject, Scene, SpatialNode, Transform, Transformable};
use orrery_geom::{Frame, Quaternion, Ray3, Vec3};

fn same_frame(a: &Frame, b: &Frame) -> bool {
    const EPS: f32 = 1e-4;
    a.origin.approx_eq(b.origin, EPS)
        && a.x().approx_eq(b.x(), EPS)
        && a.y().approx_eq(b.y(), EPS)
        && a.z().approx_eq(b.z(), EPS)
}

fn frames() -> Vec<Frame> {
    vec![
        Frame::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::axis_angle_deg(Vec3::pos_y(), 90.0)),
        Frame::new(Vec3::new(0.0, 2.0, 0.5), Quaternion::axis_angle_deg(Vec3::pos_x(), 30.0)),
        Frame::new(Vec3::new(-0.5, 0.0, 3.0), Quaternion::axis_angle_deg(Vec3::new(1.0, 1.0, 0.0).normalized(), 45.0)),
        Frame::from_origin(Vec3::new(0.0, 0.0, -1.0)),
    ]
}

#[test]
fn world_frame_composes_every_ancestor() {
    let root = Frame::new(Vec3::new(0.0, 1.5, 0.0), Quaternion::axis_angle_deg(Vec3::pos_z(), 20.0));
    let mut scene = Scene::default();
    scene.set_root_transform(root, 1.0).unwrap();

    let mut parent = None;
    let mut expected_scene = Frame::identity();
    for f in frames() {
        let so = SceneObject::new_group().with_transform(Transform::from_frame(f));
        let id = match parent {
            None => scene.add(so),
            Some(p) => scene.add_child(p, so).unwrap(),
        };
        expected_scene = expected_scene.compose(&f);

        let node = scene.node(id).unwrap();
        assert!(same_frame(&node.local_frame(CoordSpace::Object).unwrap(), &f));
        assert!(same_frame(&node.local_frame(CoordSpace::Scene).unwrap(), &expected_scene));
        assert!(same_frame(&node.local_frame(CoordSpace::World).unwrap(), &root.compose(&expected_scene)));
        parent = Some(id);
    }
}

#[test]
fn scene_frame_round_trips_under_scaled_parents() {
    let mut scene = Scene::default();
    let a = scene.add(SceneObject::new_group().with_transform(Transform::new(frames()[0], Vec3::new(2.0, 0.5, 1.0))));
    let b = scene
        .add_child(a, SceneObject::new_group().with_transform(Transform::new(frames()[1], Vec3::splat(3.0))))
        .unwrap();
    let c = scene.add_child(b, SceneObject::new_box(1.0, 1.0, 1.0)).unwrap();

    for target in frames() {
        for &id in &[a, b, c] {
            let mut node = scene.node_mut(id).unwrap();
            node.set_local_frame(target, CoordSpace::Scene).unwrap();
            assert!(same_frame(&node.local_frame(CoordSpace::Scene).unwrap(), &target));
        }
    }
}

#[test]
fn world_frame_round_trips_under_scaled_root() {
    let mut scene = Scene::default();
    scene.set_root_transform(frames()[2], 0.25).unwrap();
    let a = scene.add(SceneObject::new_sphere(1.0));
    let b = scene.add_child(a, SceneObject::new_pivot()).unwrap();
    let target = frames()[1];
    let mut node = scene.node_mut(b).unwrap();
    node.set_local_frame(target, CoordSpace::World).unwrap();
    assert!(same_frame(&node.local_frame(CoordSpace::World).unwrap(), &target));
}

#[test]
fn unit_sphere_hit_from_above_the_pole() {
    let mut scene = Scene::default();
    let id = scene.add(SceneObject::new_sphere(1.0));
    let ray = Ray3::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
    let hit = scene.find_ray_intersection(&ray).unwrap().unwrap();
    assert_eq!(hit.object, id);
    assert!(hit.point.approx_eq(Vec3::new(0.0, 0.0, 1.0), 1e-5));
    assert!(hit.normal.approx_eq(Vec3::pos_z(), 1e-5));
    assert!((hit.t - 4.0).abs() < 1e-5);
}

#[test]
fn ray_misses_when_objects_are_behind() {
    let mut scene = Scene::default();
    scene.add(SceneObject::new_sphere(1.0));
    let ray = Ray3::new(Vec3::new(0.0, 0.0, 5.0), Vec3::pos_z());
    assert!(scene.find_ray_intersection(&ray).unwrap().is_none());
}
