use std::fs;
use std::sync::Arc;

use orrery::io::{
    ExportWorker, IOCode, JsonOutputStream, MeshExporter, OutputStream, SceneSerializer, SerializerOptions,
};
use orrery::scene::{Curve, KeyframeSequence, SOMaterial, Scene, SceneObject, SimpleMesh, Transform};
use orrery::Color;
use orrery_geom::{Frame, Vec2, Vec3};
use serde_json::Value;

fn sample_scene() -> Scene {
    let mut scene = Scene::default();
    let group = scene.add(SceneObject::new_group().with_transform(Transform::from_frame(Frame::from_origin(
        Vec3::new(0.0, 1.0, 0.0),
    ))));
    let mut cube = SceneObject::new_box(1.0, 2.0, 1.0);
    cube.set_name("cube");
    cube.assign_so_material(SOMaterial::standard("red", Color::red()));
    scene.add_child(group, cube).unwrap();

    let mut ball = SceneObject::new_sphere(0.5);
    ball.set_name("ball");
    let mut keys = KeyframeSequence::new();
    keys.add(0.0, Frame::identity());
    keys.add(1.0, Frame::from_origin(Vec3::new(0.0, 0.0, 2.0)));
    ball.set_keyframes(Some(keys));
    scene.add(ball);

    let curve = Curve::new(vec![Vec3::zero(), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)], false);
    let square = vec![
        Vec2::new(-0.05, -0.05),
        Vec2::new(0.05, -0.05),
        Vec2::new(0.05, 0.05),
        Vec2::new(-0.05, 0.05),
    ];
    let mut tube = SceneObject::new_poly_tube(curve, square);
    tube.set_name("tube");
    scene.add(tube);

    let mut marker = SceneObject::new_pivot();
    marker.set_temporary(true);
    scene.add(marker);
    scene
}

fn attr<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    node["attributes"]
        .as_array()?
        .iter()
        .find(|a| a["name"] == name)
        .map(|a| &a["value"])
}

#[test]
fn scene_file_has_one_struct_per_persistent_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    let serializer = SceneSerializer::new(SerializerOptions::default());
    serializer.write_file(&sample_scene(), &path).unwrap();

    let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let structs = doc["structs"].as_array().unwrap();
    let types: Vec<&str> = structs.iter().map(|s| attr(s, "SOType").unwrap().as_str().unwrap()).collect();
    assert_eq!(types, vec!["Group", "Sphere", "PolyTube"]);

    let group_children: Vec<&Value> = structs[0]["children"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["kind"] == "SceneObject")
        .collect();
    assert_eq!(group_children.len(), 1);
    assert_eq!(attr(group_children[0], "SOName").unwrap(), "cube");

    let ball = &structs[1];
    assert!(ball["id"].as_str().map_or(false, |id| id.len() == 36));
    let keys = ball["children"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["kind"] == "KeyframeList")
        .unwrap();
    assert_eq!(keys["children"].as_array().unwrap().len(), 2);
}

#[test]
fn stream_can_be_driven_by_hand() {
    let mut out = JsonOutputStream::new();
    out.begin_struct("Header", None);
    out.add_attribute("Version", orrery::io::AttrValue::Int(1), false);
    out.end_struct();
    SceneSerializer::new(SerializerOptions::default())
        .store(&sample_scene(), &mut out)
        .unwrap();
    assert!(out.is_balanced());
    assert_eq!(out.structs().len(), 4);
    assert_eq!(out.structs()[0].kind, "Header");
}

#[test]
fn face_groups_leave_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.obj");
    fs::write(&path, "previous").unwrap();

    let exporter = MeshExporter {
        write_face_groups: true,
        background: false,
        ..MeshExporter::default()
    };
    let mut status = exporter.export(&sample_scene(), &path, None);
    assert!(!status.is_computing());
    assert_eq!(status.wait().code, IOCode::UnsupportedFeature);
    assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn background_export_writes_one_object_per_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.obj");
    let worker = ExportWorker::new(2);
    let mut scene = sample_scene();

    let mut status = MeshExporter::new().export(&scene, &path, Some(&worker));
    // later edits never reach the queued write
    let extra = SceneObject::new_mesh(Arc::new(SimpleMesh::new_box(Vec3::one())));
    scene.add(extra);

    let result = status.wait().clone();
    assert_eq!(result.code, IOCode::Ok, "{}", result.message);
    assert_eq!(status.progress(), (3, 3));

    let text = fs::read_to_string(&path).unwrap();
    let objects: Vec<&str> = text.lines().filter(|l| l.starts_with("o ")).collect();
    assert_eq!(objects, vec!["o cube", "o ball", "o tube"]);
    assert!(text.lines().any(|l| l.starts_with("vn ")));
}

#[test]
fn failed_export_reports_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("scene.obj");
    let worker = ExportWorker::new(1);
    let mut status = MeshExporter::new().export(&sample_scene(), &path, Some(&worker));
    assert_eq!(status.wait().code, IOCode::WriteError);
    assert!(!status.is_ok());
}
