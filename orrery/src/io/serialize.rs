//! Scene serializer: emits every persistent object as a struct tree

use std::env;
use std::path::{Component, Path, PathBuf};

use orrery_geom::{Vec2, Vec3};

use crate::scene::{
    KeyframeSequence, MeshPart, SOGeometry, SOId, SOMaterial, SOMaterialType, Scene, SimpleMesh,
    Transform,
};

use super::stream::{AttrValue, JsonOutputStream, OutputStream};
use super::{write_atomic, SerializeError};

pub const SCENE_OBJECT_STRUCT: &str = "SceneObject";
pub const TRANSFORM_STRUCT: &str = "Transform";
pub const MATERIAL_STRUCT: &str = "Material";
pub const ASCII_MESH_STRUCT: &str = "AsciiMesh";
pub const BINARY_MESH_STRUCT: &str = "BinaryMesh";
pub const MESH_PART_STRUCT: &str = "MeshPart";
pub const KEYFRAME_LIST_STRUCT: &str = "KeyframeList";
pub const KEYFRAME_STRUCT: &str = "Keyframe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Mesh buffers as base64 binary instead of literal lists.
    pub binary_meshes: bool,
    pub include_keyframes: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        SerializerOptions {
            binary_meshes: true,
            include_keyframes: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneSerializer {
    pub options: SerializerOptions,
    /// File the output is destined for. Mesh reference paths are also
    /// written relative to its directory.
    pub target_file_path: Option<PathBuf>,
}

impl SceneSerializer {
    pub fn new(options: SerializerOptions) -> SceneSerializer {
        SceneSerializer {
            options,
            target_file_path: None,
        }
    }

    pub fn store(&self, scene: &Scene, out: &mut dyn OutputStream) -> Result<(), SerializeError> {
        self.store_with_target(scene, out, self.target_file_path.as_deref())
    }

    /// Serializes to JSON and replaces `path` atomically.
    pub fn write_file<P: AsRef<Path>>(&self, scene: &Scene, path: P) -> Result<(), SerializeError> {
        let path = path.as_ref();
        let mut out = JsonOutputStream::new();
        self.store_with_target(scene, &mut out, Some(path))?;
        let text = out.to_string_pretty()?;
        write_atomic(path, |w| w.write_all(text.as_bytes()))?;
        log::info!("Wrote scene with {} objects to {}", scene.len(), path.display());
        Ok(())
    }

    fn store_with_target(
        &self,
        scene: &Scene,
        out: &mut dyn OutputStream,
        target: Option<&Path>,
    ) -> Result<(), SerializeError> {
        let emitter = Emitter {
            scene,
            options: self.options,
            target,
        };
        for &id in scene.root_objects() {
            emitter.emit_object(out, id, 0)?;
        }
        Ok(())
    }
}

struct Emitter<'a> {
    scene: &'a Scene,
    options: SerializerOptions,
    target: Option<&'a Path>,
}

impl<'a> Emitter<'a> {
    fn emit_object(&self, o: &mut dyn OutputStream, id: SOId, depth: usize) -> Result<(), SerializeError> {
        if depth > self.scene.len() {
            return Err(crate::scene::SceneError::CyclicHierarchy(id).into());
        }
        let so = self.scene.get(id)?;
        if so.is_temporary() {
            return Ok(());
        }
        let uuid = so.uuid().to_string();
        o.begin_struct(SCENE_OBJECT_STRUCT, Some(&uuid));
        o.add_attribute("SOType", so.so_type().identifier().into(), false);
        o.add_attribute("SOName", so.name().into(), false);
        emit_transform(o, so.transform());

        match so.geometry() {
            SOGeometry::Box { width, height, depth } => {
                o.add_attribute("Width", (*width).into(), false);
                o.add_attribute("Height", (*height).into(), false);
                o.add_attribute("Depth", (*depth).into(), false);
                emit_material(o, so.assigned_so_material());
            }
            SOGeometry::Sphere { radius } => {
                o.add_attribute("Radius", (*radius).into(), false);
                emit_material(o, so.assigned_so_material());
            }
            SOGeometry::Cylinder { radius, height } => {
                o.add_attribute("Radius", (*radius).into(), false);
                o.add_attribute("Height", (*height).into(), false);
                let t = so.transform();
                let half = t.frame().y() * (0.5 * height * t.scale().y);
                o.add_attribute("StartPoint", (t.frame().origin - half).into(), false);
                o.add_attribute("EndPoint", (t.frame().origin + half).into(), false);
                emit_material(o, so.assigned_so_material());
            }
            SOGeometry::Pivot => emit_material(o, so.assigned_so_material()),
            SOGeometry::Mesh(mesh) => self.emit_mesh(o, mesh),
            SOGeometry::MeshReference { path, .. } => {
                let absolute = absolute_path(path);
                o.add_attribute("ReferencePath", absolute.to_string_lossy().as_ref().into(), false);
                let relative = self
                    .target
                    .and_then(|t| t.parent())
                    .and_then(|dir| relative_path(&absolute_path(dir), &absolute));
                if let Some(rel) = relative {
                    o.add_attribute("RelReferencePath", rel.to_string_lossy().as_ref().into(), false);
                }
            }
            SOGeometry::PolyCurve(curve) => {
                emit_material(o, so.assigned_so_material());
                o.add_attribute("PolyCurve", AttrValue::Vec3List(curve.vertices().to_vec()), false);
                o.add_attribute("PolyCurveClosed", curve.is_closed().into(), false);
            }
            SOGeometry::PolyTube { curve, polygon, .. } => {
                emit_material(o, so.assigned_so_material());
                o.add_attribute("PolyCurve", AttrValue::Vec3List(curve.vertices().to_vec()), false);
                o.add_attribute("PolyCurveClosed", curve.is_closed().into(), false);
                o.add_attribute("Polygon", AttrValue::Vec2List(polygon.clone()), false);
            }
            SOGeometry::Group => {}
            SOGeometry::Wrapper { parts, .. } => {
                for part in parts {
                    self.emit_part(o, part);
                }
                emit_material(o, so.assigned_so_material());
            }
            SOGeometry::Unknown => {}
        }

        // Any object may parent others, not only groups.
        for &child in so.children() {
            self.emit_object(o, child, depth + 1)?;
        }

        if self.options.include_keyframes {
            if let Some(keys) = so.keyframes().filter(|k| !k.is_empty()) {
                emit_keyframes(o, keys);
            }
        }
        o.end_struct();
        Ok(())
    }

    fn emit_part(&self, o: &mut dyn OutputStream, part: &MeshPart) {
        o.begin_struct(MESH_PART_STRUCT, None);
        o.add_attribute("SOName", part.name.as_str().into(), false);
        emit_transform(o, &part.transform);
        self.emit_mesh(o, &part.mesh);
        o.end_struct();
    }

    fn emit_mesh(&self, o: &mut dyn OutputStream, mesh: &SimpleMesh) {
        if self.options.binary_meshes {
            emit_mesh_binary(o, mesh);
        } else {
            emit_mesh_ascii(o, mesh);
        }
    }
}

fn emit_transform(o: &mut dyn OutputStream, t: &Transform) {
    o.begin_struct(TRANSFORM_STRUCT, None);
    o.add_attribute("Position", t.frame().origin.into(), false);
    o.add_attribute("Orientation", t.frame().rotation.into(), false);
    o.add_attribute("Scale", t.scale().into(), false);
    o.end_struct();
}

fn emit_material(o: &mut dyn OutputStream, m: &SOMaterial) {
    let kind = match m.kind {
        SOMaterialType::StandardRGBColor => "Standard",
        SOMaterialType::TransparentRGBColor => "Transparent",
    };
    o.begin_struct(MATERIAL_STRUCT, None);
    o.add_attribute("MaterialType", kind.into(), false);
    o.add_attribute("MaterialName", m.name.as_str().into(), false);
    o.add_attribute("RGBColor", m.rgb_color.into(), false);
    o.end_struct();
}

fn emit_keyframes(o: &mut dyn OutputStream, keys: &KeyframeSequence) {
    let (start, end) = keys.valid_range();
    o.begin_struct(KEYFRAME_LIST_STRUCT, None);
    o.add_attribute("TimeRange", Vec2::new(start as f32, end as f32).into(), false);
    for (i, key) in keys.iter().enumerate() {
        o.begin_struct(KEYFRAME_STRUCT, Some(&i.to_string()));
        o.add_attribute("Time", AttrValue::Float(key.time as f32), true);
        o.add_attribute("Position", key.frame.origin.into(), true);
        o.add_attribute("Orientation", key.frame.rotation.into(), true);
        o.end_struct();
    }
    o.end_struct();
}

fn color_rgb(mesh: &SimpleMesh) -> Option<Vec<Vec3>> {
    mesh.colors().map(|cs| cs.iter().map(|&c| -> Vec3 { c.into() }).collect())
}

fn emit_mesh_ascii(o: &mut dyn OutputStream, mesh: &SimpleMesh) {
    o.begin_struct(ASCII_MESH_STRUCT, None);
    o.add_attribute("Vertices", AttrValue::Vec3List(mesh.vertices().to_vec()), false);
    if let Some(n) = mesh.normals() {
        o.add_attribute("Normals", AttrValue::Vec3List(n.to_vec()), false);
    }
    if let Some(c) = color_rgb(mesh) {
        o.add_attribute("Colors", AttrValue::Vec3List(c), false);
    }
    if let Some(uv) = mesh.uvs() {
        o.add_attribute("UVs", AttrValue::Vec2List(uv.to_vec()), false);
    }
    let tris = mesh.triangles().iter().flat_map(|t| t.iter().map(|&i| i as i64)).collect();
    o.add_attribute("Triangles", AttrValue::IntList(tris), false);
    o.end_struct();
}

fn emit_mesh_binary(o: &mut dyn OutputStream, mesh: &SimpleMesh) {
    let v3 = |vs: &[Vec3]| pack(vs.len(), vs.iter().flat_map(|v| vec![v.x, v.y, v.z]));
    o.begin_struct(BINARY_MESH_STRUCT, None);
    o.add_attribute("Vertices", AttrValue::Bytes(v3(mesh.vertices())), false);
    if let Some(n) = mesh.normals() {
        o.add_attribute("Normals", AttrValue::Bytes(v3(n)), false);
    }
    if let Some(c) = color_rgb(mesh) {
        o.add_attribute("Colors", AttrValue::Bytes(v3(&c)), false);
    }
    if let Some(uv) = mesh.uvs() {
        let buf = pack(uv.len(), uv.iter().flat_map(|v| vec![v.x, v.y]));
        o.add_attribute("UVs", AttrValue::Bytes(buf), false);
    }
    let tris = mesh.triangles();
    let mut buf = Vec::with_capacity(4 + tris.len() * 12);
    buf.extend_from_slice(&(tris.len() as u32).to_le_bytes());
    for i in tris.iter().flatten() {
        buf.extend_from_slice(&(*i as i32).to_le_bytes());
    }
    o.add_attribute("TrianglesBinary", AttrValue::Bytes(buf), false);
    o.end_struct();
}

/// Element count as u32 LE, then the values as f32 LE.
fn pack<I: Iterator<Item = f32>>(count: usize, values: I) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(count as u32).to_le_bytes());
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Path of `to` relative to the directory `from`. Both must be absolute and
/// share a root.
pub(crate) fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    if !from.is_absolute() || !to.is_absolute() {
        return None;
    }
    fn norm(p: &Path) -> Vec<Component<'_>> {
        p.components().filter(|c| *c != Component::CurDir).collect()
    }
    let (a, b) = (norm(from), norm(to));
    if a.first() != b.first() {
        return None;
    }
    let common = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let mut rel = PathBuf::new();
    for _ in common..a.len() {
        rel.push("..");
    }
    for c in &b[common..] {
        rel.push(c.as_os_str());
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::stream::StructNode;
    use crate::scene::{Curve, SceneObject};
    use crate::Color;
    use orrery_geom::Frame;
    use serde_json::json;
    use std::sync::Arc;

    fn names(node: &StructNode) -> Vec<&str> {
        node.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    fn store(scene: &Scene, options: SerializerOptions) -> Vec<StructNode> {
        let mut out = JsonOutputStream::new();
        SceneSerializer::new(options).store(scene, &mut out).unwrap();
        assert!(out.is_balanced());
        out.structs().to_vec()
    }

    #[test]
    fn box_emission_order() {
        let mut scene = Scene::default();
        let mut so = SceneObject::new_box(1.0, 2.0, 3.0);
        so.set_name("crate");
        so.assign_so_material(SOMaterial::transparent("glass", Color::rgb(0.0, 0.5, 1.0)));
        scene.add(so);

        let structs = store(&scene, SerializerOptions::default());
        let node = &structs[0];
        assert_eq!(node.kind, SCENE_OBJECT_STRUCT);
        assert_eq!(names(node), vec!["SOType", "SOName", "Width", "Height", "Depth"]);
        assert_eq!(node.attribute("SOType"), Some(&json!("Box")));
        let kinds: Vec<&str> = node.children.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec![TRANSFORM_STRUCT, MATERIAL_STRUCT]);
        let mat = node.child(MATERIAL_STRUCT).unwrap();
        assert_eq!(mat.attribute("MaterialType"), Some(&json!("Transparent")));
        assert_eq!(mat.attribute("RGBColor"), Some(&json!([0.0, 0.5, 1.0])));
    }

    #[test]
    fn cylinder_end_points_follow_scaled_height() {
        let mut scene = Scene::default();
        let so = SceneObject::new_cylinder(0.5, 2.0).with_transform(Transform::new(
            Frame::from_origin(Vec3::new(1.0, 0.0, 0.0)),
            Vec3::new(1.0, 3.0, 1.0),
        ));
        scene.add(so);
        let structs = store(&scene, SerializerOptions::default());
        assert_eq!(structs[0].attribute("StartPoint"), Some(&json!([1.0, -3.0, 0.0])));
        assert_eq!(structs[0].attribute("EndPoint"), Some(&json!([1.0, 3.0, 0.0])));
    }

    #[test]
    fn temporary_objects_are_skipped_and_groups_nest() {
        let mut scene = Scene::default();
        let group = scene.add(SceneObject::new_group());
        scene.add_child(group, SceneObject::new_sphere(1.0)).unwrap();
        let mut tmp = SceneObject::new_pivot();
        tmp.set_temporary(true);
        scene.add_child(group, tmp).unwrap();
        let mut tmp_root = SceneObject::new_box(1.0, 1.0, 1.0);
        tmp_root.set_temporary(true);
        scene.add(tmp_root);

        let structs = store(&scene, SerializerOptions::default());
        assert_eq!(structs.len(), 1);
        let nested: Vec<&StructNode> = structs[0]
            .children
            .iter()
            .filter(|c| c.kind == SCENE_OBJECT_STRUCT)
            .collect();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].attribute("SOType"), Some(&json!("Sphere")));
    }

    #[test]
    fn children_of_surface_objects_are_kept() {
        let mut scene = Scene::default();
        let ball = scene.add(SceneObject::new_sphere(1.0));
        scene.add_child(ball, SceneObject::new_box(0.5, 0.5, 0.5)).unwrap();

        let structs = store(&scene, SerializerOptions::default());
        assert_eq!(structs.len(), 1);
        let nested = structs[0].child(SCENE_OBJECT_STRUCT).unwrap();
        assert_eq!(nested.attribute("SOType"), Some(&json!("Box")));
        let kinds: Vec<&str> = structs[0].children.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec![TRANSFORM_STRUCT, MATERIAL_STRUCT, SCENE_OBJECT_STRUCT]);
    }

    #[test]
    fn mesh_ascii_and_binary() {
        let mesh = SimpleMesh::new(
            vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let mut scene = Scene::default();
        scene.add(SceneObject::new_mesh(Arc::new(mesh)));

        let ascii = store(
            &scene,
            SerializerOptions {
                binary_meshes: false,
                include_keyframes: false,
            },
        );
        let m = ascii[0].child(ASCII_MESH_STRUCT).unwrap();
        assert_eq!(m.attribute("Triangles"), Some(&json!([0, 1, 2])));
        assert!(ascii[0].child(MATERIAL_STRUCT).is_none());

        let binary = store(&scene, SerializerOptions::default());
        let m = binary[0].child(BINARY_MESH_STRUCT).unwrap();
        let encoded = m.attribute("Vertices").and_then(|v| v.as_str()).unwrap();
        let bytes = base64::decode(encoded).unwrap();
        assert_eq!(bytes.len(), 4 + 9 * 4);
        assert_eq!(&bytes[..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1.0f32.to_le_bytes());
    }

    #[test]
    fn poly_tube_adds_polygon_after_curve() {
        let curve = Curve::new(vec![Vec3::zero(), Vec3::new(0.0, 1.0, 0.0)], false);
        let square = vec![
            Vec2::new(-0.1, -0.1),
            Vec2::new(0.1, -0.1),
            Vec2::new(0.1, 0.1),
            Vec2::new(-0.1, 0.1),
        ];
        let mut scene = Scene::default();
        scene.add(SceneObject::new_poly_tube(curve, square));
        let structs = store(&scene, SerializerOptions::default());
        assert_eq!(
            names(&structs[0]),
            vec!["SOType", "SOName", "PolyCurve", "PolyCurveClosed", "Polygon"]
        );
    }

    #[test]
    fn keyframes_are_indexed() {
        let mut keys = KeyframeSequence::new();
        keys.add(2.0, Frame::from_origin(Vec3::new(0.0, 1.0, 0.0)));
        keys.add(1.0, Frame::identity());
        let mut so = SceneObject::new_pivot();
        so.set_keyframes(Some(keys));
        let mut scene = Scene::default();
        scene.add(so);

        let structs = store(&scene, SerializerOptions::default());
        let list = structs[0].child(KEYFRAME_LIST_STRUCT).unwrap();
        assert_eq!(list.attribute("TimeRange"), Some(&json!([1.0, 2.0])));
        let ids: Vec<Option<&str>> = list.children.iter().map(|k| k.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("0"), Some("1")]);
        assert_eq!(list.children[1].attribute("Time"), Some(&json!(2.0)));

        let without = store(
            &scene,
            SerializerOptions {
                binary_meshes: true,
                include_keyframes: false,
            },
        );
        assert!(without[0].child(KEYFRAME_LIST_STRUCT).is_none());
    }

    #[test]
    fn relative_paths() {
        let rel = relative_path(Path::new("/data/scenes"), Path::new("/data/meshes/a.obj")).unwrap();
        assert_eq!(rel, PathBuf::from("../meshes/a.obj"));
        let rel = relative_path(Path::new("/data"), Path::new("/data/a.obj")).unwrap();
        assert_eq!(rel, PathBuf::from("a.obj"));
        assert!(relative_path(Path::new("data"), Path::new("/data/a.obj")).is_none());
    }

    #[test]
    fn mesh_reference_is_written_relative_to_target() {
        let mut scene = Scene::default();
        scene.add(SceneObject::new_mesh_reference("/models/bunny.obj", None));
        let mut out = JsonOutputStream::new();
        let mut ser = SceneSerializer::new(SerializerOptions::default());
        ser.target_file_path = Some(PathBuf::from("/models/scenes/s.json"));
        ser.store(&scene, &mut out).unwrap();
        let node = &out.structs()[0];
        assert_eq!(node.attribute("ReferencePath"), Some(&json!("/models/bunny.obj")));
        assert_eq!(node.attribute("RelReferencePath"), Some(&json!("../bunny.obj")));
    }
}
