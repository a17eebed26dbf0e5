//! Scene objects

use std::{
    borrow::Cow,
    cell::Cell,
    path::PathBuf,
    sync::Arc,
};

use orrery_geom::{Aabb3, Frame, Ray3, Vec2, Vec3};
use uuid::Uuid;

use super::{
    mesh::{Curve, SimpleMesh},
    shape,
    space::check_scale,
    CoordSpace, KeyframeSequence, Material, SOId, SOMaterial, SceneError, SpatialNode,
    Transform, Transformable,
};

/// Open registry of object type tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SOType {
    identifier: Cow<'static, str>,
}

impl SOType {
    pub const BOX: SOType = SOType::builtin("Box");
    pub const SPHERE: SOType = SOType::builtin("Sphere");
    pub const CYLINDER: SOType = SOType::builtin("Cylinder");
    pub const PIVOT: SOType = SOType::builtin("Pivot");
    pub const MESH: SOType = SOType::builtin("Mesh");
    pub const MESH_REFERENCE: SOType = SOType::builtin("MeshReference");
    pub const POLY_CURVE: SOType = SOType::builtin("PolyCurve");
    pub const POLY_TUBE: SOType = SOType::builtin("PolyTube");
    pub const GROUP: SOType = SOType::builtin("Group");
    pub const GENERIC_WRAPPER: SOType = SOType::builtin("GenericWrapper");
    pub const UNKNOWN: SOType = SOType::builtin("Unknown");

    const fn builtin(identifier: &'static str) -> SOType {
        SOType {
            identifier: Cow::Borrowed(identifier),
        }
    }

    pub fn custom<S: Into<String>>(identifier: S) -> SOType {
        SOType {
            identifier: Cow::Owned(identifier.into()),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// One rigidly attached mesh inside a wrapper object.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub name: String,
    pub transform: Transform,
    pub mesh: Arc<SimpleMesh>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SOGeometry {
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    Pivot,
    Mesh(Arc<SimpleMesh>),
    MeshReference { path: PathBuf, mesh: Option<Arc<SimpleMesh>> },
    PolyCurve(Curve),
    PolyTube { curve: Curve, polygon: Vec<Vec2>, mesh: Arc<SimpleMesh> },
    Group,
    Wrapper { type_tag: SOType, parts: Vec<MeshPart> },
    Unknown,
}

impl SOGeometry {
    pub fn poly_tube(curve: Curve, polygon: Vec<Vec2>) -> SOGeometry {
        let mesh = Arc::new(SimpleMesh::new_tube(&curve, &polygon));
        SOGeometry::PolyTube { curve, polygon, mesh }
    }

    pub fn so_type(&self) -> SOType {
        match self {
            SOGeometry::Box { .. } => SOType::BOX,
            SOGeometry::Sphere { .. } => SOType::SPHERE,
            SOGeometry::Cylinder { .. } => SOType::CYLINDER,
            SOGeometry::Pivot => SOType::PIVOT,
            SOGeometry::Mesh(_) => SOType::MESH,
            SOGeometry::MeshReference { .. } => SOType::MESH_REFERENCE,
            SOGeometry::PolyCurve(_) => SOType::POLY_CURVE,
            SOGeometry::PolyTube { .. } => SOType::POLY_TUBE,
            SOGeometry::Group => SOType::GROUP,
            SOGeometry::Wrapper { type_tag, .. } => type_tag.clone(),
            SOGeometry::Unknown => SOType::UNKNOWN,
        }
    }

    pub fn is_surface(&self) -> bool {
        match self {
            SOGeometry::Box { .. }
            | SOGeometry::Sphere { .. }
            | SOGeometry::Cylinder { .. }
            | SOGeometry::Mesh(_)
            | SOGeometry::PolyTube { .. } => true,
            SOGeometry::MeshReference { mesh, .. } => mesh.is_some(),
            SOGeometry::Wrapper { parts, .. } => !parts.is_empty(),
            SOGeometry::Pivot | SOGeometry::PolyCurve(_) | SOGeometry::Group | SOGeometry::Unknown => false,
        }
    }

    /// Surface meshes in object space, one per part. Primitives are tessellated.
    pub fn mesh_parts(&self) -> Vec<MeshPart> {
        let part = |name: &str, mesh: Arc<SimpleMesh>| MeshPart {
            name: name.to_string(),
            transform: Transform::identity(),
            mesh,
        };
        match self {
            SOGeometry::Box { width, height, depth } => vec![part(
                "box",
                Arc::new(SimpleMesh::new_box(Vec3::new(*width, *height, *depth) * 0.5)),
            )],
            SOGeometry::Sphere { radius } => {
                vec![part("sphere", Arc::new(SimpleMesh::new_uv_sphere(*radius, 32, 16)))]
            }
            SOGeometry::Cylinder { radius, height } => {
                vec![part("cylinder", Arc::new(SimpleMesh::new_cylinder(*radius, *height, 32)))]
            }
            SOGeometry::Mesh(mesh) => vec![part("mesh", mesh.clone())],
            SOGeometry::MeshReference { mesh: Some(mesh), .. } => vec![part("mesh", mesh.clone())],
            SOGeometry::PolyTube { mesh, .. } => vec![part("tube", mesh.clone())],
            SOGeometry::Wrapper { parts, .. } => parts.clone(),
            _ => Vec::new(),
        }
    }

    /// Object-space bounds of the geometry alone.
    pub fn local_bounds(&self, pivot_radius: f32) -> Aabb3 {
        match self {
            SOGeometry::Box { width, height, depth } => {
                Aabb3::from_center_extents(Vec3::zero(), Vec3::new(*width, *height, *depth) * 0.5)
            }
            SOGeometry::Sphere { radius } => Aabb3::from_center_extents(Vec3::zero(), Vec3::splat(*radius)),
            SOGeometry::Cylinder { radius, height } => {
                Aabb3::from_center_extents(Vec3::zero(), Vec3::new(*radius, height * 0.5, *radius))
            }
            SOGeometry::Pivot => Aabb3::from_center_extents(Vec3::zero(), Vec3::splat(pivot_radius)),
            SOGeometry::Mesh(mesh) => mesh.bounds(),
            SOGeometry::MeshReference { mesh, .. } => mesh.as_ref().map_or(Aabb3::empty(), |m| m.bounds()),
            SOGeometry::PolyCurve(curve) => curve.bounds(),
            SOGeometry::PolyTube { mesh, .. } => mesh.bounds(),
            SOGeometry::Wrapper { parts, .. } => parts.iter().fold(Aabb3::empty(), |acc, p| {
                acc.union(&p.mesh.bounds().map_corners(|c| p.transform.local_to_parent(c)))
            }),
            SOGeometry::Group | SOGeometry::Unknown => Aabb3::empty(),
        }
    }

    /// Nearest hit of an object-space ray as `(t, normal, part)`. The ray
    /// direction may be unnormalized.
    pub(crate) fn ray_intersection(&self, ray: &Ray3, pivot_radius: f32) -> Option<(f32, Vec3, usize)> {
        let single = |hit: Option<(f32, Vec3)>| hit.map(|(t, n)| (t, n, 0));
        match self {
            SOGeometry::Box { width, height, depth } => single(
                Aabb3::from_center_extents(Vec3::zero(), Vec3::new(*width, *height, *depth) * 0.5)
                    .ray_intersection(ray),
            ),
            SOGeometry::Sphere { radius } => single(shape::ray_sphere(ray, *radius)),
            SOGeometry::Cylinder { radius, height } => single(shape::ray_cylinder(ray, *radius, *height)),
            SOGeometry::Pivot => single(shape::ray_sphere(ray, pivot_radius)),
            SOGeometry::Mesh(mesh)
            | SOGeometry::MeshReference { mesh: Some(mesh), .. }
            | SOGeometry::PolyTube { mesh, .. } => mesh
                .find_ray_intersection(ray)
                .map(|h| (h.t, h.normal, 0)),
            SOGeometry::Wrapper { parts, .. } => {
                let mut best: Option<(f32, Vec3, usize)> = None;
                for (index, part) in parts.iter().enumerate() {
                    let local = Ray3 {
                        origin: part.transform.parent_to_local(ray.origin),
                        direction: part.transform.direction_to_local(ray.direction),
                    };
                    if let Some(hit) = part.mesh.find_ray_intersection(&local) {
                        if best.map_or(true, |(t, _, _)| hit.t < t) {
                            best = Some((hit.t, part.transform.normal_to_parent(hit.normal), index));
                        }
                    }
                }
                best
            }
            _ => None,
        }
    }
}

/// Where an object hangs in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SOParent {
    Detached,
    Scene,
    Object(SOId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundsCache {
    pub key: (u64, u64),
    pub local: Aabb3,
    pub transformed: Aabb3,
}

pub struct SceneObject {
    uuid: Uuid,
    name: String,
    timestamp: u64,
    geometry: SOGeometry,
    temporary: bool,
    pub(crate) transform: Transform,
    material: SOMaterial,
    resolved_material: Arc<Material>,
    overrides: Vec<Arc<Material>>,
    pub(crate) parent: SOParent,
    pub(crate) sibling_index: usize,
    pub(crate) children: Vec<SOId>,
    keyframes: Option<KeyframeSequence>,
    current_time: f64,
    pub(crate) bounds_cache: Cell<Option<BoundsCache>>,
}

impl SceneObject {
    pub fn new<S: Into<String>>(name: S, geometry: SOGeometry, material: SOMaterial) -> SceneObject {
        SceneObject {
            uuid: Uuid::new_v4(),
            name: name.into(),
            timestamp: 0,
            geometry,
            temporary: false,
            transform: Transform::identity(),
            resolved_material: Arc::new(Material::from_so_material(&material)),
            material,
            overrides: Vec::new(),
            parent: SOParent::Detached,
            sibling_index: 0,
            children: Vec::new(),
            keyframes: None,
            current_time: 0.0,
            bounds_cache: Cell::new(None),
        }
    }

    pub fn new_box(width: f32, height: f32, depth: f32) -> SceneObject {
        Self::new("Box", SOGeometry::Box { width, height, depth }, SOMaterial::default_standard())
    }

    pub fn new_sphere(radius: f32) -> SceneObject {
        Self::new("Sphere", SOGeometry::Sphere { radius }, SOMaterial::default_standard())
    }

    pub fn new_cylinder(radius: f32, height: f32) -> SceneObject {
        Self::new("Cylinder", SOGeometry::Cylinder { radius, height }, SOMaterial::default_standard())
    }

    pub fn new_pivot() -> SceneObject {
        Self::new("Pivot", SOGeometry::Pivot, SOMaterial::default_standard())
    }

    pub fn new_mesh(mesh: Arc<SimpleMesh>) -> SceneObject {
        Self::new("Mesh", SOGeometry::Mesh(mesh), SOMaterial::default_mesh())
    }

    pub fn new_mesh_reference<P: Into<PathBuf>>(path: P, mesh: Option<Arc<SimpleMesh>>) -> SceneObject {
        Self::new(
            "MeshReference",
            SOGeometry::MeshReference { path: path.into(), mesh },
            SOMaterial::default_mesh(),
        )
    }

    pub fn new_poly_curve(curve: Curve) -> SceneObject {
        Self::new("Curve", SOGeometry::PolyCurve(curve), SOMaterial::default_standard())
    }

    pub fn new_poly_tube(curve: Curve, polygon: Vec<Vec2>) -> SceneObject {
        Self::new("Tube", SOGeometry::poly_tube(curve, polygon), SOMaterial::default_standard())
    }

    pub fn new_group() -> SceneObject {
        Self::new("Group", SOGeometry::Group, SOMaterial::default_standard())
    }

    pub fn new_wrapper(type_tag: SOType, parts: Vec<MeshPart>) -> SceneObject {
        Self::new(
            type_tag.identifier().to_string(),
            SOGeometry::Wrapper { type_tag, parts },
            SOMaterial::default_mesh(),
        )
    }

    pub fn with_transform(mut self, transform: Transform) -> SceneObject {
        self.transform = transform;
        self
    }

    /// Fresh identity, same geometry, material and transform. The copy is
    /// detached, childless and never temporary.
    pub fn duplicate(&self) -> SceneObject {
        let mut copy = SceneObject::new(self.name.clone(), self.geometry.clone(), self.material.clone());
        copy.transform = self.transform;
        copy.keyframes = self.keyframes.clone();
        copy.current_time = self.current_time;
        copy
    }

    fn touch(&mut self) {
        self.timestamp += 1;
        self.bounds_cache.set(None);
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
        self.touch();
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn so_type(&self) -> SOType {
        self.geometry.so_type()
    }

    pub fn geometry(&self) -> &SOGeometry {
        &self.geometry
    }

    pub fn set_geometry(&mut self, geometry: SOGeometry) {
        self.geometry = geometry;
        self.touch();
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    pub fn is_surface(&self) -> bool {
        self.geometry.is_surface()
    }

    pub fn parent(&self) -> SOParent {
        self.parent
    }

    pub fn children(&self) -> &[SOId] {
        &self.children
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub(crate) fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.touch();
    }

    pub fn assign_so_material(&mut self, material: SOMaterial) {
        self.resolved_material = Arc::new(Material::from_so_material(&material));
        self.material = material;
        self.touch();
    }

    pub fn assigned_so_material(&self) -> &SOMaterial {
        &self.material
    }

    pub fn push_override_material(&mut self, material: Arc<Material>) {
        self.overrides.push(material);
    }

    pub fn pop_override_material(&mut self) -> Result<Arc<Material>, SceneError> {
        self.overrides.pop().ok_or_else(|| {
            SceneError::InvalidState(format!("override material stack of {} is empty", self.uuid))
        })
    }

    pub fn override_depth(&self) -> usize {
        self.overrides.len()
    }

    /// Top of the override stack, else the assigned material.
    pub fn active_material(&self) -> Arc<Material> {
        self.overrides
            .last()
            .unwrap_or(&self.resolved_material)
            .clone()
    }

    pub fn keyframes(&self) -> Option<&KeyframeSequence> {
        self.keyframes.as_ref()
    }

    pub fn set_keyframes(&mut self, keyframes: Option<KeyframeSequence>) {
        self.keyframes = keyframes;
        self.touch();
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Moves to `time`, sampling the keyframes into the object frame if any.
    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
        let sampled = self.keyframes.as_ref().and_then(|k| k.sample(time));
        if let Some(frame) = sampled {
            self.transform.frame = frame;
            self.bounds_cache.set(None);
        }
    }

    pub fn local_bounding_box(&self, pivot_radius: f32) -> Aabb3 {
        self.geometry.local_bounds(pivot_radius)
    }

    fn require_detached(&self, space: CoordSpace) -> Result<(), SceneError> {
        match (self.parent, space) {
            (_, CoordSpace::Object) | (SOParent::Detached, _) => Ok(()),
            _ => Err(SceneError::InvalidState(format!(
                "{} is attached; resolve {:?} frames through the scene",
                self.uuid, space
            ))),
        }
    }
}

impl std::fmt::Debug for SceneObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObject")
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .field("type", &self.so_type().identifier())
            .field("parent", &self.parent)
            .finish()
    }
}

/// Detached objects have no ancestors, so every space reads the stored
/// frame. Attached objects answer only in Object space.
impl SpatialNode for SceneObject {
    fn local_frame(&self, space: CoordSpace) -> Result<Frame, SceneError> {
        self.require_detached(space)?;
        Ok(self.transform.frame)
    }

    fn local_scale(&self) -> Vec3 {
        self.transform.scale
    }
}

impl Transformable for SceneObject {
    fn set_local_frame(&mut self, frame: Frame, space: CoordSpace) -> Result<(), SceneError> {
        self.require_detached(space)?;
        self.transform.frame = frame;
        self.touch();
        Ok(())
    }

    fn supports_scaling(&self) -> bool {
        !matches!(self.geometry, SOGeometry::Pivot)
    }

    fn set_local_scale(&mut self, scale: Vec3) -> Result<(), SceneError> {
        if !self.supports_scaling() {
            return Err(SceneError::UnsupportedOperation(format!(
                "{} objects cannot be scaled",
                self.so_type().identifier()
            )));
        }
        check_scale(scale)?;
        self.transform.scale = scale;
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use orrery_geom::Quaternion;

    #[test]
    fn duplicate_gets_fresh_identity() {
        let mut so = SceneObject::new_sphere(2.0);
        so.set_temporary(true);
        so.transform.frame = Frame::from_origin(Vec3::new(1.0, 2.0, 3.0));
        let copy = so.duplicate();
        assert_ne!(copy.uuid(), so.uuid());
        assert!(!copy.is_temporary());
        assert_eq!(copy.geometry(), so.geometry());
        assert_eq!(copy.transform(), so.transform());
        assert_eq!(copy.parent(), SOParent::Detached);
    }

    #[test]
    fn override_stack_is_lifo() {
        let mut so = SceneObject::new_box(1.0, 1.0, 1.0);
        so.assign_so_material(SOMaterial::standard("home", Color::red()));
        let a = Arc::new(Material {
            name: Some("a".into()),
            ..Material::default()
        });
        let b = Arc::new(Material {
            name: Some("b".into()),
            ..Material::default()
        });
        so.push_override_material(a.clone());
        so.push_override_material(b.clone());
        assert!(Arc::ptr_eq(&so.active_material(), &b));
        so.pop_override_material().unwrap();
        assert!(Arc::ptr_eq(&so.active_material(), &a));
        so.pop_override_material().unwrap();
        assert_eq!(so.active_material().name.as_deref(), Some("home"));
        assert!(matches!(so.pop_override_material(), Err(SceneError::InvalidState(_))));
    }

    #[test]
    fn overrides_leave_assigned_material_alone() {
        let mut so = SceneObject::new_box(1.0, 1.0, 1.0);
        so.push_override_material(Material::get_default());
        assert_eq!(so.assigned_so_material(), &SOMaterial::default_standard());
    }

    #[test]
    fn pivot_rejects_scaling() {
        let mut pivot = SceneObject::new_pivot();
        assert!(!pivot.supports_scaling());
        assert!(matches!(
            pivot.set_local_scale(Vec3::splat(2.0)),
            Err(SceneError::UnsupportedOperation(_))
        ));
        assert_eq!(pivot.local_scale(), Vec3::one());
    }

    #[test]
    fn negative_scale_is_rejected() {
        let mut so = SceneObject::new_sphere(1.0);
        assert!(matches!(
            so.set_local_scale(Vec3::new(1.0, -1.0, 1.0)),
            Err(SceneError::InvalidArgument(_))
        ));
    }

    #[test]
    fn detached_spaces_coincide() {
        let mut so = SceneObject::new_sphere(1.0);
        let f = Frame::new(Vec3::new(0.0, 1.0, 0.0), Quaternion::axis_angle_deg(Vec3::pos_x(), 30.0));
        so.set_local_frame(f, CoordSpace::World).unwrap();
        assert_eq!(so.local_frame(CoordSpace::Scene).unwrap(), f);
        assert_eq!(so.local_frame(CoordSpace::Object).unwrap(), f);
    }

    #[test]
    fn mutations_bump_timestamp() {
        let mut so = SceneObject::new_sphere(1.0);
        let t0 = so.timestamp();
        so.set_name("ball");
        so.assign_so_material(SOMaterial::transparent("glass", Color::blue()));
        assert_eq!(so.timestamp(), t0 + 2);
    }

    #[test]
    fn custom_types_compare_by_identifier() {
        assert_eq!(SOType::custom("Box"), SOType::BOX);
        assert_ne!(SOType::custom("Lathe"), SOType::UNKNOWN);
        let wrapper = SceneObject::new_wrapper(SOType::custom("Lathe"), Vec::new());
        assert_eq!(wrapper.so_type().identifier(), "Lathe");
        assert!(!wrapper.is_surface());
    }
}
