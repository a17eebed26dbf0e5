//! Scene graph: an arena of scene objects, the root transform and the
//! conversions between World and Scene space.

mod camera;
mod keyframe;
pub mod material;
pub mod mesh;
mod object;
mod shape;
mod space;
mod trs;

use orrery_geom::{Aabb3, Frame, Ray3, Vec3};
use slotmap::SlotMap;
use thiserror::Error;

pub use camera::*;
pub use keyframe::*;
pub use material::{AlphaMode, Material, MaterialSink, SOMaterial, SOMaterialType};
pub use mesh::{Curve, MeshHit, SimpleMesh};
pub use object::*;
pub use space::*;
pub use trs::Transform;

use object::BoundsCache;

slotmap::new_key_type! {
    pub struct SOId;
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Parent chain of {0:?} contains a cycle")]
    CyclicHierarchy(SOId),
    #[error("No object {0:?} in this scene")]
    UnknownObject(SOId),
}

#[derive(Debug, Clone)]
pub struct SceneParams {
    pub default_material: SOMaterial,
    pub pivot_radius: f32,
}

impl Default for SceneParams {
    fn default() -> Self {
        SceneParams {
            default_material: SOMaterial::default_standard(),
            pivot_radius: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SORayHit {
    pub object: SOId,
    pub point: Vec3,
    pub normal: Vec3,
    pub t: f32,
    pub part: usize,
}

pub trait SOCollection {
    fn children(&self) -> &[SOId];
}

pub struct Scene {
    objects: SlotMap<SOId, SceneObject>,
    roots: Vec<SOId>,
    root: Transform,
    params: SceneParams,
    frame_index: u64,
    revision: u64,
}

impl Scene {
    pub fn new(params: SceneParams) -> Scene {
        Scene {
            objects: SlotMap::with_key(),
            roots: Vec::new(),
            root: Transform::identity(),
            params,
            frame_index: 0,
            revision: 0,
        }
    }

    pub fn params(&self) -> &SceneParams {
        &self.params
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: SOId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn get(&self, id: SOId) -> Result<&SceneObject, SceneError> {
        self.objects.get(id).ok_or(SceneError::UnknownObject(id))
    }

    pub fn get_mut(&mut self, id: SOId) -> Result<&mut SceneObject, SceneError> {
        let so = self.objects.get_mut(id).ok_or(SceneError::UnknownObject(id))?;
        self.revision += 1;
        Ok(so)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SOId, &SceneObject)> {
        self.objects.iter()
    }

    pub fn root_objects(&self) -> &[SOId] {
        &self.roots
    }

    pub fn children(&self, id: SOId) -> Result<&[SOId], SceneError> {
        Ok(&self.get(id)?.children)
    }

    pub fn node(&self, id: SOId) -> Result<SONode<'_>, SceneError> {
        self.get(id)?;
        Ok(SONode { scene: self, id })
    }

    pub fn node_mut(&mut self, id: SOId) -> Result<SONodeMut<'_>, SceneError> {
        self.get(id)?;
        Ok(SONodeMut { scene: self, id })
    }

    pub fn add(&mut self, so: SceneObject) -> SOId {
        self.attach(so, SOParent::Scene)
    }

    pub fn add_child(&mut self, parent: SOId, so: SceneObject) -> Result<SOId, SceneError> {
        self.get(parent)?;
        Ok(self.attach(so, SOParent::Object(parent)))
    }

    fn attach(&mut self, mut so: SceneObject, parent: SOParent) -> SOId {
        so.children.clear();
        so.bounds_cache.set(None);
        let uuid = so.uuid();
        let id = self.objects.insert(so);
        self.link(id, parent);
        self.revision += 1;
        log::debug!("Added object {} as {:?} under {:?}", uuid, id, parent);
        id
    }

    fn siblings_mut(&mut self, parent: SOParent) -> Option<&mut Vec<SOId>> {
        match parent {
            SOParent::Scene => Some(&mut self.roots),
            SOParent::Object(p) => self.objects.get_mut(p).map(|o| &mut o.children),
            SOParent::Detached => None,
        }
    }

    fn link(&mut self, id: SOId, parent: SOParent) {
        let index = match self.siblings_mut(parent) {
            Some(list) => {
                list.push(id);
                list.len() - 1
            }
            None => 0,
        };
        if let Some(o) = self.objects.get_mut(id) {
            o.parent = parent;
            o.sibling_index = index;
        }
    }

    fn unlink(&mut self, id: SOId) {
        let (parent, index) = match self.objects.get(id) {
            Some(o) => (o.parent, o.sibling_index),
            None => return,
        };
        let moved = match self.siblings_mut(parent) {
            Some(list) if index < list.len() => {
                list.swap_remove(index);
                list.get(index).copied()
            }
            _ => None,
        };
        if let Some(o) = moved.and_then(|m| self.objects.get_mut(m)) {
            o.sibling_index = index;
        }
        if let Some(o) = self.objects.get_mut(id) {
            o.parent = SOParent::Detached;
            o.sibling_index = 0;
        }
    }

    /// Removes `id` and its whole subtree. Returns the detached object
    /// with an empty child list; descendants are dropped.
    pub fn remove(&mut self, id: SOId) -> Result<SceneObject, SceneError> {
        self.get(id)?;
        self.unlink(id);

        let mut stack = self.get(id)?.children.clone();
        let mut steps = 0;
        while let Some(child) = stack.pop() {
            steps += 1;
            if steps > self.objects.len() {
                return Err(SceneError::CyclicHierarchy(id));
            }
            if let Some(removed) = self.objects.remove(child) {
                stack.extend(removed.children.iter().copied());
            }
        }

        let mut so = self.objects.remove(id).ok_or(SceneError::UnknownObject(id))?;
        so.children.clear();
        so.parent = SOParent::Detached;
        so.bounds_cache.set(None);
        self.revision += 1;
        log::debug!("Removed object {} ({} descendants)", so.uuid(), steps);
        Ok(so)
    }

    /// Moves `id` under `new_parent` (the scene root when `None`), keeping
    /// its Object-space frame.
    pub fn reparent(&mut self, id: SOId, new_parent: Option<SOId>) -> Result<(), SceneError> {
        self.get(id)?;
        let parent = match new_parent {
            None => SOParent::Scene,
            Some(p) => {
                self.get(p)?;
                if p == id || self.is_ancestor(id, p)? {
                    return Err(SceneError::CyclicHierarchy(id));
                }
                SOParent::Object(p)
            }
        };
        self.unlink(id);
        self.link(id, parent);
        self.revision += 1;
        log::debug!("Reparented {:?} under {:?}", id, parent);
        Ok(())
    }

    pub fn is_ancestor(&self, ancestor: SOId, id: SOId) -> Result<bool, SceneError> {
        Ok(self.ancestors(id)?.contains(&ancestor))
    }

    fn ancestors(&self, id: SOId) -> Result<Vec<SOId>, SceneError> {
        let mut chain = Vec::new();
        let mut cur = self.get(id)?.parent;
        while let SOParent::Object(p) = cur {
            if chain.len() >= self.objects.len() {
                return Err(SceneError::CyclicHierarchy(id));
            }
            chain.push(p);
            cur = self.get(p)?.parent;
        }
        Ok(chain)
    }

    pub fn depth_first(&self) -> Result<Vec<SOId>, SceneError> {
        let mut order = Vec::with_capacity(self.objects.len());
        let mut stack: Vec<SOId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if order.len() >= self.objects.len() {
                return Err(SceneError::CyclicHierarchy(id));
            }
            order.push(id);
            stack.extend(self.get(id)?.children.iter().rev().copied());
        }
        Ok(order)
    }

    fn parent_scene_transform(&self, id: SOId) -> Result<Option<Transform>, SceneError> {
        let mut acc: Option<Transform> = None;
        for p in self.ancestors(id)?.iter().rev() {
            let t = self.get(*p)?.transform;
            acc = Some(match acc {
                Some(a) => a.compose(&t),
                None => t,
            });
        }
        Ok(acc)
    }

    pub fn scene_transform(&self, id: SOId) -> Result<Transform, SceneError> {
        let own = self.get(id)?.transform;
        Ok(match self.parent_scene_transform(id)? {
            Some(parent) => parent.compose(&own),
            None => own,
        })
    }

    pub fn world_transform(&self, id: SOId) -> Result<Transform, SceneError> {
        Ok(self.root.compose(&self.scene_transform(id)?))
    }

    fn resolve_frame(&self, id: SOId, space: CoordSpace) -> Result<Frame, SceneError> {
        match space {
            CoordSpace::Object => Ok(self.get(id)?.transform.frame),
            CoordSpace::Scene => Ok(self.scene_transform(id)?.frame),
            CoordSpace::World => Ok(self.world_transform(id)?.frame),
        }
    }

    fn assign_frame(&mut self, id: SOId, frame: Frame, space: CoordSpace) -> Result<(), SceneError> {
        let local = match space {
            CoordSpace::Object => frame,
            CoordSpace::Scene => self.scene_to_object_frame(id, frame)?,
            CoordSpace::World => self.scene_to_object_frame(id, self.to_scene_frame(frame))?,
        };
        let so = self.get_mut(id)?;
        let mut transform = so.transform;
        transform.frame = local;
        so.set_transform(transform);
        Ok(())
    }

    fn scene_to_object_frame(&self, id: SOId, frame: Frame) -> Result<Frame, SceneError> {
        let parent = match self.parent_scene_transform(id)? {
            Some(parent) => parent,
            None => return Ok(frame),
        };
        let s = parent.scale;
        if s.x == 0.0 || s.y == 0.0 || s.z == 0.0 {
            return Err(SceneError::InvalidState(format!(
                "parent chain of {:?} has zero scale {:?}",
                id, s
            )));
        }
        Ok(Frame::new(
            parent.parent_to_local(frame.origin),
            (parent.frame.rotation.inv() * frame.rotation).normalized(),
        ))
    }

    pub fn root_transform(&self) -> Transform {
        self.root
    }

    pub fn set_root_transform(&mut self, frame: Frame, scale: f32) -> Result<(), SceneError> {
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(SceneError::InvalidArgument(format!("scene scale {} must be positive", scale)));
        }
        self.root = Transform::new(frame, Vec3::splat(scale));
        self.revision += 1;
        Ok(())
    }

    pub fn to_scene_p(&self, p: Vec3) -> Vec3 {
        self.root.parent_to_local(p)
    }

    pub fn to_world_p(&self, p: Vec3) -> Vec3 {
        self.root.local_to_parent(p)
    }

    pub fn to_scene_n(&self, n: Vec3) -> Vec3 {
        self.root.frame.to_frame_v(n)
    }

    pub fn to_world_n(&self, n: Vec3) -> Vec3 {
        self.root.frame.from_frame_v(n)
    }

    pub fn to_scene_frame(&self, f: Frame) -> Frame {
        Frame::new(
            self.to_scene_p(f.origin),
            (self.root.frame.rotation.inv() * f.rotation).normalized(),
        )
    }

    pub fn to_world_frame(&self, f: Frame) -> Frame {
        Frame::new(
            self.to_world_p(f.origin),
            (self.root.frame.rotation * f.rotation).normalized(),
        )
    }

    pub fn to_scene_dimension(&self, d: f32) -> f32 {
        d / self.root.scale.x
    }

    pub fn to_world_dimension(&self, d: f32) -> f32 {
        d * self.root.scale.x
    }

    pub fn to_scene_ray(&self, ray: &Ray3) -> Ray3 {
        Ray3::new(self.to_scene_p(ray.origin), self.to_scene_n(ray.direction))
    }

    /// Nearest hit over every object. Equal distances keep the object that
    /// comes first in [`Scene::depth_first`] order.
    pub fn find_ray_intersection(&self, ray: &Ray3) -> Result<Option<SORayHit>, SceneError> {
        self.find_ray_intersection_filtered(ray, |_| true)
    }

    pub fn find_ray_intersection_filtered<F>(&self, ray: &Ray3, filter: F) -> Result<Option<SORayHit>, SceneError>
    where
        F: Fn(&SceneObject) -> bool,
    {
        let mut best: Option<SORayHit> = None;
        for id in self.depth_first()? {
            let node = SONode { scene: self, id };
            if !filter(node.object()) {
                continue;
            }
            if let Some(hit) = node.find_ray_intersection(ray)? {
                if best.map_or(true, |b| hit.t < b.t) {
                    best = Some(hit);
                }
            }
        }
        Ok(best)
    }

    pub fn set_current_time(&mut self, time: f64) {
        for (_, so) in self.objects.iter_mut() {
            so.set_current_time(time);
        }
        self.revision += 1;
    }

    /// Frame-advance signal. Invalidates per-frame caches, applies keyframes
    /// at each object's current time and reports active materials.
    pub fn pre_render(&mut self, sink: &mut dyn MaterialSink) {
        self.frame_index += 1;
        for (id, so) in self.objects.iter_mut() {
            if so.keyframes().is_some() {
                so.set_current_time(so.current_time());
            }
            sink.apply(id, &so.active_material());
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new(SceneParams::default())
    }
}

impl SOCollection for Scene {
    fn children(&self) -> &[SOId] {
        &self.roots
    }
}

/// The scene root: identity in Scene and Object space, the viewing
/// transform in World space.
impl SpatialNode for Scene {
    fn local_frame(&self, space: CoordSpace) -> Result<Frame, SceneError> {
        match space {
            CoordSpace::World => Ok(self.root.frame),
            CoordSpace::Scene | CoordSpace::Object => Ok(Frame::identity()),
        }
    }

    fn local_scale(&self) -> Vec3 {
        self.root.scale
    }
}

impl Transformable for Scene {
    fn set_local_frame(&mut self, frame: Frame, space: CoordSpace) -> Result<(), SceneError> {
        match space {
            CoordSpace::World => self.set_root_transform(frame, self.root.scale.x),
            _ => Err(SceneError::UnsupportedOperation(format!(
                "the scene root frame is fixed in {:?} space",
                space
            ))),
        }
    }

    fn supports_scaling(&self) -> bool {
        true
    }

    fn set_local_scale(&mut self, scale: Vec3) -> Result<(), SceneError> {
        if scale.x != scale.y || scale.y != scale.z {
            return Err(SceneError::UnsupportedOperation(
                "the scene root only supports uniform scale".to_string(),
            ));
        }
        self.set_root_transform(self.root.frame, scale.x)
    }
}

#[derive(Clone, Copy)]
pub struct SONode<'a> {
    scene: &'a Scene,
    id: SOId,
}

impl<'a> SONode<'a> {
    pub fn id(&self) -> SOId {
        self.id
    }

    pub fn object(&self) -> &'a SceneObject {
        &self.scene.objects[self.id]
    }

    pub fn scene_transform(&self) -> Result<Transform, SceneError> {
        self.scene.scene_transform(self.id)
    }

    pub fn world_transform(&self) -> Result<Transform, SceneError> {
        self.scene.world_transform(self.id)
    }

    fn bounds(&self) -> Result<BoundsCache, SceneError> {
        let key = (self.scene.frame_index, self.scene.revision);
        let so = self.object();
        if let Some(cache) = so.bounds_cache.get() {
            if cache.key == key {
                return Ok(cache);
            }
        }
        let local = so.local_bounding_box(self.scene.params.pivot_radius);
        let mut transformed = if local.is_empty() {
            Aabb3::empty()
        } else {
            let world = self.world_transform()?;
            local.map_corners(|c| world.local_to_parent(c))
        };
        for &child in so.children() {
            let child = SONode { scene: self.scene, id: child };
            transformed = transformed.union(&child.transformed_bounding_box()?);
        }
        let cache = BoundsCache { key, local, transformed };
        so.bounds_cache.set(Some(cache));
        Ok(cache)
    }

    pub fn local_bounding_box(&self) -> Result<Aabb3, SceneError> {
        Ok(self.bounds()?.local)
    }

    /// World-space axis-aligned bounds: the eight scaled local corners are
    /// mapped through the World frame and re-fit, then grown to enclose
    /// every child.
    pub fn transformed_bounding_box(&self) -> Result<Aabb3, SceneError> {
        Ok(self.bounds()?.transformed)
    }

    pub fn find_ray_intersection(&self, ray: &Ray3) -> Result<Option<SORayHit>, SceneError> {
        let world = self.world_transform()?;
        if world.scale.x == 0.0 || world.scale.y == 0.0 || world.scale.z == 0.0 {
            return Ok(None);
        }
        // Shape tests run on a unit direction; `t` is scaled back to the
        // caller's ray afterwards.
        let direction = world.direction_to_local(ray.direction);
        let len = direction.magnitude();
        if !(len > 0.0) || !len.is_finite() {
            return Ok(None);
        }
        let local = Ray3 {
            origin: world.parent_to_local(ray.origin),
            direction: direction / len,
        };
        let hit = self
            .object()
            .geometry()
            .ray_intersection(&local, self.scene.params.pivot_radius);
        Ok(hit.map(|(t, normal, part)| {
            let t = t / len;
            SORayHit {
                object: self.id,
                point: ray.point_at(t),
                normal: world.normal_to_parent(normal),
                t,
                part,
            }
        }))
    }
}

impl<'a> SOCollection for SONode<'a> {
    fn children(&self) -> &[SOId] {
        &self.object().children
    }
}

impl<'a> SpatialNode for SONode<'a> {
    fn local_frame(&self, space: CoordSpace) -> Result<Frame, SceneError> {
        self.scene.resolve_frame(self.id, space)
    }

    fn local_scale(&self) -> Vec3 {
        self.object().transform.scale
    }
}

pub struct SONodeMut<'a> {
    scene: &'a mut Scene,
    id: SOId,
}

impl<'a> SONodeMut<'a> {
    pub fn id(&self) -> SOId {
        self.id
    }

    pub fn as_node(&self) -> SONode<'_> {
        SONode {
            scene: self.scene,
            id: self.id,
        }
    }

    pub fn object_mut(&mut self) -> &mut SceneObject {
        self.scene.revision += 1;
        &mut self.scene.objects[self.id]
    }
}

impl<'a> SpatialNode for SONodeMut<'a> {
    fn local_frame(&self, space: CoordSpace) -> Result<Frame, SceneError> {
        self.scene.resolve_frame(self.id, space)
    }

    fn local_scale(&self) -> Vec3 {
        self.scene.objects[self.id].transform.scale
    }
}

impl<'a> Transformable for SONodeMut<'a> {
    fn set_local_frame(&mut self, frame: Frame, space: CoordSpace) -> Result<(), SceneError> {
        self.scene.assign_frame(self.id, frame, space)
    }

    fn supports_scaling(&self) -> bool {
        self.scene.objects[self.id].supports_scaling()
    }

    fn set_local_scale(&mut self, scale: Vec3) -> Result<(), SceneError> {
        self.scene.revision += 1;
        self.scene.objects[self.id].set_local_scale(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_geom::Quaternion;

    fn frame(x: f32, y: f32, z: f32, deg: f32) -> Frame {
        Frame::new(Vec3::new(x, y, z), Quaternion::axis_angle_deg(Vec3::pos_y(), deg))
    }

    #[test]
    fn scene_space_equals_object_space_at_root() {
        let mut scene = Scene::default();
        let id = scene.add(SceneObject::new_box(1.0, 1.0, 1.0).with_transform(Transform::from_frame(frame(
            1.0, 2.0, 3.0, 40.0,
        ))));
        let node = scene.node(id).unwrap();
        assert_eq!(
            node.local_frame(CoordSpace::Scene).unwrap(),
            node.local_frame(CoordSpace::Object).unwrap()
        );
    }

    #[test]
    fn scaled_parent_moves_child_origin() {
        let mut scene = Scene::default();
        let parent = scene.add(SceneObject::new_group());
        scene.node_mut(parent).unwrap().set_local_scale(Vec3::splat(2.0)).unwrap();
        let child = scene
            .add_child(
                parent,
                SceneObject::new_sphere(1.0).with_transform(Transform::from_frame(Frame::from_origin(Vec3::pos_x()))),
            )
            .unwrap();
        let f = scene.node(child).unwrap().local_frame(CoordSpace::Scene).unwrap();
        assert!(f.origin.approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn world_applies_root_transform() {
        let mut scene = Scene::default();
        scene.set_root_transform(frame(0.0, 1.0, 0.0, 0.0), 2.0).unwrap();
        let id = scene.add(SceneObject::new_sphere(1.0).with_transform(Transform::from_frame(frame(
            1.0, 0.0, 0.0, 0.0,
        ))));
        let f = scene.node(id).unwrap().local_frame(CoordSpace::World).unwrap();
        assert!(f.origin.approx_eq(Vec3::new(2.0, 1.0, 0.0), 1e-5));
        assert!(scene.to_scene_p(f.origin).approx_eq(Vec3::pos_x(), 1e-5));
        assert!((scene.to_world_dimension(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut scene = Scene::default();
        let a = scene.add(SceneObject::new_group());
        let b = scene.add_child(a, SceneObject::new_group()).unwrap();
        let c = scene.add_child(b, SceneObject::new_group()).unwrap();
        assert!(matches!(scene.reparent(a, Some(c)), Err(SceneError::CyclicHierarchy(_))));
        assert!(matches!(scene.reparent(a, Some(a)), Err(SceneError::CyclicHierarchy(_))));
        scene.reparent(c, None).unwrap();
        assert_eq!(scene.root_objects(), &[a, c]);
        assert!(scene.children(b).unwrap().is_empty());
    }

    #[test]
    fn corrupted_parent_chain_is_detected() {
        let mut scene = Scene::default();
        let a = scene.add(SceneObject::new_group());
        let b = scene.add_child(a, SceneObject::new_group()).unwrap();
        scene.objects[a].parent = SOParent::Object(b);
        assert!(matches!(
            scene.node(b).unwrap().local_frame(CoordSpace::Scene),
            Err(SceneError::CyclicHierarchy(_))
        ));
    }

    #[test]
    fn remove_takes_subtree_and_fixes_siblings() {
        let mut scene = Scene::default();
        let a = scene.add(SceneObject::new_group());
        let b = scene.add(SceneObject::new_group());
        let c = scene.add(SceneObject::new_sphere(1.0));
        let leaf = scene.add_child(a, SceneObject::new_sphere(1.0)).unwrap();
        let removed = scene.remove(a).unwrap();
        assert_eq!(removed.parent(), SOParent::Detached);
        assert!(!scene.contains(leaf));
        assert_eq!(scene.root_objects(), &[c, b]);
        scene.remove(c).unwrap();
        assert_eq!(scene.root_objects(), &[b]);
        assert_eq!(scene.len(), 1);
        assert!(matches!(scene.remove(a), Err(SceneError::UnknownObject(_))));
    }

    #[test]
    fn rotated_box_bounds_are_refit() {
        let mut scene = Scene::default();
        let id = scene.add(
            SceneObject::new_box(2.0, 2.0, 2.0)
                .with_transform(Transform::from_frame(frame(0.0, 0.0, 0.0, 45.0))),
        );
        let b = scene.node(id).unwrap().transformed_bounding_box().unwrap();
        let r = 2f32.sqrt();
        assert!(b.max.approx_eq(Vec3::new(r, 1.0, r), 1e-4));
        assert!(b.min.approx_eq(Vec3::new(-r, -1.0, -r), 1e-4));
    }

    #[test]
    fn group_bounds_enclose_children() {
        let mut scene = Scene::default();
        let g = scene.add(SceneObject::new_group());
        scene
            .add_child(
                g,
                SceneObject::new_sphere(1.0)
                    .with_transform(Transform::from_frame(Frame::from_origin(Vec3::new(5.0, 0.0, 0.0)))),
            )
            .unwrap();
        let b = scene.node(g).unwrap().transformed_bounding_box().unwrap();
        assert!(b.max.approx_eq(Vec3::new(6.0, 1.0, 1.0), 1e-5));
        assert!(b.min.approx_eq(Vec3::new(4.0, -1.0, -1.0), 1e-5));
    }

    #[test]
    fn bounds_follow_edits() {
        let mut scene = Scene::default();
        let id = scene.add(SceneObject::new_sphere(1.0));
        let before = scene.node(id).unwrap().transformed_bounding_box().unwrap();
        scene
            .node_mut(id)
            .unwrap()
            .set_local_frame(Frame::from_origin(Vec3::new(0.0, 3.0, 0.0)), CoordSpace::World)
            .unwrap();
        let after = scene.node(id).unwrap().transformed_bounding_box().unwrap();
        assert!((after.center() - before.center()).approx_eq(Vec3::new(0.0, 3.0, 0.0), 1e-5));
    }

    #[test]
    fn bounds_enclose_children_of_any_object() {
        let mut scene = Scene::default();
        let ball = scene.add(SceneObject::new_sphere(1.0));
        scene
            .add_child(
                ball,
                SceneObject::new_box(1.0, 1.0, 1.0)
                    .with_transform(Transform::from_frame(Frame::from_origin(Vec3::new(5.0, 0.0, 0.0)))),
            )
            .unwrap();
        let bounds = scene.node(ball).unwrap().transformed_bounding_box().unwrap();
        assert!((bounds.max.x - 5.5).abs() < 1e-5);
        assert!((bounds.min.x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_scale_parent_rejects_placement() {
        let mut scene = Scene::default();
        let parent = scene.add(SceneObject::new_group());
        scene
            .node_mut(parent)
            .unwrap()
            .set_local_scale(Vec3::new(0.0, 1.0, 1.0))
            .unwrap();
        let child = scene.add_child(parent, SceneObject::new_sphere(1.0)).unwrap();
        let target = Frame::from_origin(Vec3::pos_x());
        for space in [CoordSpace::Scene, CoordSpace::World].iter() {
            let res = scene.node_mut(child).unwrap().set_local_frame(target, *space);
            assert!(matches!(res, Err(SceneError::InvalidState(_))));
        }
        assert_eq!(scene.get(child).unwrap().transform().frame, Frame::identity());
        scene
            .node_mut(child)
            .unwrap()
            .set_local_frame(target, CoordSpace::Object)
            .unwrap();
    }

    #[test]
    fn failed_lookup_keeps_revision() {
        let mut scene = Scene::default();
        let gone = scene.add(SceneObject::new_pivot());
        scene.remove(gone).unwrap();
        let revision = scene.revision;
        assert!(matches!(scene.get_mut(gone), Err(SceneError::UnknownObject(_))));
        assert_eq!(scene.revision, revision);
        let id = scene.add(SceneObject::new_pivot());
        let revision = scene.revision;
        scene.get_mut(id).unwrap();
        assert_eq!(scene.revision, revision + 1);
    }

    #[test]
    fn hits_survive_large_root_scale() {
        for &s in [100.0f32, 1000.0, 5000.0, 20000.0].iter() {
            let mut scene = Scene::default();
            scene.set_root_transform(Frame::identity(), s).unwrap();
            let id = scene.add(SceneObject::new_sphere(1.0));
            let ray = Ray3::new(Vec3::new(0.0, 0.0, 3.0 * s), Vec3::neg_z());
            let hit = scene.find_ray_intersection(&ray).unwrap().expect("hit at large scale");
            assert_eq!(hit.object, id);
            assert!((hit.t - 2.0 * s).abs() < 1e-3 * s);
            assert!(hit.normal.approx_eq(Vec3::pos_z(), 1e-4));
        }
    }

    #[test]
    fn nearest_object_wins() {
        let mut scene = Scene::default();
        let far = scene.add(SceneObject::new_box(1.0, 1.0, 1.0));
        let near = scene.add(
            SceneObject::new_sphere(0.5)
                .with_transform(Transform::from_frame(Frame::from_origin(Vec3::new(0.0, 0.0, 2.0)))),
        );
        let ray = Ray3::new(Vec3::new(0.0, 0.0, 10.0), Vec3::neg_z());
        let hit = scene.find_ray_intersection(&ray).unwrap().unwrap();
        assert_eq!(hit.object, near);
        assert!((hit.t - 7.5).abs() < 1e-4);
        let only_far = scene
            .find_ray_intersection_filtered(&ray, |so| so.so_type() == SOType::BOX)
            .unwrap()
            .unwrap();
        assert_eq!(only_far.object, far);
        assert!(only_far.normal.approx_eq(Vec3::pos_z(), 1e-5));
    }

    #[test]
    fn scaled_hit_keeps_world_distance() {
        let mut scene = Scene::default();
        let id = scene.add(SceneObject::new_sphere(1.0));
        scene.node_mut(id).unwrap().set_local_scale(Vec3::new(1.0, 1.0, 3.0)).unwrap();
        let ray = Ray3::new(Vec3::new(0.0, 0.0, 10.0), Vec3::neg_z());
        let hit = scene.find_ray_intersection(&ray).unwrap().unwrap();
        assert!((hit.t - 7.0).abs() < 1e-4);
        assert!(hit.point.approx_eq(Vec3::new(0.0, 0.0, 3.0), 1e-4));
    }

    #[test]
    fn pre_render_reports_active_materials() {
        let mut scene = Scene::default();
        let id = scene.add(SceneObject::new_sphere(1.0));
        let highlight = std::sync::Arc::new(Material::default());
        scene.get_mut(id).unwrap().push_override_material(highlight.clone());
        let mut seen = Vec::new();
        scene.pre_render(&mut |so: SOId, m: &std::sync::Arc<Material>| seen.push((so, m.clone())));
        assert_eq!(seen.len(), 1);
        assert!(std::sync::Arc::ptr_eq(&seen[0].1, &highlight));
        assert_eq!(scene.frame_index(), 1);
    }

    #[test]
    fn pre_render_applies_keyframes() {
        let mut scene = Scene::default();
        let mut so = SceneObject::new_sphere(1.0);
        let mut keys = KeyframeSequence::new();
        keys.add(0.0, Frame::identity());
        keys.add(1.0, Frame::from_origin(Vec3::new(4.0, 0.0, 0.0)));
        so.set_keyframes(Some(keys));
        let id = scene.add(so);
        scene.set_current_time(0.5);
        scene.pre_render(&mut |_: SOId, _: &std::sync::Arc<Material>| {});
        let f = scene.node(id).unwrap().local_frame(CoordSpace::Object).unwrap();
        assert!(f.origin.approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn scene_root_rejects_non_uniform_scale() {
        let mut scene = Scene::default();
        assert!(matches!(
            scene.set_local_scale(Vec3::new(1.0, 2.0, 1.0)),
            Err(SceneError::UnsupportedOperation(_))
        ));
        scene.set_local_scale(Vec3::splat(3.0)).unwrap();
        assert_eq!(scene.local_scale(), Vec3::splat(3.0));
        assert!(scene.set_local_frame(Frame::identity(), CoordSpace::Scene).is_err());
    }
}
