//! Rigid frames

use crate::{Quaternion, Vec3};

/// A rigid transform: an origin and an orientation, no scale.
///
/// Points are mapped out of the frame ("from frame") as `origin + rotation * p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Vec3,
    pub rotation: Quaternion,
}

impl Frame {
    pub const fn new(origin: Vec3, rotation: Quaternion) -> Frame {
        Frame { origin, rotation }
    }

    pub const fn identity() -> Frame {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    pub const fn from_origin(origin: Vec3) -> Frame {
        Self::new(origin, Quaternion::identity())
    }

    /// Frame at `origin` whose Z axis is `normal`.
    pub fn from_normal(origin: Vec3, normal: Vec3) -> Frame {
        Self::new(origin, Quaternion::from_to(Vec3::pos_z(), normal))
    }

    pub fn x(&self) -> Vec3 {
        self.rotation.axis_x()
    }

    pub fn y(&self) -> Vec3 {
        self.rotation.axis_y()
    }

    pub fn z(&self) -> Vec3 {
        self.rotation.axis_z()
    }

    pub fn axis(&self, index: usize) -> Vec3 {
        match index {
            0 => self.x(),
            1 => self.y(),
            _ => self.z(),
        }
    }

    /// Local point to parent coordinates.
    pub fn from_frame_p(&self, p: Vec3) -> Vec3 {
        self.origin + self.rotation.apply_to(p)
    }

    /// Local direction to parent coordinates.
    pub fn from_frame_v(&self, v: Vec3) -> Vec3 {
        self.rotation.apply_to(v)
    }

    /// Parent point to local coordinates.
    pub fn to_frame_p(&self, p: Vec3) -> Vec3 {
        self.rotation.inv().apply_to(p - self.origin)
    }

    /// Parent direction to local coordinates.
    pub fn to_frame_v(&self, v: Vec3) -> Vec3 {
        self.rotation.inv().apply_to(v)
    }

    /// `self ∘ child`: the child frame (given in this frame's coordinates)
    /// expressed in this frame's parent coordinates.
    pub fn compose(&self, child: &Frame) -> Frame {
        Frame::new(
            self.from_frame_p(child.origin),
            (self.rotation * child.rotation).normalized(),
        )
    }

    pub fn inverse(&self) -> Frame {
        let inv = self.rotation.inv();
        Frame::new(-inv.apply_to(self.origin), inv)
    }

    /// Expresses `other` (a frame in the same parent space as `self`) in
    /// this frame's local coordinates. Inverse of [`Frame::compose`].
    pub fn to_frame(&self, other: &Frame) -> Frame {
        self.inverse().compose(other)
    }

    pub fn translated(&self, delta: Vec3) -> Frame {
        Frame::new(self.origin + delta, self.rotation)
    }

    /// Rotates the frame about its own origin by `q` (given in parent space).
    pub fn rotated(&self, q: Quaternion) -> Frame {
        Frame::new(self.origin, (q * self.rotation).normalized())
    }

    pub fn rotated_around(&self, point: Vec3, q: Quaternion) -> Frame {
        Frame::new(
            point + q.apply_to(self.origin - point),
            (q * self.rotation).normalized(),
        )
    }

    /// Intersects a ray with the plane through `origin` whose normal is the
    /// given frame axis. `None` when the ray is parallel to the plane.
    pub fn ray_plane_intersection(&self, ray_origin: Vec3, ray_dir: Vec3, axis: usize) -> Option<Vec3> {
        let n = self.axis(axis);
        let denom = ray_dir.dot(n);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let t = (self.origin - ray_origin).dot(n) / denom;
        Some(ray_origin + ray_dir * t)
    }

    pub fn approx_eq(&self, rhs: &Frame, eps: f32) -> bool {
        self.origin.approx_eq(rhs.origin, eps) && self.rotation.approx_eq(rhs.rotation, eps)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::identity()
    }
}
