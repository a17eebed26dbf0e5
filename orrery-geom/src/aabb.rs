//! Axis-aligned bounding boxes

use crate::{Ray3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub const fn new(min: Vec3, max: Vec3) -> Aabb3 {
        Aabb3 { min, max }
    }

    /// Inverted box that contains nothing; `contain` grows it.
    pub const fn empty() -> Aabb3 {
        Self::new(Vec3::splat(f32::MAX), Vec3::splat(f32::MIN))
    }

    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Aabb3 {
        Self::new(center - extents, center + extents)
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Aabb3 {
        let mut b = Self::empty();
        for p in points {
            b.contain(p);
        }
        b
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn contain(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, rhs: &Aabb3) -> Aabb3 {
        if rhs.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *rhs;
        }
        Self::new(self.min.min(rhs.min), self.max.max(rhs.max))
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis.
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }

    /// Maps all eight corners through `f` and re-fits an axis-aligned box.
    pub fn map_corners<F: Fn(Vec3) -> Vec3>(&self, f: F) -> Aabb3 {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(self.corners().iter().map(|&c| f(c)))
    }

    /// Slab test. Returns the nearest non-negative ray parameter and the
    /// outward normal of the face that was hit. A ray starting inside the
    /// box reports its exit face.
    pub fn ray_intersection(&self, ray: &Ray3) -> Option<(f32, Vec3)> {
        if self.is_empty() {
            return None;
        }
        let mut t_near = -f32::MAX;
        let mut t_far = f32::MAX;
        let mut near_axis = 0;
        let mut far_axis = 0;
        let parallel = f32::EPSILON * ray.direction.magnitude();
        for i in 0..3 {
            let o = ray.origin[i];
            let d = ray.direction[i];
            if d.abs() <= parallel {
                if o < self.min[i] || o > self.max[i] {
                    return None;
                }
                continue;
            }
            let mut t0 = (self.min[i] - o) / d;
            let mut t1 = (self.max[i] - o) / d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_near {
                t_near = t0;
                near_axis = i;
            }
            if t1 < t_far {
                t_far = t1;
                far_axis = i;
            }
            if t_near > t_far {
                return None;
            }
        }
        let face_normal = |axis: usize, t: f32| {
            let p = ray.point_at(t);
            let mut n = Vec3::zero();
            n[axis] = if (p[axis] - self.max[axis]).abs() < (p[axis] - self.min[axis]).abs() {
                1.0
            } else {
                -1.0
            };
            n
        };
        if t_near >= 0.0 {
            Some((t_near, face_normal(near_axis, t_near)))
        } else if t_far >= 0.0 {
            Some((t_far, face_normal(far_axis, t_far)))
        } else {
            None
        }
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slab_hit_front_face() {
        let b = Aabb3::from_center_extents(Vec3::zero(), Vec3::one());
        let ray = Ray3::new(Vec3::new(0.0, 0.0, 5.0), Vec3::neg_z());
        let (t, n) = b.ray_intersection(&ray).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert_eq!(n, Vec3::pos_z());
    }

    #[test]
    fn slab_miss() {
        let b = Aabb3::from_center_extents(Vec3::zero(), Vec3::one());
        let ray = Ray3::new(Vec3::new(3.0, 0.0, 5.0), Vec3::neg_z());
        assert!(b.ray_intersection(&ray).is_none());
    }

    #[test]
    fn slab_hit_with_tiny_direction() {
        let b = Aabb3::from_center_extents(Vec3::zero(), Vec3::one());
        let ray = Ray3 {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, -1e-4),
        };
        let (t, n) = b.ray_intersection(&ray).unwrap();
        assert!((t - 4e4).abs() < 1.0);
        assert_eq!(n, Vec3::pos_z());
    }

    #[test]
    fn empty_box_union_is_identity() {
        let b = Aabb3::from_center_extents(Vec3::one(), Vec3::one());
        assert_eq!(Aabb3::empty().union(&b), b);
        assert!(Aabb3::empty().is_empty());
    }
}
