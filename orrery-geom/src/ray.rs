//! Rays and lines

use crate::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray3 {
    /// Creates a ray; the direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Ray3 {
        Ray3 {
            origin,
            direction: direction.normalized(),
        }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Parameter of the point on the ray closest to `p`, clamped to the ray.
    pub fn project(&self, p: Vec3) -> f32 {
        (p - self.origin).dot(self.direction).max(0.0)
    }
}

impl Default for Ray3 {
    fn default() -> Self {
        Ray3 {
            origin: Vec3::zero(),
            direction: Vec3::pos_z(),
        }
    }
}

/// Infinite line through `origin` along unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line3 {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Line3 {
    pub fn new(origin: Vec3, direction: Vec3) -> Line3 {
        Line3 {
            origin,
            direction: direction.normalized(),
        }
    }

    pub fn point_at(&self, s: f32) -> Vec3 {
        self.origin + self.direction * s
    }

    /// Line parameter of the closest point between this line and `ray`.
    pub fn closest_param_to_ray(&self, ray: &Ray3) -> f32 {
        let diff = self.origin - ray.origin;
        let a01 = -self.direction.dot(ray.direction);
        let b0 = diff.dot(self.direction);
        let det = (1.0 - a01 * a01).abs();
        if det >= 1e-8 {
            let b1 = -diff.dot(ray.direction);
            let s1 = a01 * b0 - b1;
            if s1 >= 0.0 {
                return (a01 * b1 - b0) / det;
            }
        }
        // parallel, or the closest ray point is its origin
        -b0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_param_to_crossing_ray() {
        let line = Line3::new(Vec3::zero(), Vec3::pos_x());
        let ray = Ray3::new(Vec3::new(3.0, 5.0, 1.0), Vec3::neg_y());
        assert!((line.closest_param_to_ray(&ray) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn closest_param_when_ray_points_away() {
        let line = Line3::new(Vec3::zero(), Vec3::pos_x());
        let ray = Ray3::new(Vec3::new(2.0, 5.0, 0.0), Vec3::pos_y());
        assert!((line.closest_param_to_ray(&ray) - 2.0).abs() < 1e-5);
    }
}
