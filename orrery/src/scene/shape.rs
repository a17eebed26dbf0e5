//! Analytic ray tests for primitive shapes in object space
//!
//! Rays may carry an unnormalized direction; `t` is always in units of that
//! direction so callers can transform rays without rescaling hits.

use orrery_geom::{Ray3, Vec3};

fn nearest_root(a: f32, b: f32, c: f32) -> Option<f32> {
    if !(a > 0.0) {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = (-b - sq) / (2.0 * a);
    let t1 = (-b + sq) / (2.0 * a);
    let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Sphere of `radius` centered on the origin.
pub fn ray_sphere(ray: &Ray3, radius: f32) -> Option<(f32, Vec3)> {
    let (o, d) = (ray.origin, ray.direction);
    let t = nearest_root(d.dot(d), 2.0 * o.dot(d), o.dot(o) - radius * radius)?;
    Some((t, ray.point_at(t).normalized()))
}

/// Capped cylinder of `radius` along Y, centered on the origin.
pub fn ray_cylinder(ray: &Ray3, radius: f32, height: f32) -> Option<(f32, Vec3)> {
    let (o, d) = (ray.origin, ray.direction);
    let half = height * 0.5;
    let mut best: Option<(f32, Vec3)> = None;
    let mut consider = |t: f32, n: Vec3| {
        if t >= 0.0 && best.map_or(true, |(bt, _)| t < bt) {
            best = Some((t, n));
        }
    };

    // Thresholds are relative to |d| so unnormalized rays behave the same.
    let dd = d.dot(d);
    let a = d.x * d.x + d.z * d.z;
    let b = 2.0 * (o.x * d.x + o.z * d.z);
    let c = o.x * o.x + o.z * o.z - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if a > f32::EPSILON * dd && disc >= 0.0 {
        let sq = disc.sqrt();
        for &t in &[(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
            let p = ray.point_at(t);
            if p.y.abs() <= half {
                consider(t, Vec3::new(p.x, 0.0, p.z).normalized());
            }
        }
    }

    if d.y * d.y > f32::EPSILON * dd {
        for &(y, ny) in &[(half, 1.0f32), (-half, -1.0)] {
            let t = (y - o.y) / d.y;
            let p = ray.point_at(t);
            if p.x * p.x + p.z * p.z <= radius * radius {
                consider(t, Vec3::new(0.0, ny, 0.0));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_front_hit() {
        let ray = Ray3::new(Vec3::new(0.0, 0.0, 5.0), Vec3::neg_z());
        let (t, n) = ray_sphere(&ray, 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(n.approx_eq(Vec3::pos_z(), 1e-5));
    }

    #[test]
    fn sphere_hit_from_inside_exits() {
        let ray = Ray3::new(Vec3::zero(), Vec3::pos_x());
        let (t, _) = ray_sphere(&ray, 2.0).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn unnormalized_direction_scales_t() {
        let ray = Ray3 {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, -2.0),
        };
        let (t, _) = ray_sphere(&ray, 1.0).unwrap();
        assert!((t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn tiny_direction_still_hits() {
        let d = Vec3::new(0.0, 0.0, -1e-4);
        let ray = Ray3 {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: d,
        };
        let (t, _) = ray_sphere(&ray, 1.0).unwrap();
        assert!((t - 4e4).abs() < 1.0);
        let (t, n) = ray_cylinder(&Ray3 { origin: Vec3::new(0.0, 5.0, 0.0), direction: Vec3::new(0.0, -1e-4, 0.0) }, 1.0, 2.0).unwrap();
        assert!((t - 4e4).abs() < 1.0);
        assert!(n.approx_eq(Vec3::pos_y(), 1e-5));
    }

    #[test]
    fn cylinder_side_and_cap() {
        let side = Ray3::new(Vec3::new(5.0, 0.0, 0.0), Vec3::neg_x());
        let (t, n) = ray_cylinder(&side, 1.0, 2.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(n.approx_eq(Vec3::pos_x(), 1e-5));

        let top = Ray3::new(Vec3::new(0.2, 5.0, 0.0), Vec3::neg_y());
        let (t, n) = ray_cylinder(&top, 1.0, 2.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(n.approx_eq(Vec3::pos_y(), 1e-6));

        let miss = Ray3::new(Vec3::new(5.0, 3.0, 0.0), Vec3::neg_x());
        assert!(ray_cylinder(&miss, 1.0, 2.0).is_none());
    }
}
