//! Math helpers for VR interaction: plane angles, stable plane picking and
//! visual-angle sizing.

use orrery_geom::{Frame, Line3, Quaternion, Ray3, Vec3, DEG2RAD, RAD2DEG};

use crate::scene::{Curve, Scene, ViewContext};

/// Default altitude threshold of [`safe_ray_plane_intersection`], in degrees.
pub const DEFAULT_PLANE_ANGLE_THRESH: f32 = 10.0;

/// Vertices whose direction from the eye is outside this cosine are ignored
/// by [`estimate_stable_curve_width`] (45 degrees).
pub const VIEW_CONE_DOT_THRESH: f32 = 0.707106;

fn flatten(mut v: Vec3, axis: usize) -> Option<Vec3> {
    if axis > 2 {
        log::warn!("plane angle about axis {} (expected 0, 1 or 2)", axis);
        return None;
    }
    v[axis] = 0.0;
    Some(v.normalized())
}

/// Unsigned angle in degrees between `a` and `b` projected onto the plane
/// whose normal is the given coordinate axis (0 = X, 1 = Y, 2 = Z). Any
/// other axis gives 0.
pub fn plane_angle(a: Vec3, b: Vec3, axis: usize) -> f32 {
    match (flatten(a, axis), flatten(b, axis)) {
        (Some(a), Some(b)) => a.angle_deg(b),
        _ => 0.0,
    }
}

/// Signed version of [`plane_angle`]; positive when the rotation from `from`
/// to `to` is counter-clockwise about the axis.
pub fn plane_angle_signed(from: Vec3, to: Vec3, axis: usize) -> f32 {
    match (flatten(from, axis), flatten(to, axis)) {
        (Some(from), Some(to)) => sign(from.cross(to)[axis]) * from.angle_deg(to),
        _ => 0.0,
    }
}

/// Signed angle about an arbitrary plane normal.
pub fn plane_angle_signed_n(from: Vec3, to: Vec3, normal: Vec3) -> f32 {
    let from = (from - normal * from.dot(normal)).normalized();
    let to = (to - normal * to.dot(normal)).normalized();
    sign(from.cross(to).dot(normal)) * from.angle_deg(to)
}

fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Normalized linear blend of two directions.
pub fn angle_lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    (a * (1.0 - t) + b * t).normalized()
}

pub fn arc_length_deg(radius: f32, span_deg: f32) -> f32 {
    radius * span_deg * DEG2RAD
}

/// Chord length that subtends `angle_deg` at the eye, for a point at
/// `world_pos`.
pub fn vr_radius_for_visual_angle(world_pos: Vec3, eye_pos: Vec3, angle_deg: f32) -> f32 {
    let r = world_pos.distance(eye_pos);
    2.0 * r * (angle_deg * DEG2RAD * 0.5).sin()
}

/// Ray from the origin. Horizontal angle in [-180, 180], negative to the
/// left; vertical angle in [-90, 90], negative down.
pub fn make_ray_from_sphere_center(horz_deg: f32, vert_deg: f32) -> Ray3 {
    let theta = horz_deg * DEG2RAD;
    let phi = std::f32::consts::FRAC_PI_2 - vert_deg * DEG2RAD;
    let d = Vec3::new(theta.sin() * phi.sin(), phi.cos(), theta.cos() * phi.sin());
    Ray3::new(Vec3::zero(), d)
}

/// Radius of the circle cut from a sphere by the plane at height `slice_y`.
pub fn sphere_slice_radius(sphere_r: f32, slice_y: f32) -> f32 {
    let h = sphere_r - slice_y.abs();
    (h * (2.0 * sphere_r - h)).sqrt()
}

/// Angle in degrees spanned by a step of `step_width` along the sphere slice
/// at `vert_deg`.
pub fn horizontal_step_angle(sphere_r: f32, vert_deg: f32, step_width: f32) -> f32 {
    let slice_y = sphere_r * (vert_deg * DEG2RAD).sin();
    let slice_r = sphere_slice_radius(sphere_r, slice_y);
    2.0 * (step_width / (2.0 * slice_r)).asin() * RAD2DEG
}

/// Ray/plane hit that stays bounded near grazing angles.
///
/// When the ray origin lies within `angle_thresh_deg` of the plane's
/// altitude the plane hit is replaced by the closest point between the ray
/// and the in-plane line through `plane_origin` perpendicular to `forward`.
pub fn safe_ray_plane_intersection(
    ray: &Ray3,
    forward: Vec3,
    plane_origin: Vec3,
    plane_normal: Vec3,
    angle_thresh_deg: f32,
) -> Vec3 {
    let origin_angle = plane_normal.angle_deg((plane_origin - ray.origin).normalized());
    let unstable = (origin_angle - 90.0).abs() < angle_thresh_deg;

    if !unstable {
        let plane = Frame::from_normal(plane_origin, plane_normal);
        if let Some(hit) = plane.ray_plane_intersection(ray.origin, ray.direction, 2) {
            return hit;
        }
    }

    let forward_in_plane = (forward - plane_normal * plane_normal.dot(forward)).normalized();
    let perp = Quaternion::axis_angle_deg(plane_normal, 90.0).apply_to(forward_in_plane);
    let s = Line3::new(plane_origin, perp).closest_param_to_ray(ray);
    plane_origin + perp * s
}

/// Average visual-angle radius of the curve vertices inside a level,
/// forward-facing view cone, in World units.
///
/// Returns exactly `0.0` when no sampled vertex is inside the cone; callers
/// must treat that as "no estimate".
pub fn estimate_stable_curve_width(
    view: &ViewContext,
    scene: &Scene,
    curve_frame_s: &Frame,
    curve: &Curve,
    visual_angle_deg: f32,
) -> f32 {
    let mut forward = view.camera.forward();
    forward.y = 0.0;
    let forward = scene.to_scene_n(forward.normalized());
    let eye = scene.to_scene_p(view.camera.position());

    let vertices = curve.vertices();
    let stride = (vertices.len() / 10).max(2);
    let mut sum = 0.0;
    let mut count = 0;
    for v in vertices.iter().step_by(stride) {
        let p = curve_frame_s.from_frame_p(*v);
        if (p - eye).normalized().dot(forward) < VIEW_CONE_DOT_THRESH {
            continue;
        }
        sum += vr_radius_for_visual_angle(p, eye, visual_angle_deg);
        count += 1;
    }
    if count == 0 || sum == 0.0 {
        0.0
    } else {
        scene.to_world_dimension(sum / count as f32)
    }
}
