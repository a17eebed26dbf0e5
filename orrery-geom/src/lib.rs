//! Geometric Math

mod aabb;
mod frame;
mod mat3;
mod quat;
mod ray;
mod vec2;
mod vec3;

pub use aabb::*;
pub use frame::*;
pub use mat3::*;
pub use quat::*;
pub use ray::*;
pub use vec2::*;
pub use vec3::*;

pub const DEG2RAD: f32 = std::f32::consts::PI / 180.0;
pub const RAD2DEG: f32 = 180.0 / std::f32::consts::PI;

/// Tolerance used by the `approx_eq` helpers of this crate.
pub const ZERO_TOLERANCE: f32 = 1e-5;

pub fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

pub trait ScalarArray: Sized {
    type Scalar;

    fn scalar_count() -> usize;
}
