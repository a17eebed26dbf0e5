//! 3D Vector

use std::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

use crate::{ScalarArray, Vec2, RAD2DEG};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }

    pub const fn from_xy(xy: Vec2, z: f32) -> Vec3 {
        Self::new(xy.x, xy.y, z)
    }

    pub const fn splat(v: f32) -> Vec3 {
        Self::new(v, v, v)
    }

    pub const fn one() -> Vec3 {
        Self::new(1.0, 1.0, 1.0)
    }

    pub const fn zero() -> Vec3 {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn pos_x() -> Vec3 {
        Self::new(1.0, 0.0, 0.0)
    }

    pub const fn neg_x() -> Vec3 {
        Self::new(-1.0, 0.0, 0.0)
    }

    pub const fn pos_y() -> Vec3 {
        Self::new(0.0, 1.0, 0.0)
    }

    pub const fn neg_y() -> Vec3 {
        Self::new(0.0, -1.0, 0.0)
    }

    pub const fn pos_z() -> Vec3 {
        Self::new(0.0, 0.0, 1.0)
    }

    pub const fn neg_z() -> Vec3 {
        Self::new(0.0, 0.0, -1.0)
    }

    pub fn dot(self, rhs: Vec3) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn magnitude_sqr(self) -> f32 {
        self.dot(self)
    }

    pub fn magnitude(self) -> f32 {
        self.magnitude_sqr().sqrt()
    }

    pub fn distance(self, rhs: Vec3) -> f32 {
        (self - rhs).magnitude()
    }

    /// Normalizes in place. A zero-length vector is left untouched.
    pub fn normalize(&mut self) {
        *self = self.normalized();
    }

    /// Unit-length copy; the zero vector maps to itself.
    pub fn normalized(self) -> Self {
        let len = self.magnitude();
        if len > f32::EPSILON {
            self / len
        } else {
            Vec3::zero()
        }
    }

    /// Unsigned angle between two vectors, in degrees.
    pub fn angle_deg(self, rhs: Vec3) -> f32 {
        let d = self.normalized().dot(rhs.normalized()).max(-1.0).min(1.0);
        d.acos() * RAD2DEG
    }

    pub fn min(self, rhs: Vec3) -> Vec3 {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y), self.z.min(rhs.z))
    }

    pub fn max(self, rhs: Vec3) -> Vec3 {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y), self.z.max(rhs.z))
    }

    pub fn abs(self) -> Vec3 {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn max_component(self) -> f32 {
        self.x.max(self.y).max(self.z)
    }

    pub fn lerp(self, rhs: Vec3, t: f32) -> Vec3 {
        self + (rhs - self) * t
    }

    pub fn approx_eq(self, rhs: Vec3, eps: f32) -> bool {
        (self.x - rhs.x).abs() <= eps
            && (self.y - rhs.y).abs() <= eps
            && (self.z - rhs.z).abs() <= eps
    }

    pub const fn xy(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub const fn xz(self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::zero()
    }
}

impl Into<(f32, f32, f32)> for Vec3 {
    fn into(self) -> (f32, f32, f32) {
        (self.x, self.y, self.z)
    }
}

impl Into<[f32; 3]> for Vec3 {
    fn into(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(a: [f32; 3]) -> Self {
        Vec3::new(a[0], a[1], a[2])
    }
}

impl ScalarArray for Vec3 {
    type Scalar = f32;

    fn scalar_count() -> usize {
        3
    }
}

impl Index<usize> for Vec3 {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index {} out of range", index),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 index {} out of range", index),
        }
    }
}

impl Add<f32> for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: f32) -> Self::Output {
        Self::new(self.x + rhs, self.y + rhs, self.z + rhs)
    }
}

impl Add<Vec3> for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign<Vec3> for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub<f32> for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: f32) -> Self::Output {
        Self::new(self.x - rhs, self.y - rhs, self.z - rhs)
    }
}

impl Sub<Vec3> for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign<Vec3> for Vec3 {
    fn sub_assign(&mut self, rhs: Vec3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Self::Output {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vec3> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Self::Output {
        Vec3::new(self * rhs.x, self * rhs.y, self * rhs.z)
    }
}

impl MulAssign<f32> for Vec3 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

impl MulAssign<Vec3> for Vec3 {
    fn mul_assign(&mut self, rhs: Vec3) {
        self.x *= rhs.x;
        self.y *= rhs.y;
        self.z *= rhs.z;
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;

    fn div(self, rhs: f32) -> Self::Output {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Div<Vec3> for Vec3 {
    type Output = Vec3;

    fn div(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x / rhs.x, self.y / rhs.y, self.z / rhs.z)
    }
}

impl DivAssign<f32> for Vec3 {
    fn div_assign(&mut self, rhs: f32) {
        self.x /= rhs;
        self.y /= rhs;
        self.z /= rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_zero_stays_zero() {
        assert_eq!(Vec3::zero().normalized(), Vec3::zero());
        let v = Vec3::new(3.0, 0.0, 4.0).normalized();
        assert!((v.magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn angle_between_axes() {
        assert!((Vec3::pos_x().angle_deg(Vec3::pos_y()) - 90.0).abs() < 1e-4);
        assert!(Vec3::pos_x().angle_deg(Vec3::pos_x()).abs() < 1e-2);
        assert!((Vec3::pos_x().angle_deg(Vec3::neg_x()) - 180.0).abs() < 1e-3);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vec3::pos_x().cross(Vec3::pos_y()), Vec3::pos_z());
    }
}
