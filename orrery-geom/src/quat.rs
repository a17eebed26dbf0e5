//! Quaternion

use std::ops::{Mul, Neg};

use crate::{Mat3, Vec3, DEG2RAD};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    v: Vec3,
    w: f32,
}

impl Quaternion {
    /// Rotation of `theta` radians around `axis`.
    pub fn axis_angle(axis: Vec3, theta: f32) -> Quaternion {
        let (s, c) = (theta * 0.5).sin_cos();
        Self::new_impl_v(axis.normalized() * s, c)
    }

    pub fn axis_angle_deg(axis: Vec3, degrees: f32) -> Quaternion {
        Self::axis_angle(axis, degrees * DEG2RAD)
    }

    pub const fn identity() -> Quaternion {
        Self::new_impl(0.0, 0.0, 0.0, 1.0)
    }

    pub const fn new_impl(x: f32, y: f32, z: f32, w: f32) -> Quaternion {
        Quaternion {
            v: Vec3::new(x, y, z),
            w,
        }
    }

    const fn new_impl_v(v: Vec3, w: f32) -> Quaternion {
        Quaternion { v, w }
    }

    pub fn x(self) -> f32 {
        self.v.x
    }

    pub fn y(self) -> f32 {
        self.v.y
    }

    pub fn z(self) -> f32 {
        self.v.z
    }

    pub fn w(self) -> f32 {
        self.w
    }

    /// Rotation whose local axes map onto the given orthonormal basis.
    pub fn from_axes(x: Vec3, y: Vec3, z: Vec3) -> Quaternion {
        Mat3::new(x, y, z).into()
    }

    /// Rotation whose Z axis points along `forward`, with Y as close to `up` as possible.
    pub fn look_forward(forward: Vec3, up: Vec3) -> Quaternion {
        let z = forward.normalized();
        let mut x = up.cross(z);
        if x.magnitude_sqr() < f32::EPSILON {
            x = Vec3::pos_y().cross(z);
            if x.magnitude_sqr() < f32::EPSILON {
                x = Vec3::pos_x();
            }
        }
        let x = x.normalized();
        let y = z.cross(x);
        Self::from_axes(x, y, z)
    }

    /// Shortest-arc rotation taking direction `from` onto direction `to`.
    pub fn from_to(from: Vec3, to: Vec3) -> Quaternion {
        let a = from.normalized();
        let b = to.normalized();
        let d = a.dot(b);
        if d > 1.0 - 1e-6 {
            return Self::identity();
        }
        if d < -1.0 + 1e-6 {
            let mut axis = Vec3::pos_x().cross(a);
            if axis.magnitude_sqr() < 1e-6 {
                axis = Vec3::pos_y().cross(a);
            }
            return Self::axis_angle(axis, std::f32::consts::PI);
        }
        Self::new_impl_v(a.cross(b), 1.0 + d).normalized()
    }

    pub fn conj(self) -> Quaternion {
        Self::new_impl_v(-self.v, self.w)
    }

    /// Inverse of a unit quaternion.
    pub fn inv(self) -> Quaternion {
        self.conj()
    }

    pub fn dot(self, rhs: Quaternion) -> f32 {
        self.v.dot(rhs.v) + self.w * rhs.w
    }

    pub fn normalized(self) -> Quaternion {
        let len = self.dot(self).sqrt();
        if len > f32::EPSILON {
            Self::new_impl_v(self.v / len, self.w / len)
        } else {
            Self::identity()
        }
    }

    /// Rotates `p` by this quaternion.
    pub fn apply_to(self, p: Vec3) -> Vec3 {
        let t = 2.0 * self.v.cross(p);
        p + self.w * t + self.v.cross(t)
    }

    pub fn axis_x(self) -> Vec3 {
        self.apply_to(Vec3::pos_x())
    }

    pub fn axis_y(self) -> Vec3 {
        self.apply_to(Vec3::pos_y())
    }

    pub fn axis_z(self) -> Vec3 {
        self.apply_to(Vec3::pos_z())
    }

    pub fn slerp(self, rhs: Quaternion, t: f32) -> Quaternion {
        let mut d = self.dot(rhs);
        let rhs = if d < 0.0 {
            d = -d;
            -rhs
        } else {
            rhs
        };
        if d > 0.9995 {
            return Self::new_impl_v(
                self.v + (rhs.v - self.v) * t,
                self.w + (rhs.w - self.w) * t,
            )
            .normalized();
        }
        let theta = d.acos();
        let s = theta.sin();
        let a = ((1.0 - t) * theta).sin() / s;
        let b = (t * theta).sin() / s;
        Self::new_impl_v(self.v * a + rhs.v * b, self.w * a + rhs.w * b)
    }

    /// Equality up to sign, since `q` and `-q` describe the same rotation.
    pub fn approx_eq(self, rhs: Quaternion, eps: f32) -> bool {
        (self.dot(rhs).abs() - 1.0).abs() <= eps
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Into<[f32; 4]> for Quaternion {
    fn into(self) -> [f32; 4] {
        [self.v.x, self.v.y, self.v.z, self.w]
    }
}

impl From<[f32; 4]> for Quaternion {
    fn from(a: [f32; 4]) -> Self {
        Quaternion::new_impl(a[0], a[1], a[2], a[3]).normalized()
    }
}

impl Into<Mat3> for Quaternion {
    fn into(self) -> Mat3 {
        let (x, y, z, w) = (self.v.x, self.v.y, self.v.z, self.w);
        let xx = x * x;
        let yy = y * y;
        let zz = z * z;
        let xy = x * y;
        let yz = y * z;
        let zx = z * x;
        let xw = x * w;
        let yw = y * w;
        let zw = z * w;

        Mat3::new(
            Vec3::new(1.0 - 2.0 * (yy + zz), 2.0 * (xy + zw), 2.0 * (zx - yw)),
            Vec3::new(2.0 * (xy - zw), 1.0 - 2.0 * (xx + zz), 2.0 * (yz + xw)),
            Vec3::new(2.0 * (zx + yw), 2.0 * (yz - xw), 1.0 - 2.0 * (xx + yy)),
        )
    }
}

impl From<Mat3> for Quaternion {
    fn from(m: Mat3) -> Self {
        // m[col][row]
        let trace = m[0][0] + m[1][1] + m[2][2];
        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quaternion::new_impl(
                (m[1][2] - m[2][1]) / s,
                (m[2][0] - m[0][2]) / s,
                (m[0][1] - m[1][0]) / s,
                0.25 * s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt() * 2.0;
            Quaternion::new_impl(
                0.25 * s,
                (m[1][0] + m[0][1]) / s,
                (m[2][0] + m[0][2]) / s,
                (m[1][2] - m[2][1]) / s,
            )
        } else if m[1][1] > m[2][2] {
            let s = (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt() * 2.0;
            Quaternion::new_impl(
                (m[1][0] + m[0][1]) / s,
                0.25 * s,
                (m[2][1] + m[1][2]) / s,
                (m[2][0] - m[0][2]) / s,
            )
        } else {
            let s = (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt() * 2.0;
            Quaternion::new_impl(
                (m[2][0] + m[0][2]) / s,
                (m[2][1] + m[1][2]) / s,
                0.25 * s,
                (m[0][1] - m[1][0]) / s,
            )
        };
        q.normalized()
    }
}

impl Neg for Quaternion {
    type Output = Quaternion;

    fn neg(self) -> Self::Output {
        Quaternion::new_impl_v(-self.v, -self.w)
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: Quaternion) -> Self::Output {
        Self::new_impl_v(
            self.w * rhs.v + self.v * rhs.w + self.v.cross(rhs.v),
            self.w * rhs.w - self.v.dot(rhs.v),
        )
    }
}

impl Mul<Vec3> for Quaternion {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Self::Output {
        self.apply_to(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_about_y() {
        let q = Quaternion::axis_angle_deg(Vec3::pos_y(), 90.0);
        let v = q.apply_to(Vec3::pos_x());
        assert!(v.approx_eq(Vec3::neg_z(), 1e-5));
    }

    #[test]
    fn matrix_round_trip() {
        let q = Quaternion::axis_angle(Vec3::new(1.0, 2.0, 3.0), 1.1);
        let m: Mat3 = q.into();
        let p = Vec3::new(0.3, -2.0, 5.0);
        assert!((m * p).approx_eq(q.apply_to(p), 1e-4));
        let back = Quaternion::from(m);
        assert!(back.approx_eq(q, 1e-5));
    }

    #[test]
    fn from_to_maps_directions() {
        let q = Quaternion::from_to(Vec3::pos_z(), Vec3::new(1.0, 1.0, 0.0));
        assert!(q
            .apply_to(Vec3::pos_z())
            .approx_eq(Vec3::new(1.0, 1.0, 0.0).normalized(), 1e-5));
        let flip = Quaternion::from_to(Vec3::pos_z(), Vec3::neg_z());
        assert!(flip.apply_to(Vec3::pos_z()).approx_eq(Vec3::neg_z(), 1e-5));
    }

    #[test]
    fn look_forward_points_z() {
        let q = Quaternion::look_forward(Vec3::new(0.0, 0.0, -1.0), Vec3::pos_y());
        assert!(q.axis_z().approx_eq(Vec3::neg_z(), 1e-5));
        assert!(q.axis_y().approx_eq(Vec3::pos_y(), 1e-5));
    }

    #[test]
    fn slerp_halfway() {
        let a = Quaternion::identity();
        let b = Quaternion::axis_angle_deg(Vec3::pos_y(), 90.0);
        let h = a.slerp(b, 0.5);
        assert!(h.approx_eq(Quaternion::axis_angle_deg(Vec3::pos_y(), 45.0), 1e-5));
    }
}
