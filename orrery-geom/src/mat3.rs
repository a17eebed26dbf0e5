//! Matrix3x3

use std::ops::{Div, Index, IndexMut, Mul};

use crate::Vec3;

/// Column-major 3x3 matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub cols: [Vec3; 3],
}

impl Mat3 {
    pub const fn new(col0: Vec3, col1: Vec3, col2: Vec3) -> Mat3 {
        Mat3 {
            cols: [col0, col1, col2],
        }
    }

    pub const fn zero() -> Mat3 {
        Self::eye(0.0)
    }

    pub const fn identity() -> Mat3 {
        Self::eye(1.0)
    }

    pub const fn eye(val: f32) -> Mat3 {
        Self::new(
            Vec3::new(val, 0.0, 0.0),
            Vec3::new(0.0, val, 0.0),
            Vec3::new(0.0, 0.0, val),
        )
    }

    pub fn from_diagonal(d: Vec3) -> Mat3 {
        Self::new(
            Vec3::new(d.x, 0.0, 0.0),
            Vec3::new(0.0, d.y, 0.0),
            Vec3::new(0.0, 0.0, d.z),
        )
    }

    pub fn transposed(&self) -> Mat3 {
        Self::new(
            Vec3::new(self[0][0], self[1][0], self[2][0]),
            Vec3::new(self[0][1], self[1][1], self[2][1]),
            Vec3::new(self[0][2], self[1][2], self[2][2]),
        )
    }

    pub fn det(&self) -> f32 {
        self[0].dot(self[1].cross(self[2]))
    }

    /// Inverse via the adjugate. Singular matrices yield non-finite entries.
    pub fn inv(&self) -> Mat3 {
        let adj = Mat3::new(
            self[1].cross(self[2]),
            self[2].cross(self[0]),
            self[0].cross(self[1]),
        );
        adj.transposed() / self.det()
    }

    /// Entry-wise absolute value, used to re-fit boxes through rotations.
    pub fn abs(&self) -> Mat3 {
        Self::new(self[0].abs(), self[1].abs(), self[2].abs())
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Index<usize> for Mat3 {
    type Output = Vec3;

    fn index(&self, index: usize) -> &Self::Output {
        &self.cols[index]
    }
}

impl IndexMut<usize> for Mat3 {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.cols[index]
    }
}

impl Mul<f32> for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self[0] * rhs, self[1] * rhs, self[2] * rhs)
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Self::Output {
        self[0] * rhs.x + self[1] * rhs.y + self[2] * rhs.z
    }
}

impl Mul<Mat3> for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: Mat3) -> Self::Output {
        Self::new(self * rhs[0], self * rhs[1], self * rhs[2])
    }
}

impl Div<f32> for Mat3 {
    type Output = Mat3;

    fn div(self, rhs: f32) -> Self::Output {
        Self::new(self[0] / rhs, self[1] / rhs, self[2] / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_times_self_is_identity() {
        let m = Mat3::new(
            Vec3::new(2.0, 0.5, 0.0),
            Vec3::new(0.0, 3.0, 1.0),
            Vec3::new(1.0, 0.0, 4.0),
        );
        let p = m * m.inv();
        for c in 0..3 {
            assert!(p[c].approx_eq(Mat3::identity()[c], 1e-5));
        }
    }
}
