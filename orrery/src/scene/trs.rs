//! Transform

use orrery_geom::{Frame, Mat3, Quaternion, Vec3};

/// Frame plus per-axis scale. Scale is applied in local coordinates before
/// the frame maps a point out to the parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub(crate) frame: Frame,
    pub(crate) scale: Vec3,
}

impl Transform {
    pub const fn new(frame: Frame, scale: Vec3) -> Transform {
        Transform { frame, scale }
    }

    pub const fn identity() -> Transform {
        Self::new(Frame::identity(), Vec3::one())
    }

    pub const fn from_frame(frame: Frame) -> Transform {
        Self::new(frame, Vec3::one())
    }

    pub fn lookat(eye: Vec3, dst: Vec3, up: Vec3) -> Transform {
        Transform {
            frame: Frame::new(eye, Quaternion::look_forward(dst - eye, up)),
            scale: Vec3::one(),
        }
    }

    pub fn local_to_parent(&self, position: Vec3) -> Vec3 {
        self.frame.from_frame_p(self.scale * position)
    }

    pub fn parent_to_local(&self, position: Vec3) -> Vec3 {
        self.frame.to_frame_p(position) / self.scale
    }

    /// Maps a direction out of the frame without renormalizing, so ray
    /// parameters survive the round trip.
    pub fn direction_to_parent(&self, dir: Vec3) -> Vec3 {
        self.frame.from_frame_v(self.scale * dir)
    }

    pub fn direction_to_local(&self, dir: Vec3) -> Vec3 {
        self.frame.to_frame_v(dir) / self.scale
    }

    /// Normals transform by the inverse-transpose, which for a scaled
    /// rotation is a division by the scale.
    pub fn normal_to_parent(&self, n: Vec3) -> Vec3 {
        self.frame.from_frame_v(n / self.scale).normalized()
    }

    /// `self ∘ child` where the child's origin is scaled by this transform.
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            frame: Frame::new(
                self.local_to_parent(child.frame.origin),
                (self.frame.rotation * child.frame.rotation).normalized(),
            ),
            scale: self.scale * child.scale,
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn rotation_scale(&self) -> Mat3 {
        let mut rot: Mat3 = self.frame.rotation.into();
        rot.cols[0] *= self.scale.x;
        rot.cols[1] *= self.scale.y;
        rot.cols[2] *= self.scale.z;
        rot
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
