//! Camera and view context

use orrery_geom::{Frame, Ray3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pose: Frame,
    fov_y: f32,
    aspect: f32,
    near_clip: f32,
    far_clip: f32,
}

impl Camera {
    /// `fov_y` in radians. Looks down +Z of `pose`.
    pub fn perspective(pose: Frame, aspect: f32, fov_y: f32, near_clip: f32, far_clip: f32) -> Camera {
        assert!(aspect > 0.0);
        assert!((fov_y > 0.0) && (fov_y < std::f32::consts::PI));
        assert!(near_clip > 0.0);
        assert!(far_clip > near_clip);
        Camera {
            pose,
            fov_y,
            aspect,
            near_clip,
            far_clip,
        }
    }

    pub fn pose(&self) -> Frame {
        self.pose
    }

    pub fn set_pose(&mut self, pose: Frame) {
        self.pose = pose;
    }

    pub fn position(&self) -> Vec3 {
        self.pose.origin
    }

    pub fn forward(&self) -> Vec3 {
        self.pose.z()
    }

    pub fn up(&self) -> Vec3 {
        self.pose.y()
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near_clip(&self) -> f32 {
        self.near_clip
    }

    pub fn far_clip(&self) -> f32 {
        self.far_clip
    }

    /// World ray through normalized device coordinates `(x, y)` in `[-1, 1]`.
    pub fn ray_through(&self, x: f32, y: f32) -> Ray3 {
        let hh = (self.fov_y * 0.5).tan();
        let hw = hh * self.aspect;
        let local = Vec3::new(-x * hw, y * hh, 1.0);
        Ray3::new(self.pose.origin, self.pose.from_frame_v(local))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera::perspective(Frame::identity(), 16.0 / 9.0, 60f32.to_radians(), 0.01, 1000.0)
    }
}

/// View state handed explicitly to anything that needs the camera.
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
    pub camera: Camera,
}

impl ViewContext {
    pub fn new(camera: Camera) -> ViewContext {
        ViewContext { camera }
    }
}
