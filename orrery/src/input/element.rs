//! Interactive scene UI elements

use orrery_geom::{Ray3, Vec3};

use super::{InputEvent, UIElementId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UIRayHit {
    /// Filled in by the dispatcher; elements report the null key.
    pub element: UIElementId,
    pub point: Vec3,
    pub normal: Vec3,
    pub t: f32,
}

impl UIRayHit {
    pub fn new(point: Vec3, normal: Vec3, t: f32) -> UIRayHit {
        UIRayHit {
            element: UIElementId::default(),
            point,
            normal,
            t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureResult {
    Continue,
    End,
}

/// Capture and hover contract of interactive elements.
///
/// Capture runs `wants_capture`, then `begin_capture`, then one
/// `update_capture` per frame until it returns [`CaptureResult::End`] or the
/// dispatcher forces `end_capture`. An element that ends its own capture
/// does not receive `end_capture` afterwards.
pub trait SceneUIElement {
    fn name(&self) -> &str;

    fn is_visible(&self) -> bool {
        true
    }

    fn pre_render(&mut self) {}

    fn find_ray_intersection(&self, ray: &Ray3) -> Option<UIRayHit>;

    fn find_hover_ray_intersection(&self, ray: &Ray3) -> Option<UIRayHit> {
        self.find_ray_intersection(ray)
    }

    fn wants_capture(&mut self, e: &InputEvent) -> bool;

    fn begin_capture(&mut self, e: &InputEvent) -> bool;

    fn update_capture(&mut self, e: &InputEvent) -> CaptureResult;

    fn end_capture(&mut self, e: &InputEvent);

    fn enable_hover(&self) -> bool {
        false
    }

    fn update_hover(&mut self, _ray: &Ray3, _hit: &UIRayHit) {}

    fn end_hover(&mut self, _ray: &Ray3) {}
}
