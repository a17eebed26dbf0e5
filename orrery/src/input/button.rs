//! Clickable box element

use orrery_geom::{Aabb3, Frame, Ray3, Vec3};

use super::{CaptureResult, InputEvent, SceneUIElement, UIRayHit};

type ClickHandler = Box<dyn FnMut(&InputEvent)>;

/// Box-shaped button in World space. Press captures, release over the
/// button clicks.
pub struct ButtonElement {
    name: String,
    frame: Frame,
    extents: Vec3,
    visible: bool,
    hovered: bool,
    pressed: bool,
    clicks: u32,
    on_click: Option<ClickHandler>,
}

impl ButtonElement {
    pub fn new<S: Into<String>>(name: S, frame: Frame, extents: Vec3) -> ButtonElement {
        ButtonElement {
            name: name.into(),
            frame,
            extents,
            visible: true,
            hovered: false,
            pressed: false,
            clicks: 0,
            on_click: None,
        }
    }

    pub fn on_click<F: FnMut(&InputEvent) + 'static>(mut self, f: F) -> ButtonElement {
        self.on_click = Some(Box::new(f));
        self
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }
}

impl SceneUIElement for ButtonElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn find_ray_intersection(&self, ray: &Ray3) -> Option<UIRayHit> {
        let local = Ray3 {
            origin: self.frame.to_frame_p(ray.origin),
            direction: self.frame.to_frame_v(ray.direction),
        };
        let (t, n) = Aabb3::from_center_extents(Vec3::zero(), self.extents).ray_intersection(&local)?;
        Some(UIRayHit::new(ray.point_at(t), self.frame.from_frame_v(n), t))
    }

    fn wants_capture(&mut self, e: &InputEvent) -> bool {
        self.visible && e.button_down() && self.find_ray_intersection(&e.ray).is_some()
    }

    fn begin_capture(&mut self, _e: &InputEvent) -> bool {
        self.pressed = true;
        true
    }

    fn update_capture(&mut self, e: &InputEvent) -> CaptureResult {
        if e.button_down() {
            return CaptureResult::Continue;
        }
        self.pressed = false;
        if self.find_ray_intersection(&e.ray).is_some() {
            self.clicks += 1;
            log::debug!("{} clicked", self.name);
            if let Some(f) = self.on_click.as_mut() {
                f(e);
            }
        }
        CaptureResult::End
    }

    fn end_capture(&mut self, _e: &InputEvent) {
        self.pressed = false;
    }

    fn enable_hover(&self) -> bool {
        true
    }

    fn update_hover(&mut self, _ray: &Ray3, _hit: &UIRayHit) {
        self.hovered = true;
    }

    fn end_hover(&mut self, _ray: &Ray3) {
        self.hovered = false;
    }
}
