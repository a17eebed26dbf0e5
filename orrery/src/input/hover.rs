//! Hover tracking

use orrery_geom::Ray3;
use slotmap::SlotMap;

use super::{dispatcher::ElementSlot, CaptureKey, UIElementId, UIRayHit};

struct ActiveHover {
    source: CaptureKey,
    element: UIElementId,
    last_ray: Ray3,
}

/// Per hover source, the single element the source currently hovers.
#[derive(Default)]
pub struct HoverTracker {
    active: Vec<ActiveHover>,
}

impl HoverTracker {
    pub fn new() -> HoverTracker {
        HoverTracker::default()
    }

    pub fn hovered(&self, source: CaptureKey) -> Option<UIElementId> {
        self.active.iter().find(|h| h.source == source).map(|h| h.element)
    }

    fn nearest(elements: &SlotMap<UIElementId, ElementSlot>, ray: &Ray3) -> Option<(UIElementId, UIRayHit)> {
        let mut best: Option<(UIElementId, UIRayHit)> = None;
        for (id, slot) in elements.iter() {
            if !slot.element.is_visible() || !slot.element.enable_hover() {
                continue;
            }
            if let Some(mut hit) = slot.element.find_hover_ray_intersection(ray) {
                if best.map_or(true, |(_, b)| hit.t < b.t) {
                    hit.element = id;
                    best = Some((id, hit));
                }
            }
        }
        best
    }

    /// Casts `ray` for `source`. Ends the previous hover when the nearest
    /// target changed, then updates the new one.
    pub(crate) fn update(
        &mut self,
        source: CaptureKey,
        ray: &Ray3,
        elements: &mut SlotMap<UIElementId, ElementSlot>,
    ) -> Option<UIElementId> {
        let target = Self::nearest(elements, ray);
        let previous = self.active.iter().position(|h| h.source == source);
        if let Some(index) = previous {
            if target.map(|(id, _)| id) != Some(self.active[index].element) {
                let old = self.active.swap_remove(index);
                if let Some(slot) = elements.get_mut(old.element) {
                    slot.element.end_hover(ray);
                }
            }
        }
        let (id, hit) = target?;
        if let Some(slot) = elements.get_mut(id) {
            slot.element.update_hover(ray, &hit);
        }
        match self.active.iter_mut().find(|h| h.source == source) {
            Some(h) => h.last_ray = *ray,
            None => self.active.push(ActiveHover {
                source,
                element: id,
                last_ray: *ray,
            }),
        }
        Some(id)
    }

    pub(crate) fn end(&mut self, source: CaptureKey, elements: &mut SlotMap<UIElementId, ElementSlot>) {
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].source == source {
                let old = self.active.swap_remove(i);
                if let Some(slot) = elements.get_mut(old.element) {
                    slot.element.end_hover(&old.last_ray);
                }
            } else {
                i += 1;
            }
        }
    }

    pub(crate) fn end_all(&mut self, elements: &mut SlotMap<UIElementId, ElementSlot>) {
        for old in self.active.drain(..) {
            if let Some(slot) = elements.get_mut(old.element) {
                slot.element.end_hover(&old.last_ray);
            }
        }
    }

    /// Ends every hover on `element`, which the caller is about to drop.
    pub(crate) fn end_element(&mut self, element: UIElementId, slot: &mut ElementSlot) {
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].element == element {
                let old = self.active.swap_remove(i);
                slot.element.end_hover(&old.last_ray);
            } else {
                i += 1;
            }
        }
    }
}
