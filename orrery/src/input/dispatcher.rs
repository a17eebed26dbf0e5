//! Capture dispatch
//!
//! The dispatcher owns the per-source capture locks. At most one element
//! captures a given [`CaptureKey`], and a key with side `Any` excludes both
//! hands of the same device while it is held.

use orrery_geom::Ray3;
use slotmap::SlotMap;

use super::{
    AnyRayHit, CaptureError, CaptureKey, CaptureResult, CaptureSide, HoverTracker, InputDevice,
    InputEvent, SceneUIElement, UIElementId, UIRayHit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing { side: CaptureSide, device: InputDevice },
}

pub(crate) struct ElementSlot {
    pub element: Box<dyn SceneUIElement>,
    pub state: CaptureState,
}

struct ActiveCapture {
    key: CaptureKey,
    element: UIElementId,
    last_event: InputEvent,
}

/// Outcome of feeding one event to [`InputDispatcher::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Ignored,
    Blocked,
    Began(UIElementId),
    Declined(UIElementId),
    Continued(UIElementId),
    Released(UIElementId),
}

#[derive(Default)]
pub struct InputDispatcher {
    elements: SlotMap<UIElementId, ElementSlot>,
    captures: Vec<ActiveCapture>,
    pending_want: Option<(UIElementId, CaptureKey, u64)>,
    hover: HoverTracker,
    frame: u64,
}

impl InputDispatcher {
    pub fn new() -> InputDispatcher {
        InputDispatcher::default()
    }

    pub fn add_element(&mut self, element: Box<dyn SceneUIElement>) -> UIElementId {
        log::debug!("Registered UI element {}", element.name());
        self.elements.insert(ElementSlot {
            element,
            state: CaptureState::Idle,
        })
    }

    pub fn remove_element(&mut self, id: UIElementId) -> Result<Box<dyn SceneUIElement>, CaptureError> {
        let mut slot = self.elements.remove(id).ok_or(CaptureError::UnknownElement(id))?;
        if let Some(index) = self.captures.iter().position(|c| c.element == id) {
            let capture = self.captures.swap_remove(index);
            slot.element.end_capture(&capture.last_event);
        }
        self.hover.end_element(id, &mut slot);
        if matches!(self.pending_want, Some((p, _, _)) if p == id) {
            self.pending_want = None;
        }
        Ok(slot.element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: UIElementId) -> Option<&dyn SceneUIElement> {
        self.elements.get(id).map(|s| s.element.as_ref())
    }

    pub fn element_mut(&mut self, id: UIElementId) -> Option<&mut (dyn SceneUIElement + 'static)> {
        self.elements.get_mut(id).map(|s| s.element.as_mut())
    }

    /// Starts a new frame. A `wants_capture` answer is only valid for
    /// `begin_capture` within the frame it was given.
    pub fn new_frame(&mut self) {
        self.frame += 1;
        self.pending_want = None;
    }

    pub fn capture_state(&self, id: UIElementId) -> Result<CaptureState, CaptureError> {
        self.elements
            .get(id)
            .map(|s| s.state)
            .ok_or(CaptureError::UnknownElement(id))
    }

    pub fn capturing(&self, key: CaptureKey) -> Option<UIElementId> {
        self.captures.iter().find(|c| c.key == key).map(|c| c.element)
    }

    pub fn lock_holder(&self, key: CaptureKey) -> Option<(CaptureKey, UIElementId)> {
        self.captures
            .iter()
            .find(|c| c.key.conflicts(&key))
            .map(|c| (c.key, c.element))
    }

    pub fn active_captures(&self) -> Vec<(CaptureKey, UIElementId)> {
        self.captures.iter().map(|c| (c.key, c.element)).collect()
    }

    /// Visible elements hit by `ray`, front to back. Equal distances keep
    /// registration order.
    pub fn hit_candidates(&self, ray: &Ray3) -> Vec<UIRayHit> {
        let mut hits: Vec<UIRayHit> = self
            .elements
            .iter()
            .filter(|(_, s)| s.element.is_visible())
            .filter_map(|(id, s)| {
                s.element.find_ray_intersection(ray).map(|mut h| {
                    h.element = id;
                    h
                })
            })
            .collect();
        hits.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap_or(std::cmp::Ordering::Equal));
        hits
    }

    pub fn find_ray_intersection(&self, ray: &Ray3) -> Option<UIRayHit> {
        self.hit_candidates(ray).into_iter().next()
    }

    /// Routes one event. A source that holds a capture feeds its element
    /// only; otherwise idle candidates are offered the capture front to back
    /// and the first one that wants it is asked to begin.
    pub fn dispatch(&mut self, event: &InputEvent) -> Result<DispatchResult, CaptureError> {
        let key = event.key();
        if let Some(id) = self.capturing(key) {
            return match self.update_capture(id, event)? {
                CaptureResult::Continue => Ok(DispatchResult::Continued(id)),
                CaptureResult::End => Ok(DispatchResult::Released(id)),
            };
        }
        if self.lock_holder(key).is_some() {
            return Ok(DispatchResult::Blocked);
        }

        for hit in self.hit_candidates(&event.ray) {
            let id = hit.element;
            if self.elements.get(id).map_or(true, |s| s.state != CaptureState::Idle) {
                continue;
            }
            let e = event.clone().with_hit(AnyRayHit::UI(hit));
            if !self.ask_wants(id, &e)? {
                continue;
            }
            return if self.begin_capture(id, &e)? {
                Ok(DispatchResult::Began(id))
            } else {
                Ok(DispatchResult::Declined(id))
            };
        }
        Ok(DispatchResult::Ignored)
    }

    fn ask_wants(&mut self, id: UIElementId, e: &InputEvent) -> Result<bool, CaptureError> {
        let key = e.key();
        if let Some((held, owner)) = self.lock_holder(key) {
            log::warn!(
                "Rejected capture request of {:?} for {:?}: held by {:?} via {:?}",
                id,
                key,
                owner,
                held
            );
            return Err(CaptureError::InvalidState(format!(
                "{:?} is already captured by {:?}",
                key, owner
            )));
        }
        let slot = self.elements.get_mut(id).ok_or(CaptureError::UnknownElement(id))?;
        if slot.state != CaptureState::Idle {
            return Err(CaptureError::InvalidState(format!("{:?} is already capturing", id)));
        }
        let wants = slot.element.wants_capture(e);
        if wants {
            self.pending_want = Some((id, key, self.frame));
        }
        Ok(wants)
    }

    pub fn request_capture(&mut self, id: UIElementId, e: &InputEvent) -> Result<bool, CaptureError> {
        if !self.ask_wants(id, e)? {
            return Ok(false);
        }
        self.begin_capture(id, e)
    }

    /// Requires a `true` from `wants_capture` for the same element and
    /// source earlier this frame. A refusal leaves the element idle.
    pub fn begin_capture(&mut self, id: UIElementId, e: &InputEvent) -> Result<bool, CaptureError> {
        let key = e.key();
        if self.pending_want.take() != Some((id, key, self.frame)) {
            log::warn!("Rejected begin_capture of {:?} for {:?} without wants_capture", id, key);
            return Err(CaptureError::ContractViolation(format!(
                "begin_capture of {:?} for {:?} without a preceding wants_capture",
                id, key
            )));
        }
        if let Some((_, owner)) = self.lock_holder(key) {
            log::warn!("Rejected begin_capture of {:?}: {:?} holds {:?}", id, owner, key);
            return Err(CaptureError::InvalidState(format!(
                "{:?} is already captured by {:?}",
                key, owner
            )));
        }
        let slot = self.elements.get_mut(id).ok_or(CaptureError::UnknownElement(id))?;
        if !slot.element.begin_capture(e) {
            log::warn!("{} declined capture after wanting it", slot.element.name());
            return Ok(false);
        }
        slot.state = CaptureState::Capturing {
            side: key.side,
            device: key.device,
        };
        self.captures.push(ActiveCapture {
            key,
            element: id,
            last_event: e.clone(),
        });
        log::debug!("{} captured {:?}", slot.element.name(), key);
        Ok(true)
    }

    /// Feeds a captured element. Releases the lock when it returns
    /// [`CaptureResult::End`].
    pub fn update_capture(&mut self, id: UIElementId, e: &InputEvent) -> Result<CaptureResult, CaptureError> {
        let key = e.key();
        let index = self
            .captures
            .iter()
            .position(|c| c.element == id && c.key == key)
            .ok_or_else(|| {
                log::warn!("Rejected update_capture of {:?}: not capturing {:?}", id, key);
                CaptureError::ContractViolation(format!("{:?} is not capturing {:?}", id, key))
            })?;
        let slot = self.elements.get_mut(id).ok_or(CaptureError::UnknownElement(id))?;
        let result = slot.element.update_capture(e);
        match result {
            CaptureResult::Continue => self.captures[index].last_event = e.clone(),
            CaptureResult::End => {
                slot.state = CaptureState::Idle;
                self.captures.swap_remove(index);
                log::debug!("{} released {:?}", slot.element.name(), key);
            }
        }
        Ok(result)
    }

    pub fn end_capture(&mut self, key: CaptureKey, e: &InputEvent) -> Result<Option<UIElementId>, CaptureError> {
        let index = match self.captures.iter().position(|c| c.key == key) {
            Some(index) => index,
            None => return Ok(None),
        };
        let capture = self.captures.swap_remove(index);
        let slot = self
            .elements
            .get_mut(capture.element)
            .ok_or(CaptureError::UnknownElement(capture.element))?;
        slot.element.end_capture(e);
        slot.state = CaptureState::Idle;
        log::debug!("Ended capture of {} on {:?}", slot.element.name(), key);
        Ok(Some(capture.element))
    }

    /// Ends every capture of `device`, replaying each capture's last event.
    pub fn end_device_captures(&mut self, device: InputDevice) -> Vec<UIElementId> {
        let keys: Vec<(CaptureKey, InputEvent)> = self
            .captures
            .iter()
            .filter(|c| c.key.device == device)
            .map(|c| (c.key, c.last_event.clone()))
            .collect();
        let mut ended = Vec::new();
        for (key, e) in keys {
            match self.end_capture(key, &e) {
                Ok(Some(id)) => ended.push(id),
                Ok(None) => {}
                Err(err) => log::warn!("Failed to end capture on {:?}: {}", key, err),
            }
        }
        ended
    }

    pub fn update_hover(&mut self, source: CaptureKey, ray: &Ray3) -> Option<UIElementId> {
        self.hover.update(source, ray, &mut self.elements)
    }

    pub fn end_hover(&mut self, source: CaptureKey) {
        self.hover.end(source, &mut self.elements)
    }

    pub fn end_all_hover(&mut self) {
        self.hover.end_all(&mut self.elements)
    }

    pub fn hovered(&self, source: CaptureKey) -> Option<UIElementId> {
        self.hover.hovered(source)
    }

    pub fn pre_render(&mut self) {
        for (_, slot) in self.elements.iter_mut() {
            slot.element.pre_render();
        }
    }
}
