//! Input events

use orrery_geom::Ray3;

use crate::scene::SORayHit;

use super::UIRayHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSide {
    Left,
    Right,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputDevice {
    Mouse,
    Gamepad,
    TabletFingers,
    OculusTouch,
    HTCViveWands,
    AnySpatialDevice,
}

impl InputDevice {
    /// Handed devices capture per side; the rest hold a single lock.
    pub fn is_handed(self) -> bool {
        matches!(
            self,
            InputDevice::OculusTouch | InputDevice::HTCViveWands | InputDevice::AnySpatialDevice
        )
    }
}

/// Identifies one input source: a device and, for handed devices, a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureKey {
    pub side: CaptureSide,
    pub device: InputDevice,
}

impl CaptureKey {
    pub fn new(side: CaptureSide, device: InputDevice) -> CaptureKey {
        CaptureKey { side, device }
    }

    /// Same device, and the same side or either side `Any`.
    pub fn conflicts(&self, other: &CaptureKey) -> bool {
        self.device == other.device
            && (self.side == other.side || self.side == CaptureSide::Any || other.side == CaptureSide::Any)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HandState {
    pub ray: Ray3,
    pub trigger: f32,
    pub grip: f32,
    pub button_a: bool,
    pub button_b: bool,
    pub connected: bool,
}

impl HandState {
    pub fn trigger_down(&self) -> bool {
        self.trigger > 0.5
    }
}

/// Snapshot of every device for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputState {
    pub mouse_connected: bool,
    pub mouse_ray: Ray3,
    pub mouse_left_down: bool,
    pub mouse_right_down: bool,
    pub mouse_wheel: f32,

    pub gamepad_connected: bool,
    pub gamepad_ray: Ray3,
    pub gamepad_a_down: bool,
    pub gamepad_left_trigger: f32,

    pub touch_connected: bool,
    pub touch_ray: Ray3,
    pub touch_down: bool,

    /// Which spatial controller family drives `left` and `right`.
    pub spatial_device: Option<InputDevice>,
    pub left: HandState,
    pub right: HandState,
}

impl InputState {
    pub fn is_connected(&self, key: CaptureKey) -> bool {
        match key.device {
            InputDevice::Mouse => self.mouse_connected,
            InputDevice::Gamepad => self.gamepad_connected,
            InputDevice::TabletFingers => self.touch_connected,
            spatial => {
                self.spatial_device == Some(spatial)
                    && match key.side {
                        CaptureSide::Left => self.left.connected,
                        CaptureSide::Right => self.right.connected,
                        CaptureSide::Any => self.left.connected || self.right.connected,
                    }
            }
        }
    }

    /// Keys of every connected source.
    pub fn sources(&self) -> Vec<CaptureKey> {
        let mut keys = Vec::new();
        if self.mouse_connected {
            keys.push(CaptureKey::new(CaptureSide::Any, InputDevice::Mouse));
        }
        if self.gamepad_connected {
            keys.push(CaptureKey::new(CaptureSide::Any, InputDevice::Gamepad));
        }
        if self.touch_connected {
            keys.push(CaptureKey::new(CaptureSide::Any, InputDevice::TabletFingers));
        }
        if let Some(device) = self.spatial_device {
            if self.left.connected {
                keys.push(CaptureKey::new(CaptureSide::Left, device));
            }
            if self.right.connected {
                keys.push(CaptureKey::new(CaptureSide::Right, device));
            }
        }
        keys
    }

    /// One event per connected source.
    pub fn events(&self) -> Vec<InputEvent> {
        self.sources()
            .into_iter()
            .map(|key| InputEvent::for_key(key, self))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnyRayHit {
    Scene(SORayHit),
    UI(UIRayHit),
}

impl AnyRayHit {
    pub fn t(&self) -> f32 {
        match self {
            AnyRayHit::Scene(h) => h.t,
            AnyRayHit::UI(h) => h.t,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub ray: Ray3,
    pub side: CaptureSide,
    pub device: InputDevice,
    pub input: InputState,
    pub hit: Option<AnyRayHit>,
}

impl InputEvent {
    /// Event for `key`, taking the ray that device and side report.
    pub fn for_key(key: CaptureKey, input: &InputState) -> InputEvent {
        let ray = match (key.device, key.side) {
            (InputDevice::Mouse, _) => input.mouse_ray,
            (InputDevice::Gamepad, _) => input.gamepad_ray,
            (InputDevice::TabletFingers, _) => input.touch_ray,
            (_, CaptureSide::Left) => input.left.ray,
            (_, _) => input.right.ray,
        };
        InputEvent {
            ray,
            side: key.side,
            device: key.device,
            input: input.clone(),
            hit: None,
        }
    }

    pub fn mouse(input: &InputState) -> InputEvent {
        Self::for_key(CaptureKey::new(CaptureSide::Any, InputDevice::Mouse), input)
    }

    pub fn gamepad(input: &InputState) -> InputEvent {
        Self::for_key(CaptureKey::new(CaptureSide::Any, InputDevice::Gamepad), input)
    }

    pub fn touch(input: &InputState) -> InputEvent {
        Self::for_key(CaptureKey::new(CaptureSide::Any, InputDevice::TabletFingers), input)
    }

    pub fn oculus_touch(side: CaptureSide, input: &InputState) -> InputEvent {
        Self::for_key(CaptureKey::new(side, InputDevice::OculusTouch), input)
    }

    pub fn htc_vive(side: CaptureSide, input: &InputState) -> InputEvent {
        Self::for_key(CaptureKey::new(side, InputDevice::HTCViveWands), input)
    }

    pub fn spatial(side: CaptureSide, input: &InputState) -> InputEvent {
        Self::for_key(CaptureKey::new(side, InputDevice::AnySpatialDevice), input)
    }

    pub fn with_hit(mut self, hit: AnyRayHit) -> InputEvent {
        self.hit = Some(hit);
        self
    }

    pub fn key(&self) -> CaptureKey {
        CaptureKey::new(self.side, self.device)
    }

    /// The primary button of the originating device.
    pub fn button_down(&self) -> bool {
        match self.device {
            InputDevice::Mouse => self.input.mouse_left_down,
            InputDevice::Gamepad => self.input.gamepad_a_down,
            InputDevice::TabletFingers => self.input.touch_down,
            _ => match self.side {
                CaptureSide::Left => self.input.left.trigger_down(),
                CaptureSide::Right => self.input.right.trigger_down(),
                CaptureSide::Any => self.input.left.trigger_down() || self.input.right.trigger_down(),
            },
        }
    }
}
