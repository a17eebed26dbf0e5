//! Keyframe animation of object frames

use orrery_geom::Frame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    pub frame: Frame,
}

/// Keyframes kept sorted by time. At most one key per time value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyframeSequence {
    keys: Vec<Keyframe>,
}

impl KeyframeSequence {
    pub fn new() -> KeyframeSequence {
        KeyframeSequence { keys: Vec::new() }
    }

    /// Inserts a key, replacing any key at exactly the same time.
    pub fn add(&mut self, time: f64, frame: Frame) {
        match self
            .keys
            .binary_search_by(|k| k.time.partial_cmp(&time).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => self.keys[i].frame = frame,
            Err(i) => self.keys.insert(i, Keyframe { time, frame }),
        }
    }

    pub fn remove_at(&mut self, time: f64) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k.time != time);
        self.keys.len() != before
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyframe> {
        self.keys.iter()
    }

    /// `(first, last)` key times, `(0, 0)` when empty.
    pub fn valid_range(&self) -> (f64, f64) {
        match (self.keys.first(), self.keys.last()) {
            (Some(a), Some(b)) => (a.time, b.time),
            _ => (0.0, 0.0),
        }
    }

    /// Frame at `time`, clamped to the valid range.
    pub fn sample(&self, time: f64) -> Option<Frame> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if time <= first.time {
            return Some(first.frame);
        }
        if time >= last.time {
            return Some(last.frame);
        }
        let i = self.keys.iter().position(|k| k.time > time)?;
        let (a, b) = (&self.keys[i - 1], &self.keys[i]);
        let t = ((time - a.time) / (b.time - a.time)) as f32;
        Some(Frame::new(
            a.frame.origin.lerp(b.frame.origin, t),
            a.frame.rotation.slerp(b.frame.rotation, t),
        ))
    }
}
