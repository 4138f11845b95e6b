use std::collections::VecDeque;

use crate::key::Key;
use crate::listener::InputFocus;

/// Keyboard/mouse device collaborator.
pub trait InputDevice {
    /// Pull pending device events. Called once per frame.
    fn poll(&mut self);
    fn is_key_down(&self, key: Key) -> bool;
    /// Confine the pointer to the window.
    fn set_grabbed(&mut self, grabbed: bool);
    fn is_grabbed(&self) -> bool;
}

/// Headless device replaying a fixed script of held keys, one entry per poll.
///
/// Once the script runs out every key reads as released.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<Vec<Key>>,
    held: [bool; Key::COUNT],
    grabbed: bool,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one frame during which `keys` are held.
    pub fn then(mut self, keys: &[Key]) -> Self {
        self.frames.push_back(keys.to_vec());
        self
    }

    /// Append `count` frames with nothing held.
    pub fn idle(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.frames.push_back(Vec::new());
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputDevice for ScriptedInput {
    fn poll(&mut self) {
        self.held = [false; Key::COUNT];
        if let Some(keys) = self.frames.pop_front() {
            for key in keys {
                self.held[key.index()] = true;
            }
        }
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.held[key.index()]
    }

    fn set_grabbed(&mut self, grabbed: bool) {
        self.grabbed = grabbed;
    }

    fn is_grabbed(&self) -> bool {
        self.grabbed
    }
}

/// Per-frame view of the input device.
pub struct InputCapturer {
    device: Box<dyn InputDevice>,
    down: [bool; Key::COUNT],
    previous: [bool; Key::COUNT],
    focus: InputFocus,
}

impl std::fmt::Debug for InputCapturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputCapturer")
            .field("down", &self.down)
            .field("grabbed", &self.device.is_grabbed())
            .finish()
    }
}

impl InputCapturer {
    pub fn new(device: Box<dyn InputDevice>) -> Self {
        Self {
            device,
            down: [false; Key::COUNT],
            previous: [false; Key::COUNT],
            focus: InputFocus::new(),
        }
    }

    /// Poll the device and latch this frame's key states.
    pub fn sample(&mut self) {
        self.device.poll();
        self.previous = self.down;
        for key in Key::ALL {
            self.down[key.index()] = self.device.is_key_down(key);
        }
        tracing::trace!(down = ?self.held_keys(), "input sampled");
    }

    /// Level-triggered: held during this frame.
    pub fn is_key_down(&self, key: Key) -> bool {
        self.down[key.index()]
    }

    /// Edge-triggered: went down this frame.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.down[key.index()] && !self.previous[key.index()]
    }

    pub fn held_keys(&self) -> Vec<Key> {
        Key::ALL.into_iter().filter(|k| self.down[k.index()]).collect()
    }

    pub fn set_grabbed(&mut self, grabbed: bool) {
        if self.device.is_grabbed() != grabbed {
            tracing::debug!(grabbed, "pointer grab changed");
        }
        self.device.set_grabbed(grabbed);
    }

    pub fn is_grabbed(&self) -> bool {
        self.device.is_grabbed()
    }

    /// Focus arbitration shared by every input listener.
    pub fn focus(&self) -> &InputFocus {
        &self.focus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capturer(script: ScriptedInput) -> InputCapturer {
        InputCapturer::new(Box::new(script))
    }

    #[test]
    fn pressed_fires_once_per_press() {
        let mut input = capturer(
            ScriptedInput::new()
                .then(&[Key::Grave])
                .then(&[Key::Grave])
                .then(&[])
                .then(&[Key::Grave]),
        );
        let mut presses = Vec::new();
        let mut downs = Vec::new();
        for _ in 0..4 {
            input.sample();
            presses.push(input.is_key_pressed(Key::Grave));
            downs.push(input.is_key_down(Key::Grave));
        }
        assert_eq!(presses, vec![true, false, false, true]);
        assert_eq!(downs, vec![true, true, false, true]);
    }

    #[test]
    fn exhausted_script_releases_everything() {
        let mut input = capturer(ScriptedInput::new().then(&[Key::W, Key::LShift]));
        input.sample();
        assert_eq!(input.held_keys(), vec![Key::W, Key::LShift]);
        input.sample();
        assert!(input.held_keys().is_empty());
    }

    #[test]
    fn grab_is_forwarded_to_device() {
        let mut input = capturer(ScriptedInput::new());
        assert!(!input.is_grabbed());
        input.set_grabbed(true);
        assert!(input.is_grabbed());
    }
}
