use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Millisecond time source for the frame timestep.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock, counting from its creation.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same reading.
///
/// With a step set, every reading advances the clock by that step afterwards,
/// giving a fixed simulated frame time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    step: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stepping(step_ms: u64) -> Self {
        Self {
            now: Rc::default(),
            step: step_ms,
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
