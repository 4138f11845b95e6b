use std::time::{Duration, Instant};

/// Wall-clock cost of every frame in a run, folded as it goes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    frames: u32,
    total: Duration,
    slowest: Duration,
}

impl FrameStats {
    pub fn record(&mut self, dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.total = self.total.saturating_add(dt);
        self.slowest = self.slowest.max(dt);
    }

    /// Mean frame cost; zero before the first frame.
    pub fn average(&self) -> Duration {
        self.total.checked_div(self.frames).unwrap_or_default()
    }

    pub fn slowest(&self) -> Duration {
        self.slowest
    }
}

/// Caps the frame rate by sleeping out the rest of each frame interval.
#[derive(Debug, Default)]
pub struct FrameLimiter {
    last: Option<Instant>,
}

impl FrameLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time still owed to reach `target_fps`, measured from the previous call.
    pub fn remaining(&self, target_fps: u32) -> Duration {
        if target_fps == 0 {
            return Duration::ZERO;
        }
        let interval = Duration::from_secs(1) / target_fps;
        match self.last {
            Some(last) => interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Block until the current frame interval is over. Returns the time slept.
    pub fn wait(&mut self, target_fps: u32) -> Duration {
        let owed = self.remaining(target_fps);
        if !owed.is_zero() {
            std::thread::sleep(owed);
        }
        self.last = Some(Instant::now());
        owed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_reports_zero() {
        let stats = FrameStats::default();
        assert_eq!(stats.average(), Duration::ZERO);
        assert_eq!(stats.slowest(), Duration::ZERO);
    }

    #[test]
    fn stats_cover_the_whole_run() {
        let mut stats = FrameStats::default();
        for ms in [4, 40, 7, 1] {
            stats.record(Duration::from_millis(ms));
        }
        // an early spike is still the slowest frame after later fast ones
        assert_eq!(stats.slowest(), Duration::from_millis(40));
        assert_eq!(stats.average(), Duration::from_millis(13));
    }

    #[test]
    fn limiter_first_frame_does_not_sleep() {
        let mut limiter = FrameLimiter::new();
        assert_eq!(limiter.wait(60), Duration::ZERO);
    }

    #[test]
    fn limiter_caps_to_interval() {
        let mut limiter = FrameLimiter::new();
        limiter.wait(100);
        let owed = limiter.remaining(100);
        assert!(owed <= Duration::from_millis(10));
        let start = Instant::now();
        limiter.wait(100);
        assert!(start.elapsed() + Duration::from_millis(1) >= owed);
    }

    #[test]
    fn uncapped_never_sleeps() {
        let mut limiter = FrameLimiter::new();
        limiter.wait(0);
        assert_eq!(limiter.remaining(0), Duration::ZERO);
    }
}
