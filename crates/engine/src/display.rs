use voxel_common::GlVersion;

use crate::timing::FrameLimiter;

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("could not create {width}x{height} context with GL {gl}: {reason}")]
    ContextCreation {
        width: u32,
        height: u32,
        gl: GlVersion,
        reason: String,
    },
}

/// Window and rendering-context collaborator.
pub trait Display {
    fn create(
        &mut self,
        width: u32,
        height: u32,
        gl: GlVersion,
        title: &str,
    ) -> Result<(), DisplayError>;
    /// Block to hold the frame rate at `target_fps`.
    fn sync(&mut self, target_fps: u32);
    fn swap_buffers(&mut self);
    fn is_close_requested(&self) -> bool;
    fn destroy(&mut self);
}

/// Window-less display. Requests close after a set number of presented
/// frames, if given.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    close_after: Option<u64>,
    limit_rate: bool,
    fail_create: bool,
    limiter: FrameLimiter,
    created: bool,
    presented: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            limit_rate: true,
            ..Self::default()
        }
    }

    pub fn close_after(mut self, frames: u64) -> Self {
        self.close_after = Some(frames);
        self
    }

    /// Skip the frame-rate cap; frames run back to back.
    pub fn unlimited(mut self) -> Self {
        self.limit_rate = false;
        self
    }

    /// Make context creation fail.
    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Display for HeadlessDisplay {
    fn create(
        &mut self,
        width: u32,
        height: u32,
        gl: GlVersion,
        title: &str,
    ) -> Result<(), DisplayError> {
        if self.fail_create {
            return Err(DisplayError::ContextCreation {
                width,
                height,
                gl,
                reason: "no display available".into(),
            });
        }
        self.created = true;
        tracing::info!(width, height, %gl, title, "headless display created");
        Ok(())
    }

    fn sync(&mut self, target_fps: u32) {
        if self.limit_rate {
            self.limiter.wait(target_fps);
        }
    }

    fn swap_buffers(&mut self) {
        self.presented += 1;
    }

    fn is_close_requested(&self) -> bool {
        self.close_after.is_some_and(|n| self.presented >= n)
    }

    fn destroy(&mut self) {
        if self.created {
            self.created = false;
            tracing::info!(frames = self.presented, "headless display destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_after_frames() {
        let mut display = HeadlessDisplay::new().unlimited().close_after(2);
        display.create(640, 480, GlVersion::default(), "test").unwrap();
        assert!(!display.is_close_requested());
        display.swap_buffers();
        assert!(!display.is_close_requested());
        display.swap_buffers();
        assert!(display.is_close_requested());
        display.destroy();
        assert!(!display.is_created());
    }

    #[test]
    fn failing_create_reports_context() {
        let mut display = HeadlessDisplay::new().failing();
        let err = display.create(640, 480, GlVersion::default(), "test").unwrap_err();
        assert!(err.to_string().contains("640x480"));
        assert!(err.to_string().contains("3.2 core"));
    }
}
