//! Top-level driver of the runtime core.
//!
//! [`Game`] owns the frame timestep and publishes the per-frame messages in a
//! fixed order:
//!
//! 1. `UpdateMessage`
//! 2. `BlockPreRender`, then `BlockRender`
//! 3. `GuiRender` once per `GuiDepth`, back to front
//!
//! Shutdown publishes a single `DestroyMessage`, the last message of the
//! process.

mod camera;
mod clock;
mod context;
mod display;
mod game;
mod overlay;
mod timing;
mod world;

pub use camera::{Camera, FlyCamera};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::AppContext;
pub use display::{Display, DisplayError, HeadlessDisplay};
pub use game::{Collaborators, EngineError, Game, GameState, RunSummary};
pub use overlay::DebugOverlay;
pub use timing::{FrameLimiter, FrameStats};
pub use world::{NullWorld, WorldStorage};
