//! Scene environment: the day/night phase machine and the lighting and fog
//! uniforms it feeds to the block shader.
//!
//! # Invariants
//! - After every update the elapsed time is below the current phase's
//!   duration; large deltas roll over as many phases as needed.
//! - The global light's interpolated colour is also the fog colour.
//! - Only the environment writes the lighting and fog uniforms.

mod day;
mod environment;

pub use day::{DayCycle, DayState, EnvError, LightSource};
pub use environment::Environment;
