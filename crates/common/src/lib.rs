//! Shared types for the voxel runtime: entity ids, colours, startup config.

mod config;
mod types;

pub use config::{ConfigError, EngineConfig, GlVersion};
pub use types::{Color, EntityId};
