//! Shader abstraction over an external graphics backend.
//!
//! Each concrete program is a [`ShaderKind`]; the generic [`Shader`] owns the
//! program and its two stages, exposes typed uniform loads, and frees itself
//! on the destroy broadcast.
//!
//! # Invariants
//! - A uniform can only be loaded after its shader declared it.
//! - Per frame, a program's PreRender message is fully dispatched before its
//!   Render message, so uniforms are final before any geometry is drawn.
//! - Backend resources are freed exactly once.

mod backend;
mod block;
mod gui;
mod recording;
mod shader;
mod shaders;
mod source;
mod variables;

pub use backend::{
    GraphicsBackend, ProgramId, ShaderStage, SharedBackend, StageId, UniformLocation,
    UniformValue,
};
pub use block::{BlockPreRender, BlockProgram, BlockRender, BlockShader};
pub use gui::{GuiDepth, GuiProgram, GuiRender, GuiShader};
pub use recording::{GfxCall, GfxFault, RecordingBackend};
pub use shader::{Declarations, RenderError, Shader, ShaderKind};
pub use source::{FileSource, ShaderSource, StaticSource};
pub use variables::{AttributeVariable, UniformVariable};
