//! Input sampling for the frame loop.
//!
//! The device itself is an external collaborator behind [`InputDevice`]; the
//! loop talks to an [`InputCapturer`], which samples the device once per frame.
//!
//! # Invariants
//! - `is_key_pressed` is true on exactly one frame per press.
//! - Only the highest-priority active listener may consume input.

mod capturer;
mod key;
mod listener;

pub use capturer::{InputCapturer, InputDevice, ScriptedInput};
pub use key::Key;
pub use listener::{InputFocus, InputListenerComponent, InputPriority, ListenerId};
