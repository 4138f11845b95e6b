use std::cell::RefCell;
use std::rc::Rc;
use voxel_common::EngineConfig;
use voxel_ecs::Shared;
use voxel_env::Environment;
use voxel_input::InputCapturer;
use voxel_kernel::MessageBus;
use voxel_render::{BlockProgram, GuiProgram, SharedBackend};

use crate::camera::Camera;
use crate::overlay::DebugOverlay;

/// The single instances the runtime is built from, created once in
/// [`Game::new`](crate::Game::new) and handed to whoever needs them.
///
/// Every field exists once construction succeeded, so nothing can publish
/// before the bus is up.
pub struct AppContext {
    pub config: EngineConfig,
    pub bus: MessageBus,
    pub backend: SharedBackend,
    pub input: Rc<RefCell<InputCapturer>>,
    pub block_shader: Shared<BlockProgram>,
    pub gui_shader: Shared<GuiProgram>,
    pub camera: Shared<Camera>,
    pub overlay: Shared<DebugOverlay>,
    pub environment: Shared<Environment>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("input", &self.input)
            .field("block_shader", &self.block_shader)
            .field("gui_shader", &self.gui_shader)
            .finish_non_exhaustive()
    }
}
