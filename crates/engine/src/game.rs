use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};
use voxel_common::{ConfigError, EngineConfig};
use voxel_env::{DayCycle, Environment};
use voxel_input::{InputCapturer, InputDevice, Key, ScriptedInput};
use voxel_kernel::{DestroyMessage, MessageBus, UpdateMessage};
use voxel_render::{
    BlockPreRender, BlockProgram, BlockRender, GuiDepth, GuiProgram, GuiRender, RecordingBackend,
    RenderError, ShaderSource, SharedBackend, StaticSource,
};

use crate::camera::Camera;
use crate::clock::{Clock, SystemClock};
use crate::context::AppContext;
use crate::display::{Display, DisplayError, HeadlessDisplay};
use crate::overlay::DebugOverlay;
use crate::timing::FrameStats;
use crate::world::{NullWorld, WorldStorage};

/// Startup failures. Each one aborts before the loop starts.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Display(#[from] DisplayError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Initializing,
    Running,
    Terminating,
    Terminated,
}

/// External systems the loop drives.
pub struct Collaborators {
    pub display: Box<dyn Display>,
    pub backend: SharedBackend,
    pub input: Box<dyn InputDevice>,
    pub clock: Box<dyn Clock>,
    pub world: Box<dyn WorldStorage>,
    pub shaders: Box<dyn ShaderSource>,
    pub day_cycle: DayCycle,
}

impl Collaborators {
    /// Window-less setup: recording backend, no keys pressed, built-in
    /// shaders, wall clock.
    pub fn headless() -> Self {
        Self {
            display: Box::new(HeadlessDisplay::new()),
            backend: Rc::new(RefCell::new(RecordingBackend::new())),
            input: Box::new(ScriptedInput::new()),
            clock: Box::new(SystemClock::new()),
            world: Box::new(NullWorld::new()),
            shaders: Box::new(StaticSource::builtin()),
            day_cycle: DayCycle::default(),
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    /// Clock time between startup and the last frame.
    pub simulated_ms: u64,
    pub average_frame: Duration,
    pub slowest_frame: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames over {} ms (avg {:.2} ms, max {:.2} ms)",
            self.frames,
            self.simulated_ms,
            self.average_frame.as_secs_f64() * 1000.0,
            self.slowest_frame.as_secs_f64() * 1000.0
        )
    }
}

/// The frame loop.
pub struct Game {
    state: GameState,
    ctx: AppContext,
    display: Box<dyn Display>,
    clock: Box<dyn Clock>,
    world: Box<dyn WorldStorage>,
    start_ms: u64,
    prev_ms: u64,
    frames: u64,
    game_over: bool,
    stats: FrameStats,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("state", &self.state)
            .field("frames", &self.frames)
            .field("prev_ms", &self.prev_ms)
            .field("game_over", &self.game_over)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Grab input, create the display, then build the bus and every
    /// subsystem on it. Subsystems that feed a shader subscribe after it.
    pub fn new(config: EngineConfig, parts: Collaborators) -> Result<Self, EngineError> {
        let _span = tracing::info_span!("game_init").entered();
        config.validate()?;
        let Collaborators {
            mut display,
            backend,
            input,
            clock,
            world,
            shaders,
            day_cycle,
        } = parts;

        let input = Rc::new(RefCell::new(InputCapturer::new(input)));
        input.borrow_mut().set_grabbed(true);
        display.create(config.width, config.height, config.gl_version, &config.title)?;
        let start_ms = clock.now_ms();

        let bus = MessageBus::new();
        let ctx = match Self::build(config, bus.clone(), backend, input, &*shaders, day_cycle) {
            Ok(ctx) => ctx,
            Err(err) => {
                // shaders built before the failure free themselves when `build` drops them
                display.destroy();
                return Err(err);
            }
        };

        tracing::info!(
            fps = ctx.config.target_fps,
            width = ctx.config.width,
            height = ctx.config.height,
            subscriptions = bus.total_subscriptions(),
            "game initialized"
        );

        Ok(Self {
            state: GameState::Running,
            ctx,
            display,
            clock,
            world,
            start_ms,
            prev_ms: start_ms,
            frames: 0,
            game_over: false,
            stats: FrameStats::default(),
        })
    }

    fn build(
        config: EngineConfig,
        bus: MessageBus,
        backend: SharedBackend,
        input: Rc<RefCell<InputCapturer>>,
        shaders: &dyn ShaderSource,
        day_cycle: DayCycle,
    ) -> Result<AppContext, EngineError> {
        let block_shader = BlockProgram::create(&bus, &backend, shaders)?;
        let gui_shader = GuiProgram::create(&bus, &backend, shaders)?;
        let camera = Camera::new(&bus, &block_shader, &input, config.aspect());
        let overlay = DebugOverlay::new(&bus, &input);
        let environment = Environment::with_cycle(&bus, &block_shader, day_cycle);
        Ok(AppContext {
            config,
            bus,
            backend,
            input,
            block_shader,
            gui_shader,
            camera,
            overlay,
            environment,
        })
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one loop iteration. Returns whether the loop should go on.
    pub fn frame(&mut self) -> bool {
        if self.state != GameState::Running {
            return false;
        }
        let started = Instant::now();
        let ctx = &self.ctx;

        let (escape, grave) = {
            let mut input = ctx.input.borrow_mut();
            input.sample();
            (input.is_key_down(Key::Escape), input.is_key_pressed(Key::Grave))
        };
        if escape {
            tracing::info!("exit key down");
            self.game_over = true;
        }
        if grave {
            ctx.overlay.borrow_mut().toggle();
        }

        let now = self.clock.now_ms();
        ctx.bus.publish(&UpdateMessage::new(self.prev_ms, now));

        let fog = ctx.environment.borrow().fog();
        {
            let mut gl = ctx.backend.borrow_mut();
            gl.set_depth_test(true);
            gl.clear();
            gl.set_cull_face(true);
            gl.set_clear_color(fog.to_unit().extend(1.0));
        }

        ctx.block_shader.borrow().use_program();
        ctx.bus.publish(&BlockPreRender);
        ctx.bus.publish(&BlockRender);

        ctx.backend.borrow_mut().set_depth_test(false);
        ctx.gui_shader.borrow().use_program();
        for depth in GuiDepth::ALL {
            ctx.bus.publish(&GuiRender { depth });
        }

        self.world.refresh();
        self.display.sync(ctx.config.target_fps);
        self.display.swap_buffers();
        if self.display.is_close_requested() {
            tracing::info!("close requested");
            self.game_over = true;
        }

        self.prev_ms = now;
        self.frames += 1;
        self.stats.record(started.elapsed());
        tracing::trace!(frame = self.frames, now, "frame complete");
        !self.game_over
    }

    /// Run frames until exit is requested, then shut down.
    pub fn run(&mut self) -> RunSummary {
        let _span = tracing::info_span!("game_loop").entered();
        while self.frame() {}
        self.terminate();
        self.summary()
    }

    /// Broadcast the destroy message and release the display. Idempotent.
    pub fn terminate(&mut self) {
        if matches!(self.state, GameState::Terminating | GameState::Terminated) {
            return;
        }
        self.state = GameState::Terminating;
        let reached = self.ctx.bus.publish(&DestroyMessage);
        tracing::info!(subscribers = reached, "destroy broadcast");
        self.display.destroy();
        self.state = GameState::Terminated;
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            frames: self.frames,
            simulated_ms: self.prev_ms.saturating_sub(self.start_ms),
            average_frame: self.stats.average(),
            slowest_frame: self.stats.slowest(),
        }
    }
}
