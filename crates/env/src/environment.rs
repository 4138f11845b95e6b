use glam::Vec3;
use voxel_common::Color;
use voxel_ecs::{Entity, EntityBehavior, GlobalSubscriber, Shared, attach, spawn, subscribe};
use voxel_kernel::{MessageBus, UpdateMessage};
use voxel_render::{BlockPreRender, BlockProgram, UniformVariable};

use crate::day::{DayCycle, LightSource};

const BASE_LIGHTING: u32 = 0x202020;
const FOG_COLOR: u32 = 0x101010;
const MAX_DISTANCE: f32 = 50.0;

/// Lighting state of the scene, advanced by [`UpdateMessage`] and pushed into
/// the block shader on [`BlockPreRender`].
#[derive(Debug)]
pub struct Environment {
    entity: Entity,
    shader: Shared<BlockProgram>,
    cycle: DayCycle,
    phase: usize,
    elapsed_ms: u64,
    lights: [Color; LightSource::COUNT],
    base_lighting: Color,
    fog: Color,
    light_origin: Vec3,
    max_distance: f32,
}

impl Environment {
    pub fn new(bus: &MessageBus, shader: &Shared<BlockProgram>) -> Shared<Self> {
        Self::with_cycle(bus, shader, DayCycle::default())
    }

    pub fn with_cycle(
        bus: &MessageBus,
        shader: &Shared<BlockProgram>,
        cycle: DayCycle,
    ) -> Shared<Self> {
        tracing::info!(phases = cycle.len(), cycle_ms = cycle.total_ms(), "environment created");
        spawn(Self {
            entity: Entity::new("environment", bus),
            shader: shader.clone(),
            cycle,
            phase: 0,
            elapsed_ms: 0,
            lights: [Color::WHITE; LightSource::COUNT],
            base_lighting: Color::from_packed(BASE_LIGHTING),
            fog: Color::from_packed(FOG_COLOR),
            light_origin: Vec3::ONE,
            max_distance: MAX_DISTANCE,
        })
    }

    pub fn cycle(&self) -> &DayCycle {
        &self.cycle
    }

    /// Index of the current phase within the cycle.
    pub fn phase_index(&self) -> usize {
        self.phase
    }

    pub fn phase_name(&self) -> &str {
        &self.cycle.phase(self.phase).name
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn light(&self, source: LightSource) -> Color {
        self.lights[source.index()]
    }

    pub fn fog(&self) -> Color {
        self.fog
    }

    pub fn base_lighting(&self) -> Color {
        self.base_lighting
    }

    pub fn light_origin(&self) -> Vec3 {
        self.light_origin
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn set_light(&mut self, source: LightSource, color: Color) {
        self.lights[source.index()] = color;
    }

    pub fn set_light_origin(&mut self, origin: Vec3) {
        self.light_origin = origin;
    }

    pub fn set_max_distance(&mut self, distance: f32) {
        self.max_distance = distance;
    }

    /// Advance the cycle by `delta_ms` and recompute the global light.
    pub fn advance(&mut self, delta_ms: u64) {
        self.elapsed_ms += delta_ms;
        let total = self.cycle.total_ms();
        if self.elapsed_ms >= total {
            // whole cycles land back on the same phase
            self.elapsed_ms %= total;
        }
        let before = self.phase;
        loop {
            let duration = self.cycle.phase(self.phase).duration_ms;
            if self.elapsed_ms < duration {
                break;
            }
            self.elapsed_ms -= duration;
            self.phase = (self.phase + 1) % self.cycle.len();
        }
        if self.phase != before {
            tracing::debug!(phase = self.phase_name(), "day phase changed");
        }

        let light = self.cycle.phase(self.phase).light_at(self.elapsed_ms);
        self.lights[LightSource::Global.index()] = light;
        self.fog = light;
    }

    fn pre_render(&self) {
        let shader = self.shader.borrow();
        for source in LightSource::ALL {
            shader.load_int(source.uniform(), self.light(source).to_packed() as i32);
        }
        shader.load_int(UniformVariable::LightingBase, self.base_lighting.to_packed() as i32);
        shader.load_int(UniformVariable::FogColor, self.fog.to_packed() as i32);
        shader.load_vec3f(UniformVariable::LightOrigin, self.light_origin);
        shader.load_float(UniformVariable::MaxDistance, self.max_distance);
    }
}

impl EntityBehavior for Environment {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn register_components(this: &Shared<Self>) {
        attach(this, GlobalSubscriber::new());
        subscribe(this, |env: &mut Self, msg: &UpdateMessage| env.advance(msg.delta_ms));
        subscribe(this, |env: &mut Self, _: &BlockPreRender| env.pre_render());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day::DayState;
    use std::cell::RefCell;
    use std::rc::Rc;
    use voxel_kernel::DestroyMessage;
    use voxel_render::{RecordingBackend, SharedBackend, StaticSource, UniformValue};

    type Fixture = (
        MessageBus,
        Rc<RefCell<RecordingBackend>>,
        Shared<BlockProgram>,
        Shared<Environment>,
    );

    fn setup(cycle: DayCycle) -> Fixture {
        let bus = MessageBus::new();
        let gl = Rc::new(RefCell::new(RecordingBackend::new()));
        let shared: SharedBackend = gl.clone();
        let shader = BlockProgram::create(&bus, &shared, &StaticSource::builtin()).unwrap();
        let env = Environment::with_cycle(&bus, &shader, cycle);
        (bus, gl, shader, env)
    }

    fn three_phase() -> DayCycle {
        DayCycle::new(vec![
            DayState::new("a", 1000, 0x000000, 0xFFFFFF),
            DayState::new("b", 2000, 0xFFFFFF, 0x808080),
            DayState::new("c", 1500, 0x808080, 0x000000),
        ])
        .unwrap()
    }

    #[test]
    fn defaults() {
        let (_bus, _gl, _shader, env) = setup(DayCycle::default());
        let env = env.borrow();
        assert_eq!(env.light(LightSource::Global), Color::WHITE);
        assert_eq!(env.light(LightSource::Emissive), Color::WHITE);
        assert_eq!(env.base_lighting().to_packed(), 0x202020);
        assert_eq!(env.fog().to_packed(), 0x101010);
        assert_eq!(env.light_origin(), Vec3::ONE);
        assert_eq!(env.max_distance(), 50.0);
        assert_eq!(env.phase_name(), "dawn");
    }

    #[test]
    fn phases_roll_over_on_updates() {
        let (bus, _gl, _shader, env) = setup(three_phase());
        bus.publish(&UpdateMessage { total_ms: 600, delta_ms: 600 });
        assert_eq!(env.borrow().phase_index(), 0);
        bus.publish(&UpdateMessage { total_ms: 1100, delta_ms: 500 });
        assert_eq!(env.borrow().phase_index(), 1);
        assert_eq!(env.borrow().elapsed_ms(), 100);
        bus.publish(&UpdateMessage { total_ms: 3700, delta_ms: 2600 });
        assert_eq!(env.borrow().phase_index(), 2);
        assert_eq!(env.borrow().elapsed_ms(), 700);
    }

    #[test]
    fn exact_boundary_advances() {
        let (_bus, _gl, _shader, env) = setup(three_phase());
        let mut env = env.borrow_mut();
        env.advance(1000);
        assert_eq!(env.phase_index(), 1);
        assert_eq!(env.elapsed_ms(), 0);
        assert_eq!(env.light(LightSource::Global), Color::WHITE);
    }

    #[test]
    fn huge_delta_wraps_cycle() {
        let (_bus, _gl, _shader, env) = setup(three_phase());
        let mut env = env.borrow_mut();
        // three full cycles plus 1200ms
        env.advance(3 * 4500 + 1200);
        assert_eq!(env.phase_index(), 1);
        assert_eq!(env.elapsed_ms(), 200);
        assert!(env.elapsed_ms() < env.cycle().phase(env.phase_index()).duration_ms);
    }

    #[test]
    fn zero_length_phase_is_skipped() {
        let cycle = DayCycle::new(vec![
            DayState::new("a", 100, 0, 0),
            DayState::new("blink", 0, 0xFF0000, 0xFF0000),
            DayState::new("c", 100, 0x00FF00, 0x00FF00),
        ])
        .unwrap();
        let (_bus, _gl, _shader, env) = setup(cycle);
        let mut env = env.borrow_mut();
        env.advance(150);
        assert_eq!(env.phase_index(), 2);
        assert_eq!(env.elapsed_ms(), 50);
        assert_eq!(env.light(LightSource::Global), Color::new(0, 0xFF, 0));
    }

    #[test]
    fn fog_follows_global_light() {
        let (_bus, _gl, _shader, env) = setup(three_phase());
        let mut env = env.borrow_mut();
        env.advance(0);
        assert_eq!(env.light(LightSource::Global), Color::BLACK);
        env.advance(500);
        assert_eq!(env.light(LightSource::Global), Color::new(128, 128, 128));
        assert_eq!(env.fog(), env.light(LightSource::Global));
        assert_eq!(env.light(LightSource::Emissive), Color::WHITE);
    }

    #[test]
    fn pre_render_loads_uniforms() {
        let (bus, gl, shader, env) = setup(three_phase());
        env.borrow_mut().advance(500);
        shader.borrow().use_program();
        bus.publish(&BlockPreRender);

        let program = shader.borrow().program();
        let gl = gl.borrow();
        let grey = Color::new(128, 128, 128).to_packed() as i32;
        assert_eq!(gl.uniform_value(program, "lightingGlobal"), Some(UniformValue::Int(grey)));
        assert_eq!(
            gl.uniform_value(program, "lightingEmissive"),
            Some(UniformValue::Int(0xFFFFFF))
        );
        assert_eq!(gl.uniform_value(program, "lightingBase"), Some(UniformValue::Int(0x202020)));
        assert_eq!(gl.uniform_value(program, "fogColor"), Some(UniformValue::Int(grey)));
        assert_eq!(gl.uniform_value(program, "lightOrigin"), Some(UniformValue::Vec3f(Vec3::ONE)));
        assert_eq!(gl.uniform_value(program, "maxDistance"), Some(UniformValue::Float(50.0)));
        assert!(gl.faults().is_empty());
    }

    #[test]
    fn destroyed_by_broadcast() {
        let (bus, gl, shader, env) = setup(three_phase());
        bus.publish(&DestroyMessage);
        assert!(env.borrow().entity().is_destroyed());
        assert!(shader.borrow().is_destroyed());
        assert_eq!(bus.total_subscriptions(), 0);
        assert_eq!(gl.borrow().live_programs(), 0);

        // late updates reach nobody
        assert_eq!(bus.publish(&UpdateMessage { total_ms: 10, delta_ms: 10 }), 0);
        assert_eq!(env.borrow().elapsed_ms(), 0);
    }
}
