use glam::{Mat4, Vec3};
use std::cell::RefCell;
use std::rc::Rc;
use voxel_ecs::{Entity, EntityBehavior, GlobalSubscriber, Shared, attach, spawn, subscribe};
use voxel_input::{InputCapturer, InputListenerComponent, InputPriority, Key};
use voxel_kernel::{MessageBus, UpdateMessage};
use voxel_render::{BlockPreRender, BlockProgram, UniformVariable};

/// Free-flying perspective camera.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Units per second.
    pub speed: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 15.0),
            yaw: -90.0_f32.to_radians(),
            pitch: -30.0_f32.to_radians(),
            fov: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            speed: 10.0,
        }
    }
}

impl FlyCamera {
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Move by `local` (x right, y up, z forward) at full speed for `dt` seconds.
    pub fn fly(&mut self, local: Vec3, dt: f32) {
        if local == Vec3::ZERO {
            return;
        }
        let world = self.right() * local.x + Vec3::Y * local.y + self.forward() * local.z;
        self.position += world.normalize() * self.speed * dt;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect, self.near, self.far)
    }
}

/// Camera entity: flies on world-focused input and loads its matrices into
/// the block shader before each world pass.
#[derive(Debug)]
pub struct Camera {
    entity: Entity,
    fly: FlyCamera,
    shader: Shared<BlockProgram>,
    input: Rc<RefCell<InputCapturer>>,
    listener: InputListenerComponent,
}

impl Camera {
    pub fn new(
        bus: &MessageBus,
        shader: &Shared<BlockProgram>,
        input: &Rc<RefCell<InputCapturer>>,
        aspect: f32,
    ) -> Shared<Self> {
        let listener = InputListenerComponent::new(input.borrow().focus(), InputPriority::World);
        let camera = spawn(Self {
            entity: Entity::new("camera", bus),
            fly: FlyCamera {
                aspect,
                ..FlyCamera::default()
            },
            shader: shader.clone(),
            input: input.clone(),
            listener,
        });
        camera.borrow().listener.start_listening();
        camera
    }

    pub fn fly_camera(&self) -> &FlyCamera {
        &self.fly
    }

    pub fn fly_camera_mut(&mut self) -> &mut FlyCamera {
        &mut self.fly
    }

    pub fn has_focus(&self) -> bool {
        self.listener.can_listen()
    }

    fn update(&mut self, msg: &UpdateMessage) {
        if !self.listener.can_listen() {
            return;
        }
        let input = self.input.borrow();
        let axis = |pos: Key, neg: Key| {
            (input.is_key_down(pos) as i32 - input.is_key_down(neg) as i32) as f32
        };
        let local = Vec3::new(
            axis(Key::D, Key::A),
            axis(Key::Space, Key::LShift),
            axis(Key::W, Key::S),
        );
        self.fly.fly(local, msg.delta_ms as f32 / 1000.0);
    }

    fn pre_render(&self) {
        let shader = self.shader.borrow();
        shader.load_mat4(UniformVariable::Projection, self.fly.projection_matrix());
        shader.load_mat4(UniformVariable::View, self.fly.view_matrix());
    }
}

impl EntityBehavior for Camera {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn register_components(this: &Shared<Self>) {
        let listener = this.borrow().listener.clone();
        attach(this, listener);
        attach(this, GlobalSubscriber::new());
        subscribe(this, |cam: &mut Self, msg: &UpdateMessage| cam.update(msg));
        subscribe(this, |cam: &mut Self, _: &BlockPreRender| cam.pre_render());
    }
}
