use glam::{IVec3, Mat4, Vec3, Vec4};
use std::cell::RefCell;
use std::rc::Rc;

/// Graphics program handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Shader stage handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub u32);

/// Uniform slot inside one program. Negative means the program does not use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub i32);

impl UniformLocation {
    pub const INACTIVE: Self = Self(-1);

    pub fn is_active(self) -> bool {
        self.0 >= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// A typed value pushed into a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3f(Vec3),
    Vec3i(IVec3),
    Mat4(Mat4),
}

/// Graphics-API collaborator. Shaped after a GL-style program API; draw-call
/// issuance and buffer upload live with the subscribers of the render
/// messages, not here.
pub trait GraphicsBackend {
    fn create_program(&mut self) -> ProgramId;
    fn create_stage(&mut self, stage: ShaderStage) -> StageId;
    fn stage_source(&mut self, stage: StageId, source: &str);
    /// Returns the info log on failure.
    fn compile_stage(&mut self, stage: StageId) -> Result<(), String>;
    fn attach_stage(&mut self, program: ProgramId, stage: StageId);
    fn detach_stage(&mut self, program: ProgramId, stage: StageId);
    fn bind_attribute_location(&mut self, program: ProgramId, index: u32, name: &str);
    fn link_program(&mut self, program: ProgramId) -> Result<(), String>;
    fn validate_program(&mut self, program: ProgramId) -> Result<(), String>;
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation;
    /// Make `program` the target of subsequent uniform loads and draws.
    fn use_program(&mut self, program: ProgramId);
    /// Write into the currently used program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);
    fn delete_stage(&mut self, stage: StageId);
    fn delete_program(&mut self, program: ProgramId);

    fn set_depth_test(&mut self, enabled: bool);
    fn set_cull_face(&mut self, enabled: bool);
    fn set_clear_color(&mut self, color: Vec4);
    /// Clear colour and depth buffers.
    fn clear(&mut self);
}

/// The backend handle every shader and the frame loop share.
pub type SharedBackend = Rc<RefCell<dyn GraphicsBackend>>;
