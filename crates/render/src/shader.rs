use glam::{IVec3, Mat4, Vec3};
use std::collections::HashMap;
use std::marker::PhantomData;
use voxel_ecs::{Entity, EntityBehavior, GlobalSubscriber, Shared, attach, spawn};
use voxel_kernel::{MessageBus, Priority};

use crate::backend::{
    GraphicsBackend, ProgramId, ShaderStage, SharedBackend, StageId, UniformLocation,
    UniformValue,
};
use crate::source::ShaderSource;
use crate::variables::{AttributeVariable, UniformVariable};

/// Errors from building or driving a shader program.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("shader source '{path}' could not be read: {source}")]
    SourceRead {
        path: String,
        source: std::io::Error,
    },
    #[error("shader: '{path}' couldn't be compiled: {log}")]
    Compile { path: String, log: String },
    #[error("shader program '{shader}' failed to link: {log}")]
    Link { shader: &'static str, log: String },
    #[error("shader program '{shader}' failed validation: {log}")]
    Validate { shader: &'static str, log: String },
    #[error("uniform '{uniform}' was never declared on shader '{shader}'")]
    UndeclaredUniform {
        shader: &'static str,
        uniform: &'static str,
    },
    #[error("shader '{shader}' used after it was destroyed")]
    Destroyed { shader: &'static str },
}

/// Compile-time description of one concrete shader program.
pub trait ShaderKind: 'static {
    const LABEL: &'static str;
    const VERTEX_PATH: &'static str;
    const FRAGMENT_PATH: &'static str;
    /// Teardown order on the destroy broadcast; after the entities feeding it.
    const DESTROY_PRIORITY: Priority = Priority::LATE;

    /// Runs after the stages are attached, before linking.
    fn setup_attribute_variables(decl: &mut Declarations<'_>);

    /// Runs after linking and validation.
    fn setup_uniform_variables(decl: &mut Declarations<'_>);
}

/// Handed to the setup hooks to declare the variables a shader uses.
pub struct Declarations<'a> {
    backend: &'a mut dyn GraphicsBackend,
    program: ProgramId,
    uniforms: &'a mut HashMap<UniformVariable, UniformLocation>,
    attributes: &'a mut Vec<AttributeVariable>,
}

impl Declarations<'_> {
    /// Declare a uniform. Declaring it again replaces the earlier slot.
    pub fn uniform(&mut self, uniform: UniformVariable) -> &mut Self {
        let location = self.backend.uniform_location(self.program, uniform.name());
        if !location.is_active() {
            tracing::warn!(uniform = uniform.name(), "uniform is not active in program");
        }
        self.uniforms.insert(uniform, location);
        self
    }

    /// Bind an attribute to its fixed location.
    pub fn attribute(&mut self, attribute: AttributeVariable) -> &mut Self {
        self.backend
            .bind_attribute_location(self.program, attribute.location(), attribute.name());
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }
}

/// A linked graphics program plus its two stages.
///
/// Destroyed once, explicitly or by the destroy broadcast; destruction
/// detaches and frees all three backend resources.
pub struct Shader<K: ShaderKind> {
    entity: Entity,
    backend: SharedBackend,
    program: ProgramId,
    vertex: StageId,
    fragment: StageId,
    uniforms: HashMap<UniformVariable, UniformLocation>,
    attributes: Vec<AttributeVariable>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ShaderKind> std::fmt::Debug for Shader<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("label", &K::LABEL)
            .field("program", &self.program)
            .field("uniforms", &self.uniforms.len())
            .field("attributes", &self.attributes)
            .field("destroyed", &self.entity.is_destroyed())
            .finish()
    }
}

fn read_stage(source: &dyn ShaderSource, path: &str) -> Result<String, RenderError> {
    source.read(path).map_err(|e| RenderError::SourceRead {
        path: path.to_string(),
        source: e,
    })
}

fn compile(gl: &mut dyn GraphicsBackend, stage: StageId, path: &str) -> Result<(), RenderError> {
    gl.compile_stage(stage).map_err(|log| {
        tracing::error!(path, %log, "shader stage failed to compile");
        RenderError::Compile {
            path: path.to_string(),
            log,
        }
    })
}

impl<K: ShaderKind> Shader<K> {
    /// Read, compile, link and validate the program, then declare its
    /// variables and register it for the destroy broadcast.
    ///
    /// Any failure frees whatever was created and is fatal for the caller.
    pub fn create(
        bus: &MessageBus,
        backend: &SharedBackend,
        source: &dyn ShaderSource,
    ) -> Result<Shared<Self>, RenderError> {
        let vertex_src = read_stage(source, K::VERTEX_PATH)?;
        let fragment_src = read_stage(source, K::FRAGMENT_PATH)?;

        let mut uniforms = HashMap::new();
        let mut attributes = Vec::new();
        let (program, vertex, fragment) = {
            let mut gl = backend.borrow_mut();
            let program = gl.create_program();
            let vertex = gl.create_stage(ShaderStage::Vertex);
            let fragment = gl.create_stage(ShaderStage::Fragment);
            gl.stage_source(vertex, &vertex_src);
            gl.stage_source(fragment, &fragment_src);

            let built = Self::build(
                &mut *gl,
                program,
                (vertex, fragment),
                &mut uniforms,
                &mut attributes,
            );
            if let Err(err) = built {
                gl.delete_stage(vertex);
                gl.delete_stage(fragment);
                gl.delete_program(program);
                return Err(err);
            }
            (program, vertex, fragment)
        };

        tracing::info!(
            shader = K::LABEL,
            program = program.0,
            uniforms = uniforms.len(),
            attributes = attributes.len(),
            "shader program ready"
        );

        Ok(spawn(Self {
            entity: Entity::new(K::LABEL, bus),
            backend: backend.clone(),
            program,
            vertex,
            fragment,
            uniforms,
            attributes,
            _kind: PhantomData,
        }))
    }

    fn build(
        gl: &mut dyn GraphicsBackend,
        program: ProgramId,
        (vertex, fragment): (StageId, StageId),
        uniforms: &mut HashMap<UniformVariable, UniformLocation>,
        attributes: &mut Vec<AttributeVariable>,
    ) -> Result<(), RenderError> {
        compile(gl, vertex, K::VERTEX_PATH)?;
        compile(gl, fragment, K::FRAGMENT_PATH)?;
        gl.attach_stage(program, vertex);
        gl.attach_stage(program, fragment);

        K::setup_attribute_variables(&mut Declarations {
            backend: &mut *gl,
            program,
            uniforms: &mut *uniforms,
            attributes: &mut *attributes,
        });

        gl.link_program(program).map_err(|log| RenderError::Link {
            shader: K::LABEL,
            log,
        })?;
        gl.validate_program(program)
            .map_err(|log| RenderError::Validate {
                shader: K::LABEL,
                log,
            })?;

        K::setup_uniform_variables(&mut Declarations {
            backend: gl,
            program,
            uniforms,
            attributes,
        });
        Ok(())
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn is_destroyed(&self) -> bool {
        self.entity.is_destroyed()
    }

    /// Make this program the target of subsequent uniform loads and draws.
    pub fn use_program(&self) {
        if self.is_destroyed() {
            tracing::warn!(shader = K::LABEL, "use of destroyed shader ignored");
            return;
        }
        self.backend.borrow_mut().use_program(self.program);
    }

    /// Push a value into a declared uniform.
    pub fn try_load(
        &self,
        uniform: UniformVariable,
        value: UniformValue,
    ) -> Result<(), RenderError> {
        if self.is_destroyed() {
            return Err(RenderError::Destroyed { shader: K::LABEL });
        }
        let location = self
            .uniforms
            .get(&uniform)
            .copied()
            .ok_or(RenderError::UndeclaredUniform {
                shader: K::LABEL,
                uniform: uniform.name(),
            })?;
        self.backend.borrow_mut().set_uniform(location, value);
        Ok(())
    }

    /// # Panics
    /// If `uniform` was never declared or the shader is destroyed.
    pub fn load(&self, uniform: UniformVariable, value: UniformValue) {
        if let Err(err) = self.try_load(uniform, value) {
            panic!("{err}");
        }
    }

    pub fn load_float(&self, uniform: UniformVariable, value: f32) {
        self.load(uniform, UniformValue::Float(value));
    }

    pub fn load_int(&self, uniform: UniformVariable, value: i32) {
        self.load(uniform, UniformValue::Int(value));
    }

    pub fn load_vec3f(&self, uniform: UniformVariable, value: Vec3) {
        self.load(uniform, UniformValue::Vec3f(value));
    }

    pub fn load_vec3i(&self, uniform: UniformVariable, value: IVec3) {
        self.load(uniform, UniformValue::Vec3i(value));
    }

    pub fn load_mat4(&self, uniform: UniformVariable, value: Mat4) {
        self.load(uniform, UniformValue::Mat4(value));
    }

    /// Declared uniforms, in table order.
    pub fn used_uniforms(&self) -> Vec<UniformVariable> {
        let mut used: Vec<_> = self.uniforms.keys().copied().collect();
        used.sort();
        used
    }

    pub fn used_attributes(&self) -> &[AttributeVariable] {
        &self.attributes
    }
}

impl<K: ShaderKind> EntityBehavior for Shader<K> {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn register_components(this: &Shared<Self>) {
        attach(this, GlobalSubscriber::with_priority(K::DESTROY_PRIORITY));
    }

    fn on_destroy(&mut self) {
        let mut gl = self.backend.borrow_mut();
        gl.detach_stage(self.program, self.vertex);
        gl.detach_stage(self.program, self.fragment);
        gl.delete_stage(self.vertex);
        gl.delete_stage(self.fragment);
        gl.delete_program(self.program);
        tracing::debug!(shader = K::LABEL, program = self.program.0, "shader program freed");
    }
}

impl<K: ShaderKind> Drop for Shader<K> {
    fn drop(&mut self) {
        if voxel_ecs::destroy_in_place(self) {
            tracing::debug!(shader = K::LABEL, "shader dropped before destroy");
        }
    }
}
