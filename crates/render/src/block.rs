use voxel_kernel::Message;

use crate::shader::{Declarations, Shader, ShaderKind};
use crate::variables::{AttributeVariable, UniformVariable};

/// The 3D world program: lit, fogged block geometry.
#[derive(Debug)]
pub struct BlockShader;

/// Published right after the block program is activated. Subscribers push
/// per-frame uniforms (lighting, camera matrices).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockPreRender;

impl Message for BlockPreRender {}

/// Published after [`BlockPreRender`]; subscribers issue block draw calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockRender;

impl Message for BlockRender {}

pub type BlockProgram = Shader<BlockShader>;

impl ShaderKind for BlockShader {
    const LABEL: &'static str = "block";
    const VERTEX_PATH: &'static str = "block.vert";
    const FRAGMENT_PATH: &'static str = "block.frag";

    fn setup_attribute_variables(decl: &mut Declarations<'_>) {
        decl.attribute(AttributeVariable::Position)
            .attribute(AttributeVariable::Normal)
            .attribute(AttributeVariable::Color);
    }

    fn setup_uniform_variables(decl: &mut Declarations<'_>) {
        for uniform in [
            UniformVariable::LightingGlobal,
            UniformVariable::LightingEmissive,
            UniformVariable::LightingBase,
            UniformVariable::FogColor,
            UniformVariable::LightOrigin,
            UniformVariable::MaxDistance,
            UniformVariable::Projection,
            UniformVariable::View,
        ] {
            decl.uniform(uniform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SharedBackend;
    use crate::recording::{GfxCall, RecordingBackend};
    use crate::source::StaticSource;
    use std::cell::RefCell;
    use std::rc::Rc;
    use voxel_kernel::MessageBus;

    #[test]
    fn builtin_block_program_declares_lighting() {
        let gl = Rc::new(RefCell::new(RecordingBackend::new()));
        let shared: SharedBackend = gl.clone();
        let shader =
            BlockProgram::create(&MessageBus::new(), &shared, &StaticSource::builtin()).unwrap();

        assert_eq!(shader.borrow().used_uniforms(), UniformVariable::ALL.to_vec());
        let binds: Vec<_> = gl
            .borrow()
            .calls()
            .iter()
            .filter_map(|c| match c {
                GfxCall::BindAttribute { index, name, .. } => Some((*index, name.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            binds,
            vec![
                (0, "position".to_string()),
                (1, "normal".to_string()),
                (2, "color".to_string()),
            ]
        );
    }
}
