use voxel_kernel::Message;

use crate::shader::{Declarations, Shader, ShaderKind};
use crate::variables::{AttributeVariable, UniformVariable};

/// The 2D overlay program, drawn after the world with depth testing off.
#[derive(Debug)]
pub struct GuiShader;

/// UI layering. Overlay primitives are drawn one layer at a time, back to
/// front, so later layers composite over earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GuiDepth {
    Background,
    Panel,
    Text,
    Cursor,
}

impl GuiDepth {
    /// Back-to-front draw order.
    pub const ALL: [GuiDepth; 4] = [
        GuiDepth::Background,
        GuiDepth::Panel,
        GuiDepth::Text,
        GuiDepth::Cursor,
    ];
}

/// Published once per [`GuiDepth`] layer; subscribers draw primitives that
/// belong to `depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuiRender {
    pub depth: GuiDepth,
}

impl Message for GuiRender {}

pub type GuiProgram = Shader<GuiShader>;

impl ShaderKind for GuiShader {
    const LABEL: &'static str = "gui";
    const VERTEX_PATH: &'static str = "gui.vert";
    const FRAGMENT_PATH: &'static str = "gui.frag";

    fn setup_attribute_variables(decl: &mut Declarations<'_>) {
        decl.attribute(AttributeVariable::Position)
            .attribute(AttributeVariable::Color)
            .attribute(AttributeVariable::TexCoord);
    }

    fn setup_uniform_variables(decl: &mut Declarations<'_>) {
        decl.uniform(UniformVariable::Projection);
    }
}
