/// Uniform inputs a shader program may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UniformVariable {
    LightingGlobal,
    LightingEmissive,
    LightingBase,
    FogColor,
    LightOrigin,
    MaxDistance,
    Projection,
    View,
}

impl UniformVariable {
    pub const ALL: [UniformVariable; 8] = [
        UniformVariable::LightingGlobal,
        UniformVariable::LightingEmissive,
        UniformVariable::LightingBase,
        UniformVariable::FogColor,
        UniformVariable::LightOrigin,
        UniformVariable::MaxDistance,
        UniformVariable::Projection,
        UniformVariable::View,
    ];

    /// Identifier used in shader source.
    pub fn name(self) -> &'static str {
        match self {
            UniformVariable::LightingGlobal => "lightingGlobal",
            UniformVariable::LightingEmissive => "lightingEmissive",
            UniformVariable::LightingBase => "lightingBase",
            UniformVariable::FogColor => "fogColor",
            UniformVariable::LightOrigin => "lightOrigin",
            UniformVariable::MaxDistance => "maxDistance",
            UniformVariable::Projection => "projectionMatrix",
            UniformVariable::View => "viewMatrix",
        }
    }
}

/// Per-vertex inputs. The bound attribute location is the ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeVariable {
    Position,
    Normal,
    Color,
    TexCoord,
}

impl AttributeVariable {
    pub const ALL: [AttributeVariable; 4] = [
        AttributeVariable::Position,
        AttributeVariable::Normal,
        AttributeVariable::Color,
        AttributeVariable::TexCoord,
    ];

    pub fn location(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeVariable::Position => "position",
            AttributeVariable::Normal => "normal",
            AttributeVariable::Color => "color",
            AttributeVariable::TexCoord => "texCoord",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uniform_names_are_unique() {
        let names: HashSet<_> = UniformVariable::ALL.iter().map(|u| u.name()).collect();
        assert_eq!(names.len(), UniformVariable::ALL.len());
    }

    #[test]
    fn attribute_locations_follow_ordinal() {
        for (i, attr) in AttributeVariable::ALL.iter().enumerate() {
            assert_eq!(attr.location(), i as u32);
        }
    }
}
