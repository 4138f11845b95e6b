//! Built-in GLSL stage sources, used when no shader directory is configured.

/// Block vertex stage: world-space position, normal and per-vertex colour.
pub const BLOCK_VERT: &str = r#"#version 150 core

in vec3 position;
in vec3 normal;
in vec3 color;

uniform mat4 projectionMatrix;
uniform mat4 viewMatrix;
uniform vec3 lightOrigin;

out vec3 passColor;
out float passDiffuse;
out float passDistance;

void main() {
    vec4 eyePosition = viewMatrix * vec4(position, 1.0);
    gl_Position = projectionMatrix * eyePosition;
    passColor = color;
    passDiffuse = max(dot(normalize(normal), normalize(lightOrigin)), 0.0);
    passDistance = length(eyePosition.xyz);
}
"#;

/// Block fragment stage: packed 0xRRGGBB lighting, distance fog.
pub const BLOCK_FRAG: &str = r#"#version 150 core

in vec3 passColor;
in float passDiffuse;
in float passDistance;

uniform int lightingGlobal;
uniform int lightingEmissive;
uniform int lightingBase;
uniform int fogColor;
uniform float maxDistance;

out vec4 outColor;

vec3 unpack(int packed) {
    return vec3((packed >> 16) & 0xFF, (packed >> 8) & 0xFF, packed & 0xFF) / 255.0;
}

void main() {
    vec3 light = unpack(lightingBase)
        + unpack(lightingGlobal) * passDiffuse
        + unpack(lightingEmissive) * 0.25;
    vec3 lit = passColor * min(light, vec3(1.0));
    float fog = clamp(passDistance / maxDistance, 0.0, 1.0);
    outColor = vec4(mix(lit, unpack(fogColor), fog * fog), 1.0);
}
"#;

/// Overlay vertex stage: screen-space quads.
pub const GUI_VERT: &str = r#"#version 150 core

in vec3 position;
in vec3 color;
in vec2 texCoord;

uniform mat4 projectionMatrix;

out vec3 passColor;
out vec2 passTexCoord;

void main() {
    gl_Position = projectionMatrix * vec4(position, 1.0);
    passColor = color;
    passTexCoord = texCoord;
}
"#;

/// Overlay fragment stage.
pub const GUI_FRAG: &str = r#"#version 150 core

in vec3 passColor;
in vec2 passTexCoord;

out vec4 outColor;

void main() {
    outColor = vec4(passColor, 1.0);
}
"#;
