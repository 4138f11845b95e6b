use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an entity on the message bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short())
    }
}

/// A 3-channel colour with 0-255 per channel.
///
/// Shaders receive colours in packed `0xRRGGBB` form; interpolation happens
/// in real-valued RGB space and is rounded back to integer channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a colour from its packed `0xRRGGBB` form. Bits above 24 are ignored.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }

    /// Packed `0xRRGGBB` form, as loaded into integer uniforms.
    pub const fn to_packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Channels as floats in 0..=255.
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32)
    }

    /// Channels scaled into 0..=1, as used for the clear colour.
    pub fn to_unit(self) -> Vec3 {
        self.to_vec3() / 255.0
    }

    /// Round and clamp a real-valued colour back to integer channels.
    pub fn from_vec3(v: Vec3) -> Self {
        let v = v.round().clamp(Vec3::ZERO, Vec3::splat(255.0));
        Self::new(v.x as u8, v.y as u8, v.z as u8)
    }

    /// Linear blend `start * (1 - t) + end * t`, rounded per channel.
    pub fn lerp(start: Self, end: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::from_vec3(start.to_vec3() * (1.0 - t) + end.to_vec3() * t)
    }
}

impl From<u32> for Color {
    fn from(packed: u32) -> Self {
        Self::from_packed(packed)
    }
}
