//! Colours and per-node material parameters.

use serde::{Deserialize, Serialize};

/// Linear RGB colour with components in `[0, 1]`.
///
/// Serialises as a `0xRRGGBB` integer, which is how layout data and
/// designers write colours.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_hex(self) -> u32 {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// Component-wise linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub fn scaled(self, factor: f32) -> Color {
        Color::rgb(self.r * factor, self.g * factor, self.b * factor)
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Color::from_hex(hex)
    }
}

impl From<Color> for u32 {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// What the renderer needs to know about a node's surface besides its geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub tint: Color,
    pub opacity: f32,
    /// Unlit surfaces (highlight overlays, raindrops) ignore scene lighting.
    pub unlit: bool,
}

impl Material {
    pub fn solid(tint: Color) -> Self {
        Self {
            tint,
            opacity: 1.0,
            unlit: false,
        }
    }

    pub fn overlay(tint: Color, opacity: f32) -> Self {
        Self {
            tint,
            opacity,
            unlit: true,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::solid(Color::WHITE)
    }
}
