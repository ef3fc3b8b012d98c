mod parser;
mod theme;

pub use parser::*;
pub use theme::*;

/// A struct to represent any RGB color.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r:   0, g:   0, b:   0, a: 0.0, };
    pub const WHITE: Color       = Color { r: 255, g: 255, b: 255, a: 1.0, };
    pub const BLACK: Color       = Color { r:   0, g:   0, b:   0, a: 1.0, };
    pub const RED:   Color       = Color { r: 255, g:   0, b:   0, a: 1.0, };
    pub const GREEN: Color       = Color { r:   0, g: 255, b:   0, a: 1.0, };
    pub const BLUE:  Color       = Color { r:   0, g:   0, b: 255, a: 1.0, };

    pub fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Looks up one of the few named colors a theme may use.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "transparent" => Some(Self::TRANSPARENT),
            "white" => Some(Self::WHITE),
            "black" => Some(Self::BLACK),
            "red" => Some(Self::RED),
            "green" => Some(Self::GREEN),
            "blue" => Some(Self::BLUE),
            _ => None,
        }
    }

    /// Linear blend between `self` (t = 0) and `other` (t = 1).
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if (self.a - 1.0).abs() < f32::EPSILON {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

/// A color as the renderer consumes it, every channel in `[0, 1]`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DrawableColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl DrawableColor {
    pub const WHITE: DrawableColor = DrawableColor { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: DrawableColor = DrawableColor { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
}

impl From<Color> for DrawableColor {
    fn from(value: Color) -> Self {
        Self {
            r: value.r as f32 / 255.0,
            g: value.g as f32 / 255.0,
            b: value.b as f32 / 255.0,
            a: value.a,
        }
    }
}
