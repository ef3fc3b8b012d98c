use crate::*;
use std::rc::Rc;

/// A one dimensional color ramp sampled over `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTexture {
    pub samples: Vec<DrawableColor>,
    pub min: f32,
    pub max: f32,
}

impl LookupTexture {
    pub const SIZE: usize = 256;

    /// Samples `f` at `SIZE` evenly spaced points of `[min, max]`.
    pub fn sample(min: f32, max: f32, f: impl Fn(f32) -> Option<Color>) -> Self {
        let samples = (0..Self::SIZE)
            .map(|i| {
                let t = i as f32 / (Self::SIZE - 1) as f32;
                f(min + (max - min) * t)
                    .map(DrawableColor::from)
                    .unwrap_or(DrawableColor::WHITE)
            })
            .collect();
        Self { samples, min, max }
    }

    pub fn lookup(&self, value: f32) -> DrawableColor {
        let range = self.max - self.min;
        let t = if range > 0.0 {
            ((value - self.min) / range).max(0.0).min(1.0)
        } else {
            0.0
        };
        let i = (t * (self.samples.len().saturating_sub(1)) as f32).round() as usize;
        self.samples.get(i).copied().unwrap_or(DrawableColor::WHITE)
    }
}

/// Per tile elevation data, attached to terrain objects for consumers that displace them.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementTexture {
    pub width: u32,
    pub height: u32,
    pub data: Rc<Vec<f32>>,
}

impl From<&DisplacementMap> for DisplacementTexture {
    fn from(map: &DisplacementMap) -> Self {
        Self {
            width: map.x_size,
            height: map.y_size,
            data: map.heights.clone(),
        }
    }
}
