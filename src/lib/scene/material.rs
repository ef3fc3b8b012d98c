use crate::*;
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaterialKind {
    /// Unlit, flat colored.
    Basic,
    /// Lit by the scene lights.
    Standard,
    /// Edges of extruded polygons.
    Edge,
    SolidLine,
    DashedLine,
    /// Writes depth only, so transparent extrusions don't show their back faces.
    DepthPrePass,
    /// Hairlines, e.g. polygon outlines.
    Segments,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StencilFunc {
    Always,
    NotEqual,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StencilState {
    pub func: StencilFunc,
    pub reference: u8,
    /// Whether passing fragments replace the stencil value with `reference`.
    pub replace: bool,
}

/// Source level changes to the material's shader.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderPatch {
    /// Colors fragments by looking up the displaced height in a color ramp.
    HeightColor { lookup: Rc<LookupTexture> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: DrawableColor,
    pub opacity: f32,
    pub transparent: bool,
    pub visible: bool,
    /// Half width for lines, full width for edges and outlines.
    pub line_width: f32,
    pub outline_width: f32,
    pub outline_color: DrawableColor,
    pub dash_size: f32,
    pub gap_size: f32,
    /// Camera distance at which fading starts. Negative disables fading.
    pub fade_near: f32,
    /// Camera distance at which the geometry is fully faded out. Negative disables fading.
    pub fade_far: f32,
    pub emissive: DrawableColor,
    /// Height ratio of animated extrusions. Only set while an animated object is drawn.
    pub extrusion_ratio: Option<f32>,
    /// Tile size lines are clipped against. Only set while a clipped object is drawn.
    pub clip_tile_size: Option<[f32; 2]>,
    pub depth_write: bool,
    pub color_write: bool,
    pub stencil: Option<StencilState>,
    pub shader_patch: Option<ShaderPatch>,
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            color: DrawableColor::WHITE,
            opacity: 1.0,
            transparent: false,
            visible: true,
            line_width: 1.0,
            outline_width: 0.0,
            outline_color: DrawableColor::BLACK,
            dash_size: 0.0,
            gap_size: 0.0,
            fade_near: -1.0,
            fade_far: -1.0,
            emissive: DrawableColor::BLACK,
            extrusion_ratio: None,
            clip_tile_size: None,
            depth_write: true,
            color_write: true,
            stencil: None,
            shader_patch: None,
        }
    }

    /// The material a technique is drawn with, or `None` for kinds that aren't drawn as meshes
    /// or lines.
    ///
    /// Color, opacity and emissive color are evaluated once against `env`.
    pub fn from_technique(technique: &Technique, env: &dyn Env) -> Option<Self> {
        let kind = match technique.kind {
            TechniqueKind::Fill => MaterialKind::Basic,
            TechniqueKind::ExtrudedPolygon => match technique.lighting {
                Lighting::Basic => MaterialKind::Basic,
                Lighting::Standard => MaterialKind::Standard,
            },
            TechniqueKind::SolidLine => MaterialKind::SolidLine,
            TechniqueKind::DashedLine => MaterialKind::DashedLine,
            TechniqueKind::Terrain | TechniqueKind::Standard => MaterialKind::Standard,
            TechniqueKind::Segments => MaterialKind::Segments,
            TechniqueKind::Other(_) => return None,
        };

        let mut material = Material::new(kind);
        let color = technique
            .color
            .as_ref()
            .and_then(|attr| attr.evaluate(env, None))
            .and_then(|value| value.as_color());
        let opacity = technique
            .opacity
            .as_ref()
            .and_then(|attr| attr.evaluate(env, None))
            .and_then(|value| value.as_number());
        material.set_color(color, opacity);

        if kind == MaterialKind::Standard {
            if let Some(emissive) = technique
                .emissive
                .as_ref()
                .and_then(|attr| attr.evaluate(env, None))
                .and_then(|value| value.as_color())
            {
                material.emissive = emissive.into();
            }
        }

        Some(material)
    }

    /// Applies a color and opacity. A missing opacity falls back to the color's alpha.
    pub fn set_color(&mut self, color: Option<Color>, opacity: Option<f32>) {
        if let Some(color) = color {
            self.color = color.into();
        }
        match (opacity, color) {
            (Some(opacity), _) => self.set_opacity(opacity),
            (None, Some(color)) => self.set_opacity(color.a),
            (None, None) => {}
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.max(0.0).min(1.0);
        self.transparent = self.opacity < 1.0;
    }

    pub fn is_fading(&self) -> bool {
        self.fade_near >= 0.0 && self.fade_far > self.fade_near
    }
}
