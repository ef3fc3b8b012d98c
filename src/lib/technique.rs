use crate::*;

/// Stable identity of a technique, used to pool handlers across tiles.
///
/// The generation changes with every theme reload so stale handlers can never be matched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct TechniqueKey {
    pub generation: u32,
    pub index: u32,
}

impl TechniqueKey {
    pub fn new(generation: u32, index: u32) -> Self {
        Self { generation, index }
    }
}

impl std::fmt::Display for TechniqueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.generation, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TechniqueKind {
    Fill,
    ExtrudedPolygon,
    SolidLine,
    DashedLine,
    Terrain,
    /// Lit meshes without any dynamic attributes.
    Standard,
    /// Hairline segments.
    Segments,
    Other(String),
}

impl TechniqueKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "fill" => TechniqueKind::Fill,
            "extruded-polygon" => TechniqueKind::ExtrudedPolygon,
            "solid-line" => TechniqueKind::SolidLine,
            "dashed-line" => TechniqueKind::DashedLine,
            "terrain" => TechniqueKind::Terrain,
            "standard" => TechniqueKind::Standard,
            "segments" => TechniqueKind::Segments,
            other => TechniqueKind::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TechniqueKind::Fill => "fill",
            TechniqueKind::ExtrudedPolygon => "extruded-polygon",
            TechniqueKind::SolidLine => "solid-line",
            TechniqueKind::DashedLine => "dashed-line",
            TechniqueKind::Terrain => "terrain",
            TechniqueKind::Standard => "standard",
            TechniqueKind::Segments => "segments",
            TechniqueKind::Other(name) => name,
        }
    }
}

impl std::fmt::Display for TechniqueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The unit widths, dash and gap sizes are given in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MetricUnit {
    World,
    Pixel,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lighting {
    Basic,
    Standard,
}

/// The rendering style of one class of features.
#[derive(Debug, Clone, PartialEq)]
pub struct Technique {
    pub kind: TechniqueKind,
    pub key: TechniqueKey,
    /// Human readable name, e.g. the selector the technique was declared with.
    pub name: String,
    pub metric_unit: MetricUnit,
    pub lighting: Lighting,
    pub color: Option<Attr>,
    pub opacity: Option<Attr>,
    /// Width of lines, or of the outline/edges of polygons.
    pub line_width: Option<Attr>,
    /// Color of the outline/edges of polygons.
    pub line_color: Option<Attr>,
    pub outline_width: Option<Attr>,
    pub outline_color: Option<Attr>,
    pub dash_size: Option<Attr>,
    pub gap_size: Option<Attr>,
    pub fade_near: Option<Attr>,
    pub fade_far: Option<Attr>,
    pub emissive: Option<Attr>,
    pub render_order: Option<Attr>,
    pub animate_extrusion: Option<Attr>,
    pub animate_extrusion_duration: Option<Attr>,
    pub secondary_width: Option<Attr>,
    pub secondary_color: Option<Attr>,
    pub secondary_render_order: Option<Attr>,
    pub clipping: Option<Attr>,
    pub depth_pre_pass: Option<Attr>,
    /// Maps terrain heights to colors, e.g. `interpolate(height, 0: #00ff00, 1000: #ffffff)`.
    pub height_color: Option<Attr>,
}

impl Technique {
    pub fn new(kind: TechniqueKind, key: TechniqueKey) -> Self {
        Self {
            name: kind.name().to_string(),
            kind,
            key,
            metric_unit: MetricUnit::World,
            lighting: Lighting::Basic,
            color: None,
            opacity: None,
            line_width: None,
            line_color: None,
            outline_width: None,
            outline_color: None,
            dash_size: None,
            gap_size: None,
            fade_near: None,
            fade_far: None,
            emissive: None,
            render_order: None,
            animate_extrusion: None,
            animate_extrusion_duration: None,
            secondary_width: None,
            secondary_color: None,
            secondary_render_order: None,
            clipping: None,
            depth_pre_pass: None,
            height_color: None,
        }
    }

    /// Builder variant of `set_property` with no unit information.
    pub fn with(mut self, property: &str, attr: impl Into<Attr>) -> Self {
        if !self.set_property(property, attr.into()) {
            log::warn!("Technique {} has no property '{}'.", self.name, property);
        }
        self
    }

    pub fn with_unit(mut self, unit: MetricUnit) -> Self {
        self.metric_unit = unit;
        self
    }

    pub fn with_lighting(mut self, lighting: Lighting) -> Self {
        self.lighting = lighting;
        self
    }

    /// Assigns an attribute by its theme name.
    ///
    /// Returns `false` if the technique has no such property.
    pub fn set_property(&mut self, property: &str, attr: Attr) -> bool {
        let slot = match property {
            "color" => &mut self.color,
            "opacity" => &mut self.opacity,
            "line-width" => &mut self.line_width,
            "line-color" => &mut self.line_color,
            "outline-width" => &mut self.outline_width,
            "outline-color" => &mut self.outline_color,
            "dash-size" => &mut self.dash_size,
            "gap-size" => &mut self.gap_size,
            "fade-near" => &mut self.fade_near,
            "fade-far" => &mut self.fade_far,
            "emissive" => &mut self.emissive,
            "render-order" => &mut self.render_order,
            "animate-extrusion" => &mut self.animate_extrusion,
            "animate-extrusion-duration" => &mut self.animate_extrusion_duration,
            "secondary-width" => &mut self.secondary_width,
            "secondary-color" => &mut self.secondary_color,
            "secondary-render-order" => &mut self.secondary_render_order,
            "clipping" => &mut self.clipping,
            "enable-depth-pre-pass" => &mut self.depth_pre_pass,
            "height-color" => &mut self.height_color,
            _ => return false,
        };
        *slot = Some(attr);
        true
    }

    /// Creates a technique from a theme rule.
    ///
    /// The selector type names the kind. Unless `metric-unit` says otherwise, a technique whose
    /// widths are given in `px` is pixel-metric.
    pub fn from_rule(rule: &Rule, key: TechniqueKey) -> Self {
        let kind = TechniqueKind::from_name(rule.selector.typ.as_deref().unwrap_or_default());
        let mut technique = Technique::new(kind, key);
        technique.name = rule.selector.to_string();

        let mut explicit_unit = None;
        let mut pixel_widths = false;
        for (property, value) in &rule.kvs {
            match &property[..] {
                "metric-unit" => {
                    explicit_unit = match value.attr.evaluate(&MapEnv::new(), None) {
                        Some(Value::String(unit)) if unit == "px" || unit == "pixel" => {
                            Some(MetricUnit::Pixel)
                        }
                        Some(Value::String(unit)) if unit == "w" || unit == "world" => {
                            Some(MetricUnit::World)
                        }
                        unit => {
                            log::info!("The metric unit '{:?}' is currently not supported.", unit);
                            None
                        }
                    }
                }
                "lighting" => {
                    technique.lighting = match value.attr.evaluate(&MapEnv::new(), None) {
                        Some(Value::String(lighting)) if lighting == "standard" => Lighting::Standard,
                        _ => Lighting::Basic,
                    }
                }
                name => {
                    if value.unit == Some(MetricUnit::Pixel) {
                        pixel_widths = true;
                    }
                    if !technique.set_property(name, value.attr.clone()) {
                        log::info!(
                            "The property '{}' is currently not supported on {}.",
                            name,
                            technique.name
                        );
                    }
                }
            }
        }

        technique.metric_unit = explicit_unit.unwrap_or(if pixel_widths {
            MetricUnit::Pixel
        } else {
            MetricUnit::World
        });
        technique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for name in &["fill", "extruded-polygon", "solid-line", "dashed-line", "terrain"] {
            assert_eq!(TechniqueKind::from_name(name).name(), *name);
        }
        assert_eq!(
            TechniqueKind::from_name("text"),
            TechniqueKind::Other("text".into())
        );
    }

    #[test]
    fn px_widths_make_a_pixel_technique() {
        let rules = try_parse_theme("solid-line.road { line-width: 10px; color: #ff0000; }")
            .expect("valid theme");
        let technique = Technique::from_rule(&rules[0], TechniqueKey::new(0, 0));
        assert_eq!(technique.kind, TechniqueKind::SolidLine);
        assert_eq!(technique.metric_unit, MetricUnit::Pixel);
        assert_eq!(technique.line_width, Some(Attr::number(10.0)));
        assert_eq!(technique.color, Some(Attr::color(Color::RED)));
    }

    #[test]
    fn explicit_unit_wins() {
        let rules =
            try_parse_theme("solid-line { line-width: 10px; metric-unit: world; }").expect("valid theme");
        let technique = Technique::from_rule(&rules[0], TechniqueKey::new(0, 0));
        assert_eq!(technique.metric_unit, MetricUnit::World);
    }

    #[test]
    fn unknown_properties_are_ignored() {
        let technique = Technique::new(TechniqueKind::Fill, TechniqueKey::new(0, 1))
            .with("font-size", Attr::number(3.0))
            .with("opacity", Attr::number(0.5));
        assert_eq!(technique.opacity, Some(Attr::number(0.5)));
    }
}
