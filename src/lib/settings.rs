use serde_derive::Deserialize;
use std::convert::TryFrom;

use crate::*;

/// How the map is projected. Line clipping only applies to planar projections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Projection {
    Planar,
    Spherical,
}

impl TryFrom<String> for Projection {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match &value.to_lowercase()[..] {
            "planar" | "mercator" => Ok(Projection::Planar),
            "spherical" | "sphere" => Ok(Projection::Spherical),
            other => Err(format!("unknown projection '{}'", other)),
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Planar
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct General {
    #[serde(deserialize_with = "deserialize_level")]
    pub log_level: log::Level,
    pub theme: String,
}

/// Accepts level names in any case, e.g. `info` or `WARN`.
fn deserialize_level<'de, D>(deserializer: D) -> std::result::Result<log::Level, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let level = <String as serde::Deserialize>::deserialize(deserializer)?;
    level.parse().map_err(serde::de::Error::custom)
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: log::Level::Info,
            theme: "config/theme.css".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Renderer {
    pub depth_pre_pass: bool,
    pub clipping: bool,
    pub projection: Projection,
    /// Used for extruded polygons whose technique doesn't say.
    pub animate_extrusion: bool,
    pub extrusion_duration_ms: u32,
    /// Technique kinds the geometry creator never builds objects for.
    pub disabled_kinds: Vec<String>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            depth_pre_pass: true,
            clipping: true,
            projection: Projection::Planar,
            animate_extrusion: false,
            extrusion_duration_ms: 750,
            disabled_kinds: vec![],
        }
    }
}

impl Renderer {
    pub fn is_disabled(&self, kind: &TechniqueKind) -> bool {
        self.disabled_kinds
            .iter()
            .any(|disabled| disabled == kind.name())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: General,
    pub renderer: Renderer,
}

impl Settings {
    /// Loads the settings from `config/default`, `config/local` and `SEXTANT__*` variables,
    /// in that order. Every source is optional.
    pub fn new() -> Result<Self> {
        let mut s = config::Config::new();

        s.merge(config::File::with_name("config/default").required(false))?;

        // This file shouldn't be checked in to git
        s.merge(config::File::with_name("config/local").required(false))?;

        s.merge(config::Environment::with_prefix("SEXTANT").separator("__"))?;

        Ok(s.try_into()?)
    }

    /// Parses settings from a TOML string.
    pub fn from_toml(source: &str) -> Result<Self> {
        let mut s = config::Config::new();
        s.merge(config::File::from_str(source, config::FileFormat::Toml))?;
        Ok(s.try_into()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_use_defaults() {
        let settings = Settings::from_toml("[general]\nlog_level = \"debug\"").expect("valid toml");
        assert_eq!(settings.general.log_level, log::Level::Debug);
        assert!(settings.renderer.depth_pre_pass);
        assert!(settings.renderer.clipping);
        assert_eq!(settings.renderer.projection, Projection::Planar);
        assert_eq!(settings.renderer.extrusion_duration_ms, 750);
    }

    #[test]
    fn log_levels_ignore_case() {
        let settings = Settings::from_toml("[general]\nlog_level = \"WARN\"").expect("valid toml");
        assert_eq!(settings.general.log_level, log::Level::Warn);
        assert!(Settings::from_toml("[general]\nlog_level = \"loud\"").is_err());
    }

    #[test]
    fn shipped_defaults_load() {
        let settings = Settings::from_toml(include_str!("../../config/default.toml"))
            .expect("valid config/default.toml");
        assert_eq!(settings.general.log_level, log::Level::Info);
        assert!(settings.renderer.animate_extrusion);
    }

    #[test]
    fn renderer_section_overrides() {
        let settings = Settings::from_toml(
            "[renderer]\nprojection = \"spherical\"\ndisabled_kinds = [\"terrain\"]\nclipping = false",
        )
        .expect("valid toml");
        assert_eq!(settings.renderer.projection, Projection::Spherical);
        assert!(!settings.renderer.clipping);
        assert!(settings.renderer.is_disabled(&TechniqueKind::Terrain));
        assert!(!settings.renderer.is_disabled(&TechniqueKind::Fill));
    }
}
