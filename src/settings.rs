//! Sculpture settings.
//!
//! [`Settings`] is the small configuration record consulted by the
//! [`SceneController`](crate::controller::SceneController). The defaults are
//! the values the page ships with; hosts may change them at runtime through
//! the controller's setters.

use std::{fmt, str::FromStr};

use anyhow::anyhow;

/// How the sculpture surface is shaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaterialMode {
    /// Greyscale by fragment depth, bright when close to the camera.
    #[default]
    Depth,
    /// View-space normal mapped to RGB.
    Normal,
}

impl MaterialMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialMode::Depth => "depth",
            MaterialMode::Normal => "normal",
        }
    }
}

impl fmt::Display for MaterialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "depth" => Ok(MaterialMode::Depth),
            "normal" => Ok(MaterialMode::Normal),
            other => Err(anyhow!(
                "unknown material mode {:?}, expected \"depth\" or \"normal\"",
                other
            )),
        }
    }
}

/// Configuration of the sculpture.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Resolution level. The sampling grid has `2^(resolution + 2)` cells per axis.
    pub resolution: u32,
    /// Half extent of the sampled cube `[-bounds, bounds]³`.
    pub bounds: f32,
    pub auto_rotate: bool,
    pub wireframe: bool,
    pub material: MaterialMode,
    /// Vertex count of the last generated geometry. Diagnostic only.
    pub vertex_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution: 4,
            bounds: 1.0,
            auto_rotate: true,
            wireframe: true,
            material: MaterialMode::Depth,
            vertex_count: 0,
        }
    }
}

impl Settings {
    /// Cells per axis of the sampling grid for the current resolution level.
    pub fn subdivisions(&self) -> u32 {
        subdivisions(self.resolution)
    }
}

/// `2^(resolution + 2)`, saturating at 2^31 for absurd levels.
pub fn subdivisions(resolution: u32) -> u32 {
    1u32.checked_shl(resolution.saturating_add(2)).unwrap_or(1 << 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_page() {
        let settings = Settings::default();
        assert_eq!(settings.resolution, 4);
        assert_eq!(settings.bounds, 1.0);
        assert!(settings.auto_rotate);
        assert!(settings.wireframe);
        assert_eq!(settings.material, MaterialMode::Depth);
        assert_eq!(settings.vertex_count, 0);
        assert_eq!(settings.subdivisions(), 64);
    }

    #[test]
    fn subdivisions_are_powers_of_two_offset_by_two() {
        assert_eq!(subdivisions(0), 4);
        assert_eq!(subdivisions(1), 8);
        assert_eq!(subdivisions(3), 32);
        assert_eq!(subdivisions(6), 256);
    }

    #[test]
    fn parses_known_material_modes() {
        assert_eq!("depth".parse::<MaterialMode>().unwrap(), MaterialMode::Depth);
        assert_eq!(" Normal ".parse::<MaterialMode>().unwrap(), MaterialMode::Normal);
        assert_eq!(MaterialMode::Normal.to_string(), "normal");
    }

    #[test]
    fn rejects_unknown_material_modes() {
        let err = "phong".parse::<MaterialMode>().unwrap_err();
        assert!(err.to_string().contains("phong"));
        assert!("".parse::<MaterialMode>().is_err());
    }
}
