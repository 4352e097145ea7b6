//! Defaults applied to new projects.

use std::fs;
use std::path::Path;

use millsim_tool::ToolUnits;
use serde::{Deserialize, Serialize};

use crate::{RenderMode, ResolutionMode, Result};

/// Defaults for new projects, read from a TOML file.
///
/// ```toml
/// units = "INCH"
/// resolution-mode = "high"
/// render-mode = "surface-nets"
/// workpiece-margin = 10.0
/// watch = false
/// ```
///
/// Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Display units.
    pub units: ToolUnits,
    /// Grid resolution policy.
    pub resolution_mode: ResolutionMode,
    /// Surface generation method.
    pub render_mode: RenderMode,
    /// Percent margin around an estimated workpiece.
    pub workpiece_margin: f64,
    /// Reload NC files when they change on disk.
    pub watch: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            units: ToolUnits::Mm,
            resolution_mode: ResolutionMode::Medium,
            render_mode: RenderMode::MarchingCubes,
            workpiece_margin: 5.0,
            watch: true,
        }
    }
}

impl Settings {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_toml_str(&text)?;
        log::debug!("loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }
}
