//! Workpiece estimation and grid resolution policy.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use millsim_math::{Bounds3, Point3, Vec3};
use millsim_sweep::Sweep;
use millsim_tool::ToolTable;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Move, MoveType, ProjectError, Result, ToolPath};

/// Thinnest workpiece produced by estimation, in mm.
pub const MIN_WORKPIECE_THICKNESS: f64 = 2.0;

/// How the simulation grid resolution is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Coarse grid.
    Low,
    /// Default grid.
    #[default]
    Medium,
    /// Fine grid.
    High,
    /// Finest grid.
    VeryHigh,
    /// Resolution set by the user.
    Manual,
}

impl ResolutionMode {
    /// Every mode, coarsest first.
    pub const ALL: [ResolutionMode; 5] = [
        ResolutionMode::Low,
        ResolutionMode::Medium,
        ResolutionMode::High,
        ResolutionMode::VeryHigh,
        ResolutionMode::Manual,
    ];

    /// Number of grid cells the workpiece volume is divided into, or `None`
    /// for manual.
    pub fn divisor(self) -> Option<f64> {
        match self {
            ResolutionMode::Low => Some(100_000.0),
            ResolutionMode::Medium => Some(250_000.0),
            ResolutionMode::High => Some(5_000_000.0),
            ResolutionMode::VeryHigh => Some(10_000_000.0),
            ResolutionMode::Manual => None,
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionMode::Low => "low",
            ResolutionMode::Medium => "medium",
            ResolutionMode::High => "high",
            ResolutionMode::VeryHigh => "very-high",
            ResolutionMode::Manual => "manual",
        })
    }
}

impl FromStr for ResolutionMode {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().to_ascii_lowercase().replace('_', "-");
        match token.strip_prefix("resolution-").unwrap_or(&token) {
            "low" => Ok(ResolutionMode::Low),
            "medium" => Ok(ResolutionMode::Medium),
            "high" => Ok(ResolutionMode::High),
            "very-high" => Ok(ResolutionMode::VeryHigh),
            "manual" => Ok(ResolutionMode::Manual),
            _ => Err(ProjectError::UnknownResolutionMode(s.to_string())),
        }
    }
}

/// Grid cell size for a workpiece.
///
/// Manual mode and workpieces without volume give 1. Otherwise the cube
/// root of the volume per cell.
pub fn compute_resolution(mode: ResolutionMode, bounds: &Bounds3) -> f64 {
    let volume = bounds.volume();
    match mode.divisor() {
        Some(divisor) if volume > 0.0 && volume.is_finite() => (volume / divisor).cbrt(),
        _ => 1.0,
    }
}

/// Guess a cuboid workpiece from the cutting moves of a tool path.
///
/// Every cutting move with a tool number of zero or more contributes the
/// boxes of its tool's swept volume. The result starts at Z = 0 and
/// reaches down at least [`MIN_WORKPIECE_THICKNESS`]. It then grows by
/// `margin_percent` of its size on every side except the top.
///
/// Returns `None` if no move cut anything or the envelope is not finite.
pub fn estimate_workpiece(path: &ToolPath, tools: &ToolTable, margin_percent: f64) -> Option<Bounds3> {
    let mut sweeps: HashMap<i32, Sweep> = HashMap::new();
    let mut cutting: Vec<&Move> = Vec::new();

    for m in path {
        if m.kind == MoveType::Rapid || m.tool < 0 {
            continue;
        }

        sweeps.entry(m.tool).or_insert_with(|| {
            let tool = tools.get_or_null(m.tool as u32);
            log::debug!("sweep for tool {}: {}", m.tool, tool.text());
            Sweep::for_tool(tool)
        });

        cutting.push(m);
    }

    let envelope = cutting
        .par_iter()
        .fold(Bounds3::empty, |mut acc, m| {
            if let Some(sweep) = sweeps.get(&m.tool) {
                let mut boxes = Vec::new();
                sweep.bboxes(&m.start_point(), &m.end_point(), &mut boxes, 0);
                for b in &boxes {
                    acc.add_bounds(b);
                }
            }
            acc
        })
        .reduce(Bounds3::empty, |a, b| a.union(&b));

    if envelope.is_empty() {
        return None;
    }

    let (low, high) = (envelope.min(), envelope.max());
    let mut min = low;
    let max = Point3::new(high.x, high.y, 0.0);
    if max.z - min.z < MIN_WORKPIECE_THICKNESS {
        min.z = (low.z - MIN_WORKPIECE_THICKNESS).min(-MIN_WORKPIECE_THICKNESS);
    }

    let mut bounds = Bounds3::new(min, max);
    if !bounds.is_real() {
        log::warn!("ignoring non-finite workpiece estimate {:?}", bounds);
        return None;
    }

    let margin = bounds.dimensions() * margin_percent / 100.0;
    bounds.add_point(&(bounds.min() - margin));
    bounds.add_point(&(bounds.max() + Vec3::new(margin.x, margin.y, 0.0)));

    log::debug!(
        "estimated workpiece {:?} from {} cutting moves",
        bounds,
        cutting.len()
    );
    Some(bounds)
}
