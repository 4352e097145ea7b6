#![warn(missing_docs)]

//! Math types for the millsim machining kernel.
//!
//! Thin wrappers around nalgebra providing the domain types shared by the
//! tool, sweep, surface and project crates: points, vectors, axis-aligned
//! bounds and the nine-axis machine position record.

use nalgebra::Vector3;
use thiserror::Error;

mod axes;
mod bounds;

pub use axes::Axes;
pub use bounds::Bounds3;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Errors from parsing textual math values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    /// The text did not contain exactly three numbers.
    #[error("invalid vector '{0}'")]
    InvalidVector(String),
}

/// Format a point as `(x, y, z)`.
pub fn format_vec3(p: &Point3) -> String {
    format!("({}, {}, {})", p.x, p.y, p.z)
}

/// Parse a point written as `(x, y, z)`, `x, y, z` or `x y z`.
pub fn parse_vec3(text: &str) -> Result<Point3, MathError> {
    let trimmed = text
        .trim()
        .trim_start_matches(['(', '['])
        .trim_end_matches([')', ']']);

    let values: Vec<f64> = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| MathError::InvalidVector(text.to_string()))?;

    match values.as_slice() {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(MathError::InvalidVector(text.to_string())),
    }
}
