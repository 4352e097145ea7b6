//! Error types for tool definitions.

use thiserror::Error;

/// Errors from reading tool definitions.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The `length` attribute is required.
    #[error("tool {0} missing length")]
    MissingLength(u32),

    /// One of `radius` or `diameter` is required.
    #[error("tool {0} has neither radius or diameter")]
    MissingRadius(u32),

    /// Shape token not recognized.
    #[error("unknown tool shape '{0}'")]
    UnknownShape(String),

    /// Units token not recognized.
    #[error("unknown tool units '{0}'")]
    UnknownUnits(String),

    /// A numeric field could not be parsed.
    #[error("invalid {field} '{value}'")]
    InvalidNumber {
        /// Attribute or key name.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// Length or radius is not positive.
    #[error("tool {number} has non-positive {field}: {value}")]
    InvalidDimension {
        /// Tool number.
        number: u32,
        /// `length` or `radius`.
        field: &'static str,
        /// The rejected value in mm.
        value: f64,
    },

    /// JSON value had the wrong structure.
    #[error("invalid tool JSON: {0}")]
    Json(String),

    /// XML reading or writing failed.
    #[error("XML error: {0}")]
    Xml(String),
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

pub(crate) fn xml_error(err: impl std::fmt::Display) -> ToolError {
    ToolError::Xml(err.to_string())
}
