//! Error types for projects and tool paths.

use millsim_math::MathError;
use millsim_tool::ToolError;
use thiserror::Error;

/// Errors that can occur while loading, saving or editing a project.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// File system access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Project XML could not be read or written.
    #[error("XML error: {0}")]
    Xml(String),

    /// Tool table failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A printable vector option could not be parsed.
    #[error(transparent)]
    Math(#[from] MathError),

    /// A boolean or numeric option could not be parsed.
    #[error("invalid value '{value}' for option '{option}'")]
    InvalidOption {
        /// Option name.
        option: String,
        /// The offending text.
        value: String,
    },

    /// Resolution mode token not recognized.
    #[error("unknown resolution mode '{0}'")]
    UnknownResolutionMode(String),

    /// Render mode token not recognized.
    #[error("unknown render mode '{0}'")]
    UnknownRenderMode(String),

    /// Move type token not recognized.
    #[error("unknown move type '{0}'")]
    UnknownMoveType(String),

    /// Save requested before the project was given a filename.
    #[error("project has no filename")]
    NoFilename,

    /// No NC file at this position.
    #[error("invalid file index {0}")]
    InvalidFileIndex(usize),

    /// Tool path JSON had the wrong structure.
    #[error("invalid tool path: {0}")]
    InvalidToolPath(String),

    /// Settings file could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
}

/// Result type for project operations.
pub type Result<T> = std::result::Result<T, ProjectError>;

pub(crate) fn xml_error(err: impl std::fmt::Display) -> ProjectError {
    ProjectError::Xml(err.to_string())
}
