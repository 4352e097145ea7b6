//! Error types for mesh buffers and STL interchange.

use thiserror::Error;

/// Errors that can occur while building, reading or writing surfaces.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not a recognizable STL file.
    #[error("invalid STL: {0}")]
    InvalidStl(String),

    /// Binary STL declares more triangles than the input holds.
    #[error("truncated STL: expected {expected} bytes, found {found}")]
    Truncated {
        /// Size implied by the triangle count.
        expected: usize,
        /// Bytes actually present.
        found: usize,
    },

    /// An element was given the wrong number of vertices.
    #[error("element has {got} vertices, surface expects {expected}")]
    Arity {
        /// Vertices per element of the surface.
        expected: usize,
        /// Vertices supplied.
        got: usize,
    },
}

/// Result type for surface operations.
pub type Result<T> = std::result::Result<T, SurfaceError>;
