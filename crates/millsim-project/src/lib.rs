#![warn(missing_docs)]

//! Simulation projects for the millsim machining kernel.
//!
//! A [`Project`] ties together the NC programs to simulate, the tool table
//! and the options that control the simulation grid. When no workpiece is
//! configured it is estimated from the swept volume of the cutting moves
//! in a [`ToolPath`], and the grid resolution follows its volume.
//!
//! Projects are stored as XML next to their NC files, which are recorded
//! by relative path.
//!
//! # Example
//!
//! ```
//! use millsim_math::Point3;
//! use millsim_project::{Move, Project, ToolPath};
//!
//! let path: ToolPath = [Move::cutting(
//!     Point3::new(0.0, 0.0, -1.0),
//!     Point3::new(50.0, 0.0, -1.0),
//!     1,
//! )]
//! .into_iter()
//! .collect();
//!
//! let mut project = Project::new();
//! project.update_automatic_workpiece(&path);
//!
//! let workpiece = project.workpiece_bounds();
//! assert_eq!(workpiece.max().z, 0.0);
//! assert!(workpiece.height() >= 2.0);
//! ```

mod error;
mod files;
mod project;
mod settings;
mod toolpath;
mod workpiece;

pub use error::{ProjectError, Result};
pub use files::{absolute_path, decode_filename, encode_filename, relative_path, NcFile};
pub use project::{Project, RenderMode};
pub use settings::Settings;
pub use toolpath::{Move, MoveType, ToolPath};
pub use workpiece::{compute_resolution, estimate_workpiece, ResolutionMode, MIN_WORKPIECE_THICKNESS};
