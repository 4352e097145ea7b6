#![warn(missing_docs)]

//! Tool geometry for machining simulation.
//!
//! A [`Tool`] describes one physical cutter: its shape, radius, length and
//! the unit system it was specified in. Lengths are always stored in
//! millimeters; the XML and JSON forms write them in the tool's own units.
//!
//! # Example
//!
//! ```
//! use millsim_tool::{Tool, ToolShape, ToolUnits};
//!
//! let mut tool = Tool::new(1, 1, ToolUnits::Mm);
//! tool.set_shape(ToolShape::Ballnose);
//! tool.set_diameter(6.0);
//! tool.set_length(20.0);
//!
//! assert_eq!(tool.radius(), 3.0);
//! assert_eq!(tool.text(), "6x20mm Ballnose");
//! ```

mod error;
mod table;
mod tool;

pub use error::{Result, ToolError};
pub use table::ToolTable;
pub use tool::{Tool, ToolShape, ToolUnits, MM_PER_INCH};
