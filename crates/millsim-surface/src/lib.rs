#![warn(missing_docs)]

//! Triangle mesh buffers for the millsim machining kernel.
//!
//! A mesh is accumulated in a [`SurfaceBuilder`] and sealed into a
//! [`Surface`] with [`SurfaceBuilder::finalize`]. Both expose their flat
//! `f32` vertex and normal buffers, element count and bounds through
//! [`SurfaceView`]. Sealed surfaces share their buffers and may be sent to
//! other threads.
//!
//! Long running operations ([`read_stl`], [`write_stl`] and `reduce`) take
//! an optional [`Task`] that can cancel them between elements.
//!
//! # Example
//!
//! ```
//! use millsim_math::Point3;
//! use millsim_surface::{SurfaceBuilder, SurfaceView};
//!
//! let mut builder = SurfaceBuilder::triangles();
//! builder.add_element(&[
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ])?;
//!
//! let surface = builder.finalize();
//! assert_eq!(surface.count(), 1);
//! assert_eq!(surface.normals()[2], 1.0);
//! # Ok::<(), millsim_surface::SurfaceError>(())
//! ```

mod error;
mod reduce;
mod stl;
mod surface;
mod task;

pub use error::{Result, SurfaceError};
pub use stl::{read_stl, write_stl, StlFormat, STL_NAME};
pub use surface::{
    winding_normal, Element, ElementKind, Elements, Surface, SurfaceBuilder, SurfaceView,
};
pub use task::Task;
