#![warn(missing_docs)]

//! Swept tool volumes.
//!
//! A [`Sweep`] is the solid traced by a tool's cutting profile as the tool
//! tip moves in a straight line. Tools are vertical with the tip at the
//! programmed position and the body extending upward along +Z.
//!
//! # Example
//!
//! ```
//! use millsim_math::{Bounds3, Point3};
//! use millsim_sweep::Sweep;
//! use millsim_tool::{Tool, ToolUnits};
//!
//! let mut tool = Tool::new(1, 1, ToolUnits::Mm);
//! tool.set_radius(3.0);
//! tool.set_length(12.0);
//!
//! let sweep = Sweep::for_tool(&tool);
//! let mut boxes = Vec::new();
//! sweep.bboxes(&Point3::origin(), &Point3::new(10.0, 0.0, 0.0), &mut boxes, 0);
//!
//! let bounds = boxes.iter().fold(Bounds3::empty(), |b, x| b.union(x));
//! assert!(bounds.contains(&Point3::new(10.0, 3.0, 12.0)));
//! assert!(bounds.contains(&Point3::new(0.0, -3.0, 0.0)));
//! ```

mod composite;
mod conic;
mod spheroid;

pub use composite::CompositeSweep;
pub use conic::ConicSweep;
pub use spheroid::SpheroidSweep;

use millsim_math::{Bounds3, Point3, Vec3};
use millsim_tool::{Tool, ToolShape};

/// Upper bound on the boxes produced for one move at default granularity.
const MAX_DEFAULT_SEGMENTS: usize = 256;

/// Solid swept by a tool moving along a line segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Sweep {
    /// Cylinder, cone or truncated cone.
    Conic(ConicSweep),
    /// Ellipsoid of revolution.
    Spheroid(SpheroidSweep),
    /// Stack of sweeps at Z offsets.
    Composite(CompositeSweep),
}

impl Sweep {
    /// Build the sweep for a tool's shape.
    pub fn for_tool(tool: &Tool) -> Self {
        let radius = tool.radius();
        let length = tool.length();

        match tool.shape() {
            ToolShape::Cylindrical => ConicSweep::new(length, radius, radius).into(),
            ToolShape::Conical => ConicSweep::new(length, radius, 0.0).into(),
            ToolShape::Ballnose => {
                let mut composite = CompositeSweep::new();
                composite.add(SpheroidSweep::new(radius, 2.0 * radius).into(), 0.0);
                composite.add(ConicSweep::new(length, radius, radius).into(), radius);
                composite.into()
            }
            ToolShape::Spheroid => SpheroidSweep::new(radius, length).into(),
            ToolShape::Snubnose => {
                ConicSweep::new(length, radius, tool.snub_diameter() / 2.0).into()
            }
        }
    }

    /// Append boxes that together cover the solid swept from `start` to `end`.
    ///
    /// `subdivisions` is the number of pieces the move is split into, each
    /// getting its own box; 0 picks a count from the move length and tool
    /// radius.
    pub fn bboxes(&self, start: &Point3, end: &Point3, out: &mut Vec<Bounds3>, subdivisions: usize) {
        match self {
            Sweep::Conic(s) => s.bboxes(start, end, out, subdivisions),
            Sweep::Spheroid(s) => s.bboxes(start, end, out, subdivisions),
            Sweep::Composite(s) => s.bboxes(start, end, out, subdivisions),
        }
    }

    /// Single box covering the whole move.
    pub fn bbox(&self, start: &Point3, end: &Point3) -> Bounds3 {
        let mut boxes = Vec::new();
        self.bboxes(start, end, &mut boxes, 1);
        boxes.iter().fold(Bounds3::empty(), |acc, b| acc.union(b))
    }

    /// True if `p` lies inside the solid swept from `start` to `end`.
    pub fn contains(&self, start: &Point3, end: &Point3, p: &Point3) -> bool {
        match self {
            Sweep::Conic(s) => s.contains(start, end, p),
            Sweep::Spheroid(s) => s.contains(start, end, p),
            Sweep::Composite(s) => s.contains(start, end, p),
        }
    }

    /// Height of the solid above the tool tip.
    pub fn height(&self) -> f64 {
        match self {
            Sweep::Conic(s) => s.length(),
            Sweep::Spheroid(s) => s.length(),
            Sweep::Composite(s) => s.height(),
        }
    }

    /// Widest radius of the profile.
    pub fn max_radius(&self) -> f64 {
        match self {
            Sweep::Conic(s) => s.max_radius(),
            Sweep::Spheroid(s) => s.radius(),
            Sweep::Composite(s) => s.max_radius(),
        }
    }
}

impl From<ConicSweep> for Sweep {
    fn from(s: ConicSweep) -> Self {
        Sweep::Conic(s)
    }
}

impl From<SpheroidSweep> for Sweep {
    fn from(s: SpheroidSweep) -> Self {
        Sweep::Spheroid(s)
    }
}

impl From<CompositeSweep> for Sweep {
    fn from(s: CompositeSweep) -> Self {
        Sweep::Composite(s)
    }
}

/// Boxes for a profile of `radius` spanning `height` above the tip, split
/// into pieces along the move.
pub(crate) fn segment_bboxes(
    start: &Point3,
    end: &Point3,
    radius: f64,
    height: f64,
    out: &mut Vec<Bounds3>,
    subdivisions: usize,
) {
    let delta = end - start;
    let count = if subdivisions > 0 {
        subdivisions
    } else {
        default_segments(&delta, radius)
    };

    let grow = Vec3::new(radius, radius, 0.0);
    for i in 0..count {
        let a = start + delta * (i as f64 / count as f64);
        let b = start + delta * ((i + 1) as f64 / count as f64);

        let min = a.inf(&b) - grow;
        let max = b.sup(&a) + grow + Vec3::new(0.0, 0.0, height);
        out.push(Bounds3::new(min, max));
    }
}

fn default_segments(delta: &Vec3, radius: f64) -> usize {
    let travel = delta.xy().norm();
    let step = (2.0 * radius).max(1.0);
    if !travel.is_finite() {
        return 1;
    }
    ((travel / step).ceil() as usize).clamp(1, MAX_DEFAULT_SEGMENTS)
}

/// Parameter in [0, 1] of the point on segment `a`-`b` closest to `p`.
pub(crate) fn closest_param(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-20 {
        return 0.0;
    }
    ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use millsim_tool::ToolUnits;

    fn tool(shape: ToolShape, radius: f64, length: f64) -> Tool {
        let mut t = Tool::new(1, 1, ToolUnits::Mm);
        t.set_shape(shape);
        t.set_radius(radius);
        t.set_length(length);
        t
    }

    fn union(boxes: &[Bounds3]) -> Bounds3 {
        boxes.iter().fold(Bounds3::empty(), |acc, b| acc.union(b))
    }

    #[test]
    fn test_cylinder_bbox_covers_move() {
        let sweep = Sweep::for_tool(&tool(ToolShape::Cylindrical, 3.0, 12.0));
        let mut boxes = Vec::new();
        sweep.bboxes(&Point3::origin(), &Point3::new(10.0, 0.0, 0.0), &mut boxes, 0);
        assert!(!boxes.is_empty());

        let b = union(&boxes);
        let required = Bounds3::new(Point3::new(0.0, -3.0, 0.0), Point3::new(10.0, 3.0, 12.0));
        assert!(b.contains_bounds(&required));
        assert_relative_eq!(b.min().z, 0.0);
        assert_relative_eq!(b.max().z, 12.0);
    }

    #[test]
    fn test_shape_dispatch() {
        let cyl = Sweep::for_tool(&tool(ToolShape::Cylindrical, 2.0, 8.0));
        assert_eq!(cyl, Sweep::Conic(ConicSweep::new(8.0, 2.0, 2.0)));

        let cone = Sweep::for_tool(&tool(ToolShape::Conical, 2.0, 8.0));
        assert_eq!(cone, Sweep::Conic(ConicSweep::new(8.0, 2.0, 0.0)));

        let sph = Sweep::for_tool(&tool(ToolShape::Spheroid, 2.0, 8.0));
        assert_eq!(sph, Sweep::Spheroid(SpheroidSweep::new(2.0, 8.0)));

        let mut snub = tool(ToolShape::Snubnose, 2.0, 8.0);
        snub.set_snub_diameter(1.0);
        assert_eq!(
            Sweep::for_tool(&snub),
            Sweep::Conic(ConicSweep::new(8.0, 2.0, 0.5))
        );
    }

    #[test]
    fn test_ballnose_is_sphere_on_shank() {
        let sweep = Sweep::for_tool(&tool(ToolShape::Ballnose, 2.0, 10.0));
        let Sweep::Composite(composite) = &sweep else {
            panic!("ballnose should be composite");
        };

        let children: Vec<_> = composite.children().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], (&Sweep::Spheroid(SpheroidSweep::new(2.0, 4.0)), 0.0));
        assert_eq!(children[1], (&Sweep::Conic(ConicSweep::new(10.0, 2.0, 2.0)), 2.0));

        assert_relative_eq!(sweep.height(), 12.0);
        assert_relative_eq!(sweep.max_radius(), 2.0);

        let b = sweep.bbox(&Point3::origin(), &Point3::origin());
        assert_relative_eq!(b.min().z, 0.0);
        assert_relative_eq!(b.max().z, 12.0);
    }

    #[test]
    fn test_subdivision_hint() {
        let sweep = Sweep::for_tool(&tool(ToolShape::Cylindrical, 1.0, 5.0));
        let start = Point3::new(0.0, 0.0, -1.0);
        let end = Point3::new(20.0, 20.0, -1.0);

        let mut boxes = Vec::new();
        sweep.bboxes(&start, &end, &mut boxes, 4);
        assert_eq!(boxes.len(), 4);

        let whole = sweep.bbox(&start, &end);
        assert_eq!(union(&boxes), whole);

        // Chopping a diagonal move gives less total box volume
        let split: f64 = boxes.iter().map(|b| b.volume()).sum();
        assert!(split < whole.volume());
    }

    #[test]
    fn test_default_granularity() {
        let sweep = Sweep::for_tool(&tool(ToolShape::Cylindrical, 1.0, 5.0));
        let mut boxes = Vec::new();
        sweep.bboxes(&Point3::origin(), &Point3::new(10.0, 0.0, 0.0), &mut boxes, 0);
        assert_eq!(boxes.len(), 5);

        boxes.clear();
        sweep.bboxes(&Point3::origin(), &Point3::new(0.0, 0.0, -5.0), &mut boxes, 0);
        assert_eq!(boxes.len(), 1);
    }

    #[test]
    fn test_boxes_cover_contained_points() {
        let shapes = [
            ToolShape::Cylindrical,
            ToolShape::Conical,
            ToolShape::Ballnose,
            ToolShape::Spheroid,
            ToolShape::Snubnose,
        ];
        let start = Point3::new(1.0, 2.0, -3.0);
        let end = Point3::new(6.0, -1.0, -1.0);

        for shape in shapes {
            let mut t = tool(shape, 2.0, 6.0);
            t.set_snub_diameter(1.0);
            let sweep = Sweep::for_tool(&t);
            let bounds = sweep.bbox(&start, &end);

            for i in 0..=10 {
                let c = start + (end - start) * (i as f64 / 10.0);
                let sample = c + Vec3::new(0.5, 0.5, 1.0);
                if sweep.contains(&start, &end, &sample) {
                    assert!(bounds.contains(&sample), "{:?} box misses {:?}", shape, sample);
                }
            }
        }
    }
}
