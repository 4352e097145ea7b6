//! Stacks of sweeps.

use millsim_math::{Bounds3, Point3, Vec3};

use crate::Sweep;

/// Sweeps stacked at Z offsets above the tool tip, ordered by offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeSweep {
    children: Vec<(Sweep, f64)>,
}

impl CompositeSweep {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sweep whose tip sits `z_offset` above the tool tip.
    ///
    /// Children stay sorted by offset; equal offsets keep insertion order.
    pub fn add(&mut self, sweep: Sweep, z_offset: f64) {
        let index = self.children.partition_point(|(_, offset)| *offset <= z_offset);
        self.children.insert(index, (sweep, z_offset));
    }

    /// Children with their offsets, lowest first.
    pub fn children(&self) -> impl Iterator<Item = (&Sweep, f64)> {
        self.children.iter().map(|(sweep, offset)| (sweep, *offset))
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True if there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Top of the highest child above the tool tip.
    pub fn height(&self) -> f64 {
        self.children
            .iter()
            .map(|(sweep, offset)| offset + sweep.height())
            .fold(0.0, f64::max)
    }

    /// Widest radius of any child.
    pub fn max_radius(&self) -> f64 {
        self.children
            .iter()
            .map(|(sweep, _)| sweep.max_radius())
            .fold(0.0, f64::max)
    }

    pub(crate) fn bboxes(&self, start: &Point3, end: &Point3, out: &mut Vec<Bounds3>, subdivisions: usize) {
        for (sweep, offset) in &self.children {
            let lift = Vec3::new(0.0, 0.0, *offset);
            sweep.bboxes(&(start + lift), &(end + lift), out, subdivisions);
        }
    }

    pub(crate) fn contains(&self, start: &Point3, end: &Point3, p: &Point3) -> bool {
        self.children.iter().any(|(sweep, offset)| {
            let lift = Vec3::new(0.0, 0.0, *offset);
            sweep.contains(&(start + lift), &(end + lift), p)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConicSweep, SpheroidSweep};
    use approx::assert_relative_eq;

    #[test]
    fn test_children_sorted_by_offset() {
        let mut composite = CompositeSweep::new();
        composite.add(ConicSweep::new(1.0, 1.0, 1.0).into(), 5.0);
        composite.add(ConicSweep::new(2.0, 1.0, 1.0).into(), 0.0);
        composite.add(ConicSweep::new(3.0, 1.0, 1.0).into(), 5.0);

        let offsets: Vec<f64> = composite.children().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0.0, 5.0, 5.0]);

        let lengths: Vec<f64> = composite.children().map(|(s, _)| s.height()).collect();
        assert_eq!(lengths, vec![2.0, 1.0, 3.0]);
        assert_relative_eq!(composite.height(), 8.0);
    }

    #[test]
    fn test_ballnose_contains() {
        let mut ball = CompositeSweep::new();
        ball.add(SpheroidSweep::new(1.0, 2.0).into(), 0.0);
        ball.add(ConicSweep::new(5.0, 1.0, 1.0).into(), 1.0);

        let p = Point3::origin();
        // Ball tip
        assert!(ball.contains(&p, &p, &Point3::new(0.0, 0.0, 0.05)));
        // Corner below the sphere is not cut
        assert!(!ball.contains(&p, &p, &Point3::new(0.9, 0.0, 0.1)));
        // Shank
        assert!(ball.contains(&p, &p, &Point3::new(0.9, 0.0, 5.0)));
        assert!(!ball.contains(&p, &p, &Point3::new(0.0, 0.0, 6.1)));
    }

    #[test]
    fn test_composite_bboxes_are_lifted() {
        let mut composite = CompositeSweep::new();
        composite.add(ConicSweep::new(2.0, 1.0, 1.0).into(), 3.0);

        let mut boxes = Vec::new();
        composite.bboxes(&Point3::origin(), &Point3::origin(), &mut boxes, 0);
        assert_eq!(boxes.len(), 1);
        assert_relative_eq!(boxes[0].min().z, 3.0);
        assert_relative_eq!(boxes[0].max().z, 5.0);
    }
}
