//! Cylinders, cones and truncated cones.

use millsim_math::{Bounds3, Point3};

use crate::{closest_param, segment_bboxes};

/// Sampling step along non-horizontal moves, as a fraction of the radius.
const SAMPLE_FRACTION: f64 = 0.05;

/// Most samples taken along one move by [`ConicSweep::contains`].
const MAX_SAMPLES: usize = 4096;

/// A conic profile: `radius2` at the tip, `radius1` at `length` above it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicSweep {
    length: f64,
    radius1: f64,
    radius2: f64,
}

impl ConicSweep {
    /// Create a conic profile with top radius `radius1` and tip radius `radius2`.
    pub fn new(length: f64, radius1: f64, radius2: f64) -> Self {
        Self {
            length,
            radius1,
            radius2,
        }
    }

    /// Axial length.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Radius at the top.
    pub fn top_radius(&self) -> f64 {
        self.radius1
    }

    /// Radius at the tip.
    pub fn tip_radius(&self) -> f64 {
        self.radius2
    }

    /// Larger of the two radii.
    pub fn max_radius(&self) -> f64 {
        self.radius1.max(self.radius2)
    }

    /// Radius at `height` above the tip, or `None` outside `[0, length]`.
    pub fn radius_at_height(&self, height: f64) -> Option<f64> {
        if height < 0.0 || height > self.length {
            return None;
        }
        if self.length <= 0.0 {
            return Some(self.max_radius());
        }
        Some(self.radius2 + (self.radius1 - self.radius2) * height / self.length)
    }

    pub(crate) fn bboxes(&self, start: &Point3, end: &Point3, out: &mut Vec<Bounds3>, subdivisions: usize) {
        segment_bboxes(start, end, self.max_radius(), self.length, out, subdivisions);
    }

    pub(crate) fn contains(&self, start: &Point3, end: &Point3, p: &Point3) -> bool {
        // Horizontal moves keep the height above the tip fixed
        if (end.z - start.z).abs() < 1e-12 {
            let Some(radius) = self.radius_at_height(p.z - start.z) else {
                return false;
            };
            let flat = |v: &Point3| Point3::new(v.x, v.y, 0.0);
            let (a, b, q) = (flat(start), flat(end), flat(p));
            let c = a + (b - a) * closest_param(&q, &a, &b);
            return (q - c).norm() <= radius;
        }

        let travel = (end - start).norm();
        let step = (self.max_radius() * SAMPLE_FRACTION).max(1e-3);
        let samples = ((travel / step).ceil() as usize).clamp(1, MAX_SAMPLES);

        (0..=samples).any(|i| {
            let c = start + (end - start) * (i as f64 / samples as f64);
            match self.radius_at_height(p.z - c.z) {
                Some(radius) => (p.xy() - c.xy()).norm() <= radius,
                None => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_radius_at_height() {
        let cone = ConicSweep::new(10.0, 5.0, 0.0);
        assert_relative_eq!(cone.radius_at_height(0.0).unwrap(), 0.0);
        assert_relative_eq!(cone.radius_at_height(5.0).unwrap(), 2.5);
        assert_relative_eq!(cone.radius_at_height(10.0).unwrap(), 5.0);
        assert!(cone.radius_at_height(-0.1).is_none());
        assert!(cone.radius_at_height(10.1).is_none());
    }

    #[test]
    fn test_cylinder_contains_horizontal() {
        let cyl = ConicSweep::new(12.0, 3.0, 3.0);
        let a = Point3::origin();
        let b = Point3::new(10.0, 0.0, 0.0);

        assert!(cyl.contains(&a, &b, &Point3::new(5.0, 2.9, 1.0)));
        assert!(cyl.contains(&a, &b, &Point3::new(12.9, 0.0, 11.0)));
        assert!(!cyl.contains(&a, &b, &Point3::new(5.0, 3.1, 1.0)));
        assert!(!cyl.contains(&a, &b, &Point3::new(5.0, 0.0, -0.1)));
        assert!(!cyl.contains(&a, &b, &Point3::new(5.0, 0.0, 12.1)));
    }

    #[test]
    fn test_cone_contains_plunge() {
        let cone = ConicSweep::new(10.0, 5.0, 0.0);
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(0.0, 0.0, -4.0);

        // Tip passes through here
        assert!(cone.contains(&a, &b, &Point3::new(0.0, 0.0, -3.0)));
        // 2mm off axis is inside once the cone is 4mm below
        assert!(cone.contains(&a, &b, &Point3::new(2.0, 0.0, 0.0)));
        assert!(!cone.contains(&a, &b, &Point3::new(4.0, 0.0, -3.0)));
    }

    #[test]
    fn test_snub_bboxes() {
        let snub = ConicSweep::new(8.0, 2.0, 0.5);
        let mut boxes = Vec::new();
        snub.bboxes(&Point3::origin(), &Point3::origin(), &mut boxes, 0);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].min(), Point3::new(-2.0, -2.0, 0.0));
        assert_eq!(boxes[0].max(), Point3::new(2.0, 2.0, 8.0));
    }
}
