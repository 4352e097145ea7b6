//! Ellipsoids of revolution.

use millsim_math::{Bounds3, Point3};

use crate::{closest_param, segment_bboxes};

/// A spheroid `length` tall and `2 * radius` wide, resting on the tool tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpheroidSweep {
    radius: f64,
    length: f64,
}

impl SpheroidSweep {
    /// Create a spheroid. `length == 2 * radius` gives a sphere.
    pub fn new(radius: f64, length: f64) -> Self {
        Self { radius, length }
    }

    /// Horizontal radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Vertical extent.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub(crate) fn bboxes(&self, start: &Point3, end: &Point3, out: &mut Vec<Bounds3>, subdivisions: usize) {
        segment_bboxes(start, end, self.radius, self.length, out, subdivisions);
    }

    /// Scaling Z by `radius / (length / 2)` turns the spheroid into a sphere
    /// and the swept solid into a capsule.
    pub(crate) fn contains(&self, start: &Point3, end: &Point3, p: &Point3) -> bool {
        if self.radius <= 0.0 || self.length <= 0.0 {
            return false;
        }

        let half = self.length / 2.0;
        let k = self.radius / half;
        let scale = |v: &Point3, lift: f64| Point3::new(v.x, v.y, (v.z + lift) * k);

        let a = scale(start, half);
        let b = scale(end, half);
        let q = scale(p, 0.0);

        let c = a + (b - a) * closest_param(&q, &a, &b);
        (q - c).norm() <= self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_contains() {
        let sphere = SpheroidSweep::new(2.0, 4.0);
        let a = Point3::origin();
        let b = Point3::new(10.0, 0.0, 0.0);

        // Center rides 2mm above the tip
        assert!(sphere.contains(&a, &b, &Point3::new(5.0, 0.0, 2.0)));
        assert!(sphere.contains(&a, &b, &Point3::new(5.0, 1.9, 2.0)));
        assert!(sphere.contains(&a, &b, &Point3::new(-1.9, 0.0, 2.0)));
        assert!(!sphere.contains(&a, &b, &Point3::new(5.0, 0.0, -0.1)));
        assert!(!sphere.contains(&a, &b, &Point3::new(5.0, 0.0, 4.1)));
        assert!(!sphere.contains(&a, &b, &Point3::new(12.1, 0.0, 2.0)));
    }

    #[test]
    fn test_tall_spheroid_contains() {
        let spheroid = SpheroidSweep::new(1.0, 10.0);
        let p = Point3::origin();

        assert!(spheroid.contains(&p, &p, &Point3::new(0.0, 0.0, 9.9)));
        assert!(spheroid.contains(&p, &p, &Point3::new(0.9, 0.0, 5.0)));
        assert!(!spheroid.contains(&p, &p, &Point3::new(0.9, 0.0, 9.0)));
    }

    #[test]
    fn test_degenerate_spheroid_is_empty() {
        let flat = SpheroidSweep::new(1.0, 0.0);
        let p = Point3::origin();
        assert!(!flat.contains(&p, &p, &p));
    }
}
