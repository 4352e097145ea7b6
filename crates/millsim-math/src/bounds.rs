//! Axis-aligned bounding cuboids.

use crate::{Point3, Vec3};

/// An axis-aligned box given by its minimum and maximum corners.
///
/// [`Bounds3::empty`] is inverted (min = +inf, max = -inf) so that adding
/// any point or box to it yields exactly that point or box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    min: Point3,
    max: Point3,
}

impl Bounds3 {
    /// The empty box, identity for [`Bounds3::union`].
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Create a box from two corners. The corners are taken as given.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Zero-sized box at the origin.
    pub fn zero() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }

    /// Smallest box containing every point.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.add_point(p);
        }
        b
    }

    /// Minimum corner.
    pub fn min(&self) -> Point3 {
        self.min
    }

    /// Maximum corner.
    pub fn max(&self) -> Point3 {
        self.max
    }

    /// Grow to include a point.
    pub fn add_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow to include another box. Adding an empty box is a no-op.
    pub fn add_bounds(&mut self, other: &Bounds3) {
        if other.is_empty() {
            return;
        }
        self.add_point(&other.min);
        self.add_point(&other.max);
    }

    /// Union of two boxes.
    pub fn union(mut self, other: &Bounds3) -> Self {
        self.add_bounds(other);
        self
    }

    /// True if no point has been added (any axis inverted).
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True if every coordinate of both corners is finite.
    pub fn is_real(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }

    /// Extents along each axis; zero for an empty box.
    pub fn dimensions(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        self.max - self.min
    }

    /// Extent along X.
    pub fn width(&self) -> f64 {
        self.dimensions().x
    }

    /// Extent along Y.
    pub fn depth(&self) -> f64 {
        self.dimensions().y
    }

    /// Extent along Z.
    pub fn height(&self) -> f64 {
        self.dimensions().z
    }

    /// Volume; zero for empty or flat boxes.
    pub fn volume(&self) -> f64 {
        let d = self.dimensions();
        d.x * d.y * d.z
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// True if `p` lies inside or on the boundary.
    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains_bounds(&self, other: &Bounds3) -> bool {
        other.is_empty() || (self.contains(&other.min) && self.contains(&other.max))
    }

    /// True if the boxes overlap (touching counts).
    pub fn intersects(&self, other: &Bounds3) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::empty()
    }
}
