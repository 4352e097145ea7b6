//! Mesh buffers: an append-only builder and the sealed surface it produces.

use std::slice::ChunksExact;
use std::sync::Arc;

use millsim_math::{Bounds3, Point3, Vec3};

use crate::reduce::reduce_data;
use crate::{Result, SurfaceError, Task};

/// Number of vertices per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Three vertices per element.
    Triangle,
    /// Four vertices per element.
    Quad,
}

impl ElementKind {
    /// Vertices per element.
    pub fn vertex_count(self) -> usize {
        match self {
            ElementKind::Triangle => 3,
            ElementKind::Quad => 4,
        }
    }

    /// Kind for a vertex count of 3 or 4.
    pub fn from_dim(dim: usize) -> Option<Self> {
        match dim {
            3 => Some(ElementKind::Triangle),
            4 => Some(ElementKind::Quad),
            _ => None,
        }
    }
}

/// Flat vertex and normal buffers shared by [`SurfaceBuilder`] and [`Surface`].
///
/// Both buffers hold `x, y, z` triples, one per vertex, so their lengths are
/// always equal and a multiple of `dim * 3`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SurfaceData {
    pub(crate) kind: ElementKind,
    pub(crate) vertices: Vec<f32>,
    pub(crate) normals: Vec<f32>,
    pub(crate) bounds: Bounds3,
}

impl SurfaceData {
    pub(crate) fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            vertices: Vec::new(),
            normals: Vec::new(),
            bounds: Bounds3::empty(),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.vertices.len() / (self.kind.vertex_count() * 3)
    }

    pub(crate) fn clear(&mut self) {
        self.vertices.clear();
        self.normals.clear();
        self.bounds = Bounds3::empty();
    }

    /// Append one vertex. Bounds grow by the stored single precision value.
    pub(crate) fn push_vertex(&mut self, p: &Point3, n: &Vec3) {
        let v = [p.x as f32, p.y as f32, p.z as f32];
        self.vertices.extend_from_slice(&v);
        self.normals
            .extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
        self.bounds
            .add_point(&Point3::new(v[0] as f64, v[1] as f64, v[2] as f64));
    }

    fn push_raw(&mut self, vertex: &[f32], normal: &[f32]) {
        self.vertices.extend_from_slice(&vertex[..3]);
        self.normals.extend_from_slice(&normal[..3]);
        self.bounds.add_point(&Point3::new(
            vertex[0] as f64,
            vertex[1] as f64,
            vertex[2] as f64,
        ));
    }
}

/// Read access common to builders and sealed surfaces.
pub trait SurfaceView {
    /// Element kind.
    fn kind(&self) -> ElementKind;

    /// Vertex positions, `x, y, z` per vertex.
    fn vertices(&self) -> &[f32];

    /// Vertex normals, `x, y, z` per vertex. Same length as [`SurfaceView::vertices`].
    fn normals(&self) -> &[f32];

    /// Box containing every vertex. Empty for an empty surface.
    fn bounds(&self) -> Bounds3;

    /// Vertices per element.
    fn dim(&self) -> usize {
        self.kind().vertex_count()
    }

    /// Number of elements.
    fn count(&self) -> usize {
        self.vertices().len() / (self.dim() * 3)
    }

    /// True if there are no elements.
    fn is_empty(&self) -> bool {
        self.vertices().is_empty()
    }

    /// Elements in insertion order.
    fn elements(&self) -> Elements<'_> {
        let stride = self.dim() * 3;
        Elements {
            vertices: self.vertices().chunks_exact(stride),
            normals: self.normals().chunks_exact(stride),
        }
    }
}

/// Iterator over the elements of a surface.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    vertices: ChunksExact<'a, f32>,
    normals: ChunksExact<'a, f32>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(Element {
            vertices: self.vertices.next()?,
            normals: self.normals.next()?,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.vertices.size_hint()
    }
}

impl ExactSizeIterator for Elements<'_> {}

/// One element borrowed from a surface buffer.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    vertices: &'a [f32],
    normals: &'a [f32],
}

impl Element<'_> {
    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len() / 3
    }

    /// True if the element has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex `i`.
    pub fn vertex(&self, i: usize) -> Point3 {
        let v = &self.vertices[i * 3..i * 3 + 3];
        Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)
    }

    /// Normal stored for vertex `i`.
    pub fn normal(&self, i: usize) -> Vec3 {
        let n = &self.normals[i * 3..i * 3 + 3];
        Vec3::new(n[0] as f64, n[1] as f64, n[2] as f64)
    }

    /// Raw `x, y, z` of vertex `i`.
    pub fn raw_vertex(&self, i: usize) -> [f32; 3] {
        [
            self.vertices[i * 3],
            self.vertices[i * 3 + 1],
            self.vertices[i * 3 + 2],
        ]
    }

    /// Raw `x, y, z` of the normal of vertex `i`.
    pub fn raw_normal(&self, i: usize) -> [f32; 3] {
        [
            self.normals[i * 3],
            self.normals[i * 3 + 1],
            self.normals[i * 3 + 2],
        ]
    }
}

/// Normal from the winding of an element's vertices.
///
/// Quads use the cross product of their diagonals. Colinear or repeated
/// vertices give the zero vector.
pub fn winding_normal(vertices: &[Point3]) -> Vec3 {
    let n = match vertices {
        [a, b, c] => (b - a).cross(&(c - a)),
        [a, b, c, d] => (c - a).cross(&(d - b)),
        _ => Vec3::zeros(),
    };
    n.try_normalize(1e-12).unwrap_or_else(Vec3::zeros)
}

/// A mesh under construction.
///
/// Elements are appended with [`SurfaceBuilder::add_element`] or
/// [`SurfaceBuilder::add_element_with_normal`], then the buffer is sealed
/// with [`SurfaceBuilder::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceBuilder {
    data: SurfaceData,
}

impl SurfaceBuilder {
    /// Create an empty builder.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            data: SurfaceData::new(kind),
        }
    }

    /// Empty triangle builder.
    pub fn triangles() -> Self {
        Self::new(ElementKind::Triangle)
    }

    /// Empty quad builder.
    pub fn quads() -> Self {
        Self::new(ElementKind::Quad)
    }

    /// Append an element, deriving its normal from the vertex winding.
    ///
    /// Degenerate elements are stored with a zero normal.
    pub fn add_element(&mut self, vertices: &[Point3]) -> Result<()> {
        self.check_arity(vertices)?;
        let normal = winding_normal(vertices);
        for v in vertices {
            self.data.push_vertex(v, &normal);
        }
        Ok(())
    }

    /// Append an element with a known normal, stored unmodified.
    pub fn add_element_with_normal(&mut self, vertices: &[Point3], normal: &Vec3) -> Result<()> {
        self.check_arity(vertices)?;
        for v in vertices {
            self.data.push_vertex(v, normal);
        }
        Ok(())
    }

    fn check_arity(&self, vertices: &[Point3]) -> Result<()> {
        let expected = self.data.kind.vertex_count();
        if vertices.len() != expected {
            return Err(SurfaceError::Arity {
                expected,
                got: vertices.len(),
            });
        }
        Ok(())
    }

    /// Discard all geometry.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Simplify in place. Returns the number of elements removed.
    pub fn reduce(&mut self, task: Option<&Task>) -> usize {
        reduce_data(&mut self.data, task)
    }

    /// Seal the buffer.
    pub fn finalize(self) -> Surface {
        log::debug!("finalized surface with {} elements", self.data.count());
        Surface {
            data: Arc::new(self.data),
        }
    }

    /// Concatenate surfaces in order into a triangle builder.
    ///
    /// Quads are split into triangles `(0, 1, 2)` and `(0, 2, 3)`, each
    /// vertex keeping its own normal.
    pub fn merge<'a, S>(surfaces: impl IntoIterator<Item = &'a S>) -> Self
    where
        S: SurfaceView + ?Sized + 'a,
    {
        let mut data = SurfaceData::new(ElementKind::Triangle);

        for surface in surfaces {
            match surface.kind() {
                ElementKind::Triangle => {
                    for (v, n) in surface
                        .vertices()
                        .chunks_exact(3)
                        .zip(surface.normals().chunks_exact(3))
                    {
                        data.push_raw(v, n);
                    }
                }
                ElementKind::Quad => {
                    for e in surface.elements() {
                        for i in [0, 1, 2, 0, 2, 3] {
                            data.push_raw(&e.raw_vertex(i), &e.raw_normal(i));
                        }
                    }
                }
            }
        }

        Self { data }
    }
}

impl SurfaceView for SurfaceBuilder {
    fn kind(&self) -> ElementKind {
        self.data.kind
    }

    fn vertices(&self) -> &[f32] {
        &self.data.vertices
    }

    fn normals(&self) -> &[f32] {
        &self.data.normals
    }

    fn bounds(&self) -> Bounds3 {
        self.data.bounds
    }
}

/// A sealed mesh.
///
/// Cloning is cheap and clones share their buffers, so a surface can be
/// handed to other threads for rendering or export. A sealed surface has
/// no append operation:
///
/// ```compile_fail
/// use millsim_math::Point3;
/// use millsim_surface::SurfaceBuilder;
///
/// let surface = SurfaceBuilder::triangles().finalize();
/// surface.add_element(&[Point3::origin(); 3]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    data: Arc<SurfaceData>,
}

impl Surface {
    /// Drop the geometry and return an empty builder of the same kind.
    pub fn clear(self) -> SurfaceBuilder {
        SurfaceBuilder::new(self.data.kind)
    }

    /// Copy the buffers into a new builder.
    pub fn to_builder(&self) -> SurfaceBuilder {
        SurfaceBuilder {
            data: (*self.data).clone(),
        }
    }

    /// Simplify in place. Returns the number of elements removed.
    ///
    /// Other clones keep the geometry they had.
    pub fn reduce(&mut self, task: Option<&Task>) -> usize {
        reduce_data(Arc::make_mut(&mut self.data), task)
    }
}

impl SurfaceView for Surface {
    fn kind(&self) -> ElementKind {
        self.data.kind
    }

    fn vertices(&self) -> &[f32] {
        &self.data.vertices
    }

    fn normals(&self) -> &[f32] {
        &self.data.normals
    }

    fn bounds(&self) -> Bounds3 {
        self.data.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tri(offset: f64) -> [Point3; 3] {
        [
            Point3::new(offset, 0.0, 0.0),
            Point3::new(offset + 1.0, 0.0, 0.0),
            Point3::new(offset, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_counts_and_bounds() {
        let mut builder = SurfaceBuilder::triangles();
        for i in 0..5 {
            builder.add_element(&tri(i as f64 * 2.0)).unwrap();
        }
        let surface = builder.finalize();

        assert_eq!(surface.count(), 5);
        assert_eq!(surface.vertices().len(), 5 * 3 * 3);
        assert_eq!(surface.normals().len(), surface.vertices().len());

        let bounds = surface.bounds();
        assert_relative_eq!(bounds.min().x, 0.0);
        assert_relative_eq!(bounds.max().x, 9.0);
        assert_relative_eq!(bounds.max().y, 1.0);
        assert_relative_eq!(bounds.max().z, 0.0);
    }

    #[test]
    fn test_winding_normal() {
        let mut builder = SurfaceBuilder::triangles();
        builder.add_element(&tri(0.0)).unwrap();
        let e = builder.elements().next().unwrap();
        for i in 0..3 {
            assert_relative_eq!(e.normal(i), Vec3::z(), epsilon = 1e-6);
        }

        let flipped = [tri(0.0)[0], tri(0.0)[2], tri(0.0)[1]];
        assert_relative_eq!(winding_normal(&flipped), -Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_element_has_zero_normal() {
        let mut builder = SurfaceBuilder::triangles();
        let line = [
            Point3::origin(),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        ];
        builder.add_element(&line).unwrap();
        assert_eq!(builder.count(), 1);
        assert!(builder.normals().iter().all(|n| *n == 0.0));
    }

    #[test]
    fn test_explicit_normal_is_kept() {
        let mut builder = SurfaceBuilder::triangles();
        let n = Vec3::new(0.0, 2.0, 0.0);
        builder.add_element_with_normal(&tri(0.0), &n).unwrap();
        assert_eq!(&builder.normals()[..3], &[0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_wrong_arity() {
        let mut builder = SurfaceBuilder::quads();
        let err = builder.add_element(&tri(0.0)).unwrap_err();
        assert!(matches!(err, SurfaceError::Arity { expected: 4, got: 3 }));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_clear_after_finalize_accepts_elements() {
        let mut builder = SurfaceBuilder::triangles();
        builder.add_element(&tri(0.0)).unwrap();
        let surface = builder.finalize();

        let mut builder = surface.clear();
        assert!(builder.is_empty());
        assert!(builder.bounds().is_empty());
        builder.add_element(&tri(3.0)).unwrap();
        assert_eq!(builder.count(), 1);
        assert_relative_eq!(builder.bounds().min().x, 3.0);
    }

    #[test]
    fn test_merge_preserves_order_and_bounds() {
        let mut a = SurfaceBuilder::triangles();
        a.add_element(&tri(0.0)).unwrap();
        a.add_element(&tri(1.0)).unwrap();
        let a = a.finalize();

        let mut b = SurfaceBuilder::triangles();
        b.add_element(&tri(-5.0)).unwrap();
        let b = b.finalize();

        let merged = SurfaceBuilder::merge([&a, &b]);
        assert_eq!(merged.count(), 3);

        let expected: Vec<f32> = a.vertices().iter().chain(b.vertices()).copied().collect();
        assert_eq!(merged.vertices(), expected.as_slice());
        assert_eq!(merged.bounds(), a.bounds().union(&b.bounds()));
    }

    #[test]
    fn test_merge_tessellates_quads() {
        let mut quads = SurfaceBuilder::quads();
        quads
            .add_element(&[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ])
            .unwrap();

        let mut tris = SurfaceBuilder::triangles();
        tris.add_element(&tri(4.0)).unwrap();

        let views: [&dyn SurfaceView; 2] = [&quads, &tris];
        let merged = SurfaceBuilder::merge(views);
        assert_eq!(merged.kind(), ElementKind::Triangle);
        assert_eq!(merged.count(), 3);

        let first: Vec<Point3> = {
            let e = merged.elements().next().unwrap();
            (0..3).map(|i| e.vertex(i)).collect()
        };
        assert_eq!(first[2], Point3::new(1.0, 1.0, 0.0));
        let second = merged.elements().nth(1).unwrap();
        assert_eq!(second.vertex(0), Point3::origin());
        assert_eq!(second.vertex(2), Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(second.normal(1), Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_clones_are_independent_after_reduce() {
        let mut builder = SurfaceBuilder::triangles();
        builder.add_element(&tri(0.0)).unwrap();
        builder
            .add_element(&[Point3::origin(), Point3::origin(), Point3::origin()])
            .unwrap();
        let mut surface = builder.finalize();
        let shared = surface.clone();

        assert_eq!(surface.reduce(None), 1);
        assert_eq!(surface.count(), 1);
        assert_eq!(shared.count(), 2);
    }

    #[test]
    fn test_surface_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Surface>();
        assert_send_sync::<SurfaceBuilder>();
    }
}
