//! Mesh simplification.
//!
//! Two passes, both of which leave the covered area unchanged:
//!
//! 1. Elements with (near) zero area are dropped.
//! 2. Triangle pairs `(a, m, c)` and `(c, m, b)` where `m` lies on the
//!    segment `a..b` and both carry the same normal are replaced by
//!    `(a, b, c)`. This undoes the T-splits left behind when a neighbour
//!    was subdivided. The pass repeats until nothing merges.
//!
//! Running reduce on its own output removes nothing.

use std::collections::HashMap;

use millsim_math::{Point3, Vec3};

use crate::surface::{ElementKind, SurfaceData};
use crate::task::{is_cancelled, report};
use crate::Task;

/// Twice the area below which an element is degenerate, in mm^2.
const AREA_EPSILON: f64 = 1e-10;

/// Distance from a line below which a vertex is on it, in mm.
const LINE_EPSILON: f64 = 1e-5;

/// Largest difference between normals that still counts as equal.
const NORMAL_EPSILON: f64 = 1e-5;

/// Vertices are matched after snapping to this many steps per mm.
const KEY_SCALE: f64 = 1e5;

type Key = [i64; 3];

fn key(p: &Point3) -> Key {
    [
        (p.x * KEY_SCALE).round() as i64,
        (p.y * KEY_SCALE).round() as i64,
        (p.z * KEY_SCALE).round() as i64,
    ]
}

#[derive(Debug, Clone, Copy)]
struct Facet {
    points: [Point3; 4],
    normals: [Vec3; 4],
}

impl Facet {
    fn twice_area(&self, kind: ElementKind) -> f64 {
        let p = &self.points;
        match kind {
            ElementKind::Triangle => (p[1] - p[0]).cross(&(p[2] - p[0])).norm(),
            ElementKind::Quad => (p[2] - p[0]).cross(&(p[3] - p[1])).norm(),
        }
    }
}

fn unpack(data: &SurfaceData) -> Vec<Option<Facet>> {
    let dim = data.kind.vertex_count();
    let stride = dim * 3;

    data.vertices
        .chunks_exact(stride)
        .zip(data.normals.chunks_exact(stride))
        .map(|(v, n)| {
            let mut facet = Facet {
                points: [Point3::origin(); 4],
                normals: [Vec3::zeros(); 4],
            };
            for i in 0..dim {
                let j = i * 3;
                facet.points[i] = Point3::new(v[j] as f64, v[j + 1] as f64, v[j + 2] as f64);
                facet.normals[i] = Vec3::new(n[j] as f64, n[j + 1] as f64, n[j + 2] as f64);
            }
            Some(facet)
        })
        .collect()
}

fn repack(data: &mut SurfaceData, facets: &[Option<Facet>]) {
    let dim = data.kind.vertex_count();
    data.clear();
    for facet in facets.iter().flatten() {
        for i in 0..dim {
            data.push_vertex(&facet.points[i], &facet.normals[i]);
        }
    }
}

/// True if `m` lies strictly inside segment `a..b`.
fn splits(a: &Point3, m: &Point3, b: &Point3) -> bool {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= LINE_EPSILON * LINE_EPSILON {
        return false;
    }

    let am = m - a;
    let t = am.dot(&ab) / len2;
    let margin = LINE_EPSILON / len2.sqrt();
    if t <= margin || t >= 1.0 - margin {
        return false;
    }

    (am - ab * t).norm() <= LINE_EPSILON
}

fn same_normal(a: &Vec3, b: &Vec3) -> bool {
    (a - b).norm() <= NORMAL_EPSILON
}

/// Drop degenerate facets. Returns false if cancelled.
fn remove_degenerate(facets: &mut [Option<Facet>], kind: ElementKind, task: Option<&Task>) -> bool {
    let total = facets.len();
    for (i, slot) in facets.iter_mut().enumerate() {
        if is_cancelled(task) {
            return false;
        }
        if slot.is_some_and(|f| f.twice_area(kind) <= AREA_EPSILON) {
            *slot = None;
        }
        report(task, i + 1, total);
    }
    true
}

/// One pass of T-split merging. Each facet takes part in at most one merge
/// per pass so the edge index stays valid.
fn merge_pass(facets: &mut [Option<Facet>], task: Option<&Task>) -> (usize, bool) {
    let mut edges: HashMap<(Key, Key), usize> = HashMap::new();
    for (i, facet) in facets.iter().enumerate() {
        if let Some(f) = facet {
            for k in 0..3 {
                let edge = (key(&f.points[k]), key(&f.points[(k + 1) % 3]));
                edges.entry(edge).or_insert(i);
            }
        }
    }

    let total = facets.len();
    let mut touched = vec![false; total];
    let mut merged = 0;

    for i in 0..total {
        if is_cancelled(task) {
            return (merged, false);
        }
        report(task, i + 1, total);

        let Some(t1) = facets[i] else { continue };
        if touched[i] {
            continue;
        }

        for k in 0..3 {
            let (ia, im, ic) = (k, (k + 1) % 3, (k + 2) % 3);
            let (a, m, c) = (t1.points[ia], t1.points[im], t1.points[ic]);
            let (kc, km) = (key(&c), key(&m));

            let Some(&j) = edges.get(&(kc, km)) else { continue };
            if j == i || touched[j] {
                continue;
            }
            let Some(t2) = facets[j] else { continue };

            let Some(s) = (0..3).find(|&s| {
                key(&t2.points[s]) == kc && key(&t2.points[(s + 1) % 3]) == km
            }) else {
                continue;
            };
            let ib = (s + 2) % 3;
            let b = t2.points[ib];

            if !splits(&a, &m, &b) || !same_normal(&t1.normals[0], &t2.normals[0]) {
                continue;
            }

            facets[i] = Some(Facet {
                points: [a, b, c, Point3::origin()],
                normals: [t1.normals[ia], t2.normals[ib], t1.normals[ic], Vec3::zeros()],
            });
            facets[j] = None;
            touched[i] = true;
            touched[j] = true;
            merged += 1;
            break;
        }
    }

    (merged, true)
}

/// Simplify `data` in place, returning the number of elements removed.
///
/// On cancellation the buffers hold whatever was reduced so far.
pub(crate) fn reduce_data(data: &mut SurfaceData, task: Option<&Task>) -> usize {
    let before = data.count();
    if let Some(task) = task {
        task.update(0.0, "Reducing mesh");
    }

    let mut facets = unpack(data);
    let mut finished = remove_degenerate(&mut facets, data.kind, task);

    if finished && data.kind == ElementKind::Triangle {
        loop {
            let (merged, completed) = merge_pass(&mut facets, task);
            finished = completed;
            if merged == 0 || !completed {
                break;
            }
        }
    }

    repack(data, &facets);

    let removed = before - data.count();
    if finished {
        log::debug!("reduced surface from {} to {} elements", before, data.count());
    } else {
        log::info!("mesh reduce cancelled after removing {} elements", removed);
    }
    removed
}
