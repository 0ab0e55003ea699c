//! Curves running through the interior of a mesh.
//!
//! A curve is described implicitly by a point predicate (for example
//! `|x² + y² - r²| < eps`). Its nodes are the mesh points satisfying the
//! predicate and its segments are the mesh edges joining two such nodes.
//! Triangles lying along the curve can contribute a third edge between curve
//! nodes; at nodes with more than two incident segments, segments whose
//! midpoint fails the predicate are discarded before sorting.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::algs::edges::find_edges;
use crate::algs::sort::{SegmentOrientation, SortedBoundary, sort_segments};
use crate::mesh_error::MeshSeamError;
use crate::topology::point::{PointSet, distance_squared};
use crate::topology::segment::{EdgeKey, Segment, reverse_path};
use crate::topology::validation::{NonManifoldHandling, validate_elements};

/// Result of [`find_curve_segments`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InnerCurves {
    /// Points satisfying the predicate, ascending.
    pub nodes: Vec<usize>,
    pub curves: SortedBoundary,
}

/// Finds the mesh edges lying on the curve described by `on_curve`.
///
/// In 2D, when `inner_points` is non-empty, each curve is oriented so that
/// the inner point closest to it lies on its left.
pub fn find_curve_segments<F>(
    points: &PointSet,
    elements: &[[usize; 3]],
    on_curve: F,
    inner_points: &[[f64; 2]],
) -> Result<InnerCurves, MeshSeamError>
where
    F: Fn(&[f64]) -> bool,
{
    validate_elements(elements, points.len(), "inner curve")?;
    let nodes: Vec<usize> = (0..points.len()).filter(|&i| on_curve(points.get(i))).collect();
    if nodes.is_empty() {
        log::warn!("no mesh nodes satisfy the curve predicate");
        return Ok(InnerCurves::default());
    }
    log::debug!("{} nodes found on inner curve", nodes.len());

    let selected: HashSet<usize> = nodes.iter().copied().collect();
    let mut segments: Vec<EdgeKey> = find_edges(elements, NonManifoldHandling::Ignore)?
        .all_edges
        .into_iter()
        .filter(|k| selected.contains(&k.lo()) && selected.contains(&k.hi()))
        .collect();

    let mut degree = vec![0usize; points.len()];
    for k in &segments {
        degree[k.lo()] += 1;
        degree[k.hi()] += 1;
    }
    for &node in &nodes {
        if degree[node] <= 2 {
            continue;
        }
        segments.retain(|k| {
            if k.lo() != node && k.hi() != node {
                return true;
            }
            let mid: Vec<f64> = points
                .get(k.lo())
                .iter()
                .zip(points.get(k.hi()))
                .map(|(a, b)| 0.5 * (a + b))
                .collect();
            if on_curve(&mid) {
                return true;
            }
            degree[k.lo()] -= 1;
            degree[k.hi()] -= 1;
            false
        });
    }

    let segments: Vec<Segment> = segments.iter().map(|k| k.as_segment()).collect();
    let mut curves = sort_segments(&segments, SegmentOrientation::Undirected)?;
    if curves.boundary_count() > 1 {
        log::debug!("{} different curves found", curves.boundary_count());
    }

    if points.dimension() == 2 && !inner_points.is_empty() {
        orient_around(points, &mut curves, inner_points);
    }
    Ok(InnerCurves { nodes, curves })
}

/// Reverses every curve that has its closest inner point on the right.
fn orient_around(points: &PointSet, curves: &mut SortedBoundary, inner_points: &[[f64; 2]]) {
    for range in curves.ranges().collect_vec() {
        let run = &curves.segments[range.clone()];
        // closest (segment, inner point) pair over segment start nodes
        let Some((seg, inner)) = run
            .iter()
            .cartesian_product(inner_points)
            .min_by(|(s1, p1), (s2, p2)| {
                let d1 = distance_squared(&points.xyz(s1.start), &[p1[0], p1[1], 0.0]);
                let d2 = distance_squared(&points.xyz(s2.start), &[p2[0], p2[1], 0.0]);
                d1.total_cmp(&d2)
            })
        else {
            continue;
        };
        let [x1, y1] = points.xy(seg.start);
        let [x2, y2] = points.xy(seg.end);
        let (dx, dy) = ([x2 - x1, y2 - y1], [inner[0] - x1, inner[1] - y1]);
        if dx[0] * dy[1] - dx[1] * dy[0] < 0.0 {
            let flipped = reverse_path(run);
            curves.segments[range].copy_from_slice(&flipped);
            log::debug!("changed curve direction around {inner:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generation::{RectangleMeshOptions, rectangle_mesh};
    use crate::topology::mesh::TriMesh;

    const EPS: f64 = 1e-9;

    fn grid() -> TriMesh {
        rectangle_mesh(&RectangleMeshOptions {
            nx: 4,
            ny: 4,
            ..Default::default()
        })
        .unwrap()
        .mesh
    }

    fn near(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn straight_line_through_the_mesh() {
        let mesh = grid();
        let out = find_curve_segments(&mesh.points, &mesh.elements, |p| near(p[0], 0.5), &[]).unwrap();
        assert_eq!(out.nodes, vec![2, 7, 12, 17, 22]);
        assert_eq!(out.curves.boundary_count(), 1);
        assert_eq!(out.curves.len(), 4);
        assert!(!out.curves.is_closed(0));
    }

    #[test]
    fn off_curve_chords_are_pruned() {
        let mesh = grid();
        let on_curve = |p: &[f64]| {
            (near(p[1], 0.0) && p[0] <= 0.5 + EPS) || (near(p[0], 0.25) && near(p[1], 0.25))
        };
        let out = find_curve_segments(&mesh.points, &mesh.elements, on_curve, &[]).unwrap();
        assert_eq!(out.nodes, vec![0, 1, 2, 6]);
        assert_eq!(out.curves.len(), 3);
        assert!(out.curves.segments.iter().all(|s| s.key() != EdgeKey::new(1, 6)));
    }

    #[test]
    fn closed_curve_is_oriented_around_inner_point() {
        let mesh = grid();
        let on_ring = |p: &[f64]| {
            let inside = |v: f64| v > 0.25 - EPS && v < 0.75 + EPS;
            inside(p[0])
                && inside(p[1])
                && [p[0], p[1]].iter().any(|&v| near(v, 0.25) || near(v, 0.75))
        };
        let out = find_curve_segments(&mesh.points, &mesh.elements, on_ring, &[[0.5, 0.5]]).unwrap();
        assert_eq!(out.nodes.len(), 8);
        assert_eq!(out.curves.len(), 8);
        assert!(out.curves.is_closed(0));

        let twice_area: f64 = out
            .curves
            .segments
            .iter()
            .map(|s| {
                let [x0, y0] = mesh.points.xy(s.start);
                let [x1, y1] = mesh.points.xy(s.end);
                x0 * y1 - x1 * y0
            })
            .sum();
        assert!((twice_area - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_selection_yields_nothing() {
        let mesh = grid();
        let out = find_curve_segments(&mesh.points, &mesh.elements, |_| false, &[]).unwrap();
        assert!(out.nodes.is_empty());
        assert!(out.curves.is_empty());
    }
}
