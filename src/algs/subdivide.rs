//! Mesher-free refinement of triangle meshes.
//!
//! [`uniform_refine`] splits every triangle into `factor²` similar triangles,
//! sharing the points placed on each edge between its two neighbours.
//! [`make_second_order`] adds one mid-edge node per distinct edge and
//! [`split_second_order`] turns the resulting six-node triangles back into
//! four linear ones each. [`refine_quadratic_field`] splits them twelve ways
//! instead and carries a nodal field along, evaluating the quadratic
//! interpolant at the inserted points.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::algs::edges::find_edges;
use crate::geometry::quality::signed_area;
use crate::mesh_error::MeshSeamError;
use crate::topology::point::PointSet;
use crate::topology::segment::{EdgeKey, Segment};
use crate::topology::validation::{NonManifoldHandling, validate_elements, validate_segments};

/// Result of [`uniform_refine`].
#[derive(Clone, Debug, PartialEq)]
pub struct UniformRefinement {
    /// Original points followed by the inserted ones.
    pub points: PointSet,
    pub elements: Vec<[usize; 3]>,
    /// Pieces of every original edge, running from `lo` to `hi`.
    pub edge_children: BTreeMap<EdgeKey, Vec<Segment>>,
}

/// Point at `a + t (b - a)`.
fn lerp(a: &[f64], b: &[f64], t: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + t * (y - x)).collect()
}

/// Splits every edge into `factor` pieces and every triangle into
/// `factor * factor` triangles with the parent's orientation.
pub fn uniform_refine(
    points: &PointSet,
    elements: &[[usize; 3]],
    factor: usize,
) -> Result<UniformRefinement, MeshSeamError> {
    if factor == 0 {
        return Err(MeshSeamError::InvalidArgument(
            "refinement factor must be at least 1".into(),
        ));
    }
    validate_elements(elements, points.len(), "uniform refinement")?;

    let mut new_points = points.clone();
    let mut edge_nodes: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    let mut edge_children = BTreeMap::new();
    let mut new_elements = Vec::with_capacity(elements.len() * factor * factor);

    // nodes along a -> b, shared between the two triangles using the edge
    let mut refined_edge = |pts: &mut PointSet, a: usize, b: usize| -> Result<Vec<usize>, MeshSeamError> {
        let key = EdgeKey::new(a, b);
        if !edge_nodes.contains_key(&key) {
            let (lo, hi) = key.as_tuple();
            let (p, q) = (pts.get(lo).to_vec(), pts.get(hi).to_vec());
            let mut nodes = Vec::with_capacity(factor + 1);
            nodes.push(lo);
            for i in 1..factor {
                nodes.push(pts.push(&lerp(&p, &q, i as f64 / factor as f64))?);
            }
            nodes.push(hi);
            edge_children.insert(
                key,
                nodes.windows(2).map(|w| Segment::new(w[0], w[1])).collect(),
            );
            edge_nodes.insert(key, nodes);
        }
        let mut nodes = edge_nodes[&key].clone();
        if a > b {
            nodes.reverse();
        }
        Ok(nodes)
    };

    let n = factor;
    for &[a, b, c] in elements {
        let ab = refined_edge(&mut new_points, a, b)?;
        let bc = refined_edge(&mut new_points, b, c)?;
        let ac = refined_edge(&mut new_points, a, c)?;

        // grid[i][j] is the node at a + i/n (b - a) + j/n (c - a), i + j <= n
        let mut grid: Vec<Vec<usize>> = (0..=n).map(|i| vec![usize::MAX; n + 1 - i]).collect();
        for i in 0..=n {
            grid[i][0] = ab[i];
            grid[0][i] = ac[i];
            grid[n - i][i] = bc[i];
        }
        let (pa, pb, pc) = (
            points.get(a).to_vec(),
            points.get(b).to_vec(),
            points.get(c).to_vec(),
        );
        for i in 1..n {
            for j in 1..n - i {
                let (s, t) = (i as f64 / n as f64, j as f64 / n as f64);
                let p: Vec<f64> = (0..pa.len())
                    .map(|k| pa[k] + s * (pb[k] - pa[k]) + t * (pc[k] - pa[k]))
                    .collect();
                grid[i][j] = new_points.push(&p)?;
            }
        }

        for i in 0..n {
            for j in 0..n - i {
                new_elements.push([grid[i][j], grid[i + 1][j], grid[i][j + 1]]);
                if i + j + 2 <= n {
                    new_elements.push([grid[i + 1][j], grid[i + 1][j + 1], grid[i][j + 1]]);
                }
            }
        }
    }

    Ok(UniformRefinement {
        points: new_points,
        elements: new_elements,
        edge_children,
    })
}

/// Six-node triangle mesh from [`make_second_order`].
#[derive(Clone, Debug, PartialEq)]
pub struct SecondOrderMesh {
    /// Original points followed by one midpoint per distinct edge, in
    /// ascending edge order.
    pub points: PointSet,
    /// `[a, b, c, m_ab, m_bc, m_ca]`.
    pub elements: Vec<[usize; 6]>,
    /// `[start, end, midpoint]` per input boundary segment.
    pub boundary: Vec<[usize; 3]>,
}

/// Adds a mid-edge node to every distinct edge.
///
/// # Errors
/// [`MeshSeamError::InvalidArgument`] if a boundary segment is not an edge of
/// the mesh.
pub fn make_second_order(
    points: &PointSet,
    elements: &[[usize; 3]],
    boundary: &[Segment],
) -> Result<SecondOrderMesh, MeshSeamError> {
    validate_elements(elements, points.len(), "second-order elements")?;
    validate_segments(boundary, points.len(), "second-order boundary")?;
    let edges = find_edges(elements, NonManifoldHandling::Warn)?.all_edges;

    let offset = points.len();
    let mut out = points.clone();
    for key in &edges {
        let (a, b) = key.as_tuple();
        out.push(&lerp(points.get(a), points.get(b), 0.5))?;
    }
    let mid = |a: usize, b: usize| edges.binary_search(&EdgeKey::new(a, b)).map(|i| offset + i);

    let mut second = Vec::with_capacity(elements.len());
    for &[a, b, c] in elements {
        // every element edge is in `edges`
        let (Ok(ab), Ok(bc), Ok(ca)) = (mid(a, b), mid(b, c), mid(c, a)) else {
            continue;
        };
        second.push([a, b, c, ab, bc, ca]);
    }
    let boundary = boundary
        .iter()
        .map(|s| {
            mid(s.start, s.end).map(|m| [s.start, s.end, m]).map_err(|_| {
                MeshSeamError::InvalidArgument(format!("boundary segment {s:?} is not a mesh edge"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SecondOrderMesh {
        points: out,
        elements: second,
        boundary,
    })
}

/// Splits each six-node triangle into four linear triangles of the same
/// orientation.
pub fn split_second_order(elements: &[[usize; 6]]) -> Vec<[usize; 3]> {
    elements
        .iter()
        .flat_map(|&[t0, t1, t2, t3, t4, t5]| {
            [[t0, t3, t5], [t3, t1, t4], [t3, t4, t5], [t4, t2, t5]]
        })
        .collect()
}

/// Result of [`refine_quadratic_field`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldRefinement {
    /// Input points followed by four inserted points per element.
    pub points: PointSet,
    pub elements: Vec<[usize; 3]>,
    /// Field value at every point of `points`.
    pub values: Vec<f64>,
}

/// Quadratic Lagrange basis at barycentric coordinates `l`, in the node
/// order `[a, b, c, ab, bc, ca]`.
fn quadratic_basis(l: [f64; 3]) -> [f64; 6] {
    let [l1, l2, l3] = l;
    [
        (2.0 * l1 - 1.0) * l1,
        (2.0 * l2 - 1.0) * l2,
        (2.0 * l3 - 1.0) * l3,
        4.0 * l1 * l2,
        4.0 * l2 * l3,
        4.0 * l1 * l3,
    ]
}

/// Splits each planar six-node triangle into twelve linear triangles and
/// interpolates `values` onto the inserted points.
///
/// Per element four points are added: the centroids of the three corner
/// sub-triangles and of the middle one. Their values come from the element's
/// quadratic interpolant, so a field that is quadratic over the element is
/// reproduced exactly. Orientation is preserved.
///
/// # Errors
/// * [`MeshSeamError::InvalidArgument`] if `values` does not hold one entry
///   per point.
/// * [`MeshSeamError::InvalidGeometry`] for non-planar points or a degenerate
///   element.
pub fn refine_quadratic_field(
    points: &PointSet,
    elements: &[[usize; 6]],
    values: &[f64],
) -> Result<FieldRefinement, MeshSeamError> {
    validate_elements(elements, points.len(), "quadratic elements")?;
    if values.len() != points.len() {
        return Err(MeshSeamError::InvalidArgument(format!(
            "{} field values for {} points",
            values.len(),
            points.len()
        )));
    }
    if points.dimension() != 2 {
        return Err(MeshSeamError::InvalidGeometry(
            "quadratic field refinement needs planar points".into(),
        ));
    }

    let mut out = points.clone();
    let mut out_values = values.to_vec();
    let mut out_elements = Vec::with_capacity(12 * elements.len());
    for (e, t) in elements.iter().enumerate() {
        let [p1, p2, p3, p4, p5, p6] = t.map(|v| points.xy(v));
        let area = signed_area(p1, p2, p3);
        if area.abs() < 1e-14 {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "element {e} is degenerate"
            )));
        }
        let centroid = |a: [f64; 2], b: [f64; 2], c: [f64; 2]| {
            [(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0]
        };
        let inserted = [
            centroid(p1, p4, p6),
            centroid(p4, p2, p5),
            centroid(p3, p6, p5),
            centroid(p4, p5, p6),
        ];

        let base = out.len();
        for q in inserted {
            let l = [
                signed_area(q, p2, p3) / area,
                signed_area(p1, q, p3) / area,
                signed_area(p1, p2, q) / area,
            ];
            let value: f64 = quadratic_basis(l)
                .iter()
                .zip(t)
                .map(|(n, &v)| n * values[v])
                .sum();
            out.push(&q)?;
            out_values.push(value);
        }

        let [n1, n2, n3, n4, n5, n6] = *t;
        let (q1, q2, q3, q4) = (base, base + 1, base + 2, base + 3);
        out_elements.extend([
            [n1, q1, n6],
            [n1, n4, q1],
            [n4, n6, q1],
            [n4, q2, n5],
            [n4, n2, q2],
            [n2, n5, q2],
            [n5, q3, n6],
            [n5, n3, q3],
            [n3, n6, q3],
            [n5, q4, n4],
            [n5, n6, q4],
            [n6, n4, q4],
        ]);
    }

    Ok(FieldRefinement {
        points: out,
        elements: out_elements,
        values: out_values,
    })
}

/// Splits each `[start, end, midpoint]` boundary entry into two segments.
pub fn split_second_order_boundary(boundary: &[[usize; 3]]) -> Vec<Segment> {
    boundary
        .iter()
        .flat_map(|&[a, b, m]| [Segment::new(a, m), Segment::new(m, b)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::sort::{SegmentOrientation, sort_segments};
    use crate::mesh_generation::rectangle_elements;

    fn unit_square() -> (PointSet, Vec<[usize; 3]>) {
        (
            PointSet::from_2d([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]),
            rectangle_elements(1, 1),
        )
    }

    fn total_area(points: &PointSet, elements: &[[usize; 3]]) -> f64 {
        elements
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|v| points.xy(v));
                let area = signed_area(a, b, c);
                assert!(area > 0.0, "element {t:?} is not counter-clockwise");
                area
            })
            .sum()
    }

    #[test]
    fn factor_two_on_one_triangle() {
        let points = PointSet::from_2d([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let out = uniform_refine(&points, &[[0, 1, 2]], 2).unwrap();
        assert_eq!(out.points.len(), 6);
        assert_eq!(out.elements.len(), 4);
        assert!((total_area(&out.points, &out.elements) - 0.5).abs() < 1e-12);
        assert_eq!(out.edge_children.len(), 3);
        assert_eq!(
            out.edge_children[&EdgeKey::new(0, 1)],
            vec![Segment::new(0, 3), Segment::new(3, 1)]
        );
    }

    #[test]
    fn shared_edges_are_not_duplicated() {
        // rectangle_elements expects row-major vertices: 0 1 / 2 3
        let (points, elements) = unit_square();
        let out = uniform_refine(&points, &elements, 3).unwrap();
        assert_eq!(out.points.len(), 16);
        assert_eq!(out.elements.len(), 18);
        assert!((total_area(&out.points, &out.elements) - 1.0).abs() < 1e-12);
        let boundary = find_edges(&out.elements, NonManifoldHandling::Error)
            .unwrap()
            .boundary_edges;
        assert_eq!(boundary.len(), 12);
    }

    #[test]
    fn factor_one_is_identity() {
        let (points, elements) = unit_square();
        let out = uniform_refine(&points, &elements, 1).unwrap();
        assert_eq!(out.points, points);
        assert_eq!(out.elements, elements);
        assert!(uniform_refine(&points, &elements, 0).is_err());
    }

    #[test]
    fn second_order_round_trip() {
        let (points, elements) = unit_square();
        let boundary = find_edges(&elements, NonManifoldHandling::Error)
            .unwrap()
            .boundary_edges;
        let second = make_second_order(&points, &elements, &boundary).unwrap();
        assert_eq!(second.points.len(), 4 + 5);
        // edges sorted: (0,1) (0,2) (0,3) (1,3) (2,3)
        assert_eq!(second.elements[0], [0, 1, 3, 4, 7, 6]);
        assert_eq!(second.points.xy(6), [0.5, 0.5]);
        assert_eq!(second.boundary[0], [0, 1, 4]);

        let linear = split_second_order(&second.elements);
        assert_eq!(linear.len(), 8);
        assert!((total_area(&second.points, &linear) - 1.0).abs() < 1e-12);

        let split_boundary = split_second_order_boundary(&second.boundary);
        let sorted = sort_segments(&split_boundary, SegmentOrientation::Directed).unwrap();
        assert_eq!(sorted.boundary_count(), 1);
        assert_eq!(sorted.len(), 8);
    }

    #[test]
    fn quadratic_field_is_reproduced_on_twelve_way_split() {
        let f = |p: [f64; 2]| p[0] * p[0] + p[0] * p[1] + p[1];
        let points = PointSet::from_2d([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let second = make_second_order(&points, &[[0, 1, 2]], &[]).unwrap();
        let values: Vec<f64> = (0..second.points.len()).map(|i| f(second.points.xy(i))).collect();

        let out = refine_quadratic_field(&second.points, &second.elements, &values).unwrap();
        assert_eq!(out.points.len(), 10);
        assert_eq!(out.elements.len(), 12);
        assert!((total_area(&out.points, &out.elements) - 0.5).abs() < 1e-12);
        assert_eq!(out.points.xy(9), [1.0 / 3.0, 1.0 / 3.0]);
        for i in 0..out.points.len() {
            assert!((out.values[i] - f(out.points.xy(i))).abs() < 1e-12);
        }
        let edges = find_edges(&out.elements, NonManifoldHandling::Error).unwrap();
        assert_eq!(edges.boundary_edges.len(), 6);
    }

    #[test]
    fn quadratic_field_checks_its_inputs() {
        let points = PointSet::from_2d([[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        let second = make_second_order(&points, &[[0, 1, 2]], &[]).unwrap();
        let values = vec![0.0; second.points.len()];
        assert!(matches!(
            refine_quadratic_field(&second.points, &second.elements, &values[1..]),
            Err(MeshSeamError::InvalidArgument(_))
        ));
        assert!(matches!(
            refine_quadratic_field(&second.points, &second.elements, &values),
            Err(MeshSeamError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn foreign_boundary_segment_is_rejected() {
        let (points, elements) = unit_square();
        assert!(matches!(
            make_second_order(&points, &elements, &[Segment::new(1, 2)]),
            Err(MeshSeamError::InvalidArgument(_))
        ));
    }
}
