//! Mesh stitching: merge two triangulations along a shared boundary.
//!
//! Boundary nodes of the second mesh that coincide with boundary nodes of the
//! first (within `epsilon`) are identified with them; the second mesh's copy is
//! removed and every reference renumbered. The stitched boundary is the
//! symmetric difference of the two boundaries: an edge present on both sides
//! after renumbering has become interior and is dropped.
//!
//! Pairing is closest-match with smallest-index tie-break, and each node of
//! the second mesh is claimed at most once, so the result does not depend on
//! boundary listing order.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::algs::closest::ClosestNodeIndex;
use crate::algs::edges::check_segment_sense;
use crate::algs::sort::{SegmentOrientation, SortedBoundary, sort_segments};
use crate::mesh_error::MeshSeamError;
use crate::topology::mesh::TriMesh;
use crate::topology::segment::{EdgeKey, Segment};
use crate::topology::validation::validate_segments;

/// One input of [`connect_mesh`].
#[derive(Clone, Copy, Debug)]
pub struct MeshPart<'a> {
    pub mesh: &'a TriMesh,
    pub boundary: &'a [Segment],
}

impl<'a> MeshPart<'a> {
    pub fn new(mesh: &'a TriMesh, boundary: &'a [Segment]) -> Self {
        Self { mesh, boundary }
    }

    /// Distinct boundary nodes, ascending.
    fn boundary_nodes(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = self
            .boundary
            .iter()
            .flat_map(|s| [s.start, s.end])
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }
}

/// Stitching configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchOptions {
    /// Coincidence tolerance; nodes closer than this are identified.
    pub epsilon: f64,
    /// Orient the stitched boundary along its owning elements.
    pub orient_boundary: bool,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-8,
            orient_boundary: false,
        }
    }
}

/// Result of [`connect_mesh`].
#[derive(Clone, Debug)]
pub struct StitchedMesh {
    pub mesh: TriMesh,
    pub boundary: SortedBoundary,
    /// `(first-mesh node, second-mesh node)` pairs that were unified.
    pub identified: Vec<(usize, usize)>,
}

/// Merges `second` into `first` along their coincident boundary nodes.
///
/// Points of `first` keep their indices. Unmatched points of `second` follow
/// in their original order.
///
/// # Errors
/// * [`MeshSeamError::InvalidIndex`] if an element or a boundary references a
///   missing point.
/// * [`MeshSeamError::InvalidGeometry`] if the point dimensions differ.
/// * [`MeshSeamError::Topology`] if the stitched boundary does not decompose
///   into simple paths and cycles.
pub fn connect_mesh(
    first: MeshPart<'_>,
    second: MeshPart<'_>,
    options: &StitchOptions,
) -> Result<StitchedMesh, MeshSeamError> {
    let (m1, m2) = (first.mesh, second.mesh);
    m1.validate()?;
    m2.validate()?;
    validate_segments(first.boundary, m1.point_count(), "first boundary")?;
    validate_segments(second.boundary, m2.point_count(), "second boundary")?;
    if options.epsilon.is_nan() || options.epsilon < 0.0 {
        return Err(MeshSeamError::InvalidArgument(format!(
            "stitch tolerance must be non-negative, got {}",
            options.epsilon
        )));
    }

    // 1. pair coincident boundary nodes
    let index = ClosestNodeIndex::build(&m2.points, &second.boundary_nodes())?;
    let mut claimed = vec![false; m2.point_count()];
    let mut identified = Vec::new();
    for n1 in first.boundary_nodes() {
        let hit = index.nearest_unclaimed(&m1.points.xyz(n1), options.epsilon, |n| claimed[n]);
        if let Some(n2) = hit {
            claimed[n2] = true;
            identified.push((n1, n2));
        }
    }

    // 2. renumber the second mesh
    let offset = m1.point_count();
    let mut table = vec![0usize; m2.point_count()];
    let mut next = offset;
    for (i, slot) in table.iter_mut().enumerate() {
        if !claimed[i] {
            *slot = next;
            next += 1;
        }
    }
    for &(n1, n2) in &identified {
        table[n2] = n1;
    }

    // 3. concatenate points and elements
    let mut points = m1.points.clone();
    points.extend_from(&m2.points.retain_indices(|i| !claimed[i]))?;
    let mut elements = m1.elements.clone();
    elements.extend(m2.elements.iter().map(|t| t.map(|v| table[v])));
    let mesh = TriMesh::new(points, elements)?;

    // 4. rebuild the boundary
    let renumbered: Vec<Segment> = second.boundary.iter().map(|s| s.map(|v| table[v])).collect();
    let merged = merge_boundaries(first.boundary, &renumbered);
    validate_segments(&merged, mesh.point_count(), "stitched boundary")?;

    let mut boundary = sort_segments(&merged, SegmentOrientation::Undirected)?;
    if options.orient_boundary {
        boundary = check_segment_sense(&mesh.elements, &boundary);
    }

    log::debug!(
        "identical nodes found: {} ({} boundary segments in {} boundaries)",
        identified.len(),
        boundary.len(),
        boundary.boundary_count()
    );

    Ok(StitchedMesh {
        mesh,
        boundary,
        identified,
    })
}

/// Symmetric difference of two boundaries over undirected edge keys.
///
/// Only an edge listed on both sides becomes interior. An edge whose two
/// endpoints were both identified but which has no counterpart in the other
/// boundary is kept.
fn merge_boundaries(first: &[Segment], second: &[Segment]) -> Vec<Segment> {
    let keys1: HashSet<EdgeKey> = first.iter().map(|s| s.key()).collect();
    let keys2: HashSet<EdgeKey> = second.iter().map(|s| s.key()).collect();
    first
        .iter()
        .filter(|s| !keys2.contains(&s.key()))
        .chain(second.iter().filter(|s| !keys1.contains(&s.key())))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generation::{RectangleMeshOptions, rectangle_mesh};

    fn square(x0: f64, n: usize) -> crate::mesh_generation::GeneratedMesh {
        rectangle_mesh(&RectangleMeshOptions {
            nx: n,
            ny: n,
            min: [x0, 0.0],
            max: [x0 + 1.0, 1.0],
        })
        .unwrap()
    }

    #[test]
    fn squares_sharing_a_side() {
        let left = square(0.0, 3);
        let right = square(1.0, 3);
        let out = connect_mesh(
            MeshPart::new(&left.mesh, &left.boundary),
            MeshPart::new(&right.mesh, &right.boundary),
            &StitchOptions::default(),
        )
        .unwrap();

        assert_eq!(out.identified.len(), 4);
        assert_eq!(out.mesh.point_count(), 16 + 16 - 4);
        assert_eq!(out.mesh.element_count(), 18 + 18);
        assert_eq!(out.boundary.boundary_count(), 1);
        assert!(out.boundary.is_closed(0));
        assert_eq!(out.boundary.len(), 18);

        let nodes = out.boundary.node_sequence(0);
        for (i, &a) in nodes.iter().enumerate() {
            for &b in &nodes[i + 1..] {
                assert!(out.mesh.points.distance_squared(a, b) >= 1e-16);
            }
        }
    }

    #[test]
    fn identified_nodes_map_to_first_mesh() {
        let left = square(0.0, 1);
        let right = square(1.0, 1);
        let out = connect_mesh(
            MeshPart::new(&left.mesh, &left.boundary),
            MeshPart::new(&right.mesh, &right.boundary),
            &StitchOptions::default(),
        )
        .unwrap();
        // left corners 1 and 3 coincide with right corners 0 and 2
        assert_eq!(out.identified, vec![(1, 0), (3, 2)]);
        assert_eq!(out.mesh.elements[2], [1, 4, 5]);
        assert_eq!(out.mesh.point_count(), 6);
    }

    #[test]
    fn disjoint_meshes_keep_both_boundaries() {
        let left = square(0.0, 1);
        let far = square(5.0, 1);
        let out = connect_mesh(
            MeshPart::new(&left.mesh, &left.boundary),
            MeshPart::new(&far.mesh, &far.boundary),
            &StitchOptions::default(),
        )
        .unwrap();
        assert!(out.identified.is_empty());
        assert_eq!(out.mesh.point_count(), 8);
        assert_eq!(out.boundary.boundary_count(), 2);
    }

    #[test]
    fn orientation_follows_elements() {
        let left = square(0.0, 2);
        let right = square(1.0, 2);
        let out = connect_mesh(
            MeshPart::new(&left.mesh, &left.boundary),
            MeshPart::new(&right.mesh, &right.boundary),
            &StitchOptions {
                orient_boundary: true,
                ..Default::default()
            },
        )
        .unwrap();
        let run = out.boundary.boundary(0);
        let mut twice_area = 0.0;
        for s in run {
            let [x0, y0] = out.mesh.points.xy(s.start);
            let [x1, y1] = out.mesh.points.xy(s.end);
            twice_area += x0 * y1 - x1 * y0;
        }
        assert!((twice_area - 4.0).abs() < 1e-12);
    }

    #[test]
    fn bad_boundary_index_is_rejected() {
        let left = square(0.0, 1);
        let bogus = [Segment::new(0, 99)];
        assert!(matches!(
            connect_mesh(
                MeshPart::new(&left.mesh, &bogus),
                MeshPart::new(&left.mesh, &left.boundary),
                &StitchOptions::default(),
            ),
            Err(MeshSeamError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn only_edges_on_both_boundaries_become_interior() {
        // nodes 0 and 2 are shared; the second boundary reaches 2 through 5
        let first = [Segment::new(0, 1), Segment::new(1, 2), Segment::new(2, 0)];
        let second = [
            Segment::new(0, 2),
            Segment::new(2, 5),
            Segment::new(5, 0),
            Segment::new(1, 2),
        ];
        let merged = merge_boundaries(&first, &second);
        assert_eq!(
            merged,
            vec![Segment::new(0, 1), Segment::new(2, 5), Segment::new(5, 0)]
        );

        let hanging = [Segment::new(0, 6), Segment::new(6, 2)];
        let kept = merge_boundaries(&first, &hanging);
        assert!(kept.contains(&Segment::new(2, 0)));
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn hand_built_mesh_with_dangling_element_is_rejected() {
        let left = square(0.0, 1);
        let broken = TriMesh {
            points: crate::topology::point::PointSet::from_2d([
                [1.0, 0.0],
                [2.0, 0.0],
                [2.0, 1.0],
                [1.0, 1.0],
            ]),
            elements: vec![[0, 1, 2], [0, 1, 99]],
        };
        let boundary = [
            Segment::new(0, 1),
            Segment::new(1, 2),
            Segment::new(2, 3),
            Segment::new(3, 0),
        ];
        let err = connect_mesh(
            MeshPart::new(&left.mesh, &left.boundary),
            MeshPart::new(&broken, &boundary),
            &StitchOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MeshSeamError::InvalidIndex { index: 99, len: 4, .. }));
    }
}
