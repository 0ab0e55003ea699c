//! Edge and face extraction from element connectivity.
//!
//! In a conforming triangulation every interior edge is shared by exactly two
//! triangles, so an edge seen exactly once among all element edges is a
//! boundary edge. Counting is done in one pass with a hash map keyed by the
//! canonical [`EdgeKey`]; boundary edges keep the direction they have inside
//! their owning element, so a counter-clockwise mesh yields a
//! counter-clockwise outer boundary.
//!
//! The same scheme extends to tetrahedra through their four triangular
//! faces ([`find_faces`]).

use hashbrown::HashMap;

use crate::algs::sort::SortedBoundary;
use crate::mesh_error::MeshSeamError;
use crate::topology::segment::{EdgeKey, Segment, reverse_path};
use crate::topology::validation::{NonManifold, NonManifoldHandling};

/// Local edges of a triangle, in walking order.
pub const TRIANGLE_EDGES: [(usize, usize); 3] = [(0, 1), (1, 2), (2, 0)];

/// Local faces of a tetrahedron, outward for positively oriented elements.
pub const TETRAHEDRON_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];

/// Result of [`find_edges`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeExtraction {
    /// Every distinct edge, sorted ascending.
    pub all_edges: Vec<EdgeKey>,
    /// Edges used by exactly one element, directed as in that element.
    pub boundary_edges: Vec<Segment>,
    /// Owning element of each entry in `boundary_edges`.
    pub boundary_elements: Vec<usize>,
}

#[derive(Clone, Copy)]
struct Usage {
    count: usize,
}

/// Derives unique edges, boundary edges and their owning elements.
///
/// Boundary edges are reported in element order, then local edge order.
pub fn find_edges(
    elements: &[[usize; 3]],
    handling: NonManifoldHandling,
) -> Result<EdgeExtraction, MeshSeamError> {
    let mut usage: HashMap<EdgeKey, Usage> = HashMap::with_capacity(elements.len() * 2);
    for tri in elements {
        for (a, b) in TRIANGLE_EDGES {
            usage
                .entry(EdgeKey::new(tri[a], tri[b]))
                .or_insert(Usage { count: 0 })
                .count += 1;
        }
    }

    let mut all_edges = Vec::with_capacity(usage.len());
    for (&key, u) in &usage {
        if u.count > 2 {
            handling.report(NonManifold::Edge(key), u.count)?;
        }
        all_edges.push(key);
    }
    all_edges.sort_unstable();

    let mut boundary_edges = Vec::new();
    let mut boundary_elements = Vec::new();
    for (e, tri) in elements.iter().enumerate() {
        for (a, b) in TRIANGLE_EDGES {
            let seg = Segment::new(tri[a], tri[b]);
            if usage[&seg.key()].count == 1 {
                boundary_edges.push(seg);
                boundary_elements.push(e);
            }
        }
    }

    Ok(EdgeExtraction {
        all_edges,
        boundary_edges,
        boundary_elements,
    })
}

/// Canonical triangular face of a tetrahedral mesh.
pub type FaceKey = [usize; 3];

fn face_key(face: [usize; 3]) -> FaceKey {
    let mut key = face;
    key.sort_unstable();
    key
}

/// Result of [`find_faces`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceExtraction {
    /// Every distinct face (sorted vertex triple), sorted ascending.
    pub all_faces: Vec<FaceKey>,
    /// Faces used by exactly one tetrahedron, in that element's outward order.
    pub boundary_faces: Vec<[usize; 3]>,
    /// Owning element of each entry in `boundary_faces`.
    pub boundary_elements: Vec<usize>,
}

/// Tetrahedral counterpart of [`find_edges`].
pub fn find_faces(
    elements: &[[usize; 4]],
    handling: NonManifoldHandling,
) -> Result<FaceExtraction, MeshSeamError> {
    let mut usage: HashMap<FaceKey, usize> = HashMap::with_capacity(elements.len() * 2);
    for tet in elements {
        for local in TETRAHEDRON_FACES {
            *usage
                .entry(face_key(local.map(|i| tet[i])))
                .or_insert(0) += 1;
        }
    }

    let mut all_faces = Vec::with_capacity(usage.len());
    for (&key, &count) in &usage {
        if count > 2 {
            handling.report(NonManifold::Face(key), count)?;
        }
        all_faces.push(key);
    }
    all_faces.sort_unstable();

    let mut boundary_faces = Vec::new();
    let mut boundary_elements = Vec::new();
    for (e, tet) in elements.iter().enumerate() {
        for local in TETRAHEDRON_FACES {
            let face = local.map(|i| tet[i]);
            if usage[&face_key(face)] == 1 {
                boundary_faces.push(face);
                boundary_elements.push(e);
            }
        }
    }

    Ok(FaceExtraction {
        all_faces,
        boundary_faces,
        boundary_elements,
    })
}

/// Canonical edge → incident elements, built once and passed explicitly.
#[derive(Clone, Debug, Default)]
pub struct EdgeMap {
    incident: HashMap<EdgeKey, Vec<usize>>,
}

impl EdgeMap {
    pub fn build(elements: &[[usize; 3]]) -> Self {
        let mut incident: HashMap<EdgeKey, Vec<usize>> =
            HashMap::with_capacity(elements.len() * 2);
        for (e, tri) in elements.iter().enumerate() {
            for (a, b) in TRIANGLE_EDGES {
                incident.entry(EdgeKey::new(tri[a], tri[b])).or_default().push(e);
            }
        }
        Self { incident }
    }

    /// Elements using `edge`, ascending; empty if the edge is unknown.
    pub fn elements_of(&self, edge: EdgeKey) -> &[usize] {
        self.incident.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, edge: EdgeKey) -> bool {
        self.incident.contains_key(&edge)
    }

    /// Number of distinct edges.
    pub fn len(&self) -> usize {
        self.incident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incident.is_empty()
    }
}

/// Whether `tri` walks from `a` directly to `b`.
fn runs_forward(tri: &[usize; 3], a: usize, b: usize) -> bool {
    TRIANGLE_EDGES
        .iter()
        .any(|&(i, j)| tri[i] == a && tri[j] == b)
}

/// The element incident to a boundary `segment`, rotated so that its first two
/// vertices are the segment's nodes in element order and the third vertex is
/// the one off the segment.
pub fn boundary_element(
    elements: &[[usize; 3]],
    edge_map: &EdgeMap,
    segment: Segment,
) -> Option<(usize, [usize; 3])> {
    let e = *edge_map.elements_of(segment.key()).first()?;
    let tri = elements[e];
    let third = tri.iter().position(|&v| !segment.contains(v))?;
    Some((
        e,
        [tri[(third + 1) % 3], tri[(third + 2) % 3], tri[third]],
    ))
}

/// Re-orients each boundary so it runs in the same direction as the element
/// owning its first segment.
///
/// For counter-clockwise elements this makes outer boundaries
/// counter-clockwise and hole boundaries clockwise. Boundaries whose first
/// segment is not an edge of `elements` are kept unchanged.
pub fn check_segment_sense(elements: &[[usize; 3]], sorted: &SortedBoundary) -> SortedBoundary {
    let edge_map = EdgeMap::build(elements);
    let mut segments = Vec::with_capacity(sorted.segments.len());
    for (i, run) in sorted.iter().enumerate() {
        let Some(&first) = run.first() else {
            continue;
        };
        match edge_map.elements_of(first.key()).first() {
            Some(&e) if !runs_forward(&elements[e], first.start, first.end) => {
                segments.extend(reverse_path(run));
            }
            Some(_) => segments.extend_from_slice(run),
            None => {
                log::warn!("boundary {i} does not start on a mesh edge; orientation kept");
                segments.extend_from_slice(run);
            }
        }
    }
    SortedBoundary {
        segments,
        boundary_starts: sorted.boundary_starts.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generation::rectangle_elements;

    #[test]
    fn single_triangle_has_three_boundary_edges() {
        let out = find_edges(&[[0, 1, 2]], NonManifoldHandling::Error).unwrap();
        assert_eq!(out.all_edges.len(), 3);
        assert_eq!(
            out.boundary_edges,
            vec![Segment::new(0, 1), Segment::new(1, 2), Segment::new(2, 0)]
        );
        assert_eq!(out.boundary_elements, vec![0, 0, 0]);
    }

    #[test]
    fn two_by_two_grid_has_eight_boundary_edges() {
        let elements = rectangle_elements(2, 2);
        assert_eq!(elements.len(), 8);
        let out = find_edges(&elements, NonManifoldHandling::Error).unwrap();
        assert_eq!(out.boundary_edges.len(), 8);
        // 9 vertices, 8 triangles: E = V + F - 1 = 16
        assert_eq!(out.all_edges.len(), 16);
        for (seg, &e) in out.boundary_edges.iter().zip(&out.boundary_elements) {
            assert!(elements[e].contains(&seg.start) && elements[e].contains(&seg.end));
        }
    }

    #[test]
    fn non_manifold_edge_policy() {
        let fan = [[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        assert!(find_edges(&fan, NonManifoldHandling::Warn).is_ok());
        assert_eq!(
            find_edges(&fan, NonManifoldHandling::Error).unwrap_err(),
            MeshSeamError::NonManifoldEdge {
                edge: (0, 1),
                elements: 3
            }
        );
    }

    #[test]
    fn two_tets_share_one_face() {
        let tets = [[0, 1, 2, 3], [1, 2, 3, 4]];
        let out = find_faces(&tets, NonManifoldHandling::Error).unwrap();
        assert_eq!(out.all_faces.len(), 7);
        assert_eq!(out.boundary_faces.len(), 6);
        assert!(!out.boundary_faces.iter().any(|f| face_key(*f) == [1, 2, 3]));
    }

    #[test]
    fn non_manifold_face_policy() {
        let tets = [[0, 1, 2, 3], [1, 2, 3, 4], [3, 2, 1, 5]];
        let out = find_faces(&tets, NonManifoldHandling::Warn).unwrap();
        assert!(out.all_faces.contains(&[1, 2, 3]));
        assert!(find_faces(&tets, NonManifoldHandling::Ignore).is_ok());
        assert_eq!(
            find_faces(&tets, NonManifoldHandling::Error).unwrap_err(),
            MeshSeamError::NonManifoldFace {
                face: [1, 2, 3],
                elements: 3
            }
        );
    }

    #[test]
    fn boundary_element_is_rotated_onto_segment() {
        let elements = [[0, 1, 2], [2, 1, 3]];
        let map = EdgeMap::build(&elements);
        let (e, tri) = boundary_element(&elements, &map, Segment::new(3, 1)).unwrap();
        assert_eq!(e, 1);
        assert_eq!(tri, [1, 3, 2]);
        assert!(boundary_element(&elements, &map, Segment::new(0, 3)).is_none());
    }

    #[test]
    fn sense_follows_element_direction() {
        let elements = [[0, 1, 2]];
        let sorted = SortedBoundary {
            segments: vec![Segment::new(0, 2), Segment::new(2, 1), Segment::new(1, 0)],
            boundary_starts: vec![0],
        };
        let fixed = check_segment_sense(&elements, &sorted);
        assert_eq!(
            fixed.segments,
            vec![Segment::new(0, 1), Segment::new(1, 2), Segment::new(2, 0)]
        );
    }
}
