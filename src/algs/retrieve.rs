//! Boundary retrieval: anchor-driven rotation and sub-curve extraction.
//!
//! Anchors are arbitrary coordinates. Each one is matched to the nearest
//! boundary node, with no tolerance, so an anchor lying off the boundary
//! silently resolves to the closest node. Geometry handed in by callers often
//! carries numerical slop and this permissive matching is the contract; use
//! [`ClosestNodeIndex`](crate::algs::closest::ClosestNodeIndex) with a
//! [`DistanceConstraint`](crate::algs::closest::DistanceConstraint) directly
//! when an exact match has to be enforced.

use serde::{Deserialize, Serialize};

use crate::algs::closest::ClosestNodeIndex;
use crate::algs::edges::find_edges;
use crate::algs::sort::{SegmentOrientation, SortedBoundary, sort_segments};
use crate::mesh_error::MeshSeamError;
use crate::topology::point::{PointSet, distance_squared, pad};
use crate::topology::segment::{Segment, reverse_path};
use crate::topology::validation::{NonManifoldHandling, validate_segments};

/// A sorted boundary after anchor rotation.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectedBoundary {
    pub boundary: SortedBoundary,
    /// Boundary node matched by each anchor.
    pub anchor_nodes: Vec<usize>,
    /// Boundary containing the last anchor's node, `None` without anchors.
    pub last_anchor_boundary: Option<usize>,
}

/// Rotates closed boundaries so each starts at the node nearest an anchor.
///
/// A boundary is rotated at most once, by the first anchor that lands on it.
/// Boundaries without anchors keep their order. Open boundaries are never
/// rotated since their endpoints are fixed.
pub fn connect_boundary(
    points: &PointSet,
    sorted: &SortedBoundary,
    anchors: &PointSet,
) -> Result<ConnectedBoundary, MeshSeamError> {
    validate_segments(&sorted.segments, points.len(), "boundary")?;
    let mut nodes: Vec<usize> = sorted
        .segments
        .iter()
        .flat_map(|s| [s.start, s.end])
        .collect();
    nodes.sort_unstable();
    nodes.dedup();
    let index = ClosestNodeIndex::build(points, &nodes)?;

    let mut segments = sorted.segments.clone();
    let mut rotated = vec![false; sorted.boundary_count()];
    let mut anchor_nodes = Vec::with_capacity(anchors.len());
    let mut last_anchor_boundary = None;

    for a in 0..anchors.len() {
        let Some(node) = index.nearest(&anchors.xyz(a)).node else {
            continue;
        };
        anchor_nodes.push(node);
        // the terminal node of an open path only appears as an end
        let Some(pos) = segments
            .iter()
            .position(|s| s.start == node)
            .or_else(|| segments.iter().position(|s| s.end == node))
        else {
            continue;
        };
        let Some(b) = sorted.boundary_of(pos) else {
            continue;
        };
        last_anchor_boundary = Some(b);
        if rotated[b] {
            continue;
        }
        rotated[b] = true;
        if !sorted.is_closed(b) {
            log::warn!("anchor {a} lies on open boundary {b}; boundary order kept");
            continue;
        }
        let range = sorted.range(b);
        segments[range.clone()].rotate_left(pos - range.start);
    }

    Ok(ConnectedBoundary {
        boundary: SortedBoundary {
            segments,
            boundary_starts: sorted.boundary_starts.clone(),
        },
        anchor_nodes,
        last_anchor_boundary,
    })
}

/// Representation requested for an extracted sub-curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathKind {
    /// Node indices along the path, including both ends of an open path.
    Nodes,
    #[default]
    Segments,
}

/// A path between two consecutive anchors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubCurve {
    Nodes(Vec<usize>),
    Segments(Vec<Segment>),
}

impl SubCurve {
    pub fn len(&self) -> usize {
        match self {
            SubCurve::Nodes(n) => n.len(),
            SubCurve::Segments(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the path between two anchor nodes was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathLookup {
    /// Walking forward from the first node reaches the second.
    Forward {
        boundary: usize,
        first: usize,
        last: usize,
    },
    /// The path exists only in the opposite walking direction.
    Reversed {
        boundary: usize,
        first: usize,
        last: usize,
    },
    /// The nodes are not joined along a single boundary.
    Disjoint,
}

/// Locates the segment range joining node `from` to node `to`.
///
/// `first` is the position of the segment leaving the path's first node and
/// `last` the position of the segment entering its final node. A range with
/// `first > last` wraps around the end of its boundary, which only a closed
/// boundary allows.
pub fn lookup_path(sorted: &SortedBoundary, from: usize, to: usize) -> PathLookup {
    let segments = &sorted.segments;
    let joined = |start: usize, end: usize| -> Option<(usize, usize, usize)> {
        let first = segments.iter().position(|s| s.start == start)?;
        let last = segments.iter().position(|s| s.end == end)?;
        let boundary = sorted.boundary_of(first)?;
        if sorted.boundary_of(last)? != boundary {
            return None;
        }
        (first <= last || sorted.is_closed(boundary)).then_some((boundary, first, last))
    };
    if let Some((boundary, first, last)) = joined(from, to) {
        return PathLookup::Forward {
            boundary,
            first,
            last,
        };
    }
    if let Some((boundary, first, last)) = joined(to, from) {
        return PathLookup::Reversed {
            boundary,
            first,
            last,
        };
    }
    PathLookup::Disjoint
}

/// Extracts the boundary path between each pair of consecutive anchors.
///
/// `kinds[j]` selects the representation of the `j`-th extracted path. Pairs
/// whose nodes are not joined along one boundary are skipped and do not
/// consume an entry of `kinds`. Two equal consecutive anchors on a closed boundary yield
/// the whole loop.
///
/// # Errors
/// [`MeshSeamError::InvalidArgument`] if more paths are found than `kinds`
/// has entries.
pub fn retrieve_segments(
    points: &PointSet,
    sorted: &SortedBoundary,
    anchors: &PointSet,
    kinds: &[PathKind],
) -> Result<Vec<SubCurve>, MeshSeamError> {
    validate_segments(&sorted.segments, points.len(), "boundary")?;
    let mut nodes: Vec<usize> = sorted
        .segments
        .iter()
        .flat_map(|s| [s.start, s.end])
        .collect();
    nodes.sort_unstable();
    nodes.dedup();
    let index = ClosestNodeIndex::build(points, &nodes)?;
    let matched: Vec<Option<usize>> = (0..anchors.len())
        .map(|a| index.nearest(&anchors.xyz(a)).node)
        .collect();

    let segments = &sorted.segments;
    let mut out = Vec::new();
    for k in 0..matched.len().saturating_sub(1) {
        let (Some(from), Some(to)) = (matched[k], matched[k + 1]) else {
            continue;
        };
        let (b, first, last, reversed) = match lookup_path(sorted, from, to) {
            PathLookup::Forward {
                boundary,
                first,
                last,
            } => (boundary, first, last, false),
            PathLookup::Reversed {
                boundary,
                first,
                last,
            } => (boundary, first, last, true),
            PathLookup::Disjoint => {
                log::debug!("anchors {k} and {} are not joined by one boundary", k + 1);
                continue;
            }
        };

        let kind = *kinds.get(out.len()).ok_or_else(|| {
            MeshSeamError::InvalidArgument(format!(
                "{} path kinds given but more paths were found",
                kinds.len()
            ))
        })?;

        let range = sorted.range(b);
        let mut path: Vec<Segment> = if first <= last {
            segments[first..=last].to_vec()
        } else {
            let mut wrapped = segments[first..range.end].to_vec();
            wrapped.extend_from_slice(&segments[range.start..=last]);
            wrapped
        };
        if reversed {
            path = reverse_path(&path);
        }

        out.push(match kind {
            PathKind::Segments => SubCurve::Segments(path),
            PathKind::Nodes => {
                let mut node_path: Vec<usize> = path.iter().map(|s| s.start).collect();
                if from != to {
                    if let Some(end) = path.last() {
                        node_path.push(end.end);
                    }
                }
                SubCurve::Nodes(node_path)
            }
        });
    }
    Ok(out)
}

/// Boundary path of a triangulation from the node nearest `from` towards
/// `to`.
///
/// The boundary containing `from` is rotated to start there and walked in its
/// sorted direction up to the segment whose end node is nearest `to`.
pub fn find_boundary_path(
    points: &PointSet,
    elements: &[[usize; 3]],
    from: &[f64],
    to: &[f64],
    kind: PathKind,
) -> Result<SubCurve, MeshSeamError> {
    let edges = find_edges(elements, NonManifoldHandling::Warn)?;
    let sorted = sort_segments(&edges.boundary_edges, SegmentOrientation::Undirected)?;
    let mut anchor = PointSet::new(points.dimension())?;
    anchor.push(from)?;
    let connected = connect_boundary(points, &sorted, &anchor)?;
    let Some(b) = connected.last_anchor_boundary else {
        return Err(MeshSeamError::InvalidGeometry(
            "mesh has no boundary".to_string(),
        ));
    };
    let run = connected.boundary.boundary(b);
    let target = pad(to)?;

    let mut last = 0;
    let mut best = f64::INFINITY;
    for (k, s) in run.iter().enumerate() {
        let d = distance_squared(&points.xyz(s.end), &target);
        if d < best {
            best = d;
            last = k;
        }
    }
    let path = &run[..=last];
    Ok(match kind {
        PathKind::Segments => SubCurve::Segments(path.to_vec()),
        PathKind::Nodes => {
            let mut nodes: Vec<usize> = path.iter().map(|s| s.start).collect();
            nodes.push(path[last].end);
            SubCurve::Nodes(nodes)
        }
    })
}
