//! Segment sorting: reconstruct ordered boundaries from an unordered edge soup.
//!
//! The sorter performs a greedy successor walk. From the current node it takes
//! the lowest-index unconsumed segment incident to that node and advances to
//! the segment's far end. When the walk stalls, a new boundary starts. Open
//! polylines must start at a true endpoint, so the restart prefers a segment
//! with a degree-1 endpoint and orients it so that endpoint comes first; only
//! when no such segment remains (every remaining component is a cycle) is the
//! lowest-index remaining segment taken as is.
//!
//! Node degrees are decremented as segments are consumed. A node of degree
//! greater than two cannot lie on a simple path or cycle and is rejected
//! before the walk begins, so a successful sort always returns every input
//! segment exactly once.

use std::ops::Range;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshSeamError;
use crate::topology::segment::Segment;

/// Whether segment direction is fixed or may be flipped while sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SegmentOrientation {
    /// Segments may be reversed to continue a path.
    #[default]
    Undirected,
    /// Segment direction is kept; a successor must start where the current
    /// segment ends.
    Directed,
}

/// Segments permuted into consecutive boundaries.
///
/// Boundary `i` occupies `segments[boundary_starts[i]..boundary_starts[i + 1]]`
/// (the last one runs to the end). Within a boundary every segment's end is
/// the next segment's start.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedBoundary {
    pub segments: Vec<Segment>,
    pub boundary_starts: Vec<usize>,
}

impl SortedBoundary {
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn boundary_count(&self) -> usize {
        self.boundary_starts.len()
    }

    /// Segment index range of boundary `i`.
    pub fn range(&self, i: usize) -> Range<usize> {
        let start = self.boundary_starts[i];
        let end = self
            .boundary_starts
            .get(i + 1)
            .copied()
            .unwrap_or(self.segments.len());
        start..end
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.boundary_count()).map(move |i| self.range(i))
    }

    pub fn boundary(&self, i: usize) -> &[Segment] {
        &self.segments[self.range(i)]
    }

    /// Iterates over the boundaries as segment slices.
    pub fn iter(&self) -> impl Iterator<Item = &[Segment]> + '_ {
        self.ranges().map(move |r| &self.segments[r])
    }

    /// The boundary containing segment position `segment_index`.
    pub fn boundary_of(&self, segment_index: usize) -> Option<usize> {
        if segment_index >= self.segments.len() {
            return None;
        }
        Some(
            self.boundary_starts
                .partition_point(|&s| s <= segment_index)
                .saturating_sub(1),
        )
    }

    /// Whether boundary `i` returns to its first node.
    pub fn is_closed(&self, i: usize) -> bool {
        let run = self.boundary(i);
        match (run.first(), run.last()) {
            (Some(first), Some(last)) => first.start == last.end,
            _ => false,
        }
    }

    /// Node indices visited by boundary `i`. A closed boundary lists each node
    /// once; an open one also includes its final node.
    pub fn node_sequence(&self, i: usize) -> Vec<usize> {
        let run = self.boundary(i);
        let mut nodes: Vec<usize> = run.iter().map(|s| s.start).collect();
        if !self.is_closed(i) {
            if let Some(last) = run.last() {
                nodes.push(last.end);
            }
        }
        nodes
    }

    /// `boundary_starts` with the total length appended, the offset list
    /// layout used when slicing consecutive boundaries.
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = self.boundary_starts.clone();
        offsets.push(self.segments.len());
        offsets
    }
}

/// Segments sorted alongside their provenance tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaggedBoundary<T> {
    pub boundary: SortedBoundary,
    /// `tags[k]` belongs to `boundary.segments[k]`.
    pub tags: Vec<T>,
}

/// Sorts `segments` into ordered boundaries.
///
/// # Errors
/// [`MeshSeamError::Topology`] if a node has degree greater than two
/// (undirected) or more than one incoming or outgoing segment (directed).
pub fn sort_segments(
    segments: &[Segment],
    orientation: SegmentOrientation,
) -> Result<SortedBoundary, MeshSeamError> {
    let walk = walk(segments, orientation)?;
    Ok(SortedBoundary {
        segments: walk.order.iter().map(|&(_, s)| s).collect(),
        boundary_starts: walk.starts,
    })
}

/// Sorts segments carrying provenance tags (facet, region or element ids).
pub fn sort_tagged_segments<T: Clone>(
    segments: &[Segment],
    tags: &[T],
    orientation: SegmentOrientation,
) -> Result<TaggedBoundary<T>, MeshSeamError> {
    if segments.len() != tags.len() {
        return Err(MeshSeamError::InvalidArgument(format!(
            "{} segments but {} tags",
            segments.len(),
            tags.len()
        )));
    }
    let walk = walk(segments, orientation)?;
    Ok(TaggedBoundary {
        tags: walk.order.iter().map(|&(i, _)| tags[i].clone()).collect(),
        boundary: SortedBoundary {
            segments: walk.order.into_iter().map(|(_, s)| s).collect(),
            boundary_starts: walk.starts,
        },
    })
}

struct Walk {
    /// (input index, oriented segment) in output order.
    order: Vec<(usize, Segment)>,
    starts: Vec<usize>,
}

fn walk(segments: &[Segment], orientation: SegmentOrientation) -> Result<Walk, MeshSeamError> {
    let walk = match orientation {
        SegmentOrientation::Undirected => walk_undirected(segments)?,
        SegmentOrientation::Directed => walk_directed(segments)?,
    };
    debug_assert_eq!(walk.order.len(), segments.len());
    log::debug!(
        "sorted {} segments into {} boundaries",
        walk.order.len(),
        walk.starts.len()
    );
    Ok(walk)
}

fn walk_undirected(segments: &[Segment]) -> Result<Walk, MeshSeamError> {
    let mut incident: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, s) in segments.iter().enumerate() {
        incident.entry(s.start).or_default().push(i);
        incident.entry(s.end).or_default().push(i);
    }
    for s in segments {
        for node in [s.start, s.end] {
            let degree = incident[&node].len();
            if degree > 2 {
                return Err(MeshSeamError::Topology { node, degree });
            }
        }
    }
    let mut degree: HashMap<usize, usize> =
        incident.iter().map(|(&n, list)| (n, list.len())).collect();

    let n = segments.len();
    let mut consumed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut starts = Vec::new();
    let mut current: Option<usize> = None;
    let mut lowest = 0usize;
    // walks consume whole components, so untouched segments keep their degrees
    let open_ends: Vec<usize> = (0..n)
        .filter(|&i| degree[&segments[i].start] == 1 || degree[&segments[i].end] == 1)
        .collect();
    let mut next_open = 0usize;

    while order.len() < n {
        let successor = current.and_then(|node| {
            incident[&node]
                .iter()
                .copied()
                .find(|&i| !consumed[i])
                .map(|i| (i, node))
        });

        let (idx, seg) = match successor {
            Some((i, node)) => {
                let s = segments[i];
                (i, if s.start == node { s } else { s.reversed() })
            }
            None => {
                starts.push(order.len());
                while next_open < open_ends.len() && consumed[open_ends[next_open]] {
                    next_open += 1;
                }
                match open_ends.get(next_open) {
                    Some(&i) => {
                        let s = segments[i];
                        (i, if degree[&s.start] == 1 { s } else { s.reversed() })
                    }
                    None => {
                        while consumed[lowest] {
                            lowest += 1;
                        }
                        (lowest, segments[lowest])
                    }
                }
            }
        };

        consumed[idx] = true;
        for node in [seg.start, seg.end] {
            if let Some(d) = degree.get_mut(&node) {
                *d = d.saturating_sub(1);
            }
        }
        order.push((idx, seg));
        current = Some(seg.end);
    }

    Ok(Walk { order, starts })
}

fn walk_directed(segments: &[Segment]) -> Result<Walk, MeshSeamError> {
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut in_degree: HashMap<usize, usize> = HashMap::new();
    for (i, s) in segments.iter().enumerate() {
        outgoing.entry(s.start).or_default().push(i);
        *in_degree.entry(s.end).or_insert(0) += 1;
    }
    for s in segments {
        let out = outgoing[&s.start].len();
        if out > 1 {
            return Err(MeshSeamError::Topology {
                node: s.start,
                degree: out,
            });
        }
        let inc = in_degree[&s.end];
        if inc > 1 {
            return Err(MeshSeamError::Topology {
                node: s.end,
                degree: inc,
            });
        }
    }

    let n = segments.len();
    let mut consumed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut starts = Vec::new();
    let mut current: Option<usize> = None;
    let mut lowest = 0usize;
    let sources: Vec<usize> = (0..n)
        .filter(|&i| in_degree.get(&segments[i].start).copied().unwrap_or(0) == 0)
        .collect();
    let mut next_source = 0usize;

    while order.len() < n {
        let successor = current
            .and_then(|node| outgoing.get(&node))
            .and_then(|list| list.iter().copied().find(|&i| !consumed[i]));

        let idx = match successor {
            Some(i) => i,
            None => {
                starts.push(order.len());
                while next_source < sources.len() && consumed[sources[next_source]] {
                    next_source += 1;
                }
                match sources.get(next_source) {
                    Some(&i) => i,
                    None => {
                        while consumed[lowest] {
                            lowest += 1;
                        }
                        lowest
                    }
                }
            }
        };

        let seg = segments[idx];
        consumed[idx] = true;
        if let Some(d) = in_degree.get_mut(&seg.end) {
            *d = d.saturating_sub(1);
        }
        order.push((idx, seg));
        current = Some(seg.end);
    }

    Ok(Walk { order, starts })
}
