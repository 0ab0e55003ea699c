//! Closest-node matching over a fixed candidate subset of a [`PointSet`].
//!
//! [`ClosestNodeIndex`] bulk-loads an R-tree once and answers nearest
//! queries without mutation, so a single index can be shared across threads
//! and reused for every query against the same candidate set.
//!
//! Matching is approximate by contract: a query always resolves to the
//! nearest candidate unless an explicit distance constraint is given, in which
//! case a violated constraint yields `node: None` instead of an error.

use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshSeamError;
use crate::topology::point::{PointSet, distance_squared, pad};

type Entry = GeomWithData<[f64; 3], usize>;

/// Maximum-distance constraint for batched queries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DistanceConstraint {
    #[default]
    Unconstrained,
    /// One bound for every query.
    Uniform(f64),
    /// One bound per query; a negative entry disables the bound for that query.
    PerQuery(Vec<f64>),
}

impl DistanceConstraint {
    fn bound(&self, query: usize) -> Option<f64> {
        match self {
            DistanceConstraint::Unconstrained => None,
            DistanceConstraint::Uniform(d) => Some(*d),
            DistanceConstraint::PerQuery(ds) => ds.get(query).copied().filter(|d| *d >= 0.0),
        }
    }
}

/// Result of one closest-node query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeMatch {
    /// Index of the matched point in the original [`PointSet`], or `None`
    /// when the index is empty or the distance constraint was violated.
    pub node: Option<usize>,
    /// Distance to the nearest candidate (infinite for an empty index).
    pub distance: f64,
}

/// Immutable nearest-neighbour index over selected points.
#[derive(Clone, Debug)]
pub struct ClosestNodeIndex {
    tree: RTree<Entry>,
}

impl ClosestNodeIndex {
    /// Indexes `points[candidates]`. Candidate order does not affect results.
    pub fn build(points: &PointSet, candidates: &[usize]) -> Result<Self, MeshSeamError> {
        let mut entries = Vec::with_capacity(candidates.len());
        for &c in candidates {
            if c >= points.len() {
                return Err(MeshSeamError::InvalidIndex {
                    context: "closest-node candidates",
                    index: c,
                    len: points.len(),
                });
            }
            entries.push(GeomWithData::new(points.xyz(c), c));
        }
        Ok(Self {
            tree: RTree::bulk_load(entries),
        })
    }

    /// Indexes every point of the set.
    pub fn from_points(points: &PointSet) -> Self {
        let entries = (0..points.len())
            .map(|i| GeomWithData::new(points.xyz(i), i))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest candidate to a padded coordinate, ties to the smallest index.
    pub fn nearest(&self, point: &[f64; 3]) -> NodeMatch {
        let mut iter = self.tree.nearest_neighbor_iter_with_distance_2(point);
        let Some((first, best)) = iter.next() else {
            return NodeMatch {
                node: None,
                distance: f64::INFINITY,
            };
        };
        let mut node = first.data;
        for (entry, d2) in iter {
            if d2 > best {
                break;
            }
            node = node.min(entry.data);
        }
        NodeMatch {
            node: Some(node),
            distance: best.sqrt(),
        }
    }

    /// Nearest candidate to a 2- or 3-entry coordinate slice.
    pub fn query(&self, point: &[f64]) -> Result<NodeMatch, MeshSeamError> {
        Ok(self.nearest(&pad(point)?))
    }

    /// Answers one query per point of `queries`.
    ///
    /// # Errors
    /// [`MeshSeamError::InvalidArgument`] if a per-query constraint list does
    /// not have one entry per query.
    pub fn query_batch(
        &self,
        queries: &PointSet,
        constraint: &DistanceConstraint,
    ) -> Result<Vec<NodeMatch>, MeshSeamError> {
        if let DistanceConstraint::PerQuery(ds) = constraint {
            if ds.len() != queries.len() {
                return Err(MeshSeamError::InvalidArgument(format!(
                    "{} distance bounds for {} queries",
                    ds.len(),
                    queries.len()
                )));
            }
        }
        let answer = |q: usize| {
            let mut m = self.nearest(&queries.xyz(q));
            if let Some(bound) = constraint.bound(q) {
                if m.distance > bound {
                    m.node = None;
                }
            }
            m
        };

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            Ok((0..queries.len()).into_par_iter().map(answer).collect())
        }
        #[cfg(not(feature = "rayon"))]
        {
            Ok((0..queries.len()).map(answer).collect())
        }
    }

    /// Every candidate strictly within `max_distance` of `point`, ascending.
    pub fn within(&self, point: &[f64; 3], max_distance: f64) -> Vec<usize> {
        let limit = max_distance * max_distance;
        let mut found: Vec<usize> = self
            .tree
            .locate_within_distance(*point, limit)
            .filter(|entry| distance_squared(entry.geom(), point) < limit)
            .map(|entry| entry.data)
            .collect();
        found.sort_unstable();
        found
    }

    /// Closest candidate strictly within `max_distance` for which `claimed`
    /// is false, ties to the smallest index.
    pub fn nearest_unclaimed<F>(
        &self,
        point: &[f64; 3],
        max_distance: f64,
        claimed: F,
    ) -> Option<usize>
    where
        F: Fn(usize) -> bool,
    {
        let limit = max_distance * max_distance;
        let mut best: Option<(usize, f64)> = None;
        for (entry, d2) in self.tree.nearest_neighbor_iter_with_distance_2(point) {
            if d2 >= limit {
                break;
            }
            match best {
                Some((_, b)) if d2 > b => break,
                _ => {}
            }
            if claimed(entry.data) {
                continue;
            }
            best = match best {
                Some((n, b)) => Some((n.min(entry.data), b)),
                None => Some((entry.data, d2)),
            };
        }
        best.map(|(n, _)| n)
    }
}

/// Builds a throwaway index over `candidates` and answers `queries`.
pub fn find_closest_nodes(
    points: &PointSet,
    candidates: &[usize],
    queries: &PointSet,
    constraint: &DistanceConstraint,
) -> Result<Vec<NodeMatch>, MeshSeamError> {
    ClosestNodeIndex::build(points, candidates)?.query_batch(queries, constraint)
}
