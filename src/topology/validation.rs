//! Topology validation helpers.
//!
//! Index validity is a programming contract: elements and segments must
//! reference existing points. These checks run at the public entry points so
//! a bad index is reported before any output is produced, rather than
//! surfacing later as corrupt connectivity.

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshSeamError;
use crate::topology::segment::{EdgeKey, Segment};

/// Behavior for non-manifold detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NonManifoldHandling {
    /// Skip non-manifold detection.
    Ignore,
    /// Log a warning on non-manifold entities.
    #[default]
    Warn,
    /// Return an error on non-manifold entities.
    Error,
}

/// Entity shared by too many elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NonManifold {
    Edge(EdgeKey),
    /// Sorted vertex triple of a tetrahedral face.
    Face([usize; 3]),
}

impl NonManifoldHandling {
    /// Reports an entity incident to `count` elements according to the policy.
    pub(crate) fn report(self, entity: NonManifold, count: usize) -> Result<(), MeshSeamError> {
        match self {
            NonManifoldHandling::Warn => {
                match entity {
                    NonManifold::Edge(edge) => log::warn!(
                        "Non-manifold edge detected: edge={:?} incident_elements={count}",
                        edge.as_tuple()
                    ),
                    NonManifold::Face(face) => log::warn!(
                        "Non-manifold face detected: face={face:?} incident_elements={count}"
                    ),
                }
                Ok(())
            }
            NonManifoldHandling::Error => Err(match entity {
                NonManifold::Edge(edge) => MeshSeamError::NonManifoldEdge {
                    edge: edge.as_tuple(),
                    elements: count,
                },
                NonManifold::Face(face) => MeshSeamError::NonManifoldFace {
                    face,
                    elements: count,
                },
            }),
            NonManifoldHandling::Ignore => Ok(()),
        }
    }
}

/// Checks that every vertex of every element is below `point_count`.
pub fn validate_elements<const N: usize>(
    elements: &[[usize; N]],
    point_count: usize,
    context: &'static str,
) -> Result<(), MeshSeamError> {
    for element in elements {
        for &v in element {
            if v >= point_count {
                return Err(MeshSeamError::InvalidIndex {
                    context,
                    index: v,
                    len: point_count,
                });
            }
        }
    }
    Ok(())
}

/// Checks that both endpoints of every segment are below `point_count`.
pub fn validate_segments(
    segments: &[Segment],
    point_count: usize,
    context: &'static str,
) -> Result<(), MeshSeamError> {
    for s in segments {
        for v in [s.start, s.end] {
            if v >= point_count {
                return Err(MeshSeamError::InvalidIndex {
                    context,
                    index: v,
                    len: point_count,
                });
            }
        }
    }
    Ok(())
}
