//! MeshSeamError: Unified error type for mesh-seam public APIs
//!
//! Every fallible operation in the crate returns this error type. Tolerance
//! based matching (closest nodes, coincident points) never fails; only
//! topology violations, contract violations and external mesher failures are
//! reported here.

use thiserror::Error;

use crate::algs::refine::MesherError;

/// Unified error type for mesh-seam operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshSeamError {
    /// Segments do not decompose into simple paths or cycles.
    #[error("Topology error: node {node} has degree {degree}, segments must form simple paths or cycles")]
    Topology { node: usize, degree: usize },
    /// An element or segment references a point that does not exist.
    #[error("Invalid index in {context}: {index} (point count {len})")]
    InvalidIndex {
        context: &'static str,
        index: usize,
        len: usize,
    },
    /// An edge is shared by more than two elements.
    #[error("Non-manifold edge ({}, {}) shared by {elements} elements", .edge.0, .edge.1)]
    NonManifoldEdge { edge: (usize, usize), elements: usize },
    /// A tetrahedral face is shared by more than two elements.
    #[error("Non-manifold face {face:?} shared by {elements} elements")]
    NonManifoldFace { face: [usize; 3], elements: usize },
    /// Geometry input was malformed (wrong dimension, empty curve, ...).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    /// A caller-supplied argument is inconsistent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The external mesh generator rejected its input.
    #[error(transparent)]
    Mesher(#[from] MesherError),
    /// Mesh file content could not be parsed.
    #[error("Mesh I/O parse error: {0}")]
    MeshIoParse(String),
    /// Underlying reader failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MeshSeamError {
    fn from(err: std::io::Error) -> Self {
        MeshSeamError::Io(err.to_string())
    }
}
