//! Top-level module for the mesh data model.
//!
//! This module provides the value types every algorithm in the crate consumes:
//! - [`PointSet`](point::PointSet): dense, index-addressed coordinates
//! - [`Segment`](segment::Segment) and [`EdgeKey`](segment::EdgeKey): directed
//!   and canonical point pairs
//! - [`TriMesh`](mesh::TriMesh) and [`TetMesh`](mesh::TetMesh): owned meshes
//! - index and manifoldness validation

pub mod mesh;
pub mod point;
pub mod segment;
pub mod validation;

pub use mesh::{TetMesh, TriMesh};
pub use point::PointSet;
pub use segment::{EdgeKey, Segment};
pub use validation::NonManifoldHandling;
