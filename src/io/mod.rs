//! Mesh file readers.
//!
//! Output writers are intentionally absent; meshes produced by this crate are
//! plain values that callers serialize however they need.

pub mod gmsh;

pub use gmsh::{GmshMesh, GmshReadOptions, GmshReader};
