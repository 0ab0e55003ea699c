//! Geometry utilities for mesh-seam.
//!
//! This module provides polyline construction for 2D mesher input, marker
//! tagged geometry assembly in 2D and 3D, parametric surface meshes and basic
//! element measures.

pub mod curves;
pub mod primitives;
pub mod quality;
pub mod surface;
