#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-seam
//!
//! mesh-seam is a boundary and segment topology toolkit for triangle and
//! tetrahedral meshes produced by external Delaunay mesh generators. It
//! reconstructs ordered boundaries from unordered edge soups, matches anchor
//! points to boundary nodes, stitches independently generated sub-meshes
//! along shared boundaries, composes polyline input for the mesher and drives
//! incremental local refinement through a user predicate.
//!
//! ## Features
//! - Edge and face extraction with configurable non-manifold handling
//! - Boundary walking into closed loops and open paths (`SortedBoundary`)
//! - R-tree backed closest-node matching with distance constraints
//! - Anchor-driven boundary rotation and labeled sub-curve extraction
//! - Mesh stitching with deterministic node identification
//! - Polyline and marker-tagged geometry builders
//! - Parametric surface meshes, including closed spheres built from two
//!   stitched hemispheres
//! - A narrow trait seam to external triangulators and tetrahedralizers,
//!   with predicate, forced and multi-pass local refinement
//! - Mesher-free uniform and second-order refinement, with quadratic field
//!   interpolation onto twelve-way split elements
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-seam = "0.3"
//! # Optional features:
//! # features = ["rayon"]
//! ```
//!
//! ## Determinism
//!
//! Every operation is a pure function of its inputs. Whenever a choice is
//! left open (the next segment while walking a boundary, the node matched by
//! a tie in distance) the smallest index wins.
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade; the library never installs a
//! logger.

pub mod algs;
pub mod geometry;
pub mod io;
pub mod mesh_error;
pub mod mesh_generation;
pub mod topology;

/// A convenient prelude to import the most-used types and functions:
pub mod prelude {
    pub use crate::algs::closest::{ClosestNodeIndex, DistanceConstraint, NodeMatch};
    pub use crate::algs::edges::{EdgeExtraction, find_edges};
    pub use crate::algs::refine::{
        MaxArea, MeshInput, MeshOutput, RefinementDriver, RefinementPredicate, TetMesher,
        TriangleMesher, TriangulateOptions,
    };
    pub use crate::algs::retrieve::{PathKind, SubCurve, connect_boundary, retrieve_segments};
    pub use crate::algs::sort::{SegmentOrientation, SortedBoundary, sort_segments};
    pub use crate::algs::stitch::{MeshPart, StitchOptions, connect_mesh};
    pub use crate::geometry::curves::Curve;
    pub use crate::geometry::primitives::{GeometryBuilder, Marker};
    pub use crate::geometry::surface::{SphereOptions, make_sphere, make_surface_mesh};
    pub use crate::mesh_error::MeshSeamError;
    pub use crate::topology::{EdgeKey, NonManifoldHandling, PointSet, Segment, TetMesh, TriMesh};
}
