//! Re-export public algorithms.

pub mod closest;
pub mod edges;
pub mod inner_curve;
pub mod refine;
pub mod retrieve;
pub mod sort;
pub mod stitch;
pub mod subdivide;

pub use closest::{ClosestNodeIndex, DistanceConstraint, NodeMatch, find_closest_nodes};
pub use edges::{EdgeExtraction, check_segment_sense, find_edges, find_faces};
pub use inner_curve::find_curve_segments;
pub use refine::{
    MaxArea, RefinementDriver, RefinementPredicate, TetMesher, TetOptions, TriangleMesher,
    TriangulateOptions,
};
pub use retrieve::{
    PathKind, PathLookup, SubCurve, connect_boundary, find_boundary_path, lookup_path,
    retrieve_segments,
};
pub use sort::{SegmentOrientation, SortedBoundary, sort_segments, sort_tagged_segments};
pub use stitch::{MeshPart, StitchOptions, StitchedMesh, connect_mesh};
pub use subdivide::{make_second_order, split_second_order, uniform_refine};
