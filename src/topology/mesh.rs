//! Owned triangle mesh value.

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshSeamError;
use crate::topology::point::PointSet;
use crate::topology::validation::validate_elements;

/// Points plus first-order triangle connectivity.
///
/// Triangles may live in a planar (2D) point set or on a surface embedded in
/// 3D; the topology algorithms only look at indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTriMesh")]
pub struct TriMesh {
    pub points: PointSet,
    pub elements: Vec<[usize; 3]>,
}

/// Unchecked serialized forms, routed through the validating constructors.
#[derive(Deserialize)]
struct RawTriMesh {
    points: PointSet,
    elements: Vec<[usize; 3]>,
}

#[derive(Deserialize)]
struct RawTetMesh {
    points: PointSet,
    elements: Vec<[usize; 4]>,
}

impl TryFrom<RawTriMesh> for TriMesh {
    type Error = MeshSeamError;

    fn try_from(raw: RawTriMesh) -> Result<Self, Self::Error> {
        TriMesh::new(raw.points, raw.elements)
    }
}

impl TriMesh {
    /// Creates a mesh after checking every element index against `points`.
    pub fn new(points: PointSet, elements: Vec<[usize; 3]>) -> Result<Self, MeshSeamError> {
        validate_elements(&elements, points.len(), "triangle mesh")?;
        Ok(Self { points, elements })
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Re-checks the index invariant, e.g. after manual edits.
    pub fn validate(&self) -> Result<(), MeshSeamError> {
        validate_elements(&self.elements, self.points.len(), "triangle mesh")
    }

    /// Vertex coordinates of element `e` in the XY plane.
    pub fn triangle_xy(&self, e: usize) -> [[f64; 2]; 3] {
        let [a, b, c] = self.elements[e];
        [self.points.xy(a), self.points.xy(b), self.points.xy(c)]
    }
}

/// Points plus tetrahedral connectivity as returned by a 3D mesher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTetMesh")]
pub struct TetMesh {
    pub points: PointSet,
    pub elements: Vec<[usize; 4]>,
}

impl TetMesh {
    pub fn new(points: PointSet, elements: Vec<[usize; 4]>) -> Result<Self, MeshSeamError> {
        validate_elements(&elements, points.len(), "tetrahedral mesh")?;
        Ok(Self { points, elements })
    }

    pub fn validate(&self) -> Result<(), MeshSeamError> {
        validate_elements(&self.elements, self.points.len(), "tetrahedral mesh")
    }
}

impl TryFrom<RawTetMesh> for TetMesh {
    type Error = MeshSeamError;

    fn try_from(raw: RawTetMesh) -> Result<Self, Self::Error> {
        TetMesh::new(raw.points, raw.elements)
    }
}
