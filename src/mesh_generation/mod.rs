//! Structured triangulations with marked boundaries.
//!
//! These generators produce conforming meshes without an external mesher:
//! every rectangular cell is split along its `v0 -> v2` diagonal into two
//! counter-clockwise triangles, and every box cell into six positively
//! oriented tetrahedra sharing the `v0 -> v6` diagonal. They serve as
//! fixtures for the boundary tools and as simple stitching inputs.

use serde::{Deserialize, Serialize};

use crate::geometry::primitives::Marker;
use crate::geometry::quality::orient_positive_tets;
use crate::mesh_error::MeshSeamError;
use crate::topology::mesh::{TetMesh, TriMesh};
use crate::topology::point::PointSet;
use crate::topology::segment::Segment;

/// Configuration for [`rectangle_mesh`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleMeshOptions {
    pub nx: usize,
    pub ny: usize,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Default for RectangleMeshOptions {
    fn default() -> Self {
        Self {
            nx: 1,
            ny: 1,
            min: [0.0, 0.0],
            max: [1.0, 1.0],
        }
    }
}

/// Output of a structured generator: the mesh and its marked outer boundary.
#[derive(Clone, Debug)]
pub struct GeneratedMesh {
    pub mesh: TriMesh,
    /// Counter-clockwise boundary starting at the `min` corner.
    pub boundary: Vec<Segment>,
    /// Side marker of each boundary segment.
    pub boundary_markers: Vec<Marker>,
}

fn invalid_geometry(message: impl Into<String>) -> MeshSeamError {
    MeshSeamError::InvalidGeometry(message.into())
}

/// Connectivity of an `nx`×`ny` cell grid over row-major vertices
/// `j * (nx + 1) + i`.
pub fn rectangle_elements(nx: usize, ny: usize) -> Vec<[usize; 3]> {
    let row_stride = nx + 1;
    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v0 = j * row_stride + i;
            let v1 = v0 + 1;
            let v3 = v0 + row_stride;
            let v2 = v3 + 1;
            cells.push([v0, v1, v2]);
            cells.push([v0, v2, v3]);
        }
    }
    cells
}

/// Generate a structured triangle mesh over `[min, max]`.
pub fn rectangle_mesh(options: &RectangleMeshOptions) -> Result<GeneratedMesh, MeshSeamError> {
    let RectangleMeshOptions { nx, ny, min, max } = *options;
    if nx == 0 || ny == 0 {
        return Err(invalid_geometry("nx and ny must be positive"));
    }
    if !(max[0] > min[0] && max[1] > min[1]) {
        return Err(invalid_geometry(format!(
            "empty rectangle: min {min:?}, max {max:?}"
        )));
    }

    let dx = (max[0] - min[0]) / nx as f64;
    let dy = (max[1] - min[1]) / ny as f64;
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        let y = min[1] + dy * j as f64;
        for i in 0..=nx {
            let x = min[0] + dx * i as f64;
            vertices.push([x, y]);
        }
    }
    let mesh = TriMesh::new(PointSet::from_2d(vertices), rectangle_elements(nx, ny))?;

    let s = nx + 1;
    let mut boundary = Vec::with_capacity(2 * (nx + ny));
    let mut boundary_markers = Vec::with_capacity(2 * (nx + ny));
    for i in 0..nx {
        boundary.push(Segment::new(i, i + 1));
        boundary_markers.push(Marker::MINUS_Y);
    }
    for j in 0..ny {
        boundary.push(Segment::new(j * s + nx, (j + 1) * s + nx));
        boundary_markers.push(Marker::PLUS_X);
    }
    for i in (1..=nx).rev() {
        boundary.push(Segment::new(ny * s + i, ny * s + i - 1));
        boundary_markers.push(Marker::PLUS_Y);
    }
    for j in (1..=ny).rev() {
        boundary.push(Segment::new(j * s, (j - 1) * s));
        boundary_markers.push(Marker::MINUS_X);
    }

    Ok(GeneratedMesh {
        mesh,
        boundary,
        boundary_markers,
    })
}

/// Tetrahedral connectivity of an `nx`×`ny`×`nz` box grid, six tets per cell.
pub fn box_elements(nx: usize, ny: usize, nz: usize) -> Vec<[usize; 4]> {
    let row_stride = nx + 1;
    let slab_stride = row_stride * (ny + 1);
    let mut cells = Vec::with_capacity(6 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let v0 = k * slab_stride + j * row_stride + i;
                let v1 = v0 + 1;
                let v3 = v0 + row_stride;
                let v2 = v3 + 1;
                let v4 = v0 + slab_stride;
                let v5 = v4 + 1;
                let v7 = v4 + row_stride;
                let v6 = v7 + 1;
                cells.extend([
                    [v0, v1, v2, v6],
                    [v0, v2, v3, v6],
                    [v0, v3, v7, v6],
                    [v0, v7, v4, v6],
                    [v0, v4, v5, v6],
                    [v0, v5, v1, v6],
                ]);
            }
        }
    }
    cells
}

/// Generate a structured tetrahedral mesh over `[min, max]` with `n` cells
/// per axis.
pub fn box_mesh(n: [usize; 3], min: [f64; 3], max: [f64; 3]) -> Result<TetMesh, MeshSeamError> {
    let [nx, ny, nz] = n;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(invalid_geometry("nx, ny, and nz must be positive"));
    }

    let dx = (max[0] - min[0]) / nx as f64;
    let dy = (max[1] - min[1]) / ny as f64;
    let dz = (max[2] - min[2]) / nz as f64;
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        let z = min[2] + dz * k as f64;
        for j in 0..=ny {
            let y = min[1] + dy * j as f64;
            for i in 0..=nx {
                let x = min[0] + dx * i as f64;
                vertices.push([x, y, z]);
            }
        }
    }
    let points = PointSet::from_3d(vertices);
    let mut elements = box_elements(nx, ny, nz);
    orient_positive_tets(&points, &mut elements);
    TetMesh::new(points, elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::edges::find_faces;
    use crate::geometry::quality::signed_area;
    use crate::topology::validation::NonManifoldHandling;

    #[test]
    fn rectangle_counts_and_orientation() {
        let generated = rectangle_mesh(&RectangleMeshOptions {
            nx: 3,
            ny: 2,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(generated.mesh.point_count(), 12);
        assert_eq!(generated.mesh.element_count(), 12);
        for e in 0..generated.mesh.element_count() {
            let [a, b, c] = generated.mesh.triangle_xy(e);
            assert!(signed_area(a, b, c) > 0.0);
        }
        assert_eq!(generated.boundary.len(), 10);
        assert_eq!(generated.boundary[0], Segment::new(0, 1));
        assert_eq!(generated.boundary.last().map(|s| s.end), Some(0));
        for pair in generated.boundary.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(generated.boundary_markers[3], Marker::PLUS_X);
    }

    #[test]
    fn degenerate_rectangle_is_rejected() {
        assert!(rectangle_mesh(&RectangleMeshOptions {
            nx: 0,
            ..Default::default()
        })
        .is_err());
        assert!(rectangle_mesh(&RectangleMeshOptions {
            max: [0.0, 1.0],
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn unit_box_has_twelve_boundary_faces() {
        let mesh = box_mesh([1, 1, 1], [0.0; 3], [1.0; 3]).unwrap();
        assert_eq!(mesh.elements.len(), 6);
        let faces = find_faces(&mesh.elements, NonManifoldHandling::Error).unwrap();
        assert_eq!(faces.boundary_faces.len(), 12);

        let two = box_mesh([2, 1, 1], [0.0; 3], [2.0, 1.0, 1.0]).unwrap();
        let faces = find_faces(&two.elements, NonManifoldHandling::Error).unwrap();
        assert_eq!(faces.boundary_faces.len(), 20);
    }
}
