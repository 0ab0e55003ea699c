//! Parametric surface meshes in 3D.
//!
//! [`make_surface_mesh`] triangulates a rectangle of the `(u, v)` parameter
//! plane with the structured generator and maps every node through a
//! caller-supplied function. Parameter boundaries that the map glues
//! together (a periodic seam, a pole collapsing a whole row) produce
//! coincident boundary nodes; these are identified, and elements that lose a
//! corner in the process are dropped.
//!
//! Element orientation follows the parameter plane: the normal of every
//! triangle points along `∂f/∂u × ∂f/∂v`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::algs::closest::ClosestNodeIndex;
use crate::algs::edges::find_edges;
use crate::algs::sort::{SegmentOrientation, SortedBoundary, sort_segments};
use crate::algs::stitch::{MeshPart, StitchOptions, connect_mesh};
use crate::mesh_error::MeshSeamError;
use crate::mesh_generation::{RectangleMeshOptions, rectangle_mesh};
use crate::topology::mesh::TriMesh;
use crate::topology::point::PointSet;
use crate::topology::validation::NonManifoldHandling;

/// Parameter rectangle and sampling of [`make_surface_mesh`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceMeshOptions {
    /// `[u0, u1]` with `u0 < u1`.
    pub u: [f64; 2],
    /// `[v0, v1]` with `v0 < v1`.
    pub v: [f64; 2],
    /// Nodes along `u`, both ends included.
    pub nu: usize,
    /// Nodes along `v`, both ends included.
    pub nv: usize,
    /// Boundary nodes closer than this after mapping are identified.
    pub epsilon: f64,
}

impl Default for SurfaceMeshOptions {
    fn default() -> Self {
        Self {
            u: [0.0, 1.0],
            v: [0.0, 1.0],
            nu: 2,
            nv: 2,
            epsilon: 1e-8,
        }
    }
}

/// Result of [`make_surface_mesh`].
#[derive(Clone, Debug)]
pub struct SurfaceMesh {
    pub mesh: TriMesh,
    /// Remaining boundary of the surface; empty for a closed one.
    pub boundary: SortedBoundary,
    /// `(kept, removed)` parameter-grid node pairs that mapped to one point.
    pub identified: Vec<(usize, usize)>,
}

/// Triangulates the image of a parameter rectangle under `map`.
///
/// # Errors
/// * [`MeshSeamError::InvalidArgument`] if fewer than two nodes are requested
///   along a direction or `epsilon` is negative.
/// * [`MeshSeamError::InvalidGeometry`] for an empty parameter rectangle or a
///   map producing non-finite coordinates.
pub fn make_surface_mesh<F>(
    map: F,
    options: &SurfaceMeshOptions,
) -> Result<SurfaceMesh, MeshSeamError>
where
    F: Fn(f64, f64) -> [f64; 3],
{
    let SurfaceMeshOptions {
        u,
        v,
        nu,
        nv,
        epsilon,
    } = *options;
    if nu < 2 || nv < 2 {
        return Err(MeshSeamError::InvalidArgument(format!(
            "surface mesh needs at least 2 nodes per direction, got {nu}x{nv}"
        )));
    }
    if epsilon.is_nan() || epsilon < 0.0 {
        return Err(MeshSeamError::InvalidArgument(format!(
            "identification tolerance must be non-negative, got {epsilon}"
        )));
    }

    let grid = rectangle_mesh(&RectangleMeshOptions {
        nx: nu - 1,
        ny: nv - 1,
        min: [u[0], v[0]],
        max: [u[1], v[1]],
    })?;
    let mut mapped = Vec::with_capacity(grid.mesh.point_count());
    for p in grid.mesh.points.iter() {
        let q = map(p[0], p[1]);
        if q.iter().any(|c| !c.is_finite()) {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "surface map is not finite at (u, v) = ({}, {})",
                p[0], p[1]
            )));
        }
        mapped.push(q);
    }
    let points = PointSet::from_3d(mapped);

    // identify coincident boundary nodes with their smallest-index twin
    let mut boundary_nodes: Vec<usize> = grid.boundary.iter().map(|s| s.start).collect();
    boundary_nodes.sort_unstable();
    let index = ClosestNodeIndex::build(&points, &boundary_nodes)?;
    let mut representative: Vec<usize> = (0..points.len()).collect();
    let mut identified = Vec::new();
    for &node in &boundary_nodes {
        if representative[node] != node {
            continue;
        }
        for twin in index.within(&points.xyz(node), epsilon) {
            if twin > node && representative[twin] == twin {
                representative[twin] = node;
                identified.push((node, twin));
            }
        }
    }

    let mut renumber = vec![usize::MAX; points.len()];
    let mut next = 0;
    for i in 0..points.len() {
        if representative[i] == i {
            renumber[i] = next;
            next += 1;
        }
    }
    let kept = points.retain_indices(|i| representative[i] == i);
    let elements: Vec<[usize; 3]> = grid
        .mesh
        .elements
        .iter()
        .map(|t| t.map(|n| renumber[representative[n]]))
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .collect();
    let mesh = TriMesh::new(kept, elements)?;

    let edges = find_edges(&mesh.elements, NonManifoldHandling::Warn)?;
    let boundary = sort_segments(&edges.boundary_edges, SegmentOrientation::Undirected)?;
    log::debug!(
        "surface mesh: {} nodes, {} elements, {} identified, {} boundaries",
        mesh.point_count(),
        mesh.element_count(),
        identified.len(),
        boundary.boundary_count()
    );

    Ok(SurfaceMesh {
        mesh,
        boundary,
        identified,
    })
}

/// Reverses the orientation of every element.
fn flip(mesh: &mut TriMesh) {
    for t in &mut mesh.elements {
        t.swap(1, 2);
    }
}

/// Upper half sphere around the origin with outward normals.
///
/// `nu` nodes run around the equator (the seam is identified), `nv` from the
/// pole down to the equator (the pole row collapses to one node). The
/// boundary is the equator.
pub fn hemisphere(
    radius: f64,
    nu: usize,
    nv: usize,
    epsilon: f64,
) -> Result<SurfaceMesh, MeshSeamError> {
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(MeshSeamError::InvalidArgument(format!(
            "sphere radius must be positive, got {radius}"
        )));
    }
    let mut surface = make_surface_mesh(
        |u, v| spherical(radius, u, v),
        &SurfaceMeshOptions {
            u: [0.0, 2.0 * PI],
            v: [0.0, PI / 2.0],
            nu,
            nv,
            epsilon,
        },
    )?;
    // ∂u × ∂v points inward on the sphere
    flip(&mut surface.mesh);
    Ok(surface)
}

fn spherical(radius: f64, u: f64, v: f64) -> [f64; 3] {
    [
        radius * u.cos() * v.sin(),
        radius * u.sin() * v.sin(),
        radius * v.cos(),
    ]
}

/// How [`make_sphere`] assembles the closed surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SphereConstruction {
    /// Two hemispheres stitched along the equator.
    #[default]
    Hemispheres,
    /// A single parameter patch over the whole sphere, pole to pole.
    Parametric,
}

/// Configuration for [`make_sphere`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereOptions {
    pub center: [f64; 3],
    pub radius: f64,
    /// Target edge length along the equator.
    pub mesh_len: f64,
    /// Identification and stitching tolerance.
    pub epsilon: f64,
    pub construction: SphereConstruction,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            center: [0.0; 3],
            radius: 1.0,
            mesh_len: 0.25,
            epsilon: 1e-8,
            construction: SphereConstruction::default(),
        }
    }
}

/// Closed triangulated sphere with outward normals.
///
/// The equator carries `max(2πR / mesh_len, 4)` nodes.
///
/// # Errors
/// [`MeshSeamError::InvalidArgument`] for a non-positive radius or edge
/// length.
pub fn make_sphere(options: &SphereOptions) -> Result<TriMesh, MeshSeamError> {
    let SphereOptions {
        center,
        radius,
        mesh_len,
        epsilon,
        construction,
    } = *options;
    if !(mesh_len > 0.0 && mesh_len.is_finite()) {
        return Err(MeshSeamError::InvalidArgument(format!(
            "sphere edge length must be positive, got {mesh_len}"
        )));
    }
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(MeshSeamError::InvalidArgument(format!(
            "sphere radius must be positive, got {radius}"
        )));
    }
    let nu = ((2.0 * PI * radius / mesh_len) as usize).max(4);

    let mut mesh = match construction {
        SphereConstruction::Hemispheres => {
            let upper = hemisphere(radius, nu, (nu / 4 + 1).max(2), epsilon)?;
            let mut lower = upper.clone();
            lower.mesh.points.map_in_place(|p| p[2] = -p[2]);
            flip(&mut lower.mesh);
            let stitched = connect_mesh(
                MeshPart::new(&upper.mesh, &upper.boundary.segments),
                MeshPart::new(&lower.mesh, &lower.boundary.segments),
                &StitchOptions {
                    epsilon,
                    orient_boundary: false,
                },
            )?;
            if !stitched.boundary.is_empty() {
                log::warn!(
                    "sphere halves left {} open boundary segments",
                    stitched.boundary.len()
                );
            }
            stitched.mesh
        }
        SphereConstruction::Parametric => {
            let mut surface = make_surface_mesh(
                |u, v| spherical(radius, u, v),
                &SurfaceMeshOptions {
                    u: [0.0, 2.0 * PI],
                    v: [0.0, PI],
                    nu,
                    nv: (nu / 2 + 1).max(3),
                    epsilon,
                },
            )?;
            flip(&mut surface.mesh);
            surface.mesh
        }
    };

    mesh.points.map_in_place(|p| {
        for (c, o) in p.iter_mut().zip(center) {
            *c += o;
        }
    });
    Ok(mesh)
}
