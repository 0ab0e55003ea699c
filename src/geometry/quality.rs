//! Triangle and tetrahedron measures.
//!
//! # Orientation
//! Triangles are positively oriented when their vertices run
//! counter-clockwise in the XY plane; tetrahedra when `(b - a) · ((c - a) ×
//! (d - a))` is positive. Boundary orientation in [`crate::algs::edges`] is
//! derived from element orientation, so meshes coming back from an external
//! mesher can be normalized with [`orient_ccw`] first.

use std::f64::consts::PI;

use crate::mesh_error::MeshSeamError;
use crate::topology::mesh::TriMesh;
use crate::topology::point::PointSet;

const EPS: f64 = 1e-12;

/// Basic quality metrics for a triangle.
#[derive(Clone, Copy, Debug)]
pub struct TriangleQuality {
    /// Ratio of the longest edge length to the shortest edge length.
    pub aspect_ratio: f64,
    /// Minimum corner angle in degrees.
    pub min_angle_deg: f64,
    /// Signed area in the XY plane; negative for clockwise vertex order.
    pub signed_area: f64,
}

/// Signed area, positive for counter-clockwise `a, b, c`.
#[inline]
pub fn signed_area(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    let abx = b[0] - a[0];
    let aby = b[1] - a[1];
    let acx = c[0] - a[0];
    let acy = c[1] - a[1];
    0.5 * (abx * acy - aby * acx)
}

/// Unsigned area of a planar triangle.
#[inline]
pub fn triangle_area(tri: &[[f64; 2]; 3]) -> f64 {
    signed_area(tri[0], tri[1], tri[2]).abs()
}

pub fn signed_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    let ab = sub(b, a);
    let ac = sub(c, a);
    let ad = sub(d, a);
    dot(ab, cross(ac, ad)) / 6.0
}

/// Quality metrics for a triangle given by padded coordinates.
///
/// # Errors
/// [`MeshSeamError::InvalidGeometry`] on a zero-length edge.
pub fn triangle_quality(vertices: &[[f64; 3]; 3]) -> Result<TriangleQuality, MeshSeamError> {
    let mut min_len = f64::INFINITY;
    let mut max_len = 0.0f64;
    for (a, b) in [(0, 1), (1, 2), (2, 0)] {
        let len = norm(sub(vertices[a], vertices[b]));
        if len <= EPS {
            return Err(MeshSeamError::InvalidGeometry(
                "zero-length edge detected".into(),
            ));
        }
        min_len = min_len.min(len);
        max_len = max_len.max(len);
    }
    let mut min_angle_deg = f64::INFINITY;
    for i in 0..3 {
        let prev = vertices[(i + 2) % 3];
        let next = vertices[(i + 1) % 3];
        let angle = angle_deg(sub(prev, vertices[i]), sub(next, vertices[i]))?;
        min_angle_deg = min_angle_deg.min(angle);
    }
    let [a, b, c] = vertices.map(|[x, y, _]| [x, y]);
    Ok(TriangleQuality {
        aspect_ratio: max_len / min_len,
        min_angle_deg,
        signed_area: signed_area(a, b, c),
    })
}

/// Flips clockwise triangles in place and returns how many were flipped.
pub fn orient_ccw(mesh: &mut TriMesh) -> usize {
    let mut flipped = 0;
    for e in 0..mesh.elements.len() {
        let [a, b, c] = mesh.triangle_xy(e);
        if signed_area(a, b, c) < 0.0 {
            mesh.elements[e].swap(1, 2);
            flipped += 1;
        }
    }
    flipped
}

/// Flips negatively oriented tetrahedra in place and returns how many were
/// flipped.
pub fn orient_positive_tets(points: &PointSet, elements: &mut [[usize; 4]]) -> usize {
    let mut flipped = 0;
    for tet in elements.iter_mut() {
        let [a, b, c, d] = tet.map(|v| points.xyz(v));
        if signed_volume(a, b, c, d) < 0.0 {
            tet.swap(2, 3);
            flipped += 1;
        }
    }
    flipped
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn angle_deg(a: [f64; 3], b: [f64; 3]) -> Result<f64, MeshSeamError> {
    let na = norm(a);
    let nb = norm(b);
    if na <= EPS || nb <= EPS {
        return Err(MeshSeamError::InvalidGeometry(
            "zero-length edge detected".into(),
        ));
    }
    let cos = (dot(a, b) / (na * nb)).clamp(-1.0, 1.0);
    Ok(cos.acos() * 180.0 / PI)
}
