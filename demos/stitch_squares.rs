//! Reads two unit squares from Gmsh input, stitches them along their shared
//! side and extracts the bottom edge of the result between two anchors.

use mesh_seam::algs::edges::find_edges;
use mesh_seam::algs::retrieve::{PathKind, retrieve_segments};
use mesh_seam::algs::stitch::{MeshPart, StitchOptions, connect_mesh};
use mesh_seam::io::gmsh::GmshReader;
use mesh_seam::mesh_error::MeshSeamError;
use mesh_seam::topology::{NonManifoldHandling, PointSet};

fn square_msh(x0: f64) -> String {
    let x1 = x0 + 1.0;
    format!(
        r#"$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
4
1 {x0} 0 0
2 {x1} 0 0
3 {x1} 1 0
4 {x0} 1 0
$EndNodes
$Elements
2
1 2 2 1 1 1 2 3
2 2 2 1 1 1 3 4
$EndElements
"#
    )
}

fn main() -> Result<(), MeshSeamError> {
    let reader = GmshReader;
    let left = reader.read(square_msh(0.0).as_bytes())?.triangle_mesh()?;
    let right = reader.read(square_msh(1.0).as_bytes())?.triangle_mesh()?;

    let left_boundary = find_edges(&left.elements, NonManifoldHandling::Warn)?.boundary_edges;
    let right_boundary = find_edges(&right.elements, NonManifoldHandling::Warn)?.boundary_edges;

    let stitched = connect_mesh(
        MeshPart::new(&left, &left_boundary),
        MeshPart::new(&right, &right_boundary),
        &StitchOptions {
            orient_boundary: true,
            ..Default::default()
        },
    )?;
    println!(
        "stitched mesh: {} points, {} elements, {} boundary segments, identified {:?}",
        stitched.mesh.point_count(),
        stitched.mesh.element_count(),
        stitched.boundary.len(),
        stitched.identified
    );

    let anchors = PointSet::from_2d([[0.0, 0.0], [2.0, 0.0]]);
    let paths = retrieve_segments(
        &stitched.mesh.points,
        &stitched.boundary,
        &anchors,
        &[PathKind::Nodes],
    )?;
    for path in &paths {
        println!("bottom edge: {path:?}");
    }
    Ok(())
}
