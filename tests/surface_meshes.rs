use std::f64::consts::PI;

use mesh_seam::algs::edges::find_edges;
use mesh_seam::geometry::surface::{
    SphereConstruction, SphereOptions, SurfaceMeshOptions, hemisphere, make_sphere,
    make_surface_mesh,
};
use mesh_seam::topology::{NonManifoldHandling, TriMesh};

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Checks a closed, outward oriented sphere and returns its total area.
fn check_sphere(mesh: &TriMesh, center: [f64; 3], radius: f64) -> f64 {
    let edges = find_edges(&mesh.elements, NonManifoldHandling::Error).unwrap();
    assert!(edges.boundary_edges.is_empty(), "sphere has open edges");
    let euler =
        mesh.point_count() as i64 - edges.all_edges.len() as i64 + mesh.element_count() as i64;
    assert_eq!(euler, 2);

    for i in 0..mesh.point_count() {
        let r = dot(sub(mesh.points.xyz(i), center), sub(mesh.points.xyz(i), center)).sqrt();
        assert!((r - radius).abs() < 1e-9, "point {i} at distance {r}");
    }

    let mut area = 0.0;
    for t in &mesh.elements {
        let [a, b, c] = t.map(|v| mesh.points.xyz(v));
        let n = cross(sub(b, a), sub(c, a));
        let centroid = [
            (a[0] + b[0] + c[0]) / 3.0,
            (a[1] + b[1] + c[1]) / 3.0,
            (a[2] + b[2] + c[2]) / 3.0,
        ];
        assert!(dot(n, sub(centroid, center)) > 0.0, "element {t:?} points inward");
        area += 0.5 * dot(n, n).sqrt();
    }
    area
}

#[test]
fn stitched_hemispheres_close_the_sphere() {
    let center = [1.0, -2.0, 0.5];
    let radius = 2.0;
    let mesh = make_sphere(&SphereOptions {
        center,
        radius,
        mesh_len: 0.5,
        ..Default::default()
    })
    .unwrap();
    let area = check_sphere(&mesh, center, radius);
    let exact = 4.0 * PI * radius * radius;
    assert!(area < exact && area > 0.9 * exact, "area {area} vs {exact}");
}

#[test]
fn parametric_sphere_matches_stitched_one() {
    let options = SphereOptions {
        radius: 1.5,
        mesh_len: 0.4,
        ..Default::default()
    };
    let stitched = make_sphere(&options).unwrap();
    let single = make_sphere(&SphereOptions {
        construction: SphereConstruction::Parametric,
        ..options
    })
    .unwrap();
    let a1 = check_sphere(&stitched, [0.0; 3], 1.5);
    let a2 = check_sphere(&single, [0.0; 3], 1.5);
    assert!((a1 - a2).abs() < 1e-2 * a1);
}

#[test]
fn hemisphere_equator_is_its_only_boundary() {
    let cap = hemisphere(1.0, 16, 5, 1e-8).unwrap();
    assert_eq!(cap.boundary.boundary_count(), 1);
    assert!(cap.boundary.is_closed(0));
    assert_eq!(cap.boundary.len(), 15);
    let edges = find_edges(&cap.mesh.elements, NonManifoldHandling::Error).unwrap();
    assert_eq!(edges.boundary_edges.len(), 15);
}

#[test]
fn torus_has_no_boundary() {
    let (big, small) = (2.0, 0.5);
    let torus = make_surface_mesh(
        |u, v| {
            [
                (big + small * v.cos()) * u.cos(),
                (big + small * v.cos()) * u.sin(),
                small * v.sin(),
            ]
        },
        &SurfaceMeshOptions {
            u: [0.0, 2.0 * PI],
            v: [0.0, 2.0 * PI],
            nu: 13,
            nv: 7,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(torus.boundary.is_empty());
    assert_eq!(torus.mesh.point_count(), 12 * 6);
    let edges = find_edges(&torus.mesh.elements, NonManifoldHandling::Error).unwrap();
    let euler = torus.mesh.point_count() as i64 - edges.all_edges.len() as i64
        + torus.mesh.element_count() as i64;
    assert_eq!(euler, 0);
}
