use mesh_seam::algs::closest::{ClosestNodeIndex, DistanceConstraint, find_closest_nodes};
use mesh_seam::mesh_error::MeshSeamError;
use mesh_seam::topology::PointSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn lattice() -> PointSet {
    PointSet::from_2d((0..5).flat_map(|j| (0..5).map(move |i| [i as f64, j as f64])))
}

#[test]
fn exact_hit_has_zero_distance() {
    let points = lattice();
    let index = ClosestNodeIndex::from_points(&points);
    let m = index.query(&[3.0, 2.0]).unwrap();
    assert_eq!(m.node, Some(13));
    assert_eq!(m.distance, 0.0);
}

#[test]
fn tight_constraint_gives_no_match() {
    let points = lattice();
    let queries = PointSet::from_2d([[0.5, 0.1], [2.0, 2.0]]);
    let all: Vec<usize> = (0..points.len()).collect();
    let out = find_closest_nodes(&points, &all, &queries, &DistanceConstraint::Uniform(0.2)).unwrap();
    assert_eq!(out[0].node, None);
    assert!(out[0].distance > 0.2);
    assert_eq!(out[1].node, Some(12));

    let per_query = DistanceConstraint::PerQuery(vec![-1.0, 0.0]);
    let out = find_closest_nodes(&points, &all, &queries, &per_query).unwrap();
    assert_eq!(out[0].node, Some(0));
    assert_eq!(out[1].node, Some(12));

    assert!(matches!(
        find_closest_nodes(&points, &all, &queries, &DistanceConstraint::PerQuery(vec![1.0])),
        Err(MeshSeamError::InvalidArgument(_))
    ));
}

#[test]
fn equidistant_candidates_resolve_to_smallest_index() {
    let points = lattice();
    let index = ClosestNodeIndex::from_points(&points);
    // centre of the cell spanned by nodes 6, 7, 11, 12
    assert_eq!(index.query(&[1.5, 1.5]).unwrap().node, Some(6));
    // subset index only sees its candidates
    let subset = ClosestNodeIndex::build(&points, &[24, 12, 7]).unwrap();
    assert_eq!(subset.query(&[1.5, 1.5]).unwrap().node, Some(7));
}

#[test]
fn index_agrees_with_brute_force() {
    let points = lattice();
    let index = ClosestNodeIndex::from_points(&points);
    let mut rng = SmallRng::seed_from_u64(99);
    for _ in 0..200 {
        let q = [rng.gen_range(-1.0..5.0), rng.gen_range(-1.0..5.0), 0.0];
        let m = index.nearest(&q);
        let best = (0..points.len())
            .map(|i| {
                let [x, y] = points.xy(i);
                ((x - q[0]).powi(2) + (y - q[1]).powi(2)).sqrt()
            })
            .fold(f64::INFINITY, f64::min);
        assert!((m.distance - best).abs() < 1e-12);
    }
}

#[test]
fn empty_index_never_matches() {
    let points = lattice();
    let index = ClosestNodeIndex::build(&points, &[]).unwrap();
    assert!(index.is_empty());
    let m = index.query(&[0.0, 0.0]).unwrap();
    assert_eq!(m.node, None);
    assert!(m.distance.is_infinite());
}
