use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use mesh_seam::algs::edges::find_edges;
use mesh_seam::algs::sort::{SegmentOrientation, sort_segments};
use mesh_seam::algs::stitch::{MeshPart, StitchOptions, connect_mesh};
use mesh_seam::mesh_generation::{GeneratedMesh, RectangleMeshOptions, rectangle_mesh};
use mesh_seam::topology::{NonManifoldHandling, Segment};

fn scrambled_polygon(n: usize, seed: u64) -> Vec<Segment> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut segments: Vec<Segment> = (0..n).map(|i| Segment::new(i, (i + 1) % n)).collect();
    segments.shuffle(&mut rng);
    for s in &mut segments {
        if rng.gen_bool(0.5) {
            *s = s.reversed();
        }
    }
    segments
}

fn square(x0: f64, n: usize) -> GeneratedMesh {
    rectangle_mesh(&RectangleMeshOptions {
        nx: n,
        ny: n,
        min: [x0, 0.0],
        max: [x0 + 1.0, 1.0],
    })
    .expect("valid rectangle")
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_segments");
    for &n in &[1_000usize, 10_000, 100_000] {
        let segments = scrambled_polygon(n, 42);
        group.bench_with_input(BenchmarkId::from_parameter(n), &segments, |b, segs| {
            b.iter(|| sort_segments(segs, SegmentOrientation::Undirected).expect("polygon sorts"))
        });
    }
    group.finish();
}

fn bench_edges(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_edges");
    for &n in &[32usize, 128] {
        let mesh = square(0.0, n).mesh;
        group.bench_with_input(BenchmarkId::from_parameter(n), &mesh, |b, m| {
            b.iter(|| find_edges(&m.elements, NonManifoldHandling::Ignore).expect("manifold"))
        });
    }
    group.finish();
}

fn bench_stitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("connect_mesh");
    for &n in &[32usize, 128] {
        let left = square(0.0, n);
        let right = square(1.0, n);
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| {
                connect_mesh(
                    MeshPart::new(&left.mesh, &left.boundary),
                    MeshPart::new(&right.mesh, &right.boundary),
                    &StitchOptions::default(),
                )
                .expect("squares stitch")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sort, bench_edges, bench_stitch);
criterion_main!(benches);
