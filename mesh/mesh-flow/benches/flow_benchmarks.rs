//! Benchmarks for mesh-flow operations.
//!
//! Run with: cargo bench -p mesh-flow
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p mesh-flow -- --save-baseline main
//! 2. After changes: cargo bench -p mesh-flow -- --baseline main

#![allow(
    missing_docs,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::unwrap_used
)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mesh_flow::{FlowParams, FlowWalker, MeshTopologyIndex, OverlapSets, OverlapStrategy, bake};
use mesh_types::{Matrix4, MeshSnapshot, Point3, Vertex};

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// A `size` x `size` grid of quads split into strips along the X axis.
///
/// Every strip owns its own copy of the vertices on its upper edge, so the
/// grid carries a UV seam between every pair of rows.
fn create_seamed_grid(size: u32) -> MeshSnapshot {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    for row in 0..size {
        let base = vertices.len() as u32;
        for y in [row, row + 1] {
            for x in 0..=size {
                vertices.push(Vertex::from_coords(f64::from(x), f64::from(y), 0.0));
            }
        }

        let stride = size + 1;
        for x in 0..size {
            let a = base + x;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            faces.push([a, b, d]);
            faces.push([a, d, c]);
        }
    }

    MeshSnapshot::from_faces(vertices, &faces)
}

// =============================================================================
// Overlap Benchmarks
// =============================================================================

fn bench_overlaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("Overlaps");

    let test_cases = [
        ("grid_8", create_seamed_grid(8)),
        ("grid_16", create_seamed_grid(16)),
        ("grid_32", create_seamed_grid(32)),
    ];

    for (name, mesh) in &test_cases {
        group.throughput(Throughput::Elements(mesh.vertex_count() as u64));

        for strategy in [OverlapStrategy::BruteForce, OverlapStrategy::SpatialHash] {
            let id = BenchmarkId::new(format!("{strategy:?}"), name);
            group.bench_with_input(id, mesh, |b, mesh| {
                b.iter(|| OverlapSets::detect(black_box(mesh), 1e-7, strategy, true));
            });
        }
    }

    group.finish();
}

// =============================================================================
// Walk Benchmarks
// =============================================================================

fn bench_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("Walk");

    let test_cases = [
        ("grid_16", create_seamed_grid(16)),
        ("grid_32", create_seamed_grid(32)),
    ];

    for (name, mesh) in &test_cases {
        group.throughput(Throughput::Elements(mesh.vertex_count() as u64));

        let overlaps = OverlapSets::detect(mesh, 1e-7, OverlapStrategy::SpatialHash, true);
        group.bench_with_input(BenchmarkId::new("walk", name), mesh, |b, mesh| {
            b.iter(|| {
                let topology = MeshTopologyIndex::build(mesh).unwrap();
                let mut walker = FlowWalker::new(topology, overlaps.clone());
                walker.seed(&[Point3::origin()], &Matrix4::identity());
                walker.walk()
            });
        });
    }

    group.finish();
}

// =============================================================================
// Full Bake Benchmarks
// =============================================================================

fn bench_bake(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bake");

    let mesh = create_seamed_grid(24);
    group.throughput(Throughput::Elements(mesh.vertex_count() as u64));

    let cases = [
        ("sequential", FlowParams::sequential()),
        ("parallel", FlowParams::default()),
        ("dense", FlowParams::for_dense_meshes()),
    ];

    for (name, params) in &cases {
        group.bench_with_input(BenchmarkId::new("bake", name), params, |b, params| {
            b.iter(|| bake(black_box(&mesh), &[Point3::origin()], params).unwrap());
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(benches, bench_overlaps, bench_walk, bench_bake);

criterion_main!(benches);
