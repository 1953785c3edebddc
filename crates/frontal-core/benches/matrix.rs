//! Benchmarks for sparse matrix construction and products.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use frontal_core::SparseMatrix;
use nalgebra::DMatrix;

/// Triplets of the 5-point Laplacian on a k-by-k grid.
fn grid_laplacian_triplets(k: usize) -> (usize, Vec<(usize, usize, f64)>) {
    let n = k * k;
    let mut triplets = Vec::with_capacity(5 * n);
    for i in 0..k {
        for j in 0..k {
            let row = i * k + j;
            triplets.push((row, row, 4.0));
            if i > 0 {
                triplets.push((row, row - k, -1.0));
            }
            if i + 1 < k {
                triplets.push((row, row + k, -1.0));
            }
            if j > 0 {
                triplets.push((row, row - 1, -1.0));
            }
            if j + 1 < k {
                triplets.push((row, row + 1, -1.0));
            }
        }
    }
    (n, triplets)
}

fn bench_from_triplets(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_triplets");

    for k in [10, 30, 60] {
        let (n, triplets) = grid_laplacian_triplets(k);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bencher, &n| {
            bencher.iter(|| SparseMatrix::from_triplets(n, black_box(&triplets)).unwrap());
        });
    }

    group.finish();
}

fn bench_mul_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("mul_dense");

    for k in [10, 30, 60] {
        let (n, triplets) = grid_laplacian_triplets(k);
        let a = SparseMatrix::from_triplets(n, &triplets).unwrap();
        let x = DMatrix::from_fn(n, 4, |i, r| (i + r + 1) as f64);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bencher, _| {
            bencher.iter(|| a.mul_dense(black_box(&x)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_from_triplets, bench_mul_dense);
criterion_main!(benches);
