use criterion::BenchmarkId;
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flamecache::region::Region;
use flamecache::tree::CallTree;

fn random_stacks(count: usize) -> Vec<(Vec<String>, u64)> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..count)
        .map(|_| {
            let depth = rng.gen_range(1..32);
            let stack = (0..depth)
                .map(|_| format!("frame_{}", rng.gen_range(0..64)))
                .collect();
            (stack, rng.gen_range(1..100))
        })
        .collect()
}

pub fn benchmark_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("CallTree::insert");
    for count in [1_000, 10_000] {
        let stacks = random_stacks(count);

        group.bench_with_input(BenchmarkId::new("heap", count), &stacks, |b, stacks| {
            b.iter(|| {
                let mut tree = CallTree::new();
                for (stack, weight) in stacks {
                    tree.insert(stack, *weight).unwrap();
                }
                tree
            })
        });
        group.bench_with_input(BenchmarkId::new("region", count), &stacks, |b, stacks| {
            let mut region = Region::new();
            b.iter(|| {
                region.reset();
                let mut tree = region.new_tree();
                for (stack, weight) in stacks {
                    tree.insert(stack, *weight).unwrap();
                }
                tree.total()
            })
        });
    }
    group.finish();
}

pub fn benchmark_merge(c: &mut Criterion) {
    let stacks = random_stacks(10_000);
    let (left, right) = stacks.split_at(stacks.len() / 2);
    let mut other = CallTree::new();
    for (stack, weight) in right {
        other.insert(stack, *weight).unwrap();
    }

    c.bench_function("CallTree::merge", |b| {
        b.iter(|| {
            let mut tree = CallTree::new();
            for (stack, weight) in left {
                tree.insert(stack, *weight).unwrap();
            }
            tree.merge(&other).unwrap();
            tree
        })
    });
}

criterion_group!(benches, benchmark_insert, benchmark_merge);
criterion_main!(benches);
