//! Version comparison benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use corten_vercmp::{compare, satisfies, Relation};

const PAIRS: &[(&str, &str)] = &[
    ("1.0", "1.0"),
    ("1.2.3", "1.2.4"),
    ("2:1.0-3", "2:1.0-4"),
    ("1.10.0", "1.9.27"),
    ("4.2.0-0.fc38", "4.2.0-1.fc38"),
    ("1.0rc1", "1.0"),
];

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("vercmp");

    group.bench_function("compare", |b| {
        b.iter(|| {
            for (a, bv) in PAIRS {
                black_box(compare(black_box(a), black_box(bv)));
            }
        });
    });

    group.bench_function("satisfies", |b| {
        b.iter(|| {
            for (a, bv) in PAIRS {
                black_box(satisfies(
                    black_box(a),
                    Relation::GreaterEqual,
                    black_box(bv),
                ));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_compare);
criterion_main!(benches);
