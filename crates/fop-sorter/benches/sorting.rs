//! Sorting throughput over synthetic filter lists.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fop_sorter::{normalize, sort_text};

/// Generate a list with `n` rules per section across mixed sections.
fn generate_list(n: usize) -> String {
    let mut out = String::from("[Adblock Plus 2.0]\n! Title: bench\n");
    for i in (0..n).rev() {
        out.push_str(&format!("*||ads{i}.example.com^$Script,Third_Party,domain=site{}.com\n", i % 7));
    }
    out.push_str("! Element rules\n");
    for i in (0..n).rev() {
        out.push_str(&format!("site{}.com,~sub{i}.site.com##DIV > *.Banner-{}\n", i % 11, i % 13));
    }
    out
}

fn bench_sort_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_text");
    for size in [100, 1_000, 10_000] {
        let list = generate_list(size);
        group.throughput(Throughput::Bytes(list.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &list, |b, list| {
            b.iter(|| sort_text(black_box(list)))
        });
    }
    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let lines = [
        "*||ads.example.com^$Script,~IMAGE,image,domain=b.com|a.com",
        "B.com,a.com,~c.a.com##DIV > *.Ad:First-Child",
        "example.com##TABLE TD[Title=\"Ad\"]",
    ];
    c.bench_function("normalize", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(normalize(black_box(line)));
            }
        })
    });
}

criterion_group!(benches, bench_sort_text, bench_normalize);
criterion_main!(benches);
