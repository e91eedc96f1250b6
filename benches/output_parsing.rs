//! Benchmarks for alembic output parsing and duration parsing.

use alembic_provider::engine::{
    AlembicOutputParser, MigrationTarget, OutputParser, RevisionResolver, parse_duration,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// `alembic show head` output preceded by `lines` lines of log noise.
fn show_output(lines: usize) -> String {
    let mut out = String::new();
    for i in 0..lines {
        out.push_str(&format!("INFO  [alembic.runtime.migration] Context line {}\n", i));
    }
    out.push_str("Rev: 9f3ab2c41d07 (head)\nParent: 1a2b3c4d5e6f\nPath: versions/9f3ab2c41d07_add_users.py\n");
    out
}

/// Benchmark resolving a symbolic target.
fn bench_resolve_target(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_target");
    let resolver = RevisionResolver::new(AlembicOutputParser);
    let target = MigrationTarget::parse("head");

    for lines in [0usize, 50, 1000] {
        let output = show_output(lines);
        group.throughput(Throughput::Bytes(output.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &output, |b, output| {
            b.iter(|| black_box(resolver.resolve_target(&target, output)))
        });
    }

    group.finish();
}

/// Benchmark parsing `alembic current` output.
fn bench_current_revision(c: &mut Criterion) {
    let parser = AlembicOutputParser;
    c.bench_function("current_revision", |b| {
        b.iter(|| black_box(parser.current_revision("9f3ab2c41d07 (head)\n")))
    });
}

/// Benchmark duration parsing.
fn bench_durations(c: &mut Criterion) {
    let mut group = c.benchmark_group("durations");

    for input in ["PT5S", "P1DT2H30M", "P1Y2M3DT4H5M6.5S", "garbage"] {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| black_box(parse_duration(input)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve_target, bench_current_revision, bench_durations);
criterion_main!(benches);
