use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use one_brc_chunked::{aggregate_source, baseline, Config};

const STATIONS: &[&str] = &[
    "Adelaide", "Bangkok", "Chihuahua", "Dodoma", "Edinburgh", "Fairbanks", "Guatemala City",
    "Hamburg", "Istanbul", "Jakarta", "Kyiv", "Luanda", "Mandalay", "Nouakchott", "Oulu",
    "Palermo", "Quezon City", "Reykjavík", "São Paulo", "Tegucigalpa",
];

fn measurements(lines: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut out = Vec::with_capacity(lines * 16);
    for _ in 0..lines {
        let name = STATIONS[rng.gen_range(0..STATIONS.len())];
        let v: i32 = rng.gen_range(-999..=999);
        let sign = if v < 0 { "-" } else { "" };
        writeln!(out, "{};{}{}.{}", name, sign, v.abs() / 10, v.abs() % 10).unwrap();
    }
    out
}

pub fn benchmark(c: &mut Criterion) {
    let input = measurements(1_000_000);
    let len = input.len() as u64;

    let mut group = c.benchmark_group("1brc");
    group.throughput(Throughput::Bytes(len));
    group.sample_size(10);

    group.bench_function("baseline", |b| {
        b.iter(|| black_box(baseline::aggregate(&input).unwrap()))
    });
    for workers in [1, 4] {
        let config = Config {
            workers,
            ..Config::default()
        };
        group.bench_function(format!("chunked_{workers}"), |b| {
            b.iter(|| black_box(aggregate_source(&input, len, &config).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
