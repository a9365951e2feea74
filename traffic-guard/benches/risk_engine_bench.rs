use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use traffic_guard::config::{RiskConfig, SummaryConfig};
use traffic_guard::logging::LogConfig;
use traffic_guard::rules::RiskEngine;
use traffic_guard::schema::AliasTable;
use traffic_guard::stats::summarize;
use traffic_guard::table::TrafficTable;

fn edge_table(n: usize) -> TrafficTable {
    let header = [
        "ClientIP",
        "ClientRequestBytes",
        "ClientCountry",
        "EdgeStartTimestamp",
    ];
    let rows = (0..n).map(|i| {
        vec![
            Some(format!("10.0.{}.{}", (i / 256) % 64, i % 256)),
            Some(((i * 7919) % 100_000).to_string()),
            Some(["us", "de", "br", "jp", "in"][i % 5].to_string()),
            Some(format!("2024-03-01 {:02}:{:02}:00", i % 24, i % 60)),
        ]
    });
    TrafficTable::from_rows(&header, rows, &AliasTable::default())
}

fn benchmark_risk_engine_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_engine_score");
    let engine = RiskEngine::standard();
    let config = RiskConfig::default();
    let log = LogConfig::production();

    for n in [1_000, 10_000, 100_000].iter() {
        let table = edge_table(*n);
        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &table, |b, table| {
            b.iter(|| engine.score(std::hint::black_box(table), &config, &log));
        });
    }

    group.finish();
}

fn benchmark_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");
    let config = SummaryConfig::default();

    for n in [1_000, 10_000, 100_000].iter() {
        let table = edge_table(*n);
        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &table, |b, table| {
            b.iter(|| summarize(std::hint::black_box(table), &config));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_risk_engine_score, benchmark_summarize);
criterion_main!(benches);
