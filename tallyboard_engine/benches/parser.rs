use std::{fmt::Write, hint::black_box};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tallyboard_engine::{Dashboard, ViewOptions, parser::Parser};

/// A payload shaped like a busy media server's `/metrics` endpoint.
fn payload(titles: usize) -> String {
    let mut text = String::with_capacity(titles * 256);
    text.push_str("# HELP process_cpu_seconds_total Total user and system CPU time.\n");
    text.push_str("# TYPE process_cpu_seconds_total counter\n");
    text.push_str("process_cpu_seconds_total 1843.21\n");
    text.push_str("# TYPE nodejs_eventloop_lag_seconds gauge\n");
    text.push_str("nodejs_eventloop_lag_seconds 0.0042\n");
    text.push_str("# TYPE mw_user_count gauge\n");
    text.push_str("mw_user_count 311\n");

    text.push_str("# TYPE http_request_duration_seconds histogram\n");
    for route in ["/scrape", "/providers", "/metrics", "/status"] {
        for le in ["0.05", "0.1", "0.5", "1", "+Inf"] {
            let _ = writeln!(
                text,
                "http_request_duration_seconds_bucket{{method=\"GET\",route=\"{route}\",le=\"{le}\"}} 120"
            );
        }
        let _ = writeln!(
            text,
            "http_request_duration_seconds_sum{{method=\"GET\",route=\"{route}\"}} 41.7"
        );
        let _ = writeln!(
            text,
            "http_request_duration_seconds_count{{method=\"GET\",route=\"{route}\"}} 120"
        );
    }

    text.push_str("# TYPE mw_media_watch_count counter\n");
    for i in 0..titles {
        let provider = i % 13;
        let _ = writeln!(
            text,
            "mw_media_watch_count{{tmdb_full_id=\"movie-{i}\",title=\"Title \\\"{i}\\\"\",provider_id=\"p{provider}\",success=\"{}\"}} {}",
            i % 3 != 0,
            i % 50
        );
        let _ = writeln!(
            text,
            "mw_provider_status_count{{provider_id=\"p{provider}\",status=\"success\"}} {i}"
        );
        let _ = writeln!(
            text,
            "mw_provider_hostname_count{{hostname=\"cdn{}.example\"}} 3",
            i % 40
        );
    }
    text
}

fn benchmark_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_text");
    for titles in [10, 1_000, 10_000] {
        let text = payload(titles);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(titles), &text, |b, text| {
            b.iter(|| {
                let mut parser = Parser::new();
                let results = parser.parse_text(black_box(text));
                black_box(results.iter().filter(|r| r.is_ok()).count());
            });
        });
    }
    group.finish();
}

fn benchmark_dashboard(c: &mut Criterion) {
    let text = payload(10_000);
    let options = ViewOptions::default();
    c.bench_function("dashboard_build", |b| {
        b.iter(|| black_box(Dashboard::build(black_box(&text), &options)));
    });
}

criterion_group!(benches, benchmark_parser, benchmark_dashboard);
criterion_main!(benches);
