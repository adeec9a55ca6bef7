//! Benchmarks for the pure evaluation paths.
//!
//! Run with: cargo bench
//!
//! This benchmark suite measures:
//! - IP rule evaluation as rule sets grow
//! - Polygon and radius containment
//! - Verdict fusion

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sitegate::geofence::{contains, Point};
use sitegate::rule::{evaluate, evaluate_addr, IpRule, IpRuleSpec};
use sitegate::{decide, FilterMode, GeoVerdict, IpVerdict};
use std::net::IpAddr;

/// Generate a rule set alternating allow and deny across /8, /16 and /24 networks.
fn generate_rules(count: usize) -> Vec<IpRuleSpec> {
    (0..count)
        .map(|i| {
            let action = if i % 2 == 0 { "allow" } else { "deny" };
            let a = (i % 250) as u8;
            let cidr = match i % 3 {
                0 => format!("{}.0.0.0/8", a),
                1 => format!("10.{}.0.0/16", a),
                _ => format!("10.1.{}.0/24", a),
            };
            IpRuleSpec::new(cidr, action)
        })
        .collect()
}

/// Generate a roughly circular polygon with `n` vertices.
fn generate_polygon(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64 * std::f64::consts::TAU;
            Point::new(t.cos(), t.sin())
        })
        .collect()
}

fn bench_ip_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("ip_rules");

    for size in [10, 100, 1000] {
        let specs = generate_rules(size);
        let parsed = IpRule::parse_all(&specs);
        let addr: IpAddr = "10.1.2.3".parse().unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("from_specs", size), &specs, |b, specs| {
            b.iter(|| evaluate(black_box("10.1.2.3"), black_box(specs)))
        });
        group.bench_with_input(BenchmarkId::new("pre_parsed", size), &parsed, |b, rules| {
            b.iter(|| evaluate_addr(black_box(addr), black_box(rules)))
        });
    }

    group.finish();
}

fn bench_geofence(c: &mut Criterion) {
    let mut group = c.benchmark_group("geofence");

    for vertices in [4, 64, 1024] {
        let polygon = generate_polygon(vertices);
        group.bench_with_input(BenchmarkId::new("polygon", vertices), &polygon, |b, polygon| {
            b.iter(|| contains(black_box(Point::new(0.1, 0.2)), Some(polygon.as_slice()), None, None))
        });
    }

    group.bench_function("radius", |b| {
        b.iter(|| {
            contains(
                black_box(Point::new(13.41, 52.52)),
                None,
                Some(Point::new(13.40, 52.50)),
                Some(5000.0),
            )
        })
    });

    group.finish();
}

fn bench_decide(c: &mut Criterion) {
    c.bench_function("decide", |b| {
        b.iter(|| {
            decide(
                black_box(FilterMode::IpAndGeo),
                black_box(IpVerdict::Allow),
                black_box(GeoVerdict::Inside),
            )
        })
    });
}

criterion_group!(benches, bench_ip_rules, bench_geofence, bench_decide);
criterion_main!(benches);
