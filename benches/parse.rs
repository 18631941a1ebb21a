use criterion::{black_box, Criterion};
use criterion::{criterion_group, criterion_main};

use nanotick::time::format::format_timestamp;
use nanotick::time::literal::detect_literal;
use nanotick::time::parse::{parse_nanos, parse_timestamp};
use nanotick::TimeZone;

const LITERALS: &[&str] = &[
    "2013-01-15T09:30:00.123 NY",
    "2013-01-15T14:30:00.123456789Z",
    "2013-01-15",
    "1WT1H",
    "1Y2M",
    "L09:30:00",
    "not a literal",
];

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_timestamp_zoned", |b| {
        b.iter(|| parse_timestamp(black_box("2013-01-15T09:30:00.123456 NY")).expect("parse"))
    });
    c.bench_function("parse_nanos_duration", |b| {
        b.iter(|| parse_nanos(black_box("2T12:30:15.000000001")).expect("parse"))
    });
    c.bench_function("detect_literal_mix", |b| {
        b.iter(|| {
            LITERALS
                .iter()
                .filter(|s| detect_literal(black_box(s)).is_some())
                .count()
        })
    });
    let t = parse_timestamp("2013-01-15T09:30:00.123456 NY").expect("parse");
    c.bench_function("format_timestamp", |b| {
        b.iter(|| format_timestamp(black_box(t), TimeZone::NY))
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
