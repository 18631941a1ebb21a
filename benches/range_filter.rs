use std::sync::Arc;

use criterion::{black_box, BenchmarkId, Criterion};
use criterion::{criterion_group, criterion_main};

use nanotick::column::{FlatStorage, TimestampColumn, TimestampSource};
use nanotick::time::SECOND;
use nanotick::{RowSet, SortOrder, Timestamp, TimestampRangeFilter};

fn ts(nanos: i64) -> Timestamp {
    Timestamp::try_from_nanos(nanos).expect("valid nanos")
}

fn bench_range_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_filter");
    for &rows in &[10_000_i64, 1_000_000] {
        let values: Vec<i64> = (0..rows).map(|i| i * SECOND).collect();
        let column: Arc<dyn TimestampSource> = Arc::new(
            TimestampColumn::from_storage(FlatStorage::from_raw(values)).expect("flat"),
        );
        let selection = RowSet::from_range(0, rows as u64 - 1);
        let filter = TimestampRangeFilter::new("Ts", ts(rows / 4 * SECOND), ts(rows / 2 * SECOND))
            .with_inclusivity(true, false);

        for order in [SortOrder::Ascending, SortOrder::Unsorted] {
            group.bench_with_input(
                BenchmarkId::new(order.to_string(), rows),
                &selection,
                |b, selection| {
                    b.iter(|| {
                        let result = filter
                            .filter(black_box(selection), &column, false, order)
                            .expect("filter");
                        black_box(result.size())
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_range_filter);
criterion_main!(benches);
