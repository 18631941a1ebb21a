use std::sync::Arc;

use nanotick::column::{
    ColumnDefinition, DataKind, DenseStorage, ExternalBlock, ExternalStorage, LongAsTimestamp,
    LongColumn, TableDefinition, TimestampColumn,
};
use nanotick::column::external::BlockLoader;
use nanotick::{Error, RowSet, SortOrder, Timestamp, TimestampRangeFilter, TimestampSource};
use proptest::prelude::*;

fn ts(nanos: i64) -> Timestamp {
    Timestamp::try_from_nanos(nanos).expect("valid nanos")
}

fn dense_source(values: &[Option<i64>]) -> Arc<dyn TimestampSource> {
    let values: Vec<Option<Timestamp>> = values.iter().map(|v| v.map(ts)).collect();
    Arc::new(TimestampColumn::from_storage(DenseStorage::from_timestamps(&values)).expect("column"))
}

fn all_rows(len: usize) -> RowSet {
    if len == 0 {
        RowSet::empty()
    } else {
        RowSet::from_range(0, len as u64 - 1)
    }
}

fn reference(
    values: &[Option<i64>],
    selection: &RowSet,
    filter: &TimestampRangeFilter,
) -> Vec<u64> {
    let (lo, hi) = (filter.lower().nanos(), filter.upper().nanos());
    selection
        .iter()
        .filter(|&key| match values[key as usize] {
            None => false,
            Some(v) => {
                let above = if filter.lower_inclusive() { v >= lo } else { v > lo };
                let below = if filter.upper_inclusive() { v <= hi } else { v < hi };
                above && below
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn linear_scan_matches_reference(
        values in prop::collection::vec(prop::option::weighted(0.9, -50_i64..50), 0..300),
        lower in -60_i64..60,
        width in 0_i64..60,
        lower_inclusive in any::<bool>(),
        upper_inclusive in any::<bool>(),
        chunk in 1_usize..64,
    ) {
        let filter = TimestampRangeFilter::new("Ts", ts(lower), ts(lower + width))
            .with_inclusivity(lower_inclusive, upper_inclusive)
            .with_chunk_size(chunk);
        let source = dense_source(&values);
        let selection: RowSet = (0..values.len() as u64).filter(|k| k % 3 != 1).collect();

        let matched = filter
            .filter(&selection, &source, false, SortOrder::Unsorted)
            .expect("filter");
        let expected = reference(&values, &selection, &filter);
        prop_assert_eq!(matched.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn sorted_search_agrees_with_linear_scan(
        mut values in prop::collection::vec(prop::option::weighted(0.9, -50_i64..50), 0..300),
        lower in -60_i64..60,
        width in 0_i64..60,
        lower_inclusive in any::<bool>(),
        upper_inclusive in any::<bool>(),
        descending in any::<bool>(),
    ) {
        // Nulls sort below every value, as the raw sentinel does.
        values.sort();
        let order = if descending {
            values.reverse();
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        };
        let filter = TimestampRangeFilter::new("Ts", ts(lower), ts(lower + width))
            .with_inclusivity(lower_inclusive, upper_inclusive);
        let source = dense_source(&values);
        let selection = all_rows(values.len());

        let sorted = filter.filter(&selection, &source, false, order).expect("sorted");
        let linear = filter
            .filter(&selection, &source, false, SortOrder::Unsorted)
            .expect("linear");
        prop_assert_eq!(sorted, linear);
    }
}

#[test]
fn previous_values_are_filtered_when_asked() {
    let column = TimestampColumn::from_storage(DenseStorage::from_timestamps(&[
        Some(ts(10)),
        Some(ts(20)),
        Some(ts(30)),
    ]))
    .expect("column");
    column.finish_cycle();
    column.set(0, Some(ts(100))).expect("set");
    column.set(2, None).expect("set");

    let source: Arc<dyn TimestampSource> = Arc::new(column);
    let filter = TimestampRangeFilter::new("Ts", ts(0), ts(50));
    let selection = all_rows(3);

    let current = filter.filter(&selection, &source, false, SortOrder::Unsorted).expect("current");
    assert_eq!(current.iter().collect::<Vec<_>>(), vec![1]);
    let prev = filter.filter(&selection, &source, true, SortOrder::Unsorted).expect("prev");
    assert_eq!(prev.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn long_backed_source_filters_without_conversion() {
    let storage = DenseStorage::from_raw(vec![5, 15, 25, 35]);
    let longs = Arc::new(LongColumn::from_storage(storage).expect("column"));
    let source: Arc<dyn TimestampSource> = Arc::new(LongAsTimestamp::new(longs));
    let filter = TimestampRangeFilter::new("Ts", ts(15), ts(35)).with_inclusivity(false, true);
    let matched = filter
        .filter(&all_rows(4), &source, false, SortOrder::Ascending)
        .expect("filter");
    assert_eq!(matched.iter().collect::<Vec<_>>(), vec![2, 3]);
}

struct Blocks(Vec<Vec<Option<Timestamp>>>);

impl BlockLoader for Blocks {
    fn row_count(&self) -> u64 {
        self.0.iter().map(|b| b.len() as u64).sum()
    }

    fn block_count(&self) -> usize {
        self.0.len()
    }

    fn locate(&self, row_key: u64) -> Option<(usize, usize)> {
        let mut start = 0_u64;
        for (index, block) in self.0.iter().enumerate() {
            let end = start + block.len() as u64;
            if row_key < end {
                return Some((index, (row_key - start) as usize));
            }
            start = end;
        }
        None
    }

    fn load_block(&self, index: usize) -> nanotick::Result<ExternalBlock> {
        Ok(ExternalBlock::from_timestamps(&self.0[index]))
    }
}

#[test]
fn external_source_is_filtered_through_conversion() {
    let storage = ExternalStorage::new(Blocks(vec![
        vec![Some(ts(1)), None, Some(ts(3))],
        vec![Some(ts(4)), Some(ts(5))],
    ]));
    let source: Arc<dyn TimestampSource> =
        Arc::new(TimestampColumn::from_storage(storage).expect("column"));
    let filter = TimestampRangeFilter::new("Ts", ts(2), ts(5)).with_inclusivity(true, false);
    let matched = filter
        .filter(&all_rows(5), &source, false, SortOrder::Unsorted)
        .expect("filter");
    assert_eq!(matched.iter().collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn init_checks_the_column_type() {
    let definition = TableDefinition::new(vec![
        ColumnDefinition::new("Ts", DataKind::Timestamp),
        ColumnDefinition::new("Size", DataKind::Long),
    ])
    .expect("definition");

    assert!(TimestampRangeFilter::new("Ts", ts(0), ts(1)).init(&definition).is_ok());
    assert!(matches!(
        TimestampRangeFilter::new("Size", ts(0), ts(1)).init(&definition),
        Err(Error::InvalidColumn(_))
    ));
    assert!(matches!(
        TimestampRangeFilter::new("Missing", ts(0), ts(1)).init(&definition),
        Err(Error::InvalidColumn(_))
    ));
}
