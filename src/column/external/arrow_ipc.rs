//! Arrow record batches as external blocks, one batch per block.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, Int64Array, TimestampNanosecondArray};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;

use crate::column::external::{BlockLoader, ExternalBlock};
use crate::{Error, Result};

fn arrow_err(err: ArrowError) -> Error {
    Error::Io(std::io::Error::other(err))
}

/// Reads one nanosecond column out of a sequence of record batches.
pub struct ArrowBlockLoader {
    batches: Vec<RecordBatch>,
    column: usize,
    /// First row key of each batch.
    starts: Vec<u64>,
    row_count: u64,
}

impl ArrowBlockLoader {
    /// The named column must be `Timestamp(Nanosecond, _)` or `Int64` in every batch.
    pub fn new(batches: Vec<RecordBatch>, column: &str) -> Result<Self> {
        let mut index = None;
        let mut starts = Vec::with_capacity(batches.len());
        let mut row_count = 0_u64;
        for batch in &batches {
            let schema = batch.schema();
            let (i, field) = schema
                .column_with_name(column)
                .ok_or_else(|| Error::InvalidColumn(format!("no column '{column}' in batch")))?;
            match field.data_type() {
                DataType::Timestamp(TimeUnit::Nanosecond, _) | DataType::Int64 => {}
                other => {
                    return Err(Error::InvalidColumn(format!(
                        "column '{column}' has type {other}, expected nanosecond timestamps"
                    )))
                }
            }
            if index.is_some_and(|prev| prev != i) {
                return Err(Error::InvalidColumn(format!(
                    "column '{column}' moves between batches"
                )));
            }
            index = Some(i);
            starts.push(row_count);
            row_count += batch.num_rows() as u64;
        }
        Ok(Self {
            batches,
            column: index.unwrap_or(0),
            starts,
            row_count,
        })
    }

    pub fn from_ipc_file(path: &Path, column: &str) -> Result<Self> {
        let file = File::open(path)?;
        let reader = FileReader::try_new(file, None).map_err(arrow_err)?;
        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(arrow_err)?;
        log::debug!(
            "read {} record batches from {}",
            batches.len(),
            path.display()
        );
        Self::new(batches, column)
    }
}

fn block_from_array<A: Array>(array: &A, value: impl Fn(usize) -> i64) -> Result<ExternalBlock> {
    let len = array.len();
    let mut bits = vec![0_u8; len.div_ceil(8)];
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        if array.is_valid(i) {
            bits[i / 8] |= 1 << (i % 8);
            values.push(value(i));
        } else {
            values.push(0);
        }
    }
    ExternalBlock::new(values, Some(bits))
}

impl BlockLoader for ArrowBlockLoader {
    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn block_count(&self) -> usize {
        self.batches.len()
    }

    fn locate(&self, row_key: u64) -> Option<(usize, usize)> {
        if row_key >= self.row_count {
            return None;
        }
        // Last batch starting at or before the key; empty batches are skipped over.
        let index = self.starts.partition_point(|&start| start <= row_key) - 1;
        Some((index, (row_key - self.starts[index]) as usize))
    }

    fn load_block(&self, index: usize) -> Result<ExternalBlock> {
        let batch = self
            .batches
            .get(index)
            .ok_or_else(|| Error::InvalidArgument(format!("batch {index} out of range")))?;
        let array = batch.column(self.column);
        if let Some(ts) = array.as_any().downcast_ref::<TimestampNanosecondArray>() {
            return block_from_array(ts, |i| ts.value(i));
        }
        if let Some(longs) = array.as_any().downcast_ref::<Int64Array>() {
            return block_from_array(longs, |i| longs.value(i));
        }
        Err(Error::InvalidColumn(format!(
            "batch {index} column has type {}",
            array.data_type()
        )))
    }
}
