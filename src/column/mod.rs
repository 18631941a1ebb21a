//! Column sources over nanosecond storage.
//!
//! # Design
//!
//! Every storage tier (dense, sparse, immutable, regioned, external)
//! implements one storage-policy trait, [`NanosStorage`], in terms of raw
//! `i64` nanoseconds. Two generic views sit on top and share the storage
//! through an `Arc`:
//!
//! - [`TimestampColumn<S>`] reads `Option<Timestamp>` and implements
//!   [`TimestampSource`];
//! - [`LongColumn<S>`] reads raw `i64` and implements [`LongSource`].
//!
//! Reinterpretation between the two is a new view over the same `Arc`, never
//! a copy. The view kinds form the closed enum [`ViewKind`]; a storage tier
//! declares which kinds it supports and asking for any other fails with
//! [`Error::UnsupportedReinterpretation`].
//!
//! Mutable tiers keep a previous-value snapshot per block: the first write to
//! a block during a cycle copies the block, and `finish_cycle` drops every
//! snapshot so the current values become the previous ones.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunk::{LongChunk, RowKeyChunk, TimestampChunk};
use crate::time::{Timestamp, NULL_NANOS};
use crate::{Error, Result};

pub mod adapter;
pub mod dense;
pub mod external;
pub mod immutable;
pub mod sparse;
pub mod storage;
pub mod view;

pub use adapter::{LongAsTimestamp, TimestampAsLong};
pub use dense::DenseStorage;
pub use external::{BlockLoader, ExternalBlock, ExternalStorage};
pub use immutable::{ConstantStorage, FlatStorage, PagedStorage};
pub use sparse::SparseStorage;
pub use storage::{NanosStorage, WritableStorage};
pub use view::{LongColumn, TimestampColumn};

/// The representations a column can be viewed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Raw `i64` nanoseconds with [`NULL_NANOS`] for null.
    Long,
    /// `Option<Timestamp>`.
    Timestamp,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Long => f.write_str("long"),
            ViewKind::Timestamp => f.write_str("timestamp"),
        }
    }
}

/// Declared type of a column in a table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Long,
    Timestamp,
    Double,
    Text,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Long => "long",
            DataKind::Timestamp => "timestamp",
            DataKind::Double => "double",
            DataKind::Text => "text",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Source traits
// ============================================================================

/// Raw nanosecond view of a column.
pub trait LongSource: Send + Sync {
    fn get_long(&self, row_key: u64) -> i64;

    fn get_prev_long(&self, row_key: u64) -> i64;

    /// Like `get_long`, but a source that can fail to load reports it.
    fn try_get_long(&self, row_key: u64) -> Result<i64> {
        Ok(self.get_long(row_key))
    }

    fn try_get_prev_long(&self, row_key: u64) -> Result<i64> {
        Ok(self.get_prev_long(row_key))
    }

    fn is_immutable(&self) -> bool;

    fn fill_chunk(&self, rows: &RowKeyChunk, dest: &mut LongChunk) -> Result<()> {
        dest.prepare(rows.len())?;
        for key in rows {
            dest.push(self.get_long(key));
        }
        Ok(())
    }

    fn fill_prev_chunk(&self, rows: &RowKeyChunk, dest: &mut LongChunk) -> Result<()> {
        dest.prepare(rows.len())?;
        for key in rows {
            dest.push(self.get_prev_long(key));
        }
        Ok(())
    }

    fn reinterpret(self: Arc<Self>, kind: ViewKind) -> Result<ColumnRef>;
}

/// Typed timestamp view of a column.
pub trait TimestampSource: Send + Sync {
    fn get(&self, row_key: u64) -> Option<Timestamp>;

    fn get_prev(&self, row_key: u64) -> Option<Timestamp>;

    /// Like `get`, but a source that can fail to load reports it.
    fn try_get(&self, row_key: u64) -> Result<Option<Timestamp>> {
        Ok(self.get(row_key))
    }

    fn try_get_prev(&self, row_key: u64) -> Result<Option<Timestamp>> {
        Ok(self.get_prev(row_key))
    }

    fn is_immutable(&self) -> bool;

    fn fill_chunk(&self, rows: &RowKeyChunk, dest: &mut TimestampChunk) -> Result<()> {
        dest.prepare(rows.len())?;
        for key in rows {
            dest.push(self.get(key));
        }
        Ok(())
    }

    fn fill_prev_chunk(&self, rows: &RowKeyChunk, dest: &mut TimestampChunk) -> Result<()> {
        dest.prepare(rows.len())?;
        for key in rows {
            dest.push(self.get_prev(key));
        }
        Ok(())
    }

    fn reinterpret(self: Arc<Self>, kind: ViewKind) -> Result<ColumnRef>;
}

/// A column viewed as one of the [`ViewKind`]s.
#[derive(Clone)]
pub enum ColumnRef {
    Long(Arc<dyn LongSource>),
    Timestamp(Arc<dyn TimestampSource>),
}

impl ColumnRef {
    pub fn kind(&self) -> ViewKind {
        match self {
            ColumnRef::Long(_) => ViewKind::Long,
            ColumnRef::Timestamp(_) => ViewKind::Timestamp,
        }
    }

    pub fn reinterpret(&self, kind: ViewKind) -> Result<ColumnRef> {
        match self {
            ColumnRef::Long(source) => Arc::clone(source).reinterpret(kind),
            ColumnRef::Timestamp(source) => Arc::clone(source).reinterpret(kind),
        }
    }

    pub fn as_long(&self) -> Option<&Arc<dyn LongSource>> {
        match self {
            ColumnRef::Long(source) => Some(source),
            ColumnRef::Timestamp(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Arc<dyn TimestampSource>> {
        match self {
            ColumnRef::Timestamp(source) => Some(source),
            ColumnRef::Long(_) => None,
        }
    }

    /// The value at `row_key` as raw nanoseconds, whatever the view.
    pub fn get_raw(&self, row_key: u64) -> i64 {
        match self {
            ColumnRef::Long(source) => source.get_long(row_key),
            ColumnRef::Timestamp(source) => {
                source.get(row_key).map_or(NULL_NANOS, Timestamp::nanos)
            }
        }
    }
}

impl fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnRef({})", self.kind())
    }
}

pub(crate) fn unsupported(from: ViewKind, to: ViewKind) -> Error {
    Error::UnsupportedReinterpretation { from, to }
}

// ============================================================================
// Table definitions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub kind: DataKind,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, kind: DataKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// Fails on duplicate column names.
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::InvalidColumn(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }
}
