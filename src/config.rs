//! Crate configuration.
//!
//! Defines the shape parameters of column storage, the filter batch size and
//! the literal defaults. Loadable from JSON; missing fields take defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::time::{DateStyle, TimeZone};
use crate::{Error, Result};

/// Largest supported region or block shift (2^30 rows).
pub const MAX_SHIFT: u32 = 30;

/// Configuration for column sources, filters and literal handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NanotickConfig {
    /// Row-key bits addressed inside one region.
    /// Default: 16 (65,536 rows per region)
    pub region_shift: u32,

    /// Row-key bits addressed inside one block of a sparse column.
    /// Default: 10 (1,024 rows per block)
    pub sparse_block_shift: u32,

    /// Row-key bits addressed inside one lazily loaded external block.
    /// Default: 12 (4,096 rows per block)
    pub external_block_shift: u32,

    /// Rows per batch on the linear filter path.
    /// Default: 4096
    pub filter_chunk_size: usize,

    /// Zone used when a literal or calendar operation names none.
    /// Default: NY
    pub default_zone: TimeZone,

    /// Field order of slash-separated dates.
    /// Default: MDY
    pub date_style: DateStyle,
}

impl Default for NanotickConfig {
    fn default() -> Self {
        Self {
            region_shift: 16,
            sparse_block_shift: 10,
            external_block_shift: 12,
            filter_chunk_size: 4096,
            default_zone: TimeZone::NY,
            date_style: DateStyle::MDY,
        }
    }
}

impl NanotickConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: NanotickConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, shift) in [
            ("region_shift", self.region_shift),
            ("sparse_block_shift", self.sparse_block_shift),
            ("external_block_shift", self.external_block_shift),
        ] {
            if shift > MAX_SHIFT {
                return Err(Error::Config(format!(
                    "{name} must be at most {MAX_SHIFT}, got {shift}"
                )));
            }
        }
        if self.filter_chunk_size == 0 {
            return Err(Error::Config("filter_chunk_size must be non-zero".into()));
        }
        Ok(())
    }
}
