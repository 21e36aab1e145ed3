//! Configuration for Strata
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StrataError};

/// Main configuration for a Strata instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Backing file holding every page of every stream and collection.
    /// Created if absent.
    pub path: PathBuf,

    /// Page alignment in bytes. `None` uses the file system's preferred
    /// block size of the backing file.
    pub block_size: Option<u64>,

    // -------------------------------------------------------------------------
    // Mapping Configuration
    // -------------------------------------------------------------------------
    /// Mappings are sized to multiples of this so that small file growth
    /// does not remap every time.
    pub mmap_growth_unit: u64,

    /// What to do when the backing file cannot be mapped
    pub map_failure_policy: MapFailurePolicy,

    // -------------------------------------------------------------------------
    // Stream Configuration
    // -------------------------------------------------------------------------
    /// A new stream page is sized for roughly this many rows of the row
    /// that triggered the allocation.
    pub rows_per_page_hint: u64,

    // -------------------------------------------------------------------------
    // Collection Configuration
    // -------------------------------------------------------------------------
    /// Minimum size of a page reserved for document placement
    pub index_initial_page_size: u64,
}

/// Policy for unexpected mapping failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapFailurePolicy {
    /// Log and abort the process (unrecoverable environment failure)
    #[default]
    Abort,

    /// Surface `StrataError::Map` and let the caller decide whether to retry
    ReturnError,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./strata.db"),
            block_size: None,
            mmap_growth_unit: 1024 * 1024, // 1 MB
            map_failure_policy: MapFailurePolicy::Abort,
            rows_per_page_hint: 100,
            index_initial_page_size: 65535,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values that would otherwise produce degenerate pages
    pub fn validate(&self) -> Result<()> {
        if let Some(block_size) = self.block_size {
            if block_size == 0 || !block_size.is_power_of_two() {
                return Err(StrataError::Config(format!(
                    "block size must be a non-zero power of two, got {}",
                    block_size
                )));
            }
        }
        if self.mmap_growth_unit == 0 {
            return Err(StrataError::Config(
                "mmap growth unit must be non-zero".to_string(),
            ));
        }
        if self.rows_per_page_hint == 0 {
            return Err(StrataError::Config(
                "rows per page hint must be non-zero".to_string(),
            ));
        }
        if self.index_initial_page_size == 0 {
            return Err(StrataError::Config(
                "initial index page size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Force a page alignment instead of the file system block size
    pub fn block_size(mut self, size: u64) -> Self {
        self.config.block_size = Some(size);
        self
    }

    /// Set the mapping growth unit (in bytes)
    pub fn mmap_growth_unit(mut self, size: u64) -> Self {
        self.config.mmap_growth_unit = size;
        self
    }

    /// Set the mapping failure policy
    pub fn map_failure_policy(mut self, policy: MapFailurePolicy) -> Self {
        self.config.map_failure_policy = policy;
        self
    }

    /// Set how many rows a fresh stream page should fit
    pub fn rows_per_page_hint(mut self, rows: u64) -> Self {
        self.config.rows_per_page_hint = rows;
        self
    }

    /// Set the minimum document page size (in bytes)
    pub fn index_initial_page_size(mut self, size: u64) -> Self {
        self.config.index_initial_page_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
