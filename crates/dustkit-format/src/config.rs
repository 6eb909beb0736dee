//! Reader and writer options.

use std::fmt;

// ── ReadOptions ─────────────────────────────────────────────────

/// Options for [`read_level_with`](crate::read_level_with).
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// Stop after the header, screenshot, variables and region directory.
    /// The returned level has no tiles, props or entities. Default: false.
    pub metadata_only: bool,
}

impl ReadOptions {
    /// Options that skip region data.
    pub fn metadata_only() -> Self {
        Self {
            metadata_only: true,
        }
    }
}

// ── WriteOptions ────────────────────────────────────────────────

/// Options for [`LevelWriter`](crate::LevelWriter).
///
/// Output bytes depend only on `compression_level`; the worker count never
/// changes the result.
#[derive(Clone, Debug)]
pub struct WriteOptions {
    /// zlib level for region bodies, `0..=9`. Default: 6.
    pub compression_level: u32,
    /// Threads encoding regions. `None` or `Some(1)` encodes on the calling
    /// thread. Default: `None`.
    pub region_workers: Option<usize>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            region_workers: None,
        }
    }
}

impl WriteOptions {
    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compression_level > 9 {
            return Err(ConfigError::InvalidCompressionLevel {
                value: self.compression_level,
            });
        }
        if self.region_workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// Number of region encoding threads to use.
    ///
    /// Explicit values are capped at the machine's available parallelism.
    pub fn resolved_worker_count(&self) -> usize {
        match self.region_workers {
            None => 1,
            Some(n) => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                n.clamp(1, cpus.max(1))
            }
        }
    }
}

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected by [`WriteOptions::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// zlib only accepts levels `0..=9`.
    InvalidCompressionLevel {
        /// The configured level.
        value: u32,
    },
    /// `region_workers` was `Some(0)`.
    ZeroWorkers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCompressionLevel { value } => {
                write!(f, "compression_level must be in 0..=9, got {value}")
            }
            Self::ZeroWorkers => write!(f, "region_workers must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}
