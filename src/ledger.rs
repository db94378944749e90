//! Byte accounting for a batch.

use crate::utils::format_total_saved;
use std::fmt;

/// Result of compressing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    Compressed { initial_size: u64, final_size: u64 },
    Failed { initial_size: u64, reason: String },
}

impl CompressionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompressionOutcome::Compressed { .. })
    }

    pub fn initial_size(&self) -> u64 {
        match self {
            CompressionOutcome::Compressed { initial_size, .. }
            | CompressionOutcome::Failed { initial_size, .. } => *initial_size,
        }
    }

    pub fn final_size(&self) -> Option<u64> {
        match self {
            CompressionOutcome::Compressed { final_size, .. } => Some(*final_size),
            CompressionOutcome::Failed { .. } => None,
        }
    }

    /// Negative when the file grew.
    pub fn bytes_saved(&self) -> Option<i64> {
        match self {
            CompressionOutcome::Compressed {
                initial_size,
                final_size,
            } => Some(*initial_size as i64 - *final_size as i64),
            CompressionOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files attempted, successful or not
    pub processed: usize,
    pub failed: usize,
    /// Files left untouched because the batch was cancelled
    pub skipped: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub bytes_saved: i64,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.processed - self.failed
    }

    pub fn has_reduction(&self) -> bool {
        self.bytes_saved > 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_reduction() {
            write!(
                f,
                "Compression finished! Total space saved: {}",
                format_total_saved(self.bytes_saved as u64)
            )?;
        } else {
            write!(f, "Compression finished! No significant reduction in size")?;
        }
        if self.failed > 0 {
            write!(f, " ({} of {} files failed)", self.failed, self.processed)?;
        }
        Ok(())
    }
}

/// Running totals across the files of one batch.
#[derive(Debug, Default)]
pub struct SizeLedger {
    summary: BatchSummary,
}

impl SizeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures count towards `processed` and `failed` but contribute no size delta.
    pub fn record(&mut self, outcome: &CompressionOutcome) {
        self.summary.processed += 1;
        match outcome {
            CompressionOutcome::Compressed {
                initial_size,
                final_size,
            } => {
                self.summary.bytes_before += initial_size;
                self.summary.bytes_after += final_size;
                self.summary.bytes_saved += *initial_size as i64 - *final_size as i64;
            }
            CompressionOutcome::Failed { .. } => {
                self.summary.failed += 1;
            }
        }
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.summary.skipped += count;
    }

    pub fn total_saved(&self) -> i64 {
        self.summary.bytes_saved
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    pub fn finish(self) -> BatchSummary {
        self.summary
    }
}
