//! PDF compression with two interchangeable strategies.
//!
//! [`PdfCompressor`] probes for Ghostscript on every call and uses it when
//! present; otherwise it falls back to an in-process rewrite that only
//! deflates page content. Either way the original survives untouched when
//! compression fails.

pub mod fallback;
pub mod ghostscript;

pub use fallback::{compress_pdf_fallback, RewriteReport};
pub use ghostscript::{Ghostscript, PdfPreset};

use crate::error::{CompressionError, Result};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStrategy {
    Ghostscript,
    Rewrite,
}

impl fmt::Display for PdfStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfStrategy::Ghostscript => write!(f, "Ghostscript"),
            PdfStrategy::Rewrite => write!(f, "stream rewrite"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfCompressor {
    ghostscript: Ghostscript,
}

impl PdfCompressor {
    pub fn new(ghostscript: Ghostscript) -> Self {
        Self { ghostscript }
    }

    pub fn ghostscript(&self) -> &Ghostscript {
        &self.ghostscript
    }

    pub fn select_strategy(&self) -> PdfStrategy {
        if self.ghostscript.is_available() {
            PdfStrategy::Ghostscript
        } else {
            PdfStrategy::Rewrite
        }
    }

    /// Probes for Ghostscript, then compresses with whichever strategy applies.
    pub fn compress(&self, path: &Path, target_dpi: u32) -> Result<PdfStrategy> {
        let strategy = self.select_strategy();
        self.compress_with(strategy, path, target_dpi)?;
        Ok(strategy)
    }

    pub fn compress_with(&self, strategy: PdfStrategy, path: &Path, target_dpi: u32) -> Result<()> {
        if target_dpi == 0 {
            return Err(CompressionError::InvalidResolution(target_dpi));
        }
        if !path.is_file() {
            return Err(CompressionError::FileNotFound(path.to_path_buf()));
        }

        match strategy {
            PdfStrategy::Ghostscript => {
                self.ghostscript.compress(path, target_dpi)?;
            }
            PdfStrategy::Rewrite => {
                compress_pdf_fallback(path)?;
            }
        }
        Ok(())
    }
}
