//! Compression tiers.
//!
//! A tier bundles the JPEG/PNG quality and the PDF target resolution used for
//! a whole batch. The values are fixed at compile time.

use crate::constants::{
    LIGHT_IMAGE_QUALITY, LIGHT_PDF_DPI, MEDIUM_IMAGE_QUALITY, MEDIUM_PDF_DPI,
    STRONG_IMAGE_QUALITY, STRONG_PDF_DPI,
};
use crate::error::CompressionError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionTier {
    /// Barely visible loss, printer-grade PDFs
    Light,
    #[default]
    Medium,
    /// Smallest output, screen-grade PDFs
    Strong,
}

impl CompressionTier {
    pub fn all() -> [CompressionTier; 3] {
        [
            CompressionTier::Light,
            CompressionTier::Medium,
            CompressionTier::Strong,
        ]
    }

    pub fn image_quality(&self) -> u8 {
        match self {
            CompressionTier::Light => LIGHT_IMAGE_QUALITY,
            CompressionTier::Medium => MEDIUM_IMAGE_QUALITY,
            CompressionTier::Strong => STRONG_IMAGE_QUALITY,
        }
    }

    pub fn pdf_resolution(&self) -> u32 {
        match self {
            CompressionTier::Light => LIGHT_PDF_DPI,
            CompressionTier::Medium => MEDIUM_PDF_DPI,
            CompressionTier::Strong => STRONG_PDF_DPI,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompressionTier::Light => "light",
            CompressionTier::Medium => "medium",
            CompressionTier::Strong => "strong",
        }
    }
}

impl fmt::Display for CompressionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CompressionTier {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" | "low" => Ok(CompressionTier::Light),
            "medium" | "normal" => Ok(CompressionTier::Medium),
            "strong" | "high" => Ok(CompressionTier::Strong),
            _ => Err(CompressionError::InvalidTier(s.to_string())),
        }
    }
}
