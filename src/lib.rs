pub mod batch;
pub mod cli;
pub mod constants;
pub mod error;
pub mod image_compressor;
pub mod ledger;
pub mod logger;
pub mod pdf;
pub mod tier;
pub mod utils;

pub use batch::{
    collect_files, compress_directory, is_supported_file, scan_source, BatchConfig, BatchEvent,
    BatchRunner, BatchState, CompressionPathway, FileKind, FileTask, SourceScan,
};
pub use error::{CompressionError, Result};
pub use image_compressor::compress_image;
pub use ledger::{BatchSummary, CompressionOutcome, SizeLedger};
pub use pdf::{compress_pdf_fallback, Ghostscript, PdfCompressor, PdfPreset, PdfStrategy};
pub use tier::CompressionTier;
