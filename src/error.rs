use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("PNG optimization error: {0}")]
    PngOptimization(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Malformed PDF: {0}")]
    MalformedPdf(String),

    #[error("Invalid quality value: {0}. Must be between 0 and 100")]
    InvalidQuality(u8),

    #[error("Invalid target resolution: {0} DPI. Must be positive")]
    InvalidResolution(u32),

    #[error("Unknown compression tier '{0}' (expected light, medium or strong)")]
    InvalidTier(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("Source is not a directory: {0}")]
    InvalidSource(PathBuf),

    #[error("A destination directory is required when making copies")]
    MissingDestination,

    #[error("{0} is not inside the source directory")]
    OutsideSourceRoot(PathBuf),

    #[error("Destination {0} is the source directory; copies would overwrite the originals")]
    DestinationIsSource(PathBuf),

    #[error("Failed to run {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} did not finish within {seconds}s")]
    ToolTimeout { program: String, seconds: u64 },

    #[error("No usable output produced for {0}")]
    EmptyOutput(PathBuf),

    #[error("Batch has already been started")]
    BatchAlreadyStarted,
}

pub type Result<T> = std::result::Result<T, CompressionError>;
