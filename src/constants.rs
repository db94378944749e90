// the JPEG encoder has no quality 0
pub const MIN_JPEG_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

// (image quality, PDF target DPI) per tier
pub const LIGHT_IMAGE_QUALITY: u8 = 90;
pub const LIGHT_PDF_DPI: u32 = 150;
pub const MEDIUM_IMAGE_QUALITY: u8 = 75;
pub const MEDIUM_PDF_DPI: u32 = 120;
pub const STRONG_IMAGE_QUALITY: u8 = 50;
pub const STRONG_PDF_DPI: u32 = 90;

// Lower bounds of the Ghostscript preset bands
pub const PRINTER_PRESET_MIN_DPI: u32 = 150;
pub const EBOOK_PRESET_MIN_DPI: u32 = 100;

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const OXIPNG_PRESET: u8 = 4;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const PDF_EXTENSION: &str = "pdf";

#[cfg(windows)]
pub const DEFAULT_GHOSTSCRIPT: &str = "gswin64c";
#[cfg(not(windows))]
pub const DEFAULT_GHOSTSCRIPT: &str = "gs";

pub const GHOSTSCRIPT_COMPATIBILITY_LEVEL: &str = "1.4";
pub const PROCESS_POLL_INTERVAL_MS: u64 = 50;

pub const FALLBACK_TEMP_SUFFIX: &str = "temp";

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * 1024;

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub const GHOSTSCRIPT_INSTALL_HINTS: &[&str] = &[
    "Windows: download the installer from https://www.ghostscript.com/download.html",
    "macOS:   brew install ghostscript",
    "Linux:   sudo apt-get install ghostscript",
];
