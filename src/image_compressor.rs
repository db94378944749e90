//! Lossy recompression of JPEG and PNG files in place.

use crate::constants::{
    LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, MAX_QUALITY, MIN_JPEG_QUALITY, OXIPNG_PRESET,
    ZOPFLI_ITERATIONS,
};
use crate::error::{CompressionError, Result};
use crate::utils::{replace_with_temp, sibling_temp_file};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use oxipng::{Deflaters, Options};
use std::io::Write;
use std::num::NonZeroU8;
use std::path::Path;

const ZOPFLI_ITERATIONS_NZ: NonZeroU8 = match NonZeroU8::new(ZOPFLI_ITERATIONS) {
    Some(n) => n,
    None => panic!("zopfli iterations must be non-zero"),
};

pub fn validate_quality(quality: u8) -> Result<()> {
    if quality > MAX_QUALITY {
        return Err(CompressionError::InvalidQuality(quality));
    }
    Ok(())
}

/// Picks the encoder from the file extension; the decoder sniffs the content.
pub fn output_format_for(path: &Path) -> Result<ImageFormat> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => Ok(ImageFormat::Jpeg),
        Some("png") => Ok(ImageFormat::Png),
        Some(other) => Err(CompressionError::UnsupportedFormat(other.to_string())),
        None => Err(CompressionError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}

/// Re-encodes the image at `path` with the given quality and swaps it in.
///
/// Images with transparency are flattened to RGB first. The new bytes are
/// written to a sibling temp file and renamed over `path`, so on any error the
/// original file is left exactly as it was.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use doc_squeeze::compress_image;
///
/// compress_image(Path::new("receipts/scan-001.jpg"), 75)?;
/// # Ok::<(), doc_squeeze::CompressionError>(())
/// ```
pub fn compress_image(path: &Path, quality: u8) -> Result<()> {
    validate_quality(quality)?;
    if !path.is_file() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }
    let format = output_format_for(path)?;

    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let img = flatten_for(img, format);

    let encoded = match format {
        ImageFormat::Jpeg => encode_jpeg(&img, quality)?,
        _ => encode_png(&img, quality)?,
    };

    let mut temp = sibling_temp_file(path)?;
    temp.write_all(&encoded)?;
    temp.flush()?;
    replace_with_temp(temp, path)
}

/// Drops alpha (and, for JPEG, anything that is not 8-bit grey or RGB).
pub fn flatten_for(img: DynamicImage, format: ImageFormat) -> DynamicImage {
    match (format, img) {
        (ImageFormat::Jpeg, img @ DynamicImage::ImageLuma8(_))
        | (ImageFormat::Jpeg, img @ DynamicImage::ImageRgb8(_)) => img,
        (ImageFormat::Jpeg, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (_, img) if img.color().has_alpha() => DynamicImage::ImageRgb8(img.to_rgb8()),
        (_, img) => img,
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.max(MIN_JPEG_QUALITY));
    img.write_with_encoder(encoder)?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;

    oxipng::optimize_from_memory(&buf, &png_options(quality))
        .map_err(|e| CompressionError::PngOptimization(e.to_string()))
}

/// PNG is lossless, so quality only selects how hard the deflater works.
pub fn png_options(quality: u8) -> Options {
    let mut options = Options::from_preset(OXIPNG_PRESET);
    options.deflate = if quality >= 90 {
        Deflaters::Zopfli {
            iterations: ZOPFLI_ITERATIONS_NZ,
        }
    } else if quality >= 70 {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };
    options
}
