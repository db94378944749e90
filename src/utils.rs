//! Utility functions for common operations
//!
//! Size formatting shared by the batch log lines and the CLI, plus the
//! temp-file plumbing every compressor uses to swap results in atomically.

use crate::constants::{KIB, MIB};
use crate::error::{CompressionError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

/// Format file size in human-readable format
///
/// # Arguments
/// * `bytes` - Size in bytes
///
/// # Returns
/// * Human-readable size string (e.g., "1.2 MB", "512 KB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Size in kilobytes with one decimal, as used in per-file lines.
pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / KIB as f64)
}

/// Batch total: KB below one MiB, MB from one MiB upwards.
pub fn format_total_saved(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    }
}

/// Calculate compression ratio as a percentage
///
/// Positive means reduction, negative means the file grew.
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}

pub fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// Creates a temp file next to `target` so the final rename stays on one filesystem.
pub fn sibling_temp_file(target: &Path) -> Result<NamedTempFile> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = format!(
        ".{}.",
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    Ok(tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?)
}

/// Swaps a fully written temp file over `target`.
///
/// Refuses empty output; the temp file is deleted when it is dropped unpersisted.
pub fn replace_with_temp(temp: NamedTempFile, target: &Path) -> Result<()> {
    if temp.as_file().metadata()?.len() == 0 {
        return Err(CompressionError::EmptyOutput(target.to_path_buf()));
    }
    temp.persist(target).map_err(|e| CompressionError::Io(e.error))?;
    Ok(())
}

/// Like [`replace_with_temp`] for a temp file some other process wrote to.
pub fn replace_with_temp_path(temp: TempPath, target: &Path) -> Result<()> {
    match fs::metadata(&temp) {
        Ok(meta) if meta.len() > 0 => {
            temp.persist(target).map_err(|e| CompressionError::Io(e.error))?;
            Ok(())
        }
        _ => Err(CompressionError::EmptyOutput(target.to_path_buf())),
    }
}

/// Renames a plain temp path over `target` after checking it is non-empty.
pub fn replace_with_path(temp: &Path, target: &Path) -> Result<()> {
    match fs::metadata(temp) {
        Ok(meta) if meta.len() > 0 => {
            fs::rename(temp, target)?;
            Ok(())
        }
        _ => Err(CompressionError::EmptyOutput(target.to_path_buf())),
    }
}

/// Removes its path on drop unless disarmed.
pub struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}
