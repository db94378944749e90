//! In-process PDF rewrite used when Ghostscript is not installed.
//!
//! Rebuilds the document page by page and deflates page content streams.
//! Embedded images are left at their original resolution and quality, so the
//! savings are usually small compared to the Ghostscript path and a file may
//! come out no smaller at all.

use crate::constants::FALLBACK_TEMP_SUFFIX;
use crate::error::{CompressionError, Result};
use crate::utils::{replace_with_path, TempFileGuard};
use lopdf::{Document, Object};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteReport {
    pub pages: usize,
    pub streams_compressed: usize,
    pub kept_metadata: bool,
}

/// `<path>.temp`, next to the original.
pub fn fallback_temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(FALLBACK_TEMP_SUFFIX);
    PathBuf::from(name)
}

pub fn compress_pdf_fallback(path: &Path) -> Result<RewriteReport> {
    let guard = TempFileGuard::new(fallback_temp_path(path));

    let mut doc = Document::load(path)?;
    if doc.is_encrypted() {
        return Err(CompressionError::MalformedPdf(
            "encrypted documents are not rewritten".to_string(),
        ));
    }
    let report = rebuild(&mut doc)?;

    doc.save(guard.path())?;
    // the rewrite must still parse before it may replace anything
    Document::load(guard.path())?;

    replace_with_path(guard.path(), path)?;
    guard.disarm();
    Ok(report)
}

/// Walks the page tree in order, deflating each page's content streams, then
/// drops unreachable objects. The trailer (and with it `/Info`) is kept.
pub fn rebuild(doc: &mut Document) -> Result<RewriteReport> {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(CompressionError::MalformedPdf(
            "document has no pages".to_string(),
        ));
    }

    let mut streams_compressed = 0;
    for page_id in pages.values() {
        for content_id in doc.get_page_contents(*page_id) {
            if let Ok(Object::Stream(stream)) = doc.get_object_mut(content_id) {
                let was_filtered = stream.dict.has(b"Filter");
                let _ = stream.compress();
                if !was_filtered && stream.dict.has(b"Filter") {
                    streams_compressed += 1;
                }
            }
        }
    }

    let kept_metadata = doc.trailer.get(b"Info").is_ok();
    doc.prune_objects();
    doc.renumber_objects();

    Ok(RewriteReport {
        pages: pages.len(),
        streams_compressed,
        kept_metadata,
    })
}
