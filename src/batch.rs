//! Sequential batch compression of a directory tree.
//!
//! [`BatchRunner`] walks the source tree, optionally mirrors every file into a
//! destination tree, dispatches each file to the image or PDF compressor and
//! keeps a [`SizeLedger`]. Progress is reported as [`BatchEvent`]s through a
//! caller-supplied callback. One file failing never stops the batch.

use crate::constants::{GHOSTSCRIPT_INSTALL_HINTS, IMAGE_EXTENSIONS, PDF_EXTENSION};
use crate::error::{CompressionError, Result};
use crate::image_compressor::compress_image;
use crate::ledger::{BatchSummary, CompressionOutcome, SizeLedger};
use crate::pdf::{Ghostscript, PdfCompressor, PdfStrategy};
use crate::tier::CompressionTier;
use crate::utils::{file_size, format_kb};
use filetime::FileTime;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Unsupported,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
        else {
            return FileKind::Unsupported;
        };

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Image
        } else if ext == PDF_EXTENSION {
            FileKind::Pdf
        } else {
            FileKind::Unsupported
        }
    }
}

pub fn is_supported_file(path: &Path) -> bool {
    FileKind::from_path(path) != FileKind::Unsupported
}

/// One enumerated file and where its compressed bytes end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub source: PathBuf,
    /// Same as `source` when compressing in place
    pub target: PathBuf,
    pub kind: FileKind,
}

impl FileTask {
    /// Mirrors `source`'s position under `source_root` into `destination_root`.
    pub fn plan(source: &Path, source_root: &Path, destination_root: Option<&Path>) -> Result<Self> {
        let target = match destination_root {
            Some(destination) => {
                let relative = source
                    .strip_prefix(source_root)
                    .map_err(|_| CompressionError::OutsideSourceRoot(source.to_path_buf()))?;
                destination.join(relative)
            }
            None => source.to_path_buf(),
        };

        Ok(Self {
            source: source.to_path_buf(),
            target,
            kind: FileKind::from_path(source),
        })
    }

    pub fn is_copy(&self) -> bool {
        self.source != self.target
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result of walking a source tree.
#[derive(Debug, Default)]
pub struct SourceScan {
    pub files: Vec<PathBuf>,
    /// Entries the walk could not read, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Walks `root` in directory-then-name order, keeping supported files.
///
/// `exclude` prunes a subtree, used when the destination lives inside the
/// source. Entries that cannot be read are recorded and skipped; the walk
/// carries on with their siblings.
pub fn scan_source(root: &Path, exclude: Option<&Path>) -> SourceScan {
    let mut scan = SourceScan::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| exclude.map_or(true, |skip| e.path() != skip));

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_supported_file(entry.path()) {
                    scan.files.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let reason = e
                    .io_error()
                    .map(|io| io.to_string())
                    .unwrap_or_else(|| e.to_string());
                scan.unreadable.push((path, reason));
            }
        }
    }

    scan
}

/// Every supported file under `root`, in directory-then-name order.
pub fn collect_files(root: &Path, exclude: Option<&Path>) -> Vec<PathBuf> {
    scan_source(root, exclude).files
}

/// Copies `source` to `target`, creating parent directories and keeping the mtime.
pub fn mirror_copy(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|_| CompressionError::DirectoryCreationFailed(parent.to_path_buf()))?;
    }
    fs::copy(source, target)?;

    let metadata = fs::metadata(source)?;
    filetime::set_file_mtime(target, FileTime::from_last_modification_time(&metadata))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub tier: CompressionTier,
    pub make_copies: bool,
    pub ghostscript: Ghostscript,
}

impl BatchConfig {
    /// In-place compression of `source` at `tier`.
    pub fn new(source: impl Into<PathBuf>, tier: CompressionTier) -> Self {
        Self {
            source: source.into(),
            destination: None,
            tier,
            make_copies: false,
            ghostscript: Ghostscript::default(),
        }
    }

    /// Compress copies mirrored under `destination` instead of the originals.
    pub fn with_copies_in(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self.make_copies = true;
        self
    }

    pub fn with_ghostscript(mut self, ghostscript: Ghostscript) -> Self {
        self.ghostscript = ghostscript;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.source.is_dir() {
            return Err(CompressionError::InvalidSource(self.source.clone()));
        }
        if !self.make_copies {
            return Ok(());
        }

        let destination = match &self.destination {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => return Err(CompressionError::MissingDestination),
        };
        if let (Ok(src), Ok(dst)) = (self.source.canonicalize(), destination.canonicalize()) {
            if src == dst {
                return Err(CompressionError::DestinationIsSource(destination.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Finished,
}

impl BatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => BatchState::Idle,
            1 => BatchState::Running,
            _ => BatchState::Finished,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            BatchState::Idle => 0,
            BatchState::Running => 1,
            BatchState::Finished => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPathway {
    Image,
    Pdf(PdfStrategy),
    Unsupported,
}

impl fmt::Display for CompressionPathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionPathway::Image => write!(f, "image re-encode"),
            CompressionPathway::Pdf(strategy) => write!(f, "PDF via {}", strategy),
            CompressionPathway::Unsupported => write!(f, "unsupported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
        tier: CompressionTier,
    },
    NothingToCompress,
    /// Non-fatal notice, e.g. Ghostscript missing
    Advisory(String),
    FileFinished {
        path: PathBuf,
        pathway: CompressionPathway,
        outcome: CompressionOutcome,
    },
    Progress {
        processed: usize,
        total: usize,
    },
    Cancelled {
        remaining: usize,
    },
    Aborted(String),
    Finished(BatchSummary),
}

impl BatchEvent {
    /// 0-100, only for `Progress`.
    pub fn percent(&self) -> Option<f64> {
        match self {
            BatchEvent::Progress { processed, total } if *total > 0 => {
                Some(*processed as f64 * 100.0 / *total as f64)
            }
            BatchEvent::Progress { .. } => Some(100.0),
            _ => None,
        }
    }
}

impl fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchEvent::Started { total, tier } => write!(
                f,
                "Compression tier: {} (image quality {}, PDF {} DPI). Files to process: {}",
                tier,
                tier.image_quality(),
                tier.pdf_resolution(),
                total
            ),
            BatchEvent::NothingToCompress => {
                write!(f, "Nothing to compress: no images or PDFs in the source folder")
            }
            BatchEvent::Advisory(message) => write!(f, "{}", message),
            BatchEvent::FileFinished { path, outcome, .. } => {
                let name = display_name(path);
                match outcome {
                    CompressionOutcome::Compressed {
                        initial_size,
                        final_size,
                    } if final_size < initial_size => write!(
                        f,
                        "{}: {} → {} (-{})",
                        name,
                        format_kb(*initial_size),
                        format_kb(*final_size),
                        format_kb(initial_size - final_size)
                    ),
                    CompressionOutcome::Compressed { .. } => {
                        write!(f, "{}: no significant reduction", name)
                    }
                    CompressionOutcome::Failed { reason, .. } => {
                        write!(f, "{}: compression failed: {}", name, reason)
                    }
                }
            }
            BatchEvent::Progress { processed, total } => write!(
                f,
                "Progress: {}/{} ({:.0}%)",
                processed,
                total,
                self.percent().unwrap_or_default()
            ),
            BatchEvent::Cancelled { remaining } => {
                write!(f, "Compression cancelled, {} files left untouched", remaining)
            }
            BatchEvent::Aborted(message) => write!(f, "Compression aborted: {}", message),
            BatchEvent::Finished(summary) => write!(f, "{}", summary),
        }
    }
}

/// Marks the runner finished however `run` exits.
struct FinishOnDrop<'a>(&'a AtomicU8);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(BatchState::Finished.as_u8(), Ordering::SeqCst);
    }
}

/// Runs one batch. Moves Idle → Running → Finished exactly once.
///
/// `run` takes `&self` so a host can share the runner with a UI thread and
/// poll [`BatchRunner::state`] while the batch works.
#[derive(Debug)]
pub struct BatchRunner {
    config: BatchConfig,
    pdf: PdfCompressor,
    state: AtomicU8,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        let pdf = PdfCompressor::new(config.ghostscript.clone());
        Self {
            config,
            pdf,
            state: AtomicU8::new(BatchState::Idle.as_u8()),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn state(&self) -> BatchState {
        BatchState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Compresses every supported file, reporting through `on_event`.
    ///
    /// `should_continue` is polled before each file; returning `false` stops
    /// the batch early, still emitting a summary. Configuration errors are
    /// returned before anything is touched and leave the runner idle.
    pub fn run<F, C>(&self, mut on_event: F, mut should_continue: C) -> Result<BatchSummary>
    where
        F: FnMut(&BatchEvent),
        C: FnMut() -> bool,
    {
        self.config.validate()?;

        self.state
            .compare_exchange(
                BatchState::Idle.as_u8(),
                BatchState::Running.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| CompressionError::BatchAlreadyStarted)?;
        let _finish = FinishOnDrop(&self.state);

        match self.run_files(&mut on_event, &mut should_continue) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                on_event(&BatchEvent::Aborted(e.to_string()));
                Err(e)
            }
        }
    }

    fn run_files(
        &self,
        on_event: &mut dyn FnMut(&BatchEvent),
        should_continue: &mut dyn FnMut() -> bool,
    ) -> Result<BatchSummary> {
        let source_root = self.config.source.canonicalize()?;
        let destination_root = self.prepare_destination()?;

        let SourceScan { files, unreadable } =
            scan_source(&source_root, destination_root.as_deref());
        let mut ledger = SizeLedger::new();
        let unreadable_advisories = unreadable
            .iter()
            .map(|(path, reason)| unreadable_advisory(path, reason));

        if files.is_empty() {
            for advisory in unreadable_advisories {
                on_event(&BatchEvent::Advisory(advisory));
            }
            on_event(&BatchEvent::NothingToCompress);
            let summary = ledger.finish();
            on_event(&BatchEvent::Finished(summary.clone()));
            return Ok(summary);
        }

        let total = files.len();
        on_event(&BatchEvent::Started {
            total,
            tier: self.config.tier,
        });
        for advisory in unreadable_advisories {
            on_event(&BatchEvent::Advisory(advisory));
        }
        if files.iter().any(|f| FileKind::from_path(f) == FileKind::Pdf)
            && !self.pdf.ghostscript().is_available()
        {
            on_event(&BatchEvent::Advisory(ghostscript_missing_advisory(
                self.pdf.ghostscript(),
            )));
        }

        for (index, file) in files.iter().enumerate() {
            if !should_continue() {
                let remaining = total - index;
                ledger.record_skipped(remaining);
                on_event(&BatchEvent::Cancelled { remaining });
                break;
            }

            let (pathway, outcome) =
                self.process_file(file, &source_root, destination_root.as_deref());
            ledger.record(&outcome);
            on_event(&BatchEvent::FileFinished {
                path: file.clone(),
                pathway,
                outcome,
            });
            on_event(&BatchEvent::Progress {
                processed: index + 1,
                total,
            });
        }

        let summary = ledger.finish();
        on_event(&BatchEvent::Finished(summary.clone()));
        Ok(summary)
    }

    /// Creates the destination root when making copies and returns it canonicalized.
    fn prepare_destination(&self) -> Result<Option<PathBuf>> {
        let Some(destination) = self.config.destination.as_ref().filter(|_| self.config.make_copies)
        else {
            return Ok(None);
        };
        fs::create_dir_all(destination)
            .map_err(|_| CompressionError::DirectoryCreationFailed(destination.clone()))?;
        Ok(Some(destination.canonicalize()?))
    }

    fn process_file(
        &self,
        source: &Path,
        source_root: &Path,
        destination_root: Option<&Path>,
    ) -> (CompressionPathway, CompressionOutcome) {
        let pathway = match FileKind::from_path(source) {
            FileKind::Image => CompressionPathway::Image,
            FileKind::Pdf => CompressionPathway::Pdf(self.pdf.select_strategy()),
            FileKind::Unsupported => CompressionPathway::Unsupported,
        };

        let initial_size = match file_size(source) {
            Ok(size) => size,
            Err(e) => {
                return (
                    pathway,
                    CompressionOutcome::Failed {
                        initial_size: 0,
                        reason: e.to_string(),
                    },
                )
            }
        };

        let outcome = match self.compress_file(source, source_root, destination_root, pathway) {
            Ok(final_size) => CompressionOutcome::Compressed {
                initial_size,
                final_size,
            },
            Err(e) => CompressionOutcome::Failed {
                initial_size,
                reason: e.to_string(),
            },
        };
        (pathway, outcome)
    }

    /// Returns the size of the compressed target.
    fn compress_file(
        &self,
        source: &Path,
        source_root: &Path,
        destination_root: Option<&Path>,
        pathway: CompressionPathway,
    ) -> Result<u64> {
        let task = FileTask::plan(source, source_root, destination_root)?;
        if task.is_copy() {
            mirror_copy(&task.source, &task.target)?;
        }

        match pathway {
            CompressionPathway::Image => {
                compress_image(&task.target, self.config.tier.image_quality())?
            }
            CompressionPathway::Pdf(strategy) => {
                self.pdf
                    .compress_with(strategy, &task.target, self.config.tier.pdf_resolution())?
            }
            CompressionPathway::Unsupported => {
                return Err(CompressionError::UnsupportedFormat(
                    task.source.display().to_string(),
                ))
            }
        }

        file_size(&task.target)
    }
}

pub fn unreadable_advisory(path: &Path, reason: &str) -> String {
    format!("Skipped {}: could not be read ({})", path.display(), reason)
}

pub fn ghostscript_missing_advisory(ghostscript: &Ghostscript) -> String {
    format!(
        "Ghostscript ({}) is not installed or not on PATH. PDFs will only be rewritten \
         in-process, which saves far less space. Install it for better results: {}",
        ghostscript.program().display(),
        GHOSTSCRIPT_INSTALL_HINTS.join("; ")
    )
}

/// Runs a whole batch with no cancellation.
pub fn compress_directory<F>(config: BatchConfig, on_event: F) -> Result<BatchSummary>
where
    F: FnMut(&BatchEvent),
{
    BatchRunner::new(config).run(on_event, || true)
}
