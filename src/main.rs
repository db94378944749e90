use anyhow::{anyhow, Result};
use clap::Parser;
use doc_squeeze::cli::{Args, Commands};
use doc_squeeze::constants::{GHOSTSCRIPT_INSTALL_HINTS, PROGRESS_BAR_TEMPLATE};
use doc_squeeze::ledger::CompressionOutcome;
use doc_squeeze::utils::{calculate_compression_ratio, format_file_size};
use doc_squeeze::{error, info, logger, verbose, warn};
use doc_squeeze::{
    BatchConfig, BatchEvent, BatchRunner, BatchSummary, CompressionTier, Ghostscript,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logger::configure(args.quiet, args.verbose);

    match args.command {
        Commands::Run {
            source,
            dest,
            tier,
            in_place,
            yes,
            gs,
            gs_timeout,
        } => {
            let ghostscript =
                Ghostscript::new(gs).with_timeout(gs_timeout.map(Duration::from_secs));
            let mut config = BatchConfig::new(source, tier).with_ghostscript(ghostscript);
            if !in_place {
                config.make_copies = true;
                config.destination = dest;
            }
            run_batch(config, in_place && !yes)
        }
        Commands::Check { gs } => Ok(check_ghostscript(&Ghostscript::new(gs))),
        Commands::Tiers => {
            list_tiers();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_batch(config: BatchConfig, ask_before_overwrite: bool) -> Result<ExitCode> {
    config.validate()?;
    if ask_before_overwrite && !confirm_overwrite()? {
        info!("Nothing was changed.");
        return Ok(ExitCode::SUCCESS);
    }

    info!("🚀 Starting compression...");
    info!("📁 Source: {:?}", config.source);
    match &config.destination {
        Some(dest) if config.make_copies => info!("📁 Destination: {:?}", dest),
        _ => info!("📁 Compressing in place"),
    }

    let start_time = Instant::now();
    let runner = BatchRunner::new(config);
    let progress = create_progress_bar();
    let (tx, rx) = mpsc::channel::<BatchEvent>();

    // the batch works on its own thread; this one only renders events
    let result = thread::scope(|scope| {
        let runner = &runner;
        let worker = scope.spawn(move || {
            runner.run(
                move |event| {
                    let _ = tx.send(event.clone());
                },
                || true,
            )
        });

        for event in rx {
            render_event(&event, &progress);
        }
        worker.join()
    });

    let summary = match result {
        Ok(outcome) => outcome?,
        Err(_) => {
            progress.abandon();
            return Err(anyhow!("compression worker panicked"));
        }
    };

    print_summary(&summary, start_time.elapsed());
    Ok(ExitCode::SUCCESS)
}

fn create_progress_bar() -> ProgressBar {
    if logger::is_quiet() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn render_event(event: &BatchEvent, progress: &ProgressBar) {
    match event {
        BatchEvent::Started { total, .. } => {
            progress.set_length(*total as u64);
            progress.suspend(|| info!("📊 {}", event));
        }
        BatchEvent::Progress { processed, .. } => {
            progress.set_position(*processed as u64);
        }
        BatchEvent::FileFinished {
            pathway, outcome, ..
        } => progress.suspend(|| {
            match outcome {
                CompressionOutcome::Failed { .. } => error!("{}", event),
                CompressionOutcome::Compressed { .. } => info!("  {}", event),
            }
            verbose!("    via {}", pathway);
        }),
        BatchEvent::Advisory(_) => progress.suspend(|| warn!("{}", event)),
        BatchEvent::Cancelled { .. } => progress.suspend(|| warn!("{}", event)),
        BatchEvent::Aborted(_) => {
            progress.abandon();
            error!("{}", event);
        }
        BatchEvent::NothingToCompress => progress.suspend(|| warn!("{}", event)),
        BatchEvent::Finished(_) => {
            progress.finish_and_clear();
            info!("✅ {}", event);
        }
    }
}

fn print_summary(summary: &BatchSummary, elapsed: Duration) {
    if summary.processed == 0 {
        return;
    }
    info!("\n📊 Batch Compression Summary:");
    info!("  📁 Files processed: {}", summary.processed);
    info!("  ✅ Compressed: {}", summary.succeeded());
    if summary.failed > 0 {
        info!("  ⚠️  Failed: {}", summary.failed);
    }
    if summary.skipped > 0 {
        info!("  ⏭️  Skipped: {}", summary.skipped);
    }
    info!(
        "  📊 Size of compressed files: {} → {}",
        format_file_size(summary.bytes_before),
        format_file_size(summary.bytes_after)
    );
    info!(
        "  🎯 Overall compression ratio: {:.1}%",
        calculate_compression_ratio(summary.bytes_before, summary.bytes_after)
    );
    info!("  ⏱️  Total time: {:.2?}", elapsed);
}

fn confirm_overwrite() -> Result<bool> {
    print!("⚠️  Original files will be overwritten. Continue? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn check_ghostscript(ghostscript: &Ghostscript) -> ExitCode {
    let program: PathBuf = ghostscript.program().to_path_buf();
    match ghostscript.version() {
        Some(version) => {
            info!("✅ Ghostscript {} is available ({:?})", version, program);
            info!("PDFs will be compressed with Ghostscript presets.");
            ExitCode::SUCCESS
        }
        None => {
            warn!("Ghostscript ({:?}) is not installed or not on PATH.", program);
            info!("PDF compression falls back to an in-process rewrite that saves far less space.");
            info!("Install Ghostscript:");
            for hint in GHOSTSCRIPT_INSTALL_HINTS {
                info!("  - {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn list_tiers() {
    info!("📋 Compression tiers:");
    for tier in CompressionTier::all() {
        let marker = if tier == CompressionTier::default() {
            " (default)"
        } else {
            ""
        };
        info!(
            "  {:<7} image quality {:>3}, PDFs at {:>3} DPI{}",
            tier.name(),
            tier.image_quality(),
            tier.pdf_resolution(),
            marker
        );
    }
}
