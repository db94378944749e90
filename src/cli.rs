use crate::constants::DEFAULT_GHOSTSCRIPT;
use crate::tier::CompressionTier;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "doc-squeeze",
    about = "Shrink folders of scanned documents: JPEG/PNG images and PDFs",
    long_about = "doc-squeeze walks a folder tree, recompresses every JPEG, PNG and PDF it finds \
                  and reports the space saved. PDFs go through Ghostscript when it is installed \
                  and through a lighter in-process rewrite otherwise. By default the originals \
                  are left alone and compressed copies are written to a mirrored destination.",
    version,
    after_help = "EXAMPLES:\n  \
    doc-squeeze run ./receipts -d ./receipts-small\n  \
    doc-squeeze run ./receipts -d ./receipts-small -t strong\n  \
    doc-squeeze run ./receipts --in-place --yes -t light\n  \
    doc-squeeze check"
)]
pub struct Args {
    #[arg(short = 'q', long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, global = true, help = "Print per-file details")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress every image and PDF under a folder",
        long_about = "Recursively compress .jpg, .jpeg, .png and .pdf files (any letter case). \
                      Files are processed one at a time; a file that fails is reported and \
                      left untouched, and the batch carries on."
    )]
    Run {
        #[arg(help = "Source folder")]
        source: PathBuf,

        #[arg(
            short = 'd',
            long,
            help = "Destination folder for compressed copies",
            long_help = "Folder that receives the compressed copies, mirroring the source \
                         layout. Required unless --in-place is given."
        )]
        dest: Option<PathBuf>,

        #[arg(
            short = 't',
            long,
            default_value = "medium",
            value_parser = parse_tier,
            help = "Compression tier: light, medium or strong",
            long_help = "light: image quality 90, PDFs at 150 DPI (printer preset)\n\
                         medium: image quality 75, PDFs at 120 DPI (ebook preset)\n\
                         strong: image quality 50, PDFs at 90 DPI (screen preset)"
        )]
        tier: CompressionTier,

        #[arg(
            long,
            conflicts_with = "dest",
            help = "Overwrite the original files instead of writing copies"
        )]
        in_place: bool,

        #[arg(short = 'y', long, help = "Do not ask before overwriting originals")]
        yes: bool,

        #[arg(
            long,
            default_value = DEFAULT_GHOSTSCRIPT,
            help = "Ghostscript executable"
        )]
        gs: PathBuf,

        #[arg(
            long,
            value_name = "SECS",
            help = "Kill Ghostscript if one PDF takes longer than this"
        )]
        gs_timeout: Option<u64>,
    },

    #[command(about = "Check whether Ghostscript is available for PDF compression")]
    Check {
        #[arg(long, default_value = DEFAULT_GHOSTSCRIPT, help = "Ghostscript executable")]
        gs: PathBuf,
    },

    #[command(about = "List the compression tiers")]
    Tiers,
}

fn parse_tier(value: &str) -> Result<CompressionTier, String> {
    value.parse().map_err(|e: crate::error::CompressionError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let args = Args::try_parse_from(["doc-squeeze", "run", "in", "-d", "out"]).unwrap();
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
                assert_eq!(source, PathBuf::from("in"));
                assert_eq!(dest, Some(PathBuf::from("out")));
                assert_eq!(tier, CompressionTier::Medium);
                assert!(!in_place);
                assert!(!yes);
                assert_eq!(gs, PathBuf::from(DEFAULT_GHOSTSCRIPT));
                assert_eq!(gs_timeout, None);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_in_place_conflicts_with_dest() {
        let result =
            Args::try_parse_from(["doc-squeeze", "run", "in", "-d", "out", "--in-place"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_tier_is_rejected() {
        let result = Args::try_parse_from(["doc-squeeze", "run", "in", "-t", "maximum"]);
        assert!(result.is_err());
    }
}
