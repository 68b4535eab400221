//! sxm-info - inspect Nanonis SXM scan files.
//!
//! A thin wrapper around the decoder: loads one file and prints its header
//! keys, channel table and grid shapes, or a JSON summary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nanonis_sxm::{CalibrationMode, LoadOptions, ScanDirection, SpmImage};

/// Inspect Nanonis SXM scanning probe microscopy files.
#[derive(Parser, Debug)]
#[command(name = "sxm-info")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the .sxm file.
    file: PathBuf,

    /// Parse the header only; skip the binary sample grids.
    #[arg(long, env = "SXM_HEADER_ONLY")]
    header_only: bool,

    /// Print a JSON summary instead of the text tables.
    #[arg(long)]
    json: bool,

    /// Apply the per-channel calibration transform to raw samples.
    #[arg(long)]
    apply_calibration: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// JSON summary of a decoded file.
#[derive(Serialize)]
struct Summary<'a> {
    file: &'a str,
    scan_pixels: [u32; 2],
    scan_size: [f64; 2],
    scan_direction: ScanDirection,
    bias: Option<f64>,
    comment: Option<&'a str>,
    channels: &'a nanonis_sxm::ChannelTable,
    header_keys: Vec<&'a str>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = LoadOptions {
        // The text tables double as the verbose dump.
        verbose: !cli.json,
        header_only: cli.header_only,
        calibration: if cli.apply_calibration {
            CalibrationMode::Apply
        } else {
            CalibrationMode::Stored
        },
    };

    let image = match SpmImage::load_with(&cli.file, options) {
        Ok(image) => image,
        Err(e) => {
            error!("failed to decode {}: {e}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        let file = cli.file.to_string_lossy();
        let summary = Summary {
            file: &file,
            scan_pixels: image.scan_pixels(),
            scan_size: image.scan_size(),
            scan_direction: image.scan_direction(),
            bias: image.header().bias(),
            comment: image.header().comment(),
            channels: image.channels(),
            header_keys: image.header().keys().collect(),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("failed to serialize summary: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        let [columns, rows] = image.scan_pixels();
        let [width, height] = image.scan_size();
        println!(
            "{}: {columns}x{rows} px, {width:.3e}x{height:.3e} m, scan {:?}",
            cli.file.display(),
            image.scan_direction()
        );
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "nanonis_sxm=debug,sxm_info=debug"
    } else {
        "nanonis_sxm=warn,sxm_info=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
