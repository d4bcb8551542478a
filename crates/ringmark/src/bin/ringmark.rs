use std::path::{Path, PathBuf};

use clap::Parser;
use ringmark::core::FrameSource;
use ringmark::detect::{frame_to_image, rgb_frame, DetectError, ImageSequence};
use ringmark::detector::io::{FrameReport, RingDetectConfig, RingDetectReport};
use ringmark::{MarkerDetection, RingDetectError, RingDetector};

#[cfg(not(feature = "tracing"))]
use log::{info, warn};
#[cfg(feature = "tracing")]
use tracing::{info, warn};

#[cfg(feature = "tracing")]
use ringmark::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use ringmark::core::{init_with_level, parse_level};

/// Detect a concentric-ring marker in every frame of an image sequence.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config with the image list and detector parameters
    config: PathBuf,

    /// Extra images appended to the configured sequence
    #[arg(short, long, num_args = 1..)]
    images: Vec<PathBuf>,

    /// Report path, overrides `output_path` from the config
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for overlay PNGs, overrides `overlay_dir` from the config
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Search every frame from the top-left corner
    #[arg(long)]
    no_tracking: bool,

    /// Inner/outer diameter ratio of the printed marker
    #[arg(long)]
    diameter_ratio: Option<f32>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON (tracing builds only)
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    #[cfg(not(feature = "tracing"))]
    {
        init_with_level(parse_level(&args.log_level))?;
        if args.json_logs {
            warn!("--json-logs needs the `tracing` feature; using plain logs");
        }
    }
    #[cfg(feature = "tracing")]
    init_tracing(args.json_logs);

    run(&args)
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(args)))]
fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = RingDetectConfig::load_json(&args.config)?;
    apply_overrides(&mut cfg, args);

    let params = cfg.build_params();
    let mut sequence = ImageSequence::open(&cfg.images)?;
    let (width, height) = sequence.frame_size();
    let mut detector = RingDetector::new(width, height, params)?;
    if let Some(ratio) = args.diameter_ratio {
        detector.set_diameter_ratio(ratio)?;
    }
    info!("processing {} frames of {width}x{height}", sequence.len());

    let overlay_dir = cfg.overlay_dir.as_ref().map(PathBuf::from);
    if let Some(dir) = &overlay_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut report = RingDetectReport::new(&args.config, width, height, detector.params().clone());
    let mut detections: Vec<MarkerDetection> = Vec::new();
    let mut index = 0usize;
    while let Some(path) = sequence.next_path().map(Path::to_path_buf) {
        let name = path.to_string_lossy().into_owned();
        let frame_report = match detector.run_once(&mut sequence, &mut detections) {
            Ok(det) => {
                let mut frame_report = FrameReport::from_detector(&name, &detector);
                if !det.valid {
                    warn!("{name}: no marker");
                }
                if let Some(dir) = &overlay_dir {
                    frame_report.overlay_path = write_overlay(&detector, &sequence, dir, index)?;
                }
                frame_report
            }
            Err(err) => {
                warn!("{name}: {err}");
                FrameReport::failed(&name, source_message(&err))
            }
        };
        report.push(frame_report);
        index += 1;
    }

    info!("marker found in {} of {} frames", report.detected, report.frames.len());
    let output_path = cfg.output_path();
    report.write_json(&output_path)?;
    println!("wrote report JSON to {}", output_path.display());
    Ok(())
}

fn apply_overrides(cfg: &mut RingDetectConfig, args: &Args) {
    cfg.images
        .extend(args.images.iter().map(|p| p.to_string_lossy().into_owned()));
    if let Some(output) = &args.output {
        cfg.output_path = Some(output.to_string_lossy().into_owned());
    }
    if let Some(dir) = &args.overlay_dir {
        cfg.overlay_dir = Some(dir.to_string_lossy().into_owned());
    }
    if args.no_tracking {
        cfg.detector.tracking = false;
    }
}

/// Paint the last frame's segmentation; `None` when nothing was drawn.
fn write_overlay(
    detector: &RingDetector,
    sequence: &ImageSequence,
    dir: &Path,
    index: usize,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let Some(img) = sequence.current() else {
        return Ok(None);
    };
    let mut frame = rgb_frame(img)?;
    if !detector.draw_overlay(&mut frame)? {
        return Ok(None);
    }
    let Some(out) = frame_to_image(&frame) else {
        return Ok(None);
    };
    let path = dir.join(format!("overlay_{index:04}.png"));
    out.save(&path)?;
    Ok(Some(path.to_string_lossy().into_owned()))
}

/// Unwrap frame-source failures so the report names the real cause.
fn source_message(err: &RingDetectError) -> String {
    match err {
        RingDetectError::Source(inner) => match inner.downcast_ref::<DetectError>() {
            Some(DetectError::Image { source, .. }) => format!("{inner}: {source}"),
            _ => inner.to_string(),
        },
        other => other.to_string(),
    }
}
