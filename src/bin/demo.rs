//! demo - end-to-end synthetic run of the motion pipeline

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;

use motion_kernel::{
    CaptureSource, ConnectedComponents, Connectivity, MotionPipeline, MotionReport,
    PipelineConfig, Preprocessor, SourceConfig, SyntheticScene,
};

const DEFAULT_SOURCE_URL: &str = "stub://demo";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of frames to process.
    #[arg(long, default_value_t = 120)]
    frames: u64,
    /// Frame source: stub://name, or a directory of stills (ingest-images feature).
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    source: String,
    /// Source frame width.
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Source frame height.
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Downscale factor between source and working resolution.
    #[arg(long, default_value_t = motion_kernel::detect::DEFAULT_SCALE_FACTOR)]
    scale: u32,
    /// Frames averaged into the background.
    #[arg(long, default_value_t = 30)]
    window: usize,
    /// Per-pixel difference that counts as change.
    #[arg(long, default_value_t = motion_kernel::detect::DEFAULT_DIFF_THRESHOLD)]
    diff_threshold: u8,
    /// Smallest region area kept, in working pixels.
    #[arg(long, default_value_t = motion_kernel::detect::DEFAULT_MIN_AREA)]
    min_area: u32,
    /// Use 4-connectivity instead of 8 when grouping changed pixels.
    #[arg(long)]
    four_connected: bool,
    /// Skip the horizontal mirror.
    #[arg(long)]
    no_mirror: bool,
    /// Skip the Gaussian blur.
    #[arg(long)]
    no_blur: bool,
    /// Noise seed for the synthetic scene.
    #[arg(long)]
    seed: Option<u64>,
    /// Print one JSON report per frame on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct FrameLine<'a> {
    sequence: u64,
    #[serde(flatten)]
    report: &'a MotionReport,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }

    stage("open source");
    let mut scene = SyntheticScene::default();
    if let Some(seed) = args.seed {
        scene.seed = seed;
    }
    let source_cfg = SourceConfig {
        url: args.source.clone(),
        width: args.width,
        height: args.height,
        target_fps: 10,
        max_frames: Some(args.frames),
    };
    let mut source = CaptureSource::with_scene(source_cfg.clone(), scene)?;
    source.connect()?;

    stage("build pipeline");
    let preprocessor = Preprocessor::new(source_cfg.dims(), args.scale)?
        .with_mirror(!args.no_mirror)
        .with_blur(!args.no_blur);
    let connectivity = if args.four_connected {
        Connectivity::Four
    } else {
        Connectivity::Eight
    };
    let mut pipeline = MotionPipeline::new(
        preprocessor.output_dims(),
        args.window,
        PipelineConfig {
            scale_factor: args.scale,
            diff_threshold: args.diff_threshold,
            min_area: args.min_area,
        },
    )?
    .with_extractor(ConnectedComponents::new(connectivity));

    stage("process frames");
    let mut processed = 0u64;
    let mut motion_frames = 0u64;
    let mut detections = 0u64;
    let mut first_motion: Option<u64> = None;
    for _ in 0..args.frames {
        // the source is bounded by max_frames; a dry image directory ends early
        let captured = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                eprintln!("demo: capture ended: {}", e);
                break;
            }
        };
        let sequence = captured.sequence;
        let report = pipeline.analyze(preprocessor.apply(&captured))?;
        processed += 1;
        if report.motion_detected() {
            motion_frames += 1;
            detections += report.detections.len() as u64;
            first_motion.get_or_insert(sequence);
        }
        if args.json {
            let line = FrameLine {
                sequence,
                report: &report,
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }

    let stats = source.stats();
    eprintln!("demo summary:");
    eprintln!("  source: {}", stats.url);
    eprintln!(
        "  resolution: {} -> {}",
        source_cfg.dims(),
        preprocessor.output_dims()
    );
    eprintln!("  frames processed: {}", processed);
    eprintln!("  frames with motion: {}", motion_frames);
    eprintln!("  detections: {}", detections);
    match first_motion {
        Some(sequence) => eprintln!("  first motion at frame: {}", sequence),
        None => eprintln!("  first motion at frame: none"),
    }
    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
