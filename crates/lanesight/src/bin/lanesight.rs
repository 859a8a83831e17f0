use clap::{Args, Parser, Subcommand, ValueEnum};
use lanesight::exposure::decide;
use lanesight::{
    detect_channel_order, load_frame, run_host_loop, ConstantLux, FallbackSensor, FrameOutput,
    GammaPolicy, GammaPreset, ImageSequenceSource, LanePipeline, PipelineConfig, PipelineError,
    RunLimit, TelemetryHub, ViewMode, DEFAULT_LUX,
};
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::AtomicBool;

#[derive(Parser)]
#[command(name = "lanesight", version, about = "Lane lateral-offset estimation")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over image files and print one telemetry JSON line per frame
    Run(RunArgs),
    /// Print the gamma decision for one illuminance / brightness pair
    Gamma(GammaArgs),
    /// Print the default pipeline config as JSON
    PrintConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    BirdEye,
    Normal,
}

impl From<ViewArg> for ViewMode {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::BirdEye => ViewMode::BirdEye,
            ViewArg::Normal => ViewMode::Normal,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    Linear,
    DarkEmphasized,
}

impl From<PresetArg> for GammaPreset {
    fn from(p: PresetArg) -> Self {
        match p {
            PresetArg::Linear => GammaPreset::Linear,
            PresetArg::DarkEmphasized => GammaPreset::DarkEmphasized,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// Input images, processed in order.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Pipeline config (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Illuminance in lux for every frame. Without it the default reading is used.
    #[arg(long)]
    lux: Option<f64>,

    /// Override the config's view mode.
    #[arg(long, value_enum)]
    view: Option<ViewArg>,

    /// Write annotated frames (and masks with --masks) here.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Also write the binary lane masks.
    #[arg(long, requires = "out_dir")]
    masks: bool,

    /// Guess R/B order from the first image instead of trusting the config.
    #[arg(long)]
    detect_channel_order: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

#[derive(Args)]
struct GammaArgs {
    #[arg(long)]
    lux: f64,
    /// Mean gray level of the frame.
    #[arg(long)]
    brightness: f64,
    #[arg(long, value_enum, default_value = "dark-emphasized")]
    preset: PresetArg,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Gamma(args) => gamma(args),
        Commands::PrintConfig => print_config(),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        let mut cause = e.source();
        while let Some(inner) = cause {
            eprintln!("  caused by: {inner}");
            cause = inner.source();
        }
        process::exit(1);
    }
}

fn verbosity(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[cfg(feature = "tracing")]
fn init_logging(verbose: u8) {
    lanesight::core::init_tracing(false, verbosity(verbose));
    // no-op when the subscriber already bridged `log`
    let _ = tracing_log::LogTracer::init();
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8) {
    let _ = lanesight::core::init_with_level(verbosity(verbose));
}

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(view) = args.view {
        config.view_mode = view.into();
    }
    if args.out_dir.is_none() {
        config.annotate = false;
    }
    if args.detect_channel_order {
        let sample = load_frame(&args.images[0])?;
        config.channel_swap_needed = detect_channel_order(&sample.view()).swap_needed();
    }
    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)?;
    }

    let mut pipeline = LanePipeline::new(config)?;
    let mut source = ImageSequenceSource::new(args.images.clone());
    let mut sensor = FallbackSensor::new(args.lux.map(ConstantLux), DEFAULT_LUX);
    let hub = TelemetryHub::new();
    let stop = AtomicBool::new(false);
    let limit = args
        .max_frames
        .map(RunLimit::frames)
        .unwrap_or_else(RunLimit::unlimited);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut index = 0usize;
    let summary = run_host_loop(
        &mut pipeline,
        &mut source,
        &mut sensor,
        &hub,
        &stop,
        limit,
        |frame: &FrameOutput| {
            let line = frame
                .telemetry
                .to_json()
                .map_err(PipelineError::sink)?;
            writeln!(out, "{line}").map_err(PipelineError::sink)?;
            if let Some(dir) = &args.out_dir {
                let stem = args.images[index]
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("frame");
                save_outputs(dir, &format!("{index:05}_{stem}"), frame, args.masks)
                    .map_err(PipelineError::Sink)?;
            }
            index += 1;
            Ok(())
        },
    )?;

    log::info!(
        "processed {} frames, last telemetry seq {}",
        summary.frames,
        hub.published()
    );
    Ok(())
}

fn save_outputs(
    dir: &Path,
    name: &str,
    frame: &FrameOutput,
    with_mask: bool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(annotated) = &frame.annotated {
        let img = lanesight::annotate::to_rgb_image(annotated)
            .ok_or("annotated frame has an invalid buffer")?;
        img.save(dir.join(format!("{name}_annotated.png")))?;
    }
    if with_mask {
        let mask = &frame.mask;
        let img = image::GrayImage::from_raw(mask.width as u32, mask.height as u32, mask.data.clone())
            .ok_or("mask has an invalid buffer")?;
        img.save(dir.join(format!("{name}_mask.png")))?;
    }
    Ok(())
}

fn gamma(args: GammaArgs) -> Result<(), Box<dyn Error>> {
    let policy = GammaPolicy::preset(args.preset.into());
    let decision = decide(args.lux, args.brightness, &policy);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn print_config() -> Result<(), Box<dyn Error>> {
    println!(
        "{}",
        serde_json::to_string_pretty(&PipelineConfig::default())?
    );
    Ok(())
}
