//! Offline perception runner: feed captured frames through the pipeline and
//! export the resulting detection registry.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use warebot::core::CalibrationData;
use warebot::nav::{SteeringController, SteeringParams};
use warebot::vision::{PerceptionPipeline, VisionParams};

#[derive(Parser, Debug)]
#[command(
    name = "warebot",
    version,
    about = "Analyze captured frames with the warebot perception pipeline"
)]
struct Cli {
    /// Calibration directory with color_thresholds.csv, focal_length.csv and
    /// optionally homography.csv
    #[arg(long, value_name = "DIR")]
    calib_dir: PathBuf,

    /// Frame images, processed in order
    #[arg(required = true, value_name = "FRAME")]
    frames: Vec<PathBuf>,

    /// Write the last frame's registry snapshot to this JSON file
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print a steering preview toward the first registered item
    #[arg(long)]
    steer: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = warebot::core::init_with_level(level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let calib = CalibrationData::load_dir(&cli.calib_dir)?;
    let pipeline = PerceptionPipeline::new(calib, VisionParams::default());
    let steering = SteeringController::new(SteeringParams::default());

    let mut last = None;
    for path in &cli.frames {
        let frame = warebot::imageio::load_frame(path)?;
        let analysis = pipeline.analyze(&frame);

        let registered_items = analysis.registry.items.iter().flatten().count();
        log::info!(
            "{}: {} objects, {} items, {} obstacles",
            path.display(),
            analysis.objects.len(),
            registered_items,
            analysis.registry.obstacles.len()
        );

        if cli.steer {
            if let Some(goal) = analysis.registry.items.iter().flatten().next() {
                let v = steering.steer(*goal, &analysis.registry.obstacles);
                log::info!(
                    "steer toward item at {:.2} m, {:+.1} deg: forward {:.3} m/s, rotation {:+.3} rad/s",
                    goal.range,
                    goal.bearing_deg,
                    v.forward,
                    v.rotational
                );
            } else {
                log::info!("steer preview skipped: no items registered");
            }
        }

        last = Some(analysis.registry);
    }

    if let (Some(out), Some(registry)) = (&cli.output, &last) {
        registry.to_record().write_json(out)?;
        log::info!("registry written to {}", out.display());
    }
    Ok(())
}
