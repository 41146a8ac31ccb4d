//! marker-ranging CLI: replay scripted sessions, run the calculators and
//! inspect single frames.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use marker_ranging::core::geometry::{
    focal_length_mm_to_cm, horizontal_fov, monocular_distance, StereoMeasurement,
};
use marker_ranging::core::{CalibrationProfile, Region};
use marker_ranging::frames::{detect_markers, load_gray};
use marker_ranging::replay;
use marker_ranging::{ContourFilter, ProcessingConfig};
use serde_json::json;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "marker-ranging")]
#[command(about = "Estimate distances from observations of a circular marker")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON replay script and print the session report.
    Replay {
        /// Replay script; frame paths are relative to it.
        script: PathBuf,

        /// Write the sample log of a finished session into this directory.
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Print compact JSON instead of pretty JSON.
        #[arg(long)]
        compact: bool,
    },
    /// Evaluate a ranging formula from averaged inputs.
    Calc {
        #[command(subcommand)]
        formula: Formula,
    },
    /// Search one image for marker candidates.
    Detect {
        image: PathBuf,

        /// Search region as `x,y,width,height`; the whole image by default.
        #[arg(long, value_parser = parse_region)]
        region: Option<Region>,

        #[arg(long, value_enum, default_value = "ellipse-fittable")]
        filter: FilterArg,

        /// Processing configuration (JSON); library defaults when absent.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum Formula {
    /// Horizontal field of view from a marker at a known distance.
    Fov {
        #[arg(long)]
        marker_radius: f64,
        #[arg(long)]
        marker_distance: f64,
        /// Mean observed radius in pixels.
        #[arg(long)]
        pixel_radius: f64,
        #[arg(long)]
        frame_width: f64,
    },
    /// Monocular distance to a calibrated marker.
    Distance {
        /// Calibration profile (JSON).
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        pixel_radius: f64,
        #[arg(long, default_value_t = 4.0)]
        focal_length_mm: f64,
    },
    /// Stereo distance with yaw correction.
    Stereo {
        #[arg(long)]
        camera_distance: f64,
        /// Horizontal field of view in degrees.
        #[arg(long)]
        fov_deg: f64,
        #[arg(long)]
        frame_width: f64,
        #[arg(long, allow_hyphen_values = true)]
        x_right: f64,
        #[arg(long, allow_hyphen_values = true)]
        x_left: f64,
        /// Yaw change between the captures in degrees.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        error_angle_deg: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    Area,
    CircleLike,
    EllipseFittable,
}

impl From<FilterArg> for ContourFilter {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::Area => ContourFilter::Area,
            FilterArg::CircleLike => ContourFilter::CircleLike,
            FilterArg::EllipseFittable => ContourFilter::EllipseFittable,
        }
    }
}

fn parse_region(s: &str) -> Result<Region, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid region {s:?}: {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Region::new(*x, *y, *w, *h)),
        _ => Err(format!("region needs x,y,width,height, got {s:?}")),
    }
}

fn level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8) -> CliResult<()> {
    marker_ranging::core::init_with_level(level(verbose))?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(verbose: u8) -> CliResult<()> {
    tracing_log::LogTracer::init()?;
    marker_ranging::core::init_tracing(level(verbose), false);
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Replay {
            script,
            log_dir,
            compact,
        } => run_replay(&script, log_dir.as_deref(), compact),
        Commands::Calc { formula } => run_calc(formula),
        Commands::Detect {
            image,
            region,
            filter,
            config,
        } => run_detect(&image, region, filter.into(), config.as_deref()),
    }
}

fn run_replay(script: &Path, log_dir: Option<&Path>, compact: bool) -> CliResult<()> {
    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
    }
    let report = replay::run_file(script, log_dir)?;
    log::info!(
        "{} frames, {} samples, {} resets",
        report.frames_processed,
        report.samples_accepted,
        report.resets
    );
    let out = if compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{out}");
    Ok(())
}

fn run_calc(formula: Formula) -> CliResult<()> {
    let out = match formula {
        Formula::Fov {
            marker_radius,
            marker_distance,
            pixel_radius,
            frame_width,
        } => {
            let fov = horizontal_fov(marker_radius, marker_distance, pixel_radius, frame_width);
            json!({ "horizontal_fov": fov, "horizontal_fov_deg": fov.to_degrees() })
        }
        Formula::Distance {
            profile,
            pixel_radius,
            focal_length_mm,
        } => {
            let text = std::fs::read_to_string(&profile)
                .map_err(|e| format!("failed to read {}: {e}", profile.display()))?;
            let profile: CalibrationProfile = serde_json::from_str(&text)?;
            let calibrated = profile.as_calibrated().ok_or_else(|| -> CliError {
                format!("profile {:?} is not calibrated", profile.marker().name).into()
            })?;
            let distance = monocular_distance(
                calibrated,
                pixel_radius,
                focal_length_mm_to_cm(focal_length_mm),
            );
            json!({ "marker": calibrated.name(), "distance": distance })
        }
        Formula::Stereo {
            camera_distance,
            fov_deg,
            frame_width,
            x_right,
            x_left,
            error_angle_deg,
        } => {
            let solved = StereoMeasurement {
                camera_distance,
                horizontal_fov: fov_deg.to_radians(),
                frame_width,
                xr: x_right,
                xl: x_left,
                error_angle: error_angle_deg.to_radians(),
            }
            .solve();
            serde_json::to_value(solved)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_detect(
    path: &Path,
    region: Option<Region>,
    filter: ContourFilter,
    config: Option<&Path>,
) -> CliResult<()> {
    let config = match config {
        Some(p) => serde_json::from_str::<ProcessingConfig>(&std::fs::read_to_string(p)?)?,
        None => ProcessingConfig::default(),
    };
    let img = load_gray(path)?;
    log::info!("{}: {}x{}", path.display(), img.width(), img.height());
    let observations = detect_markers(&img, region, filter, config)?;
    log::info!("{} candidates", observations.len());

    let markers: Vec<_> = observations
        .iter()
        .map(|o| {
            json!({
                "center": [o.center.x, o.center.y],
                "pixel_radius": o.pixel_radius(),
                "ellipse": o.ellipse,
            })
        })
        .collect();
    let out = json!({
        "image": path.to_string_lossy(),
        "size": [img.width(), img.height()],
        "markers": markers,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
