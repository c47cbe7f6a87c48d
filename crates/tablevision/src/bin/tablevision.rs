//! Command-line front end: checkerboard detection and camera calibration
//! on still images.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tablevision::calib::{CalibrationView, IntrinsicCalibrator};
use tablevision::checkerboard::{CheckerboardConfig, CheckerboardDetector};
use tablevision::detect::gray_from_image;

#[derive(Parser)]
#[command(name = "tablevision", version, about = "Tabletop surface alignment tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect a checkerboard in a single image and report its corners.
    Detect {
        /// Input image path.
        #[arg(long)]
        image: PathBuf,

        /// Board squares along the width.
        #[arg(long, default_value_t = 23)]
        squares_w: u32,

        /// Board squares along the height.
        #[arg(long, default_value_t = 18)]
        squares_h: u32,
    },

    /// Calibrate camera intrinsics from three board views.
    Calibrate {
        /// Image with the board flat on the table.
        #[arg(long)]
        top: PathBuf,

        /// Image with the board tilted toward the camera.
        #[arg(long)]
        front: PathBuf,

        /// Image with the board tilted sideways.
        #[arg(long)]
        side: PathBuf,

        #[arg(long, default_value_t = 23)]
        squares_w: u32,

        #[arg(long, default_value_t = 18)]
        squares_h: u32,

        /// Write the resulting intrinsics as JSON.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_gray(path: &Path) -> Result<tablevision::core::GrayImage, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_luma8();
    Ok(gray_from_image(&img))
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Detect {
            image,
            squares_w,
            squares_h,
        } => {
            let config = CheckerboardConfig::with_squares(squares_w, squares_h);
            let detector = CheckerboardDetector::new(config)?;
            let gray = load_gray(&image)?;
            let detection = detector.detect(&gray)?;

            println!(
                "found {}x{} corners ({} total)",
                detection.cols,
                detection.rows,
                detection.corners.len()
            );
            let first = detection.corners[0];
            let last = detection.corners[detection.corners.len() - 1];
            println!("top-left corner at ({:.2}, {:.2})", first.x, first.y);
            println!("bottom-right corner at ({:.2}, {:.2})", last.x, last.y);
        }
        Command::Calibrate {
            top,
            front,
            side,
            squares_w,
            squares_h,
            out,
        } => {
            let config = CheckerboardConfig::with_squares(squares_w, squares_h);
            let mut calibrator = IntrinsicCalibrator::new(config)?;

            for (view, path) in [
                (CalibrationView::Top, &top),
                (CalibrationView::Front, &front),
                (CalibrationView::Side, &side),
            ] {
                let gray = load_gray(path)?;
                calibrator.capture_view(view, &gray)?;
            }

            let result = calibrator.calibrate_camera()?;
            let (cx, cy) = result.principal_point();
            println!("fx = {:.3}  fy = {:.3}", result.fx(), result.fy());
            println!("cx = {:.3}  cy = {:.3}", cx, cy);
            println!(
                "k1 = {:+.6}  k2 = {:+.6}",
                result.distortion[0], result.distortion[1]
            );
            println!(
                "mean reprojection error: {:.4} px",
                result.mean_reprojection_error
            );

            if let Some(out) = out {
                result.write_json(&out)?;
                println!("intrinsics written to {}", out.display());
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
