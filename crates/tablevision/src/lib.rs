//! High-level facade crate for the `tablevision-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - (feature-gated) helpers that bridge `image` buffers into the
//!   workspace's own frame types
//!
//! ## Quickstart
//!
//! ```no_run
//! use tablevision::checkerboard::CheckerboardConfig;
//! use tablevision::detect;
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("board.png")?.decode()?.to_luma8();
//! let detection = detect::detect_checkerboard(&img, CheckerboardConfig::default())?;
//! println!("found {} corners", detection.corners.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `tablevision::core`: image buffers, homographies, logging.
//! - `tablevision::checkerboard`: checkerboard lattice detection.
//! - `tablevision::calib`: three-view intrinsic calibration.
//! - `tablevision::zone`: zones, quad mappings and overlay composition.
//! - `tablevision::detect` (feature `image`): helpers over `image::GrayImage`.

pub use tablevision_calib as calib;
pub use tablevision_checkerboard as checkerboard;
pub use tablevision_core as core;
pub use tablevision_zone as zone;

pub use tablevision_calib::{CalibrationView, CameraIntrinsics, IntrinsicCalibrator};
pub use tablevision_checkerboard::{CheckerboardConfig, CheckerboardDetector};
pub use tablevision_zone::{DeviceKind, OverlayCompositor, Zone, ZoneRegistry};

#[cfg(feature = "image")]
pub mod detect;
