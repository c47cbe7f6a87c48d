//! Camera intrinsic calibration from three checkerboard views.
//!
//! The calibrator collects one detection per required board placement
//! (top, front, side), refines the corners to subpixel precision and runs a
//! closed-form planar solve for the camera matrix, per-view extrinsics and
//! the radial distortion pair.

mod calibrator;
mod error;
mod types;
mod zhang;

pub use calibrator::IntrinsicCalibrator;
pub use error::CalibrationError;
pub use types::{CalibrationFrame, CalibrationView, CameraIntrinsics};
