use std::path::Path;

use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::CalibrationError;

/// The three board placements required for a calibration run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationView {
    /// Board flat on the table.
    Top,
    /// Board tilted toward the camera.
    Front,
    /// Board tilted sideways.
    Side,
}

impl CalibrationView {
    pub const ALL: [CalibrationView; 3] = [
        CalibrationView::Top,
        CalibrationView::Front,
        CalibrationView::Side,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            CalibrationView::Top => 0,
            CalibrationView::Front => 1,
            CalibrationView::Side => 2,
        }
    }
}

/// A captured view: the refined inner-corner lattice plus the frame size it
/// was detected in. Pixel data is not retained.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationFrame {
    pub view: CalibrationView,
    pub resolution: (u32, u32),
    pub cols: usize,
    pub rows: usize,
    /// `rows * cols` corner positions, row-major.
    pub corners: Vec<Point2<f64>>,
}

impl CalibrationFrame {
    /// Image-space winding of the lattice: positive when rows advance
    /// clockwise from columns (the usual case for an upright board).
    pub(crate) fn winding(&self) -> f64 {
        let row_dir = self.corners[self.cols - 1] - self.corners[0];
        let col_dir = self.corners[(self.rows - 1) * self.cols] - self.corners[0];
        row_dir.x * col_dir.y - row_dir.y * col_dir.x
    }
}

/// Result of a calibration run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub camera_matrix: Matrix3<f64>,
    /// Distortion coefficients `(k1, k2, p1, p2, k3)`. Only the radial pair
    /// is estimated; the tangential terms and k3 stay zero.
    pub distortion: [f64; 5],
    /// Per-view rotations as scaled axis-angle vectors, in capture order
    /// top/front/side.
    pub rotations: [Vector3<f64>; 3],
    pub translations: [Vector3<f64>; 3],
    /// Mean of the per-view reprojection errors, in pixels.
    pub mean_reprojection_error: f64,
    /// Frame size the calibration was computed for.
    pub resolution: (u32, u32),
}

impl CameraIntrinsics {
    pub fn fx(&self) -> f64 {
        self.camera_matrix[(0, 0)]
    }

    pub fn fy(&self) -> f64 {
        self.camera_matrix[(1, 1)]
    }

    pub fn principal_point(&self) -> (f64, f64) {
        (self.camera_matrix[(0, 2)], self.camera_matrix[(1, 2)])
    }

    pub fn load_json(path: &Path) -> Result<Self, CalibrationError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), CalibrationError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
