use crate::types::CalibrationView;
use tablevision_checkerboard::DetectError;

/// Errors produced while collecting views or solving for intrinsics.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    /// One or more of the three required views has not been captured yet.
    #[error("calibration views missing: {0:?}")]
    MissingViews(Vec<CalibrationView>),

    #[error("view {view:?} was captured with a {got_cols}x{got_rows} lattice, expected {want_cols}x{want_rows}")]
    LatticeMismatch {
        view: CalibrationView,
        got_cols: usize,
        got_rows: usize,
        want_cols: usize,
        want_rows: usize,
    },

    #[error("view {view:?} resolution {got:?} differs from {want:?}")]
    ResolutionMismatch {
        view: CalibrationView,
        got: (u32, u32),
        want: (u32, u32),
    },

    /// The detected lattices wind in different directions across views, so
    /// the board-to-image correspondences cannot be trusted.
    #[error("calibration failed: detected grids have inconsistent orientation across views")]
    InconsistentOrientation,

    #[error("calibration failed: {0}")]
    SolverFailed(&'static str),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
