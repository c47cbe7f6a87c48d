use serde::{Deserialize, Serialize};

use crate::DetectError;

/// Physical board description plus detector tuning.
///
/// `squares_w`/`squares_h` count the printed squares, not the inner corners;
/// a board with `w x h` squares exposes `(w-1) x (h-1)` inner corners.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CheckerboardConfig {
    pub squares_w: u32,
    pub squares_h: u32,

    /// Discard raw corners weaker than this response.
    pub min_strength: f32,

    pub grid: GridParams,
}

impl Default for CheckerboardConfig {
    fn default() -> Self {
        Self {
            squares_w: 23,
            squares_h: 18,
            min_strength: 0.0,
            grid: GridParams::default(),
        }
    }
}

impl CheckerboardConfig {
    pub fn with_squares(squares_w: u32, squares_h: u32) -> Self {
        Self {
            squares_w,
            squares_h,
            ..Default::default()
        }
    }

    /// Inner corner grid size as (cols, rows).
    pub fn inner_corners(&self) -> (usize, usize) {
        (self.squares_w as usize - 1, self.squares_h as usize - 1)
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if self.squares_w < 2 || self.squares_h < 2 {
            return Err(DetectError::InvalidDimensions {
                squares_w: self.squares_w,
                squares_h: self.squares_h,
            });
        }
        Ok(())
    }
}

/// Tuning for the neighbor graph used during grid assembly.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GridParams {
    /// Minimal corner spacing in pixels; ignored when `auto_spacing` is on.
    pub min_spacing_pix: f32,
    /// Maximal corner spacing in pixels; ignored when `auto_spacing` is on.
    pub max_spacing_pix: f32,
    /// Derive the spacing window from the median nearest-neighbor distance.
    pub auto_spacing: bool,
    pub k_neighbors: usize,
    pub orientation_tolerance_deg: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 5.0,
            max_spacing_pix: 100.0,
            auto_spacing: true,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}
