//! Checkerboard detection over grayscale device frames.

use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor, ThresholdMode};
use log::{debug, info};
use nalgebra::{Point2, Point3};
use tablevision_core::{GrayImage, RgbFrame};

use crate::grid::{assemble_grid, Corner, CornerGrid};
use crate::params::CheckerboardConfig;
use crate::DetectError;

/// An ordered, complete inner-corner detection in device pixel coordinates.
#[derive(Clone, Debug)]
pub struct CheckerboardDetection {
    pub cols: usize,
    pub rows: usize,
    /// `rows * cols` corner positions, row-major from the top-left corner.
    pub corners: Vec<Point2<f64>>,
}

impl From<CornerGrid> for CheckerboardDetection {
    fn from(grid: CornerGrid) -> Self {
        Self {
            cols: grid.cols,
            rows: grid.rows,
            corners: grid.positions,
        }
    }
}

/// ChESS detector settings used for the raw corner pass.
fn chess_config() -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.threshold_mode = ThresholdMode::Relative;
    cfg.threshold_value = 0.2;
    cfg.nms_radius = 2;
    cfg
}

fn adapt_corner(c: &CornerDescriptor) -> Corner {
    Corner {
        position: Point2::new(c.x, c.y),
        orientation: c.axes[0].angle,
        strength: c.response,
    }
}

/// Board-plane reference coordinates for a `squares_w x squares_h` board.
///
/// Row-major over the inner corners; columns map to +x and rows to -y, with
/// z fixed at zero. Units are checkerboard squares.
pub fn reference_points(squares_w: u32, squares_h: u32) -> Vec<Point3<f64>> {
    let cols = squares_w.saturating_sub(1) as usize;
    let rows = squares_h.saturating_sub(1) as usize;
    let mut pts = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            pts.push(Point3::new(col as f64, -(row as f64), 0.0));
        }
    }
    pts
}

/// Detects complete checkerboard lattices in still frames.
pub struct CheckerboardDetector {
    config: CheckerboardConfig,
}

impl CheckerboardDetector {
    pub fn new(config: CheckerboardConfig) -> Result<Self, DetectError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CheckerboardConfig {
        &self.config
    }

    /// Reference coordinates matching this detector's board, in the same
    /// row-major order as [`CheckerboardDetection::corners`].
    pub fn reference_points(&self) -> Vec<Point3<f64>> {
        reference_points(self.config.squares_w, self.config.squares_h)
    }

    /// Detect the full inner-corner lattice in a grayscale image.
    pub fn detect(&self, img: &GrayImage) -> Result<CheckerboardDetection, DetectError> {
        let expected = img.width * img.height;
        if img.data.len() != expected {
            return Err(DetectError::InvalidGrayBuffer {
                expected,
                got: img.data.len(),
            });
        }
        let chess_img =
            image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
                .ok_or(DetectError::InvalidGrayBuffer {
                    expected,
                    got: img.data.len(),
                })?;

        let raw = find_chess_corners_image(&chess_img, &chess_config())?;
        debug!("chess detector produced {} raw corners", raw.len());

        let corners: Vec<Corner> = raw
            .iter()
            .map(adapt_corner)
            .filter(|c| c.strength >= self.config.min_strength)
            .collect();

        self.detect_from_corners(&corners)
    }

    /// Detect over an RGB frame by converting to grayscale first.
    pub fn detect_rgb(&self, frame: &RgbFrame) -> Result<CheckerboardDetection, DetectError> {
        self.detect(&frame.to_gray())
    }

    /// Grid assembly over pre-extracted corners.
    pub fn detect_from_corners(
        &self,
        corners: &[Corner],
    ) -> Result<CheckerboardDetection, DetectError> {
        let (cols, rows) = self.config.inner_corners();

        let grid = assemble_grid(corners, cols, rows, &self.config.grid).ok_or(
            DetectError::NotFound {
                cols,
                rows,
                raw_corners: corners.len(),
            },
        )?;

        info!("checkerboard lattice found: {}x{} inner corners", cols, rows);
        Ok(grid.into())
    }
}
