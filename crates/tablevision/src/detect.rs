//! End-to-end helpers over `image` buffers.

use tablevision_checkerboard::{
    CheckerboardConfig, CheckerboardDetection, CheckerboardDetector, DetectError,
};
use tablevision_core::GrayImage;

/// Copy an `image::GrayImage` into the workspace's own buffer type.
pub fn gray_from_image(img: &::image::GrayImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Detect the full checkerboard lattice in a grayscale image.
pub fn detect_checkerboard(
    img: &::image::GrayImage,
    config: CheckerboardConfig,
) -> Result<CheckerboardDetection, DetectError> {
    let detector = CheckerboardDetector::new(config)?;
    detector.detect(&gray_from_image(img))
}
