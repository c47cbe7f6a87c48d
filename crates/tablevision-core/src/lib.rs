//! Core image and projective-geometry primitives.
//!
//! This crate is intentionally small and purely geometric. It knows nothing
//! about cameras, projectors, or zones; the higher-level crates build those
//! concepts on top of the buffers and transforms defined here.

mod homography;
mod image;
mod logger;

pub use homography::{estimate_homography, homography_from_quad, Homography};
pub use image::{
    sample_bilinear, sample_bilinear_rgba, GrayImage, GrayImageView, RgbFrame, RgbaImage,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
