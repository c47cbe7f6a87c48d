//! Checkerboard detection for camera and projector alignment.
//!
//! The pipeline runs in two stages: the ChESS response detector extracts raw
//! corner candidates, then a neighbor-graph pass assembles them into a
//! complete, ordered inner-corner lattice. Only complete lattices are
//! reported; partial boards are treated as not found.

mod detect;
mod error;
mod geom;
mod grid;
mod params;
mod refine;

pub use detect::{reference_points, CheckerboardDetection, CheckerboardDetector};
pub use error::DetectError;
pub use grid::{assemble_grid, Corner, CornerGrid};
pub use params::{CheckerboardConfig, GridParams};
pub use refine::{refine_corner, refine_corners, RefineParams};
