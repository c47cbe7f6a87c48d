/// Errors produced by checkerboard detection.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    /// No complete inner-corner lattice of the configured size was found.
    #[error("checkerboard not found ({cols}x{rows} inner corners required, {raw_corners} raw corners seen)")]
    NotFound {
        cols: usize,
        rows: usize,
        raw_corners: usize,
    },

    #[error("invalid checkerboard dimensions ({squares_w}x{squares_h} squares, need at least 2x2)")]
    InvalidDimensions { squares_w: u32, squares_h: u32 },

    #[error("invalid grayscale buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("chess corner detection failed: {0}")]
    Chess(#[from] chess_corners::ChessError),
}
