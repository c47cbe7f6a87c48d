/// Errors produced while mapping points between device and game space.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum MappingError {
    /// The quad's vertices do not form a proper quadrilateral, so no
    /// perspective transform exists.
    #[error("quad vertices are degenerate, no perspective transform exists")]
    DegenerateQuad,

    /// The point mapped outside the game area. Carries the mapped
    /// coordinates so callers can decide to clamp or discard.
    #[error("mapped point ({x:.2}, {y:.2}) is outside the game area")]
    OutOfBounds { x: f64, y: f64 },
}

/// Errors produced by zone construction and registry operations.
#[derive(thiserror::Error, Debug)]
pub enum ZoneError {
    #[error("zone {0:?} already exists")]
    DuplicateZone(String),

    #[error("zone {0:?} does not exist")]
    UnknownZone(String),

    #[error("invalid zone dimensions {width}x{height}, both must be positive")]
    InvalidDimensions { width: f64, height: f64 },

    #[error("invalid zone resolution {0}, must be at least 1")]
    InvalidResolution(f64),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
