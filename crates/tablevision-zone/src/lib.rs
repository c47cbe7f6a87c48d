//! Zones, quad mappings and overlay composition.
//!
//! A zone is a named play area with physical dimensions and one
//! quadrilateral mapping per device (camera, projector). The mappings
//! carry exact four-point perspective transforms between device pixels and
//! the zone's game space, plus a cached border overlay for interactive
//! vertex placement. The compositor blends those overlays, and any
//! game-supplied ones, onto device frames copy-on-write.

mod compositor;
mod error;
mod overlay;
mod quad;
mod registry;
mod zone;

pub use compositor::{OverlayCompositor, OverlayProvider};
pub use error::{MappingError, ZoneError};
pub use overlay::OVERLAY_PADDING;
pub use quad::{DeviceKind, QuadMapping, Roi, DEFAULT_VERTICES};
pub use registry::ZoneRegistry;
pub use zone::{Unit, Zone};
