//! Zones: named play areas with physical dimensions and one quad mapping
//! per device.

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tablevision_core::RgbaImage;

use crate::quad::{DeviceKind, QuadMapping, Roi};
use crate::{MappingError, ZoneError};

/// Physical unit of a zone's dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Mm,
    Cm,
    In,
    /// Dimensions already in pixels; resolution is pinned to 1.
    Px,
}

fn default_true() -> bool {
    true
}

fn default_camera_mapping() -> QuadMapping {
    QuadMapping::new(DeviceKind::Camera)
}

fn default_projector_mapping() -> QuadMapping {
    QuadMapping::new(DeviceKind::Projector)
}

/// A named play area.
///
/// The game space is `round(width * resolution) x round(height * resolution)`
/// pixels. Each device maps its own quad onto that same game space, so a
/// point seen by the camera can be re-projected through the projector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Zone {
    name: String,
    width: f64,
    height: f64,
    unit: Unit,
    resolution: f64,
    #[serde(default = "default_true")]
    draw_locked_borders: bool,
    #[serde(default = "default_camera_mapping")]
    camera: QuadMapping,
    #[serde(default = "default_projector_mapping")]
    projector: QuadMapping,
}

impl Zone {
    pub fn new(
        name: impl Into<String>,
        width: f64,
        height: f64,
        unit: Unit,
        resolution: f64,
    ) -> Result<Self, ZoneError> {
        let mut zone = Self {
            name: name.into(),
            width,
            height,
            unit,
            resolution,
            draw_locked_borders: true,
            camera: default_camera_mapping(),
            projector: default_projector_mapping(),
        };
        zone.normalize_resolution();
        zone.validate()?;
        Ok(zone)
    }

    pub(crate) fn validate(&self) -> Result<(), ZoneError> {
        if !(self.width > 0.0 && self.width.is_finite())
            || !(self.height > 0.0 && self.height.is_finite())
        {
            return Err(ZoneError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.resolution >= 1.0 && self.resolution.is_finite()) {
            return Err(ZoneError::InvalidResolution(self.resolution));
        }
        Ok(())
    }

    fn normalize_resolution(&mut self) {
        if self.unit == Unit::Px && self.resolution != 1.0 {
            debug!(
                "zone {:?}: pixel unit pins resolution to 1 (was {})",
                self.name, self.resolution
            );
            self.resolution = 1.0;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Game-space size in pixels.
    pub fn game_size(&self) -> (u32, u32) {
        let w = (self.width * self.resolution).round().max(1.0) as u32;
        let h = (self.height * self.resolution).round().max(1.0) as u32;
        (w, h)
    }

    pub fn set_dimensions(&mut self, width: f64, height: f64) -> Result<(), ZoneError> {
        if !(width > 0.0 && width.is_finite()) || !(height > 0.0 && height.is_finite()) {
            return Err(ZoneError::InvalidDimensions { width, height });
        }
        self.width = width;
        self.height = height;
        self.camera.invalidate();
        self.projector.invalidate();
        Ok(())
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
        self.normalize_resolution();
        self.camera.invalidate();
        self.projector.invalidate();
    }

    pub fn set_resolution(&mut self, resolution: f64) -> Result<(), ZoneError> {
        if !(resolution >= 1.0 && resolution.is_finite()) {
            return Err(ZoneError::InvalidResolution(resolution));
        }
        self.resolution = resolution;
        self.normalize_resolution();
        self.camera.invalidate();
        self.projector.invalidate();
        Ok(())
    }

    pub fn draw_locked_borders(&self) -> bool {
        self.draw_locked_borders
    }

    pub fn set_draw_locked_borders(&mut self, draw: bool) {
        if self.draw_locked_borders != draw {
            self.draw_locked_borders = draw;
            self.camera.invalidate_overlay();
            self.projector.invalidate_overlay();
        }
    }

    pub fn mapping(&self, device: DeviceKind) -> &QuadMapping {
        match device {
            DeviceKind::Camera => &self.camera,
            DeviceKind::Projector => &self.projector,
        }
    }

    pub fn mapping_mut(&mut self, device: DeviceKind) -> &mut QuadMapping {
        match device {
            DeviceKind::Camera => &mut self.camera,
            DeviceKind::Projector => &mut self.projector,
        }
    }

    /// Map a device pixel into this zone's game space.
    pub fn map_to_game(
        &mut self,
        device: DeviceKind,
        point: Point2<f64>,
    ) -> Result<Point2<f64>, MappingError> {
        let game = self.game_size();
        self.mapping_mut(device).map_to_game(point, game)
    }

    /// Map a game-space point into device pixels.
    pub fn map_to_device(
        &mut self,
        device: DeviceKind,
        point: Point2<f64>,
    ) -> Result<Point2<f64>, MappingError> {
        let game = self.game_size();
        self.mapping_mut(device).map_to_device(point, game)
    }

    /// Border overlay for one device, cached inside the mapping.
    pub fn overlay(&mut self, device: DeviceKind, frame: (u32, u32)) -> (&RgbaImage, Roi) {
        let draw_locked_borders = self.draw_locked_borders;
        self.mapping_mut(device).overlay(frame, draw_locked_borders)
    }

    /// Warp a game-space RGBA image onto the device through this zone's quad.
    pub fn warp_game_overlay(
        &mut self,
        device: DeviceKind,
        src: &RgbaImage,
    ) -> Result<(RgbaImage, Roi), MappingError> {
        let game = self.game_size();
        self.mapping_mut(device).warp_from_game(src, game)
    }

    pub fn to_json(&self) -> Result<String, ZoneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ZoneError> {
        let mut zone: Zone = serde_json::from_str(text)?;
        zone.normalize_resolution();
        zone.validate()?;
        Ok(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_zone() -> Zone {
        Zone::new("table", 34.0, 22.0, Unit::In, 32.0).expect("zone")
    }

    #[test]
    fn game_size_scales_by_resolution() {
        assert_eq!(table_zone().game_size(), (1088, 704));
    }

    #[test]
    fn pixel_unit_pins_resolution() {
        let z = Zone::new("hud", 640.0, 360.0, Unit::Px, 4.0).expect("zone");
        assert_eq!(z.resolution(), 1.0);
        assert_eq!(z.game_size(), (640, 360));

        let mut z = table_zone();
        z.set_unit(Unit::Px);
        assert_eq!(z.resolution(), 1.0);
        z.set_resolution(8.0).expect("accepted but pinned");
        assert_eq!(z.resolution(), 1.0);
    }

    #[test]
    fn rejects_bad_dimensions_and_resolution() {
        assert!(matches!(
            Zone::new("z", 0.0, 22.0, Unit::In, 32.0),
            Err(ZoneError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Zone::new("z", 34.0, -1.0, Unit::In, 32.0),
            Err(ZoneError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Zone::new("z", 34.0, 22.0, Unit::In, 0.0),
            Err(ZoneError::InvalidResolution(_))
        ));

        let mut z = table_zone();
        assert!(z.set_dimensions(f64::NAN, 22.0).is_err());
        assert!(z.set_resolution(-3.0).is_err());
    }

    #[test]
    fn sub_unit_resolution_is_rejected() {
        assert!(matches!(
            Zone::new("sub", 10.0, 10.0, Unit::Cm, 0.5),
            Err(ZoneError::InvalidResolution(r)) if r == 0.5
        ));

        let mut z = table_zone();
        assert!(z.set_resolution(0.5).is_err());
        assert_eq!(z.resolution(), 32.0);
        z.set_resolution(1.0).expect("unit resolution is the floor");
    }

    #[test]
    fn maps_between_camera_and_projector_space() {
        let mut z = table_zone();
        z.mapping_mut(DeviceKind::Camera)
            .set_vertices([[2021, 136], [205, 177], [208, 1339], [2049, 1329]]);
        z.mapping_mut(DeviceKind::Projector)
            .set_vertices([[0, 0], [1919, 0], [1919, 1079], [0, 1079]]);

        let game = z
            .map_to_game(DeviceKind::Camera, Point2::new(2021.0, 136.0))
            .expect("to game");
        assert!(game.x.abs() < 1e-6 && game.y.abs() < 1e-6);

        let proj = z
            .map_to_device(DeviceKind::Projector, game)
            .expect("to projector");
        assert!(proj.x.abs() < 1e-6 && proj.y.abs() < 1e-6);
    }

    #[test]
    fn json_round_trip_preserves_mappings() {
        let mut z = table_zone();
        z.mapping_mut(DeviceKind::Camera).set_vertices([
            [2021, 136],
            [205, 177],
            [208, 1339],
            [2049, 1329],
        ]);
        z.mapping_mut(DeviceKind::Camera).set_locked(true);
        z.set_draw_locked_borders(false);

        let json = z.to_json().expect("serialize");
        let back = Zone::from_json(&json).expect("parse");
        assert_eq!(back.name(), "table");
        assert_eq!(
            back.mapping(DeviceKind::Camera).vertices(),
            z.mapping(DeviceKind::Camera).vertices()
        );
        assert!(back.mapping(DeviceKind::Camera).locked());
        assert!(!back.draw_locked_borders());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let json = r#"{
            "name": "minimal",
            "width": 10.0,
            "height": 5.0,
            "unit": "cm",
            "resolution": 4.0
        }"#;
        let z = Zone::from_json(json).expect("parse");
        assert!(z.draw_locked_borders());
        assert!(!z.mapping(DeviceKind::Camera).locked());
        assert_eq!(
            z.mapping(DeviceKind::Projector).vertices(),
            crate::quad::DEFAULT_VERTICES
        );
    }

    #[test]
    fn invalid_json_dimensions_are_rejected() {
        let json = r#"{
            "name": "broken",
            "width": -10.0,
            "height": 5.0,
            "unit": "cm",
            "resolution": 4.0
        }"#;
        assert!(matches!(
            Zone::from_json(json),
            Err(ZoneError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn toggling_locked_borders_invalidates_overlays() {
        let mut z = table_zone();
        z.mapping_mut(DeviceKind::Camera).set_locked(true);

        let frame = (640, 480);
        let (img, _) = z.overlay(DeviceKind::Camera, frame);
        assert!(img.data.iter().any(|&b| b != 0));

        z.set_draw_locked_borders(false);
        let (img, _) = z.overlay(DeviceKind::Camera, frame);
        assert!(img.data.iter().all(|&b| b == 0));
    }
}
