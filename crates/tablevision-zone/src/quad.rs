//! Quadrilateral mappings between device pixels and game space.
//!
//! A mapping is four device-pixel vertices in clockwise order starting at
//! the game origin: vertex 0 maps to game (0,0), vertex 1 to (W-1,0),
//! vertex 2 to (W-1,H-1) and vertex 3 to (0,H-1). The perspective
//! transforms are computed in ROI-local coordinates and cached until a
//! vertex moves or the game size changes.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tablevision_core::{homography_from_quad, Homography, RgbaImage};

use crate::overlay::{self, CachedOverlay, OVERLAY_PADDING};
use crate::MappingError;

/// Which physical device a mapping belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Camera,
    Projector,
}

/// Half-open pixel rectangle: `x` in `[min_x, min_x + width)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub min_x: i32,
    pub min_y: i32,
    pub width: i32,
    pub height: i32,
}

impl Roi {
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    fn clamp_to_frame(self, frame: (u32, u32)) -> Roi {
        let min_x = self.min_x.max(0);
        let min_y = self.min_y.max(0);
        let max_x = (self.min_x + self.width).min(frame.0 as i32);
        let max_y = (self.min_y + self.height).min(frame.1 as i32);
        Roi {
            min_x,
            min_y,
            width: (max_x - min_x).max(0),
            height: (max_y - min_y).max(0),
        }
    }
}

/// Fresh mappings start on this quad, matching a comfortable on-screen size
/// for dragging the vertices into place.
pub const DEFAULT_VERTICES: [[i32; 2]; 4] = [[128, 128], [384, 128], [384, 256], [128, 256]];

#[derive(Clone, Debug)]
struct Transforms {
    game_size: (u32, u32),
    roi: Roi,
    device_to_game: Homography,
    game_to_device: Homography,
}

fn bounding_box(vertices: &[[i32; 2]; 4]) -> Roi {
    let min_x = vertices.iter().map(|v| v[0]).min().unwrap_or(0);
    let min_y = vertices.iter().map(|v| v[1]).min().unwrap_or(0);
    let max_x = vertices.iter().map(|v| v[0]).max().unwrap_or(0);
    let max_y = vertices.iter().map(|v| v[1]).max().unwrap_or(0);
    Roi {
        min_x,
        min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

fn compute_transforms(
    vertices: &[[i32; 2]; 4],
    game_size: (u32, u32),
) -> Result<Transforms, MappingError> {
    let roi = bounding_box(vertices);
    if roi.is_empty() {
        return Err(MappingError::DegenerateQuad);
    }

    let local: [Point2<f64>; 4] = [0usize, 1, 2, 3].map(|i| {
        Point2::new(
            (vertices[i][0] - roi.min_x) as f64,
            (vertices[i][1] - roi.min_y) as f64,
        )
    });

    let w = game_size.0 as f64 - 1.0;
    let h = game_size.1 as f64 - 1.0;
    let game = [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, h),
        Point2::new(0.0, h),
    ];

    let device_to_game =
        homography_from_quad(&local, &game).ok_or(MappingError::DegenerateQuad)?;
    let game_to_device = device_to_game.inverse().ok_or(MappingError::DegenerateQuad)?;

    Ok(Transforms {
        game_size,
        roi,
        device_to_game,
        game_to_device,
    })
}

/// A four-vertex perspective mapping for one device.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuadMapping {
    pub device: DeviceKind,
    vertices: [[i32; 2]; 4],
    #[serde(default)]
    locked: bool,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(skip)]
    transforms: Option<Transforms>,
    #[serde(skip)]
    overlay: Option<CachedOverlay>,
}

fn default_enabled() -> bool {
    true
}

impl QuadMapping {
    pub fn new(device: DeviceKind) -> Self {
        Self {
            device,
            vertices: DEFAULT_VERTICES,
            locked: false,
            enabled: true,
            transforms: None,
            overlay: None,
        }
    }

    pub fn vertices(&self) -> [[i32; 2]; 4] {
        self.vertices
    }

    /// Move one vertex. Ignored while the mapping is locked; returns whether
    /// the vertex actually moved.
    pub fn set_vertex(&mut self, index: usize, vertex: [i32; 2]) -> bool {
        if self.locked || index >= 4 || self.vertices[index] == vertex {
            return false;
        }
        self.vertices[index] = vertex;
        self.invalidate();
        true
    }

    /// Replace all four vertices. Ignored while locked.
    pub fn set_vertices(&mut self, vertices: [[i32; 2]; 4]) -> bool {
        if self.locked || self.vertices == vertices {
            return false;
        }
        self.vertices = vertices;
        self.invalidate();
        true
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            self.locked = locked;
            self.invalidate_overlay();
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Un-padded bounding box of the quad.
    pub fn roi(&self) -> Roi {
        bounding_box(&self.vertices)
    }

    /// Bounding box grown by the overlay margin and clamped to the frame.
    pub fn overlay_roi(&self, frame: (u32, u32)) -> Roi {
        let b = bounding_box(&self.vertices);
        Roi {
            min_x: b.min_x - OVERLAY_PADDING,
            min_y: b.min_y - OVERLAY_PADDING,
            width: b.width + 2 * OVERLAY_PADDING,
            height: b.height + 2 * OVERLAY_PADDING,
        }
        .clamp_to_frame(frame)
    }

    /// Drop cached transforms and the cached overlay.
    pub fn invalidate(&mut self) {
        self.transforms = None;
        self.invalidate_overlay();
    }

    /// Drop only the cached overlay image.
    pub fn invalidate_overlay(&mut self) {
        if let Some(cache) = &mut self.overlay {
            cache.dirty = true;
        }
    }

    fn transforms(&mut self, game_size: (u32, u32)) -> Result<&Transforms, MappingError> {
        let stale = self
            .transforms
            .as_ref()
            .is_none_or(|t| t.game_size != game_size);
        if stale {
            self.transforms = Some(compute_transforms(&self.vertices, game_size)?);
        }
        match &self.transforms {
            Some(t) => Ok(t),
            None => Err(MappingError::DegenerateQuad),
        }
    }

    /// Map a device pixel into game space.
    pub fn map_to_game(
        &mut self,
        point: Point2<f64>,
        game_size: (u32, u32),
    ) -> Result<Point2<f64>, MappingError> {
        let t = self.transforms(game_size)?;
        let local = Point2::new(point.x - t.roi.min_x as f64, point.y - t.roi.min_y as f64);
        let mapped = t.device_to_game.apply(local);

        let w = game_size.0 as f64;
        let h = game_size.1 as f64;
        if mapped.x < -0.5 || mapped.x > w - 0.5 || mapped.y < -0.5 || mapped.y > h - 0.5 {
            return Err(MappingError::OutOfBounds {
                x: mapped.x,
                y: mapped.y,
            });
        }
        Ok(mapped)
    }

    /// Map a game-space point into device pixels.
    pub fn map_to_device(
        &mut self,
        point: Point2<f64>,
        game_size: (u32, u32),
    ) -> Result<Point2<f64>, MappingError> {
        let t = self.transforms(game_size)?;
        let local = t.game_to_device.apply(point);
        Ok(Point2::new(
            local.x + t.roi.min_x as f64,
            local.y + t.roi.min_y as f64,
        ))
    }

    /// Warp a game-space RGBA image onto this quad's ROI by inverse mapping:
    /// every ROI pixel is pushed through the device-to-game transform and
    /// sampled bilinearly. Pixels landing outside the source come out
    /// transparent.
    pub(crate) fn warp_from_game(
        &mut self,
        src: &RgbaImage,
        game_size: (u32, u32),
    ) -> Result<(RgbaImage, Roi), MappingError> {
        let t = self.transforms(game_size)?;
        let roi = t.roi;
        let mut out = RgbaImage::new(roi.width.max(0) as usize, roi.height.max(0) as usize);

        for y in 0..out.height {
            for x in 0..out.width {
                let g = t.device_to_game.apply(Point2::new(x as f64, y as f64));
                let px = tablevision_core::sample_bilinear_rgba(src, g.x as f32, g.y as f32);
                if px[3] > 0 {
                    out.set_pixel(x, y, px);
                }
            }
        }

        Ok((out, roi))
    }

    /// Border-and-marker overlay for this mapping, cached until the quad,
    /// the lock state or the ROI changes.
    pub fn overlay(
        &mut self,
        frame: (u32, u32),
        draw_locked_borders: bool,
    ) -> (&RgbaImage, Roi) {
        let roi = self.overlay_roi(frame);
        let stale = self
            .overlay
            .as_ref()
            .is_none_or(|c| c.dirty || c.roi != roi || c.draw_locked_borders != draw_locked_borders);

        if stale {
            let image = overlay::render_mapping_overlay(
                &self.vertices,
                roi,
                self.locked,
                draw_locked_borders,
            );
            self.overlay = Some(CachedOverlay {
                image,
                roi,
                draw_locked_borders,
                dirty: false,
            });
        }

        // The cache was just filled when it was stale.
        match &self.overlay {
            Some(cache) => (&cache.image, cache.roi),
            None => unreachable!("overlay cache filled above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked scenario: a 34x22 inch zone at 32 px/in seen by a 2552x1425
    // camera, with the quad corners measured on the table.
    const SCENARIO_VERTICES: [[i32; 2]; 4] = [[2021, 136], [205, 177], [208, 1339], [2049, 1329]];
    const GAME: (u32, u32) = (1088, 704);

    fn scenario_mapping() -> QuadMapping {
        let mut m = QuadMapping::new(DeviceKind::Camera);
        m.set_vertices(SCENARIO_VERTICES);
        m
    }

    #[test]
    fn roi_covers_vertex_extents() {
        let m = scenario_mapping();
        let roi = m.roi();
        assert_eq!((roi.min_x, roi.min_y), (205, 136));
        assert_eq!((roi.width, roi.height), (1844, 1203));
    }

    #[test]
    fn corners_map_to_game_corners() {
        let mut m = scenario_mapping();

        let g0 = m.map_to_game(Point2::new(2021.0, 136.0), GAME).expect("map");
        assert!(g0.x.abs() < 1e-6 && g0.y.abs() < 1e-6);

        let g1 = m.map_to_game(Point2::new(205.0, 177.0), GAME).expect("map");
        assert!((g1.x - 1087.0).abs() < 1e-6);
        assert!(g1.y.abs() < 1e-6);

        let g2 = m.map_to_game(Point2::new(208.0, 1339.0), GAME).expect("map");
        assert!((g2.x - 1087.0).abs() < 1e-6);
        assert!((g2.y - 703.0).abs() < 1e-6);
    }

    #[test]
    fn game_origin_maps_back_to_first_vertex() {
        let mut m = scenario_mapping();
        let d = m.map_to_device(Point2::new(0.0, 0.0), GAME).expect("map");
        assert!((d.x - 2021.0).abs() < 1e-6);
        assert!((d.y - 136.0).abs() < 1e-6);
    }

    #[test]
    fn round_trip_is_stable() {
        let mut m = scenario_mapping();
        for p in [
            Point2::new(1000.0, 700.0),
            Point2::new(400.0, 300.0),
            Point2::new(1800.0, 1200.0),
        ] {
            let g = m.map_to_game(p, GAME).expect("to game");
            let back = m.map_to_device(g, GAME).expect("to device");
            assert!((back.x - p.x).abs() < 1e-3, "{p:?} -> {back:?}");
            assert!((back.y - p.y).abs() < 1e-3, "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn out_of_bounds_carries_mapped_point() {
        let mut m = scenario_mapping();
        let err = m
            .map_to_game(Point2::new(2500.0, 100.0), GAME)
            .unwrap_err();
        match err {
            MappingError::OutOfBounds { x, .. } => assert!(x < 0.0 || x > 1087.5),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn collinear_vertices_are_degenerate() {
        let mut m = QuadMapping::new(DeviceKind::Camera);
        m.set_vertices([[0, 0], [100, 0], [200, 0], [300, 0]]);
        assert_eq!(
            m.map_to_game(Point2::new(10.0, 10.0), GAME),
            Err(MappingError::DegenerateQuad)
        );
    }

    #[test]
    fn coincident_vertices_are_degenerate() {
        let mut m = QuadMapping::new(DeviceKind::Projector);
        m.set_vertices([[50, 50], [50, 50], [50, 50], [50, 50]]);
        assert_eq!(
            m.map_to_device(Point2::new(1.0, 1.0), GAME),
            Err(MappingError::DegenerateQuad)
        );
    }

    #[test]
    fn locked_mapping_ignores_vertex_moves() {
        let mut m = QuadMapping::new(DeviceKind::Camera);
        m.set_locked(true);
        assert!(!m.set_vertex(0, [999, 999]));
        assert_eq!(m.vertices(), DEFAULT_VERTICES);
        m.set_locked(false);
        assert!(m.set_vertex(0, [999, 999]));
    }

    #[test]
    fn moving_a_vertex_recomputes_transforms() {
        let mut m = QuadMapping::new(DeviceKind::Camera);
        let game = (256, 128);
        let before = m.map_to_device(Point2::new(0.0, 0.0), game).expect("map");
        assert!((before.x - 128.0).abs() < 1e-6);

        m.set_vertex(0, [100, 100]);
        let after = m.map_to_device(Point2::new(0.0, 0.0), game).expect("map");
        assert!((after.x - 100.0).abs() < 1e-6);
        assert!((after.y - 100.0).abs() < 1e-6);
    }

    #[test]
    fn overlay_is_memoized_until_invalidated() {
        let mut m = scenario_mapping();
        let frame = (2552, 1425);

        let (img, roi) = m.overlay(frame, true);
        assert!(!roi.is_empty());
        let ptr = img.data.as_ptr();
        let (img2, roi2) = m.overlay(frame, true);
        assert_eq!(roi, roi2);
        assert!(std::ptr::eq(ptr, img2.data.as_ptr()));

        m.set_vertex(1, [210, 180]);
        let (img3, _) = m.overlay(frame, true);
        assert!(!std::ptr::eq(ptr, img3.data.as_ptr()));
    }

    #[test]
    fn overlay_roi_is_padded_and_clamped() {
        let m = scenario_mapping();
        let roi = m.overlay_roi((2552, 1425));
        assert_eq!((roi.min_x, roi.min_y), (205 - OVERLAY_PADDING, 136 - OVERLAY_PADDING));
        // Right edge would exceed the frame width only if padded past it.
        assert!(roi.min_x + roi.width <= 2552);
        assert!(roi.min_y + roi.height <= 1425);
    }

    #[test]
    fn serde_skips_caches_and_defaults_flags() {
        let mut m = scenario_mapping();
        let _ = m.overlay((2552, 1425), true);
        let json = serde_json::to_string(&m).expect("serialize");
        let back: QuadMapping = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.vertices(), m.vertices());
        assert!(!back.locked());
        assert!(back.enabled());

        let minimal: QuadMapping = serde_json::from_str(
            r#"{"device":"camera","vertices":[[0,0],[10,0],[10,10],[0,10]]}"#,
        )
        .expect("minimal");
        assert!(!minimal.locked());
        assert!(minimal.enabled());
    }
}
