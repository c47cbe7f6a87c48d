//! Alpha composition of zone overlays onto device frames.
//!
//! Frames pass through untouched (borrowed) unless at least one visible
//! overlay pixel lands on them; only then is the frame cloned and blended
//! into. Zones draw in registry order, so later names paint over earlier
//! ones, and game-plugin overlays paint over the zone borders.

use std::borrow::Cow;

use log::warn;
use tablevision_core::{RgbFrame, RgbaImage};

use crate::quad::{DeviceKind, Roi};
use crate::registry::ZoneRegistry;
use crate::Zone;

/// Source of game-space overlay images, typically a game plugin.
///
/// Returned images are RGBA at the zone's game resolution. The compositor
/// warps them through the zone's quad; implementors never deal with device
/// coordinates.
pub trait OverlayProvider {
    fn camera_overlay(&self, zone: &Zone) -> Option<RgbaImage>;
    fn projector_overlay(&self, zone: &Zone) -> Option<RgbaImage>;
}

fn has_visible_pixels(img: &RgbaImage) -> bool {
    img.data.chunks_exact(4).any(|px| px[3] > 0)
}

fn blend_over(frame: &mut RgbFrame, overlay: &RgbaImage, roi: Roi) {
    for y in 0..overlay.height {
        let fy = roi.min_y + y as i32;
        if fy < 0 || fy >= frame.height as i32 {
            continue;
        }
        for x in 0..overlay.width {
            let fx = roi.min_x + x as i32;
            if fx < 0 || fx >= frame.width as i32 {
                continue;
            }
            let src = overlay.pixel(x, y);
            if src[3] == 0 {
                continue;
            }
            let alpha = src[3] as f32 / 255.0;
            let base = frame.pixel(fx as usize, fy as usize);
            let mut out = [0u8; 3];
            for c in 0..3 {
                let v = base[c] as f32 * (1.0 - alpha) + src[c] as f32 * alpha;
                out[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            frame.set_pixel(fx as usize, fy as usize, out);
        }
    }
}

/// Composes zone border overlays and plugin overlays onto device frames.
#[derive(Default)]
pub struct OverlayCompositor;

impl OverlayCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Blend all overlays for `device` onto `frame`.
    ///
    /// Returns the input frame unchanged (no copy) when nothing visible was
    /// drawn. Zones whose quad cannot be warped are skipped with a warning
    /// rather than failing the whole frame.
    pub fn compose<'a>(
        &self,
        frame: &'a RgbFrame,
        device: DeviceKind,
        zones: &mut ZoneRegistry,
        providers: &[&dyn OverlayProvider],
    ) -> Cow<'a, RgbFrame> {
        let frame_size = (frame.width as u32, frame.height as u32);
        let mut out = Cow::Borrowed(frame);

        for zone in zones.iter_mut() {
            if !zone.mapping(device).enabled() {
                continue;
            }

            {
                let (img, roi) = zone.overlay(device, frame_size);
                if !roi.is_empty() && has_visible_pixels(img) {
                    blend_over(out.to_mut(), img, roi);
                }
            }

            for provider in providers {
                let game_overlay = match device {
                    DeviceKind::Camera => provider.camera_overlay(zone),
                    DeviceKind::Projector => provider.projector_overlay(zone),
                };
                let Some(game_overlay) = game_overlay else {
                    continue;
                };

                match zone.warp_game_overlay(device, &game_overlay) {
                    Ok((warped, roi)) => {
                        if !roi.is_empty() && has_visible_pixels(&warped) {
                            blend_over(out.to_mut(), &warped, roi);
                        }
                    }
                    Err(err) => {
                        warn!("skipping overlay for zone {:?}: {err}", zone.name());
                    }
                }
            }
        }

        out
    }
}
