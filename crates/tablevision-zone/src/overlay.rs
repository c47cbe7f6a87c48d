//! Rendering of mapping border overlays.
//!
//! Overlays are RGBA images covering the mapping's padded ROI. Edges are
//! stroked between consecutive vertices and each vertex gets a colored drag
//! marker. Locked mappings drop the markers, and optionally the borders too.

use tablevision_core::RgbaImage;

use crate::quad::Roi;

pub(crate) const VERTEX_MARKER_RADIUS: i32 = 8;
pub(crate) const EDGE_STROKE: i32 = 2;
/// Margin added around the quad so markers and strokes are never clipped.
pub const OVERLAY_PADDING: i32 = VERTEX_MARKER_RADIUS + EDGE_STROKE + 2;

const EDGE_COLOR: [u8; 4] = [0, 255, 0, 255];
const LOCKED_EDGE_COLOR: [u8; 4] = [255, 0, 0, 255];
/// One distinct marker color per vertex, in vertex order.
const VERTEX_COLORS: [[u8; 4]; 4] = [
    [0, 255, 255, 255],
    [255, 0, 255, 255],
    [255, 255, 0, 255],
    [255, 255, 255, 255],
];

#[derive(Clone, Debug)]
pub(crate) struct CachedOverlay {
    pub image: RgbaImage,
    pub roi: Roi,
    pub draw_locked_borders: bool,
    pub dirty: bool,
}

fn draw_disc(img: &mut RgbaImage, cx: i32, cy: i32, radius: i32, color: [u8; 4]) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 || x >= img.width as i32 || y >= img.height as i32 {
                continue;
            }
            img.set_pixel(x as usize, y as usize, color);
        }
    }
}

fn draw_segment(img: &mut RgbaImage, a: [i32; 2], b: [i32; 2], stroke: i32, color: [u8; 4]) {
    let steps = (b[0] - a[0]).abs().max((b[1] - a[1]).abs()).max(1);
    for t in 0..=steps {
        let x = a[0] + (b[0] - a[0]) * t / steps;
        let y = a[1] + (b[1] - a[1]) * t / steps;
        draw_disc(img, x, y, stroke / 2, color);
    }
}

pub(crate) fn render_mapping_overlay(
    vertices: &[[i32; 2]; 4],
    roi: Roi,
    locked: bool,
    draw_locked_borders: bool,
) -> RgbaImage {
    let mut img = RgbaImage::new(roi.width.max(0) as usize, roi.height.max(0) as usize);
    if roi.is_empty() || (locked && !draw_locked_borders) {
        return img;
    }

    let local = |v: [i32; 2]| [v[0] - roi.min_x, v[1] - roi.min_y];
    let edge_color = if locked { LOCKED_EDGE_COLOR } else { EDGE_COLOR };

    for i in 0..4 {
        let a = local(vertices[i]);
        let b = local(vertices[(i + 1) % 4]);
        draw_segment(&mut img, a, b, EDGE_STROKE, edge_color);
    }

    if !locked {
        for (v, color) in vertices.iter().zip(VERTEX_COLORS) {
            let p = local(*v);
            draw_disc(&mut img, p[0], p[1], VERTEX_MARKER_RADIUS, color);
        }
    }

    img
}
