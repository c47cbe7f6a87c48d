//! Gradient-based subpixel corner refinement.
//!
//! Each corner is pulled toward the saddle point of the local intensity
//! surface: inside a Gaussian-weighted window, every pixel whose gradient is
//! nonzero contributes the constraint that the gradient is perpendicular to
//! the vector from the corner to that pixel. Solving the resulting 2x2
//! normal equations and iterating converges on the saddle.

use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};
use tablevision_core::{sample_bilinear, GrayImageView};

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct RefineParams {
    /// Half of the search window side, in pixels.
    pub half_window: u32,
    pub max_iterations: u32,
    /// Stop once the update step is shorter than this, in pixels.
    pub epsilon: f64,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            half_window: 11,
            max_iterations: 30,
            epsilon: 1e-3,
        }
    }
}

/// Refine one corner estimate. Windows with no usable gradient (flat or
/// near-flat patches) leave the input unchanged.
pub fn refine_corner(img: &GrayImageView<'_>, start: Point2<f64>, params: &RefineParams) -> Point2<f64> {
    let hw = params.half_window as i32;
    let sigma = params.half_window as f64 / 2.0;
    let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);

    let mut c = start;

    for _ in 0..params.max_iterations {
        let mut a = Matrix2::<f64>::zeros();
        let mut b = Vector2::<f64>::zeros();

        for dy in -hw..=hw {
            for dx in -hw..=hw {
                let qx = c.x + dx as f64;
                let qy = c.y + dy as f64;

                let gx = (sample_bilinear(img, (qx + 1.0) as f32, qy as f32)
                    - sample_bilinear(img, (qx - 1.0) as f32, qy as f32))
                    as f64
                    * 0.5;
                let gy = (sample_bilinear(img, qx as f32, (qy + 1.0) as f32)
                    - sample_bilinear(img, qx as f32, (qy - 1.0) as f32))
                    as f64
                    * 0.5;

                let r2 = (dx * dx + dy * dy) as f64;
                let w = (-r2 * inv_two_sigma_sq).exp();

                let gxx = w * gx * gx;
                let gxy = w * gx * gy;
                let gyy = w * gy * gy;

                a[(0, 0)] += gxx;
                a[(0, 1)] += gxy;
                a[(1, 0)] += gxy;
                a[(1, 1)] += gyy;

                b[0] += gxx * qx + gxy * qy;
                b[1] += gxy * qx + gyy * qy;
            }
        }

        let det = a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)];
        if det.abs() < 1e-9 {
            break; // no gradient structure, keep the current estimate
        }

        let Some(inv) = a.try_inverse() else { break };
        let next = inv * b;
        let step = Vector2::new(next[0] - c.x, next[1] - c.y);
        c = Point2::new(next[0], next[1]);

        if step.norm() < params.epsilon {
            break;
        }
    }

    c
}

/// Refine all corners in place.
pub fn refine_corners(img: &GrayImageView<'_>, points: &mut [Point2<f64>], params: &RefineParams) {
    for p in points.iter_mut() {
        *p = refine_corner(img, *p, params);
    }
}
