//! Closed-form planar calibration.
//!
//! The intrinsic matrix is recovered from per-view board-to-image
//! homographies via the image of the absolute conic, extrinsics follow from
//! the homography columns, and the radial distortion pair is fitted by
//! linear least squares against the pinhole reprojections.

use nalgebra::{DMatrix, DVector, Matrix3, Point2, Point3, Vector3};

use crate::CalibrationError;

pub(crate) struct ViewPose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

fn v_ij(h: &Matrix3<f64>, i: usize, j: usize) -> [f64; 6] {
    [
        h[(0, i)] * h[(0, j)],
        h[(0, i)] * h[(1, j)] + h[(1, i)] * h[(0, j)],
        h[(1, i)] * h[(1, j)],
        h[(2, i)] * h[(0, j)] + h[(0, i)] * h[(2, j)],
        h[(2, i)] * h[(1, j)] + h[(1, i)] * h[(2, j)],
        h[(2, i)] * h[(2, j)],
    ]
}

/// Solve for the intrinsic matrix from at least three homographies.
pub(crate) fn intrinsics_from_homographies(
    homographies: &[Matrix3<f64>],
) -> Result<Matrix3<f64>, CalibrationError> {
    if homographies.len() < 3 {
        return Err(CalibrationError::SolverFailed(
            "at least three homographies required",
        ));
    }

    let mut v = DMatrix::<f64>::zeros(2 * homographies.len(), 6);
    for (i, h) in homographies.iter().enumerate() {
        let v12 = v_ij(h, 0, 1);
        let v11 = v_ij(h, 0, 0);
        let v22 = v_ij(h, 1, 1);
        for j in 0..6 {
            v[(2 * i, j)] = v12[j];
            v[(2 * i + 1, j)] = v11[j] - v22[j];
        }
    }

    let svd = v.svd(true, true);
    let vt = svd
        .v_t
        .ok_or(CalibrationError::SolverFailed("SVD failed on conic system"))?;
    let b = vt.row(vt.nrows() - 1);
    let mut b11 = b[0];
    let mut b12 = b[1];
    let mut b22 = b[2];
    let mut b13 = b[3];
    let mut b23 = b[4];
    let mut b33 = b[5];

    let mut denom = b11 * b22 - b12 * b12;
    if denom.abs() < 1e-18 || b11.abs() < 1e-18 {
        return Err(CalibrationError::SolverFailed("degenerate conic system"));
    }

    let mut v0 = (b12 * b13 - b11 * b23) / denom;
    let mut lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    // Nullspace sign is arbitrary; flip once if needed.
    if lambda <= 0.0 {
        b11 = -b11;
        b12 = -b12;
        b22 = -b22;
        b13 = -b13;
        b23 = -b23;
        b33 = -b33;
        denom = b11 * b22 - b12 * b12;
        if denom.abs() < 1e-18 || b11.abs() < 1e-18 {
            return Err(CalibrationError::SolverFailed("degenerate conic system"));
        }
        v0 = (b12 * b13 - b11 * b23) / denom;
        lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    }
    if lambda <= 0.0 {
        return Err(CalibrationError::SolverFailed(
            "conic solution is not positive definite",
        ));
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    Ok(Matrix3::new(alpha, gamma, u0, 0.0, beta, v0, 0.0, 0.0, 1.0))
}

/// Recover the view pose from its board-to-image homography.
pub(crate) fn pose_from_homography(
    k_inv: &Matrix3<f64>,
    h: &Matrix3<f64>,
) -> Result<ViewPose, CalibrationError> {
    let r1_raw = k_inv * h.column(0);
    let r2_raw = k_inv * h.column(1);
    let t_raw = k_inv * h.column(2);
    let scale = 1.0 / r1_raw.norm().max(1e-18);

    let r1 = r1_raw * scale;
    let r2 = r2_raw * scale;
    let r3 = r1.cross(&r2);
    let mut r = Matrix3::from_columns(&[r1, r2, r3]);

    // Project onto the closest proper rotation.
    let svd = r.svd(true, true);
    let u = svd
        .u
        .ok_or(CalibrationError::SolverFailed("SVD failed on rotation"))?;
    let vt = svd
        .v_t
        .ok_or(CalibrationError::SolverFailed("SVD failed on rotation"))?;
    r = u * vt;
    if r.determinant() < 0.0 {
        r = -r;
    }

    Ok(ViewPose {
        rotation: r,
        translation: t_raw.into_owned() * scale,
    })
}

/// Project a board point through the pinhole model with radial distortion.
pub(crate) fn project(
    k: &Matrix3<f64>,
    pose: &ViewPose,
    k1: f64,
    k2: f64,
    p: &Point3<f64>,
) -> Option<Point2<f64>> {
    let pc = pose.rotation * p.coords + pose.translation;
    if pc[2].abs() <= 1e-18 {
        return None;
    }
    let xn = pc[0] / pc[2];
    let yn = pc[1] / pc[2];

    let r2 = xn * xn + yn * yn;
    let factor = 1.0 + k1 * r2 + k2 * r2 * r2;
    let xd = xn * factor;
    let yd = yn * factor;

    let u = k[(0, 0)] * xd + k[(0, 1)] * yd + k[(0, 2)];
    let v = k[(1, 1)] * yd + k[(1, 2)];
    Some(Point2::new(u, v))
}

/// Fit `(k1, k2)` by linear least squares against the observed corners.
pub(crate) fn estimate_radial_distortion(
    k: &Matrix3<f64>,
    poses: &[ViewPose],
    object_points: &[Point3<f64>],
    image_points: &[&[Point2<f64>]],
) -> Result<(f64, f64), CalibrationError> {
    let total: usize = image_points.iter().map(|v| v.len()).sum();
    if total == 0 {
        return Err(CalibrationError::SolverFailed(
            "no points for distortion fit",
        ));
    }

    let cx = k[(0, 2)];
    let cy = k[(1, 2)];

    let mut a = DMatrix::<f64>::zeros(2 * total, 2);
    let mut b = DVector::<f64>::zeros(2 * total);
    let mut row = 0;

    for (pose, observed) in poses.iter().zip(image_points.iter()) {
        for (p3, obs) in object_points.iter().zip(observed.iter()) {
            let pc = pose.rotation * p3.coords + pose.translation;
            if pc[2].abs() <= 1e-18 {
                continue;
            }
            let xn = pc[0] / pc[2];
            let yn = pc[1] / pc[2];
            let r2 = xn * xn + yn * yn;
            let r4 = r2 * r2;

            let u = k[(0, 0)] * xn + k[(0, 1)] * yn + cx;
            let v = k[(1, 1)] * yn + cy;

            a[(row, 0)] = (u - cx) * r2;
            a[(row, 1)] = (u - cx) * r4;
            b[row] = obs.x - u;
            a[(row + 1, 0)] = (v - cy) * r2;
            a[(row + 1, 1)] = (v - cy) * r4;
            b[row + 1] = obs.y - v;
            row += 2;
        }
    }

    let svd = a.svd(true, true);
    let x = svd
        .solve(&b, 1e-12)
        .map_err(|_| CalibrationError::SolverFailed("distortion least squares failed"))?;
    Ok((x[0], x[1]))
}

/// Per-view L2 reprojection error divided by the corner count, averaged
/// over all views.
pub(crate) fn mean_reprojection_error(
    k: &Matrix3<f64>,
    poses: &[ViewPose],
    k1: f64,
    k2: f64,
    object_points: &[Point3<f64>],
    image_points: &[&[Point2<f64>]],
) -> f64 {
    let mut total = 0.0;
    let mut views = 0usize;

    for (pose, observed) in poses.iter().zip(image_points.iter()) {
        let mut sq_sum = 0.0;
        let mut count = 0usize;
        for (p3, obs) in object_points.iter().zip(observed.iter()) {
            let Some(pred) = project(k, pose, k1, k2, p3) else {
                continue;
            };
            let d = pred - obs;
            sq_sum += d.norm_squared();
            count += 1;
        }
        if count > 0 {
            total += sq_sum.sqrt() / count as f64;
            views += 1;
        }
    }

    if views == 0 {
        return f64::INFINITY;
    }
    total / views as f64
}
