use log::info;
use nalgebra::{Point2, Point3, Rotation3, Vector3};
use tablevision_checkerboard::{
    reference_points, CheckerboardConfig, CheckerboardDetector, RefineParams,
};
use tablevision_core::{estimate_homography, GrayImage};

use crate::types::{CalibrationFrame, CalibrationView, CameraIntrinsics};
use crate::zhang;
use crate::CalibrationError;

/// Collects three checkerboard views and solves for camera intrinsics.
///
/// Views are captured independently and may be recaptured at any time;
/// `calibrate_camera` is all-or-nothing and leaves the collected views
/// untouched, so a failed solve can be retried after recapturing.
pub struct IntrinsicCalibrator {
    detector: CheckerboardDetector,
    refine: RefineParams,
    frames: [Option<CalibrationFrame>; 3],
}

impl IntrinsicCalibrator {
    pub fn new(config: CheckerboardConfig) -> Result<Self, CalibrationError> {
        Ok(Self {
            detector: CheckerboardDetector::new(config)?,
            refine: RefineParams::default(),
            frames: [None, None, None],
        })
    }

    pub fn set_refine_params(&mut self, refine: RefineParams) {
        self.refine = refine;
    }

    pub fn checkerboard_dimensions(&self) -> (u32, u32) {
        let cfg = self.detector.config();
        (cfg.squares_w, cfg.squares_h)
    }

    /// Change the board size. Collected views are discarded since their
    /// lattices no longer match.
    pub fn set_checkerboard_dimensions(
        &mut self,
        squares_w: u32,
        squares_h: u32,
    ) -> Result<(), CalibrationError> {
        let mut config = self.detector.config().clone();
        config.squares_w = squares_w;
        config.squares_h = squares_h;
        self.detector = CheckerboardDetector::new(config)?;
        self.frames = [None, None, None];
        Ok(())
    }

    /// Detect the board in `img`, refine its corners to subpixel precision
    /// and store the result for `view`.
    pub fn capture_view(
        &mut self,
        view: CalibrationView,
        img: &GrayImage,
    ) -> Result<(), CalibrationError> {
        let detection = self.detector.detect(img)?;
        let mut corners = detection.corners;
        tablevision_checkerboard::refine_corners(&img.view(), &mut corners, &self.refine);

        info!(
            "captured {:?} view: {} corners at {}x{}",
            view,
            corners.len(),
            img.width,
            img.height
        );

        self.frames[view.index()] = Some(CalibrationFrame {
            view,
            resolution: (img.width as u32, img.height as u32),
            cols: detection.cols,
            rows: detection.rows,
            corners,
        });
        Ok(())
    }

    /// Store an externally produced frame, validating its lattice size.
    pub fn set_view(&mut self, frame: CalibrationFrame) -> Result<(), CalibrationError> {
        let (want_cols, want_rows) = self.detector.config().inner_corners();
        if frame.cols != want_cols
            || frame.rows != want_rows
            || frame.corners.len() != want_cols * want_rows
        {
            return Err(CalibrationError::LatticeMismatch {
                view: frame.view,
                got_cols: frame.cols,
                got_rows: frame.rows,
                want_cols,
                want_rows,
            });
        }
        let idx = frame.view.index();
        self.frames[idx] = Some(frame);
        Ok(())
    }

    pub fn clear_view(&mut self, view: CalibrationView) {
        self.frames[view.index()] = None;
    }

    pub fn clear(&mut self) {
        self.frames = [None, None, None];
    }

    pub fn missing_views(&self) -> Vec<CalibrationView> {
        CalibrationView::ALL
            .into_iter()
            .filter(|v| self.frames[v.index()].is_none())
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.missing_views().is_empty()
    }

    /// Solve for intrinsics from the three collected views.
    pub fn calibrate_camera(&self) -> Result<CameraIntrinsics, CalibrationError> {
        let missing = self.missing_views();
        if !missing.is_empty() {
            return Err(CalibrationError::MissingViews(missing));
        }

        let frames: Vec<&CalibrationFrame> = self
            .frames
            .iter()
            .map(|f| f.as_ref())
            .collect::<Option<Vec<_>>>()
            .ok_or(CalibrationError::MissingViews(vec![]))?;

        let resolution = frames[0].resolution;
        for frame in &frames[1..] {
            if frame.resolution != resolution {
                return Err(CalibrationError::ResolutionMismatch {
                    view: frame.view,
                    got: frame.resolution,
                    want: resolution,
                });
            }
        }

        let reference_winding = frames[0].winding();
        if frames
            .iter()
            .any(|f| f.winding() * reference_winding <= 0.0)
        {
            return Err(CalibrationError::InconsistentOrientation);
        }

        let (squares_w, squares_h) = self.checkerboard_dimensions();
        let object_points: Vec<Point3<f64>> = reference_points(squares_w, squares_h);
        let object_2d: Vec<Point2<f64>> =
            object_points.iter().map(|p| Point2::new(p.x, p.y)).collect();

        let mut homographies = Vec::with_capacity(frames.len());
        for frame in &frames {
            let h = estimate_homography(&object_2d, &frame.corners)
                .ok_or(CalibrationError::SolverFailed("homography estimation failed"))?;
            homographies.push(h.h);
        }

        let camera_matrix = zhang::intrinsics_from_homographies(&homographies)?;
        let k_inv = camera_matrix
            .try_inverse()
            .ok_or(CalibrationError::SolverFailed("singular camera matrix"))?;

        let mut poses = Vec::with_capacity(homographies.len());
        for h in &homographies {
            poses.push(zhang::pose_from_homography(&k_inv, h)?);
        }

        let image_points: Vec<&[Point2<f64>]> =
            frames.iter().map(|f| f.corners.as_slice()).collect();
        let (k1, k2) = zhang::estimate_radial_distortion(
            &camera_matrix,
            &poses,
            &object_points,
            &image_points,
        )?;

        let mean_reprojection_error = zhang::mean_reprojection_error(
            &camera_matrix,
            &poses,
            k1,
            k2,
            &object_points,
            &image_points,
        );

        if !mean_reprojection_error.is_finite()
            || !camera_matrix.iter().all(|v| v.is_finite())
            || !k1.is_finite()
            || !k2.is_finite()
        {
            return Err(CalibrationError::SolverFailed(
                "solution contains non-finite values",
            ));
        }

        let mut rotations = [Vector3::zeros(); 3];
        let mut translations = [Vector3::zeros(); 3];
        for (i, pose) in poses.iter().enumerate() {
            rotations[i] = Rotation3::from_matrix_unchecked(pose.rotation).scaled_axis();
            translations[i] = pose.translation;
        }

        info!(
            "calibration solved: fx={:.2} fy={:.2} mean reprojection error {:.4}px",
            camera_matrix[(0, 0)],
            camera_matrix[(1, 1)],
            mean_reprojection_error
        );

        Ok(CameraIntrinsics {
            camera_matrix,
            distortion: [k1, k2, 0.0, 0.0, 0.0],
            rotations,
            translations,
            mean_reprojection_error,
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zhang::{project, ViewPose};
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn test_camera() -> Matrix3<f64> {
        Matrix3::new(800.0, 0.0, 320.0, 0.0, 820.0, 240.0, 0.0, 0.0, 1.0)
    }

    fn synthetic_frame(
        view: CalibrationView,
        k: &Matrix3<f64>,
        pose: &ViewPose,
        squares: (u32, u32),
    ) -> CalibrationFrame {
        let object = reference_points(squares.0, squares.1);
        let corners: Vec<Point2<f64>> = object
            .iter()
            .map(|p| project(k, pose, 0.0, 0.0, p).expect("in front of camera"))
            .collect();
        CalibrationFrame {
            view,
            resolution: (640, 480),
            cols: squares.0 as usize - 1,
            rows: squares.1 as usize - 1,
            corners,
        }
    }

    fn tilted_pose(rx: f64, ry: f64, rz: f64) -> ViewPose {
        ViewPose {
            rotation: Rotation3::from_euler_angles(rx, ry, rz).into_inner(),
            translation: Vector3::new(-2.5, 2.0, 12.0),
        }
    }

    fn loaded_calibrator(squares: (u32, u32)) -> IntrinsicCalibrator {
        let k = test_camera();
        let mut calibrator =
            IntrinsicCalibrator::new(CheckerboardConfig::with_squares(squares.0, squares.1))
                .expect("config");
        let poses = [
            tilted_pose(0.3, 0.0, 0.0),
            tilted_pose(0.0, -0.35, 0.0),
            tilted_pose(0.2, 0.25, 0.05),
        ];
        for (view, pose) in CalibrationView::ALL.into_iter().zip(poses.iter()) {
            calibrator
                .set_view(synthetic_frame(view, &k, pose, squares))
                .expect("frame accepted");
        }
        calibrator
    }

    #[test]
    fn reports_missing_views() {
        let calibrator =
            IntrinsicCalibrator::new(CheckerboardConfig::default()).expect("config");
        assert!(!calibrator.is_ready());
        let err = calibrator.calibrate_camera().unwrap_err();
        match err {
            CalibrationError::MissingViews(views) => {
                assert_eq!(views, CalibrationView::ALL.to_vec());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_lattice_of_wrong_size() {
        let mut calibrator =
            IntrinsicCalibrator::new(CheckerboardConfig::with_squares(7, 6)).expect("config");
        let k = test_camera();
        let frame = synthetic_frame(CalibrationView::Top, &k, &tilted_pose(0.3, 0.0, 0.0), (5, 4));
        assert!(matches!(
            calibrator.set_view(frame),
            Err(CalibrationError::LatticeMismatch { .. })
        ));
    }

    #[test]
    fn changing_dimensions_discards_views() {
        let mut calibrator = loaded_calibrator((7, 6));
        assert!(calibrator.is_ready());
        calibrator.set_checkerboard_dimensions(9, 7).expect("resize");
        assert_eq!(calibrator.missing_views().len(), 3);
    }

    #[test]
    fn recovers_known_intrinsics_from_synthetic_views() {
        let calibrator = loaded_calibrator((7, 6));
        let result = calibrator.calibrate_camera().expect("calibration");

        let k = test_camera();
        assert_relative_eq!(result.fx(), k[(0, 0)], max_relative = 1e-4);
        assert_relative_eq!(result.fy(), k[(1, 1)], max_relative = 1e-4);
        let (cx, cy) = result.principal_point();
        assert_relative_eq!(cx, k[(0, 2)], max_relative = 1e-3);
        assert_relative_eq!(cy, k[(1, 2)], max_relative = 1e-3);

        assert!(result.mean_reprojection_error < 1e-4);
        assert!(result.distortion[0].abs() < 1e-6);
        assert!(result.distortion[1].abs() < 1e-6);
        assert_eq!(result.resolution, (640, 480));
    }

    #[test]
    fn mirrored_view_fails_with_inconsistent_orientation() {
        let mut calibrator = loaded_calibrator((7, 6));

        let k = test_camera();
        let mut frame =
            synthetic_frame(CalibrationView::Side, &k, &tilted_pose(0.2, 0.25, 0.05), (7, 6));
        // Mirror each lattice row to flip the winding.
        for row in frame.corners.chunks_mut(frame.cols) {
            row.reverse();
        }
        calibrator.set_view(frame).expect("frame accepted");

        assert!(matches!(
            calibrator.calibrate_camera(),
            Err(CalibrationError::InconsistentOrientation)
        ));
    }

    #[test]
    fn mismatched_resolutions_are_rejected() {
        let mut calibrator = loaded_calibrator((7, 6));
        let k = test_camera();
        let mut frame =
            synthetic_frame(CalibrationView::Front, &k, &tilted_pose(0.0, -0.35, 0.0), (7, 6));
        frame.resolution = (1280, 720);
        calibrator.set_view(frame).expect("frame accepted");

        assert!(matches!(
            calibrator.calibrate_camera(),
            Err(CalibrationError::ResolutionMismatch { .. })
        ));
    }
}
