//! Monocular range and bearing estimation.
//!
//! Two interchangeable metric models, chosen per category:
//!
//! * pinhole width model (items, markers): known real width, measured pixel
//!   width and a calibrated focal length;
//! * ground-homography model (shelves, obstacles, walls, ramps): a pixel
//!   assumed to touch the ground, projected to metric ground coordinates.

use nalgebra::Point2;

use warebot_core::{CalibrationData, GroundHomography};

use crate::params::EstimatorParams;

#[derive(Clone, Copy, Debug)]
pub struct RangeBearingEstimator {
    focal_length_px: f64,
    homography: Option<GroundHomography>,
    max_bearing_deg: f64,
}

impl RangeBearingEstimator {
    pub fn new(calib: &CalibrationData, params: &EstimatorParams) -> Self {
        Self {
            focal_length_px: calib.focal_length_px,
            homography: calib.homography,
            max_bearing_deg: params.max_bearing_deg,
        }
    }

    #[inline]
    pub fn max_bearing_deg(&self) -> f64 {
        self.max_bearing_deg
    }

    /// Pinhole width model: `distance = realWidth * focal / pixelWidth`.
    ///
    /// Returns `None` for a non-positive pixel width.
    pub fn pinhole_distance(&self, real_width_m: f64, pixel_width: f64) -> Option<f64> {
        if pixel_width <= 0.0 {
            return None;
        }
        Some(real_width_m * self.focal_length_px / pixel_width)
    }

    /// Ground-homography model: project a ground-plane pixel and take the
    /// Euclidean distance. `None` when no homography is calibrated.
    pub fn ground_distance(&self, ground_pixel: Point2<f32>) -> Option<f64> {
        self.homography?.ground_distance(ground_pixel)
    }

    /// Linear bearing from horizontal pixel offset: zero at the image centre,
    /// +/- `max_bearing_deg` at the right/left edge.
    pub fn bearing_deg(&self, pixel_x: f64, image_width: usize) -> f64 {
        let half = image_width as f64 / 2.0;
        self.max_bearing_deg * (pixel_x - half) / half
    }
}
