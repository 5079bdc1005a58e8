//! Per-frame orchestration: prepared frame in, registry snapshot out.

use warebot_core::{CalibrationData, Category, Frame};

use crate::detection::{DetectedObject, MarkerIdentity, RangeBearing, ShelfCorner, ShelfSide};
use crate::estimate::RangeBearingEstimator;
use crate::params::VisionParams;
use crate::preprocess::Preprocessor;
use crate::registry::DetectionRegistry;
use crate::segment::{wall_region_mask, CategoryDetector};

/// Everything derived from one frame: the slot registry the task loop
/// consumes, plus the full object list for logging and offline inspection.
#[derive(Clone, Debug)]
pub struct FrameAnalysis {
    pub registry: DetectionRegistry,
    pub objects: Vec<DetectedObject>,
}

/// The full segmentation -> classification -> estimation -> registry pipeline.
///
/// Owns an immutable calibration record; every cycle is a pure function of the
/// input frame.
pub struct PerceptionPipeline {
    params: VisionParams,
    calib: CalibrationData,
    preprocessor: Preprocessor,
    estimator: RangeBearingEstimator,
}

impl PerceptionPipeline {
    pub fn new(calib: CalibrationData, params: VisionParams) -> Self {
        let preprocessor = Preprocessor::new(params.preprocess);
        let estimator = RangeBearingEstimator::new(&calib, &params.estimator);
        Self {
            params,
            calib,
            preprocessor,
            estimator,
        }
    }

    pub fn params(&self) -> &VisionParams {
        &self.params
    }

    pub fn calib(&self) -> &CalibrationData {
        &self.calib
    }

    pub fn estimator(&self) -> &RangeBearingEstimator {
        &self.estimator
    }

    /// Run one full cycle and return both the registry and the object list.
    pub fn analyze(&self, frame: &Frame) -> FrameAnalysis {
        let prepared = self.preprocessor.prepare(frame);
        let (wall_region, _) =
            wall_region_mask(&prepared, &self.params.wall, self.params.morph_kernel);

        let mut objects = Vec::new();
        for category in Category::ALL {
            let detector = CategoryDetector::new(category, &self.params, &self.estimator);
            objects.extend(detector.detect(&prepared, &self.calib, Some(&wall_region)));
        }

        let width = prepared.width();
        let mut registry = DetectionRegistry::new();
        for obj in &objects {
            match obj.category {
                Category::Item => {
                    if let Some(rb) = obj.measure() {
                        registry.push_item(rb);
                    }
                }
                Category::Shelf => {
                    // one slot per base corner, left then right; corners stay
                    // empty when the ground homography is not calibrated
                    if let Some([left, right]) = obj.corners {
                        for (side, pt) in
                            [(ShelfSide::Left, left), (ShelfSide::Right, right)]
                        {
                            if let Some(range) = self.estimator.ground_distance(pt) {
                                let measure = RangeBearing::new(
                                    range,
                                    self.estimator.bearing_deg(pt.x as f64, width),
                                );
                                registry.push_shelf_corner(ShelfCorner { side, measure });
                            }
                        }
                    }
                }
                Category::Marker => match (obj.marker, obj.measure()) {
                    (Some(MarkerIdentity::Row(n)), Some(rb)) => {
                        registry.set_row_marker(n, rb);
                    }
                    (Some(MarkerIdentity::PackingStation), Some(rb)) => {
                        registry.set_packing_bay(rb);
                    }
                    _ => {}
                },
                Category::Obstacle => {
                    if let Some(rb) = obj.measure() {
                        registry.push_obstacle(rb);
                    }
                }
                // walls and ramps inform gating and logging only
                Category::Wall | Category::Ramp => {}
            }
        }

        log::debug!(
            "frame analyzed: {} objects, {} obstacles",
            objects.len(),
            registry.obstacles.len()
        );
        FrameAnalysis { registry, objects }
    }

    /// Convenience wrapper returning only the registry snapshot.
    pub fn process(&self, frame: &Frame) -> DetectionRegistry {
        self.analyze(frame).registry
    }
}
