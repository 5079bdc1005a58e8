//! Per-category colour segmentation, contour filtering and classification.
//!
//! Every category runs the same canonical stages: threshold to a binary mask,
//! open/close morphology, external contours, blob filters, then the
//! category-specific tail (shape + identity for markers, base corners for
//! shelves). The wall sub-detector is the exception: it thresholds the
//! grayscale plane and its filled region gates where markers may appear.

use nalgebra::Point2;

use warebot_core::{
    find_external_contours, gray_threshold, in_range, mask, CalibrationData, Category, Contour,
    GrayImage,
};

use crate::detection::{DetectedObject, MarkerIdentity, Shape};
use crate::estimate::RangeBearingEstimator;
use crate::params::{
    BlobFilterParams, MarkerClassifierParams, ShelfCornerParams, VisionParams, WallParams,
};
use crate::preprocess::PreparedFrame;

/// Binary mask for a colour category: HSV in-range, then opening to drop
/// speckle and closing to bridge small gaps.
pub fn category_mask(
    prepared: &PreparedFrame,
    calib: &CalibrationData,
    category: Category,
    morph_kernel: usize,
) -> Option<GrayImage> {
    let profile = calib.color_profile(category).ok()?;
    let raw = in_range(&prepared.hsv, profile);
    let opened = mask::open(&raw, morph_kernel);
    Some(mask::close(&opened, morph_kernel))
}

/// Bright-wall region: grayscale threshold, solidity/area filter, contours
/// filled solid. Markers are only accepted inside this region.
pub fn wall_region_mask(
    prepared: &PreparedFrame,
    params: &WallParams,
    morph_kernel: usize,
) -> (GrayImage, Vec<Contour>) {
    let raw = gray_threshold(&prepared.gray, params.min_brightness);
    let cleaned = mask::close(&mask::open(&raw, morph_kernel), morph_kernel);

    let mut region = GrayImage::zeros(cleaned.width, cleaned.height);
    let mut walls = Vec::new();
    for contour in find_external_contours(&cleaned) {
        if contour.area() < params.min_area || contour.solidity() < params.min_solidity {
            continue;
        }
        mask::fill_polygon(&mut region, &contour.points);
        walls.push(contour);
    }
    (region, walls)
}

/// Blob acceptance chain: area, aspect ratio, solidity, fill ratio.
/// Degenerate contours produce zero metrics and are rejected here.
pub fn filter_contours(contours: Vec<Contour>, filter: &BlobFilterParams) -> Vec<Contour> {
    contours
        .into_iter()
        .filter(|c| {
            let area = c.area();
            if area < filter.min_area {
                return false;
            }
            let aspect = c.aspect_ratio();
            if aspect < filter.aspect[0] || aspect > filter.aspect[1] {
                return false;
            }
            c.solidity() >= filter.min_solidity && c.fill_ratio() >= filter.min_fill_ratio
        })
        .collect()
}

/// Marker shape classification: circularity first, reduced polygon second.
pub fn classify_shape(contour: &Contour, params: &MarkerClassifierParams) -> Shape {
    if contour.circularity() >= params.min_circle_circularity {
        return Shape::Circle;
    }
    let poly = contour.approx_polygon(params.poly_tol_frac * contour.perimeter());
    let n = poly.len();
    if n >= params.square_vertices[0] && n <= params.square_vertices[1] {
        Shape::Square
    } else {
        Shape::Unclassified
    }
}

/// Resolve marker identities for one frame.
///
/// Row identity is the global circle count: one circle in the frame means
/// every circle is "row marker 1", two circles "row marker 2", three "row
/// marker 3". Squares are the packing-station marker; everything else is
/// unknown and later dropped. The global count breaks down when a marker is
/// occluded or blobs merge; callers must tolerate misidentification.
pub fn resolve_marker_identities(shapes: &[Shape]) -> Vec<MarkerIdentity> {
    let circles = shapes.iter().filter(|s| **s == Shape::Circle).count();
    shapes
        .iter()
        .map(|s| match s {
            Shape::Circle if (1..=3).contains(&circles) => MarkerIdentity::Row(circles as u8),
            Shape::Square => MarkerIdentity::PackingStation,
            _ => MarkerIdentity::Unknown,
        })
        .collect()
}

/// Bottom-left and bottom-right base corners of a shelf contour.
///
/// The contour is simplified with a tight tolerance, then for each side the
/// extreme-x vertex is found, all vertices within a small x band of it are
/// gathered, and the lowest (max y) of those is taken.
pub fn shelf_base_corners(
    contour: &Contour,
    params: &ShelfCornerParams,
) -> Option<[Point2<f32>; 2]> {
    let poly = contour.approx_polygon(params.poly_tol_frac * contour.perimeter());
    if poly.len() < 3 {
        return None;
    }
    let left = extreme_bottom(&poly, params.x_band_px, false)?;
    let right = extreme_bottom(&poly, params.x_band_px, true)?;
    Some([left, right])
}

fn extreme_bottom(poly: &[Point2<f32>], band: f32, rightmost: bool) -> Option<Point2<f32>> {
    let extreme_x = poly
        .iter()
        .map(|p| p.x)
        .fold(if rightmost { f32::NEG_INFINITY } else { f32::INFINITY }, |acc, x| {
            if rightmost {
                acc.max(x)
            } else {
                acc.min(x)
            }
        });
    poly.iter()
        .filter(|p| (p.x - extreme_x).abs() <= band)
        .max_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        .copied()
}

/// One canonical detector per category; the same struct serves every variant.
pub struct CategoryDetector<'a> {
    category: Category,
    params: &'a VisionParams,
    estimator: &'a RangeBearingEstimator,
}

impl<'a> CategoryDetector<'a> {
    pub fn new(
        category: Category,
        params: &'a VisionParams,
        estimator: &'a RangeBearingEstimator,
    ) -> Self {
        Self {
            category,
            params,
            estimator,
        }
    }

    /// Detect, classify and measure all objects of this category in one
    /// prepared frame. `wall_region` must be supplied for markers.
    pub fn detect(
        &self,
        prepared: &PreparedFrame,
        calib: &CalibrationData,
        wall_region: Option<&GrayImage>,
    ) -> Vec<DetectedObject> {
        let mask = match self.category {
            Category::Wall => match wall_region {
                Some(region) => region.clone(),
                None => wall_region_mask(prepared, &self.params.wall, self.params.morph_kernel).0,
            },
            _ => {
                let Some(mut m) =
                    category_mask(prepared, calib, self.category, self.params.morph_kernel)
                else {
                    log::debug!("no color profile for {}; skipping", self.category);
                    return Vec::new();
                };
                if self.category == Category::Marker {
                    match wall_region {
                        Some(region) => m = mask::and(&m, region),
                        None => return Vec::new(),
                    }
                }
                m
            }
        };

        let contours = filter_contours(
            find_external_contours(&mask),
            self.params.filter_for(self.category),
        );
        log::trace!("{}: {} contours after filters", self.category, contours.len());

        match self.category {
            Category::Marker => self.build_markers(prepared, contours),
            _ => contours
                .into_iter()
                .map(|c| self.build_plain(prepared, c))
                .collect(),
        }
    }

    fn build_plain(&self, prepared: &PreparedFrame, contour: Contour) -> DetectedObject {
        let bbox = contour.bounding_box();
        let width = prepared.width();

        let (distance, bearing_deg, corners) = match self.category {
            Category::Item => (
                self.estimator
                    .pinhole_distance(self.params.estimator.item_width_m, bbox.w as f64),
                self.estimator.bearing_deg(bbox.center_x() as f64, width),
                None,
            ),
            Category::Shelf => {
                let corners = shelf_base_corners(&contour, &self.params.shelf_corner);
                let anchor = corners.map(|c| c[0]).unwrap_or_else(|| bbox.bottom_center());
                (
                    self.estimator.ground_distance(anchor),
                    self.estimator.bearing_deg(anchor.x as f64, width),
                    corners,
                )
            }
            // obstacle, wall, ramp: ground model at the bbox bottom centre
            _ => {
                let ground = bbox.bottom_center();
                (
                    self.estimator.ground_distance(ground),
                    self.estimator.bearing_deg(ground.x as f64, width),
                    None,
                )
            }
        };

        DetectedObject {
            category: self.category,
            shape: Shape::Unclassified,
            bbox,
            contour,
            distance,
            bearing_deg,
            corners,
            marker: None,
        }
    }

    fn build_markers(&self, prepared: &PreparedFrame, contours: Vec<Contour>) -> Vec<DetectedObject> {
        let shapes: Vec<Shape> = contours
            .iter()
            .map(|c| classify_shape(c, &self.params.marker_classifier))
            .collect();

        // Unclassified marker blobs are discarded before identity resolution.
        let kept: Vec<(Contour, Shape)> = contours
            .into_iter()
            .zip(shapes)
            .filter(|(_, s)| *s != Shape::Unclassified)
            .collect();

        let identities =
            resolve_marker_identities(&kept.iter().map(|(_, s)| *s).collect::<Vec<_>>());

        kept.into_iter()
            .zip(identities)
            .map(|((contour, shape), identity)| {
                let bbox = contour.bounding_box();
                let distance = self
                    .estimator
                    .pinhole_distance(self.params.estimator.marker_width_m, bbox.w as f64);
                let bearing_deg = self
                    .estimator
                    .bearing_deg(bbox.center_x() as f64, prepared.width());
                DetectedObject {
                    category: Category::Marker,
                    shape,
                    bbox,
                    contour,
                    distance,
                    bearing_deg,
                    corners: None,
                    marker: Some(identity),
                }
            })
            .collect()
    }
}
