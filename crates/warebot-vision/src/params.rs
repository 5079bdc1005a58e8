use serde::{Deserialize, Serialize};

use warebot_core::Category;

/// Frame preparation settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Uniform downscale factor in (0, 1]. Calibration (focal length,
    /// homography) must match the scaled resolution.
    pub scale: f32,
    /// Gaussian blur kernel side (odd); 0 or 1 disables blurring.
    pub blur_kernel: usize,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            blur_kernel: 5,
        }
    }
}

/// Contour acceptance thresholds shared by every category detector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BlobFilterParams {
    /// Minimum contour area in px^2.
    pub min_area: f32,
    /// Accepted bounding-box aspect ratio (w/h) range.
    pub aspect: [f32; 2],
    /// Minimum contour area over convex-hull area.
    pub min_solidity: f32,
    /// Minimum contour area over bounding-box area.
    pub min_fill_ratio: f32,
}

impl Default for BlobFilterParams {
    fn default() -> Self {
        Self {
            min_area: 300.0,
            aspect: [0.3, 3.0],
            min_solidity: 0.5,
            min_fill_ratio: 0.1,
        }
    }
}

impl BlobFilterParams {
    pub fn with_min_area(min_area: f32) -> Self {
        Self {
            min_area,
            ..Self::default()
        }
    }
}

/// Shape classification thresholds for the marker category.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerClassifierParams {
    /// Circularity at or above this is a circle.
    pub min_circle_circularity: f32,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub poly_tol_frac: f32,
    /// Inclusive vertex-count range accepted as a square.
    pub square_vertices: [usize; 2],
}

impl Default for MarkerClassifierParams {
    fn default() -> Self {
        Self {
            min_circle_circularity: 0.85,
            poly_tol_frac: 0.02,
            square_vertices: [4, 7],
        }
    }
}

/// Shelf base-corner extraction settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShelfCornerParams {
    /// Tight polygon simplification tolerance, fraction of perimeter.
    pub poly_tol_frac: f32,
    /// Width of the x band gathered around the extreme point, in px.
    pub x_band_px: f32,
}

impl Default for ShelfCornerParams {
    fn default() -> Self {
        Self {
            poly_tol_frac: 0.001,
            x_band_px: 4.0,
        }
    }
}

/// Bright-wall sub-detector settings. The filled wall region gates marker
/// segmentation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WallParams {
    /// Grayscale threshold for bright wall surfaces.
    pub min_brightness: u8,
    pub min_solidity: f32,
    pub min_area: f32,
}

impl Default for WallParams {
    fn default() -> Self {
        Self {
            min_brightness: 170,
            min_solidity: 0.5,
            min_area: 400.0,
        }
    }
}

/// Metric estimation settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EstimatorParams {
    /// Half horizontal FOV in degrees; bearing at the image edge. One
    /// constant for every category.
    pub max_bearing_deg: f64,
    /// Real item width in metres for the pinhole model.
    pub item_width_m: f64,
    /// Real marker width in metres for the pinhole model.
    pub marker_width_m: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            max_bearing_deg: 30.0,
            item_width_m: 0.05,
            marker_width_m: 0.07,
        }
    }
}

/// Full perception-pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VisionParams {
    #[serde(default)]
    pub preprocess: PreprocessParams,
    /// Morphological open/close structuring element side.
    #[serde(default = "default_morph_kernel")]
    pub morph_kernel: usize,
    #[serde(default = "default_item_filter")]
    pub item_filter: BlobFilterParams,
    #[serde(default = "default_shelf_filter")]
    pub shelf_filter: BlobFilterParams,
    #[serde(default = "default_marker_filter")]
    pub marker_filter: BlobFilterParams,
    #[serde(default = "default_obstacle_filter")]
    pub obstacle_filter: BlobFilterParams,
    #[serde(default = "default_ramp_filter")]
    pub ramp_filter: BlobFilterParams,
    #[serde(default)]
    pub marker_classifier: MarkerClassifierParams,
    #[serde(default)]
    pub shelf_corner: ShelfCornerParams,
    #[serde(default)]
    pub wall: WallParams,
    #[serde(default)]
    pub estimator: EstimatorParams,
}

fn default_morph_kernel() -> usize {
    5
}

fn default_item_filter() -> BlobFilterParams {
    BlobFilterParams::with_min_area(150.0)
}

fn default_shelf_filter() -> BlobFilterParams {
    BlobFilterParams::with_min_area(1000.0)
}

fn default_marker_filter() -> BlobFilterParams {
    BlobFilterParams::with_min_area(100.0)
}

fn default_obstacle_filter() -> BlobFilterParams {
    BlobFilterParams::with_min_area(400.0)
}

fn default_ramp_filter() -> BlobFilterParams {
    BlobFilterParams::with_min_area(600.0)
}

impl Default for VisionParams {
    fn default() -> Self {
        Self {
            preprocess: PreprocessParams::default(),
            morph_kernel: default_morph_kernel(),
            item_filter: default_item_filter(),
            shelf_filter: default_shelf_filter(),
            marker_filter: default_marker_filter(),
            obstacle_filter: default_obstacle_filter(),
            ramp_filter: default_ramp_filter(),
            marker_classifier: MarkerClassifierParams::default(),
            shelf_corner: ShelfCornerParams::default(),
            wall: WallParams::default(),
            estimator: EstimatorParams::default(),
        }
    }
}

impl VisionParams {
    /// Blob filter for a colour-segmented category.
    pub fn filter_for(&self, category: Category) -> &BlobFilterParams {
        match category {
            Category::Item => &self.item_filter,
            Category::Shelf => &self.shelf_filter,
            Category::Marker => &self.marker_filter,
            Category::Obstacle => &self.obstacle_filter,
            Category::Ramp => &self.ramp_filter,
            // wall has its own grayscale path; reuse marker thresholds if
            // anything asks
            Category::Wall => &self.marker_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_from_empty_object() {
        let p: VisionParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p.morph_kernel, 5);
        assert_eq!(p.estimator.max_bearing_deg, 30.0);
        assert_eq!(p.marker_classifier.square_vertices, [4, 7]);
    }

    #[test]
    fn aspect_defaults_match_acceptance_band() {
        let f = BlobFilterParams::default();
        assert_eq!(f.aspect, [0.3, 3.0]);
        assert_eq!(f.min_solidity, 0.5);
        assert_eq!(f.min_fill_ratio, 0.1);
    }
}
