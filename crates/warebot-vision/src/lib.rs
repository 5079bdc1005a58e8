//! Colour segmentation, classification, metric estimation and the per-cycle
//! detection registry for the warebot pipeline.
//!
//! The flow is strictly one-directional each cycle:
//! frame -> prepared frame -> per-category masks -> classified objects with
//! metrics -> registry snapshot. No detection state survives between cycles.

mod detection;
mod estimate;
mod params;
mod pipeline;
mod preprocess;
mod registry;
mod segment;

pub use detection::{
    DetectedObject, MarkerIdentity, RangeBearing, Shape, ShelfCorner, ShelfSide,
};
pub use estimate::RangeBearingEstimator;
pub use params::{
    BlobFilterParams, EstimatorParams, MarkerClassifierParams, PreprocessParams, ShelfCornerParams,
    VisionParams, WallParams,
};
pub use pipeline::{FrameAnalysis, PerceptionPipeline};
pub use preprocess::{downscale, gaussian_blur, PreparedFrame, Preprocessor};
pub use registry::{
    DetectionRegistry, RegistryIoError, RegistryRecord, ITEM_SLOTS, ROW_MARKER_SLOTS, SHELF_SLOTS,
};
pub use segment::{
    category_mask, classify_shape, filter_contours, resolve_marker_identities, shelf_base_corners,
    wall_region_mask, CategoryDetector,
};
