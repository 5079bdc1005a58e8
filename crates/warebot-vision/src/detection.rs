use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use warebot_core::{BoundingBox, Category, Contour};

/// Shape tag assigned by the marker classifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle,
    Square,
    Unclassified,
}

/// Metric polar measurement of a detection: range in metres, bearing in
/// degrees, positive to the right of the optical axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeBearing {
    pub range: f64,
    pub bearing_deg: f64,
}

impl RangeBearing {
    pub fn new(range: f64, bearing_deg: f64) -> Self {
        Self { range, bearing_deg }
    }

    #[inline]
    pub fn bearing_rad(&self) -> f64 {
        self.bearing_deg.to_radians()
    }

    #[inline]
    pub fn as_pair(&self) -> [f64; 2] {
        [self.range, self.bearing_deg]
    }
}

/// Which base corner of a shelf front a measurement belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShelfSide {
    Left,
    Right,
}

/// One measured shelf base corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShelfCorner {
    pub side: ShelfSide,
    pub measure: RangeBearing,
}

/// Identity resolved for a marker-category detection.
///
/// Row identity is the count of circle shapes seen in the whole frame, not a
/// per-blob property; it is fragile under occlusion or blob merging.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MarkerIdentity {
    /// 1-based row marker number.
    Row(u8),
    PackingStation,
    Unknown,
}

/// One classified, measured object. Recreated from scratch every cycle; no
/// identity survives across frames.
#[derive(Clone, Debug)]
pub struct DetectedObject {
    pub category: Category,
    pub shape: Shape,
    pub contour: Contour,
    pub bbox: BoundingBox,
    /// Metres; `None` when the ranging model could not run (for example a
    /// missing ground homography).
    pub distance: Option<f64>,
    pub bearing_deg: f64,
    /// Bottom-left / bottom-right base corners, shelves only.
    pub corners: Option<[Point2<f32>; 2]>,
    /// Resolved marker identity, markers only.
    pub marker: Option<MarkerIdentity>,
}

impl DetectedObject {
    pub fn measure(&self) -> Option<RangeBearing> {
        self.distance.map(|d| RangeBearing::new(d, self.bearing_deg))
    }
}
