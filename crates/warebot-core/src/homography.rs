use nalgebra::{Matrix3, Point2, Vector3};

/// Projective map from image pixels to metric ground-plane coordinates.
///
/// Only valid for pixels assumed to lie on the ground (z = 0): bounding-box
/// bottom centres and shelf base corners. The matrix comes from an offline
/// four-point calibration and is loaded once at startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHomography {
    pub h: Matrix3<f64>,
}

impl GroundHomography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Map a ground-plane pixel to metric (x, y) in the robot frame.
    ///
    /// Returns `None` when the pixel maps to the plane at infinity.
    pub fn project(&self, p: Point2<f32>) -> Option<Point2<f64>> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        if w.abs() < 1e-12 {
            return None;
        }
        Some(Point2::new(v[0] / w, v[1] / w))
    }

    /// Euclidean ground distance from the camera origin to the projected point.
    pub fn ground_distance(&self, p: Point2<f32>) -> Option<f64> {
        let g = self.project(p)?;
        Some((g.x * g.x + g.y * g.y).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn array_round_trip() {
        let rows = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_eq!(GroundHomography::from_array(rows).to_array(), rows);
    }

    #[test]
    fn identity_projects_pixels_unchanged() {
        let h = GroundHomography::new(Matrix3::identity());
        let g = h.project(Point2::new(3.5, -2.0)).unwrap();
        assert_relative_eq!(g.x, 3.5, epsilon = 1e-9);
        assert_relative_eq!(g.y, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn scaled_map_gives_metric_distance() {
        // 100 px per metre, origin at pixel (0, 0).
        let h = GroundHomography::new(Matrix3::new(
            0.01, 0.0, 0.0, //
            0.0, 0.01, 0.0, //
            0.0, 0.0, 1.0,
        ));
        let d = h.ground_distance(Point2::new(30.0, 40.0)).unwrap();
        assert_relative_eq!(d, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_scale_row_yields_none() {
        let h = GroundHomography::new(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0,
        ));
        assert!(h.project(Point2::new(1.0, 1.0)).is_none());
    }
}
