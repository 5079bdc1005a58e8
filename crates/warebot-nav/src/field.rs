//! Angular potential fields over the camera's horizontal field of view.
//!
//! A field holds one value per integer degree across `[0, fov]`, where degree
//! `fov / 2` is straight ahead. Fields live only inside one steering decision
//! and are never persisted.

use warebot_vision::RangeBearing;

/// Attractive slope: the goal value 1.0 decays by 1/30 per degree of angular
/// distance, reaching zero 30 degrees out.
const ATTRACTIVE_SLOPE: f64 = 1.0 / 30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AngularField {
    fov_deg: usize,
    values: Vec<f64>,
}

impl AngularField {
    pub fn zeros(fov_deg: usize) -> Self {
        Self {
            fov_deg,
            values: vec![0.0; fov_deg + 1],
        }
    }

    #[inline]
    pub fn fov_deg(&self) -> usize {
        self.fov_deg
    }

    #[inline]
    pub fn value(&self, degree: usize) -> f64 {
        self.values[degree]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Convert a signed bearing (0 = straight ahead) into a clamped field
    /// degree index.
    pub fn degree_of_bearing(fov_deg: usize, bearing_deg: f64) -> usize {
        let centered = bearing_deg + fov_deg as f64 / 2.0;
        centered.round().clamp(0.0, fov_deg as f64) as usize
    }

    /// Attractive field: 1.0 at the goal degree, linear falloff, floor 0.
    pub fn attractive(fov_deg: usize, goal_bearing_deg: f64) -> Self {
        let goal = Self::degree_of_bearing(fov_deg, goal_bearing_deg);
        let mut field = Self::zeros(fov_deg);
        for (d, v) in field.values.iter_mut().enumerate() {
            let dist = (d as f64 - goal as f64).abs();
            *v = (1.0 - dist * ATTRACTIVE_SLOPE).max(0.0);
        }
        field
    }

    /// Repulsive field. Each obstacle closer than `range_cutoff_m` writes a
    /// peak at its bearing and a linear skirt out to its angular half-width;
    /// overlapping contributions combine by maximum, never by sum.
    pub fn repulsive(
        fov_deg: usize,
        obstacles: &[RangeBearing],
        obstacle_width_m: f64,
        range_cutoff_m: f64,
    ) -> Self {
        let mut field = Self::zeros(fov_deg);
        for obstacle in obstacles {
            if obstacle.range >= range_cutoff_m || obstacle.range <= 0.0 {
                continue;
            }
            let center = Self::degree_of_bearing(fov_deg, obstacle.bearing_deg);
            let half_width_deg = (obstacle_width_m / obstacle.range).atan().to_degrees();
            let effect = (1.0 - (obstacle.range - 2.0 * obstacle_width_m)).clamp(0.0, 1.0);

            field.values[center] = field.values[center].max(effect);
            let mut offset = 1usize;
            while (offset as f64) <= half_width_deg {
                let skirt = effect * (1.0 - offset as f64 / half_width_deg);
                if center >= offset {
                    let d = center - offset;
                    field.values[d] = field.values[d].max(skirt);
                }
                if center + offset <= fov_deg {
                    let d = center + offset;
                    field.values[d] = field.values[d].max(skirt);
                }
                offset += 1;
            }
        }
        field
    }

    /// Elementwise `max(self - other, 0)`; the residual is never negative.
    pub fn residual(&self, other: &Self) -> Self {
        debug_assert_eq!(self.fov_deg, other.fov_deg);
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, r)| (a - r).max(0.0))
            .collect();
        Self {
            fov_deg: self.fov_deg,
            values,
        }
    }

    /// Index of the maximum value; ties break to the lowest degree.
    pub fn argmax(&self) -> usize {
        let mut best = 0usize;
        for (d, v) in self.values.iter().enumerate() {
            if *v > self.values[best] {
                best = d;
            }
        }
        best
    }
}
