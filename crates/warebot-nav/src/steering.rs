//! Reactive angular potential-field steering.
//!
//! One decision per cycle: build the attractive field toward the goal bearing,
//! subtract the repulsive field of nearby obstacles, pick the best residual
//! heading and turn it into a velocity pair.

use serde::{Deserialize, Serialize};

use warebot_vision::RangeBearing;

use crate::field::AngularField;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SteeringParams {
    /// Horizontal field of view in degrees; must be twice the estimator's
    /// `max_bearing_deg`.
    pub fov_deg: usize,
    /// Physical obstacle half-extent used for both the angular width and the
    /// repulsion strength.
    pub obstacle_width_m: f64,
    /// Obstacles at or beyond this range are ignored.
    pub obstacle_range_cutoff_m: f64,
    /// Proportional gain from heading error (radians) to rotational velocity.
    pub steering_gain: f64,
    /// Rotational velocity clamp, rad/s.
    pub max_rotation_rad_s: f64,
    /// Forward speed with no turning, m/s.
    pub max_linear_speed_m_s: f64,
    /// How strongly turning throttles forward speed, in [0, 1].
    pub rotation_bias: f64,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            fov_deg: 60,
            obstacle_width_m: 0.15,
            obstacle_range_cutoff_m: 0.8,
            steering_gain: 2.0,
            max_rotation_rad_s: 1.0,
            max_linear_speed_m_s: 0.25,
            rotation_bias: 1.0,
        }
    }
}

/// Velocity pair handed to the actuation interface. Positive rotation turns
/// toward positive bearings (rightward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub forward: f64,
    pub rotational: f64,
}

impl VelocityCommand {
    pub const STOP: VelocityCommand = VelocityCommand {
        forward: 0.0,
        rotational: 0.0,
    };

    pub fn rotate(rotational: f64) -> Self {
        Self {
            forward: 0.0,
            rotational,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SteeringController {
    params: SteeringParams,
}

impl SteeringController {
    pub fn new(params: SteeringParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SteeringParams {
        &self.params
    }

    /// Compute the velocity command for one goal and the current obstacle
    /// list.
    pub fn steer(&self, goal: RangeBearing, obstacles: &[RangeBearing]) -> VelocityCommand {
        let p = &self.params;
        let attractive = AngularField::attractive(p.fov_deg, goal.bearing_deg);
        let repulsive = AngularField::repulsive(
            p.fov_deg,
            obstacles,
            p.obstacle_width_m,
            p.obstacle_range_cutoff_m,
        );
        let residual = attractive.residual(&repulsive);

        let heading_deg = residual.argmax() as f64;
        let error_rad = (heading_deg - p.fov_deg as f64 / 2.0).to_radians();

        let rotational =
            (error_rad * p.steering_gain).clamp(-p.max_rotation_rad_s, p.max_rotation_rad_s);
        let forward = p.max_linear_speed_m_s
            * (1.0 - p.rotation_bias * rotational.abs() / p.max_rotation_rad_s);

        log::trace!(
            "steer: goal {:.1} deg -> heading {:.0} deg, v = ({:.3}, {:.3})",
            goal.bearing_deg,
            heading_deg,
            forward,
            rotational
        );
        VelocityCommand {
            forward,
            rotational,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clear_path_straight_ahead_goes_full_speed() {
        let ctl = SteeringController::new(SteeringParams::default());
        let v = ctl.steer(RangeBearing::new(1.0, 0.0), &[]);
        assert_relative_eq!(v.rotational, 0.0);
        assert_relative_eq!(v.forward, ctl.params().max_linear_speed_m_s);
    }

    #[test]
    fn goal_to_the_right_turns_right_and_slows() {
        let ctl = SteeringController::new(SteeringParams::default());
        let v = ctl.steer(RangeBearing::new(1.0, 20.0), &[]);
        assert!(v.rotational > 0.0);
        assert!(v.forward < ctl.params().max_linear_speed_m_s);
    }

    #[test]
    fn blocking_obstacle_forces_an_avoidance_turn() {
        let ctl = SteeringController::new(SteeringParams::default());
        // obstacle dead ahead at 0.3 m, goal also dead ahead
        let v = ctl.steer(
            RangeBearing::new(1.0, 0.0),
            &[RangeBearing::new(0.3, 0.0)],
        );
        assert!(v.rotational.abs() > 0.0, "expected an avoidance turn");
    }

    #[test]
    fn rotation_is_clamped() {
        let params = SteeringParams {
            steering_gain: 100.0,
            ..SteeringParams::default()
        };
        let ctl = SteeringController::new(params);
        let v = ctl.steer(RangeBearing::new(1.0, 28.0), &[]);
        assert_relative_eq!(v.rotational, ctl.params().max_rotation_rad_s);
        // full rotation bias throttles forward speed to zero
        assert_relative_eq!(v.forward, 0.0);
    }
}
