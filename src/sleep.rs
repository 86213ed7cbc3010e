//! Sleep Policy
//!
//! A body whose linear and angular speeds stay below fixed thresholds and
//! that carries no external force accumulates a sleep timer; past the
//! configured duration it is put to sleep: velocities zeroed and excluded
//! from integration until woken by a force, a velocity write, or a
//! constraint shared with an awake partner.

use crate::body::RigidBody;
use crate::math::Vec2;

/// Thresholds and duration for the sleep policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SleepConfig {
    /// Squared linear speed below which a body counts as idle
    pub linear_threshold_sq: f32,
    /// Absolute angular speed below which a body counts as idle
    pub angular_threshold: f32,
    /// Idle seconds before falling asleep
    pub time_to_sleep: f32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            linear_threshold_sq: 0.2,
            angular_threshold: 0.2,
            time_to_sleep: 1.0,
        }
    }
}

impl SleepConfig {
    /// Advance one body's sleep timer by `dt` and transition it to the
    /// sleeping state when the timer expires.
    pub fn advance(&self, body: &mut RigidBody, dt: f32) {
        let idle = body.velocity.length_squared() < self.linear_threshold_sq
            && body.angular_velocity.abs() < self.angular_threshold
            && body.force == Vec2::ZERO
            && body.torque == 0.0;

        if idle {
            body.sleep_time += dt;
        } else {
            body.sleep_time = 0.0;
            body.awake = true;
        }

        if body.sleep_time > self.time_to_sleep {
            body.awake = false;
            body.velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyDef;

    fn idle_body() -> RigidBody {
        RigidBody::from_def(0, &BodyDef::dynamic_circle(Vec2::ZERO, 1.0))
    }

    #[test]
    fn test_idle_body_falls_asleep() {
        let cfg = SleepConfig::default();
        let mut body = idle_body();

        // 61 frames at 60 Hz pushes the timer past one second
        for _ in 0..61 {
            cfg.advance(&mut body, 1.0 / 60.0);
        }

        assert!(!body.awake);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_moving_body_stays_awake() {
        let cfg = SleepConfig::default();
        let mut body = idle_body();
        body.velocity = Vec2::new(10.0, 0.0);

        for _ in 0..120 {
            cfg.advance(&mut body, 1.0 / 60.0);
        }

        assert!(body.awake);
        assert_eq!(body.sleep_time, 0.0);
    }

    #[test]
    fn test_pending_force_resets_timer() {
        let cfg = SleepConfig::default();
        let mut body = idle_body();
        body.sleep_time = 0.9;
        body.apply_force(Vec2::new(1.0, 0.0));

        cfg.advance(&mut body, 1.0 / 60.0);
        assert_eq!(body.sleep_time, 0.0, "Force keeps the body awake");
        assert!(body.awake);
    }

    #[test]
    fn test_spin_counts_as_motion() {
        let cfg = SleepConfig::default();
        let mut body = idle_body();
        body.angular_velocity = 5.0;

        for _ in 0..120 {
            cfg.advance(&mut body, 1.0 / 60.0);
        }
        assert!(body.awake);
    }
}
