//! Flier kinematics
//!
//! Discrete per-tick integrator with asymmetric drag: a flap resets the
//! tick counter and applies an upward impulse, after which displacement
//! follows a quadratic in ticks-since-flap, capped downward at terminal
//! velocity and biased while rising.

use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;

/// Tilt floor while falling (degrees)
const TILT_FLOOR: f32 = -90.0;

/// Kinematic state of one flier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flier {
    /// Horizontal position, constant for the flier's lifetime
    pub x: f32,
    /// Vertical position (grows downward)
    pub y: f32,
    /// Vertical velocity set by the last flap (positive is downward)
    pub velocity: f32,
    /// Ticks elapsed since the last flap
    pub ticks_since_flap: u32,
    /// Visual tilt in degrees, clamped to [-90, max_tilt_up]
    pub tilt: f32,
    /// Cleared when the flier collides or leaves the play area
    pub alive: bool,
}

impl Flier {
    /// Create a flier at the configured spawn point
    pub fn spawn(physics: &PhysicsConfig) -> Self {
        Self {
            x: physics.spawn_x,
            y: physics.spawn_y,
            velocity: 0.0,
            ticks_since_flap: 0,
            tilt: 0.0,
            alive: true,
        }
    }

    /// Apply an upward impulse and restart the displacement curve
    pub fn flap(&mut self, physics: &PhysicsConfig) {
        self.velocity = -physics.flap_impulse;
        self.ticks_since_flap = 0;
    }

    /// Advance one tick and return the applied vertical displacement
    pub fn advance(&mut self, physics: &PhysicsConfig) -> f32 {
        self.ticks_since_flap += 1;
        let t = self.ticks_since_flap as f32;

        let mut d = self.velocity * t + 0.5 * physics.gravity * t * t;

        if d >= physics.terminal_velocity {
            d = physics.terminal_velocity;
        } else if d < 0.0 {
            d -= physics.upward_drag_bias;
        }

        self.y += d;

        if d < 0.0 {
            if self.tilt < physics.max_tilt_up {
                self.tilt = physics.max_tilt_up;
            }
        } else {
            self.tilt = (self.tilt - physics.tilt_decay).max(TILT_FLOOR);
        }

        d
    }
}
