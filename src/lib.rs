//! Bot Arena - real-time arena combat simulation for autonomous bots
//!
//! Core modules:
//! - `sim`: Deterministic simulation (stats, bots, projectiles, collisions, components)
//! - `settings`: Simulation configuration
//! - `persistence`: Player profiles (owned upgrades, unlocked classes)
//! - `scoreboard`: End-of-match totals handed to persistence
//! - `autopilot`: Scripted intent source for headless matches

pub mod autopilot;
pub mod error;
pub mod persistence;
pub mod scoreboard;
pub mod settings;
pub mod sim;

pub use error::{ConfigurationError, Result};
pub use scoreboard::{MatchReport, PlayerTotals};
pub use settings::{BoundsPolicy, SimSettings};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Fixed simulation timestep in milliseconds
    pub const SIM_DT_MS: f32 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Arena dimensions (origin at top-left corner)
    pub const ARENA_WIDTH: f32 = 1600.0;
    pub const ARENA_HEIGHT: f32 = 1000.0;

    /// Resource regeneration, per millisecond of simulation time
    pub const ENERGY_REGEN_PER_MS: f32 = 0.01;
    pub const SHIELD_REGEN_PER_MS: f32 = 0.004;

    /// Movement
    pub const DEFAULT_ACCELERATION: f32 = 0.1;
    pub const ARRIVAL_THRESHOLD: f32 = 5.0;
    pub const ARRIVAL_DAMPING: f32 = 0.9;

    /// Collision
    pub const KNOCKBACK_COEFFICIENT: f32 = 0.5;
    /// Mass = health / MASS_HEALTH_DIVISOR
    pub const MASS_HEALTH_DIVISOR: f32 = 100.0;
    /// Lower bound so near-dead bots still take part in separation
    pub const MIN_MASS: f32 = 0.01;

    /// Melee reach beyond touching distance
    pub const MELEE_REACH: f32 = 18.0;
    /// Hitscan laser range
    pub const LASER_RANGE: f32 = 520.0;
    /// Maximum aim error (radians) at zero accuracy
    pub const MAX_AIM_JITTER: f32 = 0.35;

    /// Projectile defaults
    pub const PROJECTILE_LIFETIME_MS: f32 = 2000.0;
    pub const DEFAULT_PROJECTILE_SPEED: f32 = 420.0;

    /// Component damage escalation per destroyed component
    pub const DESTROYED_COMPONENT_ESCALATION: f32 = 0.1;
    /// Damage multiplier for hits on critical components
    pub const CRITICAL_MULTIPLIER: f32 = 1.5;

    /// Stat clamps
    pub const MAX_ARMOR: f32 = 0.9;
    pub const MIN_COOLDOWN_FACTOR: f32 = 0.1;
}

/// Unit vector pointing along `angle` (radians)
#[inline]
pub fn direction_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle (radians) of a vector, 0 for the zero vector
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    if v == Vec2::ZERO { 0.0 } else { v.y.atan2(v.x) }
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(5.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((normalize_angle(-5.0 * PI / 2.0) - (-PI / 2.0)).abs() < 1e-5);
        assert!((normalize_angle(-PI / 2.0) - (-PI / 2.0)).abs() < 1e-6);
        // Either side of the seam is the same heading
        assert!((normalize_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        for k in -8..8 {
            let angle = normalize_angle(k as f32 * 1.3);
            assert!((-PI..=PI).contains(&angle));
        }
    }

    #[test]
    fn test_direction_roundtrip() {
        let dir = direction_from_angle(PI / 4.0);
        assert!((angle_of(dir) - PI / 4.0).abs() < 1e-6);
        assert_eq!(angle_of(Vec2::ZERO), 0.0);
    }
}
