//! Simulation settings
//!
//! Loaded once per match from JSON (every field optional) and owned by the
//! arena. Nothing in the simulation reads global configuration.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigurationError, Result};
use crate::sim::collision::Aabb;

/// What happens to a projectile that leaves the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Pin to the wall and keep flying along it
    Clamp,
    /// Reflect off the wall
    Bounce,
    /// Remove on contact with the wall
    #[default]
    Deactivate,
}

impl BoundsPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundsPolicy::Clamp => "clamp",
            BoundsPolicy::Bounce => "bounce",
            BoundsPolicy::Deactivate => "deactivate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clamp" => Some(BoundsPolicy::Clamp),
            "bounce" | "reflect" => Some(BoundsPolicy::Bounce),
            "deactivate" | "despawn" => Some(BoundsPolicy::Deactivate),
            _ => None,
        }
    }
}

/// Per-match simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Fixed timestep in milliseconds
    pub dt_ms: f32,
    pub bounds_policy: BoundsPolicy,

    // === Combat ===
    /// Invulnerability granted on spawn (0 disables)
    pub spawn_invulnerability_ms: f32,
    /// Allow melee, beams and projectiles to hit bots of the same player
    pub friendly_fire: bool,

    // === Pickups ===
    pub pickups_enabled: bool,
    /// Ticks between pickup spawns
    pub pickup_interval_ticks: u32,
    /// Ticks before an uncollected pickup disappears
    pub pickup_lifetime_ticks: u32,
    pub max_pickups: usize,
    pub pickup_radius: f32,

    // === Match ===
    /// Match ends when this much simulation time has passed
    pub time_limit_ms: Option<f64>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            dt_ms: SIM_DT_MS,
            bounds_policy: BoundsPolicy::Deactivate,

            spawn_invulnerability_ms: 1500.0,
            friendly_fire: false,

            pickups_enabled: true,
            pickup_interval_ticks: 600,
            pickup_lifetime_ticks: 900,
            max_pickups: 3,
            pickup_radius: 14.0,

            time_limit_ms: Some(180_000.0),
        }
    }
}

impl SimSettings {
    /// Parse settings from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).map_err(|source| ConfigurationError::Parse {
            what: "settings",
            source,
        })?;
        settings.validate()?;
        log::info!(
            "Loaded settings: {}x{} arena, {:.2} ms step, {} bounds",
            settings.arena_width,
            settings.arena_height,
            settings.dt_ms,
            settings.bounds_policy.as_str()
        );
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| ConfigurationError::Serialize {
            what: "settings",
            source,
        })
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        fn positive(field: &'static str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigurationError::InvalidSetting {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                })
            }
        }

        positive("arena_width", self.arena_width)?;
        positive("arena_height", self.arena_height)?;
        positive("dt_ms", self.dt_ms)?;
        positive("pickup_radius", self.pickup_radius)?;

        if !(self.spawn_invulnerability_ms.is_finite() && self.spawn_invulnerability_ms >= 0.0) {
            return Err(ConfigurationError::InvalidSetting {
                field: "spawn_invulnerability_ms",
                reason: "must be zero or positive".into(),
            });
        }
        if self.pickups_enabled && self.pickup_interval_ticks == 0 {
            return Err(ConfigurationError::InvalidSetting {
                field: "pickup_interval_ticks",
                reason: "must be at least 1 when pickups are enabled".into(),
            });
        }
        if let Some(limit) = self.time_limit_ms {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ConfigurationError::InvalidSetting {
                    field: "time_limit_ms",
                    reason: format!("must be positive, got {limit}"),
                });
            }
        }
        Ok(())
    }

    /// Timestep in seconds
    pub fn dt_secs(&self) -> f32 {
        self.dt_ms / 1000.0
    }

    /// Arena rectangle, origin at the top-left corner
    pub fn arena_bounds(&self) -> Aabb {
        Aabb::new(Vec2::ZERO, Vec2::new(self.arena_width, self.arena_height))
    }

    pub fn arena_center(&self) -> Vec2 {
        Vec2::new(self.arena_width / 2.0, self.arena_height / 2.0)
    }
}
