//! Projectiles
//!
//! A projectile only knows its owner id and damage payload. Position
//! integration and arena bounds handling happen in the shared physics step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::actor::{ActorId, Bot, DamageType};
use super::catalog::WeaponKind;
use super::collision::{Aabb, segment_circle_intersection};
use crate::consts::*;
use crate::direction_from_angle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// Visual/size tag of a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    Standard,
    Heavy,
    Pellet,
    Sniper,
}

impl ProjectileKind {
    pub fn radius(&self) -> f32 {
        match self {
            ProjectileKind::Standard => 4.0,
            ProjectileKind::Heavy => 7.0,
            ProjectileKind::Pellet => 3.0,
            ProjectileKind::Sniper => 3.0,
        }
    }
}

/// A damage request produced by a hit, applied in the damage phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRequest {
    pub attacker: ActorId,
    pub target: ActorId,
    pub damage: f32,
    pub damage_type: DamageType,
    /// World-space impact point, used for component targeting
    pub position: Option<Vec2>,
}

/// A projectile in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ProjectileId,
    pub pos: Vec2,
    /// Position at the start of the current tick (for swept tests)
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub owner: ActorId,
    pub kind: ProjectileKind,
    pub radius: f32,
    pub piercing: bool,
    /// Targets already damaged (kept sorted)
    pub hit_targets: Vec<ActorId>,
    pub age_ms: f32,
    pub lifetime_ms: f32,
    pub active: bool,
}

/// Launch parameters
#[derive(Debug, Clone, Copy)]
pub struct LaunchSpec {
    pub origin: Vec2,
    pub angle: f32,
    pub speed: f32,
    pub damage: f32,
    pub owner: ActorId,
    pub piercing: bool,
    pub kind: ProjectileKind,
}

impl Projectile {
    /// Create a projectile moving along `angle` at `speed`
    pub fn launch(id: ProjectileId, spec: LaunchSpec) -> Self {
        Self {
            id,
            pos: spec.origin,
            prev_pos: spec.origin,
            vel: direction_from_angle(spec.angle) * spec.speed,
            damage: spec.damage,
            owner: spec.owner,
            kind: spec.kind,
            radius: spec.kind.radius(),
            piercing: spec.piercing,
            hit_targets: Vec::new(),
            age_ms: 0.0,
            lifetime_ms: PROJECTILE_LIFETIME_MS,
            active: true,
        }
    }

    /// Age the projectile; deactivates once its lifetime is spent
    pub fn tick(&mut self, dt_ms: f32) {
        if !self.active {
            return;
        }
        self.age_ms += dt_ms;
        if self.age_ms >= self.lifetime_ms {
            self.active = false;
        }
    }

    pub fn has_hit(&self, target: ActorId) -> bool {
        self.hit_targets.binary_search(&target).is_ok()
    }

    /// Whether this projectile can hit `target` right now
    pub fn check_hit(&self, target: &Bot) -> bool {
        if !self.active || !target.is_alive() || target.id == self.owner || self.has_hit(target.id)
        {
            return false;
        }
        let reach = self.radius + target.radius;
        self.pos.distance_squared(target.pos) <= reach * reach
            || segment_circle_intersection(self.prev_pos, self.pos, target.pos, reach)
    }

    /// Bounds of the path swept this tick
    pub fn swept_bounds(&self) -> Aabb {
        Aabb::new(
            self.prev_pos.min(self.pos) - Vec2::splat(self.radius),
            self.prev_pos.max(self.pos) + Vec2::splat(self.radius),
        )
    }

    /// Record a hit on `target`.
    ///
    /// Returns the damage request, or `None` if this target was already hit
    /// by this projectile. Non-piercing projectiles deactivate.
    pub fn apply_hit(&mut self, target: ActorId) -> Option<HitRequest> {
        if !self.active {
            return None;
        }
        let slot = match self.hit_targets.binary_search(&target) {
            Ok(_) => return None,
            Err(slot) => slot,
        };
        self.hit_targets.insert(slot, target);
        if !self.piercing {
            self.active = false;
        }
        Some(HitRequest {
            attacker: self.owner,
            target,
            damage: self.damage,
            damage_type: DamageType::Ranged,
            position: Some(self.pos),
        })
    }
}

/// One shot produced by a weapon firing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotPattern {
    Projectile {
        angle: f32,
        speed: f32,
        damage: f32,
        piercing: bool,
        kind: ProjectileKind,
    },
    /// Hitscan beam from the muzzle along `angle`
    Beam { angle: f32, range: f32, damage: f32 },
}

/// Expand a weapon into its shots.
///
/// Multi-shot fans pellets evenly across the spread; sniper rounds are
/// faster, hit harder and always pierce.
pub fn weapon_shots(weapon: WeaponKind, aim: f32, speed: f32, damage: f32) -> Vec<ShotPattern> {
    match weapon {
        WeaponKind::Standard => vec![ShotPattern::Projectile {
            angle: aim,
            speed,
            damage,
            piercing: false,
            kind: ProjectileKind::Standard,
        }],
        WeaponKind::Heavy => vec![ShotPattern::Projectile {
            angle: aim,
            speed: speed * 0.75,
            damage,
            piercing: false,
            kind: ProjectileKind::Heavy,
        }],
        WeaponKind::MultiShot { count, spread } => {
            let count = count.max(1);
            (0..count)
                .map(|i| {
                    let offset = if count == 1 {
                        0.0
                    } else {
                        -spread / 2.0 + spread * i as f32 / (count - 1) as f32
                    };
                    ShotPattern::Projectile {
                        angle: aim + offset,
                        speed,
                        damage: damage * 0.6,
                        piercing: false,
                        kind: ProjectileKind::Pellet,
                    }
                })
                .collect()
        }
        WeaponKind::Sniper => vec![ShotPattern::Projectile {
            angle: aim,
            speed: speed * 1.6,
            damage: damage * 2.0,
            piercing: true,
            kind: ProjectileKind::Sniper,
        }],
        WeaponKind::Laser => vec![ShotPattern::Beam {
            angle: aim,
            range: LASER_RANGE,
            damage,
        }],
    }
}
