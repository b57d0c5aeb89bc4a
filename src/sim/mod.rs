//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod actor;
pub mod catalog;
pub mod collision;
pub mod components;
pub mod projectile;
pub mod rng;
pub mod state;
pub mod stats;
pub mod tick;

pub use actor::{
    AbilityState, ActorId, Bot, DamageOutcome, DamageType, LifetimeStats, PlayerId, SimMillis,
    Status,
};
pub use catalog::{AbilityKind, BotClassDefinition, Catalog, ChassisProfile, UpgradeDefinition, WeaponKind};
pub use collision::{
    Aabb, CollisionResult, circles_overlap, find_beam_target, find_projectile_hit,
    resolve_actor_overlaps, segment_circle_entry, segment_circle_intersection,
};
pub use components::{
    Component, ComponentDamageRouter, ComponentHitReport, ComponentSet, ComponentSlot,
    DestroyedComponent, Functionality,
};
pub use projectile::{HitRequest, LaunchSpec, Projectile, ProjectileId, ProjectileKind, ShotPattern};
pub use rng::{RandomSource, ScriptedRng, SimRng};
pub use state::{
    ActorSnapshot, ArenaSnapshot, ArenaState, MatchPhase, Pickup, PickupKind, ProjectileSnapshot,
    SimEvent,
};
pub use stats::{EffectSource, StatKind, StatModifier, StatResolver, StatSet, TemporaryEffect};
pub use tick::{BotIntent, Command, FixedStepper, TickInput, integrate_projectiles, tick};
