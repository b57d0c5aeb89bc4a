//! Bot actors
//!
//! A bot owns its resource pools, cooldown timestamps, ability state and
//! inline component set. All timers compare against simulation time in
//! milliseconds, never wall-clock time.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::catalog::{AbilityKind, BotClassDefinition, Catalog, UpgradeDefinition, WeaponKind};
use super::components::{ComponentDamageRouter, ComponentSet};
use super::stats::{StatModifier, StatResolver, StatSet, TemporaryEffect};
use crate::angle_of;
use crate::consts::*;
use crate::error::Result;

/// Stable handle of a bot within one arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// Owning player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Simulation time in milliseconds
pub type SimMillis = f64;

/// How damage was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Melee,
    Ranged,
    Beam,
}

/// Result of `Bot::take_damage`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Damage removed from shield and health (0 when absorbed or already dead)
    Applied(f32),
    /// This hit brought health to zero
    Killed(f32),
}

impl DamageOutcome {
    pub fn amount(&self) -> f32 {
        match *self {
            DamageOutcome::Applied(a) | DamageOutcome::Killed(a) => a,
        }
    }

    pub fn is_kill(&self) -> bool {
        matches!(self, DamageOutcome::Killed(_))
    }
}

/// Ability state machine: Idle -> Active -> Idle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AbilityState {
    Idle,
    Active { started_at: SimMillis },
}

/// Status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// All damage absorbed
    Invulnerable,
    /// Hidden from autopilot targeting
    Cloaked,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ActiveStatus {
    status: Status,
    /// `None` lasts until removed explicitly
    expires_at: Option<SimMillis>,
}

/// Per-bot totals over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub damage_dealt: f32,
    pub damage_taken: f32,
    pub kills: u32,
    pub deaths: u32,
}

/// A simulated combat bot
#[derive(Debug, Clone)]
pub struct Bot {
    pub id: ActorId,
    pub player: PlayerId,
    pub class_id: String,
    pub radius: f32,
    pub weapon: WeaponKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Heading in radians; components are laid out relative to it
    pub facing: f32,
    pub move_target: Option<Vec2>,

    base_stats: StatSet,
    ability_kind: AbilityKind,
    ability_duration_ms: f32,
    ability_cooldown_ms: f32,
    owned_upgrades: Vec<String>,
    upgrades: Vec<UpgradeDefinition>,
    effects: Vec<TemporaryEffect>,
    stats: StatSet,

    pub health: f32,
    pub max_health: f32,
    pub shield: f32,
    pub max_shield: f32,
    pub energy: f32,
    pub max_energy: f32,

    last_melee_at: Option<SimMillis>,
    last_ranged_at: Option<SimMillis>,
    last_ability_at: Option<SimMillis>,
    ability: AbilityState,
    statuses: Vec<ActiveStatus>,

    pub lifetime: LifetimeStats,
    /// Most recent bot to deal damage, credited with the kill
    pub last_attacker: Option<ActorId>,
    pub components: ComponentSet,
}

impl Bot {
    /// Create a bot from a class and already-resolved upgrades
    pub fn new(
        id: ActorId,
        player: PlayerId,
        class: &BotClassDefinition,
        upgrades: Vec<UpgradeDefinition>,
        pos: Vec2,
    ) -> Self {
        let owned_upgrades = upgrades.iter().map(|u| u.id.clone()).collect();
        let mut bot = Self {
            id,
            player,
            class_id: class.id.clone(),
            radius: class.radius,
            weapon: class.weapon,
            pos,
            vel: Vec2::ZERO,
            facing: 0.0,
            move_target: None,
            base_stats: class.base_stats,
            ability_kind: class.ability,
            ability_duration_ms: class.ability_duration_ms,
            ability_cooldown_ms: class.ability_cooldown_ms,
            owned_upgrades,
            upgrades,
            effects: Vec::new(),
            stats: class.base_stats,
            health: 0.0,
            max_health: 0.0,
            shield: 0.0,
            max_shield: 0.0,
            energy: 0.0,
            max_energy: 0.0,
            last_melee_at: None,
            last_ranged_at: None,
            last_ability_at: None,
            ability: AbilityState::Idle,
            statuses: Vec::new(),
            lifetime: LifetimeStats::default(),
            last_attacker: None,
            components: ComponentDamageRouter::initialize(id, class),
        };
        bot.recompute_stats();
        bot.health = bot.max_health;
        bot.shield = bot.max_shield;
        bot.energy = bot.max_energy;
        bot
    }

    /// Create a bot by class id, resolving persisted upgrade ids.
    ///
    /// Unknown class ids fail; unknown upgrade ids are skipped.
    pub fn from_catalog(
        id: ActorId,
        player: PlayerId,
        catalog: &Catalog,
        class_id: &str,
        owned_upgrades: &[String],
        pos: Vec2,
    ) -> Result<Self> {
        let class = catalog.class(class_id)?;
        let upgrades = catalog.resolve_owned(owned_upgrades);
        Ok(Self::new(id, player, class, upgrades, pos))
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Current effective stats
    pub fn stats(&self) -> &StatSet {
        &self.stats
    }

    pub fn base_stats(&self) -> &StatSet {
        &self.base_stats
    }

    pub fn owned_upgrades(&self) -> &[String] {
        &self.owned_upgrades
    }

    pub fn effects(&self) -> &[TemporaryEffect] {
        &self.effects
    }

    pub fn ability_kind(&self) -> AbilityKind {
        self.ability_kind
    }

    pub fn ability_state(&self) -> AbilityState {
        self.ability
    }

    pub fn is_ability_active(&self) -> bool {
        matches!(self.ability, AbilityState::Active { .. })
    }

    /// Mass used by collision separation
    pub fn mass(&self) -> f32 {
        (self.health / MASS_HEALTH_DIVISOR).max(MIN_MASS)
    }

    // === Stats ===

    fn ability_modifiers(&self) -> Vec<StatModifier> {
        match self.ability {
            AbilityState::Active { .. } => self.ability_kind.modifiers(),
            AbilityState::Idle => Vec::new(),
        }
    }

    /// Rebuild current stats from scratch and clamp pools to the new maxima
    pub fn recompute_stats(&mut self) {
        self.stats = StatResolver::resolve(
            &self.base_stats,
            &self.upgrades,
            &self.effects,
            &self.ability_modifiers(),
        );
        self.max_health = self.stats.health;
        self.max_shield = self.stats.shield;
        self.max_energy = self.stats.energy;
        self.health = self.health.min(self.max_health);
        self.shield = self.shield.min(self.max_shield);
        self.energy = self.energy.min(self.max_energy);
    }

    /// Add a temporary effect; an effect from the same source is refreshed
    pub fn apply_effect(&mut self, effect: TemporaryEffect) {
        match self.effects.iter_mut().find(|e| e.source == effect.source) {
            Some(existing) => *existing = effect,
            None => self.effects.push(effect),
        }
        self.recompute_stats();
    }

    /// Fold a destroyed component's permanent penalty into the stats
    pub fn apply_component_penalty(&mut self, penalty: TemporaryEffect) {
        self.apply_effect(penalty);
    }

    // === Status ===

    pub fn has_status(&self, status: Status) -> bool {
        self.statuses.iter().any(|s| s.status == status)
    }

    pub fn add_status(&mut self, status: Status, expires_at: Option<SimMillis>) {
        self.statuses.retain(|s| s.status != status);
        self.statuses.push(ActiveStatus { status, expires_at });
    }

    pub fn remove_status(&mut self, status: Status) {
        self.statuses.retain(|s| s.status != status);
    }

    // === Time ===

    /// Advance timers and regenerate pools.
    ///
    /// Returns the ability kind if the ability expired during this tick.
    pub fn tick(&mut self, dt_ms: f32, now: SimMillis) -> Option<AbilityKind> {
        if !self.is_alive() {
            return None;
        }

        self.energy = (self.energy + ENERGY_REGEN_PER_MS * dt_ms).min(self.max_energy);
        self.shield = (self.shield + SHIELD_REGEN_PER_MS * dt_ms).min(self.max_shield);
        if self.stats.regen > 0.0 {
            self.heal(self.stats.regen * dt_ms / 1000.0);
        }

        self.statuses
            .retain(|s| s.expires_at.is_none_or(|until| now < until));

        let mut expired_any = false;
        for effect in &mut self.effects {
            expired_any |= effect.advance(dt_ms);
        }
        if expired_any {
            self.effects.retain(|e| e.is_active());
        }

        let mut ended = None;
        if let AbilityState::Active { started_at } = self.ability {
            if now - started_at >= self.ability_duration_ms as f64 {
                self.end_ability();
                ended = Some(self.ability_kind);
                expired_any = true;
            }
        }

        if expired_any {
            self.recompute_stats();
        }
        ended
    }

    // === Movement ===

    /// Set where the bot should move; non-finite input is ignored
    pub fn set_move_target(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.move_target = Some(Vec2::new(x, y));
        }
    }

    /// Steer toward the move target and integrate position
    pub fn integrate_motion(&mut self, dt: f32) {
        if !self.is_alive() {
            return;
        }

        match self.move_target {
            Some(target) => {
                let to_target = target - self.pos;
                let distance = to_target.length();
                if distance < ARRIVAL_THRESHOLD {
                    // Settle instead of orbiting the target
                    self.vel *= ARRIVAL_DAMPING;
                } else {
                    let desired = to_target / distance * self.stats.speed;
                    self.vel = self.vel.lerp(desired, self.stats.acceleration);
                }
            }
            None => self.vel *= ARRIVAL_DAMPING,
        }

        self.pos += self.vel * dt;
        if self.vel.length_squared() > 1.0 {
            self.facing = angle_of(self.vel);
        }
    }

    // === Actions ===

    fn cooldown_ready(&self, last: Option<SimMillis>, cooldown_ms: f32, now: SimMillis) -> bool {
        match last {
            Some(at) => now - at >= (cooldown_ms * self.stats.cooldown_factor) as f64,
            None => true,
        }
    }

    pub fn melee_ready(&self, now: SimMillis) -> bool {
        self.cooldown_ready(self.last_melee_at, self.stats.melee_cooldown, now)
    }

    pub fn ranged_ready(&self, now: SimMillis) -> bool {
        self.cooldown_ready(self.last_ranged_at, self.stats.ranged_cooldown, now)
    }

    pub fn ability_ready(&self, now: SimMillis) -> bool {
        !self.is_ability_active()
            && self.cooldown_ready(self.last_ability_at, self.ability_cooldown_ms, now)
    }

    /// Start a melee swing if off cooldown
    pub fn try_melee(&mut self, now: SimMillis) -> bool {
        if !self.is_alive() || !self.melee_ready(now) {
            return false;
        }
        self.last_melee_at = Some(now);
        true
    }

    /// Fire the ranged weapon if off cooldown
    pub fn try_ranged(&mut self, now: SimMillis) -> bool {
        if !self.is_alive() || !self.ranged_ready(now) {
            return false;
        }
        self.last_ranged_at = Some(now);
        true
    }

    /// Activate the class ability (Idle -> Active)
    pub fn try_activate_ability(&mut self, now: SimMillis) -> bool {
        if !self.is_alive() || !self.ability_ready(now) {
            return false;
        }
        self.last_ability_at = Some(now);
        self.ability = AbilityState::Active { started_at: now };
        if self.ability_kind == AbilityKind::Cloak {
            self.add_status(Status::Cloaked, None);
        }
        self.recompute_stats();
        if self.ability_kind == AbilityKind::Barrier {
            self.shield = self.max_shield;
        }
        log::debug!("{:?} activated {:?}", self.id, self.ability_kind);
        true
    }

    fn end_ability(&mut self) {
        self.ability = AbilityState::Idle;
        if self.ability_kind == AbilityKind::Cloak {
            self.remove_status(Status::Cloaked);
        }
    }

    /// Force the ability back to Idle (death, external cancel).
    ///
    /// Returns false if the ability was not active.
    pub fn deactivate_ability(&mut self) -> bool {
        if !self.is_ability_active() {
            return false;
        }
        self.end_ability();
        self.recompute_stats();
        true
    }

    // === Damage ===

    /// Apply incoming damage through armor, shield, then health
    pub fn take_damage(&mut self, amount: f32, damage_type: DamageType) -> DamageOutcome {
        if !self.is_alive() || self.has_status(Status::Invulnerable) {
            return DamageOutcome::Applied(0.0);
        }

        let mitigated = (amount * (1.0 - self.stats.armor)).max(0.0);
        let absorbed = self.shield.min(mitigated);
        self.shield -= absorbed;

        let remainder = mitigated - absorbed;
        let to_health = remainder.min(self.health);
        self.health = (self.health - remainder).max(0.0);

        let applied = absorbed + to_health;
        self.lifetime.damage_taken += applied;

        if self.health <= 0.0 {
            self.lifetime.deaths += 1;
            log::debug!("{:?} destroyed by {:?} damage", self.id, damage_type);
            DamageOutcome::Killed(applied)
        } else {
            DamageOutcome::Applied(applied)
        }
    }

    /// Restore health up to max, returns the amount healed
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_alive() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }
}
