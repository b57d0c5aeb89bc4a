//! Stat resolution pipeline
//!
//! Effective stats are never patched in place. They are always rebuilt from
//! base stats, owned upgrades, temporary effects and ability modifiers, in
//! that order, so the same inputs always produce the same numbers.

use serde::{Deserialize, Serialize};

use super::catalog::UpgradeDefinition;
use super::components::ComponentSlot;
use super::state::PickupKind;
use crate::consts::*;

/// Every stat an actor carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Health,
    Shield,
    Speed,
    Acceleration,
    MeleeDamage,
    RangedDamage,
    ProjectileSpeed,
    Armor,
    Energy,
    RangedCooldown,
    MeleeCooldown,
    CooldownFactor,
    Regen,
    Accuracy,
}

impl StatKind {
    pub const ALL: [StatKind; 14] = [
        StatKind::Health,
        StatKind::Shield,
        StatKind::Speed,
        StatKind::Acceleration,
        StatKind::MeleeDamage,
        StatKind::RangedDamage,
        StatKind::ProjectileSpeed,
        StatKind::Armor,
        StatKind::Energy,
        StatKind::RangedCooldown,
        StatKind::MeleeCooldown,
        StatKind::CooldownFactor,
        StatKind::Regen,
        StatKind::Accuracy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Health => "health",
            StatKind::Shield => "shield",
            StatKind::Speed => "speed",
            StatKind::Acceleration => "acceleration",
            StatKind::MeleeDamage => "melee_damage",
            StatKind::RangedDamage => "ranged_damage",
            StatKind::ProjectileSpeed => "projectile_speed",
            StatKind::Armor => "armor",
            StatKind::Energy => "energy",
            StatKind::RangedCooldown => "ranged_cooldown",
            StatKind::MeleeCooldown => "melee_cooldown",
            StatKind::CooldownFactor => "cooldown_factor",
            StatKind::Regen => "regen",
            StatKind::Accuracy => "accuracy",
        }
    }

    /// Damage and speed stats scale; everything else accumulates
    pub fn is_multiplicative(&self) -> bool {
        let name = self.as_str();
        name.contains("damage") || name.contains("speed")
    }
}

/// A single stat change: a factor for multiplicative stats, a delta otherwise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatKind,
    pub value: f32,
}

impl StatModifier {
    pub const fn new(stat: StatKind, value: f32) -> Self {
        Self { stat, value }
    }
}

/// A full set of stat values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatSet {
    pub health: f32,
    pub shield: f32,
    pub speed: f32,
    pub acceleration: f32,
    pub melee_damage: f32,
    pub ranged_damage: f32,
    pub projectile_speed: f32,
    /// Fraction of incoming damage removed (0..1)
    pub armor: f32,
    pub energy: f32,
    /// Milliseconds between ranged attacks
    pub ranged_cooldown: f32,
    /// Milliseconds between melee attacks
    pub melee_cooldown: f32,
    pub cooldown_factor: f32,
    /// Health per second
    pub regen: f32,
    pub accuracy: f32,
}

impl Default for StatSet {
    fn default() -> Self {
        Self {
            health: 0.0,
            shield: 0.0,
            speed: 0.0,
            acceleration: DEFAULT_ACCELERATION,
            melee_damage: 0.0,
            ranged_damage: 0.0,
            projectile_speed: DEFAULT_PROJECTILE_SPEED,
            armor: 0.0,
            energy: 0.0,
            ranged_cooldown: 0.0,
            melee_cooldown: 0.0,
            cooldown_factor: 1.0,
            regen: 0.0,
            accuracy: 1.0,
        }
    }
}

impl StatSet {
    pub fn get(&self, stat: StatKind) -> f32 {
        match stat {
            StatKind::Health => self.health,
            StatKind::Shield => self.shield,
            StatKind::Speed => self.speed,
            StatKind::Acceleration => self.acceleration,
            StatKind::MeleeDamage => self.melee_damage,
            StatKind::RangedDamage => self.ranged_damage,
            StatKind::ProjectileSpeed => self.projectile_speed,
            StatKind::Armor => self.armor,
            StatKind::Energy => self.energy,
            StatKind::RangedCooldown => self.ranged_cooldown,
            StatKind::MeleeCooldown => self.melee_cooldown,
            StatKind::CooldownFactor => self.cooldown_factor,
            StatKind::Regen => self.regen,
            StatKind::Accuracy => self.accuracy,
        }
    }

    pub fn get_mut(&mut self, stat: StatKind) -> &mut f32 {
        match stat {
            StatKind::Health => &mut self.health,
            StatKind::Shield => &mut self.shield,
            StatKind::Speed => &mut self.speed,
            StatKind::Acceleration => &mut self.acceleration,
            StatKind::MeleeDamage => &mut self.melee_damage,
            StatKind::RangedDamage => &mut self.ranged_damage,
            StatKind::ProjectileSpeed => &mut self.projectile_speed,
            StatKind::Armor => &mut self.armor,
            StatKind::Energy => &mut self.energy,
            StatKind::RangedCooldown => &mut self.ranged_cooldown,
            StatKind::MeleeCooldown => &mut self.melee_cooldown,
            StatKind::CooldownFactor => &mut self.cooldown_factor,
            StatKind::Regen => &mut self.regen,
            StatKind::Accuracy => &mut self.accuracy,
        }
    }

    /// Apply one modifier using the multiply/add rule for its stat
    pub fn apply(&mut self, modifier: &StatModifier) {
        let slot = self.get_mut(modifier.stat);
        if modifier.stat.is_multiplicative() {
            *slot *= modifier.value;
        } else {
            *slot += modifier.value;
        }
    }

    fn clamp_ranges(&mut self) {
        self.armor = self.armor.clamp(0.0, MAX_ARMOR);
        self.accuracy = self.accuracy.clamp(0.0, 1.0);
        self.cooldown_factor = self.cooldown_factor.max(MIN_COOLDOWN_FACTOR);
        self.health = self.health.max(1.0);
        self.shield = self.shield.max(0.0);
        self.energy = self.energy.max(0.0);
        self.speed = self.speed.max(0.0);
        self.acceleration = self.acceleration.clamp(0.0, 1.0);
        self.regen = self.regen.max(0.0);
        self.melee_damage = self.melee_damage.max(0.0);
        self.ranged_damage = self.ranged_damage.max(0.0);
        self.melee_cooldown = self.melee_cooldown.max(0.0);
        self.ranged_cooldown = self.ranged_cooldown.max(0.0);
    }
}

/// Where a temporary effect came from (refreshing uses this as the key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectSource {
    Pickup(PickupKind),
    ComponentLoss(ComponentSlot),
    Scripted(String),
}

/// A timed stat modifier bundle owned by one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryEffect {
    pub source: EffectSource,
    pub modifiers: Vec<StatModifier>,
    /// Milliseconds left; infinite for permanent effects
    pub remaining_ms: f32,
}

impl TemporaryEffect {
    pub fn new(source: EffectSource, modifiers: Vec<StatModifier>, duration_ms: f32) -> Self {
        Self {
            source,
            modifiers,
            remaining_ms: duration_ms,
        }
    }

    /// An effect that never expires (component losses)
    pub fn permanent(source: EffectSource, modifiers: Vec<StatModifier>) -> Self {
        Self::new(source, modifiers, f32::INFINITY)
    }

    pub fn is_active(&self) -> bool {
        self.remaining_ms > 0.0
    }

    /// Advance the timer, returns true once expired
    pub fn advance(&mut self, dt_ms: f32) -> bool {
        if self.remaining_ms.is_finite() {
            self.remaining_ms -= dt_ms;
        }
        !self.is_active()
    }
}

/// Combines base stats, upgrades, effects and ability modifiers
pub struct StatResolver;

impl StatResolver {
    /// Resolve effective stats.
    ///
    /// Upgrades are applied in catalog order regardless of the order they
    /// are passed in. Inactive effects are skipped. Ability modifiers apply
    /// last.
    pub fn resolve(
        base: &StatSet,
        upgrades: &[UpgradeDefinition],
        effects: &[TemporaryEffect],
        ability: &[StatModifier],
    ) -> StatSet {
        let mut stats = *base;

        let mut ordered: Vec<&UpgradeDefinition> = upgrades.iter().collect();
        ordered.sort_by_key(|u| u.order);
        for upgrade in ordered {
            for modifier in &upgrade.modifiers {
                stats.apply(modifier);
            }
        }

        for effect in effects.iter().filter(|e| e.is_active()) {
            for modifier in &effect.modifiers {
                stats.apply(modifier);
            }
        }

        for modifier in ability {
            stats.apply(modifier);
        }

        stats.clamp_ranges();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> StatSet {
        StatSet {
            health: 100.0,
            speed: 200.0,
            melee_damage: 10.0,
            ranged_damage: 8.0,
            armor: 0.1,
            energy: 100.0,
            ranged_cooldown: 500.0,
            melee_cooldown: 800.0,
            ..Default::default()
        }
    }

    fn upgrade(id: &str, order: usize, modifiers: Vec<StatModifier>) -> UpgradeDefinition {
        UpgradeDefinition {
            id: id.to_string(),
            category: "test".to_string(),
            tier: 1,
            modifiers,
            cost: 0,
            prerequisite: None,
            order,
        }
    }

    #[test]
    fn test_multiplicative_classification() {
        assert!(StatKind::MeleeDamage.is_multiplicative());
        assert!(StatKind::RangedDamage.is_multiplicative());
        assert!(StatKind::Speed.is_multiplicative());
        assert!(StatKind::ProjectileSpeed.is_multiplicative());
        assert!(!StatKind::Armor.is_multiplicative());
        assert!(!StatKind::Health.is_multiplicative());
        assert!(!StatKind::RangedCooldown.is_multiplicative());
    }

    #[test]
    fn test_upgrades_multiply_and_add() {
        let upgrades = vec![
            upgrade("hull", 0, vec![StatModifier::new(StatKind::Health, 25.0)]),
            upgrade("blades", 1, vec![StatModifier::new(StatKind::MeleeDamage, 1.5)]),
        ];
        let stats = StatResolver::resolve(&base(), &upgrades, &[], &[]);
        assert_eq!(stats.health, 125.0);
        assert_eq!(stats.melee_damage, 15.0);
        assert_eq!(stats.speed, 200.0);
    }

    #[test]
    fn test_upgrade_order_is_catalog_order() {
        // f32 addition doesn't associate at 2^24: 1 + 2^24 rounds back to 2^24,
        // so applying a before b gives 1 while b before a gives 2
        let start = StatSet {
            regen: 1.0,
            ..base()
        };
        let a = upgrade("a", 0, vec![StatModifier::new(StatKind::Regen, 16_777_216.0)]);
        let b = upgrade("b", 1, vec![StatModifier::new(StatKind::Regen, -16_777_215.0)]);

        let forward = StatResolver::resolve(&start, &[a.clone(), b.clone()], &[], &[]);
        let reverse = StatResolver::resolve(&start, &[b.clone(), a.clone()], &[], &[]);
        assert_eq!(forward.regen, 1.0);
        assert_eq!(reverse, forward);

        // Swapping catalog positions flips the result
        let a_late = upgrade("a", 2, a.modifiers.clone());
        let swapped = StatResolver::resolve(&start, &[a_late, b], &[], &[]);
        assert_eq!(swapped.regen, 2.0);
    }

    #[test]
    fn test_effects_then_ability() {
        let effect = TemporaryEffect::new(
            EffectSource::Scripted("haste".into()),
            vec![StatModifier::new(StatKind::Speed, 1.5)],
            1000.0,
        );
        let ability = [StatModifier::new(StatKind::Armor, 0.3)];
        let stats = StatResolver::resolve(&base(), &[], &[effect], &ability);
        assert_eq!(stats.speed, 300.0);
        assert!((stats.armor - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_expired_effect_ignored() {
        let mut effect = TemporaryEffect::new(
            EffectSource::Scripted("haste".into()),
            vec![StatModifier::new(StatKind::Speed, 2.0)],
            10.0,
        );
        assert!(effect.advance(16.0));
        let stats = StatResolver::resolve(&base(), &[], &[effect], &[]);
        assert_eq!(stats.speed, 200.0);
    }

    #[test]
    fn test_permanent_effect_never_expires() {
        let mut effect = TemporaryEffect::permanent(
            EffectSource::ComponentLoss(ComponentSlot::LeftTread),
            vec![StatModifier::new(StatKind::Speed, 0.75)],
        );
        for _ in 0..1000 {
            assert!(!effect.advance(1000.0));
        }
    }

    #[test]
    fn test_armor_clamped() {
        let ability = [StatModifier::new(StatKind::Armor, 5.0)];
        let stats = StatResolver::resolve(&base(), &[], &[], &ability);
        assert_eq!(stats.armor, MAX_ARMOR);

        let penalty = [StatModifier::new(StatKind::Armor, -1.0)];
        let stats = StatResolver::resolve(&base(), &[], &[], &penalty);
        assert_eq!(stats.armor, 0.0);
    }

    #[test]
    fn test_stat_set_deserializes_with_defaults() {
        let stats: StatSet = serde_json::from_str(r#"{"health": 90, "melee_damage": 12}"#).unwrap();
        assert_eq!(stats.health, 90.0);
        assert_eq!(stats.acceleration, DEFAULT_ACCELERATION);
        assert_eq!(stats.cooldown_factor, 1.0);
        assert_eq!(stats.accuracy, 1.0);
    }

    proptest! {
        #[test]
        fn prop_resolve_is_idempotent(
            health_delta in -50.0f32..200.0,
            damage_factor in 0.5f32..2.0,
            armor_delta in -0.5f32..0.5,
        ) {
            let upgrades = vec![upgrade("u", 0, vec![
                StatModifier::new(StatKind::Health, health_delta),
                StatModifier::new(StatKind::MeleeDamage, damage_factor),
            ])];
            let ability = [StatModifier::new(StatKind::Armor, armor_delta)];
            let first = StatResolver::resolve(&base(), &upgrades, &[], &ability);
            let second = StatResolver::resolve(&base(), &upgrades, &[], &ability);
            prop_assert_eq!(first, second);
        }
    }
}
