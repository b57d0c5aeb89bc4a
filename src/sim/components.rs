//! Destructible per-bot components and damage routing
//!
//! Every bot carries the same closed set of seven parts stored inline. Damage
//! picks a part (by hit position, or at random), may be redirected to a live
//! protector, is reduced by the part's armor, and escalates with every part
//! already lost. Destroyed parts hand back a permanent stat penalty that the
//! bot folds into its next stat recompute.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::actor::{ActorId, DamageType};
use super::catalog::BotClassDefinition;
use super::rng::RandomSource;
use super::stats::{EffectSource, StatKind, StatModifier, TemporaryEffect};
use crate::consts::*;

/// Named component slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentSlot {
    Core,
    LeftWeapon,
    RightWeapon,
    LeftTread,
    RightTread,
    FrontArmor,
    Sensor,
}

pub const COMPONENT_COUNT: usize = 7;

impl ComponentSlot {
    pub const ALL: [ComponentSlot; COMPONENT_COUNT] = [
        ComponentSlot::Core,
        ComponentSlot::LeftWeapon,
        ComponentSlot::RightWeapon,
        ComponentSlot::LeftTread,
        ComponentSlot::RightTread,
        ComponentSlot::FrontArmor,
        ComponentSlot::Sensor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentSlot::Core => "core",
            ComponentSlot::LeftWeapon => "left_weapon",
            ComponentSlot::RightWeapon => "right_weapon",
            ComponentSlot::LeftTread => "left_tread",
            ComponentSlot::RightTread => "right_tread",
            ComponentSlot::FrontArmor => "front_armor",
            ComponentSlot::Sensor => "sensor",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// What a bot loses when a component is destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Functionality {
    Movement,
    Melee,
    Ranged,
    Targeting,
    Defense,
    None,
}

impl Functionality {
    /// Stat modifiers applied permanently once the component is gone
    pub fn loss_modifiers(&self) -> Vec<StatModifier> {
        match self {
            Functionality::Movement => vec![StatModifier::new(StatKind::Speed, 0.75)],
            Functionality::Melee => vec![StatModifier::new(StatKind::MeleeDamage, 0.7)],
            Functionality::Ranged => vec![StatModifier::new(StatKind::RangedDamage, 0.7)],
            Functionality::Targeting => vec![StatModifier::new(StatKind::Accuracy, -0.25)],
            Functionality::Defense => vec![StatModifier::new(StatKind::Armor, -0.1)],
            Functionality::None => Vec::new(),
        }
    }
}

/// Static layout of one slot, positions and sizes in body radii
struct SlotTemplate {
    offset: (f32, f32),
    size: f32,
    max_health: f32,
    armor: f32,
    critical: bool,
    functionality: Functionality,
    protects: &'static [ComponentSlot],
    damage_effects: &'static [&'static str],
    destroy_effects: &'static [&'static str],
}

fn template(slot: ComponentSlot) -> SlotTemplate {
    match slot {
        ComponentSlot::Core => SlotTemplate {
            offset: (0.0, 0.0),
            size: 0.45,
            max_health: 100.0,
            armor: 0.1,
            critical: true,
            functionality: Functionality::None,
            protects: &[],
            damage_effects: &["sparks"],
            destroy_effects: &["core_breach", "smoke_heavy"],
        },
        ComponentSlot::LeftWeapon => SlotTemplate {
            offset: (0.2, -0.7),
            size: 0.3,
            max_health: 50.0,
            armor: 0.05,
            critical: false,
            functionality: Functionality::Ranged,
            protects: &[],
            damage_effects: &["sparks"],
            destroy_effects: &["weapon_detach", "explosion_small"],
        },
        ComponentSlot::RightWeapon => SlotTemplate {
            offset: (0.2, 0.7),
            size: 0.3,
            max_health: 50.0,
            armor: 0.05,
            critical: false,
            functionality: Functionality::Melee,
            protects: &[],
            damage_effects: &["sparks"],
            destroy_effects: &["weapon_detach", "explosion_small"],
        },
        ComponentSlot::LeftTread => SlotTemplate {
            offset: (-0.5, -0.8),
            size: 0.3,
            max_health: 60.0,
            armor: 0.15,
            critical: false,
            functionality: Functionality::Movement,
            protects: &[],
            damage_effects: &["dust"],
            destroy_effects: &["tread_snap", "debris"],
        },
        ComponentSlot::RightTread => SlotTemplate {
            offset: (-0.5, 0.8),
            size: 0.3,
            max_health: 60.0,
            armor: 0.15,
            critical: false,
            functionality: Functionality::Movement,
            protects: &[],
            damage_effects: &["dust"],
            destroy_effects: &["tread_snap", "debris"],
        },
        ComponentSlot::FrontArmor => SlotTemplate {
            offset: (0.85, 0.0),
            size: 0.35,
            max_health: 80.0,
            armor: 0.4,
            critical: false,
            functionality: Functionality::Defense,
            protects: &[ComponentSlot::Core, ComponentSlot::Sensor],
            damage_effects: &["ricochet"],
            destroy_effects: &["armor_shatter", "debris"],
        },
        ComponentSlot::Sensor => SlotTemplate {
            offset: (0.45, 0.0),
            size: 0.2,
            max_health: 30.0,
            armor: 0.0,
            critical: false,
            functionality: Functionality::Targeting,
            protects: &[],
            damage_effects: &["glitch"],
            destroy_effects: &["sensor_blackout"],
        },
    }
}

/// One destructible part of a bot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Component {
    pub slot: ComponentSlot,
    pub health: f32,
    pub max_health: f32,
    pub critical: bool,
    /// Offset from the bot center in the bot's local frame (x = forward)
    pub relative_position: Vec2,
    /// Hit radius
    pub size: f32,
    pub armor: f32,
    pub functionality: Functionality,
    pub protects: &'static [ComponentSlot],
    pub damage_effects: &'static [&'static str],
    pub destroy_effects: &'static [&'static str],
}

impl Component {
    pub fn is_functional(&self) -> bool {
        self.health > 0.0
    }

    pub fn name(&self) -> &'static str {
        self.slot.as_str()
    }
}

/// The inline component array of one bot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSet {
    pub actor: ActorId,
    parts: [Component; COMPONENT_COUNT],
}

impl ComponentSet {
    pub fn get(&self, slot: ComponentSlot) -> &Component {
        &self.parts[slot.index()]
    }

    pub fn get_mut(&mut self, slot: ComponentSlot) -> &mut Component {
        &mut self.parts[slot.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.parts.iter()
    }

    pub fn functional_count(&self) -> usize {
        self.parts.iter().filter(|c| c.is_functional()).count()
    }

    pub fn destroyed_count(&self) -> usize {
        COMPONENT_COUNT - self.functional_count()
    }

    /// Damage multiplier from parts already lost
    pub fn escalation(&self) -> f32 {
        1.0 + DESTROYED_COMPONENT_ESCALATION * self.destroyed_count() as f32
    }

    /// First live component that lists `slot` as protected
    fn live_protector_of(&self, slot: ComponentSlot) -> Option<ComponentSlot> {
        self.parts
            .iter()
            .find(|c| c.slot != slot && c.is_functional() && c.protects.contains(&slot))
            .map(|c| c.slot)
    }
}

/// A component destroyed by a hit
#[derive(Debug, Clone, PartialEq)]
pub struct DestroyedComponent {
    pub slot: ComponentSlot,
    /// World position of the part at the time of destruction
    pub position: Vec2,
    pub effect_tags: &'static [&'static str],
    /// Permanent stat loss, `None` for parts without a function
    pub penalty: Option<TemporaryEffect>,
}

/// Outcome of routing one hit
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentHitReport {
    pub hit: ComponentSlot,
    /// Damage passed on to the bot's own damage pipeline
    pub actor_damage: f32,
    /// Damage the hit component absorbed into its own health
    pub component_damage: f32,
    pub was_critical: bool,
    pub destroyed: Vec<DestroyedComponent>,
    pub remaining_functional: usize,
    pub damage_effects: &'static [&'static str],
}

/// Transform a world point into a bot's local frame
fn to_local(point: Vec2, actor_pos: Vec2, facing: f32) -> Vec2 {
    Vec2::from_angle(-facing).rotate(point - actor_pos)
}

fn to_world(local: Vec2, actor_pos: Vec2, facing: f32) -> Vec2 {
    actor_pos + Vec2::from_angle(facing).rotate(local)
}

/// Routes incoming damage through a bot's components
pub struct ComponentDamageRouter;

impl ComponentDamageRouter {
    /// Build the fixed component set for a bot of the given class
    pub fn initialize(actor: ActorId, class: &BotClassDefinition) -> ComponentSet {
        let scale = class.chassis.health_scale();
        let armor_bonus = class.chassis.armor_bonus();
        let parts = ComponentSlot::ALL.map(|slot| {
            let t = template(slot);
            let max_health = t.max_health * scale;
            Component {
                slot,
                health: max_health,
                max_health,
                critical: t.critical,
                relative_position: Vec2::new(t.offset.0, t.offset.1) * class.radius,
                size: t.size * class.radius,
                armor: (t.armor + armor_bonus).min(MAX_ARMOR),
                functionality: t.functionality,
                protects: t.protects,
                damage_effects: t.damage_effects,
                destroy_effects: t.destroy_effects,
            }
        });
        ComponentSet { actor, parts }
    }

    /// Pick the component a hit lands on, before protection.
    ///
    /// With a hit position, the nearest part whose radius contains the point
    /// wins. Otherwise (or if nothing contains it) a live part is chosen
    /// uniformly. The core takes anything left unresolved.
    pub fn select_target<R: RandomSource + ?Sized>(
        set: &ComponentSet,
        actor_pos: Vec2,
        facing: f32,
        hit_position: Option<Vec2>,
        rng: &mut R,
    ) -> ComponentSlot {
        if let Some(world) = hit_position {
            let local = to_local(world, actor_pos, facing);
            let nearest = set
                .iter()
                .map(|c| (c.slot, c.relative_position.distance(local), c.size))
                .filter(|&(_, dist, size)| dist <= size)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((slot, _, _)) = nearest {
                return slot;
            }
        }

        let live: Vec<ComponentSlot> = set
            .iter()
            .filter(|c| c.is_functional())
            .map(|c| c.slot)
            .collect();
        if live.is_empty() {
            return ComponentSlot::Core;
        }
        live[rng.next_index(live.len())]
    }

    /// Apply one hit to a bot's components
    pub fn apply_damage<R: RandomSource + ?Sized>(
        set: &mut ComponentSet,
        actor_pos: Vec2,
        facing: f32,
        damage: f32,
        hit_position: Option<Vec2>,
        damage_type: DamageType,
        rng: &mut R,
    ) -> ComponentHitReport {
        let selected = Self::select_target(set, actor_pos, facing, hit_position, rng);
        // Single hop: a protector's own protector is never consulted
        let hit = set.live_protector_of(selected).unwrap_or(selected);

        let escalated = damage * set.escalation();
        let component = set.get_mut(hit);
        let was_functional = component.is_functional();
        let component_damage = escalated * (1.0 - component.armor);
        component.health = (component.health - component_damage).max(0.0);

        let was_critical = component.critical;
        let actor_damage = if was_critical {
            escalated * CRITICAL_MULTIPLIER
        } else {
            escalated
        };

        let mut destroyed = Vec::new();
        if was_functional && !component.is_functional() {
            let modifiers = component.functionality.loss_modifiers();
            let penalty = (!modifiers.is_empty())
                .then(|| TemporaryEffect::permanent(EffectSource::ComponentLoss(hit), modifiers));
            destroyed.push(DestroyedComponent {
                slot: hit,
                position: to_world(component.relative_position, actor_pos, facing),
                effect_tags: component.destroy_effects,
                penalty,
            });
            log::debug!(
                "{:?}: {} destroyed by {:?} damage",
                set.actor,
                hit.as_str(),
                damage_type
            );
        }

        let component = set.get(hit);
        ComponentHitReport {
            hit,
            actor_damage,
            component_damage,
            was_critical,
            destroyed,
            remaining_functional: set.functional_count(),
            damage_effects: component.damage_effects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::catalog::Catalog;
    use crate::sim::rng::ScriptedRng;

    fn striker_set() -> ComponentSet {
        let catalog = Catalog::builtin();
        ComponentDamageRouter::initialize(ActorId(1), catalog.class("striker").unwrap())
    }

    #[test]
    fn test_initialize_scaling() {
        let catalog = Catalog::builtin();
        let standard = ComponentDamageRouter::initialize(ActorId(1), catalog.class("striker").unwrap());
        let tank = ComponentDamageRouter::initialize(ActorId(2), catalog.class("titan").unwrap());
        let glass = ComponentDamageRouter::initialize(ActorId(3), catalog.class("speedster").unwrap());

        let core = |s: &ComponentSet| *s.get(ComponentSlot::Core);
        assert_eq!(core(&standard).max_health, 100.0);
        assert_eq!(core(&tank).max_health, 150.0);
        assert_eq!(core(&glass).max_health, 80.0);
        assert!((core(&tank).armor - 0.2).abs() < 1e-6);
        assert_eq!(standard.functional_count(), COMPONENT_COUNT);
    }

    #[test]
    fn test_positional_hit_selects_containing_part() {
        let set = striker_set();
        let mut rng = ScriptedRng::new(vec![0.0]);
        // Bot at origin facing +x; left tread sits at (-10, -16)
        let slot = ComponentDamageRouter::select_target(
            &set,
            Vec2::ZERO,
            0.0,
            Some(Vec2::new(-10.0, -16.0)),
            &mut rng,
        );
        assert_eq!(slot, ComponentSlot::LeftTread);
    }

    #[test]
    fn test_positional_hit_respects_facing() {
        let set = striker_set();
        let mut rng = ScriptedRng::new(vec![0.0]);
        // Facing +y: the front armor is now at (0, 17)
        let slot = ComponentDamageRouter::select_target(
            &set,
            Vec2::new(100.0, 100.0),
            std::f32::consts::FRAC_PI_2,
            Some(Vec2::new(100.0, 117.0)),
            &mut rng,
        );
        assert_eq!(slot, ComponentSlot::FrontArmor);
    }

    #[test]
    fn test_random_selection_skips_destroyed() {
        let mut set = striker_set();
        for slot in ComponentSlot::ALL {
            if slot != ComponentSlot::Sensor {
                set.get_mut(slot).health = 0.0;
            }
        }
        let mut rng = ScriptedRng::new(vec![0.9]);
        let slot = ComponentDamageRouter::select_target(&set, Vec2::ZERO, 0.0, None, &mut rng);
        assert_eq!(slot, ComponentSlot::Sensor);
    }

    #[test]
    fn test_all_destroyed_falls_back_to_core() {
        let mut set = striker_set();
        for slot in ComponentSlot::ALL {
            set.get_mut(slot).health = 0.0;
        }
        let mut rng = ScriptedRng::new(vec![0.5]);
        let slot = ComponentDamageRouter::select_target(&set, Vec2::ZERO, 0.0, None, &mut rng);
        assert_eq!(slot, ComponentSlot::Core);
    }

    #[test]
    fn test_protector_absorbs_hit_on_core() {
        let mut set = striker_set();
        let mut rng = ScriptedRng::new(vec![0.0]);
        let report = ComponentDamageRouter::apply_damage(
            &mut set,
            Vec2::ZERO,
            0.0,
            10.0,
            Some(Vec2::ZERO),
            DamageType::Ranged,
            &mut rng,
        );
        assert_eq!(report.hit, ComponentSlot::FrontArmor);
        assert!(!report.was_critical);
        assert_eq!(report.actor_damage, 10.0);
        assert!((set.get(ComponentSlot::FrontArmor).health - 74.0).abs() < 1e-4);
        assert_eq!(set.get(ComponentSlot::Core).health, 100.0);
    }

    #[test]
    fn test_core_exposed_once_protector_destroyed() {
        let mut set = striker_set();
        set.get_mut(ComponentSlot::FrontArmor).health = 0.0;
        let mut rng = ScriptedRng::new(vec![0.0]);
        let report = ComponentDamageRouter::apply_damage(
            &mut set,
            Vec2::ZERO,
            0.0,
            10.0,
            Some(Vec2::ZERO),
            DamageType::Ranged,
            &mut rng,
        );
        assert_eq!(report.hit, ComponentSlot::Core);
        assert!(report.was_critical);
        // one destroyed part: 10 * 1.1 * 1.5
        assert!((report.actor_damage - 16.5).abs() < 1e-4);
    }

    #[test]
    fn test_destruction_reports_once_with_penalty() {
        let mut set = striker_set();
        let mut rng = ScriptedRng::new(vec![0.0]);
        let tread_hit = Some(Vec2::new(-10.0, -16.0));
        let report = ComponentDamageRouter::apply_damage(
            &mut set,
            Vec2::ZERO,
            0.0,
            500.0,
            tread_hit,
            DamageType::Melee,
            &mut rng,
        );
        assert_eq!(report.hit, ComponentSlot::LeftTread);
        assert_eq!(report.destroyed.len(), 1);
        let destroyed = &report.destroyed[0];
        assert_eq!(destroyed.effect_tags, &["tread_snap", "debris"]);
        let penalty = destroyed.penalty.as_ref().unwrap();
        assert_eq!(penalty.modifiers, vec![StatModifier::new(StatKind::Speed, 0.75)]);
        assert_eq!(report.remaining_functional, COMPONENT_COUNT - 1);

        // hitting the wreck again does not destroy it twice
        let report = ComponentDamageRouter::apply_damage(
            &mut set,
            Vec2::ZERO,
            0.0,
            5.0,
            tread_hit,
            DamageType::Melee,
            &mut rng,
        );
        assert!(report.destroyed.is_empty());
        assert_eq!(set.get(ComponentSlot::LeftTread).health, 0.0);
    }

    #[test]
    fn test_escalation_with_two_destroyed() {
        let mut set = striker_set();
        set.get_mut(ComponentSlot::LeftTread).health = 0.0;
        set.get_mut(ComponentSlot::RightTread).health = 0.0;
        assert!((set.escalation() - 1.2).abs() < 1e-6);

        let mut rng = ScriptedRng::new(vec![0.0]);
        let report = ComponentDamageRouter::apply_damage(
            &mut set,
            Vec2::ZERO,
            0.0,
            10.0,
            Some(Vec2::new(4.0, 14.0)),
            DamageType::Ranged,
            &mut rng,
        );
        assert_eq!(report.hit, ComponentSlot::RightWeapon);
        assert!((report.actor_damage - 12.0).abs() < 1e-4);
        // 12 * (1 - 0.05)
        assert!((report.component_damage - 11.4).abs() < 1e-4);
    }
}
