//! Static bot class and upgrade catalogs
//!
//! Catalogs are immutable once built. They come either from the built-in
//! defaults or from JSON data, and are validated before use.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::stats::{StatKind, StatModifier, StatSet};
use crate::error::{ConfigurationError, Result};

/// Signature ability of a bot class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Armor boost
    Fortify,
    /// Speed multiplier
    Overdrive,
    /// Damage and speed multiplier
    Berserk,
    /// Cloaked status (autopilots cannot target the bot)
    Cloak,
    /// Extra shield capacity, refilled on activation
    Barrier,
}

impl AbilityKind {
    /// Stat modifiers active while the ability runs
    pub fn modifiers(&self) -> Vec<StatModifier> {
        match self {
            AbilityKind::Fortify => vec![StatModifier::new(StatKind::Armor, 0.3)],
            AbilityKind::Overdrive => vec![StatModifier::new(StatKind::Speed, 1.8)],
            AbilityKind::Berserk => vec![
                StatModifier::new(StatKind::MeleeDamage, 1.5),
                StatModifier::new(StatKind::RangedDamage, 1.5),
                StatModifier::new(StatKind::Speed, 1.3),
            ],
            AbilityKind::Cloak => Vec::new(),
            AbilityKind::Barrier => vec![StatModifier::new(StatKind::Shield, 50.0)],
        }
    }
}

/// Ranged weapon parameterization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeaponKind {
    Standard,
    /// Large slow shell
    Heavy,
    /// Fan of pellets spread across `spread` radians
    MultiShot { count: u8, spread: f32 },
    /// Fast piercing round with doubled damage
    Sniper,
    /// Instant hitscan beam
    Laser,
}

/// Component health profile for a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChassisProfile {
    #[default]
    Standard,
    Tank,
    GlassCannon,
}

impl ChassisProfile {
    /// Multiplier on component max health
    pub fn health_scale(&self) -> f32 {
        match self {
            ChassisProfile::Standard => 1.0,
            ChassisProfile::Tank => 1.5,
            ChassisProfile::GlassCannon => 0.8,
        }
    }

    /// Flat armor added to every component
    pub fn armor_bonus(&self) -> f32 {
        match self {
            ChassisProfile::Tank => 0.1,
            _ => 0.0,
        }
    }
}

fn default_radius() -> f32 {
    20.0
}

/// A playable bot class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotClassDefinition {
    pub id: String,
    pub name: String,
    pub base_stats: StatSet,
    pub ability: AbilityKind,
    pub ability_duration_ms: f32,
    pub ability_cooldown_ms: f32,
    pub unlock_price: u32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    pub weapon: WeaponKind,
    #[serde(default)]
    pub chassis: ChassisProfile,
}

/// A permanent upgrade, part of a per-category tier chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    pub id: String,
    pub category: String,
    pub tier: u8,
    pub modifiers: Vec<StatModifier>,
    pub cost: u32,
    #[serde(default)]
    pub prerequisite: Option<String>,
    /// Position in the catalog, assigned when the catalog is built
    #[serde(skip)]
    pub order: usize,
}

#[derive(Deserialize)]
struct CatalogFile {
    classes: Vec<BotClassDefinition>,
    #[serde(default)]
    upgrades: Vec<UpgradeDefinition>,
}

/// Class and upgrade definitions
#[derive(Debug, Clone)]
pub struct Catalog {
    classes: Vec<BotClassDefinition>,
    upgrades: Vec<UpgradeDefinition>,
    upgrade_index: HashMap<String, usize>,
}

impl Catalog {
    /// Build and validate a catalog
    pub fn new(classes: Vec<BotClassDefinition>, upgrades: Vec<UpgradeDefinition>) -> Result<Self> {
        let mut class_ids = HashSet::new();
        for class in &classes {
            if !class_ids.insert(class.id.as_str()) {
                return Err(ConfigurationError::DuplicateId {
                    kind: "class",
                    id: class.id.clone(),
                });
            }
        }

        let mut upgrade_ids = HashSet::new();
        for upgrade in &upgrades {
            if !upgrade_ids.insert(upgrade.id.as_str()) {
                return Err(ConfigurationError::DuplicateId {
                    kind: "upgrade",
                    id: upgrade.id.clone(),
                });
            }
        }

        let catalog = Self::assemble(classes, upgrades);
        for upgrade in &catalog.upgrades {
            validate_chain(upgrade, &catalog.upgrades, &catalog.upgrade_index)?;
        }

        log::debug!(
            "Catalog built: {} classes, {} upgrades",
            catalog.classes.len(),
            catalog.upgrades.len()
        );
        Ok(catalog)
    }

    fn assemble(classes: Vec<BotClassDefinition>, mut upgrades: Vec<UpgradeDefinition>) -> Self {
        let mut upgrade_index = HashMap::new();
        for (order, upgrade) in upgrades.iter_mut().enumerate() {
            upgrade.order = order;
            upgrade_index.insert(upgrade.id.clone(), order);
        }
        Self {
            classes,
            upgrades,
            upgrade_index,
        }
    }

    /// Load a catalog from JSON (`{"classes": [...], "upgrades": [...]}`)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|source| ConfigurationError::Parse { what: "catalog", source })?;
        Self::new(file.classes, file.upgrades)
    }

    pub fn classes(&self) -> &[BotClassDefinition] {
        &self.classes
    }

    pub fn upgrades(&self) -> &[UpgradeDefinition] {
        &self.upgrades
    }

    /// Look up a class; unknown ids are a configuration bug
    pub fn class(&self, id: &str) -> Result<&BotClassDefinition> {
        self.classes
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ConfigurationError::UnknownClass(id.to_string()))
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDefinition> {
        self.upgrade_index.get(id).map(|&i| &self.upgrades[i])
    }

    /// Classes unlocked for a fresh profile
    pub fn starter_classes(&self) -> Vec<String> {
        self.classes
            .iter()
            .filter(|c| c.unlock_price == 0)
            .map(|c| c.id.clone())
            .collect()
    }

    /// True if `id` exists and its prerequisite (if any) is in `owned`
    pub fn can_unlock(&self, owned: &[String], id: &str) -> bool {
        match self.upgrade(id) {
            Some(upgrade) => match &upgrade.prerequisite {
                Some(pre) => owned.iter().any(|o| o == pre),
                None => true,
            },
            None => false,
        }
    }

    /// Resolve persisted upgrade ids into definitions, in catalog order.
    ///
    /// Unknown ids (stale save data) are skipped. Chains are strict: a tier
    /// is kept only if the tier below it was kept too.
    pub fn resolve_owned(&self, owned: &[String]) -> Vec<UpgradeDefinition> {
        let mut candidates: Vec<&UpgradeDefinition> = Vec::with_capacity(owned.len());
        for id in owned {
            let Some(upgrade) = self.upgrade(id) else {
                log::warn!("Skipping unknown upgrade id '{}'", id);
                continue;
            };
            if !candidates.iter().any(|u| u.id == upgrade.id) {
                candidates.push(upgrade);
            }
        }
        // Lower tiers first, so every prerequisite is decided before its dependents
        candidates.sort_by_key(|u| (u.tier, u.order));

        let mut resolved: Vec<UpgradeDefinition> = Vec::with_capacity(candidates.len());
        for upgrade in candidates {
            let chained = match &upgrade.prerequisite {
                Some(pre) => resolved.iter().any(|u| &u.id == pre),
                None => true,
            };
            if !chained {
                log::warn!("Skipping upgrade '{}': prerequisite not owned", upgrade.id);
                continue;
            }
            resolved.push(upgrade.clone());
        }
        resolved.sort_by_key(|u| u.order);
        resolved
    }

    /// Built-in classes and upgrade chains
    pub fn builtin() -> Self {
        Self::assemble(builtin_classes(), builtin_upgrades())
    }
}

fn validate_chain(
    upgrade: &UpgradeDefinition,
    all: &[UpgradeDefinition],
    index: &HashMap<String, usize>,
) -> Result<()> {
    let broken = |reason: String| ConfigurationError::BrokenChain {
        id: upgrade.id.clone(),
        category: upgrade.category.clone(),
        reason,
    };

    match &upgrade.prerequisite {
        None if upgrade.tier > 1 => Err(broken(format!(
            "tier {} has no prerequisite",
            upgrade.tier
        ))),
        None => Ok(()),
        Some(pre) => {
            let Some(&i) = index.get(pre) else {
                return Err(ConfigurationError::MissingPrerequisite {
                    id: upgrade.id.clone(),
                    prerequisite: pre.clone(),
                });
            };
            let prev = &all[i];
            if prev.category != upgrade.category {
                return Err(broken(format!("prerequisite {} is in {}", pre, prev.category)));
            }
            if prev.tier + 1 != upgrade.tier {
                return Err(broken(format!(
                    "tier {} follows tier {}",
                    upgrade.tier, prev.tier
                )));
            }
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn class(
    id: &str,
    name: &str,
    base_stats: StatSet,
    ability: AbilityKind,
    ability_duration_ms: f32,
    ability_cooldown_ms: f32,
    unlock_price: u32,
    radius: f32,
    weapon: WeaponKind,
    chassis: ChassisProfile,
) -> BotClassDefinition {
    BotClassDefinition {
        id: id.to_string(),
        name: name.to_string(),
        base_stats,
        ability,
        ability_duration_ms,
        ability_cooldown_ms,
        unlock_price,
        radius,
        weapon,
        chassis,
    }
}

fn builtin_classes() -> Vec<BotClassDefinition> {
    vec![
        class(
            "striker",
            "Striker",
            StatSet {
                health: 100.0,
                speed: 180.0,
                melee_damage: 15.0,
                ranged_damage: 10.0,
                armor: 0.1,
                energy: 100.0,
                ranged_cooldown: 500.0,
                melee_cooldown: 800.0,
                ..Default::default()
            },
            AbilityKind::Berserk,
            4000.0,
            12000.0,
            0,
            20.0,
            WeaponKind::Standard,
            ChassisProfile::Standard,
        ),
        class(
            "titan",
            "Titan",
            StatSet {
                health: 150.0,
                speed: 120.0,
                melee_damage: 25.0,
                ranged_damage: 14.0,
                armor: 0.3,
                energy: 80.0,
                ranged_cooldown: 900.0,
                melee_cooldown: 1000.0,
                ..Default::default()
            },
            AbilityKind::Fortify,
            5000.0,
            15000.0,
            0,
            26.0,
            WeaponKind::Heavy,
            ChassisProfile::Tank,
        ),
        class(
            "speedster",
            "Speedster",
            StatSet {
                health: 80.0,
                speed: 260.0,
                melee_damage: 10.0,
                ranged_damage: 8.0,
                armor: 0.0,
                energy: 120.0,
                ranged_cooldown: 350.0,
                melee_cooldown: 600.0,
                acceleration: 0.18,
                ..Default::default()
            },
            AbilityKind::Overdrive,
            3000.0,
            10000.0,
            300,
            16.0,
            WeaponKind::MultiShot {
                count: 3,
                spread: 0.3,
            },
            ChassisProfile::GlassCannon,
        ),
        class(
            "phantom",
            "Phantom",
            StatSet {
                health: 90.0,
                speed: 200.0,
                melee_damage: 20.0,
                ranged_damage: 12.0,
                armor: 0.05,
                energy: 100.0,
                ranged_cooldown: 700.0,
                melee_cooldown: 700.0,
                ..Default::default()
            },
            AbilityKind::Cloak,
            5000.0,
            18000.0,
            750,
            18.0,
            WeaponKind::Laser,
            ChassisProfile::GlassCannon,
        ),
        class(
            "guardian",
            "Guardian",
            StatSet {
                health: 120.0,
                shield: 25.0,
                speed: 150.0,
                melee_damage: 12.0,
                ranged_damage: 11.0,
                armor: 0.2,
                energy: 100.0,
                ranged_cooldown: 1200.0,
                melee_cooldown: 900.0,
                ..Default::default()
            },
            AbilityKind::Barrier,
            6000.0,
            16000.0,
            600,
            22.0,
            WeaponKind::Sniper,
            ChassisProfile::Tank,
        ),
    ]
}

fn chain(
    category: &str,
    stat: StatKind,
    values: [f32; 3],
    costs: [u32; 3],
) -> Vec<UpgradeDefinition> {
    (0..3)
        .map(|i| UpgradeDefinition {
            id: format!("{}_{}", category, i + 1),
            category: category.to_string(),
            tier: i as u8 + 1,
            modifiers: vec![StatModifier::new(stat, values[i])],
            cost: costs[i],
            prerequisite: (i > 0).then(|| format!("{}_{}", category, i)),
            order: 0,
        })
        .collect()
}

fn builtin_upgrades() -> Vec<UpgradeDefinition> {
    [
        chain("hull", StatKind::Health, [25.0, 35.0, 50.0], [100, 250, 500]),
        chain("blades", StatKind::MeleeDamage, [1.1, 1.15, 1.2], [120, 300, 600]),
        chain("cannons", StatKind::RangedDamage, [1.1, 1.15, 1.2], [120, 300, 600]),
        chain("servos", StatKind::Speed, [1.05, 1.08, 1.12], [100, 220, 450]),
        chain("plating", StatKind::Armor, [0.05, 0.05, 0.08], [150, 350, 700]),
        chain("capacitor", StatKind::Shield, [15.0, 25.0, 40.0], [150, 300, 650]),
        chain("cooling", StatKind::CooldownFactor, [-0.05, -0.07, -0.1], [200, 400, 800]),
        chain("nanites", StatKind::Regen, [1.0, 1.5, 2.5], [200, 450, 900]),
    ]
    .into_iter()
    .flatten()
    .collect()
}
