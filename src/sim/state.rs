//! Arena state and core simulation types
//!
//! Everything a match needs to replay lives here: the seed and RNG, the
//! clock, the id-sorted actor and projectile arenas, pickups, settings and
//! the catalog. Nothing is global.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::actor::{ActorId, Bot, DamageType, PlayerId, SimMillis, Status};
use super::catalog::{AbilityKind, Catalog};
use super::components::ComponentSlot;
use super::projectile::{Projectile, ProjectileId, ProjectileKind};
use super::rng::{RandomSource, SimRng};
use super::stats::{EffectSource, StatKind, StatModifier, TemporaryEffect};
use crate::error::{ConfigurationError, Result};
use crate::persistence::PlayerProfile;
use crate::scoreboard::{MatchReport, PlayerTotals};
use crate::settings::SimSettings;

/// Current phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Simulation running
    Active,
    /// Clock stopped; intents are ignored
    Paused,
    /// Match over, `None` for a draw
    Ended { winner: Option<PlayerId> },
}

/// Arena power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    /// Melee and ranged damage ×1.25 for 8 s
    Overclock,
    /// Speed ×1.4 for 6 s
    Afterburner,
    /// Instant 40 health
    RepairKit,
    /// Instant shield refill
    ShieldCell,
}

impl PickupKind {
    pub const ALL: [PickupKind; 4] = [
        PickupKind::Overclock,
        PickupKind::Afterburner,
        PickupKind::RepairKit,
        PickupKind::ShieldCell,
    ];

    /// Timed stat effect granted on collection, if any
    pub fn effect(&self) -> Option<TemporaryEffect> {
        let source = EffectSource::Pickup(*self);
        match self {
            PickupKind::Overclock => Some(TemporaryEffect::new(
                source,
                vec![
                    StatModifier::new(StatKind::MeleeDamage, 1.25),
                    StatModifier::new(StatKind::RangedDamage, 1.25),
                ],
                8000.0,
            )),
            PickupKind::Afterburner => Some(TemporaryEffect::new(
                source,
                vec![StatModifier::new(StatKind::Speed, 1.4)],
                6000.0,
            )),
            PickupKind::RepairKit | PickupKind::ShieldCell => None,
        }
    }
}

/// Health restored by a repair kit
pub const REPAIR_KIT_HEAL: f32 = 40.0;

/// A pickup lying in the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub pos: Vec2,
    pub ttl_ticks: u32,
}

/// Something that happened during a tick, for renderers, audio and UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Damage {
        target: ActorId,
        source: ActorId,
        amount: f32,
        damage_type: DamageType,
        position: Vec2,
        component: ComponentSlot,
        was_critical: bool,
    },
    Death {
        actor: ActorId,
        player: PlayerId,
        killer: Option<ActorId>,
    },
    ComponentDestroyed {
        actor: ActorId,
        component: ComponentSlot,
        position: Vec2,
        effect_tags: &'static [&'static str],
    },
    AbilityActivated {
        actor: ActorId,
        ability: AbilityKind,
    },
    AbilityEnded {
        actor: ActorId,
        ability: AbilityKind,
    },
    ProjectileFired {
        projectile: ProjectileId,
        owner: ActorId,
        kind: ProjectileKind,
    },
    BeamFired {
        owner: ActorId,
        from: Vec2,
        to: Vec2,
    },
    PickupSpawned {
        pickup: u32,
        kind: PickupKind,
        position: Vec2,
    },
    PickupCollected {
        actor: ActorId,
        kind: PickupKind,
    },
    MatchEnded {
        winner: Option<PlayerId>,
    },
}

/// Per-actor view for renderers and network sync
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub player: PlayerId,
    pub class_id: String,
    pub pos: Vec2,
    pub facing: f32,
    pub health: f32,
    pub max_health: f32,
    pub shield: f32,
    pub max_shield: f32,
    pub energy: f32,
    pub ability_active: bool,
    pub cloaked: bool,
    pub functional_components: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileSnapshot {
    pub id: ProjectileId,
    pub owner: ActorId,
    pub kind: ProjectileKind,
    pub pos: Vec2,
    pub active: bool,
}

/// Read-only view of the arena after a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaSnapshot {
    pub tick: u64,
    pub time_ms: SimMillis,
    pub phase: MatchPhase,
    pub actors: Vec<ActorSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub pickups: Vec<Pickup>,
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct ArenaState {
    /// Seed for replay
    pub seed: u64,
    pub rng: SimRng,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: MatchPhase,
    pub settings: SimSettings,
    pub catalog: Catalog,
    /// Living bots (sorted by id)
    pub actors: Vec<Bot>,
    /// Projectiles in flight (sorted by id)
    pub projectiles: Vec<Projectile>,
    /// Pickups on the floor (sorted by id)
    pub pickups: Vec<Pickup>,
    events: Vec<SimEvent>,
    /// Owner of every bot ever spawned, dead ones included
    pub(crate) roster: BTreeMap<ActorId, PlayerId>,
    totals: BTreeMap<PlayerId, PlayerTotals>,
    next_actor_id: u32,
    next_projectile_id: u32,
    next_pickup_id: u32,
}

impl ArenaState {
    /// Create an empty arena with the given seed
    pub fn new(settings: SimSettings, catalog: Catalog, seed: u64) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            seed,
            rng: SimRng::new(seed),
            time_ticks: 0,
            phase: MatchPhase::Active,
            settings,
            catalog,
            actors: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            events: Vec::new(),
            roster: BTreeMap::new(),
            totals: BTreeMap::new(),
            next_actor_id: 1,
            next_projectile_id: 1,
            next_pickup_id: 1,
        })
    }

    /// Create an arena for a live match, seeded from OS entropy
    pub fn with_entropy(settings: SimSettings, catalog: Catalog) -> Result<Self> {
        let seed = SimRng::from_entropy().seed();
        log::info!("Match seeded with {}", seed);
        Self::new(settings, catalog, seed)
    }

    /// Simulation time in milliseconds
    pub fn now(&self) -> SimMillis {
        self.time_ticks as f64 * self.settings.dt_ms as f64
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, MatchPhase::Ended { .. })
    }

    /// Spawn a bot; `upgrades` are persisted ids, unknown ones are skipped
    pub fn spawn_bot(
        &mut self,
        player: PlayerId,
        class_id: &str,
        upgrades: &[String],
        pos: Vec2,
    ) -> Result<ActorId> {
        let id = ActorId(self.next_actor_id);
        let mut bot = Bot::from_catalog(id, player, &self.catalog, class_id, upgrades, pos)?;
        self.next_actor_id += 1;

        let bounds = self.settings.arena_bounds();
        bot.pos = bot.pos.max(bounds.min + bot.radius).min(bounds.max - bot.radius);

        if self.settings.spawn_invulnerability_ms > 0.0 {
            let until = self.now() + self.settings.spawn_invulnerability_ms as f64;
            bot.add_status(Status::Invulnerable, Some(until));
        }

        log::info!(
            "Spawned {:?} ({}) for {:?} at ({:.0}, {:.0})",
            id,
            class_id,
            player,
            bot.pos.x,
            bot.pos.y
        );
        self.roster.insert(id, player);
        self.totals
            .entry(player)
            .or_insert_with(|| PlayerTotals::new(player))
            .bots_spawned += 1;
        // Ids only grow, so pushing keeps the arena sorted
        self.actors.push(bot);
        Ok(id)
    }

    /// Spawn a bot using what a player's profile owns
    pub fn spawn_from_profile(
        &mut self,
        profile: &PlayerProfile,
        class_id: &str,
        pos: Vec2,
    ) -> Result<ActorId> {
        if !profile.has_class(class_id) {
            return Err(ConfigurationError::ClassLocked {
                player: profile.player.0,
                class_id: class_id.to_string(),
            });
        }
        let upgrades = profile.upgrades_for(class_id).to_vec();
        self.spawn_bot(profile.player, class_id, &upgrades, pos)
    }

    pub fn actor_index(&self, id: ActorId) -> Option<usize> {
        self.actors.binary_search_by_key(&id, |b| b.id).ok()
    }

    pub fn actor(&self, id: ActorId) -> Option<&Bot> {
        self.actor_index(id).map(|i| &self.actors[i])
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Bot> {
        self.actor_index(id).map(move |i| &mut self.actors[i])
    }

    /// Owning player of any bot ever spawned here
    pub fn player_of(&self, id: ActorId) -> Option<PlayerId> {
        self.roster.get(&id).copied()
    }

    /// Players with at least one living bot
    pub fn alive_players(&self) -> BTreeSet<PlayerId> {
        self.actors
            .iter()
            .filter(|b| b.is_alive())
            .map(|b| b.player)
            .collect()
    }

    /// Number of players that ever spawned a bot
    pub fn player_count(&self) -> usize {
        self.totals.len()
    }

    /// Allocate a new projectile ID
    pub fn next_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id += 1;
        id
    }

    /// Allocate a new pickup ID
    pub fn next_pickup_id(&mut self) -> u32 {
        let id = self.next_pickup_id;
        self.next_pickup_id += 1;
        id
    }

    pub(crate) fn push_event(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub(crate) fn totals_mut(&mut self, player: PlayerId) -> &mut PlayerTotals {
        self.totals
            .entry(player)
            .or_insert_with(|| PlayerTotals::new(player))
    }

    /// Events produced since the last drain
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.actors.sort_by_key(|b| b.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.pickups.sort_by_key(|p| p.id);
    }

    /// Uniform random point inside the arena, `margin` away from the walls
    pub fn random_point(&mut self, margin: f32) -> Vec2 {
        let bounds = self.settings.arena_bounds().inset(margin);
        let span = (bounds.max - bounds.min).max(Vec2::ZERO);
        bounds.min + Vec2::new(self.rng.next_f32() * span.x, self.rng.next_f32() * span.y)
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            tick: self.time_ticks,
            time_ms: self.now(),
            phase: self.phase,
            actors: self
                .actors
                .iter()
                .map(|b| ActorSnapshot {
                    id: b.id,
                    player: b.player,
                    class_id: b.class_id.clone(),
                    pos: b.pos,
                    facing: b.facing,
                    health: b.health,
                    max_health: b.max_health,
                    shield: b.shield,
                    max_shield: b.max_shield,
                    energy: b.energy,
                    ability_active: b.is_ability_active(),
                    cloaked: b.has_status(Status::Cloaked),
                    functional_components: b.components.functional_count(),
                })
                .collect(),
            projectiles: self
                .projectiles
                .iter()
                .map(|p| ProjectileSnapshot {
                    id: p.id,
                    owner: p.owner,
                    kind: p.kind,
                    pos: p.pos,
                    active: p.active,
                })
                .collect(),
            pickups: self.pickups.clone(),
        }
    }

    /// Per-player totals so far, ranked
    pub fn match_report(&self) -> MatchReport {
        let winner = match self.phase {
            MatchPhase::Ended { winner } => winner,
            _ => None,
        };
        let players = self.totals.values().map(|totals| PlayerTotals {
            survivors: self
                .actors
                .iter()
                .filter(|b| b.player == totals.player && b.is_alive())
                .count() as u32,
            ..totals.clone()
        });
        MatchReport::new(self.seed, self.now(), winner, players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ARENA_HEIGHT, ARENA_WIDTH};

    fn arena() -> ArenaState {
        ArenaState::new(SimSettings::default(), Catalog::builtin(), 12345).unwrap()
    }

    #[test]
    fn test_spawn_assigns_increasing_ids() {
        let mut state = arena();
        let a = state
            .spawn_bot(PlayerId(1), "striker", &[], Vec2::new(100.0, 100.0))
            .unwrap();
        let b = state
            .spawn_bot(PlayerId(2), "titan", &[], Vec2::new(300.0, 100.0))
            .unwrap();
        assert!(a < b);
        assert_eq!(state.actor(b).unwrap().class_id, "titan");
        assert_eq!(state.player_of(a), Some(PlayerId(1)));
        assert_eq!(state.player_count(), 2);
    }

    #[test]
    fn test_spawn_unknown_class_fails() {
        let mut state = arena();
        let err = state
            .spawn_bot(PlayerId(1), "mystery", &[], Vec2::ZERO)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownClass(_)));
        assert!(state.actors.is_empty());
        assert_eq!(state.player_count(), 0);
    }

    #[test]
    fn test_spawn_clamped_into_arena() {
        let mut state = arena();
        let id = state
            .spawn_bot(PlayerId(1), "striker", &[], Vec2::new(-50.0, 5000.0))
            .unwrap();
        let bot = state.actor(id).unwrap();
        assert_eq!(bot.pos, Vec2::new(20.0, 980.0));
    }

    #[test]
    fn test_spawn_protection() {
        let mut state = arena();
        let id = state
            .spawn_bot(PlayerId(1), "striker", &[], Vec2::splat(200.0))
            .unwrap();
        assert!(state.actor(id).unwrap().has_status(Status::Invulnerable));

        let mut settings = SimSettings::default();
        settings.spawn_invulnerability_ms = 0.0;
        let mut state = ArenaState::new(settings, Catalog::builtin(), 1).unwrap();
        let id = state
            .spawn_bot(PlayerId(1), "striker", &[], Vec2::splat(200.0))
            .unwrap();
        assert!(!state.actor(id).unwrap().has_status(Status::Invulnerable));
    }

    #[test]
    fn test_spawn_from_profile() {
        let mut state = arena();
        let mut profile = PlayerProfile::starter(PlayerId(3));
        profile
            .upgrades
            .insert("titan".into(), vec!["hull_1".into(), "hull_2".into()]);

        let id = state
            .spawn_from_profile(&profile, "titan", Vec2::splat(300.0))
            .unwrap();
        assert_eq!(state.actor(id).unwrap().max_health, 210.0);

        let err = state
            .spawn_from_profile(&profile, "phantom", Vec2::splat(300.0))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ClassLocked { player: 3, .. }));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = SimSettings::default();
        settings.arena_width = 0.0;
        assert!(ArenaState::new(settings, Catalog::builtin(), 1).is_err());
    }

    #[test]
    fn test_drain_events() {
        let mut state = arena();
        state.push_event(SimEvent::MatchEnded { winner: None });
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.drain_events().len(), 1);
        assert!(state.events().is_empty());
    }

    #[test]
    fn test_snapshot_and_report() {
        let mut state = arena();
        state
            .spawn_bot(PlayerId(1), "guardian", &[], Vec2::splat(200.0))
            .unwrap();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.actors.len(), 1);
        assert_eq!(snapshot.actors[0].shield, 25.0);
        assert_eq!(snapshot.actors[0].functional_components, 7);

        let report = state.match_report();
        assert_eq!(report.seed, 12345);
        assert_eq!(report.players[0].survivors, 1);
        assert_eq!(report.winner, None);
    }

    #[test]
    fn test_pickup_effects() {
        assert!(PickupKind::RepairKit.effect().is_none());
        let effect = PickupKind::Afterburner.effect().unwrap();
        assert_eq!(effect.source, EffectSource::Pickup(PickupKind::Afterburner));
        assert_eq!(effect.remaining_ms, 6000.0);
    }

    #[test]
    fn test_random_point_inside_arena() {
        let mut state = arena();
        for _ in 0..100 {
            let p = state.random_point(40.0);
            assert!(p.x >= 40.0 && p.x <= ARENA_WIDTH - 40.0);
            assert!(p.y >= 40.0 && p.y <= ARENA_HEIGHT - 40.0);
        }
    }
}
