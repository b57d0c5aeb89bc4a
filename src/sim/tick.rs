//! Fixed timestep simulation tick
//!
//! Advances the arena by one step. Within a step every intent, timer and
//! movement update completes before collision; every hit is discovered
//! before any damage is applied; hits apply in discovery order.

use glam::Vec2;

use super::actor::{ActorId, Bot, DamageOutcome, DamageType, Status};
use super::collision::{Aabb, find_beam_target, find_projectile_hit, reflect_velocity, resolve_actor_overlaps};
use super::components::ComponentDamageRouter;
use super::projectile::{HitRequest, LaunchSpec, Projectile, ShotPattern, weapon_shots};
use super::rng::RandomSource;
use super::state::{ArenaState, MatchPhase, Pickup, PickupKind, REPAIR_KIT_HEAL, SimEvent};
use crate::consts::*;
use crate::settings::BoundsPolicy;
use crate::{angle_of, direction_from_angle, normalize_angle};

/// An order for one bot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    MoveTo { x: f32, y: f32 },
    MeleeAttack,
    /// Fire at a point, or straight ahead when `aim_at` is `None`
    RangedAttack { aim_at: Option<Vec2> },
    ActivateAbility,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotIntent {
    pub actor: ActorId,
    pub command: Command,
}

impl BotIntent {
    pub fn new(actor: ActorId, command: Command) -> Self {
        Self { actor, command }
    }
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Applied in order; intents for unknown or dead bots are dropped
    pub intents: Vec<BotIntent>,
    /// Pause toggle
    pub pause: bool,
}

/// A hitscan shot waiting for hit discovery
#[derive(Debug, Clone, Copy)]
struct PendingBeam {
    owner: ActorId,
    origin: Vec2,
    angle: f32,
    range: f32,
    damage: f32,
}

/// Attacks queued by intents, resolved during hit discovery
#[derive(Debug, Default)]
struct PendingAttacks {
    melee: Vec<ActorId>,
    beams: Vec<PendingBeam>,
}

/// Advance the arena by one fixed timestep
pub fn tick(state: &mut ArenaState, input: &TickInput) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            MatchPhase::Active => {
                state.phase = MatchPhase::Paused;
                log::info!("Match paused at tick {}", state.time_ticks);
                return;
            }
            MatchPhase::Paused => {
                state.phase = MatchPhase::Active;
                log::info!("Match resumed at tick {}", state.time_ticks);
            }
            MatchPhase::Ended { .. } => {}
        }
    }

    // Don't tick if paused or over
    if state.phase != MatchPhase::Active {
        return;
    }

    state.time_ticks += 1;
    let now = state.now();
    let dt_ms = state.settings.dt_ms;
    let dt = state.settings.dt_secs();

    let pending = apply_intents(state, &input.intents);

    for i in 0..state.actors.len() {
        if let Some(ability) = state.actors[i].tick(dt_ms, now) {
            let actor = state.actors[i].id;
            state.push_event(SimEvent::AbilityEnded { actor, ability });
        }
    }

    let bounds = state.settings.arena_bounds();
    for bot in &mut state.actors {
        bot.integrate_motion(dt);
        clamp_to_arena(bot.radius, &mut bot.pos, &mut bot.vel, &bounds);
    }
    integrate_projectiles(&mut state.projectiles, dt, dt_ms, &bounds, state.settings.bounds_policy);

    resolve_actor_overlaps(&mut state.actors, &mut state.rng);
    for bot in &mut state.actors {
        clamp_to_arena(bot.radius, &mut bot.pos, &mut bot.vel, &bounds);
    }

    let hits = discover_hits(state, &pending);
    collect_pickups(state);
    apply_hits(state, &hits);
    handle_deaths(state);

    state.projectiles.retain(|p| p.active);
    update_pickups(state);
    state.normalize_order();
    check_match_end(state);
}

/// Apply intents in order, launching projectiles and queuing melee/beam attacks
fn apply_intents(state: &mut ArenaState, intents: &[BotIntent]) -> PendingAttacks {
    let now = state.now();
    let mut pending = PendingAttacks::default();

    for intent in intents {
        let Some(index) = state.actor_index(intent.actor) else {
            log::debug!("Dropping intent for unknown {:?}", intent.actor);
            continue;
        };
        if !state.actors[index].is_alive() {
            continue;
        }

        match intent.command {
            Command::MoveTo { x, y } => state.actors[index].set_move_target(x, y),
            Command::MeleeAttack => {
                if state.actors[index].try_melee(now) {
                    pending.melee.push(intent.actor);
                }
            }
            Command::RangedAttack { aim_at } => {
                let bot = &mut state.actors[index];
                if !bot.try_ranged(now) {
                    continue;
                }
                let mut aim = aim_at
                    .filter(|t| t.is_finite())
                    .map(|target| angle_of(target - bot.pos))
                    .unwrap_or(bot.facing);
                let accuracy = bot.stats().accuracy;
                if accuracy < 1.0 {
                    aim = normalize_angle(
                        aim + state.rng.next_signed() * MAX_AIM_JITTER * (1.0 - accuracy),
                    );
                }

                let (owner, origin, radius) = (bot.id, bot.pos, bot.radius);
                let shots = weapon_shots(
                    bot.weapon,
                    aim,
                    bot.stats().projectile_speed,
                    bot.stats().ranged_damage,
                );
                for shot in shots {
                    match shot {
                        ShotPattern::Projectile {
                            angle,
                            speed,
                            damage,
                            piercing,
                            kind,
                        } => {
                            let id = state.next_projectile_id();
                            let muzzle = origin + direction_from_angle(angle) * radius;
                            state.projectiles.push(Projectile::launch(
                                id,
                                LaunchSpec {
                                    origin: muzzle,
                                    angle,
                                    speed,
                                    damage,
                                    owner,
                                    piercing,
                                    kind,
                                },
                            ));
                            state.push_event(SimEvent::ProjectileFired {
                                projectile: id,
                                owner,
                                kind,
                            });
                        }
                        ShotPattern::Beam {
                            angle,
                            range,
                            damage,
                        } => pending.beams.push(PendingBeam {
                            owner,
                            origin,
                            angle,
                            range,
                            damage,
                        }),
                    }
                }
            }
            Command::ActivateAbility => {
                let bot = &mut state.actors[index];
                if bot.try_activate_ability(now) {
                    let ability = bot.ability_kind();
                    state.push_event(SimEvent::AbilityActivated {
                        actor: intent.actor,
                        ability,
                    });
                }
            }
        }
    }

    pending
}

/// Keep a circle inside the arena, killing velocity into the wall
fn clamp_to_arena(radius: f32, pos: &mut Vec2, vel: &mut Vec2, bounds: &Aabb) {
    let lo = bounds.min + Vec2::splat(radius);
    let hi = (bounds.max - Vec2::splat(radius)).max(lo);
    let clamped = pos.max(lo).min(hi);
    if clamped.x != pos.x {
        vel.x = 0.0;
    }
    if clamped.y != pos.y {
        vel.y = 0.0;
    }
    *pos = clamped;
}

/// Move projectiles, age them and apply the arena bounds policy
pub fn integrate_projectiles(
    projectiles: &mut [Projectile],
    dt: f32,
    dt_ms: f32,
    bounds: &Aabb,
    policy: BoundsPolicy,
) {
    for projectile in projectiles.iter_mut().filter(|p| p.active) {
        projectile.prev_pos = projectile.pos;
        projectile.pos += projectile.vel * dt;
        projectile.tick(dt_ms);

        if bounds.contains(projectile.pos) {
            continue;
        }
        match policy {
            BoundsPolicy::Deactivate => projectile.active = false,
            BoundsPolicy::Clamp => {
                let inside = projectile.pos.clamp(bounds.min, bounds.max);
                if inside.x != projectile.pos.x {
                    projectile.vel.x = 0.0;
                }
                if inside.y != projectile.pos.y {
                    projectile.vel.y = 0.0;
                }
                projectile.pos = inside;
                if projectile.vel == Vec2::ZERO {
                    projectile.active = false;
                }
            }
            BoundsPolicy::Bounce => {
                let inside = projectile.pos.clamp(bounds.min, bounds.max);
                if inside.x != projectile.pos.x {
                    projectile.vel = reflect_velocity(projectile.vel, Vec2::X);
                }
                if inside.y != projectile.pos.y {
                    projectile.vel = reflect_velocity(projectile.vel, Vec2::Y);
                }
                projectile.pos = inside;
            }
        }
    }
}

/// Find every hit this tick, in discovery order: projectiles by id, then
/// melee swings and beams in intent order
fn discover_hits(state: &mut ArenaState, pending: &PendingAttacks) -> Vec<HitRequest> {
    let friendly_fire = state.settings.friendly_fire;
    let roster = &state.roster;
    let hostile = |attacker: ActorId, target: &Bot| {
        target.id != attacker
            && target.is_alive()
            && (friendly_fire || roster.get(&attacker) != Some(&target.player))
    };

    let mut hits = Vec::new();

    for projectile in state.projectiles.iter_mut().filter(|p| p.active) {
        let owner = projectile.owner;
        // A piercing round can pass through several bots in one step
        while let Some(target) =
            find_projectile_hit(projectile, state.actors.iter().filter(|b| hostile(owner, *b)))
        {
            if let Some(hit) = projectile.apply_hit(target) {
                hits.push(hit);
            }
            if !projectile.active {
                break;
            }
        }
    }

    for &attacker_id in &pending.melee {
        let Some(attacker) = state.actor(attacker_id) else {
            continue;
        };
        let target = state
            .actors
            .iter()
            .filter(|b| hostile(attacker_id, *b))
            .map(|b| (b, b.pos.distance(attacker.pos) - b.radius - attacker.radius))
            .filter(|&(_, gap)| gap <= MELEE_REACH)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(b, _)| b);
        if let Some(target) = target {
            let toward_attacker = (attacker.pos - target.pos).normalize_or_zero();
            hits.push(HitRequest {
                attacker: attacker_id,
                target: target.id,
                damage: attacker.stats().melee_damage,
                damage_type: DamageType::Melee,
                position: Some(target.pos + toward_attacker * target.radius),
            });
        }
    }

    let mut beam_events = Vec::new();
    for beam in &pending.beams {
        let found = find_beam_target(
            beam.origin,
            beam.angle,
            beam.range,
            beam.owner,
            state.actors.iter().filter(|b| hostile(beam.owner, *b)),
        );
        let end = match found {
            Some((target, point)) => {
                hits.push(HitRequest {
                    attacker: beam.owner,
                    target,
                    damage: beam.damage,
                    damage_type: DamageType::Beam,
                    position: Some(point),
                });
                point
            }
            None => beam.origin + direction_from_angle(beam.angle) * beam.range,
        };
        beam_events.push(SimEvent::BeamFired {
            owner: beam.owner,
            from: beam.origin,
            to: end,
        });
    }
    for event in beam_events {
        state.push_event(event);
    }

    hits
}

/// Living bots pick up anything they touch; lowest pickup id first
fn collect_pickups(state: &mut ArenaState) {
    let pickup_radius = state.settings.pickup_radius;
    let mut collected = Vec::new();
    state.pickups.retain(|pickup| {
        let collector = state.actors.iter().position(|b| {
            b.is_alive() && b.pos.distance(pickup.pos) <= b.radius + pickup_radius
        });
        match collector {
            Some(index) => {
                collected.push((index, pickup.kind));
                false
            }
            None => true,
        }
    });

    for (index, kind) in collected {
        let bot = &mut state.actors[index];
        match kind {
            PickupKind::RepairKit => {
                bot.heal(REPAIR_KIT_HEAL);
            }
            PickupKind::ShieldCell => bot.shield = bot.max_shield,
            PickupKind::Overclock | PickupKind::Afterburner => {
                if let Some(effect) = kind.effect() {
                    bot.apply_effect(effect);
                }
            }
        }
        let actor = bot.id;
        log::debug!("{:?} collected {:?}", actor, kind);
        state.push_event(SimEvent::PickupCollected { actor, kind });
    }
}

/// Damage phase: route each hit through components, then the bot's pools
fn apply_hits(state: &mut ArenaState, hits: &[HitRequest]) {
    for hit in hits {
        let Some(index) = state.actor_index(hit.target) else {
            continue;
        };
        let target = &mut state.actors[index];
        // Already destroyed by an earlier hit this tick, or protected
        if !target.is_alive() || target.has_status(Status::Invulnerable) {
            continue;
        }

        let report = ComponentDamageRouter::apply_damage(
            &mut target.components,
            target.pos,
            target.facing,
            hit.damage,
            hit.position,
            hit.damage_type,
            &mut state.rng,
        );

        // The hit that breaks a part is mitigated by the stats it broke
        let outcome = target.take_damage(report.actor_damage, hit.damage_type);

        let mut destroyed_events = Vec::new();
        for destroyed in report.destroyed {
            if let Some(penalty) = destroyed.penalty {
                target.apply_component_penalty(penalty);
            }
            destroyed_events.push(SimEvent::ComponentDestroyed {
                actor: hit.target,
                component: destroyed.slot,
                position: destroyed.position,
                effect_tags: destroyed.effect_tags,
            });
        }
        if hit.attacker != hit.target {
            target.last_attacker = Some(hit.attacker);
        }
        let target_player = target.player;
        let position = hit.position.unwrap_or(target.pos);

        for event in destroyed_events {
            state.push_event(event);
        }
        state.push_event(SimEvent::Damage {
            target: hit.target,
            source: hit.attacker,
            amount: outcome.amount(),
            damage_type: hit.damage_type,
            position,
            component: report.hit,
            was_critical: report.was_critical,
        });

        credit_attacker(state, hit.attacker, outcome);
        state.totals_mut(target_player).damage_taken += outcome.amount();
    }
}

/// Record dealt damage and kills for the attacking bot and its player
fn credit_attacker(state: &mut ArenaState, attacker: ActorId, outcome: DamageOutcome) {
    if let Some(bot) = state.actor_mut(attacker) {
        bot.lifetime.damage_dealt += outcome.amount();
        if outcome.is_kill() {
            bot.lifetime.kills += 1;
        }
    }
    if let Some(player) = state.player_of(attacker) {
        let totals = state.totals_mut(player);
        totals.damage_dealt += outcome.amount();
        if outcome.is_kill() {
            totals.kills += 1;
        }
    }
}

/// Cancel abilities of dead bots, announce their deaths and remove them
fn handle_deaths(state: &mut ArenaState) {
    let mut events = Vec::new();
    for bot in state.actors.iter_mut().filter(|b| !b.is_alive()) {
        if bot.deactivate_ability() {
            events.push(SimEvent::AbilityEnded {
                actor: bot.id,
                ability: bot.ability_kind(),
            });
        }
        log::info!(
            "{:?} ({}) destroyed, killer {:?}",
            bot.id,
            bot.class_id,
            bot.last_attacker
        );
        events.push(SimEvent::Death {
            actor: bot.id,
            player: bot.player,
            killer: bot.last_attacker,
        });
    }

    for event in events {
        if let SimEvent::Death { player, .. } = &event {
            let player = *player;
            state.totals_mut(player).deaths += 1;
        }
        state.push_event(event);
    }
    state.actors.retain(|b| b.is_alive());
}

/// Expire old pickups and spawn new ones on the configured interval
fn update_pickups(state: &mut ArenaState) {
    for pickup in &mut state.pickups {
        pickup.ttl_ticks = pickup.ttl_ticks.saturating_sub(1);
    }
    state.pickups.retain(|p| p.ttl_ticks > 0);

    let settings = &state.settings;
    if !settings.pickups_enabled
        || state.pickups.len() >= settings.max_pickups
        || !state.time_ticks.is_multiple_of(settings.pickup_interval_ticks as u64)
    {
        return;
    }

    let ttl_ticks = settings.pickup_lifetime_ticks;
    let kind = PickupKind::ALL[state.rng.next_index(PickupKind::ALL.len())];
    let pos = state.random_point(40.0);
    let id = state.next_pickup_id();
    state.pickups.push(Pickup {
        id,
        kind,
        pos,
        ttl_ticks,
    });
    state.push_event(SimEvent::PickupSpawned {
        pickup: id,
        kind,
        position: pos,
    });
}

/// End the match when one player is left standing or time runs out
fn check_match_end(state: &mut ArenaState) {
    let alive = state.alive_players();
    let winner = if state.player_count() >= 2 && alive.len() <= 1 {
        alive.first().copied()
    } else if state
        .settings
        .time_limit_ms
        .is_some_and(|limit| state.now() >= limit)
    {
        state.match_report().top_player()
    } else {
        return;
    };

    state.phase = MatchPhase::Ended { winner };
    log::info!(
        "Match ended at {:.0} ms, winner {:?}",
        state.now(),
        winner
    );
    state.push_event(SimEvent::MatchEnded { winner });
}

/// Longest frame the stepper will try to catch up on
const MAX_FRAME_MS: f32 = 250.0;

/// Fixed-step driver: turns variable frame times into whole ticks
#[derive(Debug, Clone, Default)]
pub struct FixedStepper {
    accumulator_ms: f32,
}

impl FixedStepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run as many ticks as `frame_ms` covers (at most `MAX_SUBSTEPS`).
    ///
    /// `input` is asked for fresh intents before every tick. Returns the
    /// number of ticks run.
    pub fn advance<F>(&mut self, state: &mut ArenaState, frame_ms: f32, mut input: F) -> u32
    where
        F: FnMut(&ArenaState) -> TickInput,
    {
        let dt_ms = state.settings.dt_ms;
        self.accumulator_ms += frame_ms.clamp(0.0, MAX_FRAME_MS);

        let mut substeps = 0;
        while self.accumulator_ms >= dt_ms && substeps < MAX_SUBSTEPS {
            let tick_input = input(state);
            tick(state, &tick_input);
            self.accumulator_ms -= dt_ms;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator_ms > dt_ms {
            // Too far behind to catch up; drop the backlog
            log::debug!("Dropping {:.1} ms of simulation backlog", self.accumulator_ms - dt_ms);
            self.accumulator_ms = dt_ms;
        }
        substeps
    }
}
