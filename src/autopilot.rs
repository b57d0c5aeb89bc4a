//! Autopilot: scripted intents for bots without a pilot
//!
//! Used for headless matches, demos and soak tests. Each bot hunts the
//! nearest visible enemy, keeps the range its weapon likes, fires when
//! ready and pops its ability when an enemy is close. With nobody to fight
//! it goes for the nearest pickup. Reads the arena only, so a match driven
//! by the autopilot replays exactly from its seed.

use std::collections::BTreeSet;

use glam::Vec2;

use crate::consts::*;
use crate::sim::actor::{Bot, PlayerId, Status};
use crate::sim::catalog::WeaponKind;
use crate::sim::state::ArenaState;
use crate::sim::tick::{BotIntent, Command, TickInput};

/// Range each weapon tries to fight at
fn preferred_range(weapon: WeaponKind) -> f32 {
    match weapon {
        WeaponKind::Standard => 160.0,
        WeaponKind::Heavy => 60.0,
        WeaponKind::MultiShot { .. } => 120.0,
        WeaponKind::Sniper => 380.0,
        WeaponKind::Laser => 300.0,
    }
}

/// Distance within which ranged fire is worth the cooldown
const FIRE_RANGE: f32 = 600.0;
/// Enemies this close trigger the class ability
const ABILITY_RANGE: f32 = 250.0;

#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    /// Players to drive; `None` drives everyone
    players: Option<BTreeSet<PlayerId>>,
}

impl Autopilot {
    /// Drive every bot in the arena
    pub fn all() -> Self {
        Self { players: None }
    }

    /// Drive only the given players' bots
    pub fn for_players(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            players: Some(players.into_iter().collect()),
        }
    }

    pub fn controls(&self, player: PlayerId) -> bool {
        self.players.as_ref().is_none_or(|p| p.contains(&player))
    }

    /// Intents for the next tick, in bot id order
    pub fn intents(&self, state: &ArenaState) -> Vec<BotIntent> {
        let now = state.now();
        let mut intents = Vec::new();

        for bot in state.actors.iter().filter(|b| b.is_alive() && self.controls(b.player)) {
            let Some(enemy) = nearest_enemy(state, bot) else {
                if let Some(pickup) = state
                    .pickups
                    .iter()
                    .min_by(|a, b| a.pos.distance(bot.pos).total_cmp(&b.pos.distance(bot.pos)))
                {
                    intents.push(BotIntent::new(
                        bot.id,
                        Command::MoveTo {
                            x: pickup.pos.x,
                            y: pickup.pos.y,
                        },
                    ));
                }
                continue;
            };

            let to_enemy = enemy.pos - bot.pos;
            let distance = to_enemy.length();
            let reach = bot.radius + enemy.radius + MELEE_REACH;

            // Hold the preferred range, strafing a little so duels don't lock up
            let time_factor = state.time_ticks as f32 * 0.02 + bot.id.0 as f32;
            let strafe = Vec2::new(-to_enemy.y, to_enemy.x).normalize_or_zero() * (time_factor.sin() * 40.0);
            let standoff = preferred_range(bot.weapon).max(reach * 0.5);
            let goal = enemy.pos - to_enemy.normalize_or_zero() * standoff + strafe;
            intents.push(BotIntent::new(bot.id, Command::MoveTo { x: goal.x, y: goal.y }));

            if distance <= reach && bot.melee_ready(now) && bot.stats().melee_damage > 0.0 {
                intents.push(BotIntent::new(bot.id, Command::MeleeAttack));
            }
            if distance <= FIRE_RANGE && bot.ranged_ready(now) && bot.stats().ranged_damage > 0.0 {
                // Lead the target by its current velocity
                let flight = distance / bot.stats().projectile_speed.max(1.0);
                let aim_at = enemy.pos + enemy.vel * flight;
                intents.push(BotIntent::new(
                    bot.id,
                    Command::RangedAttack {
                        aim_at: Some(aim_at),
                    },
                ));
            }
            if distance <= ABILITY_RANGE && bot.ability_ready(now) {
                intents.push(BotIntent::new(bot.id, Command::ActivateAbility));
            }
        }

        intents
    }

    /// A full tick input (never pauses)
    pub fn tick_input(&self, state: &ArenaState) -> TickInput {
        TickInput {
            intents: self.intents(state),
            pause: false,
        }
    }
}

/// Closest living, visible bot of another player
fn nearest_enemy<'a>(state: &'a ArenaState, bot: &Bot) -> Option<&'a Bot> {
    state
        .actors
        .iter()
        .filter(|other| {
            other.player != bot.player && other.is_alive() && !other.has_status(Status::Cloaked)
        })
        .min_by(|a, b| {
            a.pos
                .distance_squared(bot.pos)
                .total_cmp(&b.pos.distance_squared(bot.pos))
        })
}
