//! Combat scenarios driven through the public arena API

use glam::Vec2;

use bot_arena::persistence::PlayerProfile;
use bot_arena::sim::{
    ActorId, ArenaState, Bot, BotIntent, Catalog, Command, DamageType, PlayerId, SimEvent, SimRng,
    StatKind, TickInput, resolve_actor_overlaps, tick,
};
use bot_arena::{ConfigurationError, SimSettings};

fn quiet_settings() -> SimSettings {
    SimSettings {
        spawn_invulnerability_ms: 0.0,
        pickups_enabled: false,
        time_limit_ms: None,
        ..Default::default()
    }
}

fn arena(seed: u64) -> ArenaState {
    ArenaState::new(quiet_settings(), Catalog::builtin(), seed).unwrap()
}

fn lone_bot(class_id: &str) -> Bot {
    Bot::from_catalog(ActorId(1), PlayerId(1), &Catalog::builtin(), class_id, &[], Vec2::ZERO)
        .unwrap()
}

#[test]
fn test_titan_armor_reduces_damage() {
    let mut titan = lone_bot("titan");
    assert_eq!(titan.health, 150.0);

    let outcome = titan.take_damage(100.0, DamageType::Ranged);
    assert!((outcome.amount() - 70.0).abs() < 1e-4);
    assert!((titan.health - 80.0).abs() < 1e-4);
    assert!(titan.is_alive());
}

#[test]
fn test_shield_absorbs_before_health() {
    let mut guardian = lone_bot("guardian");
    assert_eq!(guardian.shield, 25.0);

    // 50 * (1 - 0.2) = 40: 25 into the shield, 15 into health
    guardian.take_damage(50.0, DamageType::Melee);
    assert_eq!(guardian.shield, 0.0);
    assert!((guardian.health - 105.0).abs() < 1e-4);
}

#[test]
fn test_overkill_counts_remaining_health_only() {
    let mut striker = lone_bot("striker");
    let outcome = striker.take_damage(1000.0, DamageType::Melee);
    assert!(outcome.is_kill());
    assert!((outcome.amount() - 100.0).abs() < 1e-4);
    assert_eq!(striker.health, 0.0);

    // Dead bots take nothing further
    assert_eq!(striker.take_damage(10.0, DamageType::Melee).amount(), 0.0);
}

#[test]
fn test_cooldowns_gate_actions() {
    let mut striker = lone_bot("striker");
    assert!(striker.try_melee(0.0));
    assert!(!striker.try_melee(400.0));
    assert!(!striker.try_melee(799.0));
    assert!(striker.try_melee(800.0));

    assert!(striker.try_ranged(0.0));
    assert!(!striker.try_ranged(499.0));
    assert!(striker.try_ranged(500.0));
}

#[test]
fn test_ability_restores_stats_exactly() {
    let mut striker = lone_bot("striker");
    let before = *striker.stats();

    assert!(striker.try_activate_ability(0.0));
    assert!(striker.stats().get(StatKind::MeleeDamage) > before.melee_damage);
    assert!(striker.stats().speed > before.speed);
    // Active abilities can't be restarted
    assert!(!striker.try_activate_ability(100.0));

    let dt_ms = 1000.0 / 60.0;
    let mut now = 0.0;
    let mut ended = None;
    for _ in 0..600 {
        now += dt_ms as f64;
        if let Some(kind) = striker.tick(dt_ms, now) {
            ended = Some(kind);
            break;
        }
    }
    assert!(ended.is_some());
    assert_eq!(*striker.stats(), before);

    // Cooldown counts from activation, not from the ability ending
    assert!(!striker.ability_ready(11_999.0));
    assert!(striker.ability_ready(12_000.0));
}

#[test]
fn test_heavier_bot_moves_less_when_separating() {
    let catalog = Catalog::builtin();
    let titan =
        Bot::from_catalog(ActorId(1), PlayerId(1), &catalog, "titan", &[], Vec2::new(500.0, 500.0))
            .unwrap();
    let speedster = Bot::from_catalog(
        ActorId(2),
        PlayerId(2),
        &catalog,
        "speedster",
        &[],
        Vec2::new(520.0, 500.0),
    )
    .unwrap();
    let mut actors = vec![titan, speedster];
    let mut rng = SimRng::new(9);

    assert_eq!(resolve_actor_overlaps(&mut actors, &mut rng), 1);

    let titan_shift = (actors[0].pos - Vec2::new(500.0, 500.0)).length();
    let speedster_shift = (actors[1].pos - Vec2::new(520.0, 500.0)).length();
    assert!(titan_shift < speedster_shift);
    let gap = actors[0].pos.distance(actors[1].pos);
    assert!(gap >= actors[0].radius + actors[1].radius - 1e-3);
}

#[test]
fn test_sniper_round_pierces_each_target_once() {
    let mut state = arena(3);
    let sniper = state
        .spawn_bot(PlayerId(1), "guardian", &[], Vec2::new(200.0, 500.0))
        .unwrap();
    let targets: Vec<ActorId> = [400.0, 480.0, 560.0]
        .into_iter()
        .map(|x| {
            state
                .spawn_bot(PlayerId(2), "striker", &[], Vec2::new(x, 500.0))
                .unwrap()
        })
        .collect();

    let fire = TickInput {
        intents: vec![BotIntent::new(
            sniper,
            Command::RangedAttack {
                aim_at: Some(Vec2::new(900.0, 500.0)),
            },
        )],
        pause: false,
    };
    tick(&mut state, &fire);
    for _ in 0..90 {
        tick(&mut state, &TickInput::default());
    }

    let mut hits = Vec::new();
    for event in state.drain_events() {
        if let SimEvent::Damage {
            target,
            source,
            damage_type,
            ..
        } = event
        {
            assert_eq!(source, sniper);
            assert_eq!(damage_type, DamageType::Ranged);
            hits.push(target);
        }
    }
    assert_eq!(hits, targets);
}

#[test]
fn test_melee_kill_credits_attacker_and_ends_match() {
    let mut state = arena(5);
    let titan = state
        .spawn_bot(PlayerId(1), "titan", &[], Vec2::new(500.0, 500.0))
        .unwrap();
    let victim = state
        .spawn_bot(PlayerId(2), "speedster", &[], Vec2::new(550.0, 500.0))
        .unwrap();
    state.actor_mut(victim).unwrap().health = 1.0;

    tick(
        &mut state,
        &TickInput {
            intents: vec![BotIntent::new(titan, Command::MeleeAttack)],
            pause: false,
        },
    );

    assert!(state.actor(victim).is_none());
    assert!(state.is_over());
    let events = state.drain_events();
    assert!(events.contains(&SimEvent::Death {
        actor: victim,
        player: PlayerId(2),
        killer: Some(titan),
    }));
    assert!(events.contains(&SimEvent::MatchEnded {
        winner: Some(PlayerId(1)),
    }));

    let report = state.match_report();
    assert_eq!(report.winner, Some(PlayerId(1)));
    assert_eq!(report.rank_of(PlayerId(1)), Some(1));
    let winner = report.totals(PlayerId(1)).unwrap();
    assert_eq!(winner.kills, 1);
    assert_eq!(winner.survivors, 1);
    assert_eq!(report.totals(PlayerId(2)).unwrap().deaths, 1);
    assert_eq!(state.actor(titan).unwrap().lifetime.kills, 1);
}

#[test]
fn test_profile_spawn_applies_upgrades() {
    let catalog = Catalog::builtin();
    let mut profile = PlayerProfile::starter(PlayerId(4));
    profile.credits = 1_000;
    assert!(profile.purchase_upgrade(&catalog, "striker", "hull_1"));
    assert!(profile.purchase_upgrade(&catalog, "striker", "hull_2"));

    let mut state = arena(8);
    let id = state
        .spawn_from_profile(&profile, "striker", Vec2::new(400.0, 400.0))
        .unwrap();
    let bot = state.actor(id).unwrap();
    assert_eq!(bot.player, PlayerId(4));
    assert_eq!(bot.max_health, 160.0);
    assert_eq!(bot.health, 160.0);
    assert_eq!(bot.owned_upgrades(), &["hull_1", "hull_2"]);

    let err = state
        .spawn_from_profile(&profile, "phantom", Vec2::new(600.0, 400.0))
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::ClassLocked { player: 4, .. }));
}

#[test]
fn test_catalog_json_errors() {
    let err = Catalog::from_json("{\"classes\": 3}").unwrap_err();
    assert!(matches!(err, ConfigurationError::Parse { what: "catalog", .. }));

    let missing = r#"{
        "classes": [],
        "upgrades": [
            {"id": "a_2", "category": "a", "tier": 2, "modifiers": [], "cost": 10, "prerequisite": "a_1"}
        ]
    }"#;
    let err = Catalog::from_json(missing).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingPrerequisite { .. }));

    let mut state = arena(1);
    let err = state
        .spawn_bot(PlayerId(1), "mystery", &[], Vec2::ZERO)
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::UnknownClass(_)));
    assert!(state.actors.is_empty());
}
