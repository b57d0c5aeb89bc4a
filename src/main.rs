//! Bot Arena headless runner
//!
//! Runs one autopilot match and prints the match report as JSON.
//!
//! Usage: `bot-arena [seed] [settings.json]`

use std::process::ExitCode;

use glam::Vec2;

use bot_arena::autopilot::Autopilot;
use bot_arena::consts::*;
use bot_arena::sim::{ArenaState, Catalog, FixedStepper, PlayerId, SimEvent};
use bot_arena::{ConfigurationError, SimSettings};

/// Frame time the runner pretends to render at
const FRAME_MS: f32 = 1000.0 / 30.0;

fn load_settings(path: Option<&str>) -> Result<SimSettings, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ok(SimSettings::from_json(&json)?)
        }
        None => Ok(SimSettings::default()),
    }
}

fn setup(seed: Option<u64>, settings: SimSettings) -> Result<ArenaState, ConfigurationError> {
    let catalog = Catalog::builtin();
    let mut state = match seed {
        Some(seed) => ArenaState::new(settings, catalog, seed)?,
        None => ArenaState::with_entropy(settings, catalog)?,
    };

    let center = state.settings.arena_center();
    let lineup = [
        (PlayerId(1), "striker", Vec2::new(-400.0, -150.0)),
        (PlayerId(1), "guardian", Vec2::new(-400.0, 150.0)),
        (PlayerId(2), "titan", Vec2::new(400.0, -150.0)),
        (PlayerId(2), "phantom", Vec2::new(400.0, 150.0)),
    ];
    for (player, class_id, offset) in lineup {
        state.spawn_bot(player, class_id, &[], center + offset)?;
    }
    Ok(state)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let seed = args.first().map(|s| s.parse::<u64>()).transpose()?;
    let settings = load_settings(args.get(1).map(String::as_str))?;

    let mut state = setup(seed, settings)?;
    log::info!("Bot Arena (headless) starting, seed {}", state.seed);

    let pilot = Autopilot::all();
    let mut stepper = FixedStepper::new();
    // Bounded in case the settings disable the time limit
    let max_frames = (600_000.0 / FRAME_MS) as u32;
    for _ in 0..max_frames {
        if state.is_over() {
            break;
        }
        stepper.advance(&mut state, FRAME_MS, |s| pilot.tick_input(s));
        for event in state.drain_events() {
            match event {
                SimEvent::Death { actor, killer, .. } => {
                    log::info!("t={:.0}ms {:?} destroyed by {:?}", state.now(), actor, killer)
                }
                SimEvent::ComponentDestroyed {
                    actor, component, ..
                } => log::debug!("{:?} lost {}", actor, component.as_str()),
                _ => {}
            }
        }
    }

    let report = state.match_report();
    println!("{}", report.to_json()?);
    log::info!(
        "Finished after {} ticks ({:.1} s sim time at {:.0} Hz)",
        state.time_ticks,
        state.now() / 1000.0,
        1.0 / SIM_DT
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
