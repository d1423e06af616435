//! Neon Rift headless driver
//!
//! Runs a seeded match with bot input at a fixed 60 Hz step and prints the
//! run summary as JSON. Useful for balance checks and determinism runs.
//!
//! Usage: `neon-rift [seed] [max_seconds] [--solo] [--quality low|medium|high] [--settings FILE] [--tuning FILE]`

use glam::Vec2;

use neon_rift::consts::FRAME_DT;
use neon_rift::sim::{GameEvent, GameState, PlayerInput, TickInput};
use neon_rift::{QualityPreset, Settings, Tuning};

struct Args {
    seed: u64,
    max_seconds: f32,
    solo: bool,
    quality: Option<QualityPreset>,
    settings_path: Option<String>,
    tuning_path: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        seed: 1,
        max_seconds: 300.0,
        solo: false,
        quality: None,
        settings_path: None,
        tuning_path: None,
    };
    let mut positional = 0;
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--solo" => args.solo = true,
            "--quality" => {
                let name = iter.next().unwrap_or_default();
                args.quality = QualityPreset::parse(&name);
                if args.quality.is_none() {
                    log::warn!("Ignoring unknown quality {:?}", name);
                }
            }
            "--settings" => args.settings_path = iter.next(),
            "--tuning" => args.tuning_path = iter.next(),
            _ => {
                match positional {
                    0 => match arg.parse() {
                        Ok(seed) => args.seed = seed,
                        Err(_) => log::warn!("Ignoring invalid seed {:?}", arg),
                    },
                    1 => match arg.parse() {
                        Ok(secs) => args.max_seconds = secs,
                        Err(_) => log::warn!("Ignoring invalid duration {:?}", arg),
                    },
                    _ => log::warn!("Ignoring extra argument {:?}", arg),
                }
                positional += 1;
            }
        }
    }
    args
}

fn read_or_empty(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path, e);
            String::new()
        }
    }
}

/// Kite the nearest enemy: back off when close, close in when far
fn bot_input(state: &GameState, id: u8) -> PlayerInput {
    let Some(player) = state.store.player(id) else {
        return PlayerInput::default();
    };
    let nearest = state
        .store
        .enemies
        .iter()
        .filter(|e| e.alive)
        .min_by(|a, b| {
            a.pos
                .distance_squared(player.pos)
                .total_cmp(&b.pos.distance_squared(player.pos))
        });

    let mut input = PlayerInput {
        auto_aim: true,
        fire: nearest.is_some(),
        ..PlayerInput::default()
    };
    if let Some(enemy) = nearest {
        let to_enemy = enemy.pos - player.pos;
        let dist = to_enemy.length();
        let dir = to_enemy.normalize_or_zero();
        input.move_axis = if dist < 160.0 {
            -dir
        } else if dist > 360.0 {
            dir
        } else {
            dir.perp() * if id == 1 { 1.0 } else { -1.0 }
        };
        input.dash = dist < 60.0;
    } else {
        // Regroup at the spawn room between waves
        let center = state.level.rooms.first().map_or(player.pos, |r| r.world_center());
        let to_center = center - player.pos;
        if to_center.length_squared() > 400.0 {
            input.move_axis = to_center.normalize_or(Vec2::ZERO);
        }
    }
    input
}

fn main() {
    env_logger::init();
    let args = parse_args();

    let mut settings = args
        .settings_path
        .as_deref()
        .map_or_else(Settings::default, |path| Settings::load_or_default(&read_or_empty(path)));
    if args.solo {
        settings.coop = false;
    }
    if let Some(quality) = args.quality {
        settings.quality = quality;
    }
    let tuning = args
        .tuning_path
        .as_deref()
        .map_or_else(Tuning::default, |path| Tuning::load_or_default(&read_or_empty(path)));

    log::info!(
        "Neon Rift headless run starting (seed {}, quality {}, {})",
        args.seed,
        settings.quality.as_str(),
        if settings.coop { "coop" } else { "solo" }
    );
    let mut state = GameState::new(args.seed, settings, tuning);
    let max_ticks = (args.max_seconds / FRAME_DT).ceil() as u64;

    for _ in 0..max_ticks {
        let input = TickInput {
            focused: true,
            players: [bot_input(&state, 1), bot_input(&state, 2)],
        };
        let snapshot = state.step(FRAME_DT, &input);
        for event in &snapshot.events {
            match event {
                GameEvent::WaveStarted { wave, count } => {
                    log::info!("Wave {} started with {} enemies", wave, count)
                }
                GameEvent::PlayerDied { player } => log::info!("P{} died", player),
                _ => {}
            }
        }
        if state.is_over() {
            break;
        }
    }

    if !state.is_over() {
        log::info!("Time limit reached at wave {}", state.waves.wave);
    }
    let summary = state
        .summary()
        .cloned()
        .unwrap_or_else(|| neon_rift::sim::RunSummary::from_state(&state));
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize run summary: {}", e),
    }
}
