//! Wave progression
//!
//! `Waiting -> Spawning -> Active -> Cleared -> Waiting (next wave)`. A wave
//! only clears once every enemy is dead, and nothing spawns while a wave is
//! active.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::CollisionWorld;
use super::level::{Tile, tile_center};
use super::state::{EnemyKind, EntityStore};
use crate::random::RandomSource;
use crate::tuning::WaveTuning;

/// Largest enemy radius; spawn points must fit it
const SPAWN_CLEARANCE_RADIUS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WavePhase {
    /// Countdown before the next wave spawns
    Waiting { timer: f32 },
    /// Enemies are placed this tick
    Spawning,
    /// Enemies alive
    Active,
    /// Short pause after the last kill
    Cleared { timer: f32 },
}

/// What the caller must do after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveAction {
    None,
    /// Spawn `count` enemies for `wave`
    Spawn { wave: u32, count: u32 },
    /// `wave` was just cleared
    Cleared { wave: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveDirector {
    /// Current wave number (1-based)
    pub wave: u32,
    pub phase: WavePhase,
    pub waves_cleared: u32,
}

impl WaveDirector {
    pub fn new(tuning: &WaveTuning) -> Self {
        Self {
            wave: 1,
            phase: WavePhase::Waiting {
                timer: tuning.first_delay,
            },
            waves_cleared: 0,
        }
    }

    /// Advance the state machine by `dt` given the live enemy count
    pub fn update(&mut self, dt: f32, live_enemies: usize, coop: bool, tuning: &WaveTuning) -> WaveAction {
        match self.phase {
            WavePhase::Waiting { timer } => {
                let timer = timer - dt;
                if timer > 0.0 {
                    self.phase = WavePhase::Waiting { timer };
                    return WaveAction::None;
                }
                self.phase = WavePhase::Spawning;
                self.begin_wave(coop, tuning)
            }
            WavePhase::Spawning => self.begin_wave(coop, tuning),
            WavePhase::Active => {
                if live_enemies > 0 {
                    return WaveAction::None;
                }
                self.waves_cleared += 1;
                self.phase = WavePhase::Cleared {
                    timer: tuning.cleared_delay,
                };
                log::info!("Wave {} cleared", self.wave);
                WaveAction::Cleared { wave: self.wave }
            }
            WavePhase::Cleared { timer } => {
                let timer = timer - dt;
                if timer > 0.0 {
                    self.phase = WavePhase::Cleared { timer };
                } else {
                    self.wave += 1;
                    self.phase = WavePhase::Waiting {
                        timer: wait_for_wave(self.wave, tuning),
                    };
                }
                WaveAction::None
            }
        }
    }

    fn begin_wave(&mut self, coop: bool, tuning: &WaveTuning) -> WaveAction {
        let count = wave_size(self.wave, coop, tuning);
        self.phase = WavePhase::Active;
        WaveAction::Spawn {
            wave: self.wave,
            count,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == WavePhase::Active
    }
}

/// Enemies in a wave: floor(base + per_wave * wave), plus a flat coop bonus
pub fn wave_size(wave: u32, coop: bool, tuning: &WaveTuning) -> u32 {
    let base = (tuning.base_count + tuning.count_per_wave * wave as f32).floor() as u32;
    if coop { base + tuning.coop_bonus } else { base }
}

/// Delay before `wave` spawns; grows mildly with the wave number
pub fn wait_for_wave(wave: u32, tuning: &WaveTuning) -> f32 {
    (tuning.base_wait + tuning.wait_per_wave * wave as f32).min(tuning.max_wait)
}

/// Turret odds, zero before the gating wave
pub fn turret_chance(wave: u32, tuning: &WaveTuning) -> f32 {
    if wave < tuning.turret_min_wave {
        return 0.0;
    }
    let extra = (wave - tuning.turret_min_wave) as f32 * tuning.turret_chance_per_wave;
    (tuning.turret_base_chance + extra).min(tuning.turret_max_chance)
}

/// Weighted enemy pick: Turret (gated), then Drone, Runner by default
pub fn roll_kind<R: RandomSource + ?Sized>(rng: &mut R, wave: u32, tuning: &WaveTuning) -> EnemyKind {
    let turret = turret_chance(wave, tuning);
    let roll = rng.next_f32();
    if roll < turret {
        EnemyKind::Turret
    } else if roll < turret + tuning.drone_chance {
        EnemyKind::Drone
    } else {
        EnemyKind::Runner
    }
}

/// Tier starts at 1; one roll per `tier_every` waves can raise it
pub fn roll_tier<R: RandomSource + ?Sized>(rng: &mut R, wave: u32, tuning: &WaveTuning) -> u32 {
    let rolls = wave / tuning.tier_every.max(1);
    let mut tier = 1;
    for _ in 0..rolls {
        if tier >= tuning.max_tier {
            break;
        }
        if rng.chance(tuning.tier_chance) {
            tier += 1;
        }
    }
    tier
}

/// Rejection-sample a walkable, non-hazard tile far enough from `avoid`.
/// Falls back to `fallback` once the budget runs out.
pub fn find_spawn_point<R: RandomSource + ?Sized>(
    rng: &mut R,
    world: &CollisionWorld<'_>,
    avoid: Vec2,
    fallback: Vec2,
    tuning: &WaveTuning,
) -> Vec2 {
    let level = world.level();
    let min_dist_sq = tuning.spawn_clearance * tuning.spawn_clearance;
    for _ in 0..tuning.spawn_attempts {
        let tx = rng.below(level.width as u32) as i32;
        let ty = rng.below(level.height as u32) as i32;
        match level.tile(tx, ty) {
            Some(tile) if tile.is_walkable() && tile != Tile::Hazard => {}
            _ => continue,
        }
        let pos = tile_center(tx, ty);
        if pos.distance_squared(avoid) < min_dist_sq {
            continue;
        }
        if world.collide_circle(pos.x, pos.y, SPAWN_CLEARANCE_RADIUS) {
            continue;
        }
        return pos;
    }
    log::debug!("Spawn search exhausted, using fallback {:?}", fallback);
    fallback
}

/// Populate a wave around the level's player spawn; returns the number of
/// enemies added. Exhausted searches fall back to that same spawn point.
pub fn spawn_wave<R: RandomSource + ?Sized>(
    store: &mut EntityStore,
    rng: &mut R,
    world: &CollisionWorld<'_>,
    wave: u32,
    count: u32,
    tuning: &WaveTuning,
) -> u32 {
    let spawn = world.level().spawn;
    for _ in 0..count {
        let kind = roll_kind(rng, wave, tuning);
        let tier = roll_tier(rng, wave, tuning);
        let pos = find_spawn_point(rng, world, spawn, spawn, tuning);
        store.spawn_enemy(kind, tier, pos, rng);
    }
    log::info!("Wave {}: spawned {} enemies", wave, count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded;
    use crate::sim::level::Level;

    #[test]
    fn test_full_cycle() {
        let tuning = WaveTuning::default();
        let mut director = WaveDirector::new(&tuning);
        assert_eq!(director.update(0.5, 0, false, &tuning), WaveAction::None);
        let action = director.update(0.6, 0, false, &tuning);
        assert_eq!(action, WaveAction::Spawn { wave: 1, count: 7 });
        assert!(director.is_active());

        // Active holds while anything is alive
        for _ in 0..100 {
            assert_eq!(director.update(0.5, 3, false, &tuning), WaveAction::None);
            assert!(director.is_active());
        }
        assert_eq!(director.update(0.0, 0, false, &tuning), WaveAction::Cleared { wave: 1 });
        assert_eq!(director.waves_cleared, 1);

        assert_eq!(director.update(1.5, 0, false, &tuning), WaveAction::None);
        assert_eq!(director.wave, 2);
        assert_eq!(director.phase, WavePhase::Waiting { timer: wait_for_wave(2, &tuning) });
    }

    #[test]
    fn test_never_spawns_while_active() {
        let tuning = WaveTuning::default();
        let mut director = WaveDirector::new(&tuning);
        director.update(2.0, 0, true, &tuning);
        let mut rng = seeded(11);
        for _ in 0..500 {
            let live = rng.below(4) as usize + 1;
            let action = director.update(rng.range(0.0, 0.05), live, true, &tuning);
            assert_eq!(action, WaveAction::None);
        }
    }

    #[test]
    fn test_wave_size_and_waits() {
        let tuning = WaveTuning::default();
        assert_eq!(wave_size(1, false, &tuning), 7);
        assert_eq!(wave_size(5, false, &tuning), 14);
        assert_eq!(wave_size(5, true, &tuning), 17);
        assert!(wait_for_wave(2, &tuning) < wait_for_wave(10, &tuning));
        assert_eq!(wait_for_wave(100, &tuning), tuning.max_wait);
    }

    #[test]
    fn test_no_turrets_before_gate() {
        let tuning = WaveTuning::default();
        let mut rng = seeded(21);
        for _ in 0..500 {
            assert_ne!(roll_kind(&mut rng, 2, &tuning), EnemyKind::Turret);
        }
        assert_eq!(turret_chance(100, &tuning), tuning.turret_max_chance);
    }

    #[test]
    fn test_tier_bounds() {
        let tuning = WaveTuning::default();
        let mut rng = seeded(8);
        for _ in 0..200 {
            assert_eq!(roll_tier(&mut rng, 2, &tuning), 1);
            let tier = roll_tier(&mut rng, 60, &tuning);
            assert!((1..=tuning.max_tier).contains(&tier));
        }
    }

    #[test]
    fn test_spawn_point_respects_clearance() {
        let rows: Vec<String> = (0..20)
            .map(|y| {
                (0..30)
                    .map(|x| if x == 0 || y == 0 || x == 29 || y == 19 { '#' } else { '.' })
                    .collect()
            })
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let level = Level::from_ascii(&rows);
        let world = CollisionWorld::new(&level);
        let tuning = WaveTuning::default();
        let avoid = tile_center(2, 2);
        let fallback = tile_center(27, 17);
        let mut rng = seeded(13);
        for _ in 0..100 {
            let p = find_spawn_point(&mut rng, &world, avoid, fallback, &tuning);
            assert!(p.distance_squared(avoid) >= tuning.spawn_clearance.powi(2));
            assert!(world.is_walkable(p.x, p.y));
        }
    }

    #[test]
    fn test_cramped_level_spawns_on_level_spawn() {
        // Every tile is inside the clearance zone
        let level = Level::from_ascii(&["#######", "#.....#", "#.....#", "#######"]);
        let world = CollisionWorld::new(&level);
        let tuning = WaveTuning::default();
        let mut store = EntityStore::new(0);
        let mut rng = seeded(17);
        assert_eq!(spawn_wave(&mut store, &mut rng, &world, 4, 5, &tuning), 5);
        assert_eq!(store.enemies.len(), 5);
        assert!(store.enemies.iter().all(|e| e.pos == level.spawn));
        assert_ne!(level.spawn, level.exit);
    }

    #[test]
    fn test_spawn_point_fallback() {
        let level = Level::from_ascii(&["#####", "#...#", "#####"]);
        let world = CollisionWorld::new(&level);
        let tuning = WaveTuning::default();
        let avoid = tile_center(2, 1);
        let fallback = tile_center(3, 1);
        let mut rng = seeded(2);
        assert_eq!(find_spawn_point(&mut rng, &world, avoid, fallback, &tuning), fallback);
    }
}
