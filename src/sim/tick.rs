//! Simulation step
//!
//! One call advances the run by a clamped `dt` through fixed phases:
//! players, enemies, bullets, pickups, particles, cameras, waves, compaction,
//! end-of-run check. No phase is re-entered within a tick.

use glam::Vec2;

use super::collision::CollisionWorld;
use super::combat::{self, FireResult, overlaps};
use super::level::Tile;
use super::snapshot::{RunSummary, Snapshot};
use super::state::{Enemy, EnemyKind, EntityStore, GameEvent, GamePhase, GameState, ParticleTag, Player};
use super::wave::{self, WaveAction};
use crate::approach;
use crate::consts::*;
use crate::random::RandomSource;
use crate::tuning::Tuning;

/// Drones try to hold this distance from their target
const DRONE_RANGE: f32 = 240.0;
/// Enemy velocity blend rate (per second)
const ENEMY_STEER: f32 = 3.0;
/// Push applied to a player on contact damage
const CONTACT_KNOCKBACK: f32 = 220.0;

/// One player's intents for a tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Movement intent, each axis in [-1, 1]
    pub move_axis: Vec2,
    /// Aim target in world units
    pub aim: Vec2,
    pub fire: bool,
    pub dash: bool,
    pub reload: bool,
    /// Aim at the nearest enemy instead of `aim`
    pub auto_aim: bool,
}

/// Input commands for a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickInput {
    /// False while the host window is unfocused; the tick then advances 0
    pub focused: bool,
    /// Indexed by player id - 1
    pub players: [PlayerInput; 2],
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            focused: true,
            players: [PlayerInput::default(); 2],
        }
    }
}

impl TickInput {
    pub fn player(&self, id: u8) -> &PlayerInput {
        let index = (id.max(1) as usize - 1).min(self.players.len() - 1);
        &self.players[index]
    }
}

impl GameState {
    /// Advance one frame and return what to draw
    pub fn step(&mut self, dt: f32, input: &TickInput) -> Snapshot<'_> {
        tick(self, input, dt);
        self.snapshot()
    }

    /// Build a snapshot, draining pending events
    pub fn snapshot(&mut self) -> Snapshot<'_> {
        let events = std::mem::take(&mut self.events);
        Snapshot::build(&*self, events)
    }
}

/// Advance the game state by `dt` seconds (clamped to `MAX_DT`)
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if state.phase == GamePhase::GameOver {
        return;
    }
    let dt = if input.focused && dt.is_finite() {
        dt.min(MAX_DT)
    } else {
        0.0
    };
    if dt <= 0.0 {
        return;
    }

    state.time += dt;
    state.time_ticks += 1;
    state.screen_shake *= 0.9_f32.powf(dt * 60.0);
    if state.screen_shake < 0.01 {
        state.screen_shake = 0.0;
    }

    let GameState {
        rng,
        settings,
        tuning,
        level,
        store,
        waves,
        cameras,
        screen_shake,
        events,
        ..
    } = state;
    let world = CollisionWorld::new(level);

    update_players(store, &world, rng, tuning, input, events, screen_shake, dt);
    update_enemies(store, &world, rng, events, screen_shake, dt);
    combat::update_bullets(store, &world, rng, tuning, events, screen_shake, dt);
    combat::collect_pickups(store, tuning, events);
    store.particles.update(dt);

    let world_size = level.world_size();
    for (camera, player) in cameras.iter_mut().zip(store.players.iter()) {
        if player.alive {
            camera.follow(player.pos, world_size);
        }
    }

    match waves.update(dt, store.live_enemy_count(), settings.coop, &tuning.waves) {
        WaveAction::Spawn { wave, count } => {
            let spawned = wave::spawn_wave(store, rng, &world, wave, count, &tuning.waves);
            events.push(GameEvent::WaveStarted {
                wave,
                count: spawned,
            });
        }
        WaveAction::Cleared { wave } => events.push(GameEvent::WaveCleared { wave }),
        WaveAction::None => {}
    }

    store.compact();

    if !store.any_player_alive() {
        state.phase = GamePhase::GameOver;
        let summary = RunSummary::from_state(state);
        log::info!(
            "Game over: score {}, {} waves cleared, {} kills",
            summary.score,
            summary.waves_cleared,
            summary.kills
        );
        state.events.push(GameEvent::GameOver {
            score: summary.score,
        });
        state.summary = Some(summary);
    }
}

#[allow(clippy::too_many_arguments)]
fn update_players<R: RandomSource + ?Sized>(
    store: &mut EntityStore,
    world: &CollisionWorld<'_>,
    rng: &mut R,
    tuning: &Tuning,
    input: &TickInput,
    events: &mut Vec<GameEvent>,
    shake: &mut f32,
    dt: f32,
) {
    let EntityStore {
        players,
        enemies,
        bullets,
        particles,
        ..
    } = store;

    for player in players.iter_mut() {
        if !player.alive {
            continue;
        }
        let pin = input.player(player.id);

        player.invuln = (player.invuln - dt).max(0.0);
        player.dash_cooldown = (player.dash_cooldown - dt).max(0.0);
        player.fire_cooldown = (player.fire_cooldown - dt).max(0.0);
        player.vitals.regen_shield(dt, tuning.player.shield_regen_rate);

        player.aim = if pin.auto_aim {
            nearest_enemy(enemies, player.pos).unwrap_or(player.aim)
        } else {
            pin.aim
        };

        if pin.reload && combat::start_reload(player) {
            events.push(GameEvent::ReloadStarted { player: player.id });
        }
        if combat::update_reload(player, dt) {
            events.push(GameEvent::ReloadFinished { player: player.id });
        }

        if pin.dash && player.dash_cooldown <= 0.0 && !player.is_dashing() {
            start_dash(player, pin.move_axis);
            particles.burst(rng, player.pos, ParticleTag::Dash, 12, 160.0, 0.35);
            events.push(GameEvent::Dashed { player: player.id });
        }

        let on_hazard = world.tile_at(player.pos.x, player.pos.y) == Some(Tile::Hazard);
        let slow = combat::apply_hazard(
            player,
            on_hazard,
            dt,
            &tuning.player,
            particles,
            events,
            rng,
            shake,
        );
        if !player.alive {
            continue;
        }

        if player.is_dashing() {
            player.vel = player.dash_dir * DASH_SPEED;
            player.dash_timer = (player.dash_timer - dt).max(0.0);
        } else {
            let axis = pin.move_axis.clamp_length_max(1.0);
            let target = axis * PLAYER_SPEED * player.speed_mult * slow;
            player.vel = approach(player.vel, target, PLAYER_ACCEL * dt);
        }
        let moved = world.move_and_slide(player.pos, player.vel, player.radius, dt);
        player.pos = moved.pos;
        player.vel = moved.vel;

        if pin.fire {
            match combat::try_fire(player, rng, bullets) {
                FireResult::Fired { pellets, crit } => events.push(GameEvent::ShotFired {
                    player: player.id,
                    weapon: player.weapon,
                    pellets,
                    crit,
                }),
                FireResult::StartedReload => {
                    events.push(GameEvent::ReloadStarted { player: player.id })
                }
                FireResult::Reloading | FireResult::Cooldown | FireResult::Dry => {}
            }
        }
    }
}

fn start_dash(player: &mut Player, move_axis: Vec2) {
    let dir = if move_axis.length_squared() > 0.0 {
        move_axis.normalize()
    } else {
        (player.aim - player.pos).normalize_or(Vec2::X)
    };
    player.dash_dir = dir;
    player.dash_timer = DASH_DURATION;
    player.dash_cooldown = DASH_COOLDOWN;
    player.invuln = player.invuln.max(DASH_DURATION);
}

fn nearest_enemy(enemies: &[Enemy], from: Vec2) -> Option<Vec2> {
    enemies
        .iter()
        .filter(|e| e.alive)
        .min_by(|a, b| {
            a.pos
                .distance_squared(from)
                .total_cmp(&b.pos.distance_squared(from))
        })
        .map(|e| e.pos)
}

fn nearest_player(players: &[Player], from: Vec2) -> Option<Vec2> {
    players
        .iter()
        .filter(|p| p.alive)
        .min_by(|a, b| {
            a.pos
                .distance_squared(from)
                .total_cmp(&b.pos.distance_squared(from))
        })
        .map(|p| p.pos)
}

/// Steer, move, shoot and apply contact damage for every live enemy
fn update_enemies<R: RandomSource + ?Sized>(
    store: &mut EntityStore,
    world: &CollisionWorld<'_>,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
    shake: &mut f32,
    dt: f32,
) {
    let EntityStore {
        players,
        enemies,
        bullets,
        particles,
        ..
    } = store;

    for enemy in enemies.iter_mut() {
        if !enemy.alive {
            continue;
        }
        enemy.flash = (enemy.flash - dt).max(0.0);

        let Some(target) = nearest_player(players, enemy.pos) else {
            enemy.vel = approach(enemy.vel, Vec2::ZERO, ENEMY_STEER * dt);
            continue;
        };
        let to_target = target - enemy.pos;
        let dist = to_target.length();
        let dir = to_target.normalize_or_zero();

        let desired = match enemy.kind {
            EnemyKind::Runner => dir * enemy.speed,
            EnemyKind::Drone => {
                if dist > DRONE_RANGE + 40.0 {
                    dir * enemy.speed
                } else if dist < DRONE_RANGE - 60.0 {
                    -dir * enemy.speed
                } else {
                    dir.perp() * enemy.strafe * enemy.speed * 0.7
                }
            }
            EnemyKind::Turret => Vec2::ZERO,
        };
        enemy.vel = approach(enemy.vel, desired, ENEMY_STEER * dt);
        if enemy.vel != Vec2::ZERO {
            let moved = world.move_and_slide(enemy.pos, enemy.vel, enemy.radius, dt);
            enemy.pos = moved.pos;
            enemy.vel = moved.vel;
        }

        let stats = enemy.kind.stats();
        if stats.fire_interval > 0.0 {
            enemy.fire_timer -= dt;
            if enemy.fire_timer <= 0.0 {
                if dist <= stats.range && world.line_of_sight(enemy.pos, target) {
                    let muzzle = enemy.pos + dir * (enemy.radius + 4.0);
                    combat::fire_hostile(muzzle, target, enemy.ranged_damage, bullets);
                    enemy.fire_timer = stats.fire_interval;
                } else {
                    // Re-check soon
                    enemy.fire_timer = 0.2;
                }
            }
        }

        for player in players.iter_mut() {
            if !player.alive || player.invuln > 0.0 || player.is_dashing() {
                continue;
            }
            if !overlaps(enemy.pos, enemy.radius + 2.0, player.pos, player.radius) {
                continue;
            }
            let push = (player.pos - enemy.pos).normalize_or(Vec2::X) * CONTACT_KNOCKBACK;
            combat::damage_player(
                player,
                enemy.contact_damage,
                CONTACT_INVULN,
                particles,
                events,
                rng,
                shake,
            );
            player.vel += push;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::level::Level;
    use crate::sim::state::Bullet;

    fn open_level(w: usize, h: usize, hazard_at_spawn: bool) -> Level {
        let rows: Vec<String> = (0..h)
            .map(|y| {
                (0..w)
                    .map(|x| {
                        if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                            '#'
                        } else if hazard_at_spawn && x == 1 && y == 1 {
                            '~'
                        } else {
                            '.'
                        }
                    })
                    .collect()
            })
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        Level::from_ascii(&rows)
    }

    /// Open arena split by a full-height wall column at `wall_x`
    fn walled_level(w: usize, h: usize, wall_x: usize) -> Level {
        let rows: Vec<String> = (0..h)
            .map(|y| {
                (0..w)
                    .map(|x| {
                        if x == 0 || y == 0 || x == w - 1 || y == h - 1 || x == wall_x {
                            '#'
                        } else {
                            '.'
                        }
                    })
                    .collect()
            })
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        Level::from_ascii(&rows)
    }

    /// Place one enemy of `kind` 440 px right of the player and report
    /// whether it shot within three seconds
    fn enemy_opens_fire(kind: EnemyKind, level: Level) -> bool {
        let mut tuning = Tuning::default();
        tuning.waves.first_delay = 1.0e6;
        let mut state = GameState::with_level(5, level, Settings::solo(), tuning);
        let pos = state.store.players[0].pos + Vec2::new(440.0, 0.0);
        state.store.spawn_enemy(kind, 1, pos, &mut crate::random::seeded(2));
        for _ in 0..180 {
            tick(&mut state, &TickInput::default(), FRAME_DT);
            if state.store.bullets.iter().any(Bullet::is_hostile) {
                return true;
            }
        }
        false
    }

    /// Solo run in an open arena with waves held off
    fn quiet_state(hazard_at_spawn: bool) -> GameState {
        let mut tuning = Tuning::default();
        tuning.waves.first_delay = 1.0e6;
        GameState::with_level(7, open_level(30, 20, hazard_at_spawn), Settings::solo(), tuning)
    }

    fn fingerprint(state: &GameState) -> String {
        serde_json::to_string(&state.store).unwrap()
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let mut state = GameState::new(1234, Settings::default(), Tuning::default());
        let mut input = TickInput::default();
        input.players[0] = PlayerInput {
            move_axis: Vec2::new(1.0, 0.0),
            aim: Vec2::new(0.0, 0.0),
            fire: true,
            dash: true,
            reload: false,
            auto_aim: false,
        };
        let before = fingerprint(&state);
        tick(&mut state, &input, 0.0);
        assert_eq!(fingerprint(&state), before);
        assert_eq!(state.time, 0.0);
        assert_eq!(state.time_ticks, 0);

        // Unfocused host freezes the sim
        input.focused = false;
        tick(&mut state, &input, FRAME_DT);
        assert_eq!(fingerprint(&state), before);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut state = quiet_state(false);
        tick(&mut state, &TickInput::default(), 5.0);
        assert_eq!(state.time, MAX_DT);
        tick(&mut state, &TickInput::default(), f32::NAN);
        assert_eq!(state.time_ticks, 1);
    }

    #[test]
    fn test_pistol_empties_clip_then_reloads() {
        let mut state = quiet_state(false);
        let p = state.store.players[0].pos;
        let mut input = TickInput::default();
        input.players[0].fire = true;
        input.players[0].aim = p + Vec2::new(300.0, 0.0);

        let mut shots = 0;
        let mut reloaded = false;
        for _ in 0..600 {
            let snapshot = state.step(FRAME_DT, &input);
            let fired_now = snapshot
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::ShotFired { .. }))
                .count();
            if snapshot
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::ReloadStarted { .. }))
            {
                assert_eq!(fired_now, 0);
                reloaded = true;
                break;
            }
            shots += fired_now;
        }
        assert!(reloaded);
        assert_eq!(shots, 12);
        let player = &state.store.players[0];
        assert_eq!(player.clip, 0);
        assert!(player.is_reloading());
    }

    #[test]
    fn test_game_over_produces_summary_once() {
        let mut state = quiet_state(false);
        state.store.players[0].score = 120;
        state.store.players[0].alive = false;
        let snapshot = state.step(FRAME_DT, &TickInput::default());
        assert_eq!(snapshot.phase, GamePhase::GameOver);
        assert!(snapshot.events.iter().any(|e| matches!(e, GameEvent::GameOver { score: 120 })));
        let summary = snapshot.summary.clone().unwrap();
        assert_eq!(summary.score, 120);
        assert_eq!(summary.waves_cleared, 0);

        let time = state.time;
        let snapshot = state.step(FRAME_DT, &TickInput::default());
        assert!(snapshot.events.is_empty());
        assert_eq!(state.time, time);
    }

    #[test]
    fn test_wave_spawns_then_clears() {
        let mut tuning = Tuning::default();
        tuning.waves.first_delay = 0.05;
        let mut state =
            GameState::with_level(3, open_level(40, 30, false), Settings::solo(), tuning);

        let mut started = None;
        for _ in 0..10 {
            let snapshot = state.step(FRAME_DT, &TickInput::default());
            if let Some(GameEvent::WaveStarted { wave, count }) = snapshot
                .events
                .iter()
                .find(|e| matches!(e, GameEvent::WaveStarted { .. }))
            {
                started = Some((*wave, *count));
                break;
            }
        }
        assert_eq!(started, Some((1, 7)));
        assert_eq!(state.store.live_enemy_count(), 7);
        assert!(state.waves.is_active());

        for enemy in &mut state.store.enemies {
            enemy.alive = false;
        }
        let snapshot = state.step(FRAME_DT, &TickInput::default());
        assert!(snapshot.events.contains(&GameEvent::WaveCleared { wave: 1 }));
        assert!(state.store.enemies.is_empty());
        assert_eq!(state.waves.waves_cleared, 1);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = GameState::new(99, Settings::default(), Tuning::default());
        let mut b = GameState::new(99, Settings::default(), Tuning::default());
        let mut input = TickInput::default();
        input.players[0].fire = true;
        input.players[0].move_axis = Vec2::new(0.3, -1.0);
        input.players[1].auto_aim = true;
        input.players[1].fire = true;
        for i in 0..400 {
            input.players[0].aim = a.store.players[0].pos + Vec2::from_angle(i as f32 * 0.05) * 100.0;
            tick(&mut a, &input, FRAME_DT);
            tick(&mut b, &input, FRAME_DT);
        }
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(a.waves.wave, b.waves.wave);
    }

    #[test]
    fn test_hostile_bullet_hits_shield() {
        let mut state = quiet_state(false);
        let pos = state.store.players[0].pos;
        state.store.spawn_bullet(Bullet {
            owner: 0,
            pos,
            vel: Vec2::new(10.0, 0.0),
            radius: HOSTILE_BULLET_RADIUS,
            life: 1.0,
            damage: 8.0,
            pierce: 0,
            hits: Vec::new(),
            crit: false,
        });
        let snapshot = state.step(FRAME_DT, &TickInput::default());
        assert!(snapshot.events.iter().any(|e| matches!(e, GameEvent::PlayerHit { player: 1, .. })));
        let player = &state.store.players[0];
        assert_eq!(player.vitals.shield, 42.0);
        assert_eq!(player.vitals.health, 100.0);
        assert!(state.store.bullets.is_empty());
    }

    #[test]
    fn test_auto_aim_tracks_nearest_enemy() {
        let mut state = quiet_state(false);
        let pos = state.store.players[0].pos;
        let near = pos + Vec2::new(200.0, 120.0);
        let far = pos + Vec2::new(700.0, 300.0);
        state.store.spawn_enemy(EnemyKind::Turret, 1, far, &mut crate::random::seeded(1));
        state.store.spawn_enemy(EnemyKind::Turret, 1, near, &mut crate::random::seeded(2));
        let mut input = TickInput::default();
        input.players[0].auto_aim = true;
        tick(&mut state, &input, FRAME_DT);
        assert_eq!(state.store.players[0].aim, near);
    }

    #[test]
    fn test_dash_moves_fast_and_grants_invuln() {
        let mut state = quiet_state(false);
        let start = state.store.players[0].pos;
        let mut input = TickInput::default();
        input.players[0].dash = true;
        input.players[0].move_axis = Vec2::new(1.0, 0.0);
        tick(&mut state, &input, FRAME_DT);
        let player = &state.store.players[0];
        assert!(player.is_dashing());
        assert!(player.invuln > 0.0);
        assert_eq!(player.dash_cooldown, DASH_COOLDOWN);
        assert!((player.pos.x - (start.x + DASH_SPEED * FRAME_DT)).abs() < 1e-3);

        // Cooldown blocks an immediate second dash
        input.players[0].dash = false;
        for _ in 0..20 {
            tick(&mut state, &input, FRAME_DT);
        }
        input.players[0].dash = true;
        tick(&mut state, &input, FRAME_DT);
        assert!(!state.store.players[0].is_dashing());
    }

    #[test]
    fn test_hazard_chips_player() {
        let mut state = quiet_state(true);
        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), FRAME_DT);
        }
        let player = &state.store.players[0];
        assert_eq!(player.vitals.shield, 45.0);
        assert_eq!(player.vitals.health, 100.0);
    }

    #[test]
    fn test_contact_damage_and_knockback() {
        let mut state = quiet_state(false);
        let pos = state.store.players[0].pos;
        let mut rng = crate::random::seeded(4);
        state
            .store
            .spawn_enemy(EnemyKind::Runner, 1, pos + Vec2::new(20.0, 0.0), &mut rng);
        tick(&mut state, &TickInput::default(), FRAME_DT);
        let player = &state.store.players[0];
        assert!(player.vitals.shield < 50.0);
        assert!(player.invuln > 0.0);
        assert!(player.vel.x < 0.0);
    }

    #[test]
    fn test_turret_and_drone_fire_in_range() {
        assert!(enemy_opens_fire(EnemyKind::Turret, open_level(30, 20, false)));
        assert!(enemy_opens_fire(EnemyKind::Drone, open_level(30, 20, false)));
        assert!(!enemy_opens_fire(EnemyKind::Runner, open_level(30, 20, false)));
    }

    #[test]
    fn test_walls_block_ranged_fire() {
        // Player at x 60, turret at x 500, wall column spans x 320..360
        assert!(!enemy_opens_fire(EnemyKind::Turret, walled_level(30, 20, 8)));
    }

    #[test]
    fn test_camera_clamps_to_level_bounds() {
        let mut tuning = Tuning::default();
        tuning.waves.first_delay = 1.0e6;
        // 3200 x 2000, larger than the default grid
        let mut state = GameState::with_level(1, open_level(80, 50, false), Settings::solo(), tuning);
        state.store.players[0].pos = Vec2::new(3100.0, 1900.0);
        tick(&mut state, &TickInput::default(), FRAME_DT);
        let camera = state.cameras[0];
        assert_eq!(camera.pos, Vec2::new(3200.0, 2000.0) - camera.size);
    }
}
