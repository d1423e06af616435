//! Game state and core simulation types
//!
//! Everything a run owns lives in [`GameState`]; the host holds it and passes
//! it into every tick. There is no global state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::combat::{Vitals, Weapon};
use super::level::{Level, generate_level};
use super::snapshot::RunSummary;
use super::wave::WaveDirector;
use crate::consts::*;
use crate::random::{RandomSource, SimRng, seeded};
use crate::settings::Settings;
use crate::tuning::{PlayerTuning, Tuning};

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Every player is down
    GameOver,
}

/// A player-controlled ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// 1 or 2
    pub id: u8,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub vitals: Vitals,
    pub dash_cooldown: f32,
    /// Time left in the current dash
    pub dash_timer: f32,
    pub dash_dir: Vec2,
    pub invuln: f32,
    pub weapon: Weapon,
    /// Ammo outside the clip (ignored for the pistol)
    pub reserve: u32,
    pub clip: u32,
    pub clip_max: u32,
    pub reload_timer: f32,
    pub fire_cooldown: f32,
    pub score: u64,
    pub shards: u32,
    pub kills: u32,
    pub crit_chance: f32,
    pub damage_mult: f32,
    pub speed_mult: f32,
    /// Aim target in world units
    pub aim: Vec2,
    pub alive: bool,
    /// Time accumulated on a hazard tile
    pub hazard_timer: f32,
}

impl Player {
    pub fn new(id: u8, pos: Vec2, tuning: &PlayerTuning) -> Self {
        let weapon = Weapon::Pistol;
        Self {
            id,
            pos,
            vel: Vec2::ZERO,
            radius: PLAYER_RADIUS,
            vitals: Vitals::new(tuning.health_max, tuning.shield_max, tuning.shield_regen_delay),
            dash_cooldown: 0.0,
            dash_timer: 0.0,
            dash_dir: Vec2::X,
            invuln: 0.0,
            weapon,
            reserve: 0,
            clip: weapon.stats().clip,
            clip_max: weapon.stats().clip,
            reload_timer: 0.0,
            fire_cooldown: 0.0,
            score: 0,
            shards: 0,
            kills: 0,
            crit_chance: tuning.crit_chance,
            damage_mult: tuning.damage_mult,
            speed_mult: tuning.speed_mult,
            aim: pos + Vec2::X,
            alive: true,
            hazard_timer: 0.0,
        }
    }

    #[inline]
    pub fn is_reloading(&self) -> bool {
        self.reload_timer > 0.0
    }

    #[inline]
    pub fn is_dashing(&self) -> bool {
        self.dash_timer > 0.0
    }
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Hovers at range and shoots
    Drone,
    /// Stationary, long-range fire
    Turret,
    /// Fast melee chaser
    Runner,
}

/// Tier-1 base stats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    pub radius: f32,
    pub health: f32,
    pub speed: f32,
    pub contact_damage: f32,
    pub ranged_damage: f32,
    /// Seconds between shots (0 = never fires)
    pub fire_interval: f32,
    pub range: f32,
    pub value: u64,
}

const ENEMY_STATS: [EnemyStats; 3] = [
    // Drone
    EnemyStats {
        radius: 16.0,
        health: 35.0,
        speed: 95.0,
        contact_damage: 12.0,
        ranged_damage: 8.0,
        fire_interval: 1.6,
        range: 420.0,
        value: 25,
    },
    // Turret
    EnemyStats {
        radius: 20.0,
        health: 80.0,
        speed: 0.0,
        contact_damage: 14.0,
        ranged_damage: 14.0,
        fire_interval: 1.2,
        range: 520.0,
        value: 60,
    },
    // Runner
    EnemyStats {
        radius: 14.0,
        health: 22.0,
        speed: 150.0,
        contact_damage: 10.0,
        ranged_damage: 0.0,
        fire_interval: 0.0,
        range: 0.0,
        value: 30,
    },
];

/// Smallest radius in `ENEMY_STATS` (Runner); bounds the bullet sweep step
pub const SMALLEST_ENEMY_RADIUS: f32 = 14.0;

impl EnemyKind {
    pub const ALL: [EnemyKind; 3] = [EnemyKind::Drone, EnemyKind::Turret, EnemyKind::Runner];

    #[inline]
    pub fn stats(self) -> &'static EnemyStats {
        &ENEMY_STATS[self as usize]
    }
}

/// Per-tier scaling of health, damage and speed
pub const TIER_HEALTH_SCALE: f32 = 0.4;
pub const TIER_DAMAGE_SCALE: f32 = 0.25;
pub const TIER_SPEED_SCALE: f32 = 0.08;

/// A hostile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub tier: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub vitals: Vitals,
    pub speed: f32,
    pub contact_damage: f32,
    pub ranged_damage: f32,
    pub fire_timer: f32,
    pub alive: bool,
    /// Hit flash time remaining
    pub flash: f32,
    /// Score awarded for the kill
    pub value: u64,
    /// Orbit direction for drones (+1 or -1)
    pub strafe: f32,
}

impl Enemy {
    pub fn new<R: RandomSource + ?Sized>(
        id: u32,
        kind: EnemyKind,
        tier: u32,
        pos: Vec2,
        rng: &mut R,
    ) -> Self {
        let stats = kind.stats();
        let tier = tier.max(1);
        let step = (tier - 1) as f32;
        let health = stats.health * (1.0 + TIER_HEALTH_SCALE * step);
        let damage_scale = 1.0 + TIER_DAMAGE_SCALE * step;
        Self {
            id,
            kind,
            tier,
            pos,
            vel: Vec2::ZERO,
            radius: stats.radius,
            vitals: Vitals::new(health, 0.0, 0.0),
            speed: stats.speed * (1.0 + TIER_SPEED_SCALE * step) * rng.range(0.9, 1.1),
            contact_damage: stats.contact_damage * damage_scale,
            ranged_damage: stats.ranged_damage * damage_scale,
            // Stagger the first volley
            fire_timer: stats.fire_interval * rng.range(0.5, 1.0),
            alive: true,
            flash: 0.0,
            value: stats.value * tier as u64,
            strafe: if rng.chance(0.5) { 1.0 } else { -1.0 },
        }
    }
}

/// A projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    /// 0 = hostile, otherwise the firing player's id
    pub owner: u8,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Seconds left before despawn
    pub life: f32,
    pub damage: f32,
    /// Additional enemies this bullet may pass through
    pub pierce: u32,
    /// Enemies already hit (never hit twice)
    pub hits: Vec<u32>,
    pub crit: bool,
}

impl Bullet {
    #[inline]
    pub fn is_hostile(&self) -> bool {
        self.owner == 0
    }
}

/// Pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Health,
    Shield,
    Ammo,
    Shard,
    WeaponGrant(Weapon),
}

/// A pickup entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub pos: Vec2,
    pub amount: u32,
}

/// Particle look, resolved to colors by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleTag {
    Spark,
    Explosion,
    PlayerHit,
    Dash,
    Pickup,
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds left
    pub life: f32,
    /// Seconds lived
    pub age: f32,
    pub size: f32,
    pub tag: ParticleTag,
}

/// Capped particle pool (oldest particles are dropped first)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticleField {
    pub items: Vec<Particle>,
    pub cap: usize,
}

impl ParticleField {
    pub fn new(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            cap,
        }
    }

    /// Emit `count` particles in random directions
    pub fn burst<R: RandomSource + ?Sized>(
        &mut self,
        rng: &mut R,
        pos: Vec2,
        tag: ParticleTag,
        count: usize,
        speed: f32,
        life: f32,
    ) {
        if self.cap == 0 {
            return;
        }
        for _ in 0..count {
            if self.items.len() >= self.cap {
                self.items.remove(0);
            }
            let dir = Vec2::from_angle(rng.angle());
            self.items.push(Particle {
                pos,
                vel: dir * rng.range(speed * 0.2, speed),
                life: life * rng.range(0.6, 1.0),
                age: 0.0,
                size: rng.range(1.0, 3.0),
                tag,
            });
        }
    }

    /// Age and drift particles; dead ones are swap-removed in reverse order
    pub fn update(&mut self, dt: f32) {
        let drag = 0.985_f32.powf(dt * 60.0);
        for i in (0..self.items.len()).rev() {
            let p = &mut self.items[i];
            p.age += dt;
            p.life -= dt;
            if p.life <= 0.0 {
                self.items.swap_remove(i);
                continue;
            }
            p.pos += p.vel * dt;
            p.vel *= drag;
            p.size *= 0.992_f32.powf(dt * 60.0);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Notable things that happened during a tick (drained into each snapshot)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    WaveStarted { wave: u32, count: u32 },
    WaveCleared { wave: u32 },
    ShotFired { player: u8, weapon: Weapon, pellets: u32, crit: bool },
    ReloadStarted { player: u8 },
    ReloadFinished { player: u8 },
    Dashed { player: u8 },
    EnemyKilled { id: u32, kind: EnemyKind, by: u8 },
    LootRolled { enemy: u32, drops: u32 },
    PickupCollected { player: u8, kind: PickupKind },
    PlayerHit { player: u8, damage: f32 },
    PlayerDied { player: u8 },
    Ricochet { owner: u8 },
    GameOver { score: u64 },
}

/// Live entity collections for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    pub players: Vec<Player>,
    /// Dead enemies stay until `compact` at the end of the tick
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub pickups: Vec<Pickup>,
    pub particles: ParticleField,
    /// Next entity ID
    pub next_id: u32,
}

impl EntityStore {
    pub fn new(max_particles: usize) -> Self {
        Self {
            players: Vec::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            pickups: Vec::new(),
            particles: ParticleField::new(max_particles),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn_enemy<R: RandomSource + ?Sized>(
        &mut self,
        kind: EnemyKind,
        tier: u32,
        pos: Vec2,
        rng: &mut R,
    ) -> u32 {
        let id = self.next_entity_id();
        self.enemies.push(Enemy::new(id, kind, tier, pos, rng));
        id
    }

    pub fn spawn_bullet(&mut self, bullet: Bullet) {
        self.bullets.push(bullet);
    }

    pub fn spawn_pickup(&mut self, kind: PickupKind, pos: Vec2, amount: u32) -> u32 {
        let id = self.next_entity_id();
        self.pickups.push(Pickup {
            id,
            kind,
            pos,
            amount,
        });
        id
    }

    pub fn live_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.alive).count()
    }

    pub fn any_player_alive(&self) -> bool {
        self.players.iter().any(|p| p.alive)
    }

    pub fn player(&self, id: u8) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Drop dead enemies (their death effects have already run)
    pub fn compact(&mut self) {
        self.enemies.retain(|e| e.alive);
    }
}

/// Per-player view rectangle, clamped to the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Top-left corner in world units
    pub pos: Vec2,
    pub size: Vec2,
}

impl Camera {
    pub fn new(size: Vec2) -> Self {
        Self {
            pos: Vec2::ZERO,
            size,
        }
    }

    /// Center on `target`, keeping the view inside `world`
    pub fn follow(&mut self, target: Vec2, world: Vec2) {
        let max = (world - self.size).max(Vec2::ZERO);
        self.pos = (target - self.size / 2.0).clamp(Vec2::ZERO, max);
    }
}

/// Complete state for one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: SimRng,
    pub settings: Settings,
    pub tuning: Tuning,
    pub level: Level,
    pub store: EntityStore,
    pub waves: WaveDirector,
    /// One camera per player, same order as `store.players`
    pub cameras: Vec<Camera>,
    pub phase: GamePhase,
    /// Simulated seconds
    pub time: f32,
    pub time_ticks: u64,
    pub screen_shake: f32,
    /// Events since the last snapshot
    pub events: Vec<GameEvent>,
    pub summary: Option<RunSummary>,
}

impl GameState {
    /// Start a run: generate the level from `seed` and place the players
    pub fn new(seed: u64, settings: Settings, tuning: Tuning) -> Self {
        let mut rng = seeded(seed);
        let level = generate_level(&mut rng, &tuning.level);
        Self::build(seed, rng, level, settings, tuning)
    }

    /// Start a run on a prebuilt level
    pub fn with_level(seed: u64, level: Level, settings: Settings, tuning: Tuning) -> Self {
        Self::build(seed, seeded(seed), level, settings, tuning)
    }

    fn build(seed: u64, rng: SimRng, level: Level, settings: Settings, tuning: Tuning) -> Self {
        let mut state = Self {
            seed,
            rng,
            store: EntityStore::new(settings.max_particles()),
            waves: WaveDirector::new(&tuning.waves),
            cameras: Vec::new(),
            phase: GamePhase::Playing,
            time: 0.0,
            time_ticks: 0,
            screen_shake: 0.0,
            events: Vec::new(),
            summary: None,
            level,
            settings,
            tuning,
        };
        state.spawn_players();
        log::info!(
            "Run started (seed {}, {} player{})",
            seed,
            state.store.players.len(),
            if state.store.players.len() == 1 { "" } else { "s" }
        );
        state
    }

    /// Discard the level and every entity, then start over with `seed`
    pub fn reset(&mut self, seed: u64) {
        *self = Self::new(seed, self.settings.clone(), self.tuning.clone());
    }

    fn spawn_players(&mut self) {
        let spawn = self.level.spawn;
        let count: u8 = if self.settings.coop { 2 } else { 1 };
        let world = super::collision::CollisionWorld::new(&self.level);
        for id in 1..=count {
            let offset = match (count, id) {
                (1, _) => Vec2::ZERO,
                (_, 1) => Vec2::new(-24.0, 0.0),
                _ => Vec2::new(24.0, 0.0),
            };
            let candidate = spawn + offset;
            let pos = if world.collide_circle(candidate.x, candidate.y, PLAYER_RADIUS) {
                spawn
            } else {
                candidate
            };
            self.store.players.push(Player::new(id, pos, &self.tuning.player));
        }
        let view = self.settings.player_viewport();
        let world_size = self.level.world_size();
        self.cameras = self
            .store
            .players
            .iter()
            .map(|p| {
                let mut camera = Camera::new(view);
                camera.follow(p.pos, world_size);
                camera
            })
            .collect();
    }

    /// Final result, available once the run is over
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    pub fn total_score(&self) -> u64 {
        self.store.players.iter().map(|p| p.score).sum()
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }
}
