//! Render hand-off
//!
//! A [`Snapshot`] is everything an external renderer/HUD needs for one frame.
//! It borrows the level and particles instead of copying them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::combat::Weapon;
use super::level::Level;
use super::state::{Camera, EnemyKind, GameEvent, GamePhase, GameState, Particle, PickupKind};
use super::wave::WavePhase;

/// What an entity view represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player { id: u8 },
    Enemy { kind: EnemyKind, tier: u32 },
    Bullet { hostile: bool, crit: bool },
    Pickup { kind: PickupKind },
}

/// One drawable entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub kind: EntityKind,
    pub pos: Vec2,
    pub radius: f32,
    /// Hit flash (enemies) or invulnerability (players), 0 when idle
    pub flash: f32,
}

/// Per-player HUD stats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerHud {
    pub id: u8,
    pub alive: bool,
    pub health: f32,
    pub health_max: f32,
    pub shield: f32,
    pub shield_max: f32,
    pub weapon: Weapon,
    pub clip: u32,
    pub clip_max: u32,
    pub reserve: u32,
    pub reloading: bool,
    /// 0..1 dash readiness
    pub dash_ready: f32,
    pub score: u64,
    pub shards: u32,
    pub kills: u32,
}

/// Final result handed to the host's persistence once every player is down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub score: u64,
    pub waves_cleared: u32,
    pub wave_reached: u32,
    pub kills: u32,
    pub shards: u32,
    /// Simulated seconds survived
    pub time: f32,
}

impl RunSummary {
    pub fn from_state(state: &GameState) -> Self {
        let players = &state.store.players;
        Self {
            seed: state.seed,
            score: state.total_score(),
            waves_cleared: state.waves.waves_cleared,
            wave_reached: state.waves.wave,
            kills: players.iter().map(|p| p.kills).sum(),
            shards: players.iter().map(|p| p.shards).sum(),
            time: state.time,
        }
    }
}

/// Renderable view of one tick
#[derive(Debug)]
pub struct Snapshot<'a> {
    pub level: &'a Level,
    pub entities: Vec<EntityView>,
    pub particles: &'a [Particle],
    pub hud: Vec<PlayerHud>,
    pub cameras: &'a [Camera],
    pub wave: u32,
    pub wave_phase: WavePhase,
    pub phase: GamePhase,
    pub screen_shake: f32,
    pub events: Vec<GameEvent>,
    pub summary: Option<RunSummary>,
}

impl<'a> Snapshot<'a> {
    pub fn build(state: &'a GameState, events: Vec<GameEvent>) -> Self {
        let store = &state.store;
        let mut entities = Vec::with_capacity(
            store.players.len() + store.enemies.len() + store.bullets.len() + store.pickups.len(),
        );

        entities.extend(store.pickups.iter().map(|p| EntityView {
            kind: EntityKind::Pickup { kind: p.kind },
            pos: p.pos,
            radius: crate::consts::PICKUP_RADIUS,
            flash: 0.0,
        }));
        entities.extend(store.enemies.iter().filter(|e| e.alive).map(|e| EntityView {
            kind: EntityKind::Enemy {
                kind: e.kind,
                tier: e.tier,
            },
            pos: e.pos,
            radius: e.radius,
            flash: e.flash,
        }));
        entities.extend(store.players.iter().filter(|p| p.alive).map(|p| EntityView {
            kind: EntityKind::Player { id: p.id },
            pos: p.pos,
            radius: p.radius,
            flash: p.invuln,
        }));
        entities.extend(store.bullets.iter().map(|b| EntityView {
            kind: EntityKind::Bullet {
                hostile: b.is_hostile(),
                crit: b.crit,
            },
            pos: b.pos,
            radius: b.radius,
            flash: 0.0,
        }));

        let hud = store
            .players
            .iter()
            .map(|p| PlayerHud {
                id: p.id,
                alive: p.alive,
                health: p.vitals.health,
                health_max: p.vitals.health_max,
                shield: p.vitals.shield,
                shield_max: p.vitals.shield_max,
                weapon: p.weapon,
                clip: p.clip,
                clip_max: p.clip_max,
                reserve: p.reserve,
                reloading: p.is_reloading(),
                dash_ready: 1.0 - (p.dash_cooldown / crate::consts::DASH_COOLDOWN).clamp(0.0, 1.0),
                score: p.score,
                shards: p.shards,
                kills: p.kills,
            })
            .collect();

        let shake = if state.settings.effective_screen_shake() {
            state.screen_shake
        } else {
            0.0
        };

        Self {
            level: &state.level,
            entities,
            particles: &state.store.particles.items,
            hud,
            cameras: &state.cameras,
            wave: state.waves.wave,
            wave_phase: state.waves.phase,
            phase: state.phase,
            screen_shake: shake,
            events,
            summary: state.summary.clone(),
        }
    }
}
