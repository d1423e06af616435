//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Variable `dt`, clamped per tick
//! - Seeded RNG only, passed in explicitly
//! - Stable iteration order (insertion order, reverse for removals)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod combat;
pub mod level;
pub mod snapshot;
pub mod state;
pub mod tick;
pub mod wave;

pub use collision::{CollisionWorld, MoveResult};
pub use combat::{DamageOutcome, FireResult, Vitals, Weapon, WeaponStats};
pub use level::{Level, LevelParams, Room, Tile, generate_level};
pub use snapshot::{EntityKind, EntityView, PlayerHud, RunSummary, Snapshot};
pub use state::{
    Bullet, Camera, Enemy, EnemyKind, EntityStore, GameEvent, GamePhase, GameState, Particle,
    ParticleField, ParticleTag, Pickup, PickupKind, Player,
};
pub use tick::{PlayerInput, TickInput, tick};
pub use wave::{WaveAction, WaveDirector, WavePhase};
