//! Neon Rift - A co-op top-down arena shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (level generation, combat, waves, game state)
//! - `random`: Injectable random source used by every roll in the simulation
//! - `settings`: Host preferences (coop, particle quality, viewport)
//! - `tuning`: Data-driven game balance

pub mod random;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use random::{RandomSource, SimRng};
pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Reference frame step (60 Hz host)
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Largest step a single tick may advance (prevents tunneling after stalls)
    pub const MAX_DT: f32 = 0.033;

    /// Tile edge length in world units
    pub const TILE_SIZE: f32 = 40.0;
    /// Grid dimensions in tiles (world is 2600 x 1800)
    pub const GRID_WIDTH: usize = 65;
    pub const GRID_HEIGHT: usize = 45;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 16.0;
    pub const PLAYER_SPEED: f32 = 260.0;
    /// Velocity blend rate toward the input target (per second)
    pub const PLAYER_ACCEL: f32 = 12.0;
    pub const DASH_SPEED: f32 = 680.0;
    pub const DASH_DURATION: f32 = 0.18;
    pub const DASH_COOLDOWN: f32 = 1.2;
    /// Invulnerability granted after taking a hit
    pub const HIT_INVULN: f32 = 0.35;
    /// Invulnerability granted after contact damage
    pub const CONTACT_INVULN: f32 = 0.5;

    /// Bullet defaults
    pub const BULLET_RADIUS: f32 = 3.2;
    pub const BULLET_LIFE: f32 = 0.9;
    pub const HOSTILE_BULLET_SPEED: f32 = 380.0;
    pub const HOSTILE_BULLET_RADIUS: f32 = 4.5;
    pub const HOSTILE_BULLET_LIFE: f32 = 2.2;

    /// Pickup collision radius
    pub const PICKUP_RADIUS: f32 = 12.0;
    /// Enemy hit flash duration
    pub const HIT_FLASH: f32 = 0.1;
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Move `current` toward `target` by blend factor `t` in [0, 1]
#[inline]
pub fn approach(current: Vec2, target: Vec2, t: f32) -> Vec2 {
    current.lerp(target, t.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(Vec2::X, std::f32::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-5);
        assert!((v.y - 1.0).abs() < 1e-5);
    }
}
