//! Tile-grid collision queries and movement resolution
//!
//! Circles are tested against the grid by sampling their circumference, which
//! is cheap but approximate: obstacles thinner than the sample spacing can be
//! missed. Movement resolves X then Y independently so entities slide along
//! walls instead of stopping dead on diagonal contact.

use glam::Vec2;

use super::level::{Level, Tile};
use crate::consts::TILE_SIZE;

/// Points sampled around a circle's circumference
pub const CIRCLE_SAMPLES: usize = 8;

/// Result of a resolved move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    pub pos: Vec2,
    pub vel: Vec2,
    /// True if either axis was blocked
    pub blocked: bool,
}

/// Read-only collision view over a level
#[derive(Debug, Clone, Copy)]
pub struct CollisionWorld<'a> {
    level: &'a Level,
}

impl<'a> CollisionWorld<'a> {
    pub fn new(level: &'a Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> &'a Level {
        self.level
    }

    /// Tile under a world position (None when out of bounds or not finite)
    pub fn tile_at(&self, x: f32, y: f32) -> Option<Tile> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let tx = (x / TILE_SIZE).floor();
        let ty = (y / TILE_SIZE).floor();
        if tx < 0.0 || ty < 0.0 || tx > i32::MAX as f32 || ty > i32::MAX as f32 {
            return None;
        }
        self.level.tile(tx as i32, ty as i32)
    }

    /// False for walls and anything outside the grid
    pub fn is_walkable(&self, x: f32, y: f32) -> bool {
        self.tile_at(x, y).is_some_and(Tile::is_walkable)
    }

    /// True if any sampled point on the circle's rim is not walkable
    pub fn collide_circle(&self, x: f32, y: f32, radius: f32) -> bool {
        (0..CIRCLE_SAMPLES).any(|i| {
            let angle = i as f32 / CIRCLE_SAMPLES as f32 * std::f32::consts::TAU;
            !self.is_walkable(x + angle.cos() * radius, y + angle.sin() * radius)
        })
    }

    /// Advance `pos` by `vel * dt`, X axis first, then Y.
    ///
    /// A blocked axis keeps its old coordinate and zeroes that velocity
    /// component.
    pub fn move_and_slide(&self, pos: Vec2, vel: Vec2, radius: f32, dt: f32) -> MoveResult {
        let mut pos = pos;
        let mut vel = vel;
        let mut blocked = false;

        let nx = pos.x + vel.x * dt;
        if !self.collide_circle(nx, pos.y, radius) {
            pos.x = nx;
        } else {
            vel.x = 0.0;
            blocked = true;
        }

        let ny = pos.y + vel.y * dt;
        if !self.collide_circle(pos.x, ny, radius) {
            pos.y = ny;
        } else {
            vel.y = 0.0;
            blocked = true;
        }

        MoveResult { pos, vel, blocked }
    }

    /// Walk the segment in half-tile steps; false if any step hits a wall
    pub fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let delta = to - from;
        let steps = (delta.length() / (TILE_SIZE * 0.5)).ceil().max(1.0) as usize;
        (0..=steps).all(|i| {
            let p = from + delta * (i as f32 / steps as f32);
            self.is_walkable(p.x, p.y)
        })
    }
}
