//! Procedural dungeon layout
//!
//! Rooms are scattered by rejection sampling, linked to their nearest earlier
//! neighbour with L-shaped corridors, then decorated. A level is generated once
//! per run and never changes afterwards.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{GRID_HEIGHT, GRID_WIDTH, TILE_SIZE};
use crate::random::RandomSource;

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Wall,
    Floor,
    Door,
    /// Cosmetic floor variant
    Decal,
    /// Walkable, slows and chips players standing on it
    Hazard,
}

impl Tile {
    #[inline]
    pub fn is_walkable(self) -> bool {
        self != Tile::Wall
    }
}

/// Axis-aligned room rectangle in tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Room {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Center tile
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Center of the center tile in world units
    pub fn world_center(&self) -> Vec2 {
        let (cx, cy) = self.center();
        tile_center(cx, cy)
    }

    /// True if the rects come closer than `margin` tiles
    pub fn overlaps(&self, other: &Room, margin: i32) -> bool {
        self.x - margin < other.x + other.w
            && self.x + self.w + margin > other.x
            && self.y - margin < other.y + other.h
            && self.y + self.h + margin > other.y
    }

    pub fn contains_tile(&self, tx: i32, ty: i32) -> bool {
        tx >= self.x && tx < self.x + self.w && ty >= self.y && ty < self.y + self.h
    }

    fn center_dist_sq(&self, other: &Room) -> i32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (ax - bx).pow(2) + (ay - by).pow(2)
    }
}

/// World position of a tile's center
#[inline]
pub fn tile_center(tx: i32, ty: i32) -> Vec2 {
    Vec2::new(
        (tx as f32 + 0.5) * TILE_SIZE,
        (ty as f32 + 0.5) * TILE_SIZE,
    )
}

/// Generator knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelParams {
    pub width: usize,
    pub height: usize,
    /// Room placement try budget
    pub room_attempts: u32,
    pub room_min_w: i32,
    pub room_max_w: i32,
    pub room_min_h: i32,
    pub room_max_h: i32,
    /// Minimum gap between rooms in tiles
    pub room_margin: i32,
    pub corridor_width: i32,
    pub door_chance: f32,
    pub decal_chance: f32,
    pub hazard_chance: f32,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            room_attempts: 120,
            room_min_w: 6,
            room_max_w: 14,
            room_min_h: 5,
            room_max_h: 11,
            room_margin: 2,
            corridor_width: 2,
            door_chance: 0.12,
            decal_chance: 0.04,
            hazard_chance: 0.012,
        }
    }
}

/// A generated dungeon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub width: usize,
    pub height: usize,
    /// Row-major tiles
    tiles: Vec<Tile>,
    pub rooms: Vec<Room>,
    /// Player spawn (world units)
    pub spawn: Vec2,
    /// Farthest room center from spawn (world units)
    pub exit: Vec2,
}

impl Level {
    /// All-wall grid with no rooms
    fn solid(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::Wall; width * height],
            rooms: Vec::new(),
            spawn: Vec2::ZERO,
            exit: Vec2::ZERO,
        }
    }

    /// Build a level from an explicit tile layout (rows of equal length)
    ///
    /// `#` is Wall, `+` Door, `~` Hazard, `,` Decal, anything else Floor.
    /// Spawn and exit are the first and last walkable tiles.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut level = Self::solid(width, height);
        for (ty, row) in rows.iter().enumerate() {
            for (tx, ch) in row.chars().enumerate().take(width) {
                let tile = match ch {
                    '#' => Tile::Wall,
                    '+' => Tile::Door,
                    '~' => Tile::Hazard,
                    ',' => Tile::Decal,
                    _ => Tile::Floor,
                };
                level.set(tx as i32, ty as i32, tile);
            }
        }
        let walkable: Vec<(i32, i32)> = (0..height as i32)
            .flat_map(|ty| (0..width as i32).map(move |tx| (tx, ty)))
            .filter(|&(tx, ty)| level.tile(tx, ty).is_some_and(Tile::is_walkable))
            .collect();
        if let (Some(&(sx, sy)), Some(&(ex, ey))) = (walkable.first(), walkable.last()) {
            level.spawn = tile_center(sx, sy);
            level.exit = tile_center(ex, ey);
        }
        level
    }

    #[inline]
    fn index(&self, tx: i32, ty: i32) -> Option<usize> {
        if tx < 0 || ty < 0 || tx as usize >= self.width || ty as usize >= self.height {
            return None;
        }
        Some(ty as usize * self.width + tx as usize)
    }

    /// Tile at tile coordinates (None when out of bounds)
    pub fn tile(&self, tx: i32, ty: i32) -> Option<Tile> {
        self.index(tx, ty).map(|i| self.tiles[i])
    }

    /// Level extent in world units
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.width as f32 * TILE_SIZE, self.height as f32 * TILE_SIZE)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    fn set(&mut self, tx: i32, ty: i32, tile: Tile) {
        if let Some(i) = self.index(tx, ty) {
            self.tiles[i] = tile;
        }
    }

    fn is_floor(&self, tx: i32, ty: i32) -> bool {
        self.tile(tx, ty) == Some(Tile::Floor)
    }

    fn carve_room(&mut self, room: &Room) {
        for ty in room.y..room.y + room.h {
            for tx in room.x..room.x + room.w {
                self.set(tx, ty, Tile::Floor);
            }
        }
    }

    /// Carve a `width`-thick square brush at (tx, ty)
    fn carve_brush(&mut self, tx: i32, ty: i32, width: i32) {
        for dy in 0..width.max(1) {
            for dx in 0..width.max(1) {
                // Never carve the outer border ring
                let (x, y) = (tx + dx, ty + dy);
                if x > 0 && y > 0 && (x as usize) < self.width - 1 && (y as usize) < self.height - 1 {
                    self.set(x, y, Tile::Floor);
                }
            }
        }
    }

    fn carve_h(&mut self, x0: i32, x1: i32, y: i32, width: i32) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.carve_brush(x, y, width);
        }
    }

    fn carve_v(&mut self, y0: i32, y1: i32, x: i32, width: i32) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.carve_brush(x, y, width);
        }
    }

    /// Index of the room containing the given world point
    pub fn room_at(&self, pos: Vec2) -> Option<usize> {
        let tx = (pos.x / TILE_SIZE).floor() as i32;
        let ty = (pos.y / TILE_SIZE).floor() as i32;
        self.rooms.iter().position(|r| r.contains_tile(tx, ty))
    }

    /// Count of tiles of the given kind
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }
}

/// Generate a level. Never fails: with no room placed, a centered fallback
/// room is carved and spawn == exit.
pub fn generate_level<R: RandomSource + ?Sized>(rng: &mut R, params: &LevelParams) -> Level {
    let width = params.width.max(8);
    let height = params.height.max(8);
    let mut level = Level::solid(width, height);

    let rooms = place_rooms(rng, params, width as i32, height as i32);
    let rooms = if rooms.is_empty() {
        let room = fallback_room(width as i32, height as i32);
        log::debug!("Room placement exhausted, using fallback room {:?}", room);
        vec![room]
    } else {
        rooms
    };

    for room in &rooms {
        level.carve_room(room);
    }

    // Greedy nearest-earlier-neighbour links (not an MST)
    for i in 1..rooms.len() {
        let nearest = rooms[..i]
            .iter()
            .min_by_key(|other| rooms[i].center_dist_sq(other))
            .copied();
        if let Some(target) = nearest {
            let (ax, ay) = rooms[i].center();
            let (bx, by) = target.center();
            if rng.chance(0.5) {
                level.carve_h(ax, bx, ay, params.corridor_width);
                level.carve_v(ay, by, bx, params.corridor_width);
            } else {
                level.carve_v(ay, by, ax, params.corridor_width);
                level.carve_h(ax, bx, by, params.corridor_width);
            }
        }
    }

    place_doors(&mut level, rng, params.door_chance);
    decorate(&mut level, rng, params);

    level.spawn = rooms[0].world_center();
    level.exit = rooms
        .iter()
        .map(|r| r.world_center())
        .max_by(|a, b| {
            a.distance_squared(level.spawn)
                .total_cmp(&b.distance_squared(level.spawn))
        })
        .unwrap_or(level.spawn);
    level.rooms = rooms;

    log::info!(
        "Generated {}x{} level: {} rooms, {} doors, {} hazards",
        width,
        height,
        level.rooms.len(),
        level.count(Tile::Door),
        level.count(Tile::Hazard)
    );
    level
}

fn place_rooms<R: RandomSource + ?Sized>(
    rng: &mut R,
    params: &LevelParams,
    width: i32,
    height: i32,
) -> Vec<Room> {
    let mut rooms: Vec<Room> = Vec::new();
    for _ in 0..params.room_attempts {
        let w = rng.int_between(params.room_min_w, params.room_max_w);
        let h = rng.int_between(params.room_min_h, params.room_max_h);
        // Keep a one-tile wall border around the grid
        if w + 2 >= width || h + 2 >= height {
            continue;
        }
        let x = rng.int_between(1, width - w - 1);
        let y = rng.int_between(1, height - h - 1);
        let candidate = Room::new(x, y, w, h);
        if rooms.iter().all(|r| !r.overlaps(&candidate, params.room_margin)) {
            rooms.push(candidate);
        }
    }
    rooms
}

fn fallback_room(width: i32, height: i32) -> Room {
    let w = (width - 2).min(10);
    let h = (height - 2).min(8);
    Room::new((width - w) / 2, (height - h) / 2, w, h)
}

/// Convert walls flanked by floor on exactly one axis into doors
fn place_doors<R: RandomSource + ?Sized>(level: &mut Level, rng: &mut R, chance: f32) {
    let mut doors = Vec::new();
    for ty in 0..level.height as i32 {
        for tx in 0..level.width as i32 {
            if level.tile(tx, ty) != Some(Tile::Wall) {
                continue;
            }
            let horizontal = level.is_floor(tx - 1, ty) && level.is_floor(tx + 1, ty);
            let vertical = level.is_floor(tx, ty - 1) && level.is_floor(tx, ty + 1);
            if horizontal != vertical && rng.chance(chance) {
                doors.push((tx, ty));
            }
        }
    }
    for (tx, ty) in doors {
        level.set(tx, ty, Tile::Door);
    }
}

fn decorate<R: RandomSource + ?Sized>(level: &mut Level, rng: &mut R, params: &LevelParams) {
    for tile in level.tiles.iter_mut() {
        if *tile != Tile::Floor {
            continue;
        }
        if rng.chance(params.decal_chance) {
            *tile = Tile::Decal;
        } else if rng.chance(params.hazard_chance) {
            *tile = Tile::Hazard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded;
    use proptest::prelude::*;

    #[test]
    fn test_default_level_has_rooms() {
        let mut rng = seeded(1);
        let level = generate_level(&mut rng, &LevelParams::default());
        assert!(!level.rooms.is_empty());
        assert_eq!(level.tiles().len(), GRID_WIDTH * GRID_HEIGHT);
        assert_eq!(level.world_size(), Vec2::new(2600.0, 1800.0));
    }

    #[test]
    fn test_zero_budget_uses_fallback_room() {
        let mut rng = seeded(5);
        let params = LevelParams {
            room_attempts: 0,
            ..LevelParams::default()
        };
        let level = generate_level(&mut rng, &params);
        assert_eq!(level.rooms.len(), 1);
        assert_eq!(level.spawn, level.exit);
        let tx = (level.spawn.x / TILE_SIZE) as i32;
        let ty = (level.spawn.y / TILE_SIZE) as i32;
        assert!(level.tile(tx, ty).is_some_and(Tile::is_walkable));
    }

    #[test]
    fn test_border_stays_wall() {
        let mut rng = seeded(77);
        let level = generate_level(&mut rng, &LevelParams::default());
        let (w, h) = (level.width as i32, level.height as i32);
        for tx in 0..w {
            assert_eq!(level.tile(tx, 0), Some(Tile::Wall));
            assert_eq!(level.tile(tx, h - 1), Some(Tile::Wall));
        }
        for ty in 0..h {
            assert_eq!(level.tile(0, ty), Some(Tile::Wall));
            assert_eq!(level.tile(w - 1, ty), Some(Tile::Wall));
        }
    }

    #[test]
    fn test_doors_sit_between_floor_on_one_axis() {
        let params = LevelParams {
            door_chance: 1.0,
            decal_chance: 0.0,
            hazard_chance: 0.0,
            ..LevelParams::default()
        };
        let mut rng = seeded(3);
        let level = generate_level(&mut rng, &params);
        let walk = |x, y| level.tile(x, y).is_some_and(|t: Tile| t == Tile::Floor || t == Tile::Door);
        for ty in 0..level.height as i32 {
            for tx in 0..level.width as i32 {
                if level.tile(tx, ty) == Some(Tile::Door) {
                    let h = walk(tx - 1, ty) && walk(tx + 1, ty);
                    let v = walk(tx, ty - 1) && walk(tx, ty + 1);
                    assert!(h || v, "door at {},{} is not between floors", tx, ty);
                }
            }
        }
    }

    #[test]
    fn test_room_overlap_margin() {
        let a = Room::new(2, 2, 5, 5);
        // Touching gap of 1 tile is inside a 2-tile margin
        assert!(a.overlaps(&Room::new(8, 2, 4, 4), 2));
        // Gap of exactly 2 tiles is allowed
        assert!(!a.overlaps(&Room::new(9, 2, 4, 4), 2));
    }

    #[test]
    fn test_from_ascii() {
        let level = Level::from_ascii(&["#####", "#..~#", "#####"]);
        assert_eq!(level.tile(3, 1), Some(Tile::Hazard));
        assert_eq!(level.spawn, tile_center(1, 1));
        assert_eq!(level.exit, tile_center(3, 1));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_rooms_respect_margin(seed in any::<u64>()) {
            let params = LevelParams::default();
            let mut rng = seeded(seed);
            let level = generate_level(&mut rng, &params);
            for (i, a) in level.rooms.iter().enumerate() {
                for b in &level.rooms[i + 1..] {
                    prop_assert!(!a.overlaps(b, params.room_margin));
                }
            }
        }

        #[test]
        fn prop_spawn_and_exit_in_distinct_walkable_rooms(seed in any::<u64>()) {
            let mut rng = seeded(seed);
            let level = generate_level(&mut rng, &LevelParams::default());
            let walkable = |p: Vec2| {
                level
                    .tile((p.x / TILE_SIZE).floor() as i32, (p.y / TILE_SIZE).floor() as i32)
                    .is_some_and(Tile::is_walkable)
            };
            prop_assert!(walkable(level.spawn));
            prop_assert!(walkable(level.exit));
            if level.rooms.len() >= 2 {
                let spawn_room = level.room_at(level.spawn);
                let exit_room = level.room_at(level.exit);
                prop_assert!(spawn_room.is_some());
                prop_assert!(exit_room.is_some());
                prop_assert_ne!(spawn_room, exit_room);
            }
        }
    }
}
