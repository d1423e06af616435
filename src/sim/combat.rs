//! Weapons, damage, loot and bullet resolution
//!
//! Damage always goes through [`Vitals::apply_damage`]: shield first, then
//! health, clamped at zero. Enemy deaths are resolved exactly once because
//! only live enemies are ever hit and the kill flips `alive` before any side
//! effect runs.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::CollisionWorld;
use super::state::{
    Bullet, Enemy, EntityStore, GameEvent, ParticleField, ParticleTag, Pickup, PickupKind, Player,
    SMALLEST_ENEMY_RADIUS,
};
use crate::consts::*;
use crate::random::RandomSource;
use crate::rotate;
use crate::tuning::{LootTuning, PlayerTuning, Tuning};

/// Damage multiplier on a critical shot
pub const CRIT_MULTIPLIER: f32 = 1.8;
/// Damage multiplier applied after each pierced enemy
pub const PIERCE_FALLOFF: f32 = 0.75;
/// Velocity kept by a ricocheting bullet
pub const RICOCHET_DAMPING: f32 = 0.6;

/// Player weapons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Weapon {
    #[default]
    Pistol,
    Smg,
    Shotgun,
    Railgun,
}

/// Static per-weapon stats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Seconds between shots
    pub fire_interval: f32,
    /// Total spread cone (radians)
    pub spread: f32,
    /// Damage per pellet
    pub damage: f32,
    pub pellets: u32,
    pub bullet_speed: f32,
    /// Knockback applied to the shooter
    pub recoil: f32,
    pub clip: u32,
    pub reload: f32,
    pub pierce: u32,
    pub bullet_life: f32,
}

const WEAPON_STATS: [WeaponStats; 4] = [
    // Pistol
    WeaponStats {
        fire_interval: 0.22,
        spread: 0.04,
        damage: 12.0,
        pellets: 1,
        bullet_speed: 720.0,
        recoil: 30.0,
        clip: 12,
        reload: 1.1,
        pierce: 0,
        bullet_life: BULLET_LIFE,
    },
    // SMG
    WeaponStats {
        fire_interval: 0.08,
        spread: 0.12,
        damage: 7.0,
        pellets: 1,
        bullet_speed: 780.0,
        recoil: 18.0,
        clip: 32,
        reload: 1.6,
        pierce: 0,
        bullet_life: BULLET_LIFE,
    },
    // Shotgun
    WeaponStats {
        fire_interval: 0.7,
        spread: 0.35,
        damage: 8.0,
        pellets: 7,
        bullet_speed: 640.0,
        recoil: 140.0,
        clip: 6,
        reload: 1.9,
        pierce: 0,
        bullet_life: 0.6,
    },
    // Railgun
    WeaponStats {
        fire_interval: 1.1,
        spread: 0.0,
        damage: 60.0,
        pellets: 1,
        bullet_speed: 1400.0,
        recoil: 220.0,
        clip: 4,
        reload: 2.4,
        pierce: 3,
        bullet_life: 1.2,
    },
];

impl Weapon {
    pub const ALL: [Weapon; 4] = [Weapon::Pistol, Weapon::Smg, Weapon::Shotgun, Weapon::Railgun];

    #[inline]
    pub fn stats(self) -> &'static WeaponStats {
        &WEAPON_STATS[self as usize]
    }

    /// Pistol never runs out of reserve ammo
    pub fn infinite_reserve(self) -> bool {
        self == Weapon::Pistol
    }

    pub fn name(self) -> &'static str {
        match self {
            Weapon::Pistol => "Pistol",
            Weapon::Smg => "SMG",
            Weapon::Shotgun => "Shotgun",
            Weapon::Railgun => "Railgun",
        }
    }
}

/// Health and shield pools
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub health_max: f32,
    pub shield: f32,
    pub shield_max: f32,
    /// Time left before the shield regenerates
    pub shield_delay: f32,
    /// Delay restarted on every hit
    pub regen_delay: f32,
}

/// What a single hit did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub absorbed: f32,
    pub dealt: f32,
    pub killed: bool,
}

impl Vitals {
    pub fn new(health: f32, shield: f32, regen_delay: f32) -> Self {
        Self {
            health,
            health_max: health,
            shield,
            shield_max: shield,
            shield_delay: 0.0,
            regen_delay,
        }
    }

    /// Shield soaks damage first; the remainder reduces health (clamped at 0)
    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        let amount = amount.max(0.0);
        let absorbed = self.shield.min(amount);
        self.shield -= absorbed;
        self.shield_delay = self.regen_delay;
        let dealt = amount - absorbed;
        self.health = (self.health - dealt).max(0.0);
        DamageOutcome {
            absorbed,
            dealt,
            killed: self.health <= 0.0,
        }
    }

    /// Count down the regen delay, then refill at `rate` per second
    pub fn regen_shield(&mut self, dt: f32, rate: f32) {
        if self.shield_delay > 0.0 {
            self.shield_delay = (self.shield_delay - dt).max(0.0);
            return;
        }
        self.shield = (self.shield + rate * dt).min(self.shield_max);
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).min(self.health_max);
    }

    pub fn recharge(&mut self, amount: f32) {
        self.shield = (self.shield + amount).min(self.shield_max);
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

/// Result of a fire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireResult {
    Fired { pellets: u32, crit: bool },
    Reloading,
    Cooldown,
    /// Clip was empty; a reload started instead
    StartedReload,
    /// Clip and reserve are both empty
    Dry,
}

/// Begin reloading if the clip is not full and there is ammo to load
pub fn start_reload(player: &mut Player) -> bool {
    if player.is_reloading() || player.clip >= player.clip_max {
        return false;
    }
    if player.reserve == 0 && !player.weapon.infinite_reserve() {
        return false;
    }
    player.reload_timer = player.weapon.stats().reload;
    log::debug!("P{} reloading {}", player.id, player.weapon.name());
    true
}

/// Advance a running reload; returns true on the tick it completes
pub fn update_reload(player: &mut Player, dt: f32) -> bool {
    if !player.is_reloading() {
        return false;
    }
    player.reload_timer = (player.reload_timer - dt).max(0.0);
    if player.reload_timer > 0.0 {
        return false;
    }
    let needed = player.clip_max - player.clip;
    let loaded = if player.weapon.infinite_reserve() {
        needed
    } else {
        needed.min(player.reserve)
    };
    if !player.weapon.infinite_reserve() {
        player.reserve -= loaded;
    }
    player.clip += loaded;
    true
}

/// Switch weapon with a full clip
pub fn equip(player: &mut Player, weapon: Weapon, reserve: u32) {
    let stats = weapon.stats();
    player.weapon = weapon;
    player.clip_max = stats.clip;
    player.clip = stats.clip;
    player.reserve = reserve;
    player.reload_timer = 0.0;
    player.fire_cooldown = 0.0;
}

/// Fire the player's weapon toward `player.aim`
pub fn try_fire<R: RandomSource + ?Sized>(
    player: &mut Player,
    rng: &mut R,
    bullets: &mut Vec<Bullet>,
) -> FireResult {
    if player.is_reloading() {
        return FireResult::Reloading;
    }
    if player.fire_cooldown > 0.0 {
        return FireResult::Cooldown;
    }
    if player.clip == 0 {
        // Spent special weapons fall back to the pistol
        if player.reserve == 0 && !player.weapon.infinite_reserve() {
            equip(player, Weapon::Pistol, 0);
            return FireResult::Dry;
        }
        start_reload(player);
        return FireResult::StartedReload;
    }

    let stats = *player.weapon.stats();
    let dir = (player.aim - player.pos).normalize_or(Vec2::X);
    let crit = rng.chance(player.crit_chance);
    let damage = stats.damage * player.damage_mult * if crit { CRIT_MULTIPLIER } else { 1.0 };

    for _ in 0..stats.pellets {
        let offset = if stats.spread > 0.0 {
            rng.range(-stats.spread / 2.0, stats.spread / 2.0)
        } else {
            0.0
        };
        let pellet_dir = rotate(dir, offset);
        bullets.push(Bullet {
            owner: player.id,
            pos: player.pos + pellet_dir * (player.radius + 2.0),
            vel: pellet_dir * stats.bullet_speed,
            radius: BULLET_RADIUS,
            life: stats.bullet_life,
            damage,
            pierce: stats.pierce,
            hits: Vec::new(),
            crit,
        });
    }

    player.clip -= 1;
    player.fire_cooldown = stats.fire_interval;
    player.vel -= dir * stats.recoil;
    FireResult::Fired {
        pellets: stats.pellets,
        crit,
    }
}

/// Spawn a hostile bullet aimed at `target`
pub fn fire_hostile(from: Vec2, target: Vec2, damage: f32, bullets: &mut Vec<Bullet>) {
    let dir = (target - from).normalize_or(Vec2::X);
    bullets.push(Bullet {
        owner: 0,
        pos: from,
        vel: dir * HOSTILE_BULLET_SPEED,
        radius: HOSTILE_BULLET_RADIUS,
        life: HOSTILE_BULLET_LIFE,
        damage,
        pierce: 0,
        hits: Vec::new(),
        crit: false,
    });
}

/// Mutable context shared by hit/kill resolution
pub struct CombatCtx<'a, R: RandomSource + ?Sized> {
    pub players: &'a mut [Player],
    pub pickups: &'a mut Vec<Pickup>,
    pub particles: &'a mut ParticleField,
    pub events: &'a mut Vec<GameEvent>,
    pub next_id: &'a mut u32,
    pub rng: &'a mut R,
    pub tuning: &'a Tuning,
    pub shake: &'a mut f32,
}

impl<R: RandomSource + ?Sized> CombatCtx<'_, R> {
    fn alloc_id(&mut self) -> u32 {
        let id = *self.next_id;
        *self.next_id += 1;
        id
    }

    /// Live player with the given id
    fn owner(&mut self, owner: u8) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == owner && p.alive)
    }
}

/// Damage a live enemy on behalf of player `owner`; returns true if it died
pub fn hit_enemy<R: RandomSource + ?Sized>(
    enemy: &mut Enemy,
    damage: f32,
    owner: u8,
    ctx: &mut CombatCtx<'_, R>,
) -> bool {
    if !enemy.alive {
        return false;
    }
    let outcome = enemy.vitals.apply_damage(damage);
    enemy.flash = HIT_FLASH;
    ctx.particles
        .burst(&mut *ctx.rng, enemy.pos, ParticleTag::Spark, 4, 120.0, 0.25);

    if outcome.killed {
        kill_enemy(enemy, owner, ctx);
        true
    } else {
        let hit_score = ctx.tuning.loot.hit_score;
        if let Some(player) = ctx.owner(owner) {
            player.score += hit_score;
        }
        false
    }
}

/// Resolve an enemy death: credit, loot, effects. Runs once per enemy.
pub fn kill_enemy<R: RandomSource + ?Sized>(enemy: &mut Enemy, owner: u8, ctx: &mut CombatCtx<'_, R>) {
    if !enemy.alive {
        return;
    }
    enemy.alive = false;
    enemy.vel = Vec2::ZERO;

    let value = enemy.value;
    if let Some(player) = ctx.owner(owner) {
        player.score += value;
        player.kills += 1;
    }
    ctx.events.push(GameEvent::EnemyKilled {
        id: enemy.id,
        kind: enemy.kind,
        by: owner,
    });

    let drops = roll_loot(enemy, ctx);
    ctx.events.push(GameEvent::LootRolled {
        enemy: enemy.id,
        drops,
    });

    ctx.particles
        .burst(&mut *ctx.rng, enemy.pos, ParticleTag::Explosion, 30, 240.0, 0.8);
    *ctx.shake = (*ctx.shake + 4.0).min(22.0);
}

/// One independent roll per loot category. Returns the number of drops.
fn roll_loot<R: RandomSource + ?Sized>(enemy: &Enemy, ctx: &mut CombatCtx<'_, R>) -> u32 {
    let loot: LootTuning = ctx.tuning.loot.clone();
    let mut kinds: Vec<(PickupKind, u32)> = Vec::new();

    if ctx.rng.chance(loot.shard_chance) {
        kinds.push((PickupKind::Shard, ctx.rng.int_between(1, 3) as u32 + enemy.tier - 1));
    }
    if ctx.rng.chance(loot.health_chance) {
        kinds.push((PickupKind::Health, loot.health_amount));
    }
    if ctx.rng.chance(loot.shield_chance) {
        kinds.push((PickupKind::Shield, loot.shield_amount));
    }
    if ctx.rng.chance(loot.weapon_chance) {
        // Never grant the pistol
        let weapon = Weapon::ALL[1 + ctx.rng.below(3) as usize];
        kinds.push((PickupKind::WeaponGrant(weapon), 1));
    }
    if ctx.rng.chance(loot.ammo_chance) {
        kinds.push((PickupKind::Ammo, loot.ammo_amount));
    }

    let count = kinds.len() as u32;
    for (kind, amount) in kinds {
        // Scatter drops so they don't stack on one spot
        let offset = Vec2::from_angle(ctx.rng.angle()) * ctx.rng.range(0.0, enemy.radius);
        let id = ctx.alloc_id();
        ctx.pickups.push(Pickup {
            id,
            kind,
            pos: enemy.pos + offset,
            amount,
        });
    }
    count
}

/// Damage a player; returns true if the hit killed them
pub fn damage_player<R: RandomSource + ?Sized>(
    player: &mut Player,
    amount: f32,
    invuln: f32,
    particles: &mut ParticleField,
    events: &mut Vec<GameEvent>,
    rng: &mut R,
    shake: &mut f32,
) -> bool {
    if !player.alive {
        return false;
    }
    let outcome = player.vitals.apply_damage(amount);
    player.invuln = player.invuln.max(invuln);
    *shake = (*shake + 8.0).min(22.0);
    particles.burst(rng, player.pos, ParticleTag::PlayerHit, 18, 220.0, 0.6);
    events.push(GameEvent::PlayerHit {
        player: player.id,
        damage: outcome.absorbed + outcome.dealt,
    });
    if outcome.killed {
        player.alive = false;
        player.vel = Vec2::ZERO;
        events.push(GameEvent::PlayerDied { player: player.id });
        log::info!("P{} down (score {})", player.id, player.score);
    }
    outcome.killed
}

/// Slow and chip a player standing on a hazard tile
#[allow(clippy::too_many_arguments)]
pub fn apply_hazard<R: RandomSource + ?Sized>(
    player: &mut Player,
    on_hazard: bool,
    dt: f32,
    tuning: &PlayerTuning,
    particles: &mut ParticleField,
    events: &mut Vec<GameEvent>,
    rng: &mut R,
    shake: &mut f32,
) -> f32 {
    if !on_hazard {
        player.hazard_timer = 0.0;
        return 1.0;
    }
    player.hazard_timer += dt;
    if player.hazard_timer >= tuning.hazard_interval {
        player.hazard_timer -= tuning.hazard_interval;
        if player.invuln <= 0.0 {
            damage_player(player, tuning.hazard_damage, 0.0, particles, events, rng, shake);
        }
    }
    tuning.hazard_slow
}

/// Integrate bullets and resolve wall, enemy and player hits.
///
/// Iterates in reverse and `swap_remove`s spent bullets, so removals never
/// disturb the indices still to be visited. Each bullet's path is swept in
/// short sub-steps.
pub fn update_bullets<R: RandomSource + ?Sized>(
    store: &mut EntityStore,
    world: &CollisionWorld<'_>,
    rng: &mut R,
    tuning: &Tuning,
    events: &mut Vec<GameEvent>,
    shake: &mut f32,
    dt: f32,
) {
    let EntityStore {
        players,
        enemies,
        bullets,
        pickups,
        particles,
        next_id,
    } = store;

    for i in (0..bullets.len()).rev() {
        let bullet = &mut bullets[i];
        bullet.life -= dt;
        if bullet.life <= 0.0 {
            bullets.swap_remove(i);
            continue;
        }

        // Sub-step fast bullets so they can't skip a wall tile or an enemy
        let travel = bullet.vel * dt;
        let steps = sweep_steps(travel.length(), bullet.radius);
        let step = travel / steps as f32;
        let mut consumed = false;
        for _ in 0..steps {
            let next = bullet.pos + step;
            if !world.is_walkable(next.x, next.y) {
                if !bullet.is_hostile() && rng.chance(tuning.loot.ricochet_chance) {
                    bullet.vel = -bullet.vel * RICOCHET_DAMPING;
                    bullet.life *= 0.5;
                    particles.burst(rng, bullet.pos, ParticleTag::Spark, 3, 90.0, 0.2);
                    events.push(GameEvent::Ricochet { owner: bullet.owner });
                } else {
                    particles.burst(rng, bullet.pos, ParticleTag::Spark, 5, 110.0, 0.25);
                    consumed = true;
                }
                break;
            }
            bullet.pos = next;

            consumed = if bullet.is_hostile() {
                hit_players(bullet, players, particles, events, rng, shake)
            } else {
                let mut ctx = CombatCtx {
                    players: players.as_mut_slice(),
                    pickups: &mut *pickups,
                    particles: &mut *particles,
                    events: &mut *events,
                    next_id: &mut *next_id,
                    rng: &mut *rng,
                    tuning,
                    shake: &mut *shake,
                };
                resolve_player_bullet(bullet, enemies, &mut ctx)
            };
            if consumed {
                break;
            }
        }

        if consumed {
            bullets.swap_remove(i);
        }
    }
}

/// Sub-steps needed to cover `distance` without skipping a wall tile or the
/// smallest enemy
fn sweep_steps(distance: f32, radius: f32) -> usize {
    let max_step = (TILE_SIZE * 0.5).min(radius + SMALLEST_ENEMY_RADIUS);
    if !distance.is_finite() || max_step <= 0.0 {
        return 1;
    }
    (distance / max_step).ceil().max(1.0) as usize
}

/// Hostile bullet against live players; returns true if it struck one
fn hit_players<R: RandomSource + ?Sized>(
    bullet: &Bullet,
    players: &mut [Player],
    particles: &mut ParticleField,
    events: &mut Vec<GameEvent>,
    rng: &mut R,
    shake: &mut f32,
) -> bool {
    let Some(player) = players
        .iter_mut()
        .find(|p| p.alive && overlaps(bullet.pos, bullet.radius, p.pos, p.radius))
    else {
        return false;
    };
    if player.invuln <= 0.0 && !player.is_dashing() {
        damage_player(player, bullet.damage, HIT_INVULN, particles, events, rng, shake);
    }
    true
}

/// Apply a player bullet to every enemy it touches, honouring pierce.
/// Returns true when the bullet is used up.
pub fn resolve_player_bullet<R: RandomSource + ?Sized>(
    bullet: &mut Bullet,
    enemies: &mut [Enemy],
    ctx: &mut CombatCtx<'_, R>,
) -> bool {
    for enemy in enemies.iter_mut() {
        if !enemy.alive || bullet.hits.contains(&enemy.id) {
            continue;
        }
        if !overlaps(bullet.pos, bullet.radius, enemy.pos, enemy.radius) {
            continue;
        }
        hit_enemy(enemy, bullet.damage, bullet.owner, ctx);
        bullet.hits.push(enemy.id);
        if bullet.pierce == 0 {
            return true;
        }
        bullet.pierce -= 1;
        bullet.damage *= PIERCE_FALLOFF;
    }
    false
}

/// Collect pickups touching live players (reverse iteration, swap-remove)
pub fn collect_pickups(store: &mut EntityStore, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let EntityStore {
        players, pickups, ..
    } = store;

    for i in (0..pickups.len()).rev() {
        let pickup = pickups[i];
        let Some(player) = players
            .iter_mut()
            .find(|p| p.alive && overlaps(p.pos, p.radius, pickup.pos, PICKUP_RADIUS))
        else {
            continue;
        };
        apply_pickup(player, &pickup, &tuning.loot);
        events.push(GameEvent::PickupCollected {
            player: player.id,
            kind: pickup.kind,
        });
        pickups.swap_remove(i);
    }
}

/// Apply a pickup's effect to a player
pub fn apply_pickup(player: &mut Player, pickup: &Pickup, loot: &LootTuning) {
    match pickup.kind {
        PickupKind::Health => player.vitals.heal(pickup.amount as f32),
        PickupKind::Shield => player.vitals.recharge(pickup.amount as f32),
        PickupKind::Ammo => player.reserve += pickup.amount,
        PickupKind::Shard => {
            player.shards += pickup.amount;
            player.score += loot.shard_score * pickup.amount as u64;
        }
        PickupKind::WeaponGrant(weapon) => {
            let reserve = weapon.stats().clip * 3;
            equip(player, weapon, reserve);
        }
    }
}

#[inline]
pub fn overlaps(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) < r * r
}
