//! Data-driven game balance
//!
//! Every field has a default, so a tuning file only needs the values it
//! overrides. Weapon and enemy base stats are fixed tables in `sim::combat`
//! and `sim::state`; this covers the knobs that change between builds.

use serde::{Deserialize, Serialize};

use crate::sim::level::LevelParams;

/// Per-player base stats
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub health_max: f32,
    pub shield_max: f32,
    /// Seconds after a hit before the shield starts refilling
    pub shield_regen_delay: f32,
    /// Shield points per second once regenerating
    pub shield_regen_rate: f32,
    pub crit_chance: f32,
    pub damage_mult: f32,
    pub speed_mult: f32,
    /// Speed multiplier while standing on a hazard tile
    pub hazard_slow: f32,
    pub hazard_damage: f32,
    /// Seconds between hazard chips
    pub hazard_interval: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            health_max: 100.0,
            shield_max: 50.0,
            shield_regen_delay: 2.5,
            shield_regen_rate: 15.0,
            crit_chance: 0.08,
            damage_mult: 1.0,
            speed_mult: 1.0,
            hazard_slow: 0.55,
            hazard_damage: 5.0,
            hazard_interval: 0.6,
        }
    }
}

/// Drop chances (one independent roll per category) and amounts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTuning {
    pub shard_chance: f32,
    pub health_chance: f32,
    pub shield_chance: f32,
    pub weapon_chance: f32,
    pub ammo_chance: f32,
    pub health_amount: u32,
    pub shield_amount: u32,
    pub ammo_amount: u32,
    /// Score per collected shard
    pub shard_score: u64,
    /// Score for a hit that does not kill
    pub hit_score: u64,
    /// Chance a player bullet bounces off a wall
    pub ricochet_chance: f32,
}

impl Default for LootTuning {
    fn default() -> Self {
        Self {
            shard_chance: 0.55,
            health_chance: 0.10,
            shield_chance: 0.10,
            weapon_chance: 0.04,
            ammo_chance: 0.15,
            health_amount: 20,
            shield_amount: 25,
            ammo_amount: 24,
            shard_score: 5,
            hit_score: 2,
            ricochet_chance: 0.12,
        }
    }
}

/// Wave pacing and composition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    pub first_delay: f32,
    /// Pause after a wave is cleared
    pub cleared_delay: f32,
    pub base_wait: f32,
    pub wait_per_wave: f32,
    pub max_wait: f32,
    pub base_count: f32,
    pub count_per_wave: f32,
    pub coop_bonus: u32,
    pub drone_chance: f32,
    pub turret_min_wave: u32,
    pub turret_base_chance: f32,
    pub turret_chance_per_wave: f32,
    pub turret_max_chance: f32,
    /// One tier roll per this many waves
    pub tier_every: u32,
    pub tier_chance: f32,
    pub max_tier: u32,
    /// Minimum distance between an enemy spawn and the player spawn
    pub spawn_clearance: f32,
    pub spawn_attempts: u32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            first_delay: 1.0,
            cleared_delay: 1.0,
            base_wait: 1.5,
            wait_per_wave: 0.1,
            max_wait: 4.0,
            base_count: 6.0,
            count_per_wave: 1.6,
            coop_bonus: 3,
            drone_chance: 0.35,
            turret_min_wave: 3,
            turret_base_chance: 0.05,
            turret_chance_per_wave: 0.02,
            turret_max_chance: 0.2,
            tier_every: 3,
            tier_chance: 0.45,
            max_tier: 5,
            spawn_clearance: 420.0,
            spawn_attempts: 60,
        }
    }
}

/// Complete balance set for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub level: LevelParams,
    pub player: PlayerTuning,
    pub loot: LootTuning,
    pub waves: WaveTuning,
}

impl Tuning {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Parse tuning, falling back to defaults on malformed input
    pub fn load_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(tuning) => tuning,
            Err(err) => {
                log::warn!("Invalid tuning, using defaults ({})", err);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let tuning = Tuning::from_json(r#"{"waves": {"coop_bonus": 5}, "level": {"room_attempts": 0}}"#)
            .unwrap();
        assert_eq!(tuning.waves.coop_bonus, 5);
        assert_eq!(tuning.waves.base_count, 6.0);
        assert_eq!(tuning.level.room_attempts, 0);
        assert_eq!(tuning.level.room_margin, 2);
        assert_eq!(tuning.player.health_max, 100.0);
    }

    #[test]
    fn test_malformed_falls_back() {
        let tuning = Tuning::load_or_default("[1, 2");
        assert_eq!(tuning.loot.shard_chance, 0.55);
    }
}
