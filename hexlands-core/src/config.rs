//! Tunable rule constants

use serde::{Deserialize, Serialize};

/// Territory expansion pricing and reach
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Gold cost while a city owns no more than `initial_tiles`
    pub base_cost: u32,
    /// Extra gold per tile owned beyond `initial_tiles`
    pub per_tile_cost: u32,
    pub initial_tiles: u32,
    /// Furthest a claimed tile may be from the city center
    pub max_distance: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            base_cost: 20,
            per_tile_cost: 10,
            initial_tiles: 7,
            max_distance: 2,
        }
    }
}

/// Per-turn city income
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepConfig {
    pub base_food: u32,
    pub base_production: u32,
    pub base_gold: u32,
    /// Most a city draws from one tile deposit per turn
    pub harvest_per_tile: u32,
}

impl Default for UpkeepConfig {
    fn default() -> Self {
        Self {
            base_food: 2,
            base_production: 3,
            base_gold: 2,
            harvest_per_tile: 2,
        }
    }
}

/// Rules configuration for a game engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    pub expansion: ExpansionConfig,
    pub upkeep: UpkeepConfig,
    /// Snapshots kept in each game's autosave ring
    pub autosave_capacity: usize,
    /// Manual save slots per game, numbered from 1
    pub manual_slots: u8,
    /// AI turns slower than these (ms) are reported
    pub ai_warn_ms: u64,
    pub ai_escalate_ms: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            expansion: ExpansionConfig::default(),
            upkeep: UpkeepConfig::default(),
            autosave_capacity: 5,
            manual_slots: 3,
            ai_warn_ms: 2_000,
            ai_escalate_ms: 5_000,
        }
    }
}

impl RulesConfig {
    /// Set expansion pricing
    pub fn with_expansion(mut self, expansion: ExpansionConfig) -> Self {
        self.expansion = expansion;
        self
    }

    /// Set per-turn income
    pub fn with_upkeep(mut self, upkeep: UpkeepConfig) -> Self {
        self.upkeep = upkeep;
        self
    }

    /// Set autosave ring size
    pub fn with_autosave_capacity(mut self, capacity: usize) -> Self {
        self.autosave_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_defaults() {
        let config = RulesConfig::default();
        assert_eq!(config.expansion.base_cost, 20);
        assert_eq!(config.expansion.per_tile_cost, 10);
        assert_eq!(config.expansion.initial_tiles, 7);
        assert_eq!(config.expansion.max_distance, 2);
        assert_eq!(config.autosave_capacity, 5);
        assert_eq!(config.manual_slots, 3);
    }

    #[test]
    fn test_rules_builder() {
        let config = RulesConfig::default().with_autosave_capacity(2);
        assert_eq!(config.autosave_capacity, 2);
    }
}
