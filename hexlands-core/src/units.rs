//! Unit type definitions

use serde::{Deserialize, Serialize};

/// Unit type identifier (index into UNIT_TYPES)
pub type UnitTypeId = u8;

/// Static stats for a unit type
#[derive(Clone, Debug, Serialize)]
pub struct UnitDefinition {
    pub code: &'static str,
    pub name: &'static str,
    pub attack: u32,
    pub defence: u32,
    pub range_min: u32,
    pub range_max: u32,
    pub move_points: u32,
    pub health: u32,
    pub is_ranged: bool,
    /// Production cost to spawn
    pub cost: u32,
}

impl UnitDefinition {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        code: &'static str,
        name: &'static str,
        attack: u32,
        defence: u32,
        range: (u32, u32),
        move_points: u32,
        health: u32,
        is_ranged: bool,
        cost: u32,
    ) -> Self {
        Self {
            code,
            name,
            attack,
            defence,
            range_min: range.0,
            range_max: range.1,
            move_points,
            health,
            is_ranged,
            cost,
        }
    }

    /// Whether this unit can strike a target `distance` hexes away
    pub fn covers(&self, distance: u32) -> bool {
        distance >= self.range_min && distance <= self.range_max
    }
}

/// All unit types
pub static UNIT_TYPES: [UnitDefinition; 6] = [
    // Melee
    UnitDefinition::new("WAR", "Warrior", 6, 4, (1, 1), 2, 20, false, 10),
    UnitDefinition::new("SPR", "Spearman", 5, 7, (1, 1), 2, 24, false, 14),
    UnitDefinition::new("HRS", "Horseman", 7, 4, (1, 1), 4, 22, false, 20),
    UnitDefinition::new("SCT", "Scout", 2, 2, (1, 1), 5, 10, false, 6),
    // Ranged
    UnitDefinition::new("ARC", "Archer", 5, 3, (2, 2), 2, 16, true, 14),
    UnitDefinition::new("CAT", "Catapult", 10, 2, (2, 3), 1, 18, true, 28),
];

/// Get unit type index from its code
pub fn unit_code_to_index(code: &str) -> Option<UnitTypeId> {
    UNIT_TYPES.iter().position(|ut| ut.code == code).map(|i| i as u8)
}

/// Get unit definition from index
pub fn get_unit_type(idx: UnitTypeId) -> &'static UnitDefinition {
    &UNIT_TYPES[idx as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_lookup() {
        assert_eq!(unit_code_to_index("WAR"), Some(0));
        assert_eq!(unit_code_to_index("CAT"), Some(5));
        assert_eq!(unit_code_to_index("XXX"), None);
    }

    #[test]
    fn test_ranged_flags() {
        for ut in &UNIT_TYPES {
            assert!(ut.range_min <= ut.range_max, "{} has inverted range", ut.code);
            if ut.is_ranged {
                assert!(ut.range_min >= 2, "{} should not fight adjacent", ut.code);
            } else {
                assert_eq!((ut.range_min, ut.range_max), (1, 1), "{} melee range", ut.code);
            }
        }
    }
}
