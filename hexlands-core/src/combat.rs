//! Damage calculation
//!
//! Combat resolution in `actions` only ever asks a `DamageModel` for a
//! number, so the formula can be tuned without touching the state machine.

/// Exclusive upper bound of the roll passed to a damage model
pub const ROLL_BOUND: u32 = 21;

/// Defence a city puts up against attackers
pub const CITY_DEFENCE: u32 = 6;

/// Pure damage function
pub trait DamageModel: Send + Sync {
    /// Damage dealt by `attack` against `defence`, with `roll` in [0, ROLL_BOUND)
    fn damage(&self, attack: u32, defence: u32, roll: u32) -> u32;
}

/// Default formula
///
/// Base damage is `scale * attack / (attack + defence)`, then the roll
/// spreads it between -10% and +10%. Never less than 1.
#[derive(Clone, Copy, Debug)]
pub struct StandardDamage {
    pub scale: u32,
}

impl Default for StandardDamage {
    fn default() -> Self {
        Self { scale: 20 }
    }
}

impl DamageModel for StandardDamage {
    fn damage(&self, attack: u32, defence: u32, roll: u32) -> u32 {
        let total = (attack + defence).max(1);
        let base = self.scale * attack / total;
        let spread = 90 + roll.min(ROLL_BOUND - 1);
        (base * spread / 100).max(1)
    }
}

/// Fixed damage regardless of stats (handy for scripted scenarios)
#[derive(Clone, Copy, Debug)]
pub struct FlatDamage(pub u32);

impl DamageModel for FlatDamage {
    fn damage(&self, _attack: u32, _defence: u32, _roll: u32) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_damage_bounds() {
        let model = StandardDamage::default();
        // 20 * 6 / 10 = 12, spread 90%..110%
        assert_eq!(model.damage(6, 4, 0), 10);
        assert_eq!(model.damage(6, 4, 10), 12);
        assert_eq!(model.damage(6, 4, 20), 13);
        assert_eq!(model.damage(0, 10, 5), 1);
    }

    #[test]
    fn test_stronger_attack_hits_harder() {
        let model = StandardDamage::default();
        for roll in 0..ROLL_BOUND {
            assert!(model.damage(10, 2, roll) >= model.damage(5, 2, roll));
            assert!(model.damage(5, 2, roll) >= model.damage(5, 7, roll));
        }
    }
}
