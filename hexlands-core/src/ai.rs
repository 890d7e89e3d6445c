//! Computer opponents

use crate::actions::{spawn_tile, ActionEvent, ActionResolver, Command};
use crate::board::GridPosition;
use crate::config::ExpansionConfig;
use crate::game::{CityId, GameState, ParticipantId, ResourceType, Unit, UnitId};
use crate::pathfind::reachable_tiles;
use crate::territory::{expansion_cost, valid_expansion_tiles};
use crate::units::{UnitTypeId, UNIT_TYPES};

/// Plays one turn for the active participant
///
/// Implementations act through the resolver so every rule still applies.
/// They must be deterministic given the state.
pub trait Opponent: Send + Sync {
    fn play_turn(&self, state: &mut GameState, resolver: &ActionResolver<'_>, now_ms: i64) -> Vec<ActionEvent>;
}

/// Opponent that never acts
#[derive(Clone, Copy, Debug, Default)]
pub struct PassiveOpponent;

impl Opponent for PassiveOpponent {
    fn play_turn(&self, _state: &mut GameState, _resolver: &ActionResolver<'_>, _now_ms: i64) -> Vec<ActionEvent> {
        Vec::new()
    }
}

// ============================================================================
// GREEDY OPPONENT
// ============================================================================

/// One-ply greedy opponent
///
/// Units (in id order) hit the weakest thing in range, else close in on the
/// nearest enemy. Cities then buy the priciest unit they can afford and
/// claim territory with the gold left over.
#[derive(Clone, Debug, Default)]
pub struct GreedyOpponent {
    pub expansion: ExpansionConfig,
}

impl GreedyOpponent {
    pub fn new(expansion: ExpansionConfig) -> Self {
        Self { expansion }
    }
}

impl Opponent for GreedyOpponent {
    fn play_turn(&self, state: &mut GameState, resolver: &ActionResolver<'_>, now_ms: i64) -> Vec<ActionEvent> {
        let me = state.active_participant;
        let mut events = Vec::new();

        let mut unit_ids: Vec<UnitId> = state.units_of(me).map(|u| u.id).collect();
        unit_ids.sort_unstable();
        for unit_id in unit_ids {
            if !state.is_active() {
                return events;
            }
            // May have died to a counterattack earlier this turn
            let Ok(unit) = state.unit(unit_id) else {
                continue;
            };
            if unit.has_acted {
                continue;
            }
            let command = choose_attack(state, unit).or_else(|| choose_advance(state, unit));
            if let Some(command) = command {
                if let Ok(event) = resolver.resolve(state, me, &command, now_ms) {
                    events.push(event);
                }
            }
        }

        let mut city_ids: Vec<CityId> = state.cities_of(me).map(|c| c.id).collect();
        city_ids.sort_unstable();
        for city_id in city_ids {
            if !state.is_active() {
                break;
            }
            for command in self.city_orders(state, me, city_id) {
                if let Ok(event) = resolver.resolve(state, me, &command, now_ms) {
                    events.push(event);
                }
            }
        }

        events
    }
}

impl GreedyOpponent {
    fn city_orders(&self, state: &GameState, me: ParticipantId, city_id: CityId) -> Vec<Command> {
        let mut orders = Vec::new();
        let Ok(city) = state.city(city_id) else {
            return orders;
        };
        if city.participant_id != me {
            return orders;
        }

        let production = city.resource(ResourceType::Production);
        if let Some(type_id) = priciest_affordable(production) {
            if matches!(spawn_tile(state, city_id), Ok(Some(_))) {
                orders.push(Command::SpawnUnit {
                    city_id,
                    unit_code: UNIT_TYPES[type_id as usize].code.to_string(),
                });
            }
        }

        let cost = expansion_cost(&self.expansion, city.tiles.len() as u32);
        if city.resource(ResourceType::Gold) >= cost {
            let candidates = valid_expansion_tiles(state, city, &self.expansion);
            let rich = candidates
                .iter()
                .find(|pos| state.map.tile(**pos).is_some_and(|t| t.resource.is_some()));
            if let Some(target) = rich.or(candidates.first()) {
                orders.push(Command::ExpandTerritory {
                    city_id,
                    target: *target,
                });
            }
        }

        orders
    }
}

/// Most expensive unit type within budget, earliest in the catalog on ties
fn priciest_affordable(budget: u32) -> Option<UnitTypeId> {
    let mut best: Option<(u32, UnitTypeId)> = None;
    for (idx, def) in UNIT_TYPES.iter().enumerate() {
        if def.cost > budget {
            continue;
        }
        if best.map_or(true, |(cost, _)| def.cost > cost) {
            best = Some((def.cost, idx as UnitTypeId));
        }
    }
    best.map(|(_, idx)| idx)
}

fn choose_attack(state: &GameState, unit: &Unit) -> Option<Command> {
    let def = unit.def();
    let in_range = |pos: GridPosition| def.covers(unit.position.distance_to(pos));

    let target = state
        .units
        .iter()
        .filter(|u| u.participant_id != unit.participant_id && in_range(u.position))
        .min_by_key(|u| (u.hp, u.id));
    if let Some(target) = target {
        return Some(Command::AttackUnit {
            attacker_unit_id: unit.id,
            target_unit_id: target.id,
        });
    }

    state
        .cities
        .iter()
        .filter(|c| c.participant_id != unit.participant_id && in_range(c.position))
        .min_by_key(|c| (c.hp, c.id))
        .map(|c| Command::AttackCity {
            attacker_unit_id: unit.id,
            target_city_id: c.id,
        })
}

fn choose_advance(state: &GameState, unit: &Unit) -> Option<Command> {
    let from = unit.position;
    let goal = state
        .units
        .iter()
        .filter(|u| u.participant_id != unit.participant_id)
        .map(|u| u.position)
        .chain(
            state
                .cities
                .iter()
                .filter(|c| c.participant_id != unit.participant_id)
                .map(|c| c.position),
        )
        .min_by_key(|pos| (from.distance_to(*pos), *pos))?;

    let blocked = |pos: GridPosition| !state.is_passable(pos) || state.unit_at(pos).is_some();
    let best = reachable_tiles(&state.board(), from, unit.def().move_points, blocked)
        .into_iter()
        .filter(|pos| *pos != from)
        .min_by_key(|pos| (pos.distance_to(goal), *pos))?;

    if best.distance_to(goal) >= from.distance_to(goal) {
        return None;
    }
    Some(Command::MoveUnit {
        unit_id: unit.id,
        target: best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::StandardDamage;
    use crate::config::RulesConfig;
    use crate::game::{GameMap, ParticipantKind, Terrain};
    use crate::units::unit_code_to_index;

    fn duel() -> GameState {
        let map = GameMap::filled("test", 15, 20, Terrain::Plains);
        let mut game = GameState::new(1, map, 3, 0);
        game.add_participant("alice", ParticipantKind::Human);
        game.add_participant("bot", ParticipantKind::Ai);
        game.add_city(1, "Alpha", GridPosition::new(2, 2), 40);
        game.add_city(2, "Beta", GridPosition::new(12, 17), 40);
        game.active_participant = 2;
        game
    }

    fn play(game: &mut GameState) -> Vec<ActionEvent> {
        let rules = RulesConfig::default();
        let damage = StandardDamage::default();
        let resolver = ActionResolver::new(&rules, &damage);
        GreedyOpponent::default().play_turn(game, &resolver, 0)
    }

    #[test]
    fn test_priciest_affordable() {
        assert_eq!(priciest_affordable(5), None);
        assert_eq!(priciest_affordable(6), unit_code_to_index("SCT"));
        assert_eq!(priciest_affordable(14), unit_code_to_index("SPR"));
        assert_eq!(priciest_affordable(100), unit_code_to_index("CAT"));
    }

    #[test]
    fn test_attacks_weakest_in_range() {
        let mut game = duel();
        let war = unit_code_to_index("WAR").unwrap();
        let me = game.add_unit(2, war, GridPosition::new(6, 6), false);
        let strong = game.add_unit(1, war, GridPosition::new(6, 7), false);
        let weak = game.add_unit(1, war, GridPosition::new(6, 5), false);
        game.unit_mut(weak).unwrap().hp = 5;

        let events = play(&mut game);
        match &events[0] {
            ActionEvent::UnitCombat { attacker_id, target_id, .. } => {
                assert_eq!(*attacker_id, me);
                assert_eq!(*target_id, weak);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(game.unit(strong).unwrap().hp, 20);
    }

    #[test]
    fn test_advances_toward_enemy() {
        let mut game = duel();
        let war = unit_code_to_index("WAR").unwrap();
        let me = game.add_unit(2, war, GridPosition::new(7, 12), false);
        game.add_unit(1, war, GridPosition::new(7, 4), false);

        let before = game.unit(me).unwrap().position.distance_to(GridPosition::new(7, 4));
        play(&mut game);
        let after = game.unit(me).unwrap().position.distance_to(GridPosition::new(7, 4));
        assert_eq!(after, before - 2);
        assert!(game.unit(me).unwrap().has_acted);
    }

    #[test]
    fn test_city_spawns_and_expands() {
        let mut game = duel();
        let beta = game.cities[1].id;
        game.city_mut(beta).unwrap().add_resource(ResourceType::Production, 15);
        game.city_mut(beta).unwrap().add_resource(ResourceType::Gold, 20);

        let events = play(&mut game);
        assert!(events.iter().any(|e| matches!(e, ActionEvent::Spawned { unit_code, .. } if unit_code == "SPR")));
        assert!(events.iter().any(|e| matches!(e, ActionEvent::Expanded { cost: 20, .. })));
        let city = game.city(beta).unwrap();
        assert_eq!(city.resource(ResourceType::Production), 1);
        assert_eq!(city.tiles.len(), 8);
    }

    #[test]
    fn test_same_state_same_turn() {
        let mut a = duel();
        let war = unit_code_to_index("WAR").unwrap();
        a.add_unit(2, war, GridPosition::new(6, 6), false);
        a.add_unit(1, war, GridPosition::new(6, 7), false);
        let mut b = a.clone();
        assert_eq!(play(&mut a), play(&mut b));
        assert_eq!(a, b);
    }
}
