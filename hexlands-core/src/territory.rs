//! City territory growth

use crate::board::GridPosition;
use crate::config::ExpansionConfig;
use crate::game::{City, GameState};
use std::collections::BTreeSet;

/// Gold needed to claim one more tile for a city owning `owned_tiles`
pub fn expansion_cost(config: &ExpansionConfig, owned_tiles: u32) -> u32 {
    config.base_cost + owned_tiles.saturating_sub(config.initial_tiles) * config.per_tile_cost
}

/// Tiles the city may claim next, sorted by position
///
/// A candidate touches owned territory, lies within `max_distance` of the
/// city center, is land, is unclaimed, and holds no enemy unit.
pub fn valid_expansion_tiles(state: &GameState, city: &City, config: &ExpansionConfig) -> Vec<GridPosition> {
    let board = state.board();
    let mut candidates = BTreeSet::new();

    for owned in &city.tiles {
        for pos in board.neighbors(*owned) {
            if city.tiles.contains(&pos) || candidates.contains(&pos) {
                continue;
            }
            if pos.distance_to(city.position) > config.max_distance {
                continue;
            }
            if state.map.terrain(pos).map_or(true, |t| t.is_water()) {
                continue;
            }
            if state.city_owning(pos).is_some() {
                continue;
            }
            if state
                .unit_at(pos)
                .is_some_and(|u| u.participant_id != city.participant_id)
            {
                continue;
            }
            candidates.insert(pos);
        }
    }

    candidates.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameMap, ParticipantKind, Terrain};
    use crate::units::unit_code_to_index;

    fn game_with_city() -> GameState {
        let map = GameMap::filled("test", 15, 20, Terrain::Plains);
        let mut game = GameState::new(1, map, 1, 0);
        let a = game.add_participant("alice", ParticipantKind::Human);
        game.add_participant("bot", ParticipantKind::Ai);
        game.add_city(a, "Alpha", GridPosition::new(7, 7), 40);
        game
    }

    #[test]
    fn test_cost_formula() {
        let config = ExpansionConfig::default();
        assert_eq!(expansion_cost(&config, 7), 20);
        assert_eq!(expansion_cost(&config, 10), 50);
        assert_eq!(expansion_cost(&config, 3), 20);
        let mut last = 0;
        for owned in 0..40 {
            let cost = expansion_cost(&config, owned);
            assert!(cost >= last);
            last = cost;
        }
    }

    #[test]
    fn test_candidates_form_second_ring() {
        let game = game_with_city();
        let city = &game.cities[0];
        let tiles = valid_expansion_tiles(&game, city, &ExpansionConfig::default());
        assert_eq!(tiles.len(), 12);
        assert!(tiles.iter().all(|t| t.distance_to(city.position) == 2));
    }

    #[test]
    fn test_candidates_respect_max_distance() {
        let mut game = game_with_city();
        let config = ExpansionConfig::default();
        let ring: Vec<_> = valid_expansion_tiles(&game, &game.cities[0], &config);
        game.cities[0].tiles.extend(ring);
        // Everything within 2 is owned now; nothing further is allowed
        assert!(valid_expansion_tiles(&game, &game.cities[0], &config).is_empty());
    }

    #[test]
    fn test_water_and_enemy_units_excluded() {
        let mut game = game_with_city();
        let water = GridPosition::new(5, 7);
        let enemy_tile = GridPosition::new(9, 7);
        let own_tile = GridPosition::new(7, 9);
        game.map.tile_mut(water).unwrap().terrain = Terrain::Ocean;
        let war = unit_code_to_index("WAR").unwrap();
        game.add_unit(2, war, enemy_tile, false);
        game.add_unit(1, war, own_tile, false);

        let tiles = valid_expansion_tiles(&game, &game.cities[0], &ExpansionConfig::default());
        assert!(!tiles.contains(&water));
        assert!(!tiles.contains(&enemy_tile));
        assert!(tiles.contains(&own_tile));
    }

    #[test]
    fn test_other_city_territory_excluded() {
        let mut game = game_with_city();
        game.add_city(2, "Beta", GridPosition::new(7, 10), 40);
        let tiles = valid_expansion_tiles(&game, &game.cities[0], &ExpansionConfig::default());
        for tile in &tiles {
            assert!(!game.cities[1].tiles.contains(tile));
        }
        assert!(tiles.len() < 12);
    }
}
