//! Scenario definitions - map plus starting forces

use crate::board::GridPosition;
use crate::error::{GameError, Result};
use crate::game::{GameId, GameMap, GameState, ParticipantKind, ResourceType, Terrain, TileResource, MAX_MAP_SIDE};
use crate::units::unit_code_to_index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Hit points of a starting city
pub const DEFAULT_CITY_HP: u32 = 40;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySetup {
    pub name: String,
    pub position: GridPosition,
    #[serde(default = "default_city_hp")]
    pub max_hp: u32,
}

fn default_city_hp() -> u32 {
    DEFAULT_CITY_HP
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSetup {
    /// Catalog code such as "WAR"
    pub code: String,
    pub position: GridPosition,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSetup {
    pub name: String,
    pub kind: ParticipantKind,
    pub cities: Vec<CitySetup>,
    #[serde(default)]
    pub units: Vec<UnitSetup>,
    /// Stock given to each of the participant's cities
    #[serde(default)]
    pub resources: BTreeMap<ResourceType, u32>,
}

/// Starting position for a game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub map: GameMap,
    pub participants: Vec<ParticipantSetup>,
}

impl Default for Scenario {
    /// 20x15 duel: a human in the north-west against the AI in the south-east
    fn default() -> Self {
        let (rows, cols) = (15, 20);
        let mut map = GameMap::filled("Riverlands", rows, cols, Terrain::Plains);

        // A lake in the middle and a ridge south of it
        for (row, col) in [(6, 9), (6, 10), (7, 9), (7, 10), (7, 11), (8, 10)] {
            set_terrain(&mut map, row, col, Terrain::Water);
        }
        for col in 12..15 {
            set_terrain(&mut map, 10, col, Terrain::Mountain);
        }
        for (row, col) in [(3, 6), (4, 6), (4, 7), (10, 4), (11, 13), (11, 14)] {
            set_terrain(&mut map, row, col, Terrain::Forest);
        }
        for (row, col, kind, amount) in [
            (1, 3, ResourceType::Food, 8),
            (3, 2, ResourceType::Gold, 6),
            (13, 16, ResourceType::Food, 8),
            (11, 17, ResourceType::Gold, 6),
            (7, 5, ResourceType::Production, 10),
            (7, 14, ResourceType::Production, 10),
        ] {
            if let Some(tile) = map.tile_mut(GridPosition::new(row, col)) {
                tile.resource = Some(TileResource { kind, amount });
            }
        }

        Self {
            name: "Riverlands".to_string(),
            map,
            participants: vec![
                starting_side("Player", ParticipantKind::Human, GridPosition::new(2, 2), 1),
                starting_side("Computer", ParticipantKind::Ai, GridPosition::new(12, 17), -1),
            ],
        }
    }
}

fn set_terrain(map: &mut GameMap, row: i32, col: i32, terrain: Terrain) {
    if let Some(tile) = map.tile_mut(GridPosition::new(row, col)) {
        tile.terrain = terrain;
    }
}

/// A city with a warrior and an archer beside it
///
/// `facing` is +1 for sides starting in the north-west, -1 otherwise.
fn starting_side(name: &str, kind: ParticipantKind, city: GridPosition, facing: i32) -> ParticipantSetup {
    ParticipantSetup {
        name: name.to_string(),
        kind,
        cities: vec![CitySetup {
            name: format!("{name} Capital"),
            position: city,
            max_hp: DEFAULT_CITY_HP,
        }],
        units: vec![
            UnitSetup {
                code: "WAR".to_string(),
                position: GridPosition::new(city.row + facing, city.col),
            },
            UnitSetup {
                code: "ARC".to_string(),
                position: GridPosition::new(city.row, city.col + facing),
            },
        ],
        resources: BTreeMap::from([
            (ResourceType::Food, 5),
            (ResourceType::Production, 10),
            (ResourceType::Gold, 10),
        ]),
    }
}

impl Scenario {
    /// Seed a fresh game from this scenario
    pub fn to_game_state(&self, game_id: GameId, rng_seed: u64, now_ms: i64) -> Result<GameState> {
        self.map.validate()?;
        let mut state = GameState::new(game_id, self.map.clone(), rng_seed, now_ms);

        for setup in &self.participants {
            let participant = state.add_participant(&setup.name, setup.kind);

            for city in &setup.cities {
                check_site(&state, city.position)?;
                if state.city_owning(city.position).is_some() {
                    return Err(GameError::IllegalMove(format!(
                        "city {} sits in foreign territory",
                        city.name
                    )));
                }
                let id = state.add_city(participant, &city.name, city.position, city.max_hp);
                let city = state.city_mut(id)?;
                for (kind, amount) in &setup.resources {
                    city.add_resource(*kind, *amount);
                }
            }

            for unit in &setup.units {
                let type_id = unit_code_to_index(&unit.code)
                    .ok_or_else(|| GameError::InvalidTarget(format!("unknown unit type {}", unit.code)))?;
                check_site(&state, unit.position)?;
                if state.unit_at(unit.position).is_some() {
                    return Err(GameError::OneUnitPerTile(unit.position.to_string()));
                }
                state.add_unit(participant, type_id, unit.position, false);
            }
        }

        Ok(state)
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&content)?;
        scenario.map.validate()?;
        Ok(scenario)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Random map for a human against the AI
    ///
    /// The same seed always yields the same scenario. Start areas are
    /// cleared to plains so both sides can move off their cities.
    pub fn generate(name: &str, rows: i32, cols: i32, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(rows >= 6 && cols >= 6, "map must be at least 6x6, got {rows}x{cols}");
        anyhow::ensure!(
            rows <= MAX_MAP_SIDE && cols <= MAX_MAP_SIDE,
            "map must be at most {MAX_MAP_SIDE}x{MAX_MAP_SIDE}, got {rows}x{cols}"
        );
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut map = GameMap::filled(name, rows, cols, Terrain::Plains);

        for tile in map.tiles.iter_mut() {
            tile.terrain = match rng.gen_range(0..100) {
                0..=7 => Terrain::Water,
                8..=13 => Terrain::Mountain,
                14..=25 => Terrain::Forest,
                26..=35 => Terrain::Hills,
                36..=43 => Terrain::Desert,
                44..=63 => Terrain::Grassland,
                _ => Terrain::Plains,
            };
            if !tile.terrain.is_water() && rng.gen_range(0..100) < 12 {
                let kind = match rng.gen_range(0..3) {
                    0 => ResourceType::Food,
                    1 => ResourceType::Production,
                    _ => ResourceType::Gold,
                };
                tile.resource = Some(TileResource {
                    kind,
                    amount: rng.gen_range(4..=12),
                });
            }
        }

        let home = GridPosition::new(2, 2);
        let away = GridPosition::new(rows - 3, cols - 3);
        let board = map.board();
        for site in [home, away] {
            for pos in board.hexes_within(site, 2) {
                if let Some(tile) = map.tile_mut(pos) {
                    tile.terrain = Terrain::Plains;
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            map,
            participants: vec![
                starting_side("Player", ParticipantKind::Human, home, 1),
                starting_side("Computer", ParticipantKind::Ai, away, -1),
            ],
        })
    }
}

fn check_site(state: &GameState, pos: GridPosition) -> Result<()> {
    if !state.board().contains(pos) {
        return Err(GameError::IllegalMove(format!("{pos} is off the board")));
    }
    if !state.is_passable(pos) {
        return Err(GameError::IllegalMove(format!("{pos} is impassable")));
    }
    Ok(())
}
