//! Game state and entity model

use crate::board::{Board, GridPosition};
use crate::error::{GameError, Result};
use crate::units::{get_unit_type, UnitDefinition, UnitTypeId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// IDENTIFIERS
// ============================================================================

pub type GameId = u64;
pub type ParticipantId = u32;
pub type UnitId = u32;
pub type CityId = u32;

// ============================================================================
// MAP
// ============================================================================

/// Largest accepted map side, in tiles
pub const MAX_MAP_SIDE: i32 = 128;

/// Terrain of a map tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Plains,
    Grassland,
    Forest,
    Hills,
    Desert,
    Mountain,
    Water,
    Ocean,
}

impl Terrain {
    pub fn is_water(self) -> bool {
        matches!(self, Terrain::Water | Terrain::Ocean)
    }

    /// Whether land units can enter this terrain
    pub fn is_passable(self) -> bool {
        !self.is_water() && self != Terrain::Mountain
    }
}

/// Resource kinds held by cities and found on tiles
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Food,
    Production,
    Gold,
}

/// Resource deposit on a static map tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileResource {
    pub kind: ResourceType,
    pub amount: u32,
}

/// Static map tile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTile {
    pub row: i32,
    pub col: i32,
    pub terrain: Terrain,
    #[serde(default)]
    pub resource: Option<TileResource>,
}

impl MapTile {
    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.row, self.col)
    }
}

/// Static map shared by every game played on it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    pub name: String,
    pub rows: i32,
    pub cols: i32,
    /// Bumped whenever the map layout changes; snapshots must match it
    pub schema_version: u32,
    /// Row-major tiles
    pub tiles: Vec<MapTile>,
}

impl GameMap {
    /// Uniform map of a single terrain
    pub fn filled(name: &str, rows: i32, cols: i32, terrain: Terrain) -> Self {
        let tiles = Board::new(rows, cols)
            .positions()
            .map(|pos| MapTile {
                row: pos.row,
                col: pos.col,
                terrain,
                resource: None,
            })
            .collect();
        Self {
            name: name.to_string(),
            rows,
            cols,
            schema_version: 1,
            tiles,
        }
    }

    pub fn board(&self) -> Board {
        Board::new(self.rows, self.cols)
    }

    pub fn tile(&self, pos: GridPosition) -> Option<&MapTile> {
        if !self.board().contains(pos) {
            return None;
        }
        self.tiles.get((pos.row * self.cols + pos.col) as usize)
    }

    pub fn tile_mut(&mut self, pos: GridPosition) -> Option<&mut MapTile> {
        if !self.board().contains(pos) {
            return None;
        }
        self.tiles.get_mut((pos.row * self.cols + pos.col) as usize)
    }

    pub fn terrain(&self, pos: GridPosition) -> Option<Terrain> {
        self.tile(pos).map(|t| t.terrain)
    }

    /// Dimensions within bounds and one tile per cell, in row-major order
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_MAP_SIDE).contains(&self.rows) || !(1..=MAX_MAP_SIDE).contains(&self.cols) {
            return Err(GameError::InvalidMap(format!(
                "{}x{} is outside 1x1..{MAX_MAP_SIDE}x{MAX_MAP_SIDE}",
                self.rows, self.cols
            )));
        }
        let expected = (self.rows * self.cols) as usize;
        if self.tiles.len() != expected {
            return Err(GameError::InvalidMap(format!(
                "map {} has {} tiles, expected {expected}",
                self.name,
                self.tiles.len()
            )));
        }
        for (pos, tile) in self.board().positions().zip(&self.tiles) {
            if tile.position() != pos {
                return Err(GameError::InvalidMap(format!(
                    "tile {} found where {pos} belongs",
                    tile.position()
                )));
            }
        }
        Ok(())
    }
}

/// Per-game overlay tracking what is left of a tile's resource deposit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTileState {
    pub position: GridPosition,
    pub remaining: u32,
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Who controls a participant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantKind {
    Human,
    Ai,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub kind: ParticipantKind,
    pub eliminated: bool,
}

/// A unit on the board
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub participant_id: ParticipantId,
    pub type_id: UnitTypeId,
    pub position: GridPosition,
    pub hp: u32,
    pub has_acted: bool,
}

impl Unit {
    pub fn def(&self) -> &'static UnitDefinition {
        get_unit_type(self.type_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub participant_id: ParticipantId,
    pub name: String,
    pub position: GridPosition,
    pub hp: u32,
    pub max_hp: u32,
    /// Owned territory, center included
    pub tiles: BTreeSet<GridPosition>,
    pub resources: BTreeMap<ResourceType, u32>,
}

impl City {
    pub fn resource(&self, kind: ResourceType) -> u32 {
        self.resources.get(&kind).copied().unwrap_or(0)
    }

    pub fn add_resource(&mut self, kind: ResourceType, amount: u32) {
        *self.resources.entry(kind).or_insert(0) += amount;
    }

    /// Deduct `amount`, failing without change if the bag holds less
    pub fn spend(&mut self, kind: ResourceType, amount: u32) -> Result<()> {
        let available = self.resource(kind);
        if available < amount {
            return Err(GameError::InsufficientResources {
                needed: amount,
                available,
            });
        }
        self.resources.insert(kind, available - amount);
        Ok(())
    }
}

/// Immutable ledger entry written once per committed turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub game_id: GameId,
    pub turn_no: u32,
    pub participant_id: ParticipantId,
    /// Unix epoch milliseconds
    pub committed_at: i64,
    pub duration_ms: i64,
    pub summary: String,
}

// ============================================================================
// GAME STATE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Active,
    Finished,
}

/// Aggregate root for one game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    pub turn_no: u32,
    pub active_participant: ParticipantId,
    pub turn_in_progress: bool,
    pub rng_seed: u64,
    /// Per-action counter; every roll consumes one
    pub rng_version: u64,
    pub status: GameStatus,
    pub winner: Option<ParticipantId>,
    /// Unix epoch milliseconds at which the current turn began
    pub turn_started_at: i64,
    pub finished_at: Option<i64>,
    pub map: GameMap,
    pub participants: Vec<Participant>,
    pub units: Vec<Unit>,
    pub cities: Vec<City>,
    pub tile_states: Vec<GameTileState>,
    pub next_entity_id: u32,
}

impl GameState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Empty game on a map; participants, cities and units are added by seeding
    pub fn new(id: GameId, map: GameMap, rng_seed: u64, started_at: i64) -> Self {
        let tile_states = map
            .tiles
            .iter()
            .filter_map(|t| {
                t.resource.map(|r| GameTileState {
                    position: t.position(),
                    remaining: r.amount,
                })
            })
            .collect();

        Self {
            id,
            turn_no: 1,
            active_participant: 0,
            turn_in_progress: false,
            rng_seed,
            rng_version: 0,
            status: GameStatus::Active,
            winner: None,
            turn_started_at: started_at,
            finished_at: None,
            map,
            participants: Vec::new(),
            units: Vec::new(),
            cities: Vec::new(),
            tile_states,
            next_entity_id: 1,
        }
    }

    pub fn add_participant(&mut self, name: &str, kind: ParticipantKind) -> ParticipantId {
        let id = self.participants.len() as ParticipantId + 1;
        self.participants.push(Participant {
            id,
            name: name.to_string(),
            kind,
            eliminated: false,
        });
        if self.participants.len() == 1 {
            self.active_participant = id;
        }
        id
    }

    /// Place a unit without action checks (seeding and spawning)
    pub fn add_unit(
        &mut self,
        participant_id: ParticipantId,
        type_id: UnitTypeId,
        position: GridPosition,
        has_acted: bool,
    ) -> UnitId {
        let id = self.allocate_id();
        self.units.push(Unit {
            id,
            participant_id,
            type_id,
            position,
            hp: get_unit_type(type_id).health,
            has_acted,
        });
        id
    }

    /// Found a city claiming its center and every free in-bounds neighbor
    pub fn add_city(
        &mut self,
        participant_id: ParticipantId,
        name: &str,
        position: GridPosition,
        max_hp: u32,
    ) -> CityId {
        let id = self.allocate_id();
        let board = self.board();
        let mut tiles = BTreeSet::new();
        for pos in std::iter::once(position).chain(board.neighbors(position)) {
            if self.city_owning(pos).is_none() {
                tiles.insert(pos);
            }
        }
        self.cities.push(City {
            id,
            participant_id,
            name: name.to_string(),
            position,
            hp: max_hp,
            max_hp,
            tiles,
            resources: BTreeMap::new(),
        });
        id
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn board(&self) -> Board {
        self.map.board()
    }

    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.units
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| GameError::NotFound(format!("unit {id}")))
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| GameError::NotFound(format!("unit {id}")))
    }

    pub fn city(&self, id: CityId) -> Result<&City> {
        self.cities
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| GameError::NotFound(format!("city {id}")))
    }

    pub fn city_mut(&mut self, id: CityId) -> Result<&mut City> {
        self.cities
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| GameError::NotFound(format!("city {id}")))
    }

    /// Unit standing on a tile, if any
    pub fn unit_at(&self, pos: GridPosition) -> Option<&Unit> {
        self.units.iter().find(|u| u.position == pos)
    }

    /// City whose territory includes the tile, if any
    pub fn city_owning(&self, pos: GridPosition) -> Option<&City> {
        self.cities.iter().find(|c| c.tiles.contains(&pos))
    }

    pub fn units_of(&self, participant: ParticipantId) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter().filter(move |u| u.participant_id == participant)
    }

    pub fn cities_of(&self, participant: ParticipantId) -> impl Iterator<Item = &City> + '_ {
        self.cities.iter().filter(move |c| c.participant_id == participant)
    }

    /// Participants still in the game, in turn order
    pub fn contenders(&self) -> impl Iterator<Item = &Participant> + '_ {
        self.participants.iter().filter(|p| !p.eliminated)
    }

    /// Whether a land unit may stand on the tile (terrain only)
    pub fn is_passable(&self, pos: GridPosition) -> bool {
        self.map.terrain(pos).is_some_and(Terrain::is_passable)
    }

    pub fn tile_state_mut(&mut self, pos: GridPosition) -> Option<&mut GameTileState> {
        self.tile_states.iter_mut().find(|t| t.position == pos)
    }

    // ========================================================================
    // DETERMINISTIC RANDOMNESS
    // ========================================================================

    /// Next roll in [0, bound), derived from the persisted seed and counter
    ///
    /// Replaying the same commands from the same state yields the same rolls.
    pub fn next_roll(&mut self, bound: u32) -> u32 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.rng_seed);
        rng.set_stream(self.rng_version);
        self.rng_version += 1;
        rng.gen_range(0..bound.max(1))
    }

    // ========================================================================
    // ELIMINATION
    // ========================================================================

    /// Drop units at zero hp and mark participants with nothing left
    ///
    /// Returns the participants newly eliminated.
    pub fn sweep_eliminations(&mut self) -> Vec<ParticipantId> {
        self.units.retain(|u| u.hp > 0);

        let mut eliminated = Vec::new();
        for i in 0..self.participants.len() {
            let id = self.participants[i].id;
            if self.participants[i].eliminated {
                continue;
            }
            let has_units = self.units.iter().any(|u| u.participant_id == id);
            let has_cities = self.cities.iter().any(|c| c.participant_id == id);
            if !has_units && !has_cities {
                self.participants[i].eliminated = true;
                eliminated.push(id);
            }
        }
        eliminated
    }

    /// Finish the game once at most one participant remains
    pub fn check_victory(&mut self, now_ms: i64) -> bool {
        if self.status == GameStatus::Finished {
            return true;
        }
        let remaining: Vec<ParticipantId> = self.contenders().map(|p| p.id).collect();
        if remaining.len() <= 1 {
            self.status = GameStatus::Finished;
            self.winner = remaining.first().copied();
            self.finished_at = Some(now_ms);
            return true;
        }
        false
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::unit_code_to_index;

    fn simple_game() -> GameState {
        let map = GameMap::filled("test", 15, 20, Terrain::Plains);
        let mut game = GameState::new(1, map, 42, 0);
        let a = game.add_participant("alice", ParticipantKind::Human);
        let b = game.add_participant("bot", ParticipantKind::Ai);
        game.add_city(a, "Alpha", GridPosition::new(3, 3), 40);
        game.add_city(b, "Beta", GridPosition::new(11, 16), 40);
        game.add_unit(a, unit_code_to_index("WAR").unwrap(), GridPosition::new(5, 5), false);
        game
    }

    #[test]
    fn test_game_creation() {
        let game = simple_game();
        assert_eq!(game.turn_no, 1);
        assert_eq!(game.active_participant, 1);
        assert!(game.is_active());
        assert_eq!(game.cities[0].tiles.len(), 7);
        assert!(game.unit_at(GridPosition::new(5, 5)).is_some());
    }

    #[test]
    fn test_map_validation() {
        let map = GameMap::filled("ok", 15, 20, Terrain::Plains);
        assert!(map.validate().is_ok());

        let mut empty = map.clone();
        empty.tiles.clear();
        assert_eq!(empty.validate().unwrap_err().code(), "INVALID_MAP");

        let mut shuffled = map.clone();
        shuffled.tiles.swap(0, 1);
        assert_eq!(shuffled.validate().unwrap_err().code(), "INVALID_MAP");

        let mut huge = map;
        huge.rows = MAX_MAP_SIDE + 1;
        assert_eq!(huge.validate().unwrap_err().code(), "INVALID_MAP");
    }

    #[test]
    fn test_city_territory_does_not_overlap() {
        let mut game = simple_game();
        let a = game.participants[0].id;
        let id = game.add_city(a, "Gamma", GridPosition::new(3, 5), 40);
        let gamma = game.city(id).unwrap();
        assert!(gamma.tiles.len() < 7);
        for tile in &gamma.tiles {
            assert_eq!(game.cities.iter().filter(|c| c.tiles.contains(tile)).count(), 1);
        }
    }

    #[test]
    fn test_rolls_are_deterministic() {
        let mut a = simple_game();
        let mut b = simple_game();
        let rolls_a: Vec<u32> = (0..20).map(|_| a.next_roll(100)).collect();
        let rolls_b: Vec<u32> = (0..20).map(|_| b.next_roll(100)).collect();
        assert_eq!(rolls_a, rolls_b);
        assert_eq!(a.rng_version, 20);
        assert!(rolls_a.iter().all(|r| *r < 100));
    }

    #[test]
    fn test_spend() {
        let mut game = simple_game();
        let city = game.city_mut(game.cities[0].id).unwrap();
        city.add_resource(ResourceType::Production, 5);
        assert!(city.spend(ResourceType::Production, 6).is_err());
        assert_eq!(city.resource(ResourceType::Production), 5);
        city.spend(ResourceType::Production, 5).unwrap();
        assert_eq!(city.resource(ResourceType::Production), 0);
    }

    #[test]
    fn test_elimination_and_victory() {
        let mut game = simple_game();
        let b = game.participants[1].id;
        game.cities.retain(|c| c.participant_id != b);
        let eliminated = game.sweep_eliminations();
        assert_eq!(eliminated, vec![b]);
        assert!(game.check_victory(99));
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Some(1));
        assert_eq!(game.finished_at, Some(99));
    }
}
