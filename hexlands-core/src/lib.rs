//! HEXLANDS Core - Rules engine
//!
//! This crate provides the deterministic game logic for HEXLANDS:
//! - Board geometry (odd-row offset hex grid with cube conversion)
//! - Pathfinding, movement and attack previews
//! - Unit catalog, game state and command resolution
//! - Territory expansion, turn progression and city upkeep
//! - Greedy AI opponent
//! - Autosave ring and manual save slots

pub mod board;
pub mod pathfind;
pub mod units;
pub mod game;
pub mod combat;
pub mod config;
pub mod error;
pub mod territory;
pub mod actions;
pub mod ai;
pub mod turn;
pub mod saves;
pub mod scenario;

// Re-exports for convenient access
pub use board::{Board, Cube, GridPosition, CUBE_DIRECTIONS};
pub use pathfind::{attackable_tiles, find_path, reachable_tiles};
pub use units::{get_unit_type, unit_code_to_index, UnitDefinition, UnitTypeId, UNIT_TYPES};
pub use game::{
    City, CityId, GameId, GameMap, GameState, GameStatus, Participant, ParticipantId, ParticipantKind,
    ResourceType, Terrain, TurnRecord, Unit, UnitId,
};
pub use combat::{DamageModel, FlatDamage, StandardDamage};
pub use config::{ExpansionConfig, RulesConfig, UpkeepConfig};
pub use error::{ErrorClass, GameError};
pub use territory::{expansion_cost, valid_expansion_tiles};
pub use actions::{ActionEvent, ActionResolver, Command, Resolution};
pub use ai::{GreedyOpponent, Opponent, PassiveOpponent};
pub use turn::{close_turn, AiTurn, Clock, TurnCoordinator, TurnPhase, TurnReport};
pub use saves::{SaveListing, SaveManager, SaveSummary, Snapshot};
pub use scenario::Scenario;
