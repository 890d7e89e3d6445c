//! Rule and consistency errors surfaced by the engine

use thiserror::Error;

/// How a caller should treat an error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Ownership or timing: not retriable until the game state changes
    Timing,
    /// Rule violation caught before mutation: retry with corrected input
    Rule,
    /// Consistency failure: the whole operation was aborted
    Consistency,
    /// Missing entity or storage failure
    Lookup,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("it is not participant {0}'s turn")]
    NotYourTurn(u32),
    #[error("a turn is being processed")]
    TurnInProgress,
    #[error("the game is finished")]
    GameFinished,
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("target at distance {distance} is outside range {min}-{max}")]
    OutOfRange { distance: u32, min: u32, max: u32 },
    #[error("tile {0} is already occupied")]
    OneUnitPerTile(String),
    #[error("unit {0} has already acted this turn")]
    NoActionsLeft(u32),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("insufficient resources: need {needed}, have {available}")]
    InsufficientResources { needed: u32, available: u32 },
    #[error("no free spawn tile around city {0}")]
    SpawnBlocked(u32),
    #[error("snapshot schema v{snapshot} does not match map schema v{live}")]
    SchemaMismatch { snapshot: u32, live: u32 },
    #[error("save conflict: {0}")]
    SaveConflict(String),
    #[error("invalid save slot {0}")]
    InvalidSlot(u8),
    #[error("{0} not found")]
    NotFound(String),
    #[error("participant {participant} does not own {entity}")]
    NotOwner { participant: u32, entity: String },
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("invalid map: {0}")]
    InvalidMap(String),
}

impl GameError {
    /// Wire code for this error
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotYourTurn(_) => "NOT_YOUR_TURN",
            GameError::TurnInProgress => "TURN_IN_PROGRESS",
            GameError::GameFinished => "GAME_FINISHED",
            GameError::IllegalMove(_) => "ILLEGAL_MOVE",
            GameError::OutOfRange { .. } => "OUT_OF_RANGE",
            GameError::OneUnitPerTile(_) => "ONE_UNIT_PER_TILE",
            GameError::NoActionsLeft(_) => "NO_ACTIONS_LEFT",
            GameError::InvalidTarget(_) => "INVALID_TARGET",
            GameError::InsufficientResources { .. } => "INSUFFICIENT_RESOURCES",
            GameError::SpawnBlocked(_) => "SPAWN_BLOCKED",
            GameError::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            GameError::SaveConflict(_) => "SAVE_CONFLICT",
            GameError::InvalidSlot(_) => "INVALID_SLOT",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::NotOwner { .. } => "NOT_OWNER",
            GameError::Storage(_) => "STORAGE",
            GameError::InvalidMap(_) => "INVALID_MAP",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            GameError::NotYourTurn(_) | GameError::TurnInProgress | GameError::GameFinished => {
                ErrorClass::Timing
            }
            GameError::IllegalMove(_)
            | GameError::OutOfRange { .. }
            | GameError::OneUnitPerTile(_)
            | GameError::NoActionsLeft(_)
            | GameError::InvalidTarget(_)
            | GameError::InsufficientResources { .. }
            | GameError::SpawnBlocked(_)
            | GameError::NotOwner { .. }
            | GameError::InvalidMap(_) => ErrorClass::Rule,
            GameError::SchemaMismatch { .. } | GameError::SaveConflict(_) | GameError::InvalidSlot(_) => {
                ErrorClass::Consistency
            }
            GameError::NotFound(_) | GameError::Storage(_) => ErrorClass::Lookup,
        }
    }
}

pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(GameError::NotYourTurn(2).code(), "NOT_YOUR_TURN");
        assert_eq!(GameError::InvalidSlot(4).code(), "INVALID_SLOT");
        assert_eq!(GameError::SchemaMismatch { snapshot: 1, live: 2 }.class(), ErrorClass::Consistency);
        assert_eq!(GameError::SpawnBlocked(3).class(), ErrorClass::Rule);
        assert_eq!(GameError::InvalidMap("empty".into()).code(), "INVALID_MAP");
    }
}
