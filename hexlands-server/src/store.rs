//! Game persistence
//!
//! The engine only talks to a `GameRepository`; the in-memory version backs
//! the server and the tests.

use async_trait::async_trait;
use hexlands_core::error::Result;
use hexlands_core::{GameError, GameId, GameState, TurnRecord};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Fresh game id
    async fn allocate_id(&self) -> GameId;

    async fn load(&self, game_id: GameId) -> Result<GameState>;

    /// Replace the stored state in one step
    async fn save(&self, state: &GameState) -> Result<()>;

    /// Store a state together with the turns that produced it
    ///
    /// All or nothing: on error neither the state nor any record is kept.
    async fn commit(&self, state: &GameState, records: Vec<TurnRecord>) -> Result<()>;

    /// Ledger for a game, oldest first
    async fn turns(&self, game_id: GameId) -> Result<Vec<TurnRecord>>;
}

/// Repository holding everything in process memory
pub struct MemoryRepository {
    games: RwLock<FxHashMap<GameId, GameState>>,
    turns: RwLock<FxHashMap<GameId, Vec<TurnRecord>>>,
    next_id: AtomicU64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            games: RwLock::new(FxHashMap::default()),
            turns: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameRepository for MemoryRepository {
    async fn allocate_id(&self) -> GameId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn load(&self, game_id: GameId) -> Result<GameState> {
        self.games
            .read()
            .unwrap()
            .get(&game_id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("game {game_id}")))
    }

    async fn save(&self, state: &GameState) -> Result<()> {
        self.games.write().unwrap().insert(state.id, state.clone());
        Ok(())
    }

    async fn commit(&self, state: &GameState, records: Vec<TurnRecord>) -> Result<()> {
        let mut games = self.games.write().unwrap();
        let mut turns = self.turns.write().unwrap();
        let ledger = turns.entry(state.id).or_default();
        for (i, record) in records.iter().enumerate() {
            let duplicate = ledger
                .iter()
                .chain(&records[..i])
                .any(|r| r.turn_no == record.turn_no && r.committed_at == record.committed_at);
            if record.game_id != state.id {
                return Err(GameError::Storage(format!(
                    "turn record for game {} committed with game {}",
                    record.game_id, state.id
                )));
            }
            if duplicate {
                return Err(GameError::Storage(format!(
                    "turn {} of game {} already recorded",
                    record.turn_no, record.game_id
                )));
            }
        }
        ledger.extend(records);
        games.insert(state.id, state.clone());
        Ok(())
    }

    async fn turns(&self, game_id: GameId) -> Result<Vec<TurnRecord>> {
        if !self.games.read().unwrap().contains_key(&game_id) {
            return Err(GameError::NotFound(format!("game {game_id}")));
        }
        Ok(self
            .turns
            .read()
            .unwrap()
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }
}
