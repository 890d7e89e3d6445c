//! Autosave ring and manual save slots

use crate::config::RulesConfig;
use crate::error::{GameError, Result};
use crate::game::{GameId, GameState};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Frozen copy of a game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game_id: GameId,
    pub turn_no: u32,
    /// Map schema the state was captured against
    pub schema_version: u32,
    pub saved_at: i64,
    pub state: GameState,
}

impl Snapshot {
    /// Capture `state` tagged with `turn_no`
    pub fn capture(state: &GameState, turn_no: u32, saved_at: i64) -> Self {
        let mut state = state.clone();
        state.turn_in_progress = false;
        Self {
            game_id: state.id,
            turn_no,
            schema_version: state.map.schema_version,
            saved_at,
            state,
        }
    }

    fn summary(&self, slot: Option<u8>) -> SaveSummary {
        SaveSummary {
            slot,
            turn_no: self.turn_no,
            saved_at: self.saved_at,
        }
    }
}

/// Listing entry without the state payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    /// Manual slot, `None` for autosaves
    pub slot: Option<u8>,
    pub turn_no: u32,
    pub saved_at: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveListing {
    /// Oldest first
    pub autosaves: Vec<SaveSummary>,
    pub slots: Vec<SaveSummary>,
}

#[derive(Debug, Default)]
struct GameSaves {
    autosaves: VecDeque<Snapshot>,
    slots: BTreeMap<u8, Snapshot>,
}

/// Save bookkeeping for every game
#[derive(Debug)]
pub struct SaveManager {
    capacity: usize,
    manual_slots: u8,
    games: FxHashMap<GameId, GameSaves>,
}

impl Default for SaveManager {
    fn default() -> Self {
        Self::new(&RulesConfig::default())
    }
}

impl SaveManager {
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            capacity: rules.autosave_capacity.max(1),
            manual_slots: rules.manual_slots,
            games: FxHashMap::default(),
        }
    }

    // ========================================================================
    // AUTOSAVES
    // ========================================================================

    /// Store an end-of-turn snapshot, evicting the oldest past capacity
    ///
    /// A snapshot for a turn already in the ring replaces it; this happens
    /// when play resumes from an earlier save.
    pub fn record_autosave(&mut self, snapshot: Snapshot) {
        let saves = self.games.entry(snapshot.game_id).or_default();
        saves.autosaves.retain(|s| s.turn_no != snapshot.turn_no);
        saves.autosaves.push_back(snapshot);
        while saves.autosaves.len() > self.capacity {
            saves.autosaves.pop_front();
        }
    }

    pub fn autosave(&self, game_id: GameId, turn_no: u32) -> Option<&Snapshot> {
        self.games
            .get(&game_id)?
            .autosaves
            .iter()
            .find(|s| s.turn_no == turn_no)
    }

    // ========================================================================
    // MANUAL SLOTS
    // ========================================================================

    fn check_slot(&self, slot: u8) -> Result<()> {
        if slot == 0 || slot > self.manual_slots {
            return Err(GameError::InvalidSlot(slot));
        }
        Ok(())
    }

    /// Create or overwrite a manual slot with the current state
    pub fn save_slot(&mut self, state: &GameState, slot: u8, now_ms: i64) -> Result<SaveSummary> {
        self.check_slot(slot)?;
        if state.turn_in_progress {
            return Err(GameError::SaveConflict("a turn is being processed".to_string()));
        }
        let snapshot = Snapshot::capture(state, state.turn_no, now_ms);
        let summary = snapshot.summary(Some(slot));
        self.games
            .entry(state.id)
            .or_default()
            .slots
            .insert(slot, snapshot);
        Ok(summary)
    }

    pub fn delete_slot(&mut self, game_id: GameId, slot: u8) -> Result<()> {
        self.check_slot(slot)?;
        self.games
            .get_mut(&game_id)
            .and_then(|saves| saves.slots.remove(&slot))
            .map(|_| ())
            .ok_or(GameError::InvalidSlot(slot))
    }

    pub fn slot(&self, game_id: GameId, slot: u8) -> Option<&Snapshot> {
        self.games.get(&game_id)?.slots.get(&slot)
    }

    pub fn list(&self, game_id: GameId) -> SaveListing {
        let Some(saves) = self.games.get(&game_id) else {
            return SaveListing::default();
        };
        SaveListing {
            autosaves: saves.autosaves.iter().map(|s| s.summary(None)).collect(),
            slots: saves
                .slots
                .iter()
                .map(|(slot, s)| s.summary(Some(*slot)))
                .collect(),
        }
    }

    /// Drop everything kept for a game
    pub fn forget(&mut self, game_id: GameId) {
        self.games.remove(&game_id);
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// State to install in place of `live` from a manual slot
    pub fn load_slot(&self, live: &GameState, slot: u8) -> Result<GameState> {
        self.check_slot(slot)?;
        let snapshot = self.slot(live.id, slot).ok_or(GameError::InvalidSlot(slot))?;
        restore(live, snapshot)
    }

    /// State to install in place of `live` from the autosave of `turn_no`
    pub fn load_autosave(&self, live: &GameState, turn_no: u32) -> Result<GameState> {
        let snapshot = self
            .autosave(live.id, turn_no)
            .ok_or_else(|| GameError::NotFound(format!("autosave for turn {turn_no}")))?;
        restore(live, snapshot)
    }
}

/// Validate a snapshot against the live game and hand back its state
pub fn restore(live: &GameState, snapshot: &Snapshot) -> Result<GameState> {
    if snapshot.game_id != live.id {
        return Err(GameError::SaveConflict(format!(
            "snapshot belongs to game {}",
            snapshot.game_id
        )));
    }
    if snapshot.schema_version != live.map.schema_version {
        return Err(GameError::SchemaMismatch {
            snapshot: snapshot.schema_version,
            live: live.map.schema_version,
        });
    }
    let mut state = snapshot.state.clone();
    state.turn_in_progress = false;
    Ok(state)
}
