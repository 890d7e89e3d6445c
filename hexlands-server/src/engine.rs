//! Serialized game service
//!
//! Every mutation of a game runs under that game's async mutex:
//! load, validate and mutate a working copy, then persist. Reads go straight
//! to the repository.

use crate::store::GameRepository;
use hexlands_core::actions::ActionEvent;
use hexlands_core::error::Result;
use hexlands_core::turn::AiTurn;
use hexlands_core::{
    attackable_tiles, expansion_cost, reachable_tiles, valid_expansion_tiles, CityId, Command, DamageModel,
    GameError, GameId, GameState, GridPosition, Opponent, ParticipantId, RulesConfig, SaveListing, SaveManager,
    SaveSummary, Scenario, Snapshot, TurnCoordinator, TurnPhase, TurnRecord, UnitId,
};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Wall clock in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Full state projection returned to clients
#[derive(Clone, Debug, Serialize)]
pub struct GameView {
    pub phase: TurnPhase,
    #[serde(flatten)]
    pub state: GameState,
}

impl From<GameState> for GameView {
    fn from(state: GameState) -> Self {
        Self {
            phase: TurnPhase::of(&state),
            state,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CommandOutcome {
    pub game: GameView,
    pub summary: ActionEvent,
    /// Turns closed because the command eliminated its own issuer
    pub committed: Vec<TurnRecord>,
    pub ai_turns: Vec<AiTurn>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EndTurnOutcome {
    pub game: GameView,
    pub committed: Vec<TurnRecord>,
    pub ai_turns: Vec<AiTurn>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UnitPreview {
    pub unit_id: UnitId,
    pub reachable: Vec<GridPosition>,
    pub attackable: Vec<GridPosition>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExpansionPreview {
    pub city_id: CityId,
    pub cost: u32,
    pub tiles: Vec<GridPosition>,
}

/// Authoritative owner of every game on this server
pub struct GameService {
    repo: Arc<dyn GameRepository>,
    saves: RwLock<SaveManager>,
    locks: Mutex<FxHashMap<GameId, Arc<tokio::sync::Mutex<()>>>>,
    rules: RulesConfig,
    damage: Box<dyn DamageModel>,
    opponent: Box<dyn Opponent>,
}

impl GameService {
    pub fn new(
        repo: Arc<dyn GameRepository>,
        rules: RulesConfig,
        damage: Box<dyn DamageModel>,
        opponent: Box<dyn Opponent>,
    ) -> Self {
        Self {
            repo,
            saves: RwLock::new(SaveManager::new(&rules)),
            locks: Mutex::new(FxHashMap::default()),
            rules,
            damage,
            opponent,
        }
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    fn game_lock(&self, game_id: GameId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(game_id)
            .or_default()
            .clone()
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub async fn create_game(&self, scenario: &Scenario, seed: Option<u64>) -> Result<GameView> {
        let game_id = self.repo.allocate_id().await;
        let now = now_ms();
        let seed = seed.unwrap_or(now as u64 ^ game_id.rotate_left(32));
        let state = scenario.to_game_state(game_id, seed, now)?;
        self.repo.save(&state).await?;
        info!(game_id, scenario = %scenario.name, seed, "game created");
        Ok(state.into())
    }

    pub async fn game(&self, game_id: GameId) -> Result<GameView> {
        Ok(self.repo.load(game_id).await?.into())
    }

    pub async fn turns(&self, game_id: GameId) -> Result<Vec<TurnRecord>> {
        self.repo.turns(game_id).await
    }

    /// Tiles a unit could move to or strike from where it stands
    pub async fn unit_preview(&self, game_id: GameId, unit_id: UnitId) -> Result<UnitPreview> {
        let state = self.repo.load(game_id).await?;
        let unit = state.unit(unit_id)?;
        let def = unit.def();
        let board = state.board();

        let blocked = |pos: GridPosition| {
            !state.is_passable(pos) || state.unit_at(pos).is_some_and(|u| u.id != unit_id)
        };
        let reachable = if unit.has_acted {
            Vec::new()
        } else {
            reachable_tiles(&board, unit.position, def.move_points, blocked)
                .into_iter()
                .filter(|pos| *pos != unit.position)
                .collect()
        };

        Ok(UnitPreview {
            unit_id,
            reachable,
            attackable: attackable_tiles(&board, unit.position, def.range_min, def.range_max),
        })
    }

    pub async fn expansion_preview(&self, game_id: GameId, city_id: CityId) -> Result<ExpansionPreview> {
        let state = self.repo.load(game_id).await?;
        let city = state.city(city_id)?;
        Ok(ExpansionPreview {
            city_id,
            cost: expansion_cost(&self.rules.expansion, city.tiles.len() as u32),
            tiles: valid_expansion_tiles(&state, city, &self.rules.expansion),
        })
    }

    pub fn list_saves(&self, game_id: GameId) -> SaveListing {
        self.saves.read().unwrap().list(game_id)
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Move, attack, spawn or expand
    pub async fn execute(&self, game_id: GameId, caller: ParticipantId, command: Command) -> Result<CommandOutcome> {
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        let mut working = self.repo.load(game_id).await?;
        let resolution = self.coordinator().execute(&mut working, caller, &command, now_ms())?;
        let report = resolution.handoff;
        for ai_turn in &report.ai_turns {
            self.check_ai_latency(game_id, ai_turn);
        }

        self.repo.commit(&working, report.records.clone()).await?;
        self.record_autosaves(report.autosaves);

        debug!(game_id, caller, ?command, "command applied");
        if !report.records.is_empty() {
            info!(
                game_id,
                turn_no = working.turn_no,
                active = working.active_participant,
                "turn handed over after elimination"
            );
        }
        if !working.is_active() {
            info!(game_id, winner = ?working.winner, "game finished");
        }
        Ok(CommandOutcome {
            game: working.into(),
            summary: resolution.event,
            committed: report.records,
            ai_turns: report.ai_turns,
        })
    }

    pub async fn end_turn(&self, game_id: GameId, caller: ParticipantId) -> Result<EndTurnOutcome> {
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        let mut working = self.repo.load(game_id).await?;
        let report = self.coordinator().end_turn(&mut working, caller, now_ms())?;
        for ai_turn in &report.ai_turns {
            self.check_ai_latency(game_id, ai_turn);
        }

        self.repo.commit(&working, report.records.clone()).await?;
        self.record_autosaves(report.autosaves);

        info!(
            game_id,
            turn_no = working.turn_no,
            active = working.active_participant,
            "turn advanced"
        );
        Ok(EndTurnOutcome {
            game: working.into(),
            committed: report.records,
            ai_turns: report.ai_turns,
        })
    }

    fn coordinator(&self) -> TurnCoordinator<'_> {
        TurnCoordinator::new(&self.rules, self.damage.as_ref(), self.opponent.as_ref()).with_clock(&now_ms)
    }

    /// Only after the commit has landed
    fn record_autosaves(&self, autosaves: Vec<Snapshot>) {
        let mut saves = self.saves.write().unwrap();
        for snapshot in autosaves {
            saves.record_autosave(snapshot);
        }
    }

    fn check_ai_latency(&self, game_id: GameId, ai_turn: &AiTurn) {
        let elapsed = ai_turn.elapsed_ms;
        if elapsed > self.rules.ai_escalate_ms {
            warn!(
                game_id,
                participant = ai_turn.participant_id,
                elapsed_ms = elapsed,
                "AI turn far over latency target"
            );
        } else if elapsed > self.rules.ai_warn_ms {
            warn!(
                game_id,
                participant = ai_turn.participant_id,
                elapsed_ms = elapsed,
                "AI turn over latency target"
            );
        }
    }

    // ========================================================================
    // SAVES
    // ========================================================================

    pub async fn save_slot(&self, game_id: GameId, caller: ParticipantId, slot: u8) -> Result<SaveSummary> {
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        let state = self.repo.load(game_id).await?;
        check_member(&state, caller)?;
        let summary = self.saves.write().unwrap().save_slot(&state, slot, now_ms())?;
        debug!(game_id, slot, turn_no = summary.turn_no, "manual save written");
        Ok(summary)
    }

    pub async fn delete_slot(&self, game_id: GameId, caller: ParticipantId, slot: u8) -> Result<()> {
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        let state = self.repo.load(game_id).await?;
        check_member(&state, caller)?;
        self.saves.write().unwrap().delete_slot(game_id, slot)
    }

    pub async fn load_slot(&self, game_id: GameId, caller: ParticipantId, slot: u8) -> Result<GameView> {
        self.restore(game_id, caller, |saves, live| saves.load_slot(live, slot))
            .await
    }

    pub async fn load_autosave(&self, game_id: GameId, caller: ParticipantId, turn_no: u32) -> Result<GameView> {
        self.restore(game_id, caller, |saves, live| saves.load_autosave(live, turn_no))
            .await
    }

    async fn restore<F>(&self, game_id: GameId, caller: ParticipantId, pick: F) -> Result<GameView>
    where
        F: FnOnce(&SaveManager, &GameState) -> Result<GameState>,
    {
        let lock = self.game_lock(game_id);
        let _guard = lock.lock().await;

        let live = self.repo.load(game_id).await?;
        check_member(&live, caller)?;
        let restored = {
            let saves = self.saves.read().unwrap();
            pick(&saves, &live)
        };
        let restored = restored.map_err(|err| {
            warn!(game_id, code = err.code(), %err, "load rejected");
            err
        })?;

        self.repo.save(&restored).await?;
        info!(game_id, turn_no = restored.turn_no, "game restored from save");
        Ok(restored.into())
    }
}

/// Only participants of a game may touch its saves
fn check_member(state: &GameState, caller: ParticipantId) -> Result<()> {
    if state.participant(caller).is_none() {
        return Err(GameError::NotOwner {
            participant: caller,
            entity: format!("game {}", state.id),
        });
    }
    Ok(())
}
