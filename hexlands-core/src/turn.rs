//! Turn progression
//!
//! Ending a turn commits a ledger record, captures an autosave, hands play
//! to the next participant still standing, and pays that participant's
//! start-of-turn income. Consecutive AI participants are played out before
//! `turn_in_progress` is released.

use crate::actions::{check_can_act, ActionEvent, ActionResolver, Command, Resolution};
use crate::ai::Opponent;
use crate::combat::DamageModel;
use crate::config::{RulesConfig, UpkeepConfig};
use crate::error::Result;
use crate::game::{GameState, ParticipantId, ParticipantKind, ResourceType, TurnRecord};
use crate::saves::Snapshot;
use serde::{Deserialize, Serialize};

/// Where a game stands between requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    WaitingForHuman,
    EndingTurn,
    AiComputing,
    Finished,
}

impl TurnPhase {
    pub fn of(state: &GameState) -> Self {
        if !state.is_active() {
            return TurnPhase::Finished;
        }
        if state.turn_in_progress {
            return TurnPhase::EndingTurn;
        }
        match state.participant(state.active_participant).map(|p| p.kind) {
            Some(ParticipantKind::Ai) => TurnPhase::AiComputing,
            _ => TurnPhase::WaitingForHuman,
        }
    }
}

/// One AI turn played inside a request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiTurn {
    pub participant_id: ParticipantId,
    pub turn_no: u32,
    pub events: Vec<ActionEvent>,
    /// Time spent choosing and applying actions, zero without a clock
    pub elapsed_ms: u64,
}

/// Everything one request committed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnReport {
    pub records: Vec<TurnRecord>,
    pub autosaves: Vec<Snapshot>,
    pub ai_turns: Vec<AiTurn>,
    pub finished: bool,
}

/// Millisecond clock read around AI turns
pub type Clock<'a> = &'a (dyn Fn() -> i64 + Sync);

/// Drives the turn state machine
pub struct TurnCoordinator<'a> {
    rules: &'a RulesConfig,
    damage: &'a dyn DamageModel,
    opponent: &'a dyn Opponent,
    clock: Option<Clock<'a>>,
}

impl<'a> TurnCoordinator<'a> {
    pub fn new(rules: &'a RulesConfig, damage: &'a dyn DamageModel, opponent: &'a dyn Opponent) -> Self {
        Self {
            rules,
            damage,
            opponent,
            clock: None,
        }
    }

    /// Time AI turns with `clock` instead of reporting zero
    pub fn with_clock(mut self, clock: Clock<'a>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Run a player command, then any AI turns a forced handoff brings up
    pub fn execute(
        &self,
        state: &mut GameState,
        caller: ParticipantId,
        command: &Command,
        now_ms: i64,
    ) -> Result<Resolution> {
        let resolver = ActionResolver::new(self.rules, self.damage);
        let mut resolution = resolver.execute(state, caller, command, now_ms)?;

        if !resolution.handoff.records.is_empty() {
            state.turn_in_progress = true;
            self.play_ai_turns(state, now_ms, &mut resolution.handoff);
            state.turn_in_progress = false;
            resolution.handoff.finished = !state.is_active();
        }
        Ok(resolution)
    }

    /// End the caller's turn and play any AI turns that follow
    pub fn end_turn(&self, state: &mut GameState, caller: ParticipantId, now_ms: i64) -> Result<TurnReport> {
        check_can_act(state, caller)?;
        state.turn_in_progress = true;

        let mut report = TurnReport::default();
        let duration_ms = (now_ms - state.turn_started_at).max(0);
        self.commit(state, now_ms, duration_ms, String::new(), &mut report);
        self.play_ai_turns(state, now_ms, &mut report);

        state.turn_in_progress = false;
        report.finished = !state.is_active();
        Ok(report)
    }

    /// Let the opponent act for whoever holds the turn, then end it
    ///
    /// Drives participants that have no human behind them, as in batch
    /// simulation. Plays at most one round.
    pub fn play_turn(&self, state: &mut GameState, now_ms: i64) -> Result<TurnReport> {
        check_can_act(state, state.active_participant)?;
        state.turn_in_progress = true;

        let mut report = TurnReport::default();
        self.ai_turn(state, now_ms, &mut report);
        self.play_ai_turns(state, now_ms, &mut report);

        state.turn_in_progress = false;
        report.finished = !state.is_active();
        Ok(report)
    }

    /// Play consecutive AI participants until the round that `report`
    /// started is complete
    fn play_ai_turns(&self, state: &mut GameState, now_ms: i64, report: &mut TurnReport) {
        let round = state.participants.len();
        while report.records.len() < round {
            if !state.is_active() {
                break;
            }
            let is_ai = state
                .participant(state.active_participant)
                .is_some_and(|p| p.kind == ParticipantKind::Ai);
            if !is_ai {
                break;
            }
            self.ai_turn(state, now_ms, report);
        }
    }

    fn ai_turn(&self, state: &mut GameState, now_ms: i64, report: &mut TurnReport) {
        let participant_id = state.active_participant;
        let turn_no = state.turn_no;
        let resolver = ActionResolver::new(self.rules, self.damage);

        let started = self.read_clock(now_ms);
        let events = self.opponent.play_turn(state, &resolver, now_ms);
        let elapsed_ms = (self.read_clock(now_ms) - started).max(0) as u64;

        let summary = format!("{} actions", events.len());
        self.commit(state, now_ms, elapsed_ms as i64, summary, report);
        report.ai_turns.push(AiTurn {
            participant_id,
            turn_no,
            events,
            elapsed_ms,
        });
    }

    fn read_clock(&self, fallback: i64) -> i64 {
        self.clock.map_or(fallback, |clock| clock())
    }

    fn commit(&self, state: &mut GameState, now_ms: i64, duration_ms: i64, summary: String, report: &mut TurnReport) {
        let (record, snapshot) = close_turn(state, now_ms, duration_ms, summary, &self.rules.upkeep);
        report.records.push(record);
        report.autosaves.push(snapshot);
    }
}

/// Record the active participant's turn, then advance or finish
///
/// Returns the ledger record and the autosave tagged with the closed turn.
pub fn close_turn(
    state: &mut GameState,
    now_ms: i64,
    duration_ms: i64,
    summary: String,
    upkeep: &UpkeepConfig,
) -> (TurnRecord, Snapshot) {
    let turn_no = state.turn_no;
    let record = TurnRecord {
        game_id: state.id,
        turn_no,
        participant_id: state.active_participant,
        committed_at: now_ms,
        duration_ms,
        summary,
    };

    state.sweep_eliminations();
    if !state.check_victory(now_ms) {
        if let Some(next) = next_participant(state) {
            state.active_participant = next;
            state.turn_no += 1;
            state.turn_started_at = now_ms;
            start_of_turn(state, next, upkeep);
        }
    }

    (record, Snapshot::capture(state, turn_no, now_ms))
}

/// Next non-eliminated participant after the active one, in list order
pub fn next_participant(state: &GameState) -> Option<ParticipantId> {
    let count = state.participants.len();
    let current = state
        .participants
        .iter()
        .position(|p| p.id == state.active_participant)?;
    (1..=count)
        .map(|step| &state.participants[(current + step) % count])
        .find(|p| !p.eliminated)
        .map(|p| p.id)
}

/// Refresh units and pay city income for the participant about to play
pub fn start_of_turn(state: &mut GameState, participant: ParticipantId, upkeep: &UpkeepConfig) {
    for unit in state.units.iter_mut().filter(|u| u.participant_id == participant) {
        unit.has_acted = false;
    }

    for idx in 0..state.cities.len() {
        if state.cities[idx].participant_id != participant {
            continue;
        }
        let mut income = vec![
            (ResourceType::Food, upkeep.base_food),
            (ResourceType::Production, upkeep.base_production),
            (ResourceType::Gold, upkeep.base_gold),
        ];

        let tiles: Vec<_> = state.cities[idx].tiles.iter().copied().collect();
        for pos in tiles {
            let Some(kind) = state.map.tile(pos).and_then(|t| t.resource).map(|r| r.kind) else {
                continue;
            };
            if let Some(deposit) = state.tile_state_mut(pos) {
                let take = deposit.remaining.min(upkeep.harvest_per_tile);
                deposit.remaining -= take;
                if take > 0 {
                    income.push((kind, take));
                }
            }
        }

        let city = &mut state.cities[idx];
        for (kind, amount) in income {
            city.add_resource(kind, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{GreedyOpponent, PassiveOpponent};
    use crate::board::GridPosition;
    use crate::combat::{FlatDamage, StandardDamage};
    use crate::game::{GameMap, GameStatus, Terrain, TileResource};
    use std::sync::atomic::{AtomicI64, Ordering};
    use crate::units::unit_code_to_index;

    fn two_humans() -> GameState {
        let map = GameMap::filled("test", 15, 20, Terrain::Plains);
        let mut game = GameState::new(1, map, 42, 1_000);
        game.add_participant("alice", ParticipantKind::Human);
        game.add_participant("bob", ParticipantKind::Human);
        game.add_city(1, "Alpha", GridPosition::new(2, 2), 40);
        game.add_city(2, "Beta", GridPosition::new(12, 17), 40);
        game
    }

    fn end(game: &mut GameState, caller: ParticipantId, now_ms: i64) -> Result<TurnReport> {
        let rules = RulesConfig::default();
        let damage = StandardDamage::default();
        let opponent = GreedyOpponent::default();
        TurnCoordinator::new(&rules, &damage, &opponent).end_turn(game, caller, now_ms)
    }

    #[test]
    fn test_end_turn_advances() {
        let mut game = two_humans();
        let report = end(&mut game, 1, 4_000).unwrap();

        assert_eq!(game.turn_no, 2);
        assert_eq!(game.active_participant, 2);
        assert!(!game.turn_in_progress);
        assert_eq!(game.turn_started_at, 4_000);

        assert_eq!(report.autosaves.len(), 1);
        assert_eq!(report.autosaves[0].turn_no, 1);
        assert_eq!(report.autosaves[0].state.turn_no, 2);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].turn_no, 1);
        assert_eq!(report.records[0].participant_id, 1);
        assert_eq!(report.records[0].duration_ms, 3_000);
        assert!(report.ai_turns.is_empty());
    }

    #[test]
    fn test_end_turn_wrong_caller() {
        let mut game = two_humans();
        assert_eq!(end(&mut game, 2, 0).unwrap_err().code(), "NOT_YOUR_TURN");
        game.turn_in_progress = true;
        assert_eq!(end(&mut game, 1, 0).unwrap_err().code(), "TURN_IN_PROGRESS");
        game.turn_in_progress = false;
        game.status = GameStatus::Finished;
        assert_eq!(end(&mut game, 1, 0).unwrap_err().code(), "GAME_FINISHED");
    }

    #[test]
    fn test_round_robin_skips_eliminated() {
        let mut game = two_humans();
        game.add_participant("carol", ParticipantKind::Human);
        game.add_city(3, "Gamma", GridPosition::new(2, 17), 40);
        game.participant_mut(2).unwrap().eliminated = true;
        game.cities.retain(|c| c.participant_id != 2);

        end(&mut game, 1, 0).unwrap();
        assert_eq!(game.active_participant, 3);
        end(&mut game, 3, 0).unwrap();
        assert_eq!(game.active_participant, 1);
        assert_eq!(game.turn_no, 3);
    }

    #[test]
    fn test_upkeep_resets_units_and_harvests() {
        let mut game = two_humans();
        let deposit = GridPosition::new(12, 16);
        game.map.tile_mut(deposit).unwrap().resource = Some(TileResource {
            kind: ResourceType::Gold,
            amount: 3,
        });
        game.tile_states = vec![crate::game::GameTileState {
            position: deposit,
            remaining: 3,
        }];
        let war = unit_code_to_index("WAR").unwrap();
        let unit = game.add_unit(2, war, GridPosition::new(10, 10), true);

        end(&mut game, 1, 0).unwrap();
        let beta = &game.cities[1];
        assert_eq!(beta.resource(ResourceType::Food), 2);
        assert_eq!(beta.resource(ResourceType::Production), 3);
        assert_eq!(beta.resource(ResourceType::Gold), 4);
        assert_eq!(game.tile_states[0].remaining, 1);
        assert!(!game.unit(unit).unwrap().has_acted);

        // Alpha is not paid on bob's turn
        assert_eq!(game.cities[0].resource(ResourceType::Gold), 0);

        end(&mut game, 2, 0).unwrap();
        end(&mut game, 1, 0).unwrap();
        assert_eq!(game.cities[1].resource(ResourceType::Gold), 7);
        assert_eq!(game.tile_states[0].remaining, 0);
    }

    #[test]
    fn test_ai_turn_runs_inside_end_turn() {
        let map = GameMap::filled("test", 15, 20, Terrain::Plains);
        let mut game = GameState::new(1, map, 42, 0);
        game.add_participant("alice", ParticipantKind::Human);
        game.add_participant("bot", ParticipantKind::Ai);
        game.add_city(1, "Alpha", GridPosition::new(2, 2), 40);
        game.add_city(2, "Beta", GridPosition::new(12, 17), 40);

        let report = end(&mut game, 1, 0).unwrap();
        // Human turn 1, AI turn 2, back to the human on turn 3
        assert_eq!(game.turn_no, 3);
        assert_eq!(game.active_participant, 1);
        assert_eq!(report.records.len(), 2);
        let tags: Vec<u32> = report.autosaves.iter().map(|s| s.turn_no).collect();
        assert_eq!(tags, vec![1, 2]);
        assert_eq!(report.ai_turns.len(), 1);
        assert_eq!(report.ai_turns[0].participant_id, 2);
        assert!(report.autosaves.iter().all(|s| !s.state.turn_in_progress));
    }

    #[test]
    fn test_play_turn_for_all_ai_game() {
        let map = GameMap::filled("test", 15, 20, Terrain::Plains);
        let mut game = GameState::new(1, map, 42, 0);
        game.add_participant("red", ParticipantKind::Ai);
        game.add_participant("blue", ParticipantKind::Ai);
        game.add_city(1, "Red", GridPosition::new(2, 2), 40);
        game.add_city(2, "Blue", GridPosition::new(12, 17), 40);

        let rules = RulesConfig::default();
        let damage = StandardDamage::default();
        let opponent = PassiveOpponent;
        let report = TurnCoordinator::new(&rules, &damage, &opponent)
            .play_turn(&mut game, 0)
            .unwrap();
        // One full round, then control returns to the caller
        assert_eq!(report.ai_turns.len(), 2);
        assert_eq!(game.turn_no, 3);
        assert_eq!(game.active_participant, 1);
    }

    fn human_and_bot() -> GameState {
        let map = GameMap::filled("test", 15, 20, Terrain::Plains);
        let mut game = GameState::new(1, map, 42, 0);
        game.add_participant("alice", ParticipantKind::Human);
        game.add_participant("bot", ParticipantKind::Ai);
        game.add_city(1, "Alpha", GridPosition::new(2, 2), 40);
        game.add_city(2, "Beta", GridPosition::new(12, 17), 40);
        game
    }

    #[test]
    fn test_ai_turn_timed_by_clock() {
        let rules = RulesConfig::default();
        let damage = StandardDamage::default();
        let opponent = PassiveOpponent;

        let ticks = AtomicI64::new(10_000);
        let clock = || ticks.fetch_add(250, Ordering::Relaxed);
        let mut game = human_and_bot();
        let report = TurnCoordinator::new(&rules, &damage, &opponent)
            .with_clock(&clock)
            .end_turn(&mut game, 1, 0)
            .unwrap();
        assert_eq!(report.ai_turns[0].elapsed_ms, 250);
        assert_eq!(report.records[1].duration_ms, 250);

        // Without a clock the core never reads wall time
        let mut game = human_and_bot();
        let report = TurnCoordinator::new(&rules, &damage, &opponent)
            .end_turn(&mut game, 1, 0)
            .unwrap();
        assert_eq!(report.ai_turns[0].elapsed_ms, 0);
    }

    #[test]
    fn test_forced_handoff_plays_following_ai() {
        let mut game = human_and_bot();
        game.add_participant("carol", ParticipantKind::Human);
        game.add_city(3, "Gamma", GridPosition::new(2, 17), 40);
        game.cities.retain(|c| c.participant_id != 1);
        let war = game.add_unit(1, unit_code_to_index("WAR").unwrap(), GridPosition::new(5, 5), false);
        let spear = game.add_unit(2, unit_code_to_index("SPR").unwrap(), GridPosition::new(5, 6), false);

        let rules = RulesConfig::default();
        let damage = FlatDamage(21);
        let opponent = PassiveOpponent;
        let command = Command::AttackUnit { attacker_unit_id: war, target_unit_id: spear };
        let resolution = TurnCoordinator::new(&rules, &damage, &opponent)
            .execute(&mut game, 1, &command, 900)
            .unwrap();

        let report = resolution.handoff;
        let closed: Vec<(u32, ParticipantId)> = report.records.iter().map(|r| (r.turn_no, r.participant_id)).collect();
        assert_eq!(closed, vec![(1, 1), (2, 2)]);
        assert_eq!(report.ai_turns.len(), 1);
        assert_eq!(game.active_participant, 3);
        assert_eq!(game.turn_no, 3);
        assert!(!game.turn_in_progress);
        assert_eq!(TurnPhase::of(&game), TurnPhase::WaitingForHuman);
    }

    #[test]
    fn test_no_turns_after_finish() {
        let mut game = two_humans();
        game.cities.retain(|c| c.participant_id != 2);
        let report = end(&mut game, 1, 50).unwrap();
        assert!(report.finished);
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Some(1));
        assert_eq!(game.finished_at, Some(50));
        assert_eq!(game.turn_no, 1);
        assert_eq!(end(&mut game, 1, 60).unwrap_err().code(), "GAME_FINISHED");
    }

    #[test]
    fn test_phase() {
        let mut game = two_humans();
        assert_eq!(TurnPhase::of(&game), TurnPhase::WaitingForHuman);
        game.turn_in_progress = true;
        assert_eq!(TurnPhase::of(&game), TurnPhase::EndingTurn);
        game.turn_in_progress = false;
        game.participants[0].kind = ParticipantKind::Ai;
        assert_eq!(TurnPhase::of(&game), TurnPhase::AiComputing);
        game.status = GameStatus::Finished;
        assert_eq!(TurnPhase::of(&game), TurnPhase::Finished);
    }
}
