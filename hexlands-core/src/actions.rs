//! Command validation and resolution
//!
//! Every handler validates completely before touching the state, so a
//! rejected command leaves the game exactly as it was.

use crate::board::GridPosition;
use crate::combat::{DamageModel, CITY_DEFENCE, ROLL_BOUND};
use crate::config::RulesConfig;
use crate::error::{GameError, Result};
use crate::game::{City, CityId, GameState, ParticipantId, ResourceType, Unit, UnitId};
use crate::pathfind::find_path;
use crate::territory::{expansion_cost, valid_expansion_tiles};
use crate::turn::{close_turn, TurnReport};
use crate::units::{get_unit_type, unit_code_to_index};
use serde::{Deserialize, Serialize};

// ============================================================================
// COMMANDS AND EVENTS
// ============================================================================

/// A player command against one game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    MoveUnit {
        unit_id: UnitId,
        target: GridPosition,
    },
    AttackUnit {
        attacker_unit_id: UnitId,
        target_unit_id: UnitId,
    },
    AttackCity {
        attacker_unit_id: UnitId,
        target_city_id: CityId,
    },
    SpawnUnit {
        city_id: CityId,
        unit_code: String,
    },
    ExpandTerritory {
        city_id: CityId,
        target: GridPosition,
    },
}

/// What a resolved command did
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActionEvent {
    Moved {
        unit_id: UnitId,
        from: GridPosition,
        to: GridPosition,
        path: Vec<GridPosition>,
    },
    UnitCombat {
        attacker_id: UnitId,
        target_id: UnitId,
        damage_dealt: u32,
        damage_taken: u32,
        attacker_hp: u32,
        target_hp: u32,
        eliminated: Vec<ParticipantId>,
    },
    CityAttacked {
        attacker_id: UnitId,
        city_id: CityId,
        damage: u32,
        city_hp: u32,
        captured_from: Option<ParticipantId>,
        eliminated: Vec<ParticipantId>,
    },
    Spawned {
        city_id: CityId,
        unit_id: UnitId,
        unit_code: String,
        position: GridPosition,
        cost: u32,
    },
    Expanded {
        city_id: CityId,
        tile: GridPosition,
        cost: u32,
    },
}

/// A resolved player command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub event: ActionEvent,
    /// Turns closed as a consequence; empty unless the command cost the
    /// actor its last unit and city
    pub handoff: TurnReport,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Validates and applies commands against a game state
pub struct ActionResolver<'a> {
    rules: &'a RulesConfig,
    damage: &'a dyn DamageModel,
}

impl<'a> ActionResolver<'a> {
    pub fn new(rules: &'a RulesConfig, damage: &'a dyn DamageModel) -> Self {
        Self { rules, damage }
    }

    /// Run a player command after the turn-order preconditions
    ///
    /// An actor eliminated by its own command (a lost counterattack) cannot
    /// keep the turn: it is closed and handed to the next participant.
    pub fn execute(
        &self,
        state: &mut GameState,
        caller: ParticipantId,
        command: &Command,
        now_ms: i64,
    ) -> Result<Resolution> {
        check_can_act(state, caller)?;
        let event = self.resolve(state, caller, command, now_ms)?;

        let mut handoff = TurnReport::default();
        if state.is_active() && state.participant(caller).is_some_and(|p| p.eliminated) {
            let duration_ms = (now_ms - state.turn_started_at).max(0);
            let (record, snapshot) =
                close_turn(state, now_ms, duration_ms, "eliminated".to_string(), &self.rules.upkeep);
            handoff.records.push(record);
            handoff.autosaves.push(snapshot);
        }
        handoff.finished = !state.is_active();
        Ok(Resolution { event, handoff })
    }

    /// Apply a command for `actor` without turn-order checks
    ///
    /// Used directly by the AI, which acts while the turn lock is held.
    pub fn resolve(
        &self,
        state: &mut GameState,
        actor: ParticipantId,
        command: &Command,
        now_ms: i64,
    ) -> Result<ActionEvent> {
        if !state.is_active() {
            return Err(GameError::GameFinished);
        }

        let event = match command {
            Command::MoveUnit { unit_id, target } => move_unit(state, actor, *unit_id, *target)?,
            Command::AttackUnit {
                attacker_unit_id,
                target_unit_id,
            } => self.attack_unit(state, actor, *attacker_unit_id, *target_unit_id)?,
            Command::AttackCity {
                attacker_unit_id,
                target_city_id,
            } => self.attack_city(state, actor, *attacker_unit_id, *target_city_id)?,
            Command::SpawnUnit { city_id, unit_code } => spawn_unit(state, actor, *city_id, unit_code)?,
            Command::ExpandTerritory { city_id, target } => self.expand(state, actor, *city_id, *target)?,
        };

        state.check_victory(now_ms);
        Ok(event)
    }

    fn attack_unit(
        &self,
        state: &mut GameState,
        actor: ParticipantId,
        attacker_id: UnitId,
        target_id: UnitId,
    ) -> Result<ActionEvent> {
        let attacker = ready_unit(state, actor, attacker_id)?.clone();
        let target = state.unit(target_id)?.clone();
        if target.participant_id == actor {
            return Err(GameError::InvalidTarget(format!("unit {target_id} is friendly")));
        }
        if state
            .participant(target.participant_id)
            .map_or(true, |p| p.eliminated)
        {
            return Err(GameError::InvalidTarget(format!("unit {target_id} has no living owner")));
        }

        let att_def = attacker.def();
        let tgt_def = target.def();
        let distance = attacker.position.distance_to(target.position);
        if !att_def.covers(distance) {
            return Err(GameError::OutOfRange {
                distance,
                min: att_def.range_min,
                max: att_def.range_max,
            });
        }

        let roll = state.next_roll(ROLL_BOUND);
        let damage_dealt = self.damage.damage(att_def.attack, tgt_def.defence, roll);
        let target_hp = target.hp.saturating_sub(damage_dealt);

        // Ranged attackers never take a counterattack
        let mut damage_taken = 0;
        if !att_def.is_ranged && target_hp > 0 && tgt_def.covers(distance) {
            let roll = state.next_roll(ROLL_BOUND);
            damage_taken = self.damage.damage(tgt_def.attack, att_def.defence, roll);
        }
        let attacker_hp = attacker.hp.saturating_sub(damage_taken);

        state.unit_mut(target_id)?.hp = target_hp;
        let unit = state.unit_mut(attacker_id)?;
        unit.hp = attacker_hp;
        unit.has_acted = true;
        let eliminated = state.sweep_eliminations();

        Ok(ActionEvent::UnitCombat {
            attacker_id,
            target_id,
            damage_dealt,
            damage_taken,
            attacker_hp,
            target_hp,
            eliminated,
        })
    }

    fn attack_city(
        &self,
        state: &mut GameState,
        actor: ParticipantId,
        attacker_id: UnitId,
        city_id: CityId,
    ) -> Result<ActionEvent> {
        let attacker = ready_unit(state, actor, attacker_id)?.clone();
        let city = state.city(city_id)?;
        if city.participant_id == actor {
            return Err(GameError::InvalidTarget(format!("city {city_id} is friendly")));
        }

        let att_def = attacker.def();
        let distance = attacker.position.distance_to(city.position);
        if !att_def.covers(distance) {
            return Err(GameError::OutOfRange {
                distance,
                min: att_def.range_min,
                max: att_def.range_max,
            });
        }

        let roll = state.next_roll(ROLL_BOUND);
        let damage = self.damage.damage(att_def.attack, CITY_DEFENCE, roll);

        let city = state.city_mut(city_id)?;
        city.hp = city.hp.saturating_sub(damage);
        let mut captured_from = None;
        if city.hp == 0 {
            // Territory and resources change hands untouched
            captured_from = Some(city.participant_id);
            city.participant_id = actor;
            city.hp = (city.max_hp / 2).max(1);
        }
        let city_hp = city.hp;

        state.unit_mut(attacker_id)?.has_acted = true;
        let eliminated = state.sweep_eliminations();

        Ok(ActionEvent::CityAttacked {
            attacker_id,
            city_id,
            damage,
            city_hp,
            captured_from,
            eliminated,
        })
    }

    fn expand(
        &self,
        state: &mut GameState,
        actor: ParticipantId,
        city_id: CityId,
        target: GridPosition,
    ) -> Result<ActionEvent> {
        let city = owned_city(state, actor, city_id)?;
        let config = &self.rules.expansion;
        if !valid_expansion_tiles(state, city, config).contains(&target) {
            return Err(GameError::IllegalMove(format!(
                "city {city_id} cannot expand to {target}"
            )));
        }
        let cost = expansion_cost(config, city.tiles.len() as u32);

        let city = state.city_mut(city_id)?;
        city.spend(ResourceType::Gold, cost)?;
        city.tiles.insert(target);

        Ok(ActionEvent::Expanded {
            city_id,
            tile: target,
            cost,
        })
    }
}

// ============================================================================
// PRECONDITIONS
// ============================================================================

/// Turn-order gate shared by every player mutation
pub fn check_can_act(state: &GameState, caller: ParticipantId) -> Result<()> {
    if !state.is_active() {
        return Err(GameError::GameFinished);
    }
    if state.turn_in_progress {
        return Err(GameError::TurnInProgress);
    }
    if caller != state.active_participant {
        return Err(GameError::NotYourTurn(caller));
    }
    Ok(())
}

/// Unit owned by `actor` that has not acted yet
fn ready_unit(state: &GameState, actor: ParticipantId, unit_id: UnitId) -> Result<&Unit> {
    let unit = state.unit(unit_id)?;
    if unit.participant_id != actor {
        return Err(GameError::NotOwner {
            participant: actor,
            entity: format!("unit {unit_id}"),
        });
    }
    if unit.has_acted {
        return Err(GameError::NoActionsLeft(unit_id));
    }
    Ok(unit)
}

fn owned_city(state: &GameState, actor: ParticipantId, city_id: CityId) -> Result<&City> {
    let city = state.city(city_id)?;
    if city.participant_id != actor {
        return Err(GameError::NotOwner {
            participant: actor,
            entity: format!("city {city_id}"),
        });
    }
    Ok(city)
}

// ============================================================================
// HANDLERS
// ============================================================================

fn move_unit(
    state: &mut GameState,
    actor: ParticipantId,
    unit_id: UnitId,
    target: GridPosition,
) -> Result<ActionEvent> {
    let unit = ready_unit(state, actor, unit_id)?;
    let from = unit.position;
    let board = state.board();

    if target == from {
        return Err(GameError::IllegalMove(format!("unit {unit_id} is already at {target}")));
    }
    if !board.contains(target) {
        return Err(GameError::IllegalMove(format!("{target} is off the board")));
    }
    if state.unit_at(target).is_some() {
        return Err(GameError::OneUnitPerTile(target.to_string()));
    }
    if !state.is_passable(target) {
        return Err(GameError::IllegalMove(format!("{target} is impassable")));
    }

    let move_points = unit.def().move_points;
    let blocked = |pos: GridPosition| {
        !state.is_passable(pos) || state.unit_at(pos).is_some_and(|u| u.id != unit_id)
    };
    let path = find_path(&board, from, target, move_points, blocked).ok_or_else(|| {
        GameError::IllegalMove(format!("no path to {target} within {move_points} move points"))
    })?;

    let unit = state.unit_mut(unit_id)?;
    unit.position = target;
    unit.has_acted = true;

    Ok(ActionEvent::Moved {
        unit_id,
        from,
        to: target,
        path,
    })
}

/// First free tile for a new unit: the city center, then owned adjacent tiles
pub fn spawn_tile(state: &GameState, city_id: CityId) -> Result<Option<GridPosition>> {
    let city = state.city(city_id)?;
    let free = |pos: GridPosition| state.is_passable(pos) && state.unit_at(pos).is_none();
    if free(city.position) {
        return Ok(Some(city.position));
    }
    Ok(state
        .board()
        .neighbors(city.position)
        .filter(|pos| city.tiles.contains(pos))
        .filter(|pos| free(*pos))
        .min())
}

fn spawn_unit(
    state: &mut GameState,
    actor: ParticipantId,
    city_id: CityId,
    unit_code: &str,
) -> Result<ActionEvent> {
    let city = owned_city(state, actor, city_id)?;
    let type_id = unit_code_to_index(unit_code)
        .ok_or_else(|| GameError::InvalidTarget(format!("unknown unit type {unit_code}")))?;
    let cost = get_unit_type(type_id).cost;

    let available = city.resource(ResourceType::Production);
    if available < cost {
        return Err(GameError::InsufficientResources {
            needed: cost,
            available,
        });
    }
    let position = spawn_tile(state, city_id)?.ok_or(GameError::SpawnBlocked(city_id))?;

    state.city_mut(city_id)?.spend(ResourceType::Production, cost)?;
    // Fresh units wait a turn before acting
    let unit_id = state.add_unit(actor, type_id, position, true);

    Ok(ActionEvent::Spawned {
        city_id,
        unit_id,
        unit_code: unit_code.to_string(),
        position,
        cost,
    })
}

// ============================================================================
// TESTS
// ============================================================================
