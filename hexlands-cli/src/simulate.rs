//! Simulate command - play AI-only games on a scenario
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_scenario(), play_simulation(), report_results()
//! - Level 3: play_single_game(), compute_statistics()
//! - Level 4: formatting utilities

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use hexlands_core::{GameState, GreedyOpponent, ParticipantKind, RulesConfig, Scenario, StandardDamage, TurnCoordinator};

/// Simulated milliseconds between committed turns
const TURN_CLOCK_MS: i64 = 1_000;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SimulateArgs {
    /// Scenario JSON file (defaults to the built-in Riverlands duel)
    #[arg(long, value_name = "FILE")]
    pub scenario: Option<PathBuf>,

    /// Number of games to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Stop a game once its turn number passes this
    #[arg(long, default_value = "200")]
    pub max_turns: u32,

    /// Master seed for per-game combat seeds
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug, Serialize)]
struct GameRecord {
    game_number: usize,
    seed: u64,
    /// Winner's name, `None` when the turn cap was hit
    winner: Option<String>,
    turns: u32,
    actions: usize,
    units_left: usize,
}

/// Aggregated simulation results
#[derive(Clone, Debug)]
struct SimulationResults {
    scenario: String,
    games: Vec<GameRecord>,
    wins: BTreeMap<String, usize>,
    unfinished: usize,
    avg_turns: f32,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulate command
///
/// 1. Load the scenario and hand every seat to the AI
/// 2. Play all games
/// 3. Report results
pub fn run(args: SimulateArgs) -> Result<()> {
    let scenario = load_scenario(&args)?;

    tracing::info!(
        "Simulating {} games of {} (max {} turns)",
        args.games,
        scenario.name,
        args.max_turns
    );

    let results = play_simulation(&scenario, &args)?;

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Load the scenario and make every participant AI-driven
fn load_scenario(args: &SimulateArgs) -> Result<Scenario> {
    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path).with_context(|| format!("Failed to load scenario: {}", path.display()))?,
        None => Scenario::default(),
    };
    for participant in &mut scenario.participants {
        participant.kind = ParticipantKind::Ai;
    }
    Ok(scenario)
}

/// Play all games in the simulation
fn play_simulation(scenario: &Scenario, args: &SimulateArgs) -> Result<SimulationResults> {
    let mut rng = create_rng(args.seed);
    let rules = RulesConfig::default();
    let progress = create_progress(args)?;

    let mut games = Vec::with_capacity(args.games);
    for game_number in 1..=args.games {
        let seed: u64 = rng.gen();
        let record = play_single_game(scenario, &rules, game_number, seed, args.max_turns)?;

        tracing::debug!(
            "Game {}: winner={:?} ({} turns, {} actions)",
            record.game_number,
            record.winner,
            record.turns,
            record.actions
        );

        games.push(record);
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    Ok(compute_statistics(&scenario.name, games))
}

/// Report simulation results
fn report_results(results: &SimulationResults, args: &SimulateArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game until someone wins or the turn cap is passed
fn play_single_game(
    scenario: &Scenario,
    rules: &RulesConfig,
    game_number: usize,
    seed: u64,
    max_turns: u32,
) -> Result<GameRecord> {
    let mut state = scenario.to_game_state(game_number as u64, seed, 0)?;
    let damage = StandardDamage::default();
    let opponent = GreedyOpponent::new(rules.expansion.clone());
    let coordinator = TurnCoordinator::new(rules, &damage, &opponent);

    let mut clock = 0;
    let mut actions = 0;
    while state.is_active() && state.turn_no <= max_turns {
        let report = coordinator.play_turn(&mut state, clock)?;
        actions += report.ai_turns.iter().map(|t| t.events.len()).sum::<usize>();
        clock += TURN_CLOCK_MS * report.records.len().max(1) as i64;
    }

    Ok(GameRecord {
        game_number,
        seed,
        winner: winner_name(&state),
        turns: state.turn_no,
        actions,
        units_left: state.units.len(),
    })
}

/// Aggregate game records into win counts and averages
fn compute_statistics(scenario: &str, games: Vec<GameRecord>) -> SimulationResults {
    let mut wins = BTreeMap::new();
    let mut unfinished = 0;
    for game in &games {
        match &game.winner {
            Some(name) => *wins.entry(name.clone()).or_insert(0) += 1,
            None => unfinished += 1,
        }
    }

    let total_turns: u32 = games.iter().map(|g| g.turns).sum();
    let avg_turns = if games.is_empty() {
        0.0
    } else {
        total_turns as f32 / games.len() as f32
    };

    SimulationResults {
        scenario: scenario.to_string(),
        games,
        wins,
        unfinished,
        avg_turns,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Progress bar for text runs with more than one game
fn create_progress(args: &SimulateArgs) -> Result<Option<ProgressBar>> {
    if args.json || args.games < 2 {
        return Ok(None);
    }
    let pb = ProgressBar::new(args.games as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})")?
            .progress_chars("=>-"),
    );
    Ok(Some(pb))
}

fn winner_name(state: &GameState) -> Option<String> {
    state
        .winner
        .and_then(|id| state.participant(id))
        .map(|p| p.name.clone())
}

/// Print results as JSON
fn print_json_results(results: &SimulationResults) {
    #[derive(Serialize)]
    struct JsonOutput<'a> {
        scenario: &'a str,
        total_games: usize,
        wins: &'a BTreeMap<String, usize>,
        unfinished: usize,
        avg_turns: f32,
        games: &'a [GameRecord],
    }

    let output = JsonOutput {
        scenario: &results.scenario,
        total_games: results.games.len(),
        wins: &results.wins,
        unfinished: results.unfinished,
        avg_turns: results.avg_turns,
        games: &results.games,
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &SimulationResults) {
    let total = results.games.len();

    println!("\n=== Simulation Results: {} ===", results.scenario);
    println!("Total games: {}", total);
    for (name, wins) in &results.wins {
        println!("{:<12} {} ({:.1}%)", format!("{name}:"), wins, percent(*wins, total));
    }
    println!(
        "{:<12} {} ({:.1}%)",
        "Unfinished:",
        results.unfinished,
        percent(results.unfinished, total)
    );
    println!("Avg turns:   {:.1}", results.avg_turns);
}

fn percent(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f32 / total as f32
    }
}

// ============================================================================
// TESTS
// ============================================================================
