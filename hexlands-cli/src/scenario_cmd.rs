//! Scenario command - generate a random scenario file
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_scenario(), write_scenario()
//! - Level 3: (delegated to hexlands-core Scenario)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use hexlands_core::Scenario;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct ScenarioArgs {
    /// Where to write the scenario JSON
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    /// Scenario name
    #[arg(long, default_value = "Generated")]
    pub name: String,

    #[arg(long, default_value = "15")]
    pub rows: i32,

    #[arg(long, default_value = "20")]
    pub cols: i32,

    /// Map seed (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: ScenarioArgs) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let scenario = build_scenario(&args, seed)?;
    write_scenario(&scenario, &args)?;

    tracing::info!(
        "Wrote {}x{} scenario '{}' (seed {}) to {}",
        args.rows,
        args.cols,
        scenario.name,
        seed,
        args.output.display()
    );
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_scenario(args: &ScenarioArgs, seed: u64) -> Result<Scenario> {
    Scenario::generate(&args.name, args.rows, args.cols, seed)
        .with_context(|| format!("Failed to generate {}x{} scenario", args.rows, args.cols))
}

fn write_scenario(scenario: &Scenario, args: &ScenarioArgs) -> Result<()> {
    scenario
        .save(&args.output)
        .with_context(|| format!("Failed to write scenario: {}", args.output.display()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn args(output: PathBuf, rows: i32, cols: i32) -> ScenarioArgs {
        ScenarioArgs {
            output,
            name: "Test".to_string(),
            rows,
            cols,
            seed: Some(3),
        }
    }

    #[test]
    fn test_generated_scenario_round_trips_to_disk() {
        let path = std::env::temp_dir().join(format!("hexlands_scenario_{}.json", std::process::id()));
        run(args(path.clone(), 12, 14)).unwrap();

        let loaded = Scenario::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.name, "Test");
        assert_eq!(loaded.map.rows, 12);
        assert_eq!(loaded.map.cols, 14);
        assert_eq!(loaded, Scenario::generate("Test", 12, 14, 3).unwrap());
    }

    #[test]
    fn test_tiny_map_rejected() {
        let a = args(PathBuf::from("unused.json"), 4, 4);
        assert!(build_scenario(&a, 1).is_err());
    }
}
