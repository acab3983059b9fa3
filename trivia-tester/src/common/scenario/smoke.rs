use anyhow::{Result, ensure};

use super::TestScenario;
use crate::logic::simulation::{SimulationSummary, checks};
use crate::logic::{PlayerStrategy, SimulationPlan};

pub fn smoke_scenario() -> TestScenario {
    let plan = SimulationPlan::new(PlayerStrategy::Perfect)
        .with_max_answers(120)
        .with_expectation(checks::won)
        .with_expectation(checks::persisted_once)
        .with_expectation(checks::score_matches_correct)
        .with_expectation(smoke_expectation);
    TestScenario::simulation("Smoke Test", plan)
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.answers == summary.correct,
        "perfect player missed {} answers",
        summary.answers - summary.correct
    );
    ensure!(
        summary.xp_earned == summary.base_xp,
        "skill-free run earned {} XP, expected {}",
        summary.xp_earned,
        summary.base_xp
    );
    ensure!(summary.highest_level == 5, "never reached level 5");
    Ok(())
}
