use anyhow::{Result, ensure};

use super::TestScenario;
use crate::logic::simulation::{QuestionSetup, SimulationSummary, checks};
use crate::logic::{PlayerStrategy, SimulationPlan};

pub fn fallback_scenario() -> TestScenario {
    let plan = SimulationPlan::new(PlayerStrategy::Scholar { accuracy: 0.8 })
        .with_questions(QuestionSetup::Unavailable)
        .with_expectation(checks::reached_terminal)
        .with_expectation(checks::persisted_once)
        .with_expectation(fallback_expectation);
    TestScenario::simulation("Fallback Questions", plan)
}

fn fallback_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.fallback_questions, "fallback set was not used");
    ensure!(summary.answers > 0, "no question was shown");
    Ok(())
}
