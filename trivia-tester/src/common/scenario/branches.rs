//! One scenario per skill-tree branch plus the full tree.
use anyhow::{Result, ensure};
use trivia_game::{RunPhase, SkillCatalog, SkillId};

use super::TestScenario;
use crate::logic::simulation::{SimulationSummary, checks};
use crate::logic::{PlayerStrategy, SimulationPlan};

fn branch_skills(branch: u8) -> Vec<SkillId> {
    SkillCatalog::builtin()
        .branch(branch)
        .map(|skill| skill.id)
        .collect()
}

fn base_plan(strategy: PlayerStrategy, skills: Vec<SkillId>) -> SimulationPlan {
    SimulationPlan::new(strategy)
        .with_skills(skills)
        .with_active_skills()
        .with_expectation(checks::reached_terminal)
        .with_expectation(checks::persisted_once)
        .with_expectation(checks::lives_within_max)
        .with_expectation(checks::activations_respected)
}

pub fn survivalist_scenario() -> TestScenario {
    let plan = base_plan(PlayerStrategy::Guesser, branch_skills(1))
        .with_expectation(survivalist_expectation);
    TestScenario::simulation("Survivalist Branch", plan)
}

fn survivalist_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.phase != RunPhase::GameOver,
        "game over despite Immortality"
    );
    ensure!(
        summary.max_lives > trivia_game::constants::BASE_LIVES,
        "max lives not raised: {}",
        summary.max_lives
    );
    Ok(())
}

pub fn strategist_scenario() -> TestScenario {
    let plan = base_plan(PlayerStrategy::Scholar { accuracy: 0.7 }, branch_skills(2))
        .with_expectation(checks::score_matches_correct);
    TestScenario::simulation("Strategist Branch", plan)
}

pub fn experience_scenario() -> TestScenario {
    let plan = base_plan(PlayerStrategy::Perfect, branch_skills(3))
        .with_expectation(checks::won)
        .with_expectation(experience_expectation);
    TestScenario::simulation("Experience Branch", plan)
}

fn experience_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.starting_xp > 0,
        "starting bonus did not seed the run"
    );
    let answered_xp = summary.xp_earned.saturating_sub(summary.starting_xp);
    ensure!(
        answered_xp > summary.base_xp,
        "multipliers earned {answered_xp} XP, no more than base {}",
        summary.base_xp
    );
    Ok(())
}

pub fn full_tree_scenario() -> TestScenario {
    let plan = base_plan(
        PlayerStrategy::Scholar { accuracy: 0.6 },
        SkillId::ALL.to_vec(),
    );
    TestScenario::simulation("Full Skill Tree", plan)
}
