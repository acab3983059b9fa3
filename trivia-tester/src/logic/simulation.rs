use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use trivia_game::constants::XP_PER_LEVEL;
use trivia_game::{
    ActivationOutcome, ActivationRejection, GameEngine, MemoryStore, ProgressionRecord,
    ProgressionStore, QuestionRecord, QuestionRepository, QuestionSource, RecordingSurface,
    RunPhase, SkillCatalog, SkillId, UnavailableSource,
};

use crate::logic::policy::{PlayerPolicy, PlayerStrategy};

/// Where a simulated run gets its questions.
#[derive(Debug, Clone)]
pub enum QuestionSetup {
    /// The packs embedded in the game crate.
    Bundled,
    /// Every source fails, forcing the built-in fallback set.
    Unavailable,
    /// A pool loaded once up front, e.g. from `--questions`.
    Records(Rc<Vec<QuestionRecord>>),
}

impl QuestionSetup {
    fn repository(&self) -> QuestionRepository {
        match self {
            Self::Bundled => QuestionRepository::bundled(),
            Self::Unavailable => {
                let sources: Vec<Box<dyn QuestionSource>> = (1..=5)
                    .map(|tier| {
                        Box::new(UnavailableSource::new(format!("level{tier}")))
                            as Box<dyn QuestionSource>
                    })
                    .collect();
                QuestionRepository::new(sources)
            }
            Self::Records(records) => QuestionRepository::from_records(records.as_ref().clone()),
        }
    }
}

/// Declarative plan for a simulated run.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: PlayerStrategy,
    /// Skills unlocked before the run starts.
    pub skills: Vec<SkillId>,
    /// Active skills the policy may trigger, in the order they are offered.
    pub activations: Vec<SkillId>,
    pub questions: QuestionSetup,
    pub max_answers: u32,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: PlayerStrategy) -> Self {
        Self {
            strategy,
            skills: Vec::new(),
            activations: Vec::new(),
            questions: QuestionSetup::Bundled,
            max_answers: 500,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_skills(mut self, skills: impl IntoIterator<Item = SkillId>) -> Self {
        self.skills.extend(skills);
        self
    }

    /// Offer every unlocked active skill to the policy.
    #[must_use]
    pub fn with_active_skills(mut self) -> Self {
        let catalog = SkillCatalog::builtin();
        self.activations = self
            .skills
            .iter()
            .copied()
            .filter(|id| catalog.is_active(*id))
            .collect();
        self
    }

    #[must_use]
    pub fn with_questions(mut self, questions: QuestionSetup) -> Self {
        self.questions = questions;
        self
    }

    #[must_use]
    pub const fn with_max_answers(mut self, max_answers: u32) -> Self {
        self.max_answers = max_answers;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn = Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Last answers of a run, kept for failure messages.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    pub question: String,
    pub tier: u8,
    pub answer: String,
    pub correct: bool,
    pub rationale: Option<String>,
}

/// Everything a scenario expectation may inspect about one run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: String,
    pub phase: RunPhase,
    /// The answer cap was hit before a terminal phase.
    pub halted: bool,
    pub answers: u32,
    pub correct: u32,
    pub converted: u32,
    pub forgiven: u32,
    pub retries: u32,
    pub score: u32,
    pub xp_earned: u64,
    /// XP the same answers would have earned with no skills.
    pub base_xp: u64,
    pub starting_xp: u64,
    pub max_lives: u32,
    pub highest_level: u8,
    /// Times lives were observed above the maximum.
    pub lives_over_max: u32,
    pub runs_recorded: u32,
    pub persisted_xp_gain: u64,
    pub late_answer_rejected: bool,
    pub fallback_questions: bool,
    pub applied: Vec<SkillId>,
    pub rejected: Vec<(SkillId, ActivationRejection)>,
    pub notices: usize,
    pub recent: Vec<AnswerRecord>,
}

impl SimulationSummary {
    #[must_use]
    pub fn ended(&self) -> bool {
        self.phase.is_terminal()
    }
}

const RECENT_ANSWERS: usize = 3;

/// Play one seeded run of `plan` from a fresh profile.
pub fn run_plan(plan: &SimulationPlan, seed: u64, verbose: bool) -> SimulationSummary {
    let backend = MemoryStore::new();
    let record = ProgressionRecord {
        unlocked_skill_ids: plan.skills.iter().map(|id| id.to_string()).collect(),
        ..ProgressionRecord::default()
    };
    if !ProgressionStore::new(backend.clone()).save(&record) {
        log::warn!("could not seed the profile for seed {seed}");
    }

    let mut engine = GameEngine::new(plan.questions.repository(), backend);
    let fallback_questions = !engine.load_questions();
    let before = engine.record();
    let mut policy: Box<dyn PlayerPolicy> = plan.strategy.create_policy(seed);
    let mut surface = RecordingSurface::new();
    let mut session = engine.new_session(seed);

    let mut summary = SimulationSummary {
        seed,
        strategy: plan.strategy.label(),
        phase: RunPhase::NotStarted,
        halted: false,
        answers: 0,
        correct: 0,
        converted: 0,
        forgiven: 0,
        retries: 0,
        score: 0,
        xp_earned: 0,
        base_xp: 0,
        starting_xp: 0,
        max_lives: 0,
        highest_level: 1,
        lives_over_max: 0,
        runs_recorded: 0,
        persisted_xp_gain: 0,
        late_answer_rejected: false,
        fallback_questions,
        applied: Vec::new(),
        rejected: Vec::new(),
        notices: 0,
        recent: Vec::new(),
    };

    {
        let mut ctx = engine.run_context(&mut surface);
        session.start(&mut ctx);
        summary.starting_xp = session.state().xp_earned;
        summary.max_lives = session.state().max_lives;

        while session.phase() == RunPhase::Running {
            if summary.answers >= plan.max_answers {
                summary.halted = true;
                break;
            }
            let catalog = SkillCatalog::builtin();
            for skill in &plan.activations {
                let Some(question) = session.current_question() else {
                    break;
                };
                if !session.available_actives(catalog).contains(skill)
                    || !policy.wants_activation(*skill, question)
                {
                    continue;
                }
                match session.activate(&mut ctx, skill.as_str(), None) {
                    ActivationOutcome::Applied { skill, .. } => summary.applied.push(skill),
                    ActivationOutcome::Rejected(reason) => summary.rejected.push((*skill, reason)),
                }
                if session.phase() != RunPhase::Running {
                    break;
                }
            }
            let Some(question) = session.current_question().cloned() else {
                break;
            };
            let decision = policy.pick_answer(&question, session.current_options());
            let Ok(outcome) = session.answer(&mut ctx, &decision.answer) else {
                break;
            };

            summary.answers += 1;
            if outcome.correct || outcome.converted {
                summary.correct += 1;
                summary.base_xp += u64::from(outcome.level_after) * u64::from(XP_PER_LEVEL);
            }
            summary.converted += u32::from(outcome.converted);
            summary.forgiven += u32::from(outcome.forgiven);
            summary.retries += u32::from(outcome.retry);
            if session.state().lives > session.state().max_lives {
                summary.lives_over_max += 1;
            }
            if verbose {
                log::debug!(
                    "seed {seed} answer {}: {} ({}) -> {:?}",
                    summary.answers,
                    decision.answer,
                    policy.name(),
                    outcome.phase
                );
            }
            summary.recent.push(AnswerRecord {
                question: question.question_text,
                tier: question.difficulty_tier,
                answer: decision.answer,
                correct: outcome.correct,
                rationale: decision.rationale,
            });
            if summary.recent.len() > RECENT_ANSWERS {
                summary.recent.remove(0);
            }
        }

        if session.phase().is_terminal() {
            summary.late_answer_rejected = session.answer(&mut ctx, "late").is_err();
        }
    }

    let state = session.state();
    summary.phase = session.phase();
    summary.score = state.score;
    summary.xp_earned = state.xp_earned;
    summary.highest_level = state.highest_level;
    summary.notices = surface.notifications().count();

    let after = engine.record();
    summary.runs_recorded = after.runs_played.saturating_sub(before.runs_played);
    summary.persisted_xp_gain = after.total_xp.saturating_sub(before.total_xp);
    summary
}

/// Shared expectations used by several scenarios.
pub mod checks {
    use anyhow::{Result, ensure};

    use super::SimulationSummary;
    use trivia_game::RunPhase;
    use trivia_game::constants::SCORE_PER_CORRECT;

    pub fn reached_terminal(summary: &SimulationSummary) -> Result<()> {
        ensure!(
            summary.ended() && !summary.halted,
            "run did not finish (phase {}, {} answers)",
            summary.phase,
            summary.answers
        );
        Ok(())
    }

    pub fn persisted_once(summary: &SimulationSummary) -> Result<()> {
        if !summary.ended() {
            return Ok(());
        }
        ensure!(
            summary.runs_recorded == 1,
            "run recorded {} times",
            summary.runs_recorded
        );
        ensure!(
            summary.persisted_xp_gain == summary.xp_earned,
            "persisted {} XP but earned {}",
            summary.persisted_xp_gain,
            summary.xp_earned
        );
        ensure!(summary.late_answer_rejected, "answer accepted after the run ended");
        Ok(())
    }

    pub fn lives_within_max(summary: &SimulationSummary) -> Result<()> {
        ensure!(
            summary.lives_over_max == 0,
            "lives exceeded max {} times",
            summary.lives_over_max
        );
        Ok(())
    }

    pub fn score_matches_correct(summary: &SimulationSummary) -> Result<()> {
        ensure!(
            summary.score == summary.correct * SCORE_PER_CORRECT,
            "score {} for {} correct answers",
            summary.score,
            summary.correct
        );
        Ok(())
    }

    pub fn won(summary: &SimulationSummary) -> Result<()> {
        ensure!(
            summary.phase == RunPhase::Won,
            "expected a win, got {}",
            summary.phase
        );
        Ok(())
    }

    pub fn activations_respected(summary: &SimulationSummary) -> Result<()> {
        use trivia_game::ActivationRejection as R;
        if let Some((skill, reason)) = summary
            .rejected
            .iter()
            .find(|(_, reason)| matches!(reason, R::AlreadyUsed | R::NotUnlocked | R::Unknown))
        {
            anyhow::bail!("{skill} rejected: {reason}");
        }
        let mut seen = std::collections::BTreeSet::new();
        for skill in &summary.applied {
            ensure!(seen.insert(*skill), "{skill} applied twice in one run");
        }
        Ok(())
    }
}
