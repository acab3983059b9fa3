//! Run state machine: question sequencing, scoring, lives and terminal states.
use rand::RngCore;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::catalog::{SkillCatalog, SkillId};
use crate::constants::{
    BASE_LIVES, FEEDBACK_DELAY_MS, LEVEL_ADVANCE_STREAK, MAX_LEVEL, MAX_TIER, MIN_LEVEL, MIN_TIER,
    SCORE_PER_CORRECT, XP_PER_LEVEL,
};
use crate::effects::{
    ActivationOutcome, ActivationRejection, ActivationRequest, CorrectPayload, DemotionPayload,
    DisplayPayload, EffectContext, EffectEngine, EndPayload, GameOverPayload, IncorrectPayload,
    LoadedPayload, ProfileSnapshot, RunView, SelectionPayload, SkillEffectState, StartPayload,
    WinPayload, XpPayload,
};
use crate::effects::ActivationEffect;
use crate::progression::{ProgressionStore, RunRecorded, RunSummary};
use crate::questions::{QuestionRecord, QuestionRepository, QuestionType};
use crate::render::{AnswerFeedback, RenderSurface, StatusView, TerminalView};
use crate::rng::{RngBundle, RngDraws};
use crate::selection::pick_question;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    NotStarted,
    Running,
    GameOver,
    Won,
    /// No unseen question is left at `tier`.
    Stalled { tier: u8 },
}

impl RunPhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Won | Self::Stalled { .. })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::GameOver => "game_over",
            Self::Won => "won",
            Self::Stalled { .. } => "stalled",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stalled { tier } => write!(f, "stalled at tier {tier}"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("run is not accepting answers ({phase})")]
    NotRunning { phase: RunPhase },
    #[error("input is frozen while an answer resolves")]
    InputLocked,
    #[error("no question is on screen")]
    NoQuestion,
}

/// Collaborators lent to the session for the duration of one call.
pub struct RunContext<'a, K, S> {
    pub questions: &'a QuestionRepository,
    pub store: &'a mut ProgressionStore<K>,
    pub surface: &'a mut S,
}

impl<'a, K, S> RunContext<'a, K, S> {
    pub fn new(
        questions: &'a QuestionRepository,
        store: &'a mut ProgressionStore<K>,
        surface: &'a mut S,
    ) -> Self {
        Self {
            questions,
            store,
            surface,
        }
    }
}

/// Mutable numbers of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub lives: u32,
    pub max_lives: u32,
    pub score: u32,
    pub xp_earned: u64,
    pub level: u8,
    pub highest_level: u8,
    /// Consecutive correct answers at the current level.
    pub streak_for_level: u32,
    pub consecutive_correct: u32,
    pub lives_lost: u32,
    pub correct_answers: u32,
    pub questions_answered: u32,
    pub answered_question_ids: BTreeSet<String>,
    pub used_active_skill_ids: BTreeSet<SkillId>,
    pub skill_effect_state: SkillEffectState,
    pub current_question: Option<QuestionRecord>,
    pub current_options: Vec<String>,
    pub universe_answered: BTreeMap<String, u32>,
    pub universe_correct: BTreeMap<String, u32>,
    pub last_correct_universe: Option<String>,
    pub tier5_correct: BTreeSet<String>,
}

impl SessionState {
    #[must_use]
    pub fn new(skill_effect_state: SkillEffectState) -> Self {
        Self {
            lives: BASE_LIVES,
            max_lives: BASE_LIVES,
            score: 0,
            xp_earned: 0,
            level: MIN_LEVEL,
            highest_level: MIN_LEVEL,
            streak_for_level: 0,
            consecutive_correct: 0,
            lives_lost: 0,
            correct_answers: 0,
            questions_answered: 0,
            answered_question_ids: BTreeSet::new(),
            used_active_skill_ids: BTreeSet::new(),
            skill_effect_state,
            current_question: None,
            current_options: Vec::new(),
            universe_answered: BTreeMap::new(),
            universe_correct: BTreeMap::new(),
            last_correct_universe: None,
            tier5_correct: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusView {
        StatusView {
            lives: self.lives,
            max_lives: self.max_lives,
            score: self.score,
            level: self.level,
            xp_earned: self.xp_earned,
        }
    }

    /// Read-only view for handlers plus the two sets handlers may change.
    fn split_effects(
        &mut self,
    ) -> (
        RunView<'_>,
        &mut SkillEffectState,
        &mut BTreeSet<SkillId>,
    ) {
        let view = RunView {
            level: self.level,
            highest_level: self.highest_level,
            lives: self.lives,
            max_lives: self.max_lives,
            lives_lost: self.lives_lost,
            consecutive_correct: self.consecutive_correct,
            streak_for_level: self.streak_for_level,
            correct_answers: self.correct_answers,
            questions_answered: self.questions_answered,
            last_correct_universe: self.last_correct_universe.as_deref(),
            universe_correct: &self.universe_correct,
            current_question: self.current_question.as_ref(),
            current_options: &self.current_options,
        };
        (
            view,
            &mut self.skill_effect_state,
            &mut self.used_active_skill_ids,
        )
    }

    /// Count a question once, even when a retry answers it again.
    fn mark_answered(&mut self, question: &QuestionRecord) {
        if !self.answered_question_ids.insert(question.key()) {
            return;
        }
        self.questions_answered = self.questions_answered.saturating_add(1);
        bump(&mut self.universe_answered, &question.universe);
    }
}

fn bump(counts: &mut BTreeMap<String, u32>, universe: &str) {
    let entry = counts.entry(universe.to_string()).or_insert(0);
    *entry = entry.saturating_add(1);
}

fn effect_context<'a>(
    state: &'a mut SessionState,
    profile: &'a ProfileSnapshot,
    rng: &'a mut dyn RngCore,
    notices: &'a mut Vec<String>,
) -> (EffectContext<'a>, &'a mut BTreeSet<SkillId>) {
    let (run, skill_state, used) = state.split_effects();
    (
        EffectContext {
            run,
            profile,
            state: skill_state,
            rng,
            notices,
        },
        used,
    )
}

/// Result of one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    /// The selected option matched the correct answer.
    pub correct: bool,
    /// A wrong answer was turned into a correct one by a skill.
    pub converted: bool,
    /// A wrong answer cost nothing.
    pub forgiven: bool,
    /// The same question is shown again.
    pub retry: bool,
    pub xp_awarded: u32,
    pub level_before: u8,
    pub level_after: u8,
    pub lives: u32,
    pub phase: RunPhase,
    /// Presentation hint: pause before showing the next question.
    pub feedback_delay_ms: u64,
}

#[derive(Debug, Default)]
struct Resolution {
    converted: bool,
    forgiven: bool,
    retry: bool,
    xp_awarded: u32,
}

/// One run from start to a terminal phase.
#[derive(Debug)]
pub struct GameSession {
    seed: u64,
    phase: RunPhase,
    state: SessionState,
    engine: EffectEngine,
    profile: ProfileSnapshot,
    rngs: RngBundle,
    win_targets: BTreeSet<String>,
    notices: Vec<String>,
    input_locked: bool,
    recorded: Option<RunRecorded>,
}

impl GameSession {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            phase: RunPhase::NotStarted,
            state: SessionState::new(SkillEffectState::default()),
            engine: EffectEngine::new(Vec::new()),
            profile: ProfileSnapshot::default(),
            rngs: RngBundle::from_user_seed(seed),
            win_targets: BTreeSet::new(),
            notices: Vec::new(),
            input_locked: true,
            recorded: None,
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn engine(&self) -> &EffectEngine {
        &self.engine
    }

    #[must_use]
    pub const fn profile(&self) -> &ProfileSnapshot {
        &self.profile
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuestionRecord> {
        self.state.current_question.as_ref()
    }

    #[must_use]
    pub fn current_options(&self) -> &[String] {
        &self.state.current_options
    }

    #[must_use]
    pub const fn is_input_locked(&self) -> bool {
        self.input_locked
    }

    /// Persistence receipt, present once the run reached a terminal phase.
    #[must_use]
    pub const fn recorded(&self) -> Option<RunRecorded> {
        self.recorded
    }

    #[must_use]
    pub const fn rng_draws(&self) -> RngDraws {
        self.rngs.draws()
    }

    /// Unlocked active skills not yet spent this run.
    #[must_use]
    pub fn available_actives(&self, catalog: &SkillCatalog) -> Vec<SkillId> {
        self.engine
            .unlocked()
            .filter(|id| catalog.is_active(*id) && !self.state.used_active_skill_ids.contains(id))
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            xp_earned: self.state.xp_earned,
            score: self.state.score,
            questions_answered: self.state.questions_answered,
            won: self.phase == RunPhase::Won,
            universe_correct: self.state.universe_correct.clone(),
        }
    }

    /// Every tier-5 question of the pool answered correctly this run.
    #[must_use]
    pub fn win_condition_met(&self) -> bool {
        !self.win_targets.is_empty()
            && self
                .win_targets
                .iter()
                .all(|key| self.state.tier5_correct.contains(key))
    }

    /// Reset the run from persisted progression and show the first question.
    pub fn start<K: KeyValueStore, S: RenderSurface>(
        &mut self,
        ctx: &mut RunContext<'_, K, S>,
    ) -> RunPhase {
        if self.phase == RunPhase::Running {
            log::warn!("restarting a run that never finished; it will not be recorded");
        }
        let record = ctx.store.load().value;
        self.engine = EffectEngine::from_ids(record.unlocked_skill_ids.iter().map(String::as_str));
        self.profile = ProfileSnapshot::from_record(&record);
        self.state = SessionState::new(SkillEffectState::seeded(record.last_run));
        self.rngs = RngBundle::from_user_seed(self.seed);
        self.win_targets = ctx
            .questions
            .by_exact_difficulty(MAX_TIER)
            .into_iter()
            .map(QuestionRecord::key)
            .collect();
        self.notices.clear();
        self.recorded = None;
        self.phase = RunPhase::Running;
        self.input_locked = false;
        log::info!(
            "run started (seed {}, {} skills, {} questions)",
            self.seed,
            self.engine.unlocked().count(),
            ctx.questions.len()
        );
        if let Some(advisory) = ctx.store.take_advisory() {
            self.notices.push(advisory.to_string());
        }

        let mut payload = StartPayload {
            lives: BASE_LIVES,
            max_lives: BASE_LIVES,
            bonus_xp: 0,
        };
        {
            let (mut fx, _) = effect_context(
                &mut self.state,
                &self.profile,
                self.rngs.effects(),
                &mut self.notices,
            );
            self.engine.dispatch(&mut fx, &mut payload);
        }
        self.state.max_lives = payload.max_lives.max(1);
        self.state.lives = payload.lives.clamp(1, self.state.max_lives);
        self.state.xp_earned = self.state.xp_earned.saturating_add(u64::from(payload.bonus_xp));

        self.flush_notices(ctx.surface);
        ctx.surface.update_status(&self.state.status());
        self.load_next(ctx);
        self.phase
    }

    /// Submit the player's choice for the question on screen.
    ///
    /// # Errors
    ///
    /// Rejects input outside a running run, while input is frozen, or when
    /// no question is displayed.
    pub fn answer<K: KeyValueStore, S: RenderSurface>(
        &mut self,
        ctx: &mut RunContext<'_, K, S>,
        selected: &str,
    ) -> Result<AnswerOutcome, SessionError> {
        if self.phase != RunPhase::Running {
            return Err(SessionError::NotRunning { phase: self.phase });
        }
        if self.input_locked {
            return Err(SessionError::InputLocked);
        }
        let question = self
            .state
            .current_question
            .clone()
            .ok_or(SessionError::NoQuestion)?;
        self.input_locked = true;

        let correct = question.is_correct(selected);
        ctx.surface.show_answer_feedback(&AnswerFeedback {
            selected: selected.to_string(),
            correct_answer: question.correct_answer.clone(),
            correct,
        });

        let level_before = self.state.level;
        self.state.mark_answered(&question);
        let resolution = if correct {
            Resolution {
                xp_awarded: self.apply_correct(ctx, &question),
                ..Resolution::default()
            }
        } else {
            self.apply_incorrect(ctx, &question)
        };
        if self.phase == RunPhase::Running {
            self.input_locked = false;
        }

        Ok(AnswerOutcome {
            correct,
            converted: resolution.converted,
            forgiven: resolution.forgiven,
            retry: resolution.retry,
            xp_awarded: resolution.xp_awarded,
            level_before,
            level_after: self.state.level,
            lives: self.state.lives,
            phase: self.phase,
            feedback_delay_ms: FEEDBACK_DELAY_MS,
        })
    }

    /// Trigger an unlocked active skill. Rejections are returned, never raised.
    pub fn activate<K: KeyValueStore, S: RenderSurface>(
        &mut self,
        ctx: &mut RunContext<'_, K, S>,
        skill_id: &str,
        universe: Option<&str>,
    ) -> ActivationOutcome {
        if self.phase != RunPhase::Running || self.input_locked {
            log::warn!("activation of '{skill_id}' rejected: run is {}", self.phase);
            return ActivationOutcome::Rejected(ActivationRejection::NotRunning);
        }
        let outcome = {
            let (mut fx, used) = effect_context(
                &mut self.state,
                &self.profile,
                self.rngs.effects(),
                &mut self.notices,
            );
            self.engine.activate(
                SkillCatalog::builtin(),
                skill_id,
                ActivationRequest { universe },
                used,
                &mut fx,
            )
        };
        if let ActivationOutcome::Applied { effect, .. } = &outcome {
            self.notices.push(effect.message());
            match effect {
                ActivationEffect::Redisplay => self.display_current(ctx, false),
                ActivationEffect::Skip => self.load_next(ctx),
                ActivationEffect::Armed(_)
                | ActivationEffect::Hint(_)
                | ActivationEffect::UniverseFocus(_) => {}
            }
        }
        self.flush_notices(ctx.surface);
        outcome
    }

    fn apply_correct<K: KeyValueStore, S: RenderSurface>(
        &mut self,
        ctx: &mut RunContext<'_, K, S>,
        question: &QuestionRecord,
    ) -> u32 {
        let state = &mut self.state;
        state.score = state.score.saturating_add(SCORE_PER_CORRECT);
        state.correct_answers = state.correct_answers.saturating_add(1);
        state.streak_for_level = state.streak_for_level.saturating_add(1);
        state.consecutive_correct = state.consecutive_correct.saturating_add(1);
        bump(&mut state.universe_correct, &question.universe);
        state.last_correct_universe = Some(question.universe.clone());
        if question.difficulty_tier == MAX_TIER {
            state.tier5_correct.insert(question.key());
        }

        let mut payload = CorrectPayload {
            tier: question.difficulty_tier,
            universe: question.universe.clone(),
            advance_threshold: LEVEL_ADVANCE_STREAK,
            lives_restored: 0,
        };
        self.fire(&mut payload);
        self.state.lives = self
            .state
            .lives
            .saturating_add(payload.lives_restored)
            .min(self.state.max_lives);

        if question.difficulty_tier == MAX_TIER && self.win_condition_met() {
            let xp = self.award_xp(question);
            self.finish(ctx, RunPhase::Won);
            return xp;
        }

        if self.state.streak_for_level >= payload.advance_threshold.max(1)
            && self.state.level < MAX_LEVEL
        {
            self.state.level += 1;
            self.state.streak_for_level = 0;
            self.state.highest_level = self.state.highest_level.max(self.state.level);
            log::info!("advanced to level {}", self.state.level);
            self.notices
                .push(format!("Level up! Now at level {}.", self.state.level));
        }

        let xp = self.award_xp(question);
        ctx.surface.update_status(&self.state.status());
        self.load_next(ctx);
        xp
    }

    fn apply_incorrect<K: KeyValueStore, S: RenderSurface>(
        &mut self,
        ctx: &mut RunContext<'_, K, S>,
        question: &QuestionRecord,
    ) -> Resolution {
        let mut payload = IncorrectPayload {
            tier: question.difficulty_tier,
            universe: question.universe.clone(),
            convert_to_correct: false,
            forgive: false,
            retry: false,
            prevent_level_demotion: false,
            level_floor: MIN_LEVEL,
        };
        self.fire(&mut payload);

        if payload.convert_to_correct {
            return Resolution {
                converted: true,
                xp_awarded: self.apply_correct(ctx, question),
                ..Resolution::default()
            };
        }
        if payload.retry {
            self.flush_notices(ctx.surface);
            self.display_current(ctx, false);
            return Resolution {
                retry: true,
                ..Resolution::default()
            };
        }
        if payload.forgive {
            ctx.surface.update_status(&self.state.status());
            self.load_next(ctx);
            return Resolution {
                forgiven: true,
                ..Resolution::default()
            };
        }

        let state = &mut self.state;
        state.lives = state.lives.saturating_sub(1);
        state.lives_lost = state.lives_lost.saturating_add(1);
        state.streak_for_level = 0;
        state.consecutive_correct = 0;

        let floor = payload.level_floor.clamp(MIN_LEVEL, MAX_LEVEL);
        if !payload.prevent_level_demotion && state.level > floor {
            let from = state.level;
            state.level -= 1;
            log::info!("demoted to level {}", state.level);
            let mut demotion = DemotionPayload {
                from,
                to: self.state.level,
            };
            self.fire(&mut demotion);
        }

        if self.state.lives == 0 {
            let mut over = GameOverPayload::default();
            self.fire(&mut over);
            if !over.prevent_game_over {
                self.finish(ctx, RunPhase::GameOver);
                return Resolution::default();
            }
            self.state.lives = over.restore_lives.clamp(1, self.state.max_lives);
            if over.reset_streak {
                self.state.streak_for_level = 0;
            }
        }

        ctx.surface.update_status(&self.state.status());
        self.load_next(ctx);
        Resolution::default()
    }

    /// Dispatch a payload that does not borrow the current question.
    fn fire<P: crate::effects::EventPayload>(&mut self, payload: &mut P) {
        let (mut fx, _) = effect_context(
            &mut self.state,
            &self.profile,
            self.rngs.effects(),
            &mut self.notices,
        );
        self.engine.dispatch(&mut fx, payload);
    }

    fn award_xp(&mut self, question: &QuestionRecord) -> u32 {
        let level = self.state.level;
        let mut payload = XpPayload {
            base_xp: u32::from(level) * XP_PER_LEVEL,
            bonus_multiplier: 1.0,
            xp_multiplier: 1.0,
            tier: question.difficulty_tier,
            universe: question.universe.clone(),
            level,
        };
        self.fire(&mut payload);
        let xp = payload.award();
        self.state.xp_earned = self.state.xp_earned.saturating_add(u64::from(xp));
        xp
    }

    fn load_next<K: KeyValueStore, S: RenderSurface>(&mut self, ctx: &mut RunContext<'_, K, S>) {
        if self.phase != RunPhase::Running {
            return;
        }
        let mut selection = SelectionPayload::for_level(self.state.level);
        self.fire(&mut selection);

        let questions = ctx.questions;
        let answered = &self.state.answered_question_ids;
        let unseen = |tier: u8| {
            questions
                .by_exact_difficulty(tier)
                .into_iter()
                .filter(|q| !answered.contains(&q.key()))
                .collect::<Vec<_>>()
        };
        let tier = selection.tier.clamp(MIN_TIER, MAX_TIER);
        let mut eligible = unseen(tier);
        if eligible.is_empty() && tier != self.state.level {
            eligible = unseen(self.state.level);
        }
        if !selection.excluded.is_empty() {
            let remaining: Vec<&QuestionRecord> = eligible
                .iter()
                .copied()
                .filter(|q| !selection.excluded.contains(&q.key()))
                .collect();
            if !remaining.is_empty() {
                eligible = remaining;
            }
        }

        let picked = pick_question(
            &eligible,
            &selection.biases,
            &self.state.universe_answered,
            self.rngs.selection(),
        )
        .cloned();
        let remaining_at_tier = eligible.len();

        let Some(question) = picked else {
            let stuck = self.state.level;
            if stuck == MAX_TIER && self.win_condition_met() {
                self.finish(ctx, RunPhase::Won);
            } else {
                log::warn!("no unanswered questions left at tier {stuck}");
                self.notices.push(format!(
                    "No more questions available for difficulty level {stuck}."
                ));
                self.finish(ctx, RunPhase::Stalled { tier: stuck });
            }
            return;
        };

        self.state.current_question = Some(question);
        {
            let (mut fx, _) = effect_context(
                &mut self.state,
                &self.profile,
                self.rngs.effects(),
                &mut self.notices,
            );
            if let Some(question) = fx.run.current_question {
                let mut loaded = LoadedPayload {
                    question,
                    remaining_at_tier,
                };
                self.engine.dispatch(&mut fx, &mut loaded);
            }
        }
        self.display_current(ctx, true);
    }

    /// Fire `QuestionDisplay` for the current question and render it.
    fn display_current<K: KeyValueStore, S: RenderSurface>(
        &mut self,
        ctx: &mut RunContext<'_, K, S>,
        fresh: bool,
    ) {
        let Some(question) = self.state.current_question.as_ref() else {
            return;
        };
        let options = if fresh {
            let mut options = question.base_options();
            if question.question_type == QuestionType::MultipleChoice {
                options.shuffle(self.rngs.display());
            }
            options
        } else {
            self.state.current_options.clone()
        };

        let shown = {
            let (mut fx, _) = effect_context(
                &mut self.state,
                &self.profile,
                self.rngs.effects(),
                &mut self.notices,
            );
            match fx.run.current_question {
                Some(question) => {
                    let mut display = DisplayPayload {
                        question,
                        options,
                        fresh,
                    };
                    self.engine.dispatch(&mut fx, &mut display);
                    display.options
                }
                None => options,
            }
        };
        self.state.current_options = shown;
        if let Some(question) = self.state.current_question.as_ref() {
            ctx.surface
                .show_question(question, &self.state.current_options);
        }
        self.flush_notices(ctx.surface);
        self.input_locked = false;
    }

    /// Enter a terminal phase and persist the run exactly once.
    fn finish<K: KeyValueStore, S: RenderSurface>(
        &mut self,
        ctx: &mut RunContext<'_, K, S>,
        phase: RunPhase,
    ) {
        if self.recorded.is_some() {
            return;
        }
        self.phase = phase;
        self.input_locked = true;
        let won = phase == RunPhase::Won;
        if won {
            let mut win = WinPayload {
                xp_earned: self.state.xp_earned,
            };
            self.fire(&mut win);
        }
        let mut end = EndPayload {
            won,
            xp_earned: self.state.xp_earned,
        };
        self.fire(&mut end);

        let recorded = ctx.store.record_run(&self.summary());
        self.recorded = Some(recorded);
        log::info!(
            "run ended: {phase} with score {} and {} XP",
            self.state.score,
            self.state.xp_earned
        );
        if let Some(advisory) = ctx.store.take_advisory() {
            self.notices.push(advisory.to_string());
        }
        self.state.current_question = None;
        self.state.current_options.clear();

        let message = match phase {
            RunPhase::Won => "You've successfully completed all level 5 questions!".to_string(),
            RunPhase::Stalled { tier } => {
                format!("No more questions available for difficulty level {tier}.")
            }
            _ => "Game over.".to_string(),
        };
        self.flush_notices(ctx.surface);
        ctx.surface.update_status(&self.state.status());
        ctx.surface.show_terminal(&TerminalView {
            phase,
            score: self.state.score,
            xp_earned: self.state.xp_earned,
            questions_answered: self.state.questions_answered,
            correct_answers: self.state.correct_answers,
            new_high_score: recorded.new_high_score,
            message,
        });
    }

    fn flush_notices<S: RenderSurface>(&mut self, surface: &mut S) {
        for notice in self.notices.drain(..) {
            surface.show_notification(&notice);
        }
    }
}
