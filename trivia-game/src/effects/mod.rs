//! Skill effect engine.
//!
//! Every unlocked skill gets one handler object. Handlers subscribe to a
//! subset of [`GameEvent`]s and are invoked in catalog order whenever the
//! session fires one of them. Handlers may mutate the event payload, the
//! per-run [`SkillEffectState`], and push notices for the player; the
//! session reads the payload back once dispatch completes.

mod event;
mod experience;
mod strategic;
mod survivalist;

pub use event::{
    CorrectPayload, DemotionPayload, DisplayPayload, EndPayload, EventPayload, GameEvent,
    GameOverPayload, IncorrectPayload, LoadedPayload, SelectionPayload, StartPayload,
    UniverseBias, WinPayload, XpPayload,
};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::catalog::{SkillCatalog, SkillId};
use crate::progression::{ProgressionRecord, RunCarryOver};
use crate::questions::QuestionRecord;

/// Transient flags and counters owned by skill handlers for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEffectState {
    pub second_wind_used: bool,
    pub endurance_used: bool,
    pub safety_net_used: bool,
    pub phoenix_used: bool,
    pub quick_recovery_armed: bool,
    pub fifty_fifty_armed: bool,
    pub difficulty_bypass_armed: bool,
    pub intuition_armed: bool,
    /// Question skipped by time extension, kept out of the next selection.
    pub skipped_question: Option<String>,
    pub expert_universe: Option<String>,
    pub previous_run_xp: u64,
    pub won_previous_run: bool,
}

impl SkillEffectState {
    /// Fresh state for a new run, seeded from the previous run's carry-over.
    #[must_use]
    pub fn seeded(carry: Option<RunCarryOver>) -> Self {
        let carry = carry.unwrap_or_default();
        Self {
            previous_run_xp: carry.previous_run_xp,
            won_previous_run: carry.won_previous_run,
            ..Self::default()
        }
    }
}

/// Lifetime facts about the player, frozen when the run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub strongest_universe: Option<String>,
    pub universe_correct: BTreeMap<String, u32>,
}

impl ProfileSnapshot {
    #[must_use]
    pub fn from_record(record: &ProgressionRecord) -> Self {
        Self {
            strongest_universe: record.strongest_universe().map(str::to_string),
            universe_correct: record.universe_correct.clone(),
        }
    }

    #[must_use]
    pub fn lifetime_correct(&self, universe: &str) -> u32 {
        self.universe_correct.get(universe).copied().unwrap_or(0)
    }
}

/// Read-only numbers from the running session.
#[derive(Debug, Clone, Copy)]
pub struct RunView<'a> {
    pub level: u8,
    pub highest_level: u8,
    pub lives: u32,
    pub max_lives: u32,
    pub lives_lost: u32,
    /// Correct answers in a row, across level changes.
    pub consecutive_correct: u32,
    pub streak_for_level: u32,
    pub correct_answers: u32,
    pub questions_answered: u32,
    pub last_correct_universe: Option<&'a str>,
    pub universe_correct: &'a BTreeMap<String, u32>,
    pub current_question: Option<&'a QuestionRecord>,
    /// Options on screen for the current question.
    pub current_options: &'a [String],
}

impl RunView<'_> {
    #[must_use]
    pub fn run_correct(&self, universe: &str) -> u32 {
        self.universe_correct.get(universe).copied().unwrap_or(0)
    }
}

/// Everything a handler may touch besides the event payload.
pub struct EffectContext<'a> {
    pub run: RunView<'a>,
    pub profile: &'a ProfileSnapshot,
    pub state: &'a mut SkillEffectState,
    pub rng: &'a mut dyn RngCore,
    pub notices: &'a mut Vec<String>,
}

impl EffectContext<'_> {
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationRequest<'a> {
    /// Universe chosen by the player, for skills that target one.
    pub universe: Option<&'a str>,
}

/// What an activated skill did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationEffect {
    /// Show the current question again with reduced options.
    Redisplay,
    /// A flag consumed by a later event was armed.
    Armed(String),
    /// Immediate hint for the current question.
    Hint(String),
    /// Replace the current question without penalty.
    Skip,
    /// Bonus XP for one universe for the rest of the run.
    UniverseFocus(String),
}

impl ActivationEffect {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Redisplay => "Two options remain.".to_string(),
            Self::Armed(message) | Self::Hint(message) => message.clone(),
            Self::Skip => "Question skipped without penalty.".to_string(),
            Self::UniverseFocus(universe) => format!("{universe} questions now earn bonus XP."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationRejection {
    Unknown,
    NotUnlocked,
    NotActive,
    AlreadyUsed,
    NotApplicable,
    NotRunning,
}

impl fmt::Display for ActivationRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown skill",
            Self::NotUnlocked => "skill is not unlocked",
            Self::NotActive => "skill is passive",
            Self::AlreadyUsed => "skill was already used this run",
            Self::NotApplicable => "skill cannot be used right now",
            Self::NotRunning => "no run in progress",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Applied {
        skill: SkillId,
        effect: ActivationEffect,
    },
    Rejected(ActivationRejection),
}

impl ActivationOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Behaviour of one skill.
///
/// Each `on_*` method is only called for events listed in
/// [`SkillEffect::subscriptions`].
pub trait SkillEffect {
    fn id(&self) -> SkillId;

    fn subscriptions(&self) -> &'static [GameEvent];

    /// Active skills limited to one activation per run.
    fn once_per_run(&self) -> bool {
        true
    }

    fn on_game_start(&self, _ctx: &mut EffectContext<'_>, _payload: &mut StartPayload) {}

    fn on_question_selection(&self, _ctx: &mut EffectContext<'_>, _payload: &mut SelectionPayload) {
    }

    fn on_question_loaded(&self, _ctx: &mut EffectContext<'_>, _payload: &mut LoadedPayload<'_>) {}

    fn on_question_display(&self, _ctx: &mut EffectContext<'_>, _payload: &mut DisplayPayload<'_>) {
    }

    fn on_correct_answer(&self, _ctx: &mut EffectContext<'_>, _payload: &mut CorrectPayload) {}

    fn on_incorrect_answer(&self, _ctx: &mut EffectContext<'_>, _payload: &mut IncorrectPayload) {}

    fn on_level_demotion(&self, _ctx: &mut EffectContext<'_>, _payload: &mut DemotionPayload) {}

    fn on_xp_calculation(&self, _ctx: &mut EffectContext<'_>, _payload: &mut XpPayload) {}

    fn on_game_over(&self, _ctx: &mut EffectContext<'_>, _payload: &mut GameOverPayload) {}

    fn on_game_win(&self, _ctx: &mut EffectContext<'_>, _payload: &mut WinPayload) {}

    fn on_game_end(&self, _ctx: &mut EffectContext<'_>, _payload: &mut EndPayload) {}

    /// Player-triggered effect. `None` means the skill does not apply right now.
    fn activate(
        &self,
        _ctx: &mut EffectContext<'_>,
        _request: ActivationRequest<'_>,
    ) -> Option<ActivationEffect> {
        None
    }
}

/// Handler object for `id`.
#[must_use]
pub fn handler_for(id: SkillId) -> Box<dyn SkillEffect> {
    use experience as x;
    use strategic as st;
    use survivalist as sv;

    match id {
        SkillId::ExtraLife => Box::new(sv::ExtraLife),
        SkillId::SecondWind => Box::new(sv::SecondWind),
        SkillId::Resilience => Box::new(sv::Resilience),
        SkillId::LifeVessel => Box::new(sv::LifeVessel),
        SkillId::RechargeStation => Box::new(sv::RechargeStation),
        SkillId::SafetyNet => Box::new(sv::SafetyNet),
        SkillId::QuickRecovery => Box::new(sv::QuickRecovery),
        SkillId::BattleScars => Box::new(sv::BattleScars),
        SkillId::EnduranceTraining => Box::new(sv::EnduranceTraining),
        SkillId::IronWill => Box::new(sv::IronWill),
        SkillId::PhoenixRising => Box::new(sv::PhoenixRising),
        SkillId::Immortality => Box::new(sv::Immortality),
        SkillId::FiftyFifty => Box::new(st::FiftyFifty),
        SkillId::DifficultyBypass => Box::new(st::DifficultyBypass),
        SkillId::CategoryInsight => Box::new(st::CategoryInsight),
        SkillId::KnowledgeExpansion => Box::new(st::KnowledgeExpansion),
        SkillId::UniversalScholar => Box::new(st::UniversalScholar),
        SkillId::TimeExtension => Box::new(st::TimeExtension),
        SkillId::QuestionPreview => Box::new(st::QuestionPreview),
        SkillId::InsightfulPattern => Box::new(st::InsightfulPattern),
        SkillId::MasteryRewards => Box::new(st::MasteryRewards),
        SkillId::CriticalThinking => Box::new(st::CriticalThinking),
        SkillId::Intuition => Box::new(st::Intuition),
        SkillId::Omniscience => Box::new(st::Omniscience),
        SkillId::LearningCurve => Box::new(x::LearningCurve),
        SkillId::StreakBonus => Box::new(x::StreakBonus),
        SkillId::QuickStudy => Box::new(x::QuickStudy),
        SkillId::StartingBonus => Box::new(x::StartingBonus),
        SkillId::EfficientLearner => Box::new(x::EfficientLearner),
        SkillId::UniverseExpert => Box::new(x::UniverseExpert),
        SkillId::DifficultyBonus => Box::new(x::DifficultyBonus),
        SkillId::KnowledgeRetention => Box::new(x::KnowledgeRetention),
        SkillId::ExperienceSurge => Box::new(x::ExperienceSurge),
        SkillId::LegacyKnowledge => Box::new(x::LegacyKnowledge),
        SkillId::EpicQuest => Box::new(x::EpicQuest),
        SkillId::XpOverflow => Box::new(x::XpOverflow),
    }
}

/// Registry of handlers for one run's unlocked skills.
pub struct EffectEngine {
    handlers: Vec<Box<dyn SkillEffect>>,
    index: BTreeMap<GameEvent, Vec<usize>>,
}

impl fmt::Debug for EffectEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectEngine")
            .field("skills", &self.unlocked().collect::<Vec<_>>())
            .finish()
    }
}

impl EffectEngine {
    /// Build handlers for `unlocked`, deduplicated and sorted into catalog order.
    pub fn new(unlocked: impl IntoIterator<Item = SkillId>) -> Self {
        let ordered: BTreeSet<SkillId> = unlocked.into_iter().collect();
        let handlers: Vec<Box<dyn SkillEffect>> = ordered.into_iter().map(handler_for).collect();
        let mut index: BTreeMap<GameEvent, Vec<usize>> = BTreeMap::new();
        for (slot, handler) in handlers.iter().enumerate() {
            for event in handler.subscriptions() {
                index.entry(*event).or_default().push(slot);
            }
        }
        Self { handlers, index }
    }

    /// Resolve stored string ids, skipping unknown ones with a warning.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(ids.into_iter().filter_map(|raw| {
            raw.parse::<SkillId>()
                .map_err(|err| log::warn!("ignoring stored skill: {err}"))
                .ok()
        }))
    }

    pub fn unlocked(&self) -> impl Iterator<Item = SkillId> + '_ {
        self.handlers.iter().map(|handler| handler.id())
    }

    #[must_use]
    pub fn is_unlocked(&self, id: SkillId) -> bool {
        self.handler(id).is_some()
    }

    #[must_use]
    pub fn handler(&self, id: SkillId) -> Option<&dyn SkillEffect> {
        self.handlers
            .iter()
            .find(|handler| handler.id() == id)
            .map(|handler| handler.as_ref())
    }

    /// Skills that run for `event`, in dispatch order.
    #[must_use]
    pub fn subscribers(&self, event: GameEvent) -> Vec<SkillId> {
        self.index
            .get(&event)
            .map(|slots| slots.iter().map(|slot| self.handlers[*slot].id()).collect())
            .unwrap_or_default()
    }

    /// Fire `P::EVENT` with `payload` through every subscribed handler.
    pub fn dispatch<P: EventPayload>(&self, ctx: &mut EffectContext<'_>, payload: &mut P) {
        let Some(slots) = self.index.get(&P::EVENT) else {
            return;
        };
        for slot in slots {
            let handler = &self.handlers[*slot];
            log::debug!("{} -> {}", P::EVENT, handler.id());
            payload.deliver(handler.as_ref(), ctx);
        }
    }

    /// Player-invoked activation of an active skill.
    ///
    /// `used` holds the active skills already spent this run and is only
    /// updated when the activation applies.
    pub fn activate(
        &self,
        catalog: &SkillCatalog,
        skill_id: &str,
        request: ActivationRequest<'_>,
        used: &mut BTreeSet<SkillId>,
        ctx: &mut EffectContext<'_>,
    ) -> ActivationOutcome {
        let outcome = self.try_activate(catalog, skill_id, request, used, ctx);
        match &outcome {
            Ok((skill, effect)) => {
                log::info!("activated {skill}: {effect:?}");
                ActivationOutcome::Applied {
                    skill: *skill,
                    effect: effect.clone(),
                }
            }
            Err(reason) => {
                log::warn!("activation of '{skill_id}' rejected: {reason}");
                ActivationOutcome::Rejected(*reason)
            }
        }
    }

    fn try_activate(
        &self,
        catalog: &SkillCatalog,
        skill_id: &str,
        request: ActivationRequest<'_>,
        used: &mut BTreeSet<SkillId>,
        ctx: &mut EffectContext<'_>,
    ) -> Result<(SkillId, ActivationEffect), ActivationRejection> {
        let skill = catalog
            .require(skill_id)
            .map_err(|_| ActivationRejection::Unknown)?;
        if !skill.is_active {
            return Err(ActivationRejection::NotActive);
        }
        let handler = self
            .handler(skill.id)
            .ok_or(ActivationRejection::NotUnlocked)?;
        if handler.once_per_run() && used.contains(&skill.id) {
            return Err(ActivationRejection::AlreadyUsed);
        }
        let effect = handler
            .activate(ctx, request)
            .ok_or(ActivationRejection::NotApplicable)?;
        used.insert(skill.id);
        Ok((skill.id, effect))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{Harness, question, xp};
    use super::*;
    use crate::questions::QuestionType;

    #[test]
    fn handlers_run_in_catalog_order_regardless_of_input_order() {
        let engine = EffectEngine::new([
            SkillId::DifficultyBonus,
            SkillId::LearningCurve,
            SkillId::BattleScars,
            SkillId::LearningCurve,
        ]);
        assert_eq!(
            engine.subscribers(GameEvent::XpCalculation),
            vec![
                SkillId::BattleScars,
                SkillId::LearningCurve,
                SkillId::DifficultyBonus
            ]
        );
        assert_eq!(engine.unlocked().count(), 3);
    }

    #[test]
    fn unknown_stored_ids_are_skipped() {
        let engine = EffectEngine::from_ids(["extraLife", "masterScholar", "learningCurve"]);
        assert_eq!(
            engine.unlocked().collect::<Vec<_>>(),
            vec![SkillId::ExtraLife, SkillId::LearningCurve]
        );
    }

    #[test]
    fn active_skills_subscribe_only_where_their_flag_is_consumed() {
        let engine = EffectEngine::new([SkillId::FiftyFifty, SkillId::CategoryInsight]);
        assert_eq!(
            engine.subscribers(GameEvent::QuestionDisplay),
            vec![SkillId::FiftyFifty]
        );
        for event in GameEvent::ALL {
            assert!(!engine.subscribers(event).contains(&SkillId::CategoryInsight));
        }
    }

    #[test]
    fn xp_bonuses_multiply_and_round_once() {
        let engine = EffectEngine::new([
            SkillId::LearningCurve,
            SkillId::StreakBonus,
            SkillId::DifficultyBonus,
        ]);
        let mut harness = Harness::new(1);
        harness.consecutive_correct = 4;
        let mut payload = xp(4, 4, "Marvel");
        engine.dispatch(&mut harness.ctx(), &mut payload);
        // 40 * 1.2 * 1.5 * 1.4 = 100.8
        assert_eq!(payload.award(), 101);
    }

    #[test]
    fn fifty_fifty_keeps_answer_and_one_wrong_option() {
        let engine = EffectEngine::new([SkillId::FiftyFifty]);
        let q = question(
            QuestionType::MultipleChoice,
            &["Paris", "London", "Berlin", "Rome"],
            "Paris",
            "Geography",
            2,
        );
        let mut seen = BTreeSet::new();
        for seed in 0..200 {
            let mut harness = Harness::new(seed);
            harness.state.fifty_fifty_armed = true;
            let mut payload = DisplayPayload {
                question: &q,
                options: q.base_options(),
                fresh: true,
            };
            engine.dispatch(&mut harness.ctx(), &mut payload);
            assert_eq!(payload.options.len(), 2);
            assert!(payload.options.contains(&"Paris".to_string()));
            assert!(!harness.state.fifty_fifty_armed);
            seen.extend(payload.options.into_iter().filter(|o| o != "Paris"));
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn activation_guards() {
        let catalog = SkillCatalog::builtin();
        let engine = EffectEngine::new([SkillId::ExtraLife, SkillId::DifficultyBypass]);
        let mut used = BTreeSet::new();
        let mut harness = Harness::new(3);
        harness.level = 3;

        let reject = |outcome: ActivationOutcome| match outcome {
            ActivationOutcome::Rejected(reason) => reason,
            ActivationOutcome::Applied { .. } => panic!("expected rejection"),
        };
        let req = ActivationRequest::default();
        assert_eq!(
            reject(engine.activate(catalog, "warpDrive", req, &mut used, &mut harness.ctx())),
            ActivationRejection::Unknown
        );
        assert_eq!(
            reject(engine.activate(catalog, "extraLife", req, &mut used, &mut harness.ctx())),
            ActivationRejection::NotActive
        );
        assert_eq!(
            reject(engine.activate(catalog, "fiftyFifty", req, &mut used, &mut harness.ctx())),
            ActivationRejection::NotUnlocked
        );
        assert!(
            engine
                .activate(catalog, "difficultyBypass", req, &mut used, &mut harness.ctx())
                .is_applied()
        );
        assert!(harness.state.difficulty_bypass_armed);
        assert_eq!(
            reject(engine.activate(catalog, "difficultyBypass", req, &mut used, &mut harness.ctx())),
            ActivationRejection::AlreadyUsed
        );
    }

    #[test]
    fn seeded_state_carries_previous_run() {
        let state = SkillEffectState::seeded(Some(RunCarryOver {
            previous_run_xp: 300,
            won_previous_run: true,
        }));
        assert_eq!(state.previous_run_xp, 300);
        assert!(state.won_previous_run);
        assert!(!state.second_wind_used);
        assert_eq!(SkillEffectState::seeded(None), SkillEffectState::default());
    }
}
