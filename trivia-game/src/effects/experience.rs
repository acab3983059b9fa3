//! Branch 3: XP bonuses.
use super::{
    ActivationEffect, ActivationRequest, EffectContext, GameEvent, SkillEffect, StartPayload,
    WinPayload, XpPayload,
};
use crate::catalog::SkillId;
use crate::constants::{
    DIFFICULTY_BONUS, DIFFICULTY_BONUS_MIN_TIER, DOUBLE_XP, EFFICIENT_LEARNER_INTERVAL,
    EXPERIENCE_SURGE_AFTER, EXPERIENCE_SURGE_BONUS, KNOWLEDGE_RETENTION_CAP,
    KNOWLEDGE_RETENTION_STEP, LEARNING_CURVE_BONUS, LEGACY_KNOWLEDGE_SHARE, MAX_TIER,
    QUICK_STUDY_BONUS, QUICK_STUDY_QUESTIONS, STARTING_BONUS_XP, STREAK_BONUS, STREAK_BONUS_MIN,
    TRIPLE_XP, UNIVERSE_EXPERT_BONUS,
};
use crate::numbers::{round_f64_to_u32, u32_to_f64};
use num_traits::cast::cast;

pub struct LearningCurve;

impl SkillEffect for LearningCurve {
    fn id(&self) -> SkillId {
        SkillId::LearningCurve
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, _ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        payload.bonus_multiplier *= LEARNING_CURVE_BONUS;
    }
}

pub struct StreakBonus;

impl SkillEffect for StreakBonus {
    fn id(&self) -> SkillId {
        SkillId::StreakBonus
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if ctx.run.consecutive_correct >= STREAK_BONUS_MIN {
            payload.bonus_multiplier *= STREAK_BONUS;
        }
    }
}

pub struct QuickStudy;

impl SkillEffect for QuickStudy {
    fn id(&self) -> SkillId {
        SkillId::QuickStudy
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if ctx.run.questions_answered <= QUICK_STUDY_QUESTIONS {
            payload.bonus_multiplier *= QUICK_STUDY_BONUS;
        }
    }
}

pub struct StartingBonus;

impl SkillEffect for StartingBonus {
    fn id(&self) -> SkillId {
        SkillId::StartingBonus
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::GameStart]
    }

    fn on_game_start(&self, _ctx: &mut EffectContext<'_>, payload: &mut StartPayload) {
        payload.bonus_xp = payload.bonus_xp.saturating_add(STARTING_BONUS_XP);
    }
}

/// Double XP on every tenth correct answer.
pub struct EfficientLearner;

impl SkillEffect for EfficientLearner {
    fn id(&self) -> SkillId {
        SkillId::EfficientLearner
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        let correct = ctx.run.correct_answers;
        if correct > 0 && correct % EFFICIENT_LEARNER_INTERVAL == 0 {
            payload.xp_multiplier *= DOUBLE_XP;
            ctx.notify("Efficient Learner: double XP!");
        }
    }
}

pub struct UniverseExpert;

impl SkillEffect for UniverseExpert {
    fn id(&self) -> SkillId {
        SkillId::UniverseExpert
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if ctx.state.expert_universe.as_deref() == Some(payload.universe.as_str()) {
            payload.bonus_multiplier *= UNIVERSE_EXPERT_BONUS;
        }
    }

    fn activate(
        &self,
        ctx: &mut EffectContext<'_>,
        request: ActivationRequest<'_>,
    ) -> Option<ActivationEffect> {
        let universe = request
            .universe
            .or_else(|| ctx.run.current_question.map(|q| q.universe.as_str()))?
            .to_string();
        ctx.state.expert_universe = Some(universe.clone());
        Some(ActivationEffect::UniverseFocus(universe))
    }
}

pub struct DifficultyBonus;

impl SkillEffect for DifficultyBonus {
    fn id(&self) -> SkillId {
        SkillId::DifficultyBonus
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, _ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if payload.tier >= DIFFICULTY_BONUS_MIN_TIER {
            payload.bonus_multiplier *= DIFFICULTY_BONUS;
        }
    }
}

/// Permanent per-universe mastery from lifetime and current-run answers.
pub struct KnowledgeRetention;

impl SkillEffect for KnowledgeRetention {
    fn id(&self) -> SkillId {
        SkillId::KnowledgeRetention
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        let answered = ctx
            .profile
            .lifetime_correct(&payload.universe)
            .saturating_add(ctx.run.run_correct(&payload.universe));
        if answered == 0 {
            return;
        }
        let bonus = (KNOWLEDGE_RETENTION_STEP * u32_to_f64(answered)).min(KNOWLEDGE_RETENTION_CAP);
        payload.bonus_multiplier *= 1.0 + bonus;
    }
}

pub struct ExperienceSurge;

impl SkillEffect for ExperienceSurge {
    fn id(&self) -> SkillId {
        SkillId::ExperienceSurge
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if ctx.run.questions_answered > EXPERIENCE_SURGE_AFTER {
            payload.bonus_multiplier *= EXPERIENCE_SURGE_BONUS;
        }
    }
}

pub struct LegacyKnowledge;

impl SkillEffect for LegacyKnowledge {
    fn id(&self) -> SkillId {
        SkillId::LegacyKnowledge
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::GameStart]
    }

    fn on_game_start(&self, ctx: &mut EffectContext<'_>, payload: &mut StartPayload) {
        let previous = cast::<u64, f64>(ctx.state.previous_run_xp).unwrap_or(0.0);
        let legacy = round_f64_to_u32(previous * LEGACY_KNOWLEDGE_SHARE);
        if legacy > 0 {
            payload.bonus_xp = payload.bonus_xp.saturating_add(legacy);
            ctx.notify(format!("Legacy Knowledge grants {legacy} XP from your last run."));
        }
    }
}

pub struct EpicQuest;

impl SkillEffect for EpicQuest {
    fn id(&self) -> SkillId {
        SkillId::EpicQuest
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, _ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if payload.tier >= MAX_TIER {
            payload.xp_multiplier *= DOUBLE_XP;
        }
    }
}

/// Triple XP for a whole run that follows a won run.
pub struct XpOverflow;

impl SkillEffect for XpOverflow {
    fn id(&self) -> SkillId {
        SkillId::XpOverflow
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation, GameEvent::GameWin]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if ctx.state.won_previous_run {
            payload.xp_multiplier *= TRIPLE_XP;
        }
    }

    fn on_game_win(&self, ctx: &mut EffectContext<'_>, _payload: &mut WinPayload) {
        ctx.notify("XP Overflow primed: your next run earns triple XP!");
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{Harness, question, xp};
    use super::super::EffectEngine;
    use super::*;
    use crate::questions::QuestionType;

    fn award(engine: &EffectEngine, harness: &mut Harness, payload: &mut XpPayload) -> u32 {
        engine.dispatch(&mut harness.ctx(), payload);
        payload.award()
    }

    #[test]
    fn starting_and_legacy_bonus_add_run_xp() {
        let engine = EffectEngine::new([SkillId::StartingBonus, SkillId::LegacyKnowledge]);
        let mut harness = Harness::new(1);
        harness.state.previous_run_xp = 410;
        let mut payload = StartPayload {
            lives: 3,
            max_lives: 3,
            bonus_xp: 0,
        };
        engine.dispatch(&mut harness.ctx(), &mut payload);
        // 50 + round(410 * 0.05) = 50 + 21
        assert_eq!(payload.bonus_xp, 71);
    }

    #[test]
    fn quick_study_and_surge_are_exclusive_windows() {
        let engine = EffectEngine::new([SkillId::QuickStudy, SkillId::ExperienceSurge]);
        let mut harness = Harness::new(1);
        harness.questions_answered = 5;
        assert_eq!(award(&engine, &mut harness, &mut xp(2, 2, "Disney")), 25);
        harness.questions_answered = 10;
        assert_eq!(award(&engine, &mut harness, &mut xp(2, 2, "Disney")), 20);
        harness.questions_answered = 16;
        assert_eq!(award(&engine, &mut harness, &mut xp(2, 2, "Disney")), 26);
    }

    #[test]
    fn efficient_learner_doubles_every_tenth_correct() {
        let engine = EffectEngine::new([SkillId::EfficientLearner]);
        let mut harness = Harness::new(1);
        harness.correct_answers = 9;
        assert_eq!(award(&engine, &mut harness, &mut xp(3, 3, "Marvel")), 30);
        harness.correct_answers = 10;
        assert_eq!(award(&engine, &mut harness, &mut xp(3, 3, "Marvel")), 60);
        harness.correct_answers = 11;
        assert_eq!(award(&engine, &mut harness, &mut xp(3, 3, "Marvel")), 30);
    }

    #[test]
    fn universe_expert_targets_requested_or_current_universe() {
        let engine = EffectEngine::new([SkillId::UniverseExpert]);
        let handler = engine.handler(SkillId::UniverseExpert).unwrap();
        let mut harness = Harness::new(1);
        assert!(
            handler
                .activate(&mut harness.ctx(), ActivationRequest::default())
                .is_none()
        );

        harness.question = Some(question(QuestionType::TrueFalse, &[], "True", "StarWars", 1));
        assert_eq!(
            handler.activate(&mut harness.ctx(), ActivationRequest::default()),
            Some(ActivationEffect::UniverseFocus("StarWars".to_string()))
        );
        assert_eq!(
            handler.activate(
                &mut harness.ctx(),
                ActivationRequest {
                    universe: Some("Marvel")
                }
            ),
            Some(ActivationEffect::UniverseFocus("Marvel".to_string()))
        );
        assert_eq!(award(&engine, &mut harness, &mut xp(4, 4, "Marvel")), 50);
        assert_eq!(award(&engine, &mut harness, &mut xp(4, 4, "Disney")), 40);
    }

    #[test]
    fn knowledge_retention_caps_at_twenty_percent() {
        let engine = EffectEngine::new([SkillId::KnowledgeRetention]);
        let mut harness = Harness::new(1);
        assert_eq!(award(&engine, &mut harness, &mut xp(5, 5, "Disney")), 50);

        harness.profile.universe_correct.insert("Disney".to_string(), 3);
        harness.run_universe_correct.insert("Disney".to_string(), 2);
        // 5 answers -> +10%
        assert_eq!(award(&engine, &mut harness, &mut xp(5, 5, "Disney")), 55);

        harness.profile.universe_correct.insert("Disney".to_string(), 40);
        assert_eq!(award(&engine, &mut harness, &mut xp(5, 5, "Disney")), 60);
    }

    #[test]
    fn one_shot_multipliers_fold_into_xp_multiplier() {
        let engine = EffectEngine::new([
            SkillId::LearningCurve,
            SkillId::DifficultyBonus,
            SkillId::EpicQuest,
            SkillId::XpOverflow,
        ]);
        let mut harness = Harness::new(1);
        harness.state.won_previous_run = true;
        let mut payload = xp(5, 5, "Marvel");
        engine.dispatch(&mut harness.ctx(), &mut payload);
        assert!((payload.xp_multiplier - 6.0).abs() < f64::EPSILON);
        // 50 * 1.2 * 1.4 * 6 = 504
        assert_eq!(payload.award(), 504);
    }

    #[test]
    fn xp_overflow_announces_on_win() {
        let engine = EffectEngine::new([SkillId::XpOverflow]);
        let mut harness = Harness::new(1);
        engine.dispatch(&mut harness.ctx(), &mut WinPayload { xp_earned: 100 });
        assert_eq!(harness.notices.len(), 1);
    }
}
