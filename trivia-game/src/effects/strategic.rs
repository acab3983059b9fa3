//! Branch 2: question manipulation, hints and selection biases.
use rand::Rng;
use rand::seq::SliceRandom;

use super::{
    ActivationEffect, ActivationRequest, DisplayPayload, EffectContext, GameEvent,
    IncorrectPayload, LoadedPayload, SelectionPayload, SkillEffect, UniverseBias, XpPayload,
};
use crate::catalog::SkillId;
use crate::constants::{
    CRITICAL_THINKING_CHANCE, MASTERY_REWARDS_BONUS, MASTERY_REWARDS_MIN_LEVEL, MAX_TIER,
    MIN_TIER, UNIVERSAL_SCHOLAR_BONUS,
};
use crate::questions::QuestionType;

/// Incorrect options currently shown for the question.
fn incorrect_options(payload: &DisplayPayload<'_>) -> Vec<String> {
    payload
        .options
        .iter()
        .filter(|option| !payload.question.is_correct(option))
        .cloned()
        .collect()
}

pub struct FiftyFifty;

impl SkillEffect for FiftyFifty {
    fn id(&self) -> SkillId {
        SkillId::FiftyFifty
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::QuestionDisplay]
    }

    fn on_question_display(&self, ctx: &mut EffectContext<'_>, payload: &mut DisplayPayload<'_>) {
        if !ctx.state.fifty_fifty_armed
            || payload.question.question_type != QuestionType::MultipleChoice
            || payload.options.len() <= 2
        {
            return;
        }
        ctx.state.fifty_fifty_armed = false;
        let wrong = incorrect_options(payload);
        let Some(kept) = wrong.choose(&mut *ctx.rng).cloned() else {
            return;
        };
        payload
            .options
            .retain(|option| payload.question.is_correct(option) || *option == kept);
    }

    fn activate(
        &self,
        ctx: &mut EffectContext<'_>,
        _request: ActivationRequest<'_>,
    ) -> Option<ActivationEffect> {
        let question = ctx.run.current_question?;
        let applicable = question.question_type == QuestionType::MultipleChoice
            && ctx.run.current_options.len() > 2
            && !ctx.state.fifty_fifty_armed;
        if !applicable {
            return None;
        }
        ctx.state.fifty_fifty_armed = true;
        Some(ActivationEffect::Redisplay)
    }
}

pub struct DifficultyBypass;

impl SkillEffect for DifficultyBypass {
    fn id(&self) -> SkillId {
        SkillId::DifficultyBypass
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::QuestionSelection]
    }

    fn on_question_selection(&self, ctx: &mut EffectContext<'_>, payload: &mut SelectionPayload) {
        if !ctx.state.difficulty_bypass_armed {
            return;
        }
        ctx.state.difficulty_bypass_armed = false;
        payload.tier = payload.tier.saturating_sub(1).max(MIN_TIER);
    }

    fn activate(
        &self,
        ctx: &mut EffectContext<'_>,
        _request: ActivationRequest<'_>,
    ) -> Option<ActivationEffect> {
        if ctx.run.level <= MIN_TIER || ctx.state.difficulty_bypass_armed {
            return None;
        }
        ctx.state.difficulty_bypass_armed = true;
        Some(ActivationEffect::Armed(
            "The next question will be one tier easier.".to_string(),
        ))
    }
}

pub struct CategoryInsight;

impl SkillEffect for CategoryInsight {
    fn id(&self) -> SkillId {
        SkillId::CategoryInsight
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[]
    }

    fn activate(
        &self,
        ctx: &mut EffectContext<'_>,
        _request: ActivationRequest<'_>,
    ) -> Option<ActivationEffect> {
        let question = ctx.run.current_question?;
        Some(ActivationEffect::Hint(format!(
            "The correct answer is related to {} lore",
            question.universe
        )))
    }
}

pub struct KnowledgeExpansion;

impl SkillEffect for KnowledgeExpansion {
    fn id(&self) -> SkillId {
        SkillId::KnowledgeExpansion
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::QuestionSelection]
    }

    fn on_question_selection(&self, _ctx: &mut EffectContext<'_>, payload: &mut SelectionPayload) {
        payload.biases.push(UniverseBias::LeastAnswered);
    }
}

pub struct UniversalScholar;

impl SkillEffect for UniversalScholar {
    fn id(&self) -> SkillId {
        SkillId::UniversalScholar
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        let Some(strongest) = ctx.profile.strongest_universe.as_deref() else {
            return;
        };
        if payload.universe != strongest {
            payload.bonus_multiplier *= UNIVERSAL_SCHOLAR_BONUS;
        }
    }
}

/// Skip the current question; it sits out the next selection.
pub struct TimeExtension;

impl SkillEffect for TimeExtension {
    fn id(&self) -> SkillId {
        SkillId::TimeExtension
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::QuestionSelection]
    }

    fn on_question_selection(&self, ctx: &mut EffectContext<'_>, payload: &mut SelectionPayload) {
        if let Some(key) = ctx.state.skipped_question.take() {
            payload.excluded.push(key);
        }
    }

    fn activate(
        &self,
        ctx: &mut EffectContext<'_>,
        _request: ActivationRequest<'_>,
    ) -> Option<ActivationEffect> {
        let question = ctx.run.current_question?;
        ctx.state.skipped_question = Some(question.key());
        Some(ActivationEffect::Skip)
    }
}

pub struct QuestionPreview;

impl SkillEffect for QuestionPreview {
    fn id(&self) -> SkillId {
        SkillId::QuestionPreview
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::QuestionLoaded]
    }

    fn on_question_loaded(&self, ctx: &mut EffectContext<'_>, payload: &mut LoadedPayload<'_>) {
        ctx.notify(format!(
            "Question Preview: tier {} {} question incoming",
            payload.question.difficulty_tier, payload.question.universe
        ));
    }
}

pub struct InsightfulPattern;

impl SkillEffect for InsightfulPattern {
    fn id(&self) -> SkillId {
        SkillId::InsightfulPattern
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::QuestionSelection]
    }

    fn on_question_selection(&self, ctx: &mut EffectContext<'_>, payload: &mut SelectionPayload) {
        if let Some(universe) = ctx.run.last_correct_universe {
            payload
                .biases
                .push(UniverseBias::Prefer(universe.to_string()));
        }
    }
}

pub struct MasteryRewards;

impl SkillEffect for MasteryRewards {
    fn id(&self) -> SkillId {
        SkillId::MasteryRewards
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, _ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        if payload.level >= MASTERY_REWARDS_MIN_LEVEL && payload.tier < payload.level {
            payload.bonus_multiplier *= MASTERY_REWARDS_BONUS;
        }
    }
}

pub struct CriticalThinking;

impl SkillEffect for CriticalThinking {
    fn id(&self) -> SkillId {
        SkillId::CriticalThinking
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::IncorrectAnswer]
    }

    fn on_incorrect_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut IncorrectPayload) {
        if payload.resolved()
            || payload.tier >= MAX_TIER
            || !ctx.rng.gen_bool(CRITICAL_THINKING_CHANCE)
        {
            return;
        }
        payload.convert_to_correct = true;
        ctx.notify("Critical Thinking turned a miss into a correct answer!");
    }
}

pub struct Intuition;

impl SkillEffect for Intuition {
    fn id(&self) -> SkillId {
        SkillId::Intuition
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::IncorrectAnswer]
    }

    fn on_incorrect_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut IncorrectPayload) {
        if payload.resolved() || !ctx.state.intuition_armed {
            return;
        }
        ctx.state.intuition_armed = false;
        payload.retry = true;
        ctx.notify("Intuition gives you another try.");
    }

    fn activate(
        &self,
        ctx: &mut EffectContext<'_>,
        _request: ActivationRequest<'_>,
    ) -> Option<ActivationEffect> {
        if ctx.run.current_question.is_none() || ctx.state.intuition_armed {
            return None;
        }
        ctx.state.intuition_armed = true;
        Some(ActivationEffect::Armed(
            "Intuition: a wrong answer gets a second chance.".to_string(),
        ))
    }
}

pub struct Omniscience;

impl SkillEffect for Omniscience {
    fn id(&self) -> SkillId {
        SkillId::Omniscience
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::QuestionDisplay]
    }

    fn on_question_display(&self, ctx: &mut EffectContext<'_>, payload: &mut DisplayPayload<'_>) {
        let question = payload.question;
        if !payload.fresh
            || question.difficulty_tier < MAX_TIER
            || question.question_type != QuestionType::MultipleChoice
            || payload.options.len() <= 2
        {
            return;
        }
        let wrong = incorrect_options(payload);
        if let Some(dropped) = wrong.choose(&mut *ctx.rng) {
            payload.options.retain(|option| option != dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{Harness, question, xp};
    use super::super::EffectEngine;
    use super::*;

    fn selection(level: u8) -> SelectionPayload {
        SelectionPayload::for_level(level)
    }

    #[test]
    fn difficulty_bypass_lowers_next_selection_once() {
        let engine = EffectEngine::new([SkillId::DifficultyBypass]);
        let mut harness = Harness::new(1);
        harness.level = 3;
        let handler = engine.handler(SkillId::DifficultyBypass).unwrap();
        assert!(
            handler
                .activate(&mut harness.ctx(), ActivationRequest::default())
                .is_some()
        );

        let mut first = selection(3);
        engine.dispatch(&mut harness.ctx(), &mut first);
        assert_eq!(first.tier, 2);
        let mut second = selection(3);
        engine.dispatch(&mut harness.ctx(), &mut second);
        assert_eq!(second.tier, 3);

        harness.level = 1;
        assert!(
            handler
                .activate(&mut harness.ctx(), ActivationRequest::default())
                .is_none()
        );
    }

    #[test]
    fn category_insight_names_the_universe() {
        let mut harness = Harness::new(1);
        assert!(
            CategoryInsight
                .activate(&mut harness.ctx(), ActivationRequest::default())
                .is_none()
        );
        harness.question = Some(question(QuestionType::TrueFalse, &[], "True", "StarWars", 2));
        assert_eq!(
            CategoryInsight.activate(&mut harness.ctx(), ActivationRequest::default()),
            Some(ActivationEffect::Hint(
                "The correct answer is related to StarWars lore".to_string()
            ))
        );
    }

    #[test]
    fn fifty_fifty_rejects_true_false_questions() {
        let mut harness = Harness::new(1);
        harness.question = Some(question(QuestionType::TrueFalse, &[], "False", "Disney", 1));
        assert!(
            FiftyFifty
                .activate(&mut harness.ctx(), ActivationRequest::default())
                .is_none()
        );
        assert!(!harness.state.fifty_fifty_armed);
    }

    #[test]
    fn selection_biases_push_in_catalog_order() {
        let engine = EffectEngine::new([SkillId::InsightfulPattern, SkillId::KnowledgeExpansion]);
        let mut harness = Harness::new(1);
        harness.last_correct_universe = Some("Marvel".to_string());
        let mut payload = selection(2);
        engine.dispatch(&mut harness.ctx(), &mut payload);
        assert_eq!(
            payload.biases.to_vec(),
            vec![
                UniverseBias::LeastAnswered,
                UniverseBias::Prefer("Marvel".to_string())
            ]
        );
    }

    #[test]
    fn time_extension_excludes_skipped_question_once() {
        let engine = EffectEngine::new([SkillId::TimeExtension]);
        let mut harness = Harness::new(1);
        let q = question(QuestionType::TrueFalse, &[], "True", "Disney", 1);
        harness.question = Some(q.clone());
        assert_eq!(
            TimeExtension.activate(&mut harness.ctx(), ActivationRequest::default()),
            Some(ActivationEffect::Skip)
        );
        let mut first = selection(1);
        engine.dispatch(&mut harness.ctx(), &mut first);
        assert_eq!(first.excluded, vec![q.key()]);
        let mut second = selection(1);
        engine.dispatch(&mut harness.ctx(), &mut second);
        assert!(second.excluded.is_empty());
    }

    #[test]
    fn omniscience_trims_tier_five_choices() {
        let engine = EffectEngine::new([SkillId::Omniscience]);
        let mut harness = Harness::new(9);
        let hard = question(QuestionType::MultipleChoice, &["A", "B", "C", "D"], "C", "Marvel", 5);
        let mut payload = DisplayPayload {
            question: &hard,
            options: hard.base_options(),
            fresh: true,
        };
        engine.dispatch(&mut harness.ctx(), &mut payload);
        assert_eq!(payload.options.len(), 3);
        assert!(payload.options.contains(&"C".to_string()));

        let easy = question(QuestionType::MultipleChoice, &["A", "B", "C", "D"], "C", "Marvel", 4);
        let mut payload = DisplayPayload {
            question: &easy,
            options: easy.base_options(),
            fresh: true,
        };
        engine.dispatch(&mut harness.ctx(), &mut payload);
        assert_eq!(payload.options.len(), 4);
    }

    #[test]
    fn omniscience_leaves_redisplays_alone() {
        let engine = EffectEngine::new([SkillId::Omniscience]);
        let mut harness = Harness::new(3);
        let hard = question(QuestionType::MultipleChoice, &["A", "B", "C", "D"], "B", "Marvel", 5);
        let mut payload = DisplayPayload {
            question: &hard,
            options: hard.base_options(),
            fresh: true,
        };
        engine.dispatch(&mut harness.ctx(), &mut payload);
        let trimmed = payload.options.clone();
        assert_eq!(trimmed.len(), 3);

        let mut again = DisplayPayload {
            question: &hard,
            options: trimmed.clone(),
            fresh: false,
        };
        engine.dispatch(&mut harness.ctx(), &mut again);
        assert_eq!(again.options, trimmed);
    }

    #[test]
    fn fifty_fifty_checks_the_options_on_screen() {
        let engine = EffectEngine::new([SkillId::FiftyFifty]);
        let handler = engine.handler(SkillId::FiftyFifty).unwrap();
        let mut harness = Harness::new(8);
        let q = question(QuestionType::MultipleChoice, &["A", "B", "C"], "A", "Disney", 5);
        harness.question = Some(q);
        harness.shown_options = vec!["A".to_string(), "C".to_string()];
        assert!(
            handler
                .activate(&mut harness.ctx(), ActivationRequest::default())
                .is_none()
        );
        assert!(!harness.state.fifty_fifty_armed);

        harness.shown_options = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert!(
            handler
                .activate(&mut harness.ctx(), ActivationRequest::default())
                .is_some()
        );
        assert!(harness.state.fifty_fifty_armed);
    }

    #[test]
    fn fifty_fifty_then_omniscience_leaves_two_options() {
        let engine = EffectEngine::new([SkillId::Omniscience, SkillId::FiftyFifty]);
        let mut harness = Harness::new(5);
        harness.state.fifty_fifty_armed = true;
        let hard = question(QuestionType::MultipleChoice, &["A", "B", "C", "D"], "A", "Disney", 5);
        let mut payload = DisplayPayload {
            question: &hard,
            options: hard.base_options(),
            fresh: true,
        };
        engine.dispatch(&mut harness.ctx(), &mut payload);
        assert_eq!(payload.options.len(), 2);
    }

    #[test]
    fn critical_thinking_converts_about_one_in_ten_below_tier_five() {
        let engine = EffectEngine::new([SkillId::CriticalThinking]);
        let mut harness = Harness::new(11);
        let trials = 10_000;
        let mut converted = 0;
        for _ in 0..trials {
            let mut payload = IncorrectPayload {
                tier: 3,
                universe: "Disney".to_string(),
                convert_to_correct: false,
                forgive: false,
                retry: false,
                prevent_level_demotion: false,
                level_floor: 1,
            };
            engine.dispatch(&mut harness.ctx(), &mut payload);
            if payload.convert_to_correct {
                converted += 1;
            }
        }
        let rate = f64::from(converted) / f64::from(trials);
        assert!((0.08..0.12).contains(&rate), "rate {rate}");

        let mut top = IncorrectPayload {
            tier: 5,
            universe: "Disney".to_string(),
            convert_to_correct: false,
            forgive: false,
            retry: false,
            prevent_level_demotion: false,
            level_floor: 1,
        };
        for _ in 0..200 {
            engine.dispatch(&mut harness.ctx(), &mut top);
        }
        assert!(!top.convert_to_correct);
    }

    #[test]
    fn scholar_and_mastery_multipliers() {
        let engine = EffectEngine::new([SkillId::UniversalScholar, SkillId::MasteryRewards]);
        let mut harness = Harness::new(1);
        let mut no_profile = xp(2, 2, "Marvel");
        engine.dispatch(&mut harness.ctx(), &mut no_profile);
        assert_eq!(no_profile.award(), 20);

        harness.profile.strongest_universe = Some("Disney".to_string());
        let mut outside = xp(4, 3, "Marvel");
        engine.dispatch(&mut harness.ctx(), &mut outside);
        // 40 * 1.15 * 1.5 = 69
        assert_eq!(outside.award(), 69);

        let mut inside = xp(4, 4, "Disney");
        engine.dispatch(&mut harness.ctx(), &mut inside);
        assert_eq!(inside.award(), 40);
    }
}
