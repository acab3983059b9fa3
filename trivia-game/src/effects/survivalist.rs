//! Branch 1: lives, forgiveness and level protection.
use rand::Rng;

use super::{
    CorrectPayload, DemotionPayload, EffectContext, GameEvent, GameOverPayload, IncorrectPayload,
    SkillEffect, StartPayload, XpPayload,
};
use crate::catalog::SkillId;
use crate::constants::{
    BATTLE_SCARS_MAX_STACKS, BATTLE_SCARS_STEP, IRON_WILL_FLOOR, MAX_LEVEL, QUICK_RECOVERY_STREAK,
    RECHARGE_INTERVAL, RESILIENCE_CHANCE,
};
use crate::numbers::u32_to_f64;

fn grant_max_life(payload: &mut StartPayload) {
    payload.max_lives = payload.max_lives.saturating_add(1);
    payload.lives = payload.lives.saturating_add(1);
}

pub struct ExtraLife;

impl SkillEffect for ExtraLife {
    fn id(&self) -> SkillId {
        SkillId::ExtraLife
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::GameStart]
    }

    fn on_game_start(&self, _ctx: &mut EffectContext<'_>, payload: &mut StartPayload) {
        grant_max_life(payload);
    }
}

pub struct SecondWind;

impl SkillEffect for SecondWind {
    fn id(&self) -> SkillId {
        SkillId::SecondWind
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::IncorrectAnswer]
    }

    fn on_incorrect_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut IncorrectPayload) {
        if payload.resolved() || ctx.state.second_wind_used {
            return;
        }
        ctx.state.second_wind_used = true;
        payload.forgive = true;
        ctx.notify("Second Wind! Your first mistake is forgiven.");
    }
}

pub struct Resilience;

impl SkillEffect for Resilience {
    fn id(&self) -> SkillId {
        SkillId::Resilience
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::IncorrectAnswer]
    }

    fn on_incorrect_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut IncorrectPayload) {
        if payload.resolved() || !ctx.rng.gen_bool(RESILIENCE_CHANCE) {
            return;
        }
        payload.forgive = true;
        ctx.notify("Resilience skill activated! No life lost.");
    }
}

pub struct LifeVessel;

impl SkillEffect for LifeVessel {
    fn id(&self) -> SkillId {
        SkillId::LifeVessel
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::GameStart]
    }

    fn on_game_start(&self, _ctx: &mut EffectContext<'_>, payload: &mut StartPayload) {
        grant_max_life(payload);
    }
}

pub struct RechargeStation;

impl SkillEffect for RechargeStation {
    fn id(&self) -> SkillId {
        SkillId::RechargeStation
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::CorrectAnswer]
    }

    fn on_correct_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut CorrectPayload) {
        let correct = ctx.run.correct_answers;
        if correct == 0 || correct % RECHARGE_INTERVAL != 0 {
            return;
        }
        if ctx.run.lives < ctx.run.max_lives {
            payload.lives_restored = payload.lives_restored.saturating_add(1);
            ctx.notify("Recharge Station restored a life.");
        }
    }
}

pub struct SafetyNet;

impl SkillEffect for SafetyNet {
    fn id(&self) -> SkillId {
        SkillId::SafetyNet
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::GameOver]
    }

    fn on_game_over(&self, ctx: &mut EffectContext<'_>, payload: &mut GameOverPayload) {
        if payload.prevent_game_over || ctx.state.safety_net_used {
            return;
        }
        ctx.state.safety_net_used = true;
        payload.prevent_game_over = true;
        payload.restore_lives = payload.restore_lives.max(1);
        ctx.notify("Safety Net caught you with 1 life remaining.");
    }
}

/// Shorter advance threshold right after a demotion.
pub struct QuickRecovery;

impl SkillEffect for QuickRecovery {
    fn id(&self) -> SkillId {
        SkillId::QuickRecovery
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::CorrectAnswer, GameEvent::LevelDemotion]
    }

    fn on_level_demotion(&self, ctx: &mut EffectContext<'_>, _payload: &mut DemotionPayload) {
        ctx.state.quick_recovery_armed = true;
    }

    fn on_correct_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut CorrectPayload) {
        if !ctx.state.quick_recovery_armed {
            return;
        }
        payload.advance_threshold = payload.advance_threshold.min(QUICK_RECOVERY_STREAK);
        if ctx.run.streak_for_level >= QUICK_RECOVERY_STREAK {
            ctx.state.quick_recovery_armed = false;
        }
    }
}

pub struct BattleScars;

impl SkillEffect for BattleScars {
    fn id(&self) -> SkillId {
        SkillId::BattleScars
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::XpCalculation]
    }

    fn on_xp_calculation(&self, ctx: &mut EffectContext<'_>, payload: &mut XpPayload) {
        let stacks = ctx.run.lives_lost.min(BATTLE_SCARS_MAX_STACKS);
        if stacks > 0 {
            payload.bonus_multiplier *= 1.0 + BATTLE_SCARS_STEP * u32_to_f64(stacks);
        }
    }
}

pub struct EnduranceTraining;

impl SkillEffect for EnduranceTraining {
    fn id(&self) -> SkillId {
        SkillId::EnduranceTraining
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::IncorrectAnswer]
    }

    fn on_incorrect_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut IncorrectPayload) {
        if payload.resolved() || ctx.state.endurance_used {
            return;
        }
        ctx.state.endurance_used = true;
        payload.prevent_level_demotion = true;
    }
}

pub struct IronWill;

impl SkillEffect for IronWill {
    fn id(&self) -> SkillId {
        SkillId::IronWill
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::IncorrectAnswer]
    }

    fn on_incorrect_answer(&self, ctx: &mut EffectContext<'_>, payload: &mut IncorrectPayload) {
        if ctx.run.highest_level >= MAX_LEVEL {
            payload.level_floor = payload.level_floor.max(IRON_WILL_FLOOR);
        }
    }
}

pub struct PhoenixRising;

impl SkillEffect for PhoenixRising {
    fn id(&self) -> SkillId {
        SkillId::PhoenixRising
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::GameOver]
    }

    fn on_game_over(&self, ctx: &mut EffectContext<'_>, payload: &mut GameOverPayload) {
        if payload.prevent_game_over || ctx.state.phoenix_used {
            return;
        }
        ctx.state.phoenix_used = true;
        payload.prevent_game_over = true;
        payload.restore_lives = payload.restore_lives.max(1);
        payload.reset_streak = true;
        ctx.notify("Phoenix Rising! You return from defeat.");
    }
}

/// Lives never stay at zero.
pub struct Immortality;

impl SkillEffect for Immortality {
    fn id(&self) -> SkillId {
        SkillId::Immortality
    }

    fn subscriptions(&self) -> &'static [GameEvent] {
        &[GameEvent::GameOver]
    }

    fn on_game_over(&self, _ctx: &mut EffectContext<'_>, payload: &mut GameOverPayload) {
        payload.prevent_game_over = true;
        payload.restore_lives = payload.restore_lives.max(1);
    }
}
