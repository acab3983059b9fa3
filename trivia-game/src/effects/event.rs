//! Game events and the typed payloads handlers receive with them.
//!
//! Each payload is created fresh for a single firing. Multipliers and flags
//! on a payload therefore never leak into the next firing.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use super::{EffectContext, SkillEffect};
use crate::constants::{LEAST_ANSWERED_UNIVERSE_WEIGHT, PREFERRED_UNIVERSE_WEIGHT};
use crate::numbers::award_xp;
use crate::questions::QuestionRecord;

/// Fixed set of milestones at which skill handlers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameEvent {
    GameStart,
    QuestionSelection,
    QuestionLoaded,
    QuestionDisplay,
    CorrectAnswer,
    IncorrectAnswer,
    LevelDemotion,
    XpCalculation,
    GameOver,
    GameWin,
    GameEnd,
}

impl GameEvent {
    pub const ALL: [Self; 11] = [
        Self::GameStart,
        Self::QuestionSelection,
        Self::QuestionLoaded,
        Self::QuestionDisplay,
        Self::CorrectAnswer,
        Self::IncorrectAnswer,
        Self::LevelDemotion,
        Self::XpCalculation,
        Self::GameOver,
        Self::GameWin,
        Self::GameEnd,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GameStart => "gameStart",
            Self::QuestionSelection => "questionSelection",
            Self::QuestionLoaded => "questionLoaded",
            Self::QuestionDisplay => "questionDisplay",
            Self::CorrectAnswer => "correctAnswer",
            Self::IncorrectAnswer => "incorrectAnswer",
            Self::LevelDemotion => "levelDemotion",
            Self::XpCalculation => "xpCalculation",
            Self::GameOver => "gameOver",
            Self::GameWin => "gameWin",
            Self::GameEnd => "gameEnd",
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds a payload type to its event and to the handler method that receives it.
pub trait EventPayload {
    const EVENT: GameEvent;

    fn deliver(&mut self, effect: &dyn SkillEffect, ctx: &mut EffectContext<'_>);
}

macro_rules! bind_payload {
    ($payload:ty, $event:ident, $method:ident) => {
        impl EventPayload for $payload {
            const EVENT: GameEvent = GameEvent::$event;

            fn deliver(&mut self, effect: &dyn SkillEffect, ctx: &mut EffectContext<'_>) {
                effect.$method(ctx, self);
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPayload {
    pub lives: u32,
    pub max_lives: u32,
    /// Run XP granted before the first question.
    pub bonus_xp: u32,
}

/// Weighted preference applied while picking among eligible questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniverseBias {
    Prefer(String),
    LeastAnswered,
}

impl UniverseBias {
    #[must_use]
    pub const fn weight(&self) -> f64 {
        match self {
            Self::Prefer(_) => PREFERRED_UNIVERSE_WEIGHT,
            Self::LeastAnswered => LEAST_ANSWERED_UNIVERSE_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPayload {
    pub level: u8,
    /// Tier to query; starts at the current level.
    pub tier: u8,
    /// Resolved in push order.
    pub biases: SmallVec<[UniverseBias; 2]>,
    /// Question keys to avoid if anything else is eligible.
    pub excluded: Vec<String>,
}

impl SelectionPayload {
    #[must_use]
    pub fn for_level(level: u8) -> Self {
        Self {
            level,
            tier: level,
            biases: SmallVec::new(),
            excluded: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPayload<'q> {
    pub question: &'q QuestionRecord,
    /// Unseen questions left at this tier, including this one.
    pub remaining_at_tier: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPayload<'q> {
    pub question: &'q QuestionRecord,
    pub options: Vec<String>,
    /// First display of this question. Redisplays carry the trimmed options.
    pub fresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectPayload {
    pub tier: u8,
    pub universe: String,
    /// Consecutive correct answers needed at this level to advance.
    pub advance_threshold: u32,
    pub lives_restored: u32,
}

/// Flags on a wrong answer. The first resolution set wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncorrectPayload {
    pub tier: u8,
    pub universe: String,
    /// Treat the answer as correct.
    pub convert_to_correct: bool,
    /// Move on without losing a life.
    pub forgive: bool,
    /// Show the same question again without losing a life.
    pub retry: bool,
    pub prevent_level_demotion: bool,
    /// Lowest level a demotion may reach.
    pub level_floor: u8,
}

impl IncorrectPayload {
    /// True once any handler has already resolved the miss.
    #[must_use]
    pub const fn resolved(&self) -> bool {
        self.convert_to_correct || self.forgive || self.retry
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemotionPayload {
    pub from: u8,
    pub to: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XpPayload {
    pub base_xp: u32,
    /// Product of every percentage bonus.
    pub bonus_multiplier: f64,
    /// Product of one-shot boosts such as double or triple XP.
    pub xp_multiplier: f64,
    pub tier: u8,
    pub universe: String,
    pub level: u8,
}

impl XpPayload {
    #[must_use]
    pub fn award(&self) -> u32 {
        award_xp(self.base_xp, self.bonus_multiplier, self.xp_multiplier)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameOverPayload {
    pub prevent_game_over: bool,
    /// Lives to restore when the game over is prevented.
    pub restore_lives: u32,
    pub reset_streak: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinPayload {
    pub xp_earned: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndPayload {
    pub won: bool,
    pub xp_earned: u64,
}

bind_payload!(StartPayload, GameStart, on_game_start);
bind_payload!(SelectionPayload, QuestionSelection, on_question_selection);
bind_payload!(LoadedPayload<'_>, QuestionLoaded, on_question_loaded);
bind_payload!(DisplayPayload<'_>, QuestionDisplay, on_question_display);
bind_payload!(CorrectPayload, CorrectAnswer, on_correct_answer);
bind_payload!(IncorrectPayload, IncorrectAnswer, on_incorrect_answer);
bind_payload!(DemotionPayload, LevelDemotion, on_level_demotion);
bind_payload!(XpPayload, XpCalculation, on_xp_calculation);
bind_payload!(GameOverPayload, GameOver, on_game_over);
bind_payload!(WinPayload, GameWin, on_game_win);
bind_payload!(EndPayload, GameEnd, on_game_end);
