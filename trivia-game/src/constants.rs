//! Centralized balance and tuning constants for Trivia Quest game logic.
//!
//! These values define the deterministic math for a run. Keeping them
//! together ensures that gameplay can only be adjusted via code changes
//! reviewed in version control, rather than through external JSON assets.

// Run shape ----------------------------------------------------------------
pub const BASE_LIVES: u32 = 3;
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;
pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 5;
pub const LEVEL_ADVANCE_STREAK: u32 = 5;
pub const SCORE_PER_CORRECT: u32 = 10;
pub const XP_PER_LEVEL: u32 = 10;
/// Presentation hint between answer submission and resolution.
pub const FEEDBACK_DELAY_MS: u64 = 1_500;

// Selection biases ---------------------------------------------------------
pub const PREFERRED_UNIVERSE_WEIGHT: f64 = 0.70;
pub const LEAST_ANSWERED_UNIVERSE_WEIGHT: f64 = 0.60;

// Survivalist tuning -------------------------------------------------------
pub(crate) const RESILIENCE_CHANCE: f64 = 0.20;
pub(crate) const RECHARGE_INTERVAL: u32 = 10;
pub(crate) const QUICK_RECOVERY_STREAK: u32 = 3;
pub(crate) const BATTLE_SCARS_STEP: f64 = 0.10;
pub(crate) const BATTLE_SCARS_MAX_STACKS: u32 = 3;
pub(crate) const IRON_WILL_FLOOR: u8 = 4;

// Strategic tuning ---------------------------------------------------------
pub(crate) const CRITICAL_THINKING_CHANCE: f64 = 0.10;
pub(crate) const UNIVERSAL_SCHOLAR_BONUS: f64 = 1.15;
pub(crate) const MASTERY_REWARDS_BONUS: f64 = 1.50;
pub(crate) const MASTERY_REWARDS_MIN_LEVEL: u8 = 4;

// Experience tuning --------------------------------------------------------
pub(crate) const LEARNING_CURVE_BONUS: f64 = 1.20;
pub(crate) const STREAK_BONUS: f64 = 1.50;
pub(crate) const STREAK_BONUS_MIN: u32 = 3;
pub(crate) const QUICK_STUDY_BONUS: f64 = 1.25;
pub(crate) const QUICK_STUDY_QUESTIONS: u32 = 5;
pub(crate) const STARTING_BONUS_XP: u32 = 50;
pub(crate) const EFFICIENT_LEARNER_INTERVAL: u32 = 10;
pub(crate) const DOUBLE_XP: f64 = 2.0;
pub(crate) const TRIPLE_XP: f64 = 3.0;
pub(crate) const UNIVERSE_EXPERT_BONUS: f64 = 1.25;
pub(crate) const DIFFICULTY_BONUS: f64 = 1.40;
pub(crate) const DIFFICULTY_BONUS_MIN_TIER: u8 = 4;
pub(crate) const KNOWLEDGE_RETENTION_STEP: f64 = 0.02;
pub(crate) const KNOWLEDGE_RETENTION_CAP: f64 = 0.20;
pub(crate) const EXPERIENCE_SURGE_AFTER: u32 = 15;
pub(crate) const EXPERIENCE_SURGE_BONUS: f64 = 1.30;
pub(crate) const LEGACY_KNOWLEDGE_SHARE: f64 = 0.05;

// Storage keys -------------------------------------------------------------
pub const PLAYER_DATA_KEY: &str = "trivia-quest-player-data";
pub const SETTINGS_KEY: &str = "trivia-quest-settings";

// Notice texts -------------------------------------------------------------
pub const STORAGE_ADVISORY: &str = "There was an issue saving your game data. Your progress for this session will be maintained, but may not persist after you close the game.";
