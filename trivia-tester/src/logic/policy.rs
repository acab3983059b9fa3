use std::fmt;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use trivia_game::{QuestionRecord, SkillId};

/// Answer returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub answer: String,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(answer: impl Into<String>, rationale: Option<String>) -> Self {
        Self {
            answer: answer.into(),
            rationale,
        }
    }
}

/// Policy interface for automated players.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick one of the options currently on screen.
    fn pick_answer(&mut self, question: &QuestionRecord, options: &[String]) -> PolicyDecision;

    /// Whether to trigger `skill` before answering `question`.
    fn wants_activation(&mut self, _skill: SkillId, _question: &QuestionRecord) -> bool {
        false
    }
}

/// Built-in player strategies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlayerStrategy {
    /// Always answers correctly.
    Perfect,
    /// Uniform pick among the shown options.
    Guesser,
    /// Correct with probability `accuracy`, otherwise a wrong option.
    Scholar { accuracy: f64 },
}

impl PlayerStrategy {
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Perfect => "Perfect".to_string(),
            Self::Guesser => "Guesser".to_string(),
            Self::Scholar { accuracy } => format!("Scholar {:.0}%", accuracy * 100.0),
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Perfect => Box::new(PerfectPolicy),
            Self::Guesser => Box::new(GuesserPolicy::new(seed)),
            Self::Scholar { accuracy } => Box::new(ScholarPolicy::new(seed, accuracy)),
        }
    }
}

impl fmt::Display for PlayerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

struct PerfectPolicy;

struct GuesserPolicy {
    rng: ChaCha20Rng,
}

impl GuesserPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

struct ScholarPolicy {
    rng: ChaCha20Rng,
    accuracy: f64,
}

impl ScholarPolicy {
    fn new(seed: u64, accuracy: f64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            accuracy: accuracy.clamp(0.0, 1.0),
        }
    }
}

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn pick_answer(&mut self, question: &QuestionRecord, _options: &[String]) -> PolicyDecision {
        PolicyDecision::new(question.correct_answer.clone(), None)
    }
}

impl PlayerPolicy for GuesserPolicy {
    fn name(&self) -> &'static str {
        "Guesser"
    }

    fn pick_answer(&mut self, question: &QuestionRecord, options: &[String]) -> PolicyDecision {
        let answer = options
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| question.correct_answer.clone());
        PolicyDecision::new(answer, Some(format!("1 of {}", options.len())))
    }

    fn wants_activation(&mut self, _skill: SkillId, _question: &QuestionRecord) -> bool {
        true
    }
}

impl PlayerPolicy for ScholarPolicy {
    fn name(&self) -> &'static str {
        "Scholar"
    }

    fn pick_answer(&mut self, question: &QuestionRecord, options: &[String]) -> PolicyDecision {
        if self.rng.gen_bool(self.accuracy) {
            return PolicyDecision::new(question.correct_answer.clone(), Some("knew it".into()));
        }
        let wrong: Vec<&String> = options
            .iter()
            .filter(|option| **option != question.correct_answer)
            .collect();
        match wrong.choose(&mut self.rng) {
            Some(option) => PolicyDecision::new((*option).clone(), Some("slipped".into())),
            None => PolicyDecision::new(question.correct_answer.clone(), Some("forced".into())),
        }
    }

    fn wants_activation(&mut self, _skill: SkillId, _question: &QuestionRecord) -> bool {
        self.rng.gen_bool(0.5)
    }
}
