//! Presentation boundary consumed by the session.
use serde::{Deserialize, Serialize};

use crate::questions::QuestionRecord;
use crate::session::RunPhase;

/// Numbers shown in the lives, score and level indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub lives: u32,
    pub max_lives: u32,
    pub score: u32,
    pub level: u8,
    pub xp_earned: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub selected: String,
    pub correct_answer: String,
    pub correct: bool,
}

/// End-of-run screen contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalView {
    pub phase: RunPhase,
    pub score: u32,
    pub xp_earned: u64,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub new_high_score: bool,
    pub message: String,
}

/// Fire-and-forget presentation calls.
pub trait RenderSurface {
    fn show_question(&mut self, question: &QuestionRecord, options: &[String]);
    fn show_answer_feedback(&mut self, feedback: &AnswerFeedback);
    fn update_status(&mut self, status: &StatusView);
    fn show_notification(&mut self, message: &str);
    fn show_terminal(&mut self, view: &TerminalView);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SurfaceCall {
    Question { text: String, options: Vec<String> },
    Feedback(AnswerFeedback),
    Status(StatusView),
    Notification { message: String },
    Terminal(TerminalView),
}

/// Surface that records every call, for tests and headless drivers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().filter_map(|call| match call {
            SurfaceCall::Notification { message } => Some(message.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn last_question(&self) -> Option<(&str, &[String])> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::Question { text, options } => Some((text.as_str(), options.as_slice())),
            _ => None,
        })
    }

    #[must_use]
    pub fn last_status(&self) -> Option<StatusView> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::Status(status) => Some(*status),
            _ => None,
        })
    }

    #[must_use]
    pub fn terminal(&self) -> Option<&TerminalView> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::Terminal(view) => Some(view),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl RenderSurface for RecordingSurface {
    fn show_question(&mut self, question: &QuestionRecord, options: &[String]) {
        self.calls.push(SurfaceCall::Question {
            text: question.question_text.clone(),
            options: options.to_vec(),
        });
    }

    fn show_answer_feedback(&mut self, feedback: &AnswerFeedback) {
        self.calls.push(SurfaceCall::Feedback(feedback.clone()));
    }

    fn update_status(&mut self, status: &StatusView) {
        self.calls.push(SurfaceCall::Status(*status));
    }

    fn show_notification(&mut self, message: &str) {
        self.calls.push(SurfaceCall::Notification {
            message: message.to_string(),
        });
    }

    fn show_terminal(&mut self, view: &TerminalView) {
        self.calls.push(SurfaceCall::Terminal(view.clone()));
    }
}
