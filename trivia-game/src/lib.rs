//! Trivia Quest Game Engine
//!
//! Platform-agnostic core of a multi-level trivia quiz with a persistent
//! skill tree. Rendering, storage and question transport sit behind traits
//! so the engine runs headless in tests and in the logic tester.

pub mod catalog;
pub mod constants;
pub mod effects;
pub mod numbers;
pub mod progression;
pub mod questions;
pub mod render;
pub mod rng;
pub mod selection;
pub mod session;
pub mod settings;
pub mod storage;

// Re-export commonly used types
pub use catalog::{
    CatalogError, SkillCatalog, SkillDefinition, SkillId, SkillKinds, UnlockStatus,
};
pub use effects::{
    ActivationEffect, ActivationOutcome, ActivationRejection, EffectEngine, GameEvent,
    SkillEffectState, UniverseBias,
};
pub use progression::{
    Loaded, ProgressionRecord, ProgressionStore, RunCarryOver, RunRecorded, RunSummary,
    StorageDiagnostic, UnlockError, UnlockReceipt,
};
#[cfg(feature = "async")]
pub use questions::{AsyncFileSource, AsyncQuestionSource};
pub use questions::{
    FileSource, LoadReport, QuestionRecord, QuestionRepository, QuestionSource, QuestionType,
    SourceError, StaticSource, UnavailableSource, fallback_questions,
};
pub use render::{AnswerFeedback, RecordingSurface, RenderSurface, StatusView, TerminalView};
pub use rng::{RngBundle, RngDraws};
pub use session::{AnswerOutcome, GameSession, RunContext, RunPhase, SessionError, SessionState};
pub use settings::{Settings, Theme};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, UnavailableStore};

/// Main game engine owning the question pool and the player's progression.
pub struct GameEngine<K> {
    questions: QuestionRepository,
    store: ProgressionStore<K>,
}

impl<K: KeyValueStore> GameEngine<K> {
    /// Create a new game engine over `questions` and a storage backend
    pub const fn new(questions: QuestionRepository, backend: K) -> Self {
        Self {
            questions,
            store: ProgressionStore::new(backend),
        }
    }

    /// Engine over the embedded question packs.
    pub fn bundled(backend: K) -> Self {
        Self::new(QuestionRepository::bundled(), backend)
    }

    /// Load the question pool. Returns false when the fallback set is in use.
    pub fn load_questions(&self) -> bool {
        let loaded = self.questions.load();
        if !loaded {
            log::warn!("question sources failed; playing with the fallback set");
        }
        loaded
    }

    pub const fn questions(&self) -> &QuestionRepository {
        &self.questions
    }

    pub const fn store(&self) -> &ProgressionStore<K> {
        &self.store
    }

    pub fn catalog(&self) -> &'static SkillCatalog {
        SkillCatalog::builtin()
    }

    /// Current progression record, defaults when nothing is stored.
    pub fn record(&mut self) -> ProgressionRecord {
        self.store.load().value
    }

    /// Unlock a skill for future runs.
    ///
    /// # Errors
    ///
    /// Returns the first failed unlock check.
    pub fn unlock(&mut self, skill_id: &str) -> Result<UnlockReceipt, UnlockError> {
        self.store.unlock(SkillCatalog::builtin(), skill_id)
    }

    /// Whether `skill_id` is unlocked, affordable, or blocked.
    ///
    /// # Errors
    ///
    /// Returns an error if the skill is not in the catalog.
    pub fn unlock_status(&mut self, skill_id: &str) -> Result<UnlockStatus, CatalogError> {
        let record = self.record();
        SkillCatalog::builtin().unlock_status(skill_id, &record)
    }

    pub fn settings(&mut self) -> Settings {
        self.store.load_settings().value
    }

    pub fn save_settings(&mut self, settings: &Settings) -> bool {
        self.store.save_settings(settings)
    }

    pub fn reset_progress(&mut self) {
        self.store.reset_progress();
    }

    /// Create a session for one run with the given seed.
    #[must_use]
    pub fn new_session(&self, seed: u64) -> GameSession {
        GameSession::new(seed)
    }

    /// Lend the pool, the store and `surface` to a session call.
    pub fn run_context<'a, S: RenderSurface>(
        &'a mut self,
        surface: &'a mut S,
    ) -> RunContext<'a, K, S> {
        RunContext::new(&self.questions, &mut self.store, surface)
    }
}
