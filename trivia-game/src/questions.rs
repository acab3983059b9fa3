//! Question records, question sources and the in-memory question pool.
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::constants::{MAX_TIER, MIN_TIER};

const FALLBACK_JSON: &str = include_str!("../assets/fallback_questions.json");

const BUNDLED_PACKS: [(&str, &str); 5] = [
    ("level1", include_str!("../assets/questions/level1.json")),
    ("level2", include_str!("../assets/questions/level2.json")),
    ("level3", include_str!("../assets/questions/level3.json")),
    ("level4", include_str!("../assets/questions/level4.json")),
    ("level5", include_str!("../assets/questions/level5.json")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    TrueFalse,
    MultipleChoice,
}

impl QuestionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrueFalse => "TrueFalse",
            Self::MultipleChoice => "MultipleChoice",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dedup key for a question within a run.
///
/// Two distinct questions sharing text and answer collide; that is a known
/// limitation of the key format.
#[must_use]
pub fn question_key(text: &str, answer: &str) -> String {
    format!("{text}-{answer}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub universe: String,
    pub difficulty_tier: u8,
}

/// Why a single question record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("difficulty tier {0} is outside {MIN_TIER}..={MAX_TIER}")]
    TierOutOfRange(u8),
    #[error("multiple-choice question has no options")]
    MissingOptions,
    #[error("options do not include the correct answer '{0}'")]
    AnswerNotInOptions(String),
    #[error("true/false answer must be 'True' or 'False', got '{0}'")]
    InvalidTrueFalseAnswer(String),
}

impl QuestionRecord {
    #[must_use]
    pub fn key(&self) -> String {
        question_key(&self.question_text, &self.correct_answer)
    }

    #[must_use]
    pub fn is_correct(&self, selected: &str) -> bool {
        self.correct_answer == selected
    }

    /// Options as presented before shuffling or effects.
    #[must_use]
    pub fn base_options(&self) -> Vec<String> {
        match self.question_type {
            QuestionType::TrueFalse => vec!["True".to_string(), "False".to_string()],
            QuestionType::MultipleChoice => self.options.clone().unwrap_or_default(),
        }
    }

    /// # Errors
    ///
    /// Returns the first shape violation found in the record.
    pub fn validate(&self) -> Result<(), RecordError> {
        if !(MIN_TIER..=MAX_TIER).contains(&self.difficulty_tier) {
            return Err(RecordError::TierOutOfRange(self.difficulty_tier));
        }
        match self.question_type {
            QuestionType::MultipleChoice => {
                let options = self
                    .options
                    .as_deref()
                    .filter(|options| !options.is_empty())
                    .ok_or(RecordError::MissingOptions)?;
                if !options.contains(&self.correct_answer) {
                    return Err(RecordError::AnswerNotInOptions(self.correct_answer.clone()));
                }
            }
            QuestionType::TrueFalse => {
                if self.correct_answer != "True" && self.correct_answer != "False" {
                    return Err(RecordError::InvalidTrueFalseAnswer(
                        self.correct_answer.clone(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("question source '{name}' is unreachable: {reason}")]
    Unreachable { name: String, reason: String },
    #[error("question source '{name}' could not be read: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("question source '{name}' is not a JSON array: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Provider of a JSON array of question records.
pub trait QuestionSource {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error when the source cannot be reached or read.
    fn fetch(&self) -> Result<String, SourceError>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl QuestionSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String, SourceError> {
        std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            name: self.name.clone(),
            source,
        })
    }
}

/// In-memory JSON, used for embedded packs and tests.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    json: String,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, json: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            json: json.into(),
        }
    }
}

impl QuestionSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String, SourceError> {
        Ok(self.json.clone())
    }
}

/// Source that always fails, standing in for an unreachable endpoint.
#[derive(Debug, Clone)]
pub struct UnavailableSource {
    name: String,
}

impl UnavailableSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl QuestionSource for UnavailableSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<String, SourceError> {
        Err(SourceError::Unreachable {
            name: self.name.clone(),
            reason: "source is offline".to_string(),
        })
    }
}

#[cfg(feature = "async")]
pub use async_loading::{AsyncFileSource, AsyncQuestionSource};

#[cfg(feature = "async")]
mod async_loading {
    use super::SourceError;
    use std::path::PathBuf;

    /// Question source fetched asynchronously during the initial load.
    #[async_trait::async_trait]
    pub trait AsyncQuestionSource: Send + Sync {
        fn name(&self) -> &str;

        /// # Errors
        ///
        /// Returns an error when the source cannot be reached or read.
        async fn fetch(&self) -> Result<String, SourceError>;
    }

    #[derive(Debug, Clone)]
    pub struct AsyncFileSource {
        path: PathBuf,
        name: String,
    }

    impl AsyncFileSource {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            let path = path.into();
            let name = path.display().to_string();
            Self { path, name }
        }
    }

    #[async_trait::async_trait]
    impl AsyncQuestionSource for AsyncFileSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self) -> Result<String, SourceError> {
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SourceError::Io {
                    name: self.name.clone(),
                    source,
                })
        }
    }
}

/// Counters describing how the pool was assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded_sources: usize,
    pub failed_sources: usize,
    pub skipped_records: usize,
}

#[derive(Debug)]
struct Pool {
    questions: Vec<QuestionRecord>,
    fallback: bool,
    report: LoadReport,
}

/// Parse one source payload, skipping invalid records individually.
fn parse_records(
    name: &str,
    json: &str,
    report: &mut LoadReport,
) -> Result<Vec<QuestionRecord>, SourceError> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|source| SourceError::Malformed {
            name: name.to_string(),
            source,
        })?;
    let mut records = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        let parsed = serde_json::from_value::<QuestionRecord>(value)
            .map_err(|err| err.to_string())
            .and_then(|record| {
                record
                    .validate()
                    .map(|()| record)
                    .map_err(|err| err.to_string())
            });
        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => {
                report.skipped_records += 1;
                log::warn!("skipping question #{index} from {name}: {reason}");
            }
        }
    }
    Ok(records)
}

/// The built-in seed set used when no source yields questions.
#[must_use]
pub fn fallback_questions() -> Vec<QuestionRecord> {
    let mut report = LoadReport::default();
    parse_records("fallback", FALLBACK_JSON, &mut report).unwrap_or_else(|err| {
        log::error!("embedded fallback questions failed to load: {err}");
        Vec::new()
    })
}

fn merge(fetched: Vec<(String, Result<String, SourceError>)>) -> Pool {
    let mut report = LoadReport::default();
    let mut questions = Vec::new();
    for (name, payload) in fetched {
        match payload.and_then(|json| parse_records(&name, &json, &mut report)) {
            Ok(records) => {
                log::info!("loaded {} questions from {name}", records.len());
                report.loaded_sources += 1;
                questions.extend(records);
            }
            Err(err) => {
                report.failed_sources += 1;
                log::warn!("{err}");
            }
        }
    }
    log::info!(
        "loaded {} questions from {} sources ({} failed)",
        questions.len(),
        report.loaded_sources,
        report.failed_sources
    );
    if questions.is_empty() {
        let questions = fallback_questions();
        log::warn!("using {} fallback questions", questions.len());
        return Pool {
            questions,
            fallback: true,
            report,
        };
    }
    Pool {
        questions,
        fallback: false,
        report,
    }
}

/// Pool of questions loaded at most once from an ordered list of sources.
pub struct QuestionRepository {
    sources: Vec<Box<dyn QuestionSource>>,
    pool: OnceCell<Pool>,
}

impl fmt::Debug for QuestionRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionRepository")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("loaded", &self.pool.get().is_some())
            .finish()
    }
}

impl QuestionRepository {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn QuestionSource>>) -> Self {
        Self {
            sources,
            pool: OnceCell::new(),
        }
    }

    /// Repository over the five embedded level packs.
    #[must_use]
    pub fn bundled() -> Self {
        Self::new(
            BUNDLED_PACKS
                .iter()
                .map(|(name, json)| {
                    Box::new(StaticSource::new(*name, *json)) as Box<dyn QuestionSource>
                })
                .collect(),
        )
    }

    /// Repository whose pool is exactly `records` after validation.
    #[must_use]
    pub fn from_records(records: Vec<QuestionRecord>) -> Self {
        let repo = Self::new(Vec::new());
        let mut report = LoadReport::default();
        let questions: Vec<QuestionRecord> = records
            .into_iter()
            .filter(|record| match record.validate() {
                Ok(()) => true,
                Err(err) => {
                    report.skipped_records += 1;
                    log::warn!("skipping question '{}': {err}", record.question_text);
                    false
                }
            })
            .collect();
        let pool = if questions.is_empty() {
            Pool {
                questions: fallback_questions(),
                fallback: true,
                report,
            }
        } else {
            Pool {
                questions,
                fallback: false,
                report,
            }
        };
        repo.pool.get_or_init(|| pool);
        repo
    }

    /// Load every source once. Returns false when the fallback set is in use.
    ///
    /// Later calls return the memoized outcome without fetching again.
    pub fn load(&self) -> bool {
        !self.ensure_loaded().fallback
    }

    #[cfg(feature = "async")]
    /// Asynchronous initial load from `sources`, awaited before play begins.
    ///
    /// Has no effect if the pool was already loaded.
    pub async fn load_async(&self, sources: &[Box<dyn AsyncQuestionSource>]) -> bool {
        if let Some(pool) = self.pool.get() {
            return !pool.fallback;
        }
        let mut fetched = Vec::with_capacity(sources.len());
        for source in sources {
            fetched.push((source.name().to_string(), source.fetch().await));
        }
        let pool = self.pool.get_or_init(|| merge(fetched));
        !pool.fallback
    }

    fn ensure_loaded(&self) -> &Pool {
        self.pool.get_or_init(|| {
            merge(
                self.sources
                    .iter()
                    .map(|source| (source.name().to_string(), source.fetch()))
                    .collect(),
            )
        })
    }

    pub fn pool(&self) -> &[QuestionRecord] {
        &self.ensure_loaded().questions
    }

    pub fn is_fallback(&self) -> bool {
        self.ensure_loaded().fallback
    }

    pub fn report(&self) -> LoadReport {
        self.ensure_loaded().report
    }

    pub fn len(&self) -> usize {
        self.pool().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool().is_empty()
    }

    pub fn by_exact_difficulty(&self, tier: u8) -> Vec<&QuestionRecord> {
        self.pool()
            .iter()
            .filter(|q| q.difficulty_tier == tier)
            .collect()
    }

    /// Questions at `max_tier` or below.
    pub fn by_max_difficulty(&self, max_tier: u8) -> Vec<&QuestionRecord> {
        self.pool()
            .iter()
            .filter(|q| q.difficulty_tier <= max_tier)
            .collect()
    }

    pub fn by_universe(&self, universe: &str) -> Vec<&QuestionRecord> {
        self.pool()
            .iter()
            .filter(|q| q.universe == universe)
            .collect()
    }

    /// Distinct universes in the pool, sorted.
    pub fn universes(&self) -> Vec<String> {
        self.pool()
            .iter()
            .map(|q| q.universe.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSource {
        calls: Rc<Cell<u32>>,
    }

    impl QuestionSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(&self) -> Result<String, SourceError> {
            self.calls.set(self.calls.get() + 1);
            Ok(BUNDLED_PACKS[0].1.to_string())
        }
    }

    fn mc(text: &str, options: &[&str], answer: &str, tier: u8) -> QuestionRecord {
        QuestionRecord {
            question_text: text.to_string(),
            question_type: QuestionType::MultipleChoice,
            options: Some(options.iter().map(|o| (*o).to_string()).collect()),
            correct_answer: answer.to_string(),
            universe: "Marvel".to_string(),
            difficulty_tier: tier,
        }
    }

    #[test]
    fn fallback_set_spans_every_tier() {
        let questions = fallback_questions();
        assert!(questions.len() >= 10);
        for tier in MIN_TIER..=MAX_TIER {
            assert!(questions.iter().any(|q| q.difficulty_tier == tier));
        }
        assert!(questions.iter().any(|q| q.question_type == QuestionType::TrueFalse));
        assert!(
            questions
                .iter()
                .any(|q| q.question_type == QuestionType::MultipleChoice)
        );
    }

    #[test]
    fn unreachable_sources_fall_back() {
        let repo = QuestionRepository::new(vec![
            Box::new(UnavailableSource::new("remote")),
            Box::new(StaticSource::new("broken", "{ nope")),
        ]);
        assert!(!repo.load());
        assert!(repo.is_fallback());
        assert!(!repo.by_exact_difficulty(5).is_empty());
        assert_eq!(repo.report().failed_sources, 2);
    }

    #[test]
    fn partial_failures_merge_remaining_sources() {
        let repo = QuestionRepository::new(vec![
            Box::new(UnavailableSource::new("remote")),
            Box::new(StaticSource::new("level1", BUNDLED_PACKS[0].1)),
            Box::new(StaticSource::new("level2", BUNDLED_PACKS[1].1)),
        ]);
        assert!(repo.load());
        assert_eq!(repo.report().loaded_sources, 2);
        assert!(repo.by_exact_difficulty(3).is_empty());
        assert!(!repo.by_exact_difficulty(2).is_empty());
    }

    #[test]
    fn empty_array_source_is_not_fatal_but_empty_pool_falls_back() {
        let repo = QuestionRepository::new(vec![Box::new(StaticSource::new("empty", "[]"))]);
        assert!(!repo.load());
        assert_eq!(repo.report().loaded_sources, 1);
        assert!(repo.len() >= 10);
    }

    #[test]
    fn invalid_records_are_skipped_individually() {
        let json = r#"[
            {"questionText": "ok", "questionType": "TrueFalse", "correctAnswer": "True",
             "universe": "Disney", "difficultyTier": 1},
            {"questionText": "tier", "questionType": "TrueFalse", "correctAnswer": "True",
             "universe": "Disney", "difficultyTier": 9},
            {"questionText": "no options", "questionType": "MultipleChoice",
             "correctAnswer": "A", "universe": "Disney", "difficultyTier": 2},
            {"questionText": "missing answer", "questionType": "MultipleChoice",
             "options": ["B", "C"], "correctAnswer": "A", "universe": "Disney", "difficultyTier": 2},
            {"questionText": "yes?", "questionType": "TrueFalse", "correctAnswer": "Yes",
             "universe": "Disney", "difficultyTier": 2},
            {"questionText": 7}
        ]"#;
        let repo = QuestionRepository::new(vec![Box::new(StaticSource::new("mixed", json))]);
        assert!(repo.load());
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.report().skipped_records, 5);
    }

    #[test]
    fn record_pools_are_ready_without_a_load() {
        let repo = QuestionRepository::from_records(vec![
            mc("Capital of France?", &["Paris", "Rome"], "Paris", 1),
            mc("Broken", &["A", "B"], "C", 1),
        ]);
        assert_eq!(repo.len(), 1);
        assert!(repo.load());
        assert!(!repo.is_fallback());
        assert_eq!(repo.report().skipped_records, 1);

        let empty = QuestionRepository::from_records(Vec::new());
        assert!(!empty.load());
        assert_eq!(empty.len(), fallback_questions().len());
    }

    #[test]
    fn load_is_memoized() {
        let calls = Rc::new(Cell::new(0));
        let repo = QuestionRepository::new(vec![Box::new(CountingSource {
            calls: Rc::clone(&calls),
        })]);
        assert!(!repo.by_universe("Disney").is_empty());
        assert!(repo.load());
        let _ = repo.by_exact_difficulty(1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn filters_and_universes() {
        let repo = QuestionRepository::bundled();
        assert_eq!(repo.universes(), vec!["Disney", "Marvel", "StarWars"]);
        assert!(
            repo.by_max_difficulty(2)
                .iter()
                .all(|q| q.difficulty_tier <= 2)
        );
        assert!(repo.by_universe("Pixar").is_empty());
        for tier in MIN_TIER..=MAX_TIER {
            assert!(!repo.by_exact_difficulty(tier).is_empty());
        }
    }

    #[test]
    fn key_and_options() {
        let q = mc("Capital of France?", &["Paris", "London"], "Paris", 1);
        assert_eq!(q.key(), "Capital of France?-Paris");
        assert!(q.is_correct("Paris"));
        assert_eq!(q.base_options(), vec!["Paris", "London"]);
        let tf = QuestionRecord {
            question_type: QuestionType::TrueFalse,
            options: None,
            correct_answer: "False".to_string(),
            ..q.clone()
        };
        assert_eq!(tf.base_options(), vec!["True", "False"]);
        assert_eq!(
            mc("x", &[], "A", 1).validate(),
            Err(RecordError::MissingOptions)
        );
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_load_reads_files_once() {
        let dir = std::env::temp_dir().join(format!("trivia-async-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pack.json");
        std::fs::write(&path, BUNDLED_PACKS[4].1).unwrap();

        let repo = QuestionRepository::new(Vec::new());
        let sources: Vec<Box<dyn AsyncQuestionSource>> = vec![
            Box::new(AsyncFileSource::new(&path)),
            Box::new(AsyncFileSource::new(dir.join("missing.json"))),
        ];
        assert!(repo.load_async(&sources).await);
        assert_eq!(repo.report().failed_sources, 1);
        assert!(repo.pool().iter().all(|q| q.difficulty_tier == 5));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
