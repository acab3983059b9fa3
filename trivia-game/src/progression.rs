//! Persisted player progression: XP wallet, unlocked skills and lifetime stats.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::catalog::{SkillCatalog, SkillId};
use crate::constants::{PLAYER_DATA_KEY, SETTINGS_KEY, STORAGE_ADVISORY};
use crate::settings::Settings;
use crate::storage::KeyValueStore;

/// Values carried from one run into the next run's effect state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunCarryOver {
    pub previous_run_xp: u64,
    pub won_previous_run: bool,
}

/// One player profile.
///
/// `unlocked_skill_ids` behaves as an append-only set: ids are only added by
/// [`ProgressionStore::unlock`] and never removed except by a full reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionRecord {
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    #[serde(rename = "unlockedSkills")]
    pub unlocked_skill_ids: Vec<String>,
    pub high_score: u32,
    pub questions_answered: u64,
    /// Lifetime correct answers per universe.
    pub universe_correct: BTreeMap<String, u32>,
    pub runs_played: u32,
    pub last_run: Option<RunCarryOver>,
}

impl ProgressionRecord {
    #[must_use]
    pub fn has_skill(&self, id: &str) -> bool {
        self.unlocked_skill_ids.iter().any(|owned| owned == id)
    }

    /// Universe with the most lifetime correct answers. Ties resolve to the
    /// alphabetically first universe.
    #[must_use]
    pub fn strongest_universe(&self) -> Option<&str> {
        let mut best: Option<(&str, u32)> = None;
        for (universe, count) in &self.universe_correct {
            if *count == 0 {
                continue;
            }
            if best.is_none_or(|(_, top)| *count > top) {
                best = Some((universe.as_str(), *count));
            }
        }
        best.map(|(universe, _)| universe)
    }
}

/// End-of-run totals handed to [`ProgressionStore::record_run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub xp_earned: u64,
    pub score: u32,
    pub questions_answered: u32,
    pub won: bool,
    pub universe_correct: BTreeMap<String, u32>,
}

/// Result of persisting a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecorded {
    pub total_xp: u64,
    pub new_high_score: bool,
}

/// Why a persisted blob could not be used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDiagnostic {
    /// Present but not decodable; defaults were substituted.
    Corrupt,
    /// The backend failed; the session now runs on an in-memory copy.
    Unavailable,
}

impl fmt::Display for StorageDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt => f.write_str("stored data was corrupt and has been reset to defaults"),
            Self::Unavailable => f.write_str("storage is unavailable; using in-memory data"),
        }
    }
}

/// A loaded value plus the diagnostic raised while loading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub value: T,
    pub diagnostic: Option<StorageDiagnostic>,
}

impl<T> Loaded<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnlockError {
    #[error("Unknown skill '{0}'")]
    UnknownSkill(String),
    #[error("Skill already unlocked")]
    AlreadyUnlocked,
    #[error("Missing prerequisites: {}", join_ids(.missing))]
    PrerequisitesMissing { missing: Vec<SkillId> },
    #[error("Not enough XP: need {needed}, have {available}")]
    InsufficientXp { needed: u64, available: u64 },
}

fn join_ids(ids: &[SkillId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockReceipt {
    pub skill_id: SkillId,
    pub remaining_xp: u64,
    pub message: String,
}

/// Sole reader and writer of the progression and settings blobs.
///
/// Read-modify-write sequences are not guarded against concurrent callers; a
/// store instance assumes one active session.
#[derive(Debug)]
pub struct ProgressionStore<K> {
    backend: K,
    degraded: bool,
    memory_record: Option<ProgressionRecord>,
    memory_settings: Option<Settings>,
    advisory_pending: bool,
    advisory_raised: bool,
}

impl<K: KeyValueStore> ProgressionStore<K> {
    pub const fn new(backend: K) -> Self {
        Self {
            backend,
            degraded: false,
            memory_record: None,
            memory_settings: None,
            advisory_pending: false,
            advisory_raised: false,
        }
    }

    pub const fn backend(&self) -> &K {
        &self.backend
    }

    /// True once a storage failure moved this store onto in-memory data.
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The storage advisory, returned at most once per store.
    pub fn take_advisory(&mut self) -> Option<&'static str> {
        if self.advisory_pending {
            self.advisory_pending = false;
            Some(STORAGE_ADVISORY)
        } else {
            None
        }
    }

    fn degrade(&mut self) {
        self.degraded = true;
        if !self.advisory_raised {
            log::warn!("using in-memory fallback for player data");
            self.advisory_raised = true;
            self.advisory_pending = true;
        }
    }

    /// Read the progression record, substituting defaults on absence or failure.
    pub fn load(&mut self) -> Loaded<ProgressionRecord> {
        if self.degraded {
            return Loaded::clean(self.memory_record.clone().unwrap_or_default());
        }
        match self.backend.get(PLAYER_DATA_KEY) {
            Ok(None) => Loaded::clean(ProgressionRecord::default()),
            Ok(Some(raw)) => match serde_json::from_str::<ProgressionRecord>(&raw) {
                Ok(record) => Loaded::clean(record),
                Err(err) => {
                    log::warn!("player data is corrupt, using defaults: {err}");
                    Loaded {
                        value: ProgressionRecord::default(),
                        diagnostic: Some(StorageDiagnostic::Corrupt),
                    }
                }
            },
            Err(err) => {
                log::warn!("error retrieving player data: {err}");
                self.degrade();
                let value = self.memory_record.get_or_insert_with(Default::default).clone();
                Loaded {
                    value,
                    diagnostic: Some(StorageDiagnostic::Unavailable),
                }
            }
        }
    }

    /// Persist `record`. Returns false when only the in-memory copy was updated.
    pub fn save(&mut self, record: &ProgressionRecord) -> bool {
        if self.degraded {
            self.memory_record = Some(record.clone());
            return false;
        }
        let persisted = match serde_json::to_string(record) {
            Ok(json) => self.backend.set(PLAYER_DATA_KEY, &json).map_err(|err| {
                log::warn!("error saving player data: {err}");
            }),
            Err(err) => {
                log::warn!("player data failed to serialize: {err}");
                Err(())
            }
        };
        if persisted.is_err() {
            self.degrade();
            self.memory_record = Some(record.clone());
            return false;
        }
        true
    }

    /// Add XP to the wallet, counting a question only when `from_answer` is set.
    pub fn add_xp(&mut self, amount: u64, from_answer: bool) -> u64 {
        let mut record = self.load().value;
        record.total_xp = record.total_xp.saturating_add(amount);
        if from_answer {
            record.questions_answered = record.questions_answered.saturating_add(1);
        }
        self.save(&record);
        record.total_xp
    }

    /// Spend XP to unlock a skill.
    ///
    /// Checks run in order: known id, not already unlocked, prerequisites
    /// present, enough XP. Nothing is written unless every check passes.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`UnlockError`].
    pub fn unlock(
        &mut self,
        catalog: &SkillCatalog,
        skill_id: &str,
    ) -> Result<UnlockReceipt, UnlockError> {
        let skill = catalog.require(skill_id).map_err(|err| {
            log::warn!("unlock requested for {err}");
            UnlockError::UnknownSkill(skill_id.to_string())
        })?;
        let mut record = self.load().value;
        if record.has_skill(skill_id) {
            return Err(UnlockError::AlreadyUnlocked);
        }
        let missing = catalog.missing_prerequisites(skill, &record);
        if !missing.is_empty() {
            return Err(UnlockError::PrerequisitesMissing { missing });
        }
        if record.total_xp < skill.xp_cost {
            return Err(UnlockError::InsufficientXp {
                needed: skill.xp_cost,
                available: record.total_xp,
            });
        }
        record.total_xp -= skill.xp_cost;
        record.unlocked_skill_ids.push(skill_id.to_string());
        self.save(&record);
        log::info!("unlocked skill {} for {} XP", skill.id, skill.xp_cost);
        Ok(UnlockReceipt {
            skill_id: skill.id,
            remaining_xp: record.total_xp,
            message: "Skill unlocked successfully".to_string(),
        })
    }

    /// Persist a finished run in a single write.
    pub fn record_run(&mut self, summary: &RunSummary) -> RunRecorded {
        let mut record = self.load().value;
        record.total_xp = record.total_xp.saturating_add(summary.xp_earned);
        record.questions_answered = record
            .questions_answered
            .saturating_add(u64::from(summary.questions_answered));
        let new_high_score = summary.score > record.high_score;
        if new_high_score {
            record.high_score = summary.score;
        }
        for (universe, count) in &summary.universe_correct {
            let entry = record.universe_correct.entry(universe.clone()).or_insert(0);
            *entry = entry.saturating_add(*count);
        }
        record.runs_played = record.runs_played.saturating_add(1);
        record.last_run = Some(RunCarryOver {
            previous_run_xp: summary.xp_earned,
            won_previous_run: summary.won,
        });
        self.save(&record);
        RunRecorded {
            total_xp: record.total_xp,
            new_high_score,
        }
    }

    /// Returns true when `score` beat the stored high score.
    pub fn update_high_score(&mut self, score: u32) -> bool {
        let mut record = self.load().value;
        if score > record.high_score {
            record.high_score = score;
            self.save(&record);
            return true;
        }
        false
    }

    /// Overwrite the progression record with defaults. Settings are untouched.
    pub fn reset_progress(&mut self) {
        self.save(&ProgressionRecord::default());
    }

    pub fn load_settings(&mut self) -> Loaded<Settings> {
        if self.degraded {
            return Loaded::clean(self.memory_settings.clone().unwrap_or_default());
        }
        match self.backend.get(SETTINGS_KEY) {
            Ok(None) => Loaded::clean(Settings::default()),
            Ok(Some(raw)) => serde_json::from_str::<Settings>(&raw).map_or_else(
                |err| {
                    log::warn!("settings are corrupt, using defaults: {err}");
                    Loaded {
                        value: Settings::default(),
                        diagnostic: Some(StorageDiagnostic::Corrupt),
                    }
                },
                Loaded::clean,
            ),
            Err(err) => {
                log::warn!("error retrieving settings: {err}");
                self.degrade();
                Loaded {
                    value: self.memory_settings.clone().unwrap_or_default(),
                    diagnostic: Some(StorageDiagnostic::Unavailable),
                }
            }
        }
    }

    pub fn save_settings(&mut self, settings: &Settings) -> bool {
        if self.degraded {
            self.memory_settings = Some(settings.clone());
            return false;
        }
        let written = serde_json::to_string(settings)
            .map_err(|err| log::warn!("settings failed to serialize: {err}"))
            .and_then(|json| {
                self.backend
                    .set(SETTINGS_KEY, &json)
                    .map_err(|err| log::warn!("error saving settings: {err}"))
            });
        if written.is_err() {
            self.degrade();
            self.memory_settings = Some(settings.clone());
            return false;
        }
        true
    }
}
