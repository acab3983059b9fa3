//! Skill catalog: the static registry of skill tree definitions.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::progression::ProgressionRecord;

const SKILLS_JSON: &str = include_str!("../assets/skills.json");

static BUILTIN: Lazy<SkillCatalog> = Lazy::new(|| {
    SkillCatalog::from_json(SKILLS_JSON).unwrap_or_else(|err| {
        log::error!("embedded skill catalog failed to load: {err}");
        SkillCatalog::empty()
    })
});

/// Identifier of every skill in the tree.
///
/// Declaration order matches the catalog order, and the derived `Ord` is the
/// fixed order in which effect handlers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillId {
    // Branch 1: Survivalist
    ExtraLife,
    SecondWind,
    Resilience,
    LifeVessel,
    RechargeStation,
    SafetyNet,
    QuickRecovery,
    BattleScars,
    EnduranceTraining,
    IronWill,
    PhoenixRising,
    Immortality,
    // Branch 2: Strategic
    FiftyFifty,
    DifficultyBypass,
    CategoryInsight,
    KnowledgeExpansion,
    UniversalScholar,
    TimeExtension,
    QuestionPreview,
    InsightfulPattern,
    MasteryRewards,
    CriticalThinking,
    Intuition,
    Omniscience,
    // Branch 3: Experience
    LearningCurve,
    StreakBonus,
    QuickStudy,
    StartingBonus,
    EfficientLearner,
    UniverseExpert,
    DifficultyBonus,
    KnowledgeRetention,
    ExperienceSurge,
    LegacyKnowledge,
    EpicQuest,
    XpOverflow,
}

impl SkillId {
    pub const ALL: &'static [Self] = &[
        Self::ExtraLife,
        Self::SecondWind,
        Self::Resilience,
        Self::LifeVessel,
        Self::RechargeStation,
        Self::SafetyNet,
        Self::QuickRecovery,
        Self::BattleScars,
        Self::EnduranceTraining,
        Self::IronWill,
        Self::PhoenixRising,
        Self::Immortality,
        Self::FiftyFifty,
        Self::DifficultyBypass,
        Self::CategoryInsight,
        Self::KnowledgeExpansion,
        Self::UniversalScholar,
        Self::TimeExtension,
        Self::QuestionPreview,
        Self::InsightfulPattern,
        Self::MasteryRewards,
        Self::CriticalThinking,
        Self::Intuition,
        Self::Omniscience,
        Self::LearningCurve,
        Self::StreakBonus,
        Self::QuickStudy,
        Self::StartingBonus,
        Self::EfficientLearner,
        Self::UniverseExpert,
        Self::DifficultyBonus,
        Self::KnowledgeRetention,
        Self::ExperienceSurge,
        Self::LegacyKnowledge,
        Self::EpicQuest,
        Self::XpOverflow,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtraLife => "extraLife",
            Self::SecondWind => "secondWind",
            Self::Resilience => "resilience",
            Self::LifeVessel => "lifeVessel",
            Self::RechargeStation => "rechargeStation",
            Self::SafetyNet => "safetyNet",
            Self::QuickRecovery => "quickRecovery",
            Self::BattleScars => "battleScars",
            Self::EnduranceTraining => "enduranceTraining",
            Self::IronWill => "ironWill",
            Self::PhoenixRising => "phoenixRising",
            Self::Immortality => "immortality",
            Self::FiftyFifty => "fiftyFifty",
            Self::DifficultyBypass => "difficultyBypass",
            Self::CategoryInsight => "categoryInsight",
            Self::KnowledgeExpansion => "knowledgeExpansion",
            Self::UniversalScholar => "universalScholar",
            Self::TimeExtension => "timeExtension",
            Self::QuestionPreview => "questionPreview",
            Self::InsightfulPattern => "insightfulPattern",
            Self::MasteryRewards => "masteryRewards",
            Self::CriticalThinking => "criticalThinking",
            Self::Intuition => "intuition",
            Self::Omniscience => "omniscience",
            Self::LearningCurve => "learningCurve",
            Self::StreakBonus => "streakBonus",
            Self::QuickStudy => "quickStudy",
            Self::StartingBonus => "startingBonus",
            Self::EfficientLearner => "efficientLearner",
            Self::UniverseExpert => "universeExpert",
            Self::DifficultyBonus => "difficultyBonus",
            Self::KnowledgeRetention => "knowledgeRetention",
            Self::ExperienceSurge => "experienceSurge",
            Self::LegacyKnowledge => "legacyKnowledge",
            Self::EpicQuest => "epicQuest",
            Self::XpOverflow => "xpOverflow",
        }
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| CatalogError::NotFound(s.to_string()))
    }
}

impl From<SkillId> for String {
    fn from(value: SkillId) -> Self {
        value.as_str().to_string()
    }
}

/// Errors raised by catalog lookups and catalog validation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown skill id '{0}'")]
    NotFound(String),
    #[error("skill catalog JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("skill '{id}' is invalid: {reason}")]
    Invalid { id: SkillId, reason: String },
}

/// Immutable definition of a single skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDefinition {
    pub id: SkillId,
    pub name: String,
    /// Branch of the tree (1..=3)
    pub branch: u8,
    /// Position within the branch (1..=12)
    pub tier: u8,
    pub description: String,
    pub xp_cost: u64,
    /// Every listed skill must already be unlocked.
    #[serde(default)]
    pub prerequisites: SmallVec<[SkillId; 2]>,
    /// Active skills are triggered by the player; passive ones react to events.
    #[serde(default)]
    pub is_active: bool,
}

/// Skill ids split by how they are triggered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillKinds {
    pub passive: Vec<SkillId>,
    pub active: Vec<SkillId>,
}

/// Eligibility of a skill for unlocking against a progression record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockStatus {
    Unlocked,
    Available,
    Locked {
        missing: Vec<SkillId>,
        xp_short: u64,
    },
}

/// Ordered registry of skill definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillCatalog {
    skills: Vec<SkillDefinition>,
}

impl SkillCatalog {
    /// The catalog embedded in the crate.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self { skills: Vec::new() }
    }

    /// Parse and validate a catalog from a JSON array of definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the definitions violate
    /// catalog invariants.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let skills: Vec<SkillDefinition> = serde_json::from_str(json)?;
        let catalog = Self { skills };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check id uniqueness, ranges, and that prerequisite chains point backwards
    /// within the same branch.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen: HashSet<SkillId> = HashSet::with_capacity(self.skills.len());
        for skill in &self.skills {
            let invalid = |reason: String| CatalogError::Invalid {
                id: skill.id,
                reason,
            };
            if !seen.insert(skill.id) {
                return Err(invalid("duplicate id".to_string()));
            }
            if !(1..=3).contains(&skill.branch) {
                return Err(invalid(format!("branch {} outside 1..=3", skill.branch)));
            }
            if !(1..=12).contains(&skill.tier) {
                return Err(invalid(format!("tier {} outside 1..=12", skill.tier)));
            }
            if skill.xp_cost == 0 {
                return Err(invalid("xp cost must be positive".to_string()));
            }
            for prereq in &skill.prerequisites {
                let Some(parent) = self.get(*prereq).filter(|_| seen.contains(prereq)) else {
                    return Err(invalid(format!(
                        "prerequisite '{prereq}' is not declared before it"
                    )));
                };
                if parent.branch != skill.branch || parent.tier >= skill.tier {
                    return Err(invalid(format!(
                        "prerequisite '{prereq}' does not precede it in branch {}",
                        skill.branch
                    )));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: SkillId) -> Option<&SkillDefinition> {
        self.skills.iter().find(|skill| skill.id == id)
    }

    /// Look up a skill by its external string id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for ids outside the catalog.
    pub fn require(&self, id: &str) -> Result<&SkillDefinition, CatalogError> {
        let parsed: SkillId = id.parse()?;
        self.get(parsed)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// All definitions in catalog order.
    #[must_use]
    pub fn all(&self) -> &[SkillDefinition] {
        &self.skills
    }

    pub fn branch(&self, branch: u8) -> impl Iterator<Item = &SkillDefinition> {
        self.skills.iter().filter(move |skill| skill.branch == branch)
    }

    #[must_use]
    pub fn categorize(&self) -> SkillKinds {
        let mut kinds = SkillKinds::default();
        for skill in &self.skills {
            if skill.is_active {
                kinds.active.push(skill.id);
            } else {
                kinds.passive.push(skill.id);
            }
        }
        kinds
    }

    #[must_use]
    pub fn is_active(&self, id: SkillId) -> bool {
        self.get(id).is_some_and(|skill| skill.is_active)
    }

    /// Prerequisites of `skill` not yet present in `record`.
    #[must_use]
    pub fn missing_prerequisites(
        &self,
        skill: &SkillDefinition,
        record: &ProgressionRecord,
    ) -> Vec<SkillId> {
        skill
            .prerequisites
            .iter()
            .copied()
            .filter(|prereq| !record.has_skill(prereq.as_str()))
            .collect()
    }

    /// Eligibility view used by skill tree screens.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for ids outside the catalog.
    pub fn unlock_status(
        &self,
        id: &str,
        record: &ProgressionRecord,
    ) -> Result<UnlockStatus, CatalogError> {
        let skill = self.require(id)?;
        if record.has_skill(id) {
            return Ok(UnlockStatus::Unlocked);
        }
        let missing = self.missing_prerequisites(skill, record);
        let xp_short = skill.xp_cost.saturating_sub(record.total_xp);
        if missing.is_empty() && xp_short == 0 {
            Ok(UnlockStatus::Available)
        } else {
            Ok(UnlockStatus::Locked { missing, xp_short })
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_complete_and_ordered() {
        let catalog = SkillCatalog::builtin();
        assert_eq!(catalog.len(), SkillId::ALL.len());
        let ids: Vec<SkillId> = catalog.all().iter().map(|s| s.id).collect();
        assert_eq!(ids, SkillId::ALL.to_vec());
        for branch in 1..=3 {
            assert_eq!(catalog.branch(branch).count(), 12);
        }
    }

    #[test]
    fn categorize_splits_active_and_passive() {
        let kinds = SkillCatalog::builtin().categorize();
        assert_eq!(
            kinds.active,
            vec![
                SkillId::FiftyFifty,
                SkillId::DifficultyBypass,
                SkillId::CategoryInsight,
                SkillId::TimeExtension,
                SkillId::Intuition,
                SkillId::UniverseExpert,
            ]
        );
        assert_eq!(kinds.passive.len(), 30);
    }

    #[test]
    fn string_ids_roundtrip_and_unknown_ids_fail() {
        for id in SkillId::ALL {
            assert_eq!(id.as_str().parse::<SkillId>().unwrap(), *id);
            let json = serde_json::to_string(id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
        let err = SkillCatalog::builtin().require("masterScholar").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref id) if id == "masterScholar"));
    }

    #[test]
    fn validate_rejects_forward_prerequisites() {
        let json = r#"[
            {"id": "secondWind", "name": "Second Wind", "branch": 1, "tier": 2,
             "description": "", "xpCost": 250, "prerequisites": ["extraLife"], "isActive": false},
            {"id": "extraLife", "name": "Extra Life", "branch": 1, "tier": 1,
             "description": "", "xpCost": 100, "prerequisites": [], "isActive": false}
        ]"#;
        let err = SkillCatalog::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Invalid {
                id: SkillId::SecondWind,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_zero_cost_and_bad_branch() {
        let zero_cost = r#"[{"id": "extraLife", "name": "x", "branch": 1, "tier": 1,
            "description": "", "xpCost": 0}]"#;
        assert!(SkillCatalog::from_json(zero_cost).is_err());
        let bad_branch = r#"[{"id": "extraLife", "name": "x", "branch": 4, "tier": 1,
            "description": "", "xpCost": 10}]"#;
        assert!(SkillCatalog::from_json(bad_branch).is_err());
    }

    #[test]
    fn unlock_status_reports_missing_prerequisites_and_xp() {
        let catalog = SkillCatalog::builtin();
        let mut record = ProgressionRecord::default();
        record.total_xp = 120;

        assert_eq!(
            catalog.unlock_status("extraLife", &record).unwrap(),
            UnlockStatus::Available
        );
        assert_eq!(
            catalog.unlock_status("secondWind", &record).unwrap(),
            UnlockStatus::Locked {
                missing: vec![SkillId::ExtraLife],
                xp_short: 130,
            }
        );

        record.unlocked_skill_ids.push("extraLife".to_string());
        assert_eq!(
            catalog.unlock_status("extraLife", &record).unwrap(),
            UnlockStatus::Unlocked
        );
        assert!(catalog.unlock_status("nope", &record).is_err());
    }
}
