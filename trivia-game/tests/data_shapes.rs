use std::collections::BTreeMap;
use std::hash::Hasher;

use serde_json::Value;
use trivia_game::{
    GameEvent, ProgressionRecord, QuestionRecord, QuestionType, SkillCatalog, SkillId,
};
use twox_hash::XxHash64;

const SKILLS_JSON: &str = include_str!("../assets/skills.json");
const LEVEL_PACKS: [&str; 5] = [
    include_str!("../assets/questions/level1.json"),
    include_str!("../assets/questions/level2.json"),
    include_str!("../assets/questions/level3.json"),
    include_str!("../assets/questions/level4.json"),
    include_str!("../assets/questions/level5.json"),
];

fn snapshot_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

fn catalog_digest(catalog: &SkillCatalog) -> u64 {
    let canonical = serde_json::to_string_pretty(catalog.all()).unwrap();
    snapshot_hash(canonical.as_bytes())
}

#[test]
fn catalog_snapshot_survives_reserialization() {
    let builtin = SkillCatalog::builtin();
    let reparsed =
        SkillCatalog::from_json(&serde_json::to_string(builtin.all()).unwrap()).unwrap();
    assert_eq!(catalog_digest(builtin), catalog_digest(&reparsed));

    let mut edited: Vec<Value> = serde_json::from_str(SKILLS_JSON).unwrap();
    edited[0]["xpCost"] = Value::from(1);
    let edited = SkillCatalog::from_json(&serde_json::to_string(&edited).unwrap()).unwrap();
    assert_ne!(
        catalog_digest(builtin),
        catalog_digest(&edited),
        "cost edits must change the snapshot"
    );
}

#[test]
fn catalog_covers_every_skill_in_order() {
    let catalog = SkillCatalog::builtin();
    let ids: Vec<SkillId> = catalog.all().iter().map(|skill| skill.id).collect();
    assert_eq!(ids, SkillId::ALL.to_vec());
    for branch in 1..=3 {
        let tiers: Vec<u8> = catalog.branch(branch).map(|skill| skill.tier).collect();
        assert_eq!(tiers, (1..=12).collect::<Vec<u8>>(), "branch {branch}");
    }
    let kinds = catalog.categorize();
    assert_eq!(kinds.active.len() + kinds.passive.len(), SkillId::ALL.len());
}

#[test]
fn question_packs_use_the_wire_shape() {
    let mut per_universe: BTreeMap<String, usize> = BTreeMap::new();
    for (index, pack) in LEVEL_PACKS.iter().enumerate() {
        let records: Vec<QuestionRecord> = serde_json::from_str(pack).unwrap();
        let tier = u8::try_from(index + 1).unwrap();
        assert!(!records.is_empty());
        for record in &records {
            record.validate().unwrap();
            assert_eq!(record.difficulty_tier, tier);
            if record.question_type == QuestionType::MultipleChoice {
                let options = record.options.as_ref().unwrap();
                assert!(options.contains(&record.correct_answer));
            }
            *per_universe.entry(record.universe.clone()).or_insert(0) += 1;
        }
    }
    assert!(per_universe.len() >= 3, "universes: {per_universe:?}");

    let first: Vec<QuestionRecord> = serde_json::from_str(LEVEL_PACKS[0]).unwrap();
    let value = serde_json::to_value(&first[0]).unwrap();
    for key in [
        "questionText",
        "questionType",
        "correctAnswer",
        "universe",
        "difficultyTier",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn progression_record_keeps_its_storage_keys() {
    let record = ProgressionRecord {
        total_xp: 40,
        unlocked_skill_ids: vec!["extraLife".to_string()],
        high_score: 90,
        ..ProgressionRecord::default()
    };
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["totalXP"], 40);
    assert_eq!(value["unlockedSkills"][0], "extraLife");
    assert_eq!(value["highScore"], 90);

    let legacy: ProgressionRecord =
        serde_json::from_str(r#"{"totalXP": 15, "unlockedSkills": ["fiftyFifty"]}"#).unwrap();
    assert_eq!(legacy.total_xp, 15);
    assert!(legacy.has_skill("fiftyFifty"));
    assert_eq!(legacy.runs_played, 0);
}

#[test]
fn event_names_are_stable() {
    let names: Vec<&str> = GameEvent::ALL.iter().map(|event| event.as_str()).collect();
    assert_eq!(names.len(), 11);
    assert_eq!(names[0], "gameStart");
    assert!(names.contains(&"xpCalculation"));
}
