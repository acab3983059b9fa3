use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use trivia_game::{
    MemoryStore, ProgressionStore, SkillCatalog, SkillId, UnlockError, UnlockStatus,
};

#[test]
fn random_unlock_sequences_keep_the_tree_consistent() {
    let catalog = SkillCatalog::builtin();
    for seed in 0..40_u64 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut store = ProgressionStore::new(MemoryStore::new());
        let mut expected_xp = 0_u64;
        for _ in 0..120 {
            if rng.gen_bool(0.4) {
                let amount = rng.gen_range(1..=400);
                expected_xp = store.add_xp(amount, false);
                continue;
            }
            let skill = *SkillId::ALL.choose(&mut rng).unwrap();
            let before = store.load().value;
            let status = catalog.unlock_status(skill.as_str(), &before).unwrap();
            match store.unlock(catalog, skill.as_str()) {
                Ok(receipt) => {
                    assert_eq!(status, UnlockStatus::Available, "seed {seed} {skill}");
                    let cost = catalog.get(skill).unwrap().xp_cost;
                    assert_eq!(receipt.remaining_xp, before.total_xp - cost);
                    expected_xp = receipt.remaining_xp;
                }
                Err(UnlockError::AlreadyUnlocked) => {
                    assert_eq!(status, UnlockStatus::Unlocked);
                }
                Err(UnlockError::PrerequisitesMissing { missing }) => {
                    assert!(matches!(status, UnlockStatus::Locked { .. }));
                    assert!(!missing.is_empty());
                }
                Err(UnlockError::InsufficientXp { needed, available }) => {
                    assert!(needed > available);
                    assert_eq!(available, before.total_xp);
                }
                Err(UnlockError::UnknownSkill(id)) => panic!("catalog skill {id} reported unknown"),
            }
            let after = store.load().value;
            assert_eq!(after.total_xp, expected_xp);
        }

        let record = store.load().value;
        let owned: BTreeSet<&str> = record.unlocked_skill_ids.iter().map(String::as_str).collect();
        assert_eq!(owned.len(), record.unlocked_skill_ids.len(), "duplicates for seed {seed}");
        for id in &record.unlocked_skill_ids {
            let def = catalog.require(id).unwrap();
            for prereq in &def.prerequisites {
                assert!(owned.contains(prereq.as_str()), "{id} without {prereq}");
            }
        }
    }
}

#[test]
fn reset_clears_progress_but_not_settings() {
    let mut store = ProgressionStore::new(MemoryStore::new());
    store.add_xp(500, true);
    store.unlock(SkillCatalog::builtin(), "extraLife").unwrap();
    let settings = trivia_game::Settings {
        sound: false,
        ..trivia_game::Settings::default()
    };
    assert!(store.save_settings(&settings));

    store.reset_progress();
    let record = store.load().value;
    assert_eq!(record.total_xp, 0);
    assert!(record.unlocked_skill_ids.is_empty());
    assert!(!store.load_settings().value.sound);
}
