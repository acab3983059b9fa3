//! Weighted question picking among eligible candidates.
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::collections::{BTreeMap, BTreeSet};

use crate::effects::UniverseBias;
use crate::questions::QuestionRecord;

/// Universe a bias points at, if it has eligible questions.
fn bias_target<'q>(
    bias: &UniverseBias,
    eligible: &[&'q QuestionRecord],
    answered_by_universe: &BTreeMap<String, u32>,
    rng: &mut dyn RngCore,
) -> Option<&'q str> {
    let present: BTreeSet<&'q str> = eligible.iter().map(|q| q.universe.as_str()).collect();
    match bias {
        UniverseBias::Prefer(universe) => present.get(universe.as_str()).copied(),
        UniverseBias::LeastAnswered => {
            let count = |universe: &str| answered_by_universe.get(universe).copied().unwrap_or(0);
            let fewest = present.iter().map(|u| count(u)).min()?;
            let tied: Vec<&'q str> = present.into_iter().filter(|u| count(u) == fewest).collect();
            tied.choose(&mut *rng).copied()
        }
    }
}

/// Pick one question from `eligible`.
///
/// Biases are tried in order. A bias whose universe has eligible questions
/// restricts the draw to that universe with probability equal to its weight;
/// otherwise the next bias is tried. The final draw is uniform.
pub fn pick_question<'q>(
    eligible: &[&'q QuestionRecord],
    biases: &[UniverseBias],
    answered_by_universe: &BTreeMap<String, u32>,
    rng: &mut dyn RngCore,
) -> Option<&'q QuestionRecord> {
    if eligible.is_empty() {
        return None;
    }
    for bias in biases {
        let Some(universe) = bias_target(bias, eligible, answered_by_universe, rng) else {
            continue;
        };
        if rng.gen_bool(bias.weight()) {
            let focused: Vec<&'q QuestionRecord> = eligible
                .iter()
                .copied()
                .filter(|q| q.universe == universe)
                .collect();
            return focused.choose(&mut *rng).copied();
        }
    }
    eligible.choose(&mut *rng).copied()
}
