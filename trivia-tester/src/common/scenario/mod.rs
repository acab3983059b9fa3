use crate::logic::SimulationPlan;

pub mod branches;
pub mod fallback;
pub mod smoke;

/// Named simulation plan run over every requested seed.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke::smoke_scenario()),
        "survivalist" | "survival" => Some(branches::survivalist_scenario()),
        "strategist" | "strategy" => Some(branches::strategist_scenario()),
        "experience" | "xp" => Some(branches::experience_scenario()),
        "full-tree" | "full" => Some(branches::full_tree_scenario()),
        "fallback" => Some(fallback::fallback_scenario()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test - perfect player, no skills"),
        ("survivalist", "Survivalist Branch - guessing player"),
        ("strategist", "Strategist Branch - scholar using active skills"),
        ("experience", "Experience Branch - XP multipliers"),
        ("full-tree", "Full Skill Tree - every skill unlocked"),
        ("fallback", "Fallback Questions - every source unreachable"),
    ]
}

/// Expand the `all` keyword into every registered scenario.
pub fn expand_scenarios(requested: Vec<String>) -> Vec<String> {
    if !requested.iter().any(|name| name == "all") {
        return requested;
    }
    let mut scenarios: Vec<String> = requested.into_iter().filter(|s| s != "all").collect();
    for (key, _) in list_scenarios() {
        if !scenarios.iter().any(|name| name == key) {
            scenarios.push(key.to_string());
        }
    }
    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key).unwrap_or_else(|| panic!("{key} missing"));
            assert!(!scenario.plan.expectations.is_empty(), "{key} checks nothing");
        }
        assert!(get_scenario("nope").is_none());
        assert!(get_scenario("SMOKE").is_some());
    }

    #[test]
    fn all_expands_without_duplicates() {
        let expanded = expand_scenarios(vec!["smoke".to_string(), "all".to_string()]);
        assert_eq!(expanded.len(), list_scenarios().len());
        assert_eq!(expanded[0], "smoke");
    }
}
