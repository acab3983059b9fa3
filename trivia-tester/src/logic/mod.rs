pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use policy::{PlayerPolicy, PlayerStrategy, PolicyDecision};
pub use seeds::{SeedError, resolve_seed_inputs};
pub use simulation::{QuestionSetup, SimulationPlan, SimulationSummary, run_plan};
pub use tester::*;
