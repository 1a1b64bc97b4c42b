pub mod cost_breakdown;
pub mod invariants;
pub mod material_balance;
pub mod plan_solution;
