pub mod cost_structure;
pub mod forecast;
pub mod initial_inventory;
pub mod labor;
pub mod location;
pub mod planning_problem;
pub mod product;
pub mod route_definition;
pub mod storage_state;
pub mod truck_schedule;
