pub mod backend;
pub mod solve_params;
pub mod termination;
