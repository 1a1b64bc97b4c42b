pub mod error;
pub mod json;
pub mod model;
pub mod network;
pub mod planner;
pub mod problem;
pub mod rolling;
pub mod solution;
pub mod solver;
pub mod trucks;
mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
