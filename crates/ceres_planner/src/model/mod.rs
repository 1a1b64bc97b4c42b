pub mod cohort;
pub mod cohort_model;
mod extraction;
pub mod model_params;
pub mod opening_state;
pub mod planning_window;
