pub mod rolling_config;
pub mod rolling_horizon;
