mod direct_week_tests;
mod frozen_hub_tests;
mod production_tests;
mod rolling_horizon_tests;
mod shortage_tests;
mod truck_loading_tests;
