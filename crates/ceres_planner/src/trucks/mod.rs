pub mod loading_policy;
pub mod truck_loading;
