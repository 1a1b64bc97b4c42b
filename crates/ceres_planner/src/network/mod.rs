pub mod leg;
pub mod planning_network;
pub mod route_enumerator;
pub mod topology;
