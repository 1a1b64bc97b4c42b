use jiff::civil::{Date, date, time};

use crate::problem::{
    cost_structure::CostStructure,
    labor::{LaborCalendar, ManufacturingParams, StandardLaborRates},
    location::{Location, LocationType},
    planning_problem::{PlanningProblem, PlanningProblemBuilder, TruckScheduleInput},
    product::Product,
    route_definition::RouteDefinition,
    storage_state::{StorageCapability, StorageState},
};

/// Weekdays 12h fixed + 2h overtime, weekends paid per hour without minimum.
pub fn test_labor(start: Date, end: Date) -> LaborCalendar {
    LaborCalendar::standard(
        start,
        end,
        &StandardLaborRates {
            minimum_hours: 0.0,
            ..StandardLaborRates::default()
        },
    )
}

/// A line without startup, shutdown or changeover, keeping models pure LPs.
pub fn test_manufacturing() -> ManufacturingParams {
    ManufacturingParams {
        production_rate_per_hour: 100.0,
        startup_hours: 0.0,
        shutdown_hours: 0.0,
        changeover_hours: 0.0,
    }
}

fn base_builder() -> PlanningProblemBuilder {
    let mut builder = PlanningProblemBuilder::default();
    builder
        .add_product(Product::new("BREAD", 17, 120))
        .set_labor_calendar(test_labor(date(2025, 5, 26), date(2025, 6, 30)))
        .set_manufacturing(test_manufacturing())
        .set_costs(CostStructure::default());
    builder
}

/// PLANT (ambient and frozen) sends frozen to HUB which only stores
/// ambient, HUB serves STORE. 500 units of BREAD without production date
/// sit at PLANT.
pub fn create_frozen_hub_problem() -> PlanningProblem {
    let mut builder = base_builder();
    builder
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Both,
        ))
        .add_location(Location::new(
            "HUB",
            LocationType::Hub,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "STORE",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_route(RouteDefinition::single(
            "PLANT-HUB",
            "PLANT",
            "HUB",
            1,
            StorageState::Frozen,
            0.2,
        ))
        .add_route(RouteDefinition::single(
            "HUB-STORE",
            "HUB",
            "STORE",
            1,
            StorageState::Ambient,
            0.1,
        ))
        .add_initial_inventory("PLANT", "BREAD", StorageState::Ambient, 500.0, None);

    for day in 9..=13 {
        builder.add_demand("STORE", "BREAD", date(2025, 6, day), 300.0);
    }

    builder.build().unwrap()
}

/// STORE is reached either directly (2 days, 0.5 per unit) or through HUB
/// (1 + 2 days, 0.2 per unit). Demand Monday 2025-06-09 to Friday.
pub fn two_path_problem_builder() -> PlanningProblemBuilder {
    let mut builder = base_builder();
    builder
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "HUB",
            LocationType::Hub,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "STORE",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_route(RouteDefinition::single(
            "DIRECT",
            "PLANT",
            "STORE",
            2,
            StorageState::Ambient,
            0.5,
        ))
        .add_route(RouteDefinition::single(
            "PLANT-HUB",
            "PLANT",
            "HUB",
            1,
            StorageState::Ambient,
            0.1,
        ))
        .add_route(RouteDefinition::single(
            "HUB-STORE",
            "HUB",
            "STORE",
            2,
            StorageState::Ambient,
            0.1,
        ));

    for day in 9..=13 {
        builder.add_demand("STORE", "BREAD", date(2025, 6, day), 400.0);
    }

    builder
}

pub fn create_two_path_problem() -> PlanningProblem {
    two_path_problem_builder().build().unwrap()
}

/// FAR is five days away, longer than the three day ambient shelf life.
pub fn create_short_shelf_life_problem() -> PlanningProblem {
    let mut builder = PlanningProblemBuilder::default();
    builder
        .add_product(Product::new("SALAD", 3, 3))
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "FAR",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_route(RouteDefinition::single(
            "LONG",
            "PLANT",
            "FAR",
            5,
            StorageState::Ambient,
            0.2,
        ))
        .add_demand("FAR", "SALAD", date(2025, 6, 10), 100.0);

    builder.build().unwrap()
}

/// ISLAND has demand but no route leads there.
pub fn create_unreachable_destination_problem() -> PlanningProblem {
    let mut builder = base_builder();
    builder
        .add_location(Location::new(
            "PLANT",
            LocationType::Manufacturing,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "STORE",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_location(Location::new(
            "ISLAND",
            LocationType::Destination,
            StorageCapability::Ambient,
        ))
        .add_route(RouteDefinition::single(
            "DIRECT",
            "PLANT",
            "STORE",
            1,
            StorageState::Ambient,
            0.3,
        ))
        .add_demand("STORE", "BREAD", date(2025, 6, 10), 100.0)
        .add_demand("ISLAND", "BREAD", date(2025, 6, 10), 100.0);

    builder.build().unwrap()
}

/// Three stores one day from PLANT. MORNING (08:00) drops at STORE_C then
/// STORE_A, AFTERNOON (14:00) at STORE_A then STORE_B. Both trucks run
/// daily with 2 pallets of 100 units in cases of 10.
pub fn truck_problem_builder() -> PlanningProblemBuilder {
    let mut builder = base_builder();
    builder.add_location(Location::new(
        "PLANT",
        LocationType::Manufacturing,
        StorageCapability::Ambient,
    ));
    for store in ["STORE_A", "STORE_B", "STORE_C"] {
        builder
            .add_location(Location::new(
                store,
                LocationType::Destination,
                StorageCapability::Ambient,
            ))
            .add_route(RouteDefinition::single(
                format!("PLANT-{store}"),
                "PLANT",
                store,
                1,
                StorageState::Ambient,
                0.2,
            ))
            .add_demand(store, "BREAD", date(2025, 6, 5), 100.0);
    }

    builder
        .add_truck_schedule(TruckScheduleInput {
            id: "MORNING".to_owned(),
            origin: "PLANT".to_owned(),
            destination: "STORE_A".to_owned(),
            intermediate_stops: vec!["STORE_C".to_owned()],
            day_of_week: None,
            departure_time: time(8, 0, 0, 0),
            pallet_capacity: 2,
            units_per_pallet: 100,
            units_per_case: 10,
        })
        .add_truck_schedule(TruckScheduleInput {
            id: "AFTERNOON".to_owned(),
            origin: "PLANT".to_owned(),
            destination: "STORE_B".to_owned(),
            intermediate_stops: vec!["STORE_A".to_owned()],
            day_of_week: None,
            departure_time: time(14, 0, 0, 0),
            pallet_capacity: 2,
            units_per_pallet: 100,
            units_per_case: 10,
        });

    builder
}

pub fn create_truck_problem() -> PlanningProblem {
    truck_problem_builder().build().unwrap()
}
