use fxhash::FxHashMap;
use jiff::civil::{Date, Time, Weekday};

use crate::{
    error::PlanningError,
    problem::{
        cost_structure::CostStructure,
        forecast::{DemandEntry, Forecast},
        initial_inventory::InitialInventory,
        labor::{LaborCalendar, ManufacturingParams},
        location::{Location, LocationIdx},
        product::{Product, ProductIdx},
        route_definition::RouteDefinition,
        storage_state::StorageState,
        truck_schedule::{TruckScheduleBuilder, TruckScheduleCollection},
    },
    utils::enumerate_idx::EnumerateIdx,
};

/// Validated, immutable input of the planning engine.
#[derive(Debug, Clone)]
pub struct PlanningProblem {
    locations: Vec<Location>,
    products: Vec<Product>,
    routes: Vec<RouteDefinition>,
    forecast: Forecast,
    labor: LaborCalendar,
    manufacturing: ManufacturingParams,
    manufacturing_site: LocationIdx,
    trucks: TruckScheduleCollection,
    costs: CostStructure,
    initial_inventory: Vec<InitialInventory>,
    location_ids: FxHashMap<String, LocationIdx>,
    product_ids: FxHashMap<String, ProductIdx>,
}

impl PlanningProblem {
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, index: LocationIdx) -> &Location {
        &self.locations[index]
    }

    pub fn location_index(&self, external_id: &str) -> Option<LocationIdx> {
        self.location_ids.get(external_id).copied()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, index: ProductIdx) -> &Product {
        &self.products[index]
    }

    pub fn product_index(&self, external_id: &str) -> Option<ProductIdx> {
        self.product_ids.get(external_id).copied()
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn forecast(&self) -> &Forecast {
        &self.forecast
    }

    pub fn labor(&self) -> &LaborCalendar {
        &self.labor
    }

    pub fn manufacturing(&self) -> &ManufacturingParams {
        &self.manufacturing
    }

    pub fn manufacturing_site(&self) -> LocationIdx {
        self.manufacturing_site
    }

    pub fn trucks(&self) -> &TruckScheduleCollection {
        &self.trucks
    }

    pub fn costs(&self) -> &CostStructure {
        &self.costs
    }

    pub fn initial_inventory(&self) -> &[InitialInventory] {
        &self.initial_inventory
    }

    /// Longest shelf life of any product in `state`, used to prune routes.
    pub fn max_shelf_life_days(&self, state: StorageState) -> u32 {
        self.products
            .iter()
            .map(|product| product.shelf_life_days(state))
            .max()
            .unwrap_or(0)
    }
}

struct DemandInput {
    location: String,
    product: String,
    date: Date,
    quantity: f64,
}

struct InventoryInput {
    location: String,
    product: String,
    state: StorageState,
    quantity: f64,
    production_date: Option<Date>,
}

pub struct TruckScheduleInput {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub intermediate_stops: Vec<String>,
    pub day_of_week: Option<Weekday>,
    pub departure_time: Time,
    pub pallet_capacity: u32,
    pub units_per_pallet: u32,
    pub units_per_case: u32,
}

/// Collects inputs referencing locations and products by external id and
/// resolves them in [`PlanningProblemBuilder::build`].
#[derive(Default)]
pub struct PlanningProblemBuilder {
    locations: Vec<Location>,
    products: Vec<Product>,
    routes: Vec<RouteDefinition>,
    demand: Vec<DemandInput>,
    labor: Option<LaborCalendar>,
    manufacturing: Option<ManufacturingParams>,
    trucks: Vec<TruckScheduleInput>,
    costs: Option<CostStructure>,
    inventory: Vec<InventoryInput>,
}

impl PlanningProblemBuilder {
    pub fn add_location(&mut self, location: Location) -> &mut PlanningProblemBuilder {
        self.locations.push(location);
        self
    }

    pub fn add_product(&mut self, product: Product) -> &mut PlanningProblemBuilder {
        self.products.push(product);
        self
    }

    pub fn add_route(&mut self, route: RouteDefinition) -> &mut PlanningProblemBuilder {
        self.routes.push(route);
        self
    }

    pub fn add_demand(
        &mut self,
        location: impl Into<String>,
        product: impl Into<String>,
        date: Date,
        quantity: f64,
    ) -> &mut PlanningProblemBuilder {
        self.demand.push(DemandInput {
            location: location.into(),
            product: product.into(),
            date,
            quantity,
        });
        self
    }

    pub fn set_labor_calendar(&mut self, labor: LaborCalendar) -> &mut PlanningProblemBuilder {
        self.labor = Some(labor);
        self
    }

    pub fn set_manufacturing(
        &mut self,
        manufacturing: ManufacturingParams,
    ) -> &mut PlanningProblemBuilder {
        self.manufacturing = Some(manufacturing);
        self
    }

    pub fn add_truck_schedule(&mut self, truck: TruckScheduleInput) -> &mut PlanningProblemBuilder {
        self.trucks.push(truck);
        self
    }

    pub fn set_costs(&mut self, costs: CostStructure) -> &mut PlanningProblemBuilder {
        self.costs = Some(costs);
        self
    }

    pub fn add_initial_inventory(
        &mut self,
        location: impl Into<String>,
        product: impl Into<String>,
        state: StorageState,
        quantity: f64,
        production_date: Option<Date>,
    ) -> &mut PlanningProblemBuilder {
        self.inventory.push(InventoryInput {
            location: location.into(),
            product: product.into(),
            state,
            quantity,
            production_date,
        });
        self
    }

    pub fn build(self) -> Result<PlanningProblem, PlanningError> {
        let mut location_ids: FxHashMap<String, LocationIdx> = FxHashMap::default();
        for (index, location) in self.locations.iter().enumerate_idx() {
            if location_ids
                .insert(location.external_id().to_owned(), index)
                .is_some()
            {
                return Err(PlanningError::DuplicateId {
                    kind: "location",
                    id: location.external_id().to_owned(),
                });
            }
        }

        let mut product_ids: FxHashMap<String, ProductIdx> = FxHashMap::default();
        for (index, product) in self.products.iter().enumerate_idx() {
            if product_ids
                .insert(product.external_id().to_owned(), index)
                .is_some()
            {
                return Err(PlanningError::DuplicateId {
                    kind: "product",
                    id: product.external_id().to_owned(),
                });
            }
        }

        let manufacturing_sites = self
            .locations
            .iter()
            .enumerate_idx()
            .filter(|(_, location): &(LocationIdx, &Location)| location.is_manufacturing())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let &[manufacturing_site] = manufacturing_sites.as_slice() else {
            return Err(PlanningError::ManufacturingSite(manufacturing_sites.len()));
        };

        let resolve_location = |id: &str, context: &str| {
            location_ids
                .get(id)
                .copied()
                .ok_or_else(|| PlanningError::UnknownLocation {
                    context: context.to_owned(),
                    location: id.to_owned(),
                })
        };
        let resolve_product = |id: &str, context: &str| {
            product_ids
                .get(id)
                .copied()
                .ok_or_else(|| PlanningError::UnknownProduct {
                    context: context.to_owned(),
                    product: id.to_owned(),
                })
        };

        let mut forecast = Forecast::default();
        for demand in &self.demand {
            forecast.add(DemandEntry {
                location: resolve_location(&demand.location, "Forecast")?,
                product: resolve_product(&demand.product, "Forecast")?,
                date: demand.date,
                quantity: demand.quantity,
            });
        }

        let mut schedules = Vec::with_capacity(self.trucks.len());
        for truck in self.trucks {
            let context = format!("Truck schedule '{}'", truck.id);
            let mut builder = TruckScheduleBuilder::default();
            builder
                .set_external_id(truck.id.clone())
                .set_origin(resolve_location(&truck.origin, &context)?)
                .set_destination(resolve_location(&truck.destination, &context)?)
                .set_departure_time(truck.departure_time)
                .set_pallet_capacity(truck.pallet_capacity)
                .set_units_per_pallet(truck.units_per_pallet)
                .set_units_per_case(truck.units_per_case);
            for stop in &truck.intermediate_stops {
                builder.add_intermediate_stop(resolve_location(stop, &context)?);
            }
            if let Some(day) = truck.day_of_week {
                builder.set_day_of_week(day);
            }
            if let Some(schedule) = builder.build() {
                schedules.push(schedule);
            }
        }

        let mut initial_inventory = Vec::with_capacity(self.inventory.len());
        for inventory in &self.inventory {
            let location = resolve_location(&inventory.location, "Initial inventory")?;
            if !self.locations[location].supports(inventory.state) {
                return Err(PlanningError::CohortInvariant(format!(
                    "initial inventory at '{}' is {} but the location cannot hold that state",
                    inventory.location, inventory.state
                )));
            }

            initial_inventory.push(InitialInventory {
                location,
                product: resolve_product(&inventory.product, "Initial inventory")?,
                state: inventory.state,
                quantity: inventory.quantity,
                production_date: inventory.production_date,
            });
        }

        Ok(PlanningProblem {
            locations: self.locations,
            products: self.products,
            routes: self.routes,
            forecast,
            labor: self.labor.unwrap_or_default(),
            manufacturing: self.manufacturing.unwrap_or_default(),
            manufacturing_site,
            trucks: TruckScheduleCollection::new(schedules),
            costs: self.costs.unwrap_or_default(),
            initial_inventory,
            location_ids,
            product_ids,
        })
    }
}
