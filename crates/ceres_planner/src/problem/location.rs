use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    define_index_newtype,
    problem::storage_state::{StorageCapability, StorageState},
};

define_index_newtype!(LocationIdx, Location);

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Manufacturing,
    Hub,
    Storage,
    Destination,
}

#[derive(Serialize, Debug, Clone)]
pub struct Location {
    external_id: String,
    location_type: LocationType,
    storage: StorageCapability,
}

impl Location {
    pub fn new(
        external_id: impl Into<String>,
        location_type: LocationType,
        storage: StorageCapability,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            location_type,
            storage,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn location_type(&self) -> LocationType {
        self.location_type
    }

    pub fn storage(&self) -> StorageCapability {
        self.storage
    }

    pub fn is_manufacturing(&self) -> bool {
        self.location_type == LocationType::Manufacturing
    }

    pub fn supports(&self, state: StorageState) -> bool {
        self.storage.supports(state)
    }

    /// State freshly produced units enter inventory in.
    pub fn production_state(&self) -> StorageState {
        self.storage.coerce(StorageState::Ambient)
    }
}
