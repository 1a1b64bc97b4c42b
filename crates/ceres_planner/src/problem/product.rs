use serde::Serialize;

use crate::{define_index_newtype, problem::storage_state::StorageState};

define_index_newtype!(ProductIdx, Product);

#[derive(Serialize, Debug, Clone)]
pub struct Product {
    external_id: String,
    ambient_shelf_life_days: u32,
    frozen_shelf_life_days: u32,
}

impl Product {
    pub fn new(
        external_id: impl Into<String>,
        ambient_shelf_life_days: u32,
        frozen_shelf_life_days: u32,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            ambient_shelf_life_days,
            frozen_shelf_life_days,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Maximum age (today - production date) a unit may have while held in `state`.
    pub fn shelf_life_days(&self, state: StorageState) -> u32 {
        match state {
            StorageState::Ambient => self.ambient_shelf_life_days,
            StorageState::Frozen => self.frozen_shelf_life_days,
        }
    }
}
