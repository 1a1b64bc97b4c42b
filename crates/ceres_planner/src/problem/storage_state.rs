use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Physical state a unit of product is stored in.
#[derive(
    Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum StorageState {
    Ambient,
    Frozen,
}

impl StorageState {
    pub const ALL: [StorageState; 2] = [StorageState::Ambient, StorageState::Frozen];

    pub fn other(&self) -> StorageState {
        match self {
            StorageState::Ambient => StorageState::Frozen,
            StorageState::Frozen => StorageState::Ambient,
        }
    }
}

impl Display for StorageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageState::Ambient => write!(f, "ambient"),
            StorageState::Frozen => write!(f, "frozen"),
        }
    }
}

/// How cargo is kept while on a leg. Shares its variants with [`StorageState`]
/// because a frozen truck keeps the cargo frozen.
pub type TransportMode = StorageState;

/// Which states a location can hold inventory in.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StorageCapability {
    Ambient,
    Frozen,
    Both,
}

impl StorageCapability {
    pub fn supports(&self, state: StorageState) -> bool {
        match self {
            StorageCapability::Ambient => state == StorageState::Ambient,
            StorageCapability::Frozen => state == StorageState::Frozen,
            StorageCapability::Both => true,
        }
    }

    pub fn supports_both(&self) -> bool {
        matches!(self, StorageCapability::Both)
    }

    pub fn states(&self) -> SmallVec<[StorageState; 2]> {
        StorageState::ALL
            .into_iter()
            .filter(|state| self.supports(*state))
            .collect()
    }

    /// The state cargo in `state` ends up in once it reaches a location with
    /// this capability. A state the location cannot hold is converted to the
    /// one it can (automatic thaw or freeze).
    pub fn coerce(&self, state: StorageState) -> StorageState {
        if self.supports(state) {
            state
        } else {
            state.other()
        }
    }
}
