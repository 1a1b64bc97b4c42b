pub mod dates;
pub mod enumerate_idx;
pub mod newtype_index;
pub mod time;
