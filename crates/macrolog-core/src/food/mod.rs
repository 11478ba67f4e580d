//! Cache-first food resolution
//!
//! - `index` - TTL-refreshed index with exact and fuzzy lookup
//! - `similarity` - InDel similarity ratio and top-N extraction
//! - `portion` - unit conversion into the record's unit and macro scaling
//! - `seed` - built-in catalog of common foods

pub mod index;
pub mod portion;
pub mod seed;
pub mod similarity;

pub use index::{FoodIndex, IndexSnapshot};
pub use portion::{compute_portion, PortionCalculator, DEFAULT_QUANTITY};
pub use seed::seed_foods;
