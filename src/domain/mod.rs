//! Domain models - the deterministic traffic simulation engine
//!
//! - `mt19937` - legacy Mersenne Twister, the source of every random draw
//! - `sensor` - per-sensor hourly visitor counts with fault injection
//! - `store` - five sensors composed into a store
//! - `types` - opening hours, weekday shaping, readings and export rows
//! - `error` - construction errors

pub mod error;
pub mod mt19937;
pub mod sensor;
pub mod store;
pub mod types;

// Re-export commonly used types at module level
pub use error::SimError;
pub use sensor::Sensor;
pub use store::{Store, SENSORS_PER_STORE, TRAFFIC_SHARES};
pub use types::{DailyTraffic, RawReading, VisitReading, OPEN_HOURS};
