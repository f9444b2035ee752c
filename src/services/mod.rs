//! Services - store registry, query rules and aggregation
//!
//! - `registry` - The configured stores, looked up by name
//! - `query` - Request validation in front of the simulation core
//! - `daily` - Raw reading generation and daily per-store totals
//! - `extract` - The extraction and daily batch jobs

pub mod daily;
pub mod extract;
pub mod query;
pub mod registry;

// Re-export commonly used types
pub use extract::{aggregate_daily, extract_dates, ExtractSummary};
pub use query::{QueryError, TrafficQuery, TrafficService};
pub use registry::StoreRegistry;
