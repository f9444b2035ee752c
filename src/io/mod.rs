//! IO modules - external interfaces
//!
//! - `http` - Visitor count HTTP API
//! - `prometheus` - Prometheus text exposition of the API metrics
//! - `egress` - Raw readings and daily totals as JSONL files

pub mod egress;
pub mod http;
pub mod prometheus;

// Re-export commonly used types
pub use egress::{read_dir_records, read_records, Egress};
pub use http::{start_api_server, AppState};
