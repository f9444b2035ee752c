//! Infrastructure - configuration and metrics
//!
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free request metrics

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::{Config, StoreConfig};
pub use metrics::Metrics;
