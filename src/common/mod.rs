//! Common utilities and types shared across dynamokv

pub mod config;
pub mod error;
pub mod metrics;
pub mod preference;
pub mod tracing_middleware;
pub mod utils;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use metrics::NodeMetrics;
pub use preference::{DynamoNode, PreferenceList};
pub use utils::{encode_key, parse_duration, validate_key};
