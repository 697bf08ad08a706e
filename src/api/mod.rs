//! HTTP API Module
//!
//! Resolution, refresh and monitoring endpoints for the resolver.

mod routes;
mod metrics;

pub use routes::{run_api_server, ApiState};
pub use metrics::Metrics;
