//! HTTP request handlers for the HLS proxy.

pub mod health;
pub mod hls;
pub mod metrics;

pub use health::health_check;
pub use hls::{preflight, proxy_get};
pub use metrics::metrics_handler;
