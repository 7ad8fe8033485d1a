//! Observability module for the HLS proxy.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
