//! Upstream services.
//!
//! - `origin_client` - reqwest client for the HLS origin

pub mod origin_client;

pub use origin_client::{OriginClient, UpstreamResponse, DEFAULT_CONTENT_TYPE};
