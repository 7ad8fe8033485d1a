//! HLS Proxy Library
//!
//! Stateless reverse proxy between players and the HLS origin:
//!
//! - Maps `/hls/{path}` onto `{origin}/{path}` with no other rewriting
//! - Forwards manifest and segment bytes untouched
//! - Relaxes certificate checks for `https://` origins (self-signed in practice)
//! - Adds permissive CORS headers to every response
//!
//! # Modules
//!
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types and their HTTP mapping
//! - [`handlers`] - Proxy, health and metrics handlers
//! - [`routes`] - Router and application state
//! - [`services`] - Origin client

pub mod config;
pub mod cors;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod services;
