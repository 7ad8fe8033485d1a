//! Test utilities for Busk Live.
//!
//! Everything here runs in-process on `127.0.0.1:0`:
//!
//! - [`TestProxyServer`] - the real HLS proxy router in front of an origin
//! - [`MockRegistry`] - wiremock session registry with canned lifecycle answers
//! - [`MockIngestServer`] - ingest WebSocket that records every binary frame
//! - [`MockControlServer`] - viewer control WebSocket that can push text
//! - [`FakeCaptureDevice`], [`FakePlayer`] - device doubles with shared probes
//! - [`fixtures`] - configuration and credential builders

pub mod fakes;
pub mod fixtures;
pub mod mock_control;
pub mod mock_ingest;
pub mod mock_registry;
pub mod proxy_harness;

pub use fakes::{CaptureProbe, FakeCaptureDevice, FakePlayer, PlayerProbe};
pub use mock_control::MockControlServer;
pub use mock_ingest::MockIngestServer;
pub use mock_registry::MockRegistry;
pub use proxy_harness::TestProxyServer;
