//! Session state machines.
//!
//! - `phases` - pure phase/event transition functions
//! - `ingest` - the broadcaster session

pub mod ingest;
pub mod phases;

pub use ingest::IngestSession;
pub use phases::{IngestEvent, IngestPhase, ViewerEvent, ViewerPhase};
