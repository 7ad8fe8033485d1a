//! Actors owning the sockets of a live session.
//!
//! ```text
//! IngestSession
//! └── ChunkQueue (one per broadcast, owns the ingest socket)
//!
//! ViewerSession (one per attached stream, owns the player)
//! ├── enter call
//! ├── manifest poller
//! └── control listener (owns the control socket)
//! ```
//!
//! Each actor is spawned with a `CancellationToken`; cancelling it closes
//! every socket the actor owns.

pub mod chunk_queue;
pub mod messages;
pub mod viewer;

pub use chunk_queue::{ChunkQueue, ChunkQueueConfig, ChunkQueueHandle, QueueStats, QueueStatus};
pub use messages::{TaskEvent, ViewerCommand, ViewerSnapshot};
pub use viewer::{ViewerSession, ViewerSessionHandle};
