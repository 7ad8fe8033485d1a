//! Session registry boundary.
//!
//! The registry is the sole authority for stream-key validity and viewer
//! counts. Sessions only ever hold a cached, possibly stale, copy of what it
//! returns.
//!
//! # Components
//!
//! - `client` - reqwest implementation of [`SessionRegistry`]
//! - `models` - request/response bodies

pub mod client;
pub mod models;

pub use client::HttpSessionRegistry;
pub use models::{EnterResponse, LiveListQuery, LivePage, LiveSummary, StartRequest};

use crate::errors::LiveError;
use async_trait::async_trait;
use common::{Credential, StreamKey};
use tracing::debug;

/// Control-plane calls made by ingest and viewer sessions.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Start a broadcast and obtain its stream key. Broadcaster only.
    async fn start(
        &self,
        credential: &Credential,
        request: &StartRequest,
    ) -> Result<StreamKey, LiveError>;

    /// End a broadcast. Broadcaster only.
    async fn end(&self, credential: &Credential, stream_key: &StreamKey) -> Result<(), LiveError>;

    /// Announce a viewer and fetch the current title and viewer count.
    async fn enter(
        &self,
        credential: &Credential,
        stream_key: &StreamKey,
    ) -> Result<EnterResponse, LiveError>;

    /// Announce that a viewer left. Viewer only.
    async fn exit(&self, credential: &Credential, stream_key: &StreamKey) -> Result<(), LiveError>;

    /// Fetch one page of the live listing.
    async fn list(&self, query: &LiveListQuery) -> Result<LivePage, LiveError>;
}

/// Walk the live listing cursor by cursor.
///
/// Stops when the registry reports no further pages, when a page comes back
/// without a cursor, or after `max_pages` pages.
pub async fn collect_live_sessions(
    registry: &dyn SessionRegistry,
    page_size: u32,
    category_id: Option<i64>,
    max_pages: usize,
) -> Result<Vec<LiveSummary>, LiveError> {
    let mut query = LiveListQuery {
        cursor: None,
        size: page_size,
        category_id,
    };
    let mut sessions = Vec::new();

    for page_number in 0..max_pages {
        let page = registry.list(&query).await?;
        debug!(
            target: "live.registry",
            page = page_number,
            entries = page.content.len(),
            has_next = page.has_next,
            "Fetched live listing page"
        );
        sessions.extend(page.content);

        match (page.has_next, page.next_cursor) {
            (true, Some(cursor)) => query.cursor = Some(cursor),
            _ => break,
        }
    }

    Ok(sessions)
}
