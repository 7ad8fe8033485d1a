//! Wire models for the session registry HTTP API.
//!
//! The registry wraps every response body as `{"result": ...}` and uses
//! camelCase field names.

use common::StreamKey;
use serde::{Deserialize, Serialize};

/// Response envelope used by every registry endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

/// Body of `POST /start`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub title: String,
    pub category_id: i64,
}

/// Result of `POST /start`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub stream_key: StreamKey,
}

/// Result of `GET /enter/{streamKey}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterResponse {
    pub title: String,
    pub viewer_count: u64,
}

/// One entry of the live listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSummary {
    pub stream_key: StreamKey,
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub busker_uuid: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// One page of `GET /all`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePage {
    pub content: Vec<LiveSummary>,
    pub has_next: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Query for `GET /all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveListQuery {
    pub cursor: Option<String>,
    pub size: u32,
    /// `None` or the "all" category lists every session.
    pub category_id: Option<i64>,
}

impl LiveListQuery {
    #[must_use]
    pub fn first_page(size: u32) -> Self {
        Self {
            cursor: None,
            size,
            category_id: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}
