//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete state for a connector run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: HashMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.streams.entry(stream.to_string()).or_default()
    }

    /// Replace the state for a stream
    pub fn set_stream(&mut self, stream: &str, state: StreamState) {
        self.streams.insert(stream.to_string(), state);
    }
}

/// State for a single stream: a watermark mapping keyed by cursor field name
///
/// One entry per cursor field, e.g. `{"end_time": "2021-06-01T00:00:00Z"}`.
/// Values are always formatted to the stream's time template, which is what
/// makes string comparison a valid max.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StreamState {
    values: HashMap<String, String>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether any watermark has been recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the watermark for a cursor field
    pub fn watermark(&self, cursor_field: &str) -> Option<&str> {
        self.values.get(cursor_field).map(String::as_str)
    }

    /// Set the watermark for a cursor field
    pub fn set_watermark(&mut self, cursor_field: &str, value: String) {
        self.values.insert(cursor_field.to_string(), value);
    }
}
