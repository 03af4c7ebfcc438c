//! Execution engine module
//!
//! Main read loop and parent-chain resolution.
//!
//! # Overview
//!
//! The engine interprets [`StreamDefinition`]s against a [`PageFetcher`]:
//!
//! - `stream_slices` resolves the parent chain recursively, materializing
//!   each parent level in full before deriving child slices
//! - `read_stream` drives the pagination loop per slice and folds the
//!   incremental watermark over every emitted record
//!
//! Everything is strictly sequential: one outstanding request at a time,
//! slices consumed in order, no fan-out. Any error aborts the stream run -
//! there is no partial-success mode.

mod types;

pub use types::{LogLevel, Message, SyncStats};

use crate::error::Result;
use crate::http::PageFetcher;
use crate::pagination::{next_page_token, PageToken};
use crate::state::StreamState;
use crate::streams::{Slice, StreamDefinition};
use crate::types::Record;
use futures::future::BoxFuture;
use std::time::Instant;
use tracing::debug;

/// Sync engine for orchestrating data extraction
pub struct SyncEngine<F> {
    /// Page fetcher (HTTP collaborator)
    fetcher: F,
    /// Statistics
    stats: SyncStats,
}

impl<F: PageFetcher> SyncEngine<F> {
    /// Create a new sync engine
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            stats: SyncStats::default(),
        }
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = SyncStats::default();
    }

    /// Get the page fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Read one stream to exhaustion
    ///
    /// Resolves slices (recursively through the parent chain), then runs the
    /// pagination loop per slice. For incremental streams the lower-bound
    /// filter is recomputed from the current state on every request, and
    /// `state` is advanced after every emitted record, so it reflects
    /// max-seen-so-far at any point.
    pub async fn read_stream(
        &mut self,
        def: &StreamDefinition,
        state: &mut StreamState,
        start_date: Option<&str>,
    ) -> Result<Vec<Message>> {
        let start = Instant::now();
        let mut messages = Vec::new();

        messages.push(Message::info(format!(
            "Starting sync for stream: {}",
            def.name
        )));

        let slices = self.stream_slices(def).await?;
        messages.push(Message::debug(format!(
            "Resolved {} slice(s) for stream: {}",
            slices.len(),
            def.name
        )));

        let mut record_count = 0;
        let mut page_count = 0;

        for slice in &slices {
            let path = def.path(slice)?;
            let mut token: Option<PageToken> = None;

            // At least one request per slice, then follow the token chain
            loop {
                let filter = match &def.cursor {
                    Some(cursor) => cursor.filter_pair(state, start_date)?,
                    None => None,
                };
                let params = def.request_params(filter.as_ref(), token.as_ref());

                let document = self
                    .fetcher
                    .fetch_page(&def.url_base, &path, &params)
                    .await?;
                page_count += 1;
                self.stats.add_page();

                let records = def.parse_response(&document);
                record_count += records.len();
                self.stats.add_records(records.len());

                for record in records {
                    if let Some(cursor) = &def.cursor {
                        *state = cursor.updated_state(def.name, state, &record)?;
                    }
                    messages.push(Message::record(def.name, record));
                }

                match next_page_token(&document)? {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }

            self.stats.add_slice();
        }

        if let Some(cursor) = &def.cursor {
            if let Some(watermark) = state.watermark(cursor.cursor_field) {
                messages.push(Message::state(
                    def.name,
                    serde_json::json!({ cursor.cursor_field: watermark }),
                ));
            }
        }

        self.stats.add_stream();
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        messages.push(Message::info(format!(
            "Completed sync for {}: {record_count} records in {page_count} pages across {} slice(s)",
            def.name,
            slices.len()
        )));

        Ok(messages)
    }

    /// Resolve the slices for a stream
    ///
    /// A root stream has exactly one implicit slice. A nested stream fully
    /// enumerates its parent (which recursively resolves its own chain) and
    /// projects one slice per qualifying parent record. Any failure while
    /// resolving a parent propagates through every dependent level.
    pub fn stream_slices<'a>(
        &'a mut self,
        def: &'a StreamDefinition,
    ) -> BoxFuture<'a, Result<Vec<Slice>>> {
        Box::pin(async move {
            let Some(parent) = &def.parent else {
                return Ok(vec![Slice::root()]);
            };

            let parent_records = self.collect_records(&parent.stream).await?;
            let mut slices = Vec::new();
            for record in &parent_records {
                if let Some(slice) = parent.projection.project(def, record)? {
                    slices.push(slice);
                }
            }

            debug!(
                stream = def.name,
                parent = parent.stream.name,
                parents = parent_records.len(),
                slices = slices.len(),
                "resolved parent slices"
            );
            Ok(slices)
        })
    }

    /// Fully enumerate a stream's records for parent resolution
    ///
    /// Always a full refresh: no incremental filter, fresh pagination state,
    /// nothing persisted. Parent state is never reused across children.
    fn collect_records<'a>(
        &'a mut self,
        def: &'a StreamDefinition,
    ) -> BoxFuture<'a, Result<Vec<Record>>> {
        Box::pin(async move {
            let slices = self.stream_slices(def).await?;
            let mut records = Vec::new();

            for slice in &slices {
                let path = def.path(slice)?;
                let mut token: Option<PageToken> = None;

                loop {
                    let params = def.request_params(None, token.as_ref());
                    let document = self
                        .fetcher
                        .fetch_page(&def.url_base, &path, &params)
                        .await?;
                    self.stats.add_page();

                    records.extend(def.parse_response(&document));

                    match next_page_token(&document)? {
                        Some(next) => token = Some(next),
                        None => break,
                    }
                }
            }

            Ok(records)
        })
    }
}

impl<F: std::fmt::Debug> std::fmt::Debug for SyncEngine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("fetcher", &self.fetcher)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests;
