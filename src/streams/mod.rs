//! Stream definitions, slices, and parent projections
//!
//! A stream is pure data: a [`StreamDefinition`] names the resource, how to
//! build its request path, where records live in the response, and optionally
//! a parent link and an incremental cursor. A single generic engine
//! ([`crate::engine::SyncEngine`]) interprets the definition - there is no
//! per-stream code.
//!
//! Nested streams derive their request targets from parent records: the
//! parent stream is enumerated in full, and each qualifying record is
//! projected into a [`Slice`] - the locator one pagination loop runs against.

mod registry;

pub use registry::{Registry, API_BASE, API_V2010_BASE, MONITOR_BASE};

use crate::cursor::CursorSpec;
use crate::error::{Error, Result};
use crate::pagination::{PageToken, DEFAULT_PAGE_SIZE, PAGE_SIZE_PARAM};
use crate::template;
use crate::types::{JsonValue, Record, SyncMode};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Slice
// ============================================================================

/// A locator describing one unit of parent context a stream fetches against
///
/// A stream with no parent has exactly one implicit (root) slice. A nested
/// stream has one slice per qualifying parent record. Slices are consumed
/// sequentially and never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slice {
    values: HashMap<String, String>,
}

impl Slice {
    /// The implicit slice of a root stream
    pub fn root() -> Self {
        Self::default()
    }

    /// Add a locator value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Look up a locator value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The subresource URI locator, if this slice carries one
    pub fn subresource_uri(&self) -> Option<&str> {
        self.get("subresource_uri")
    }

    /// Check whether this is the implicit root slice
    pub fn is_root(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Path Spec
// ============================================================================

/// How a stream builds its request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    /// `"{Name}.json"` derived from the resource name (top-level v2010 API)
    Collection,
    /// `"{Name}"` without the `.json` suffix (v1-style APIs such as monitor)
    CollectionBare,
    /// Path taken verbatim from the slice's `subresource_uri` locator
    FromSlice,
    /// `{{ field }}` template rendered from the slice's locator values
    Template(&'static str),
}

/// Derive the URL segment from a snake_case resource name
///
/// `"accounts"` → `"Accounts"`; used only by the name-derived path variants.
fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

// ============================================================================
// Parent Link
// ============================================================================

/// How a qualifying parent record becomes a slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceProjection {
    /// Take the locator from the parent record's `subresource_uris` mapping.
    /// A record without the locator (or failing a validation) yields no slice.
    SubresourceUri {
        /// Key within `subresource_uris`; `None` means the child's data field
        key: Option<&'static str>,
        /// Validation predicates: each field must be present, truthy, and not
        /// equal to its sentinel for the record to qualify
        reject_values: Vec<(&'static str, &'static str)>,
    },
    /// Copy the listed parent fields verbatim into the slice (used when the
    /// child path is templated rather than a returned URL). A missing field
    /// is a hard error.
    RecordFields(&'static [&'static str]),
    /// Slice is `{account_sid: parent.sid}` with no validation - usage
    /// endpoints are synthesized from a fixed suffix, not discovered, so
    /// there is no subresource locator to check.
    OwningAccount,
}

/// A stream's dependency on its parent stream
#[derive(Debug, Clone)]
pub struct ParentLink {
    /// The parent stream definition, shared read-only
    pub stream: Arc<StreamDefinition>,
    /// Projection from parent records to slices
    pub projection: SliceProjection,
}

impl ParentLink {
    /// Link to a parent via its records' `subresource_uris`, keyed by the
    /// child's data field
    pub fn subresource_uri(stream: Arc<StreamDefinition>) -> Self {
        Self {
            stream,
            projection: SliceProjection::SubresourceUri {
                key: None,
                reject_values: Vec::new(),
            },
        }
    }

    /// Link to a parent via `subresource_uris` under an explicit key
    pub fn subresource_uri_keyed(stream: Arc<StreamDefinition>, key: &'static str) -> Self {
        Self {
            stream,
            projection: SliceProjection::SubresourceUri {
                key: Some(key),
                reject_values: Vec::new(),
            },
        }
    }

    /// Link to a parent by copying record fields into the slice
    pub fn record_fields(
        stream: Arc<StreamDefinition>,
        fields: &'static [&'static str],
    ) -> Self {
        Self {
            stream,
            projection: SliceProjection::RecordFields(fields),
        }
    }

    /// Link to a parent by its `sid` alone (usage-style streams)
    pub fn owning_account(stream: Arc<StreamDefinition>) -> Self {
        Self {
            stream,
            projection: SliceProjection::OwningAccount,
        }
    }

    /// Add a validation predicate (only meaningful for subresource links):
    /// the field must be present, truthy, and not equal to the sentinel
    #[must_use]
    pub fn rejecting(mut self, field: &'static str, sentinel: &'static str) -> Self {
        if let SliceProjection::SubresourceUri { reject_values, .. } = &mut self.projection {
            reject_values.push((field, sentinel));
        }
        self
    }
}

impl SliceProjection {
    /// Project one parent record into a slice for the given child stream
    ///
    /// `Ok(None)` means the record does not qualify and is skipped.
    pub fn project(&self, child: &StreamDefinition, record: &Record) -> Result<Option<Slice>> {
        match self {
            Self::SubresourceUri { key, reject_values } => {
                let key = key.unwrap_or(child.data_field);
                let uri = record
                    .get("subresource_uris")
                    .and_then(|uris| uris.get(key))
                    .and_then(JsonValue::as_str)
                    .filter(|uri| !uri.is_empty());

                let Some(uri) = uri else {
                    return Ok(None);
                };

                for (field, sentinel) in reject_values {
                    if !passes_validation(record, field, sentinel) {
                        return Ok(None);
                    }
                }

                Ok(Some(Slice::root().with("subresource_uri", uri)))
            }
            Self::RecordFields(fields) => {
                let mut slice = Slice::root();
                for field in *fields {
                    let value = record
                        .get(*field)
                        .and_then(locator_value)
                        .ok_or_else(|| {
                            Error::slice_resolution(
                                child.name,
                                format!("parent record is missing field '{field}'"),
                            )
                        })?;
                    slice = slice.with(*field, value);
                }
                Ok(Some(slice))
            }
            Self::OwningAccount => {
                let sid = record
                    .get("sid")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| {
                        Error::slice_resolution(child.name, "parent record is missing field 'sid'")
                    })?;
                Ok(Some(Slice::root().with("account_sid", sid)))
            }
        }
    }
}

/// Check a validation predicate against a parent record
fn passes_validation(record: &Record, field: &str, sentinel: &str) -> bool {
    match record.get(field) {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::String(s)) => !s.is_empty() && s != sentinel,
        Some(JsonValue::Number(n)) => n.to_string() != sentinel,
        Some(JsonValue::Bool(b)) => *b,
        Some(_) => true,
    }
}

/// Convert a scalar record value into a locator string
fn locator_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Stream Definition
// ============================================================================

/// Immutable metadata describing one resource's extraction rules
///
/// Shared read-only (via `Arc`) by every slice and page it produces.
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    /// Stream name (snake_case)
    pub name: &'static str,
    /// Response key holding the record array
    pub data_field: &'static str,
    /// Primary key field of the emitted records
    pub primary_key: &'static str,
    /// Records per page
    pub page_size: u32,
    /// Base URL requests are issued against
    pub url_base: String,
    /// How the request path is built
    pub path: PathSpec,
    /// Parent dependency, if this is a nested stream
    pub parent: Option<ParentLink>,
    /// Incremental cursor, if this stream supports it
    pub cursor: Option<CursorSpec>,
}

impl StreamDefinition {
    /// Create a top-level stream definition with defaults
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            data_field: name,
            primary_key: "sid",
            page_size: DEFAULT_PAGE_SIZE,
            url_base: API_V2010_BASE.to_string(),
            path: PathSpec::Collection,
            parent: None,
            cursor: None,
        }
    }

    /// Override the response key holding the record array
    #[must_use]
    pub fn with_data_field(mut self, data_field: &'static str) -> Self {
        self.data_field = data_field;
        self
    }

    /// Override the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the base URL
    #[must_use]
    pub fn with_url_base(mut self, url_base: impl Into<String>) -> Self {
        self.url_base = url_base.into();
        self
    }

    /// Override the path spec
    #[must_use]
    pub fn with_path(mut self, path: PathSpec) -> Self {
        self.path = path;
        self
    }

    /// Attach a parent link, making this a nested stream
    #[must_use]
    pub fn with_parent(mut self, parent: ParentLink) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attach an incremental cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: CursorSpec) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// The sync mode this stream supports
    pub fn sync_mode(&self) -> SyncMode {
        if self.cursor.is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::FullRefresh
        }
    }

    /// Build the request path for a slice
    pub fn path(&self, slice: &Slice) -> Result<String> {
        match &self.path {
            PathSpec::Collection => Ok(format!("{}.json", title_case(self.name))),
            PathSpec::CollectionBare => Ok(title_case(self.name)),
            PathSpec::FromSlice => slice
                .subresource_uri()
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::slice_resolution(self.name, "slice is missing subresource_uri")
                }),
            PathSpec::Template(spec) => template::render(spec, slice),
        }
    }

    /// Build the query params for the next request
    ///
    /// The page-size param is always present. The incremental filter follows
    /// when one applies. Token pairs are merged in verbatim and last - the
    /// token is the next request's param set, and no stale paging param
    /// survives it.
    pub fn request_params(
        &self,
        filter: Option<&(String, String)>,
        token: Option<&PageToken>,
    ) -> Vec<(String, String)> {
        let mut params = vec![(PAGE_SIZE_PARAM.to_string(), self.page_size.to_string())];
        if let Some((key, value)) = filter {
            params.push((key.clone(), value.clone()));
        }
        if let Some(token) = token {
            token.merge_into(&mut params);
        }
        params
    }

    /// Extract records from a response document
    ///
    /// A missing record key is zero records, not an error - the API may
    /// legitimately return an empty collection wrapper.
    pub fn parse_response(&self, document: &JsonValue) -> Vec<Record> {
        match document.get(self.data_field) {
            Some(JsonValue::Array(records)) => records.clone(),
            _ => Vec::new(),
        }
    }
}
