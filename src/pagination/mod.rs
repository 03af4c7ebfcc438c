//! Continuation-token pagination
//!
//! Twilio list responses carry a `next_page_uri` field: a relative URL whose
//! query string is the literal parameter set for the next page. The token is
//! opaque - its pairs are merged verbatim into the next request, replacing any
//! positional paging params, without interpreting the keys.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::collections::BTreeMap;
use url::Url;

/// Query parameter carrying the per-page record count
pub const PAGE_SIZE_PARAM: &str = "PageSize";

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Response field holding the continuation URL
pub const NEXT_PAGE_URI_FIELD: &str = "next_page_uri";

/// Opaque continuation parameters extracted from a response
///
/// Presence of a token means more pages exist; absence means the slice is
/// exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageToken {
    params: BTreeMap<String, String>,
}

impl PageToken {
    /// Create an empty token
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a token from key-value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Check if the token carries no parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of continuation parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Look up a continuation parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Iterate over the continuation parameters
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge the token's pairs into a param list, replacing duplicates
    ///
    /// The token IS the next request's param set: any earlier value for one
    /// of its keys must not survive.
    pub fn merge_into(&self, params: &mut Vec<(String, String)>) {
        for (key, value) in &self.params {
            params.retain(|(existing, _)| existing != key);
            params.push((key.clone(), value.clone()));
        }
    }
}

/// Extract the continuation token from a response document
///
/// Returns `Ok(None)` when the `next_page_uri` field is absent, null, or
/// empty - pagination is complete. A present-but-unparseable continuation is
/// a hard error: treating it as "done" would silently truncate results.
pub fn next_page_token(document: &JsonValue) -> Result<Option<PageToken>> {
    match document.get(NEXT_PAGE_URI_FIELD) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(uri)) if uri.is_empty() => Ok(None),
        Some(JsonValue::String(uri)) => {
            let token = parse_continuation(uri)?;
            // A continuation with no query pairs cannot advance the window
            if token.is_empty() {
                Ok(None)
            } else {
                Ok(Some(token))
            }
        }
        Some(other) => Err(Error::pagination(format!(
            "{NEXT_PAGE_URI_FIELD} is not a string: {other}"
        ))),
    }
}

/// Parse a relative continuation URI into its query pairs
fn parse_continuation(uri: &str) -> Result<PageToken> {
    // The URI is relative ("/2010-04-01/...?Page=1"); resolve against a
    // placeholder base purely to get at the query component.
    let base = Url::parse("https://api.twilio.com")?;
    let url = Url::options()
        .base_url(Some(&base))
        .parse(uri)
        .map_err(|e| Error::pagination(format!("unparseable {NEXT_PAGE_URI_FIELD} '{uri}': {e}")))?;

    Ok(PageToken::from_pairs(url.query_pairs().into_owned()))
}
