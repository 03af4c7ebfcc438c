//! HTTP client module - the page-fetch collaborator
//!
//! Provides the HTTP client the sync engine fetches pages through.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Basic Auth**: Account SID + auth token on every request
//!
//! The engine only sees the [`PageFetcher`] trait: one GET against a base
//! URL + path + query params, returning the decoded JSON document. Retry,
//! backoff, and auth policy all live below that boundary.

mod client;
mod rate_limit;

pub use client::{BackoffType, HttpClient, HttpClientConfig, PageFetcher};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
