//! Connector configuration
//!
//! The configuration surface consumed by the connector: credentials plus an
//! optional starting watermark shared by every incremental stream. Loaded
//! from a JSON file or an inline JSON string.

use crate::auth::Credentials;
use crate::cursor;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Twilio account SID (username half of basic auth)
    pub account_sid: String,

    /// Twilio auth token (password half of basic auth)
    pub auth_token: String,

    /// Starting watermark for incremental streams (e.g. "2021-01-01T00:00:00Z").
    /// Absent means every incremental stream starts unbounded.
    #[serde(default)]
    pub start_date: Option<String>,
}

impl ConnectorConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Parse configuration from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields and the start date format
    pub fn validate(&self) -> Result<()> {
        if self.account_sid.trim().is_empty() {
            return Err(Error::missing_field("account_sid"));
        }
        if self.auth_token.trim().is_empty() {
            return Err(Error::missing_field("auth_token"));
        }
        if let Some(start) = &self.start_date {
            if cursor::parse_lenient(start).is_none() {
                return Err(Error::config(format!(
                    "start_date '{start}' is not a recognized datetime"
                )));
            }
        }
        Ok(())
    }

    /// Build the credential handle passed to the HTTP client
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.account_sid, &self.auth_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config =
            ConnectorConfig::from_json(r#"{"account_sid": "AC1", "auth_token": "tok"}"#).unwrap();
        assert_eq!(config.account_sid, "AC1");
        assert_eq!(config.auth_token, "tok");
        assert!(config.start_date.is_none());
    }

    #[test]
    fn test_parse_with_start_date() {
        let config = ConnectorConfig::from_json(
            r#"{"account_sid": "AC1", "auth_token": "tok", "start_date": "2021-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(config.start_date.as_deref(), Some("2021-01-01T00:00:00Z"));
    }

    #[test]
    fn test_missing_account_sid() {
        let err =
            ConnectorConfig::from_json(r#"{"account_sid": "", "auth_token": "tok"}"#).unwrap_err();
        assert!(err.to_string().contains("account_sid"));
    }

    #[test]
    fn test_missing_auth_token() {
        let err =
            ConnectorConfig::from_json(r#"{"account_sid": "AC1", "auth_token": "  "}"#).unwrap_err();
        assert!(err.to_string().contains("auth_token"));
    }

    #[test]
    fn test_invalid_start_date() {
        let err = ConnectorConfig::from_json(
            r#"{"account_sid": "AC1", "auth_token": "tok", "start_date": "not-a-date"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("start_date"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"account_sid": "AC1", "auth_token": "tok"}"#).unwrap();

        let config = ConnectorConfig::from_file(&path).unwrap();
        assert_eq!(config.account_sid, "AC1");
    }

    #[test]
    fn test_from_file_missing() {
        let err = ConnectorConfig::from_file("/nonexistent/config.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
