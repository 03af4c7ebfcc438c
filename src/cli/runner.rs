//! CLI runner
//!
//! Wires configuration, HTTP client, engine, registry, and state together
//! and executes the requested command.

use super::commands::{Cli, Commands, OutputFormat};
use crate::config::ConnectorConfig;
use crate::engine::{LogLevel, Message, SyncEngine};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, PageFetcher};
use crate::pagination::PAGE_SIZE_PARAM;
use crate::state::StateManager;
use crate::streams::{Registry, StreamDefinition, API_V2010_BASE};
use std::sync::Arc;
use tracing::info;

/// Executes CLI commands
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the requested command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check { config_json } => self.check(config_json.as_deref()).await,
            Commands::Streams => self.list_streams(),
            Commands::Read {
                streams,
                config_json,
            } => self.read(streams.as_deref(), config_json.as_deref()).await,
        }
    }

    /// Load config from --config-json, then --config, in that order
    fn load_config(&self, config_json: Option<&str>) -> Result<ConnectorConfig> {
        if let Some(json) = config_json {
            return ConnectorConfig::from_json(json);
        }
        if let Some(path) = &self.cli.config {
            return ConnectorConfig::from_file(path);
        }
        Err(Error::config(
            "No configuration provided (use --config or --config-json)",
        ))
    }

    fn build_client(&self, config: &ConnectorConfig) -> HttpClient {
        HttpClient::with_credentials(HttpClientConfig::default(), config.credentials())
    }

    fn state_manager(&self) -> Result<StateManager> {
        match &self.cli.state {
            Some(path) => StateManager::from_file(path),
            None => Ok(StateManager::in_memory()),
        }
    }

    /// Validate credentials by fetching the first accounts page
    async fn check(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let client = self.build_client(&config);

        let query = vec![(PAGE_SIZE_PARAM.to_string(), "1".to_string())];
        client
            .fetch_page(API_V2010_BASE, "Accounts.json", &query)
            .await?;

        println!("Connection check passed");
        Ok(())
    }

    /// List catalog streams with their sync modes
    fn list_streams(&self) -> Result<()> {
        let registry = Registry::bundled();
        for def in registry.iter() {
            let mode = match def.sync_mode() {
                crate::types::SyncMode::Incremental => "incremental",
                crate::types::SyncMode::FullRefresh => "full_refresh",
            };
            match def.parent.as_ref() {
                Some(parent) => println!(
                    "{} ({mode}, key: {}, parent: {})",
                    def.name, def.primary_key, parent.stream.name
                ),
                None => println!("{} ({mode}, key: {})", def.name, def.primary_key),
            }
        }
        Ok(())
    }

    /// Read the selected streams and print emitted messages
    async fn read(&self, streams: Option<&str>, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let client = self.build_client(&config);
        let state_manager = self.state_manager()?;
        let registry = Registry::bundled();

        let selected = selected_streams(&registry, streams)?;
        let mut engine = SyncEngine::new(client);

        for def in selected {
            let mut state = state_manager.stream_state(def.name).await;
            let messages = engine
                .read_stream(&def, &mut state, config.start_date.as_deref())
                .await?;

            for message in &messages {
                self.print_message(message);
            }

            if def.cursor.is_some() {
                state_manager.set_stream_state(def.name, state).await?;
            }
        }

        let stats = engine.stats();
        info!(
            records = stats.records_synced,
            pages = stats.pages_fetched,
            streams = stats.streams_synced,
            "sync complete"
        );
        Ok(())
    }

    fn print_message(&self, message: &Message) {
        match self.cli.format {
            OutputFormat::Json => {
                let line = match message {
                    Message::Record { stream, record } => serde_json::json!({
                        "type": "RECORD",
                        "stream": stream,
                        "record": record,
                    }),
                    Message::State { stream, data } => serde_json::json!({
                        "type": "STATE",
                        "stream": stream,
                        "state": data,
                    }),
                    Message::Log { level, message } => serde_json::json!({
                        "type": "LOG",
                        "level": format!("{level:?}").to_uppercase(),
                        "message": message,
                    }),
                };
                println!("{line}");
            }
            OutputFormat::Pretty => match message {
                Message::Record { stream, record } => println!("[{stream}] {record}"),
                Message::State { stream, data } => println!("[{stream}] state -> {data}"),
                Message::Log { level, message } => {
                    // Debug chatter stays out of pretty output
                    if *level != LogLevel::Debug {
                        println!("{message}");
                    }
                }
            },
        }
    }
}

/// Resolve the --streams selection against the catalog, preserving catalog
/// order and rejecting unknown names
fn selected_streams(
    registry: &Registry,
    selection: Option<&str>,
) -> Result<Vec<Arc<StreamDefinition>>> {
    let Some(selection) = selection.filter(|s| !s.trim().is_empty()) else {
        return Ok(registry.iter().cloned().collect());
    };

    let mut requested = Vec::new();
    for name in selection.split(',') {
        let name = name.trim();
        let def = registry
            .get(name)
            .ok_or_else(|| Error::stream_not_found(name))?;
        requested.push(def.clone());
    }
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_streams_defaults_to_all() {
        let registry = Registry::bundled();
        let all = selected_streams(&registry, None).unwrap();
        assert_eq!(all.len(), registry.len());

        let all = selected_streams(&registry, Some("  ")).unwrap();
        assert_eq!(all.len(), registry.len());
    }

    #[test]
    fn test_selected_streams_filters() {
        let registry = Registry::bundled();
        let picked = selected_streams(&registry, Some("calls, messages")).unwrap();
        let names: Vec<_> = picked.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["calls", "messages"]);
    }

    #[test]
    fn test_selected_streams_unknown_name() {
        let registry = Registry::bundled();
        let err = selected_streams(&registry, Some("faxes")).unwrap_err();
        assert!(matches!(err, Error::StreamNotFound { .. }));
    }
}
