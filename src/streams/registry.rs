//! Built-in stream catalog
//!
//! Assembles every concrete stream definition in dependency order: a parent
//! is always constructed before the streams that reference it, so parent
//! links can never dangle. Definitions are shared read-only via `Arc`.

use super::{ParentLink, PathSpec, StreamDefinition};
use crate::cursor::{CursorSpec, DAILY_TIME_TEMPLATE};
use std::sync::Arc;

/// Versioned REST API base; collection and templated paths resolve against it
pub const API_V2010_BASE: &str = "https://api.twilio.com/2010-04-01/";

/// Unversioned base for subresource-URI streams - the returned URI already
/// embeds the API version
pub const API_BASE: &str = "https://api.twilio.com";

/// Monitor API base (alerts)
pub const MONITOR_BASE: &str = "https://monitor.twilio.com/v1/";

/// The fixed catalog of stream definitions
#[derive(Debug, Clone)]
pub struct Registry {
    streams: Vec<Arc<StreamDefinition>>,
}

impl Registry {
    /// Build the full built-in catalog
    pub fn bundled() -> Self {
        let mut streams: Vec<Arc<StreamDefinition>> = Vec::new();

        // Root of every chain: the account list
        let accounts = Arc::new(StreamDefinition::new("accounts"));
        streams.push(accounts.clone());

        // --- Account subresources ---------------------------------------

        let addresses = Arc::new(
            StreamDefinition::new("addresses")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone())),
        );
        streams.push(addresses.clone());

        // Three-level chain: accounts → addresses → dependent phone numbers.
        // The child path is templated, so the slice carries the raw ids.
        streams.push(Arc::new(
            StreamDefinition::new("dependent_phone_numbers")
                .with_path(PathSpec::Template(
                    "Accounts/{{ account_sid }}/Addresses/{{ sid }}/DependentPhoneNumbers.json",
                ))
                .with_parent(ParentLink::record_fields(
                    addresses,
                    &["sid", "account_sid"],
                )),
        ));

        streams.push(Arc::new(
            StreamDefinition::new("applications")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone())),
        ));

        // --- Phone number catalogs --------------------------------------

        let countries = Arc::new(
            StreamDefinition::new("available_phone_number_countries")
                .with_data_field("countries")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri_keyed(
                    accounts.clone(),
                    "available_phone_numbers",
                )),
        );
        streams.push(countries.clone());

        for (name, key) in [
            ("available_phone_numbers_local", "local"),
            ("available_phone_numbers_mobile", "mobile"),
            ("available_phone_numbers_toll_free", "toll_free"),
        ] {
            streams.push(Arc::new(
                StreamDefinition::new(name)
                    .with_data_field("available_phone_numbers")
                    .with_url_base(API_BASE)
                    .with_path(PathSpec::FromSlice)
                    .with_parent(ParentLink::subresource_uri_keyed(countries.clone(), key)),
            ));
        }

        streams.push(Arc::new(
            StreamDefinition::new("incoming_phone_numbers")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone())),
        ));

        streams.push(Arc::new(
            StreamDefinition::new("keys")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone())),
        ));

        // --- Voice ------------------------------------------------------

        streams.push(Arc::new(
            StreamDefinition::new("calls")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone()))
                .with_cursor(CursorSpec::new("end_time", "EndTime>")),
        ));

        let conferences = Arc::new(
            StreamDefinition::new("conferences")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone()))
                .with_cursor(CursorSpec::new("date_updated", "DateUpdated>=")),
        );
        streams.push(conferences.clone());

        streams.push(Arc::new(
            StreamDefinition::new("conference_participants")
                .with_data_field("participants")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(conferences)),
        ));

        streams.push(Arc::new(
            StreamDefinition::new("outgoing_caller_ids")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone())),
        ));

        streams.push(Arc::new(
            StreamDefinition::new("recordings")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone()))
                .with_cursor(CursorSpec::new("date_created", "DateCreated>")),
        ));

        streams.push(Arc::new(
            StreamDefinition::new("transcriptions")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone())),
        ));

        streams.push(Arc::new(
            StreamDefinition::new("queues")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone())),
        ));

        // --- Messaging --------------------------------------------------

        let messages = Arc::new(
            StreamDefinition::new("messages")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(ParentLink::subresource_uri(accounts.clone()))
                .with_cursor(CursorSpec::new("date_sent", "DateSent>")),
        );
        streams.push(messages.clone());

        // A message without media exposes the media locator anyway; the
        // num_media check filters those out before a request is wasted.
        streams.push(Arc::new(
            StreamDefinition::new("message_media")
                .with_data_field("media_list")
                .with_url_base(API_BASE)
                .with_path(PathSpec::FromSlice)
                .with_parent(
                    ParentLink::subresource_uri_keyed(messages, "media")
                        .rejecting("num_media", "0"),
                )
                .with_cursor(CursorSpec::new("date_updated", "StartTime>=")),
        ));

        // --- Usage ------------------------------------------------------

        streams.push(Arc::new(
            StreamDefinition::new("usage_records")
                .with_path(PathSpec::Template(
                    "Accounts/{{ account_sid }}/Usage/Records.json",
                ))
                .with_parent(ParentLink::owning_account(accounts.clone()))
                .with_cursor(
                    CursorSpec::new("end_date", "EndDate").with_template(DAILY_TIME_TEMPLATE),
                ),
        ));

        streams.push(Arc::new(
            StreamDefinition::new("usage_triggers")
                .with_path(PathSpec::Template(
                    "Accounts/{{ account_sid }}/Usage/Triggers.json",
                ))
                .with_parent(ParentLink::owning_account(accounts)),
        ));

        // --- Monitor ----------------------------------------------------

        streams.push(Arc::new(
            StreamDefinition::new("alerts")
                .with_url_base(MONITOR_BASE)
                .with_path(PathSpec::CollectionBare)
                .with_cursor(CursorSpec::new("date_updated", "StartDate")),
        ));

        Self { streams }
    }

    /// Look up a stream by name
    pub fn get(&self, name: &str) -> Option<&Arc<StreamDefinition>> {
        self.streams.iter().find(|def| def.name == name)
    }

    /// Iterate over all definitions in dependency order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<StreamDefinition>> {
        self.streams.iter()
    }

    /// Stream names in dependency order
    pub fn names(&self) -> Vec<&'static str> {
        self.streams.iter().map(|def| def.name).collect()
    }

    /// Number of streams in the catalog
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
