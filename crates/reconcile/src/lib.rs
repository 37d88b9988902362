//! Declarative reconciliation of local settings against a REST API.
//!
//! Settings groups describe their remote resources as static
//! [`FieldMapping`] tables. The engine decodes fetched JSON into typed local
//! settings, compares them with the declared configuration, reports every
//! decision as an [`Event`], and writes back with whole-object `PUT`s built
//! on a freshly fetched snapshot.
//!
//! # Example
//!
//! ```
//! use reconcile::{ApplyContext, Declared, Endpoint, FieldMapping, MockApi, Orchestrator,
//!     RecordingSink, Resolver, decode_into};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Analytics {
//!     send_anonymous_usage_data: bool,
//! }
//!
//! const TABLE: &[FieldMapping] =
//!     &[FieldMapping::new("send_anonymous_usage_data", "analyticsEnabled")];
//!
//! let api = MockApi::new()
//!     .with_resource("/api/v1/config/host", json!({"id": 1, "analyticsEnabled": true}));
//! let sink = RecordingSink::new();
//! let ctx = ApplyContext::new(&api, &sink, false);
//!
//! let endpoint = Endpoint::config("/api/v1/config/host");
//! let remote: Analytics = decode_into(TABLE, &endpoint.fetch(&ctx)?)?;
//! let local = Declared::all(Analytics::default());
//!
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.stage(endpoint, Resolver::new(&sink).resolve("analytics", &local, &remote, TABLE)?);
//! assert!(orchestrator.commit(&ctx)?);
//! assert_eq!(api.resource("/api/v1/config/host").unwrap()["analyticsEnabled"], false);
//! # Ok::<(), reconcile::Error>(())
//! ```

pub mod api;
pub mod codec;
pub mod collection;
pub mod context;
pub mod declared;
pub mod error;
pub mod event;
pub mod group;
pub mod mapping;
pub mod orchestrator;
pub mod resolver;

pub use api::{ApiClient, Method, MockApi};
pub use codec::{Codec, Fields, RemoteEnum, enum_codec, format_value, mask_secret};
pub use collection::{Collection, Prune};
pub use context::ApplyContext;
pub use declared::{Declared, FieldSet};
pub use error::{Error, Result};
pub use event::{Event, EventKind, EventSink, LogSink, RecordingSink};
pub use group::SettingsGroup;
pub use mapping::{FieldMapping, decode, decode_into, encode};
pub use orchestrator::{Endpoint, Orchestrator};
pub use resolver::{Change, Resolution, Resolver};
