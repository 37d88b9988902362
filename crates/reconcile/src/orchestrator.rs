//! Grouped writes for settings that span several remote resources.
//!
//! Resolutions are staged per [`Endpoint`] while every sub-table is
//! evaluated. [`Orchestrator::commit`] then performs one fresh `GET` and one
//! `PUT` for each endpoint whose staged attributes changed, so identifiers
//! and unmapped remote attributes always come from current state.

use crate::api::resource_id;
use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::resolver::Resolution;
use serde_json::Value;
use std::fmt;

/// A remote object that accepts whole-object `PUT`s at `<path>/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Singleton config resource, e.g. `/api/v1/config/host`.
    Config(String),
    /// The element of a list resource whose `key` attribute equals `value`.
    ListItem {
        path: String,
        key: String,
        value: String,
    },
}

impl Endpoint {
    pub fn config(path: impl Into<String>) -> Self {
        Self::Config(path.into())
    }

    pub fn list_item(
        path: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::ListItem {
            path: path.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Path of the resource the element lives under.
    pub fn path(&self) -> &str {
        match self {
            Self::Config(path) | Self::ListItem { path, .. } => path,
        }
    }

    /// Fetch the current remote object.
    pub fn fetch(&self, ctx: &ApplyContext<'_>) -> Result<Value> {
        let fetched = ctx.get(self.path())?;
        match self {
            Self::Config(_) => Ok(fetched),
            Self::ListItem { path, key, value } => find_list_item(&fetched, path, key, value),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(path) => write!(f, "{path}"),
            Self::ListItem { path, key, value } => write!(f, "{path}[{key}={value}]"),
        }
    }
}

/// Select the element of `listing` whose `key` equals `value`.
///
/// A missing element means the remote schema is not what it should be, so
/// this is an invariant error rather than a not-found.
pub fn find_list_item(listing: &Value, path: &str, key: &str, value: &str) -> Result<Value> {
    let items = listing
        .as_array()
        .ok_or_else(|| Error::InvalidResponse(format!("expected a list from {path}, got {listing}")))?;

    items
        .iter()
        .find(|item| item.get(key).and_then(Value::as_str) == Some(value))
        .cloned()
        .ok_or_else(|| {
            Error::invariant(format!(
                "unable to find {key} '{value}' in {path}, database might be corrupt"
            ))
        })
}

/// Collects resolutions per endpoint and writes them in one pass.
#[derive(Debug, Default)]
pub struct Orchestrator {
    staged: Vec<(Endpoint, Resolution)>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolution for `endpoint`, merging with earlier ones for the
    /// same endpoint.
    pub fn stage(&mut self, endpoint: Endpoint, resolution: Resolution) {
        match self.staged.iter_mut().find(|(staged, _)| *staged == endpoint) {
            Some((_, existing)) => existing.merge(resolution),
            None => self.staged.push((endpoint, resolution)),
        }
    }

    /// Whether any staged resolution changed.
    pub fn changed(&self) -> bool {
        self.staged.iter().any(|(_, resolution)| resolution.changed)
    }

    /// Write every changed endpoint, in staging order.
    pub fn commit(self, ctx: &ApplyContext<'_>) -> Result<bool> {
        let mut changed = false;
        for (endpoint, resolution) in self.staged {
            if !resolution.changed {
                log::trace!("{endpoint}: no changes");
                continue;
            }
            changed = true;

            let mut body = endpoint.fetch(ctx)?;
            let id = resource_id(&body)?;
            let Value::Object(object) = &mut body else {
                return Err(Error::InvalidResponse(format!(
                    "expected an object from {endpoint}, got {body}"
                )));
            };
            object.extend(resolution.attrs);

            log::debug!("{endpoint}: writing {} changed field(s)", resolution.changes.len());
            ctx.put(&format!("{}/{id}", endpoint.path()), &body)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockApi};
    use crate::event::RecordingSink;
    use serde_json::{Map, json};

    const HOST: &str = "/api/v1/config/host";
    const NAMING: &str = "/api/v1/config/naming";
    const METADATA: &str = "/api/v1/metadata";

    fn resolution(changed: bool, attrs: Value) -> Resolution {
        let Value::Object(attrs) = attrs else {
            panic!("attrs must be an object");
        };
        Resolution {
            changed,
            attrs,
            changes: Vec::new(),
        }
    }

    fn api() -> MockApi {
        MockApi::new()
            .with_resource(HOST, json!({"id": 1, "logLevel": "info", "port": 8686, "apiKey": "k"}))
            .with_resource(NAMING, json!({"id": 1, "renameTracks": false}))
            .with_resource(
                METADATA,
                json!([
                    {"id": 1, "implementation": "XbmcMetadata", "enable": false},
                    {"id": 2, "implementation": "WdtvMetadata", "enable": false},
                ]),
            )
    }

    #[test]
    fn test_single_put_merges_sub_tables() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(Endpoint::config(HOST), resolution(true, json!({"logLevel": "debug"})));
        orchestrator.stage(Endpoint::config(HOST), resolution(false, json!({"port": 8686})));
        assert!(orchestrator.changed());

        assert!(orchestrator.commit(&ctx).unwrap());

        let writes = api.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].method, Method::Put);
        assert_eq!(writes[0].path, "/api/v1/config/host/1");
        assert_eq!(
            writes[0].body,
            Some(json!({"id": 1, "logLevel": "debug", "port": 8686, "apiKey": "k"}))
        );
    }

    #[test]
    fn test_unchanged_endpoints_are_not_written() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(Endpoint::config(HOST), resolution(false, json!({"port": 8686})));
        orchestrator.stage(Endpoint::config(NAMING), resolution(true, json!({"renameTracks": true})));

        assert!(orchestrator.commit(&ctx).unwrap());
        let paths: Vec<String> = api.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec![NAMING, "/api/v1/config/naming/1"]);
    }

    #[test]
    fn test_nothing_changed_makes_no_calls() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(Endpoint::config(HOST), Resolution::default());

        assert!(!orchestrator.commit(&ctx).unwrap());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_list_item_endpoint() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(
            Endpoint::list_item(METADATA, "implementation", "WdtvMetadata"),
            resolution(true, json!({"enable": true})),
        );
        orchestrator.commit(&ctx).unwrap();

        let stored = api.resource(METADATA).unwrap();
        assert_eq!(stored[0]["enable"], false);
        assert_eq!(stored[1]["enable"], true);
    }

    #[test]
    fn test_missing_list_item_is_invariant_error() {
        let err = find_list_item(&json!([]), METADATA, "implementation", "RoksboxMetadata")
            .unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
        assert!(err.to_string().contains("database might be corrupt"));
    }

    #[test]
    fn test_snapshot_is_fetched_fresh_before_put() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(Endpoint::config(HOST), resolution(true, json!({"logLevel": "debug"})));
        api.set_resource(HOST, json!({"id": 7, "logLevel": "info", "port": 9000}));

        orchestrator.commit(&ctx).unwrap();
        let put = &api.writes()[0];
        assert_eq!(put.path, "/api/v1/config/host/7");
        assert_eq!(put.body, Some(json!({"id": 7, "logLevel": "debug", "port": 9000})));
    }

    #[test]
    fn test_put_failure_propagates_status() {
        let api = api();
        api.fail(Method::Put, "/api/v1/config/host/1", 400);
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(Endpoint::config(HOST), resolution(true, json!({"port": 1})));
        assert_eq!(orchestrator.commit(&ctx).unwrap_err().status(), Some(400));
    }

    #[test]
    fn test_dry_run_fetches_but_does_not_put() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::dry_run(&api, &sink);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(Endpoint::config(HOST), resolution(true, Value::Object(Map::new())));
        assert!(orchestrator.commit(&ctx).unwrap());
        assert!(api.writes().is_empty());
    }
}
