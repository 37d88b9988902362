//! Context passed to every reconciliation step.

use crate::api::ApiClient;
use crate::error::Result;
use crate::event::{Event, EventSink};
use serde_json::Value;

/// Access to the remote instance plus the event sink for one run.
///
/// In a dry run every `GET` still happens and every event is still emitted,
/// but writes are skipped.
pub struct ApplyContext<'a> {
    api: &'a dyn ApiClient,
    sink: &'a dyn EventSink,
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(api: &'a dyn ApiClient, sink: &'a dyn EventSink, dry_run: bool) -> Self {
        Self { api, sink, dry_run }
    }

    /// Create a dry-run context
    pub fn dry_run(api: &'a dyn ApiClient, sink: &'a dyn EventSink) -> Self {
        Self::new(api, sink, true)
    }

    pub fn api(&self) -> &'a dyn ApiClient {
        self.api
    }

    pub fn sink(&self) -> &'a dyn EventSink {
        self.sink
    }

    pub fn emit(&self, event: Event) {
        self.sink.emit(event);
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.api.get(path)
    }

    /// `POST` unless dry-running; a dry run returns `None`.
    pub fn post(&self, path: &str, body: &Value) -> Result<Option<Value>> {
        if self.dry_run {
            log::debug!("dry run: skipping POST {path}");
            return Ok(None);
        }
        self.api.post(path, body).map(Some)
    }

    /// `PUT` unless dry-running; a dry run returns `None`.
    pub fn put(&self, path: &str, body: &Value) -> Result<Option<Value>> {
        if self.dry_run {
            log::debug!("dry run: skipping PUT {path}");
            return Ok(None);
        }
        self.api.put(path, body).map(Some)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        if self.dry_run {
            log::debug!("dry run: skipping DELETE {path}");
            return Ok(());
        }
        self.api.delete(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockApi};
    use crate::event::RecordingSink;
    use serde_json::json;

    #[test]
    fn test_dry_run_skips_writes() {
        let api = MockApi::new().with_resource("/api/v1/tag", json!([]));
        let sink = RecordingSink::new();
        let ctx = ApplyContext::dry_run(&api, &sink);

        assert_eq!(ctx.get("/api/v1/tag").unwrap(), json!([]));
        assert!(ctx.post("/api/v1/tag", &json!({"label": "a"})).unwrap().is_none());
        ctx.delete("/api/v1/tag/1").unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(api.resource("/api/v1/tag"), Some(json!([])));
    }

    #[test]
    fn test_real_run_writes() {
        let api = MockApi::new().with_resource("/api/v1/tag", json!([]));
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let created = ctx.post("/api/v1/tag", &json!({"label": "a"})).unwrap();
        assert_eq!(created.unwrap()["label"], "a");
        assert_eq!(api.writes().len(), 1);
    }
}
