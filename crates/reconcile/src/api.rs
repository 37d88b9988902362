//! REST API collaborator.
//!
//! The engine never talks HTTP itself. Everything it needs from the remote
//! server goes through [`ApiClient`], which the binary implements over a real
//! HTTP agent and tests implement with [`MockApi`].
//!
//! # Testing
//!
//! ```
//! use reconcile::api::{ApiClient, Method, MockApi};
//! use serde_json::json;
//!
//! let api = MockApi::new().with_resource("/api/v1/tag", json!([]));
//! let created = api.post("/api/v1/tag", &json!({"label": "rock"})).unwrap();
//! assert_eq!(created["id"], 1);
//! assert_eq!(api.writes()[0].method, Method::Post);
//! ```

use crate::error::{Error, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

/// Authenticated access to one remote instance.
///
/// Paths are relative to the instance base URL (e.g. `/api/v1/tag`).
/// Implementations return [`Error::Api`] for non-2xx responses.
pub trait ApiClient {
    /// Fetch a resource.
    fn get(&self, path: &str) -> Result<Value>;

    /// Create a resource, returning it as stored (including its assigned id).
    fn post(&self, path: &str, body: &Value) -> Result<Value>;

    /// Replace a resource.
    fn put(&self, path: &str, body: &Value) -> Result<Value>;

    /// Delete a resource.
    fn delete(&self, path: &str) -> Result<()>;
}

/// HTTP method of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        write!(f, "{name}")
    }
}

/// A call made against [`MockApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct Failure {
    method: Method,
    path: String,
    status: u16,
    /// Matching calls allowed to succeed before failures start.
    skip: usize,
}

/// In-memory REST server for tests.
///
/// Resources are JSON values stored by path. A path holding an array behaves
/// like a collection: `POST` appends with the next numeric id, and
/// `GET`/`PUT`/`DELETE` on `<path>/<id>` address its elements. A path holding
/// an object behaves like a singleton config resource that accepts
/// `PUT <path>/<id>` when the id matches.
#[derive(Debug, Default)]
pub struct MockApi {
    resources: RefCell<BTreeMap<String, Value>>,
    calls: RefCell<Vec<Call>>,
    failures: RefCell<Vec<Failure>>,
}

impl MockApi {
    /// Create an empty mock server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MockApi::set_resource`].
    #[must_use]
    pub fn with_resource(self, path: impl Into<String>, value: Value) -> Self {
        self.set_resource(path, value);
        self
    }

    /// Store a resource at a path, replacing any previous value.
    pub fn set_resource(&self, path: impl Into<String>, value: Value) {
        self.resources.borrow_mut().insert(path.into(), value);
    }

    /// Current value stored at a path.
    pub fn resource(&self, path: &str) -> Option<Value> {
        self.resources.borrow().get(path).cloned()
    }

    /// Make every matching call fail with the given status.
    pub fn fail(&self, method: Method, path: impl Into<String>, status: u16) {
        self.fail_after(method, path, 0, status);
    }

    /// Let `successes` matching calls through, then fail the rest.
    pub fn fail_after(&self, method: Method, path: impl Into<String>, successes: usize, status: u16) {
        self.failures.borrow_mut().push(Failure {
            method,
            path: path.into(),
            status,
            skip: successes,
        });
    }

    /// All calls in the order they were made.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Calls that would mutate the server (everything but GET).
    pub fn writes(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.method != Method::Get)
            .cloned()
            .collect()
    }

    /// Forget recorded calls, keeping resources and failures.
    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, method: Method, path: &str, body: Option<&Value>) -> Result<()> {
        let prior = self
            .calls
            .borrow()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count();

        self.calls.borrow_mut().push(Call {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let failures = self.failures.borrow();
        if let Some(failure) = failures
            .iter()
            .find(|f| f.method == method && f.path == path && prior >= f.skip)
        {
            return Err(Error::api(
                failure.status,
                format!("mock failure for {method} {path}"),
            ));
        }
        Ok(())
    }
}

/// Path segment addressing a remote resource by its `id` attribute.
pub fn resource_id(resource: &Value) -> Result<String> {
    match resource.get("id") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(Error::InvalidResponse(format!(
            "resource has no usable 'id': {resource}"
        ))),
    }
}

fn not_found(path: &str) -> Error {
    Error::api(404, format!("no resource at {path}"))
}

fn id_matches(element: &Value, id: &str) -> bool {
    match element.get("id") {
        Some(Value::Number(n)) => n.to_string() == id,
        Some(Value::String(s)) => s == id,
        _ => false,
    }
}

impl ApiClient for MockApi {
    fn get(&self, path: &str) -> Result<Value> {
        self.record(Method::Get, path, None)?;
        let resources = self.resources.borrow();

        if let Some(value) = resources.get(path) {
            return Ok(value.clone());
        }

        if let Some((parent, id)) = path.rsplit_once('/')
            && let Some(Value::Array(items)) = resources.get(parent)
            && let Some(item) = items.iter().find(|i| id_matches(i, id))
        {
            return Ok(item.clone());
        }

        Err(not_found(path))
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.record(Method::Post, path, Some(body))?;
        let mut resources = self.resources.borrow_mut();

        let entry = resources
            .entry(path.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(items) = entry else {
            return Err(Error::api(405, format!("cannot POST to {path}")));
        };

        let next_id = items
            .iter()
            .filter_map(|i| i.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;

        let mut created = body.clone();
        if let Value::Object(map) = &mut created {
            map.insert("id".to_string(), Value::from(next_id));
        }
        items.push(created.clone());
        Ok(created)
    }

    fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.record(Method::Put, path, Some(body))?;
        let (parent, id) = path.rsplit_once('/').ok_or_else(|| not_found(path))?;
        let mut resources = self.resources.borrow_mut();

        let slot = match resources.get_mut(parent) {
            Some(Value::Array(items)) => items.iter_mut().find(|i| id_matches(i, id)),
            Some(object) if id_matches(object, id) => Some(object),
            _ => None,
        };

        match slot {
            Some(slot) => {
                *slot = body.clone();
                Ok(body.clone())
            }
            None => Err(not_found(path)),
        }
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.record(Method::Delete, path, None)?;
        let (parent, id) = path.rsplit_once('/').ok_or_else(|| not_found(path))?;
        let mut resources = self.resources.borrow_mut();

        if let Some(Value::Array(items)) = resources.get_mut(parent)
            && let Some(pos) = items.iter().position(|i| id_matches(i, id))
        {
            items.remove(pos);
            return Ok(());
        }

        Err(not_found(path))
    }
}
