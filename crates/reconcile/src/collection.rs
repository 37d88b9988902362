//! Reconciliation of named remote collections.
//!
//! Membership is the configuration: each local name either exists remotely
//! or is created, and remote entries without a local name are reported or
//! deleted depending on [`Prune`].

use crate::api::{ApiClient, resource_id};
use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// What to do with remote entries that have no local counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prune {
    /// Say nothing; the server cleans these up itself.
    Never,
    /// Log them as unmanaged and keep them.
    Report,
    Delete,
}

impl Prune {
    /// `Delete` when `delete_unmanaged` is set, otherwise `Report`.
    pub fn from_flag(delete_unmanaged: bool) -> Self {
        if delete_unmanaged {
            Self::Delete
        } else {
            Self::Report
        }
    }
}

/// A remote entry: its name and opaque id.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub name: String,
    pub id: String,
}

type CreateBody<'a> = Box<dyn Fn(&str) -> Value + 'a>;

/// A remote list resource whose entries are identified by one string key.
pub struct Collection<'a> {
    path: String,
    key: String,
    create_body: CreateBody<'a>,
}

impl<'a> Collection<'a> {
    /// Collection at `path` keyed by the `key` attribute. New entries are
    /// created with `{key: name}`.
    pub fn new(path: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        let body_key = key.clone();
        Self {
            path: path.into(),
            key,
            create_body: Box::new(move |name| {
                let mut body = Map::new();
                body.insert(body_key.clone(), Value::from(name));
                Value::Object(body)
            }),
        }
    }

    /// Use a custom payload for new entries.
    #[must_use]
    pub fn create_with(mut self, create_body: impl Fn(&str) -> Value + 'a) -> Self {
        self.create_body = Box::new(create_body);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fetch the remote entries in server order.
    pub fn fetch(&self, api: &dyn ApiClient) -> Result<Vec<RemoteEntry>> {
        let listing = api.get(&self.path)?;
        let items = listing.as_array().ok_or_else(|| {
            Error::InvalidResponse(format!("expected a list from {}, got {listing}", self.path))
        })?;

        items
            .iter()
            .map(|item| {
                let name = item.get(&self.key).and_then(Value::as_str).ok_or_else(|| {
                    Error::InvalidResponse(format!(
                        "entry of {} has no string '{}': {item}",
                        self.path, self.key
                    ))
                })?;
                Ok(RemoteEntry {
                    name: name.to_string(),
                    id: resource_id(item)?,
                })
            })
            .collect()
    }

    /// Names currently present remotely.
    pub fn names(&self, api: &dyn ApiClient) -> Result<BTreeSet<String>> {
        Ok(self.fetch(api)?.into_iter().map(|e| e.name).collect())
    }

    /// Create every local name missing remotely, in sorted order.
    ///
    /// Events go to `<tree>[i]` where `i` is the position in sorted order.
    pub fn create_missing(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        names: &BTreeSet<String>,
    ) -> Result<bool> {
        let existing = self.names(ctx.api())?;
        let mut changed = false;

        for (i, name) in names.iter().enumerate() {
            let path = format!("{tree}[{i}]");
            if existing.contains(name) {
                ctx.emit(Event::new(path, EventKind::Exists { name: name.clone() }));
            } else {
                ctx.emit(Event::new(path, EventKind::Created { name: name.clone() }));
                ctx.post(&self.path, &(self.create_body)(name))?;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Handle remote entries not in `names` according to `prune`.
    ///
    /// Remote-only entries are numbered `<tree>[-1]`, `<tree>[-2]`, ... in
    /// server order.
    pub fn prune(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        names: &BTreeSet<String>,
        prune: Prune,
    ) -> Result<bool> {
        if prune == Prune::Never {
            return Ok(false);
        }

        let unmanaged = self
            .fetch(ctx.api())?
            .into_iter()
            .filter(|entry| !names.contains(&entry.name));

        let mut changed = false;
        for (i, entry) in unmanaged.enumerate() {
            let path = format!("{tree}[-{}]", i + 1);
            if prune == Prune::Delete {
                ctx.emit(Event::new(
                    path,
                    EventKind::Deleted {
                        name: entry.name.clone(),
                    },
                ));
                ctx.delete(&format!("{}/{}", self.path, entry.id))?;
                changed = true;
            } else {
                ctx.emit(Event::new(path, EventKind::Retained { name: entry.name }));
            }
        }
        Ok(changed)
    }

    /// Create missing entries, then prune unmanaged ones.
    pub fn reconcile(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        names: &BTreeSet<String>,
        prune: Prune,
    ) -> Result<bool> {
        let created = self.create_missing(tree, ctx, names)?;
        let pruned = self.prune(tree, ctx, names, prune)?;
        Ok(created || pruned)
    }
}
