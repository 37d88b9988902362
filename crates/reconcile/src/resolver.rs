//! Change-set resolution for one mapped remote object.
//!
//! The resolver compares a desired settings object with the decoded remote
//! one, reports every decision to the event sink, and returns the encoded
//! attributes to write. It never touches the network.

use crate::codec::Fields;
use crate::declared::Declared;
use crate::error::Result;
use crate::event::{Event, EventKind, EventSink};
use crate::mapping::{FieldMapping, to_fields, validate_table};
use serde::Serialize;
use serde_json::Value;

/// One field whose desired value differs from the remote one.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub local: String,
    pub remote: String,
    pub old: Value,
    pub new: Value,
}

/// Outcome of resolving one or more mapping tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub changed: bool,
    /// Encoded remote attributes to send, keyed by remote name.
    pub attrs: Fields,
    pub changes: Vec<Change>,
}

impl Resolution {
    /// Fold another resolution into this one.
    pub fn merge(&mut self, other: Self) {
        self.changed |= other.changed;
        self.attrs.extend(other.attrs);
        self.changes.extend(other.changes);
    }
}

/// Decides which remote attributes need writing.
pub struct Resolver<'a> {
    sink: &'a dyn EventSink,
    check_unmanaged: bool,
    set_unchanged: bool,
}

impl<'a> Resolver<'a> {
    /// Resolver that leaves undeclared fields alone and resubmits unchanged
    /// values, as whole-object `PUT`s require.
    pub fn new(sink: &'a dyn EventSink) -> Self {
        Self {
            sink,
            check_unmanaged: false,
            set_unchanged: true,
        }
    }

    /// Enforce local defaults for fields the user did not declare.
    #[must_use]
    pub fn check_unmanaged(mut self, check_unmanaged: bool) -> Self {
        self.check_unmanaged = check_unmanaged;
        self
    }

    /// Include encoded values of fields that did not change.
    #[must_use]
    pub fn set_unchanged(mut self, set_unchanged: bool) -> Self {
        self.set_unchanged = set_unchanged;
        self
    }

    /// Compare `local` with `remote` field by field through `table`.
    ///
    /// Each field gets exactly one event under `<tree>.<local name>`.
    /// Undeclared fields keep their remote value unless `check_unmanaged` is
    /// set. Root encoders see the effective object: remote values overlaid
    /// with every managed local value.
    pub fn resolve<T: Serialize>(
        &self,
        tree: &str,
        local: &Declared<T>,
        remote: &T,
        table: &[FieldMapping],
    ) -> Result<Resolution> {
        validate_table(table)?;
        let local_fields = to_fields(local.value())?;
        let remote_fields = to_fields(remote)?;

        let managed = |entry: &FieldMapping| self.check_unmanaged || local.is_declared(entry.local);

        let mut effective = remote_fields.clone();
        for entry in table.iter().filter(|&entry| managed(entry)) {
            let value = entry.canonical(&entry.local_value(&local_fields))?;
            effective.insert(entry.local.to_string(), value);
        }

        let mut resolution = Resolution::default();
        for entry in table {
            let path = format!("{tree}.{}", entry.local);
            let remote_value = entry.local_value(&remote_fields);

            if !managed(entry) {
                self.sink.emit(Event::new(
                    path,
                    EventKind::Unmanaged {
                        value: entry.format(&remote_value),
                    },
                ));
                if self.set_unchanged {
                    resolution
                        .attrs
                        .insert(entry.remote.to_string(), entry.encode_from(&effective)?);
                }
                continue;
            }

            let local_value = entry.local_value(&effective);
            if local_value == remote_value {
                self.sink.emit(Event::new(
                    path,
                    EventKind::UpToDate {
                        value: entry.format(&local_value),
                    },
                ));
                if self.set_unchanged {
                    resolution
                        .attrs
                        .insert(entry.remote.to_string(), entry.encode_from(&effective)?);
                }
            } else {
                self.sink.emit(Event::new(
                    path,
                    EventKind::Changed {
                        old: entry.format(&remote_value),
                        new: entry.format(&local_value),
                    },
                ));
                resolution.changed = true;
                resolution
                    .attrs
                    .insert(entry.remote.to_string(), entry.encode_from(&effective)?);
                resolution.changes.push(Change {
                    local: entry.local.to_string(),
                    remote: entry.remote.to_string(),
                    old: remote_value,
                    new: local_value,
                });
            }
        }
        Ok(resolution)
    }
}
