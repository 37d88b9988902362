//! The interface every settings group implements.

use crate::api::ApiClient;
use crate::context::ApplyContext;
use crate::error::Result;

/// A named group of settings that can be read from and written to a remote
/// instance.
///
/// Local values come from configuration; [`SettingsGroup::from_remote`]
/// builds the same type from current remote state with every field declared.
pub trait SettingsGroup: Sized {
    /// Build a snapshot of the remote state. Read-only.
    fn from_remote(api: &dyn ApiClient) -> Result<Self>;

    /// Reconcile `remote` towards `self`, returning whether anything changed.
    ///
    /// Every sub-resource is evaluated and reported before any write.
    fn update_remote(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        remote: &Self,
        check_unmanaged: bool,
    ) -> Result<bool>;

    /// Delete remote entries this group owns but configuration does not
    /// declare. Groups without deletable collections keep the default.
    fn delete_remote(&self, _tree: &str, _ctx: &ApplyContext<'_>, _remote: &Self) -> Result<bool> {
        Ok(false)
    }
}
