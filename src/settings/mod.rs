//! Lidarr settings groups and the top-level driver that runs them.

pub mod general;
pub mod media_management;
pub mod metadata;
pub mod tags;

use general::GeneralSettings;
use media_management::MediaManagementSettings;
use metadata::MetadataSettings;
use reconcile::{ApiClient, ApplyContext, SettingsGroup};
use serde::{Deserialize, Serialize};
use tags::TagsSettings;

/// Root of every settings tree path.
pub const TREE: &str = "lidarr.settings";

/// A configuration value that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct Invalid {
    pub path: String,
    pub message: String,
}

impl Invalid {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Every settings group of one Lidarr instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LidarrSettings {
    pub general: GeneralSettings,
    pub media_management: MediaManagementSettings,
    pub metadata: MetadataSettings,
    pub tags: TagsSettings,
}

impl LidarrSettings {
    /// Collect every validation failure under `tree`.
    pub fn validate(&self, tree: &str) -> Vec<Invalid> {
        let mut errors = Vec::new();
        self.general.validate(&format!("{tree}.general"), &mut errors);
        self.media_management
            .validate(&format!("{tree}.media_management"), &mut errors);
        self.tags.validate(&format!("{tree}.tags"), &mut errors);
        errors
    }
}

impl SettingsGroup for LidarrSettings {
    fn from_remote(api: &dyn ApiClient) -> reconcile::Result<Self> {
        Ok(Self {
            general: GeneralSettings::from_remote(api)?,
            media_management: MediaManagementSettings::from_remote(api)?,
            metadata: MetadataSettings::from_remote(api)?,
            tags: TagsSettings::from_remote(api)?,
        })
    }

    /// Groups run in order and each one is always evaluated, so the event
    /// stream covers the whole tree even when an early group changed.
    fn update_remote(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        remote: &Self,
        check_unmanaged: bool,
    ) -> reconcile::Result<bool> {
        let results = [
            self.general.update_remote(
                &format!("{tree}.general"),
                ctx,
                &remote.general,
                check_unmanaged,
            )?,
            self.media_management.update_remote(
                &format!("{tree}.media_management"),
                ctx,
                &remote.media_management,
                check_unmanaged,
            )?,
            self.metadata.update_remote(
                &format!("{tree}.metadata"),
                ctx,
                &remote.metadata,
                check_unmanaged,
            )?,
            self.tags
                .update_remote(&format!("{tree}.tags"), ctx, &remote.tags, check_unmanaged)?,
        ];
        Ok(results.into_iter().any(|changed| changed))
    }

    fn delete_remote(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        remote: &Self,
    ) -> reconcile::Result<bool> {
        let results = [
            self.general
                .delete_remote(&format!("{tree}.general"), ctx, &remote.general)?,
            self.media_management.delete_remote(
                &format!("{tree}.media_management"),
                ctx,
                &remote.media_management,
            )?,
            self.metadata
                .delete_remote(&format!("{tree}.metadata"), ctx, &remote.metadata)?,
            self.tags
                .delete_remote(&format!("{tree}.tags"), ctx, &remote.tags)?,
        ];
        Ok(results.into_iter().any(|changed| changed))
    }
}

/// Full pass: update every group, then run the deletion phase.
pub fn sync(
    local: &LidarrSettings,
    ctx: &ApplyContext<'_>,
    check_unmanaged: bool,
) -> reconcile::Result<bool> {
    let remote = LidarrSettings::from_remote(ctx.api())?;
    let updated = local.update_remote(TREE, ctx, &remote, check_unmanaged)?;

    let remote = LidarrSettings::from_remote(ctx.api())?;
    let deleted = local.delete_remote(TREE, ctx, &remote)?;
    Ok(updated || deleted)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use reconcile::api::Method;
    use reconcile::{MockApi, RecordingSink};
    use serde_json::json;

    /// A fresh Lidarr instance as seen through its API.
    pub(crate) fn lidarr() -> MockApi {
        MockApi::new()
            .with_resource(
                general::HOST_CONFIG,
                json!({
                    "id": 1,
                    "bindAddress": "*",
                    "port": 8686,
                    "sslPort": 6868,
                    "enableSsl": false,
                    "urlBase": "",
                    "instanceName": "Lidarr",
                    "authenticationMethod": "none",
                    "username": "",
                    "password": "",
                    "certificateValidation": "enabled",
                    "proxyEnabled": false,
                    "proxyType": "http",
                    "proxyHostname": "",
                    "proxyPort": 8080,
                    "proxyUsername": "",
                    "proxyPassword": "",
                    "proxyBypassFilter": "",
                    "proxyBypassLocalAddresses": true,
                    "logLevel": "info",
                    "analyticsEnabled": true,
                    "branch": "master",
                    "updateAutomatically": false,
                    "updateMechanism": "docker",
                    "updateScriptPath": "",
                    "backupFolder": "Backups",
                    "backupInterval": 7,
                    "backupRetention": 28,
                }),
            )
            .with_resource(
                media_management::NAMING_CONFIG,
                json!({"id": 1, "renameTracks": false}),
            )
            .with_resource(
                media_management::MEDIA_MANAGEMENT_CONFIG,
                json!({
                    "id": 1,
                    "deleteEmptyFolders": false,
                    "skipFreeSpaceCheckWhenImporting": false,
                    "minimumFreeSpaceWhenImporting": 100,
                    "copyUsingHardlinks": true,
                    "importExtraFiles": false,
                    "downloadPropersAndRepacks": "doNotPrefer",
                    "rescanAfterRefresh": "always",
                    "fileDate": "none",
                    "recycleBin": "",
                    "recycleBinCleanupDays": 7,
                    "setPermissionsLinux": false,
                    "chmodFolder": "755",
                    "chownGroup": "",
                }),
            )
            .with_resource(
                media_management::ROOT_FOLDERS,
                json!([{"id": 1, "path": "/music", "name": "/music"}]),
            )
            .with_resource(
                metadata::METADATA,
                json!([
                    {"id": 1, "implementation": "XbmcMetadata", "enable": false},
                    {"id": 2, "implementation": "RoksboxMetadata", "enable": false},
                    {"id": 3, "implementation": "WdtvMetadata", "enable": false},
                ]),
            )
            .with_resource(tags::TAGS, json!([]))
    }

    const CONFIG: &str = r#"
[general.logging]
log_level = "DEBUG"

[media_management]
root_folders = ["/music"]
delete_unmanaged_root_folders = true

[metadata.kodi_emby]
enable = true

[tags]
definitions = ["rock", "jazz"]
"#;

    #[test]
    fn test_sync_converges() {
        let api = lidarr();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let local: LidarrSettings = toml::from_str(CONFIG).unwrap();

        assert!(sync(&local, &ctx, false).unwrap());
        let first_pass: Vec<(Method, String)> =
            api.writes().into_iter().map(|c| (c.method, c.path)).collect();
        assert_eq!(
            first_pass,
            vec![
                (Method::Put, "/api/v1/config/host/1".to_string()),
                (Method::Put, "/api/v1/metadata/1".to_string()),
                (Method::Post, "/api/v1/tag".to_string()),
                (Method::Post, "/api/v1/tag".to_string()),
            ]
        );

        api.clear_calls();
        let second = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &second, false);
        assert!(!sync(&local, &ctx, false).unwrap());
        assert!(api.writes().is_empty());
        assert_eq!(second.change_count(), 0);
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let api = lidarr();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::dry_run(&api, &sink);
        let local: LidarrSettings = toml::from_str(CONFIG).unwrap();

        assert!(sync(&local, &ctx, false).unwrap());
        assert!(api.writes().is_empty());
        assert_eq!(sink.change_count(), 4);
    }

    #[test]
    fn test_api_error_aborts_run() {
        let api = lidarr();
        api.fail(Method::Get, metadata::METADATA, 500);
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let err = sync(&LidarrSettings::default(), &ctx, false).unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(api.writes().is_empty());
    }

    #[test]
    fn test_validate_prefixes_paths() {
        let local: LidarrSettings =
            toml::from_str("[general.backup]\nretention = 100\n").unwrap();
        let errors = local.validate(TREE);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "lidarr.settings.general.backup.retention: must be 1-90 days"
        );
    }
}
