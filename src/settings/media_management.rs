//! Media management: track naming, import and file handling, permissions,
//! and the root folder collection.

use super::Invalid;
use reconcile::codec::{Codec, RemoteEnum, enum_codec};
use reconcile::{
    ApiClient, ApplyContext, Collection, Declared, Endpoint, FieldMapping, Orchestrator, Prune,
    Resolver, SettingsGroup, decode_into,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Value, json};
use std::collections::BTreeSet;

pub const NAMING_CONFIG: &str = "/api/v1/config/naming";
pub const MEDIA_MANAGEMENT_CONFIG: &str = "/api/v1/config/mediamanagement";
pub const ROOT_FOLDERS: &str = "/api/v1/rootfolder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropersAndRepacks {
    PreferAndUpgrade,
    DoNotUpgradeAutomatically,
    #[default]
    DoNotPrefer,
}

impl RemoteEnum for PropersAndRepacks {
    const ALL: &'static [Self] = &[
        Self::PreferAndUpgrade,
        Self::DoNotUpgradeAutomatically,
        Self::DoNotPrefer,
    ];

    fn remote_value(self) -> &'static str {
        match self {
            Self::PreferAndUpgrade => "preferAndUpgrade",
            Self::DoNotUpgradeAutomatically => "doNotUpgrade",
            Self::DoNotPrefer => "doNotPrefer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RescanAfterRefresh {
    #[default]
    Always,
    AfterManualRefresh,
    Never,
}

impl RemoteEnum for RescanAfterRefresh {
    const ALL: &'static [Self] = &[Self::Always, Self::AfterManualRefresh, Self::Never];

    fn remote_value(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::AfterManualRefresh => "afterManual",
            Self::Never => "never",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeFileDate {
    #[default]
    None,
    LocalAirDate,
    UtcAirDate,
}

impl RemoteEnum for ChangeFileDate {
    const ALL: &'static [Self] = &[Self::None, Self::LocalAirDate, Self::UtcAirDate];

    fn remote_value(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::LocalAirDate => "localAirDate",
            Self::UtcAirDate => "utcAirDate",
        }
    }
}

/// Folder permissions.
///
/// Written as an `ls -l` style string (`"drwxr-xr-x"`), an octal string
/// (`"755"`) or an integer mode (`0o755`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChmodFolder {
    #[default]
    DrwxrXrX,
    DrwxrwxrX,
    Drwxrwx,
    DrwxrX,
    Drwxrwxrwx,
}

impl ChmodFolder {
    fn symbolic(self) -> &'static str {
        match self {
            Self::DrwxrXrX => "drwxr-xr-x",
            Self::DrwxrwxrX => "drwxrwxr-x",
            Self::Drwxrwx => "drwxrwx---",
            Self::DrwxrX => "drwxr-x---",
            Self::Drwxrwxrwx => "drwxrwxrwx",
        }
    }
}

impl Serialize for ChmodFolder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbolic())
    }
}

impl<'de> Deserialize<'de> for ChmodFolder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Spelling {
            Mode(u32),
            Text(String),
        }

        let text = match Spelling::deserialize(deserializer)? {
            Spelling::Mode(mode) => format!("{mode:o}"),
            Spelling::Text(text) => text,
        };
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.symbolic() == text || mode.remote_value() == text)
            .ok_or_else(|| de::Error::custom(format!("unsupported folder mode '{text}'")))
    }
}

impl RemoteEnum for ChmodFolder {
    const ALL: &'static [Self] = &[
        Self::DrwxrXrX,
        Self::DrwxrwxrX,
        Self::Drwxrwx,
        Self::DrwxrX,
        Self::Drwxrwxrwx,
    ];

    fn remote_value(self) -> &'static str {
        match self {
            Self::DrwxrXrX => "755",
            Self::DrwxrwxrX => "775",
            Self::Drwxrwx => "770",
            Self::DrwxrX => "750",
            Self::Drwxrwxrwx => "777",
        }
    }
}

/// Settings spread over the naming and media management config resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaManagementOptions {
    pub rename_tracks: bool,
    pub delete_empty_folders: bool,
    pub skip_free_space_check: bool,
    /// Megabytes that must stay free when importing (at least 100)
    pub minimum_free_space: u32,
    pub use_hardlinks: bool,
    pub import_extra_files: bool,
    pub propers_and_repacks: PropersAndRepacks,
    pub rescan_artist_folder_after_refresh: RescanAfterRefresh,
    pub change_file_date: ChangeFileDate,
    pub recycling_bin: Option<String>,
    /// Days before recycled files are removed
    pub recycling_bin_cleanup: u32,
    pub set_permissions: bool,
    pub chmod_folder: ChmodFolder,
    pub chown_group: Option<String>,
}

impl Default for MediaManagementOptions {
    fn default() -> Self {
        Self {
            rename_tracks: false,
            delete_empty_folders: false,
            skip_free_space_check: false,
            minimum_free_space: 100,
            use_hardlinks: true,
            import_extra_files: false,
            propers_and_repacks: PropersAndRepacks::DoNotPrefer,
            rescan_artist_folder_after_refresh: RescanAfterRefresh::Always,
            change_file_date: ChangeFileDate::None,
            recycling_bin: None,
            recycling_bin_cleanup: 7,
            set_permissions: false,
            chmod_folder: ChmodFolder::DrwxrXrX,
            chown_group: None,
        }
    }
}

const NAMING: &[FieldMapping] = &[FieldMapping::new("rename_tracks", "renameTracks")];

const MEDIA_MANAGEMENT: &[FieldMapping] = &[
    FieldMapping::new("delete_empty_folders", "deleteEmptyFolders"),
    FieldMapping::new("skip_free_space_check", "skipFreeSpaceCheckWhenImporting"),
    FieldMapping::new("minimum_free_space", "minimumFreeSpaceWhenImporting"),
    FieldMapping::new("use_hardlinks", "copyUsingHardlinks"),
    FieldMapping::new("import_extra_files", "importExtraFiles"),
    FieldMapping::new("propers_and_repacks", "downloadPropersAndRepacks")
        .codec(enum_codec::<PropersAndRepacks>()),
    FieldMapping::new("rescan_artist_folder_after_refresh", "rescanAfterRefresh")
        .codec(enum_codec::<RescanAfterRefresh>()),
    FieldMapping::new("change_file_date", "fileDate").codec(enum_codec::<ChangeFileDate>()),
    FieldMapping::new("recycling_bin", "recycleBin").codec(Codec::OptionalEmptyString),
    FieldMapping::new("recycling_bin_cleanup", "recycleBinCleanupDays"),
    FieldMapping::new("set_permissions", "setPermissionsLinux"),
    FieldMapping::new("chmod_folder", "chmodFolder").codec(enum_codec::<ChmodFolder>()),
    FieldMapping::new("chown_group", "chownGroup").codec(Codec::OptionalEmptyString),
];

/// Root folder membership plus the profiles new root folders get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootFolders {
    pub root_folders: BTreeSet<String>,
    /// Delete root folders on Lidarr that are not listed here
    pub delete_unmanaged_root_folders: bool,
    pub root_folder_quality_profile_id: u32,
    pub root_folder_metadata_profile_id: u32,
}

impl Default for RootFolders {
    fn default() -> Self {
        Self {
            root_folders: BTreeSet::new(),
            delete_unmanaged_root_folders: false,
            root_folder_quality_profile_id: 1,
            root_folder_metadata_profile_id: 1,
        }
    }
}

/// The `[lidarr.settings.media_management]` section.
///
/// Options and root folders share one TOML table but are reconciled
/// separately: options through field mappings, root folders as a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaManagementSettings {
    pub options: Declared<MediaManagementOptions>,
    pub root_folders: RootFolders,
}

#[derive(Serialize)]
struct SectionRef<'a> {
    #[serde(flatten)]
    options: &'a MediaManagementOptions,
    #[serde(flatten)]
    root_folders: &'a RootFolders,
}

impl Serialize for MediaManagementSettings {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SectionRef {
            options: self.options.value(),
            root_folders: &self.root_folders,
        }
        .serialize(serializer)
    }
}

const ROOT_FOLDER_KEYS: &[&str] = &[
    "root_folders",
    "delete_unmanaged_root_folders",
    "root_folder_quality_profile_id",
    "root_folder_metadata_profile_id",
];

impl<'de> Deserialize<'de> for MediaManagementSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use de::Error as _;

        let mut section = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        let mut folder_keys = serde_json::Map::new();
        for key in ROOT_FOLDER_KEYS {
            if let Some(value) = section.remove(*key) {
                folder_keys.insert((*key).to_string(), value);
            }
        }

        let options = serde_json::from_value(Value::Object(section)).map_err(D::Error::custom)?;
        let root_folders =
            serde_json::from_value(Value::Object(folder_keys)).map_err(D::Error::custom)?;
        Ok(Self {
            options,
            root_folders,
        })
    }
}

impl MediaManagementSettings {
    pub fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        if self.options.minimum_free_space < 100 {
            errors.push(Invalid::new(
                format!("{tree}.minimum_free_space"),
                "must be at least 100 MB",
            ));
        }
        if self.root_folders.root_folders.iter().any(|path| path.trim().is_empty()) {
            errors.push(Invalid::new(
                format!("{tree}.root_folders"),
                "paths must not be empty",
            ));
        }
    }

    fn root_folder_collection(&self) -> Collection<'_> {
        let quality = self.root_folders.root_folder_quality_profile_id;
        let metadata = self.root_folders.root_folder_metadata_profile_id;
        Collection::new(ROOT_FOLDERS, "path").create_with(move |path| {
            json!({
                "path": path,
                "name": path,
                "defaultQualityProfileId": quality,
                "defaultMetadataProfileId": metadata,
            })
        })
    }
}

impl SettingsGroup for MediaManagementSettings {
    fn from_remote(api: &dyn ApiClient) -> reconcile::Result<Self> {
        let naming = reconcile::decode(NAMING, &api.get(NAMING_CONFIG)?)?;
        let mut fields = reconcile::decode(MEDIA_MANAGEMENT, &api.get(MEDIA_MANAGEMENT_CONFIG)?)?;
        fields.extend(naming);

        let root_folders = Collection::new(ROOT_FOLDERS, "path").names(api)?;

        Ok(Self {
            options: Declared::all(reconcile::mapping::from_fields(fields)?),
            root_folders: RootFolders {
                root_folders,
                ..RootFolders::default()
            },
        })
    }

    fn update_remote(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        remote: &Self,
        check_unmanaged: bool,
    ) -> reconcile::Result<bool> {
        let resolver = Resolver::new(ctx.sink()).check_unmanaged(check_unmanaged);

        let mut orchestrator = Orchestrator::new();
        orchestrator.stage(
            Endpoint::config(NAMING_CONFIG),
            resolver.resolve(tree, &self.options, remote.options.value(), NAMING)?,
        );
        orchestrator.stage(
            Endpoint::config(MEDIA_MANAGEMENT_CONFIG),
            resolver.resolve(tree, &self.options, remote.options.value(), MEDIA_MANAGEMENT)?,
        );
        let options_changed = orchestrator.commit(ctx)?;

        let folders_changed = self.root_folder_collection().create_missing(
            &format!("{tree}.root_folders"),
            ctx,
            &self.root_folders.root_folders,
        )?;

        Ok(options_changed || folders_changed)
    }

    fn delete_remote(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        _remote: &Self,
    ) -> reconcile::Result<bool> {
        self.root_folder_collection().prune(
            &format!("{tree}.root_folders"),
            ctx,
            &self.root_folders.root_folders,
            Prune::from_flag(self.root_folders.delete_unmanaged_root_folders),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::api::Method;
    use reconcile::{MockApi, RecordingSink};

    const TREE: &str = "lidarr.settings.media_management";

    fn api() -> MockApi {
        MockApi::new()
            .with_resource(
                NAMING_CONFIG,
                json!({"id": 1, "renameTracks": false, "standardTrackFormat": "{Track Title}"}),
            )
            .with_resource(
                MEDIA_MANAGEMENT_CONFIG,
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
                    "extraFileExtensions": "srt",
                }),
            )
            .with_resource(
                ROOT_FOLDERS,
                json!([
                    {"id": 1, "path": "/music", "name": "/music"},
                    {"id": 2, "path": "/old", "name": "/old"},
                ]),
            )
    }

    fn local(toml_text: &str) -> MediaManagementSettings {
        toml::from_str(toml_text).unwrap()
    }

    #[test]
    fn test_from_remote() {
        let remote = MediaManagementSettings::from_remote(&api()).unwrap();
        assert!(!remote.options.rename_tracks);
        assert_eq!(remote.options.chmod_folder, ChmodFolder::DrwxrXrX);
        assert_eq!(remote.options.recycling_bin, None);
        assert_eq!(
            remote.root_folders.root_folders,
            ["/music", "/old"]
                .into_iter()
                .map(String::from)
                .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_section_splits_options_and_root_folders() {
        let settings = local(
            "rename_tracks = true\nroot_folders = [\"/music\"]\nroot_folder_quality_profile_id = 3\n",
        );
        assert!(settings.options.is_declared("rename_tracks"));
        assert!(!settings.options.is_declared("root_folders"));
        assert_eq!(settings.root_folders.root_folder_quality_profile_id, 3);
        assert_eq!(settings.root_folders.root_folder_metadata_profile_id, 1);
    }

    #[test]
    fn test_independent_endpoints_get_independent_writes() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let remote = MediaManagementSettings::from_remote(&api).unwrap();
        api.clear_calls();

        let changed = local("rename_tracks = true\n")
            .update_remote(TREE, &ctx, &remote, false)
            .unwrap();

        assert!(changed);
        let writes = api.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, "/api/v1/config/naming/1");
        assert_eq!(
            writes[0].body,
            Some(json!({"id": 1, "renameTracks": true, "standardTrackFormat": "{Track Title}"}))
        );
    }

    #[test]
    fn test_media_management_codecs() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let remote = MediaManagementSettings::from_remote(&api).unwrap();

        local(
            "chmod_folder = \"drwxrwxr-x\"\npropers_and_repacks = \"do-not-upgrade-automatically\"\nrecycling_bin = \"/recycle\"\n",
        )
        .update_remote(TREE, &ctx, &remote, false)
        .unwrap();

        let put = api
            .writes()
            .into_iter()
            .find(|c| c.path == "/api/v1/config/mediamanagement/1")
            .unwrap();
        let body = put.body.unwrap();
        assert_eq!(body["chmodFolder"], "775");
        assert_eq!(body["downloadPropersAndRepacks"], "doNotUpgrade");
        assert_eq!(body["recycleBin"], "/recycle");
        assert_eq!(body["chownGroup"], "");
        assert_eq!(body["extraFileExtensions"], "srt");
    }

    #[test]
    fn test_chmod_spellings() {
        let settings = local("chmod_folder = \"770\"\n");
        assert_eq!(settings.options.chmod_folder, ChmodFolder::Drwxrwx);

        let settings = local("chmod_folder = 0o775\n");
        assert_eq!(settings.options.chmod_folder, ChmodFolder::DrwxrwxrX);

        let settings = local("chmod_folder = \"drwxr-x---\"\n");
        assert_eq!(settings.options.chmod_folder, ChmodFolder::DrwxrX);
        assert_eq!(
            serde_json::to_value(settings.options.chmod_folder).unwrap(),
            json!("drwxr-x---")
        );

        let result: Result<MediaManagementSettings, _> = toml::from_str("chmod_folder = 0o644\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_root_folder_created_with_profiles() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let remote = MediaManagementSettings::from_remote(&api).unwrap();

        let changed = local(
            "root_folders = [\"/music\", \"/audiobooks\"]\nroot_folder_metadata_profile_id = 2\n",
        )
        .update_remote(TREE, &ctx, &remote, false)
        .unwrap();

        assert!(changed);
        let post = &api.writes()[0];
        assert_eq!(post.method, Method::Post);
        assert_eq!(
            post.body,
            Some(json!({
                "path": "/audiobooks",
                "name": "/audiobooks",
                "defaultQualityProfileId": 1,
                "defaultMetadataProfileId": 2,
            }))
        );
        assert_eq!(
            sink.info_lines(),
            vec!["lidarr.settings.media_management.root_folders[0]: '/audiobooks' -> (created)"]
        );
    }

    #[test]
    fn test_delete_phase_respects_flag() {
        let api = api();
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let remote = MediaManagementSettings::from_remote(&api).unwrap();

        let keep = local("root_folders = [\"/music\"]\n");
        assert!(!keep.delete_remote(TREE, &ctx, &remote).unwrap());
        assert!(api.writes().is_empty());

        let delete = local("root_folders = [\"/music\"]\ndelete_unmanaged_root_folders = true\n");
        assert!(delete.delete_remote(TREE, &ctx, &remote).unwrap());
        let writes = api.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].method, Method::Delete);
        assert_eq!(writes[0].path, "/api/v1/rootfolder/2");
    }

    #[test]
    fn test_validate() {
        let settings = local("minimum_free_space = 50\nroot_folders = [\"\"]\n");
        let mut errors = Vec::new();
        settings.validate(TREE, &mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<MediaManagementSettings, _> = toml::from_str("rename_episodes = true\n");
        assert!(result.is_err());
    }
}
