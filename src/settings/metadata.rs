//! Metadata file outputs. Lidarr ships one entry per implementation in its
//! metadata list; these are toggled, never created or deleted.

use reconcile::{
    ApiClient, ApplyContext, Declared, Endpoint, FieldMapping, Orchestrator, Resolver,
    SettingsGroup, decode_into,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const METADATA: &str = "/api/v1/metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    KodiEmby,
    Roksbox,
    Wdtv,
}

impl Output {
    const ALL: [Self; 3] = [Self::KodiEmby, Self::Roksbox, Self::Wdtv];

    fn key(self) -> &'static str {
        match self {
            Self::KodiEmby => "kodi_emby",
            Self::Roksbox => "roksbox",
            Self::Wdtv => "wdtv",
        }
    }

    /// Value of the entry's `implementation` attribute.
    fn implementation(self) -> &'static str {
        match self {
            Self::KodiEmby => "XbmcMetadata",
            Self::Roksbox => "RoksboxMetadata",
            Self::Wdtv => "WdtvMetadata",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Self::KodiEmby => "Kodi (XBMC)/Emby",
            Self::Roksbox => "Roksbox",
            Self::Wdtv => "WDTV",
        }
    }

    fn endpoint(self) -> Endpoint {
        Endpoint::list_item(METADATA, "implementation", self.implementation())
    }

    fn find(self, listing: &[Value]) -> reconcile::Result<&Value> {
        listing
            .iter()
            .find(|entry| {
                entry.get("implementation").and_then(Value::as_str) == Some(self.implementation())
            })
            .ok_or_else(|| {
                reconcile::Error::invariant(format!(
                    "Unable to find {} metadata on Lidarr, database might be corrupt",
                    self.display_name()
                ))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataOutput {
    /// Write metadata files for this media server
    pub enable: bool,
}

const OUTPUT: &[FieldMapping] = &[FieldMapping::new("enable", "enable")];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataSettings {
    pub kodi_emby: Declared<MetadataOutput>,
    pub roksbox: Declared<MetadataOutput>,
    pub wdtv: Declared<MetadataOutput>,
}

impl MetadataSettings {
    fn output(&self, output: Output) -> &Declared<MetadataOutput> {
        match output {
            Output::KodiEmby => &self.kodi_emby,
            Output::Roksbox => &self.roksbox,
            Output::Wdtv => &self.wdtv,
        }
    }
}

impl SettingsGroup for MetadataSettings {
    fn from_remote(api: &dyn ApiClient) -> reconcile::Result<Self> {
        let listing = api.get(METADATA)?;
        let entries = listing.as_array().ok_or_else(|| {
            reconcile::Error::InvalidResponse(format!("expected a list from {METADATA}"))
        })?;

        let decode = |output: Output| -> reconcile::Result<Declared<MetadataOutput>> {
            Ok(Declared::all(decode_into(OUTPUT, output.find(entries)?)?))
        };
        Ok(Self {
            kodi_emby: decode(Output::KodiEmby)?,
            roksbox: decode(Output::Roksbox)?,
            wdtv: decode(Output::Wdtv)?,
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
        for output in Output::ALL {
            let resolution = resolver.resolve(
                &format!("{tree}.{}", output.key()),
                self.output(output),
                remote.output(output).value(),
                OUTPUT,
            )?;
            orchestrator.stage(output.endpoint(), resolution);
        }
        orchestrator.commit(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{MockApi, RecordingSink};
    use serde_json::json;

    const TREE: &str = "lidarr.settings.metadata";

    fn listing() -> Value {
        json!([
            {"id": 1, "implementation": "XbmcMetadata", "enable": false, "fields": [{"name": "artistMetadata", "value": true}]},
            {"id": 2, "implementation": "RoksboxMetadata", "enable": false, "fields": []},
            {"id": 3, "implementation": "WdtvMetadata", "enable": true, "fields": []},
        ])
    }

    #[test]
    fn test_from_remote() {
        let api = MockApi::new().with_resource(METADATA, listing());
        let remote = MetadataSettings::from_remote(&api).unwrap();
        assert!(!remote.kodi_emby.enable);
        assert!(remote.wdtv.enable);
    }

    #[test]
    fn test_missing_implementation_is_invariant_error() {
        let mut entries = listing();
        entries.as_array_mut().unwrap().remove(1);
        let api = MockApi::new().with_resource(METADATA, entries);

        let err = MetadataSettings::from_remote(&api).unwrap_err();
        assert!(matches!(err, reconcile::Error::Invariant(_)));
        assert_eq!(
            err.to_string(),
            "invariant violated: Unable to find Roksbox metadata on Lidarr, database might be corrupt"
        );
    }

    #[test]
    fn test_only_changed_outputs_are_written() {
        let api = MockApi::new().with_resource(METADATA, listing());
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let remote = MetadataSettings::from_remote(&api).unwrap();

        let local: MetadataSettings =
            toml::from_str("[kodi_emby]\nenable = true\n[wdtv]\nenable = true\n").unwrap();
        assert!(local.update_remote(TREE, &ctx, &remote, false).unwrap());

        let writes = api.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, "/api/v1/metadata/1");
        assert_eq!(
            writes[0].body,
            Some(json!({"id": 1, "implementation": "XbmcMetadata", "enable": true, "fields": [{"name": "artistMetadata", "value": true}]}))
        );
        assert_eq!(
            sink.info_lines(),
            vec!["lidarr.settings.metadata.kodi_emby.enable: false -> true"]
        );
    }
}
