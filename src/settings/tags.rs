//! Tag definitions. Tags are only ever created here; Lidarr removes unused
//! tags on its own.

use super::Invalid;
use reconcile::{ApiClient, ApplyContext, Collection, Prune, SettingsGroup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TAGS: &str = "/api/v1/tag";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagsSettings {
    /// Tags that must exist on the instance
    pub definitions: BTreeSet<String>,
}

impl TagsSettings {
    pub fn validate(&self, tree: &str, errors: &mut Vec<Invalid>) {
        if self.definitions.iter().any(|tag| tag.trim().is_empty()) {
            errors.push(Invalid::new(
                format!("{tree}.definitions"),
                "tag names must not be empty",
            ));
        }
    }
}

fn collection() -> Collection<'static> {
    Collection::new(TAGS, "label")
}

impl SettingsGroup for TagsSettings {
    fn from_remote(api: &dyn ApiClient) -> reconcile::Result<Self> {
        let definitions = collection().names(api)?;
        Ok(Self { definitions })
    }

    fn update_remote(
        &self,
        tree: &str,
        ctx: &ApplyContext<'_>,
        _remote: &Self,
        _check_unmanaged: bool,
    ) -> reconcile::Result<bool> {
        collection().reconcile(
            &format!("{tree}.definitions"),
            ctx,
            &self.definitions,
            Prune::Never,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::api::Method;
    use reconcile::{MockApi, RecordingSink};
    use serde_json::json;

    const TREE: &str = "lidarr.settings.tags";

    #[test]
    fn test_creates_missing_tags_in_order() {
        let api = MockApi::new().with_resource(TAGS, json!([{"id": 1, "label": "flac"}]));
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let remote = TagsSettings::from_remote(&api).unwrap();

        let local: TagsSettings =
            toml::from_str("definitions = [\"vinyl\", \"flac\", \"bootleg\"]\n").unwrap();
        assert!(local.update_remote(TREE, &ctx, &remote, false).unwrap());

        let labels: Vec<String> = api
            .writes()
            .iter()
            .filter(|c| c.method == Method::Post)
            .map(|c| c.body.as_ref().unwrap()["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["bootleg", "vinyl"]);
        assert_eq!(
            sink.info_lines(),
            vec![
                "lidarr.settings.tags.definitions[0]: 'bootleg' -> (created)",
                "lidarr.settings.tags.definitions[2]: 'vinyl' -> (created)",
            ]
        );
    }

    #[test]
    fn test_unlisted_tags_are_never_deleted() {
        let api = MockApi::new().with_resource(TAGS, json!([{"id": 1, "label": "old"}]));
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);
        let remote = TagsSettings::from_remote(&api).unwrap();

        let local = TagsSettings::default();
        assert!(!local.update_remote(TREE, &ctx, &remote, true).unwrap());
        assert!(!local.delete_remote(TREE, &ctx, &remote).unwrap());
        assert!(api.writes().is_empty());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_tag_without_label_is_invalid() {
        let api =
            MockApi::new().with_resource(TAGS, json!([{"id": 1, "label": "flac"}, {"id": 2}]));

        let err = TagsSettings::from_remote(&api).unwrap_err();
        assert!(matches!(err, reconcile::Error::InvalidResponse(_)));
    }

    #[test]
    fn test_post_failure_propagates() {
        let api = MockApi::new().with_resource(TAGS, json!([]));
        api.fail_after(Method::Post, TAGS, 1, 503);
        let sink = RecordingSink::new();
        let ctx = ApplyContext::new(&api, &sink, false);

        let local: TagsSettings = toml::from_str("definitions = [\"a\", \"b\", \"c\"]\n").unwrap();
        let err = local
            .update_remote(TREE, &ctx, &TagsSettings::default(), false)
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(api.resource(TAGS).unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_validate_rejects_blank_tags() {
        let local: TagsSettings = toml::from_str("definitions = [\" \"]\n").unwrap();
        let mut errors = Vec::new();
        local.validate(TREE, &mut errors);
        assert_eq!(errors.len(), 1);
    }
}
