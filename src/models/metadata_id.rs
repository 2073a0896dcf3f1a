use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Link to the same resource on an external metadata database, keyed by the
/// provider name in the enclosing `external_id` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataId {
    pub data_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl MetadataId {
    pub fn new(data_id: impl ToString) -> Self {
        Self {
            data_id: data_id.to_string(),
            link: None,
        }
    }

    pub fn with_link(data_id: impl ToString, link: impl ToString) -> Self {
        Self {
            data_id: data_id.to_string(),
            link: Some(link.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeId {
    pub serie_id: String,
    pub season: Option<u32>,
    pub episode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonId {
    pub serie_id: String,
    pub season: u32,
}

/// Identifier attached to an [`crate::models::entry::Entry`], either a plain
/// id or an episode coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Episode(EpisodeId),
    Metadata(MetadataId),
}

/// Union of two external id maps.
///
/// Keys are unioned. When both sides know a provider, the right-hand side's
/// `data_id` wins and a missing `link` is backfilled from the other side, so
/// the merge is commutative in keys but right-biased in values.
pub fn merge_external_ids(
    left: HashMap<String, MetadataId>,
    right: HashMap<String, MetadataId>,
) -> HashMap<String, MetadataId> {
    let mut out = left;
    for (provider, mut id) in right {
        if let Some(existing) = out.remove(&provider) {
            if id.link.is_none() {
                id.link = existing.link;
            }
        }
        out.insert(provider, id);
    }
    out
}

/// Flatten an external id map to the `provider -> data_id` shape the provider
/// lookups consume.
pub fn id_map(ids: &HashMap<String, MetadataId>) -> HashMap<String, String> {
    ids.iter()
        .map(|(provider, id)| (provider.clone(), id.data_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entries: &[(&str, &str, Option<&str>)]) -> HashMap<String, MetadataId> {
        entries
            .iter()
            .map(|(provider, id, link)| {
                (
                    provider.to_string(),
                    MetadataId {
                        data_id: id.to_string(),
                        link: link.map(str::to_string),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn merge_unions_keys() {
        let left = ids(&[("themoviedatabase", "1", None)]);
        let right = ids(&[("tvdb", "2", None)]);
        let merged = merge_external_ids(left.clone(), right.clone());
        assert_eq!(merged.len(), 2);
        // key union does not depend on the merge order
        let flipped = merge_external_ids(right, left);
        assert_eq!(
            merged.keys().collect::<std::collections::BTreeSet<_>>(),
            flipped.keys().collect::<std::collections::BTreeSet<_>>()
        );
    }

    #[test]
    fn merge_is_right_biased_on_data_id() {
        let left = ids(&[("tvdb", "old", Some("http://left"))]);
        let right = ids(&[("tvdb", "new", None)]);
        let merged = merge_external_ids(left, right);
        let id = &merged["tvdb"];
        assert_eq!(id.data_id, "new");
        // missing link backfilled from the losing side
        assert_eq!(id.link.as_deref(), Some("http://left"));
    }
}
