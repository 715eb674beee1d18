//! esummary documents → summary items, linked ids and merged records.

use std::collections::HashMap;

use pubminer_common::{PubMinerError, Result, Stage};
use serde_json::{Map, Value};
use tracing::debug;

use super::{scalar_string, shape_name};
use crate::models::{LinkedIdMap, MergedRecord, SummaryItem};

/// Which identifier of a [`SummaryItem`] keys the side dataset in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeKey {
    #[default]
    Uid,
    LinkedId,
}

/// Map every `uid` of an esummary document to its alternate id of type `id_type`.
///
/// Total: records that are missing, malformed or without a matching id are
/// simply left out of the map.
pub fn extract_linked_ids(doc: &Value, id_type: &str) -> LinkedIdMap {
    let mut linked = LinkedIdMap::new();
    let Some(result) = doc.get("result") else {
        return linked;
    };
    let Some(uids) = result.get("uids").and_then(Value::as_array) else {
        return linked;
    };

    for uid in uids.iter().filter_map(scalar_string) {
        let value = result
            .get(&uid)
            .and_then(|record| record.get("articleids"))
            .and_then(Value::as_array)
            .and_then(|ids| {
                ids.iter()
                    .find(|id| id.get("idtype").and_then(Value::as_str) == Some(id_type))
            })
            .and_then(|id| id.get("value"))
            .and_then(scalar_string)
            .filter(|v| !v.is_empty());

        if let Some(value) = value {
            linked.insert(uid, value);
        }
    }
    linked
}

/// Flatten an esummary document into [`SummaryItem`]s, keeping the order of `result.uids`.
pub fn extract_summary_items(doc: &Value, id_type: &str) -> Result<Vec<SummaryItem>> {
    let invalid = |context: String, reason: String| {
        PubMinerError::invalid_document(Stage::Summary, context, reason)
    };

    let Some(result) = doc.get("result") else {
        // esummary answers an empty stored set with a message instead of a result
        if let Some(messages) = doc.get("esummaryresult").and_then(Value::as_array) {
            let text: Vec<String> = messages.iter().filter_map(scalar_string).collect();
            if text.iter().any(|m| m.starts_with("Empty result")) {
                debug!("esummary reported an empty result set");
                return Ok(Vec::new());
            }
            return Err(invalid("result".into(), format!("upstream error: {}", text.join("; "))));
        }
        return Err(invalid("result".into(), "result missing".into()));
    };

    let uids = result
        .get("uids")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("result".into(), "result.uids missing".into()))?;

    let linked = extract_linked_ids(doc, id_type);

    uids.iter()
        .map(|uid| {
            let uid = scalar_string(uid).ok_or_else(|| {
                invalid("result.uids".into(), format!("uid is a {}", shape_name(uid)))
            })?;
            let record = result
                .get(&uid)
                .filter(|r| r.is_object())
                .ok_or_else(|| invalid(format!("uid={uid}"), "no summary record".into()))?;

            Ok(SummaryItem {
                title: text_field(record, "title"),
                authors: author_names(record),
                pubdate: text_field(record, "pubdate"),
                linked_id: linked.get(&uid).cloned(),
                uid,
            })
        })
        .collect()
}

fn text_field(record: &Value, field: &str) -> String {
    record.get(field).and_then(scalar_string).unwrap_or_default()
}

fn author_names(record: &Value) -> Vec<String> {
    record
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| match a {
                    Value::String(name) => Some(name.clone()),
                    other => other.get("name").and_then(scalar_string),
                })
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Left-join a side dataset onto summary items.
///
/// Items without a side entry merge with no extra fields; output order follows
/// `items`. Side fields are expected not to collide with item fields; if they do,
/// the side value wins.
pub fn merge_side_dataset(
    items: &[SummaryItem],
    side: &HashMap<String, Map<String, Value>>,
    key: MergeKey,
) -> Vec<MergedRecord> {
    items
        .iter()
        .map(|item| {
            let id = match key {
                MergeKey::Uid => Some(item.uid.as_str()),
                MergeKey::LinkedId => item.linked_id.as_deref(),
            };
            let extra = id.and_then(|id| side.get(id)).cloned().unwrap_or_default();
            if let Some(field) = extra.keys().find(|k| is_item_field(k)) {
                debug!(uid = %item.uid, field = %field, "side dataset overrides a summary field");
            }
            MergedRecord { item: item.clone(), side: extra }
        })
        .collect()
}

fn is_item_field(key: &str) -> bool {
    matches!(key, "uid" | "title" | "authors" | "pubdate" | "linkedId")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pubminer_common::ErrorKind;
    use serde_json::json;

    fn esummary() -> Value {
        json!({
            "header": {"type": "esummary", "version": "0.3"},
            "result": {
                "uids": ["5858162", "6012345"],
                "5858162": {
                    "uid": "5858162",
                    "title": "Inhaled corticosteroids in childhood asthma",
                    "pubdate": "2018 Mar 14",
                    "authors": [
                        {"name": "Doe J", "authtype": "Author"},
                        {"name": "Roe R", "authtype": "Author"}
                    ],
                    "articleids": [
                        {"idtype": "pmid", "value": "29547123"},
                        {"idtype": "doi", "value": "10.1000/xyz"},
                        {"idtype": "pmcid", "value": "PMC5858162"}
                    ]
                },
                "6012345": {
                    "uid": "6012345",
                    "title": "Second",
                    "pubdate": "2019",
                    "authors": [],
                    "articleids": [{"idtype": "pmcid", "value": "PMC6012345"}]
                }
            }
        })
    }

    #[test]
    fn test_linked_ids_omit_records_without_match() {
        let doc = json!({
            "result": {
                "uids": ["A", "B"],
                "A": {"articleids": [{"idtype": "pmid", "value": "111"}]},
                "B": {"articleids": [{"idtype": "doi", "value": "10.1/b"}]}
            }
        });
        let linked = extract_linked_ids(&doc, "pmid");
        assert_eq!(linked, LinkedIdMap::from([("A".to_string(), "111".to_string())]));
    }

    #[test]
    fn test_linked_ids_tolerate_broken_records() {
        let doc = json!({
            "result": {
                "uids": ["A", "B", "C", 4],
                "A": {"articleids": "nope"},
                "C": {"articleids": [{"idtype": "pmid"}]},
                "4": {"articleids": [{"idtype": "pmid", "value": 44}]}
            }
        });
        let linked = extract_linked_ids(&doc, "pmid");
        assert_eq!(linked, LinkedIdMap::from([("4".to_string(), "44".to_string())]));
        assert!(extract_linked_ids(&json!({}), "pmid").is_empty());
        assert!(extract_linked_ids(&json!({"result": {}}), "pmid").is_empty());
    }

    #[test]
    fn test_linked_id_keys_are_subset_of_uids() {
        let doc = esummary();
        let uids: Vec<String> = doc["result"]["uids"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u.as_str().unwrap().to_string())
            .collect();
        for key in extract_linked_ids(&doc, "pmcid").keys() {
            assert!(uids.contains(key));
        }
    }

    #[test]
    fn test_summary_items_keep_order_and_linked_id() {
        let items = extract_summary_items(&esummary(), "pmid").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            SummaryItem {
                uid: "5858162".into(),
                title: "Inhaled corticosteroids in childhood asthma".into(),
                authors: vec!["Doe J".into(), "Roe R".into()],
                pubdate: "2018 Mar 14".into(),
                linked_id: Some("29547123".into()),
            }
        );
        assert_eq!(items[1].uid, "6012345");
        assert_eq!(items[1].linked_id, None);
    }

    #[test]
    fn test_summary_uid_without_record_is_invalid() {
        let doc = json!({"result": {"uids": ["1", "2"], "1": {"title": "t"}}});
        let err = extract_summary_items(&doc, "pmid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDocumentFormat);
        assert!(err.to_string().contains("uid=2"));
    }

    #[test]
    fn test_summary_without_uids_is_invalid() {
        assert!(extract_summary_items(&json!({"result": {}}), "pmid").is_err());
        assert!(extract_summary_items(&json!({}), "pmid").is_err());
    }

    #[test]
    fn test_summary_empty_result_message_is_empty_list() {
        let doc = json!({"esummaryresult": ["Empty result - nothing to do"]});
        assert!(extract_summary_items(&doc, "pmid").unwrap().is_empty());

        let doc = json!({"esummaryresult": ["Invalid query_key"]});
        let err = extract_summary_items(&doc, "pmid").unwrap_err();
        assert!(err.to_string().contains("Invalid query_key"));
    }

    #[test]
    fn test_merge_left_joins_and_keeps_order() {
        let items = extract_summary_items(&esummary(), "pmid").unwrap();
        let mut demo = Map::new();
        demo.insert("sentences".into(), json!(["120 adults with asthma"]));
        let side = HashMap::from([("6012345".to_string(), demo)]);

        let merged = merge_side_dataset(&items, &side, MergeKey::Uid);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].item.uid, "5858162");
        assert!(merged[0].side.is_empty());
        assert_eq!(merged[1].side["sentences"], json!(["120 adults with asthma"]));
    }

    #[test]
    fn test_merge_by_linked_id() {
        let items = extract_summary_items(&esummary(), "pmid").unwrap();
        let mut demo = Map::new();
        demo.insert("tables".into(), json!(1));
        let side = HashMap::from([("29547123".to_string(), demo)]);

        let merged = merge_side_dataset(&items, &side, MergeKey::LinkedId);
        assert_eq!(merged[0].side["tables"], json!(1));
        assert!(merged[1].side.is_empty());
    }
}
