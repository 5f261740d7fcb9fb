use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Key name the `toml` crate uses internally when driving a datetime value
/// through a generic serde visitor.
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// Closed union over everything a config value can be. Object entries keep
/// document insertion order, which is why this is not a plain map type.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ConfigValue>),
    Object(Vec<(String, ConfigValue)>),
}

impl ConfigValue {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self {
            Self::Object(entries) => entries
                .iter()
                .find(|(entry_key, _)| entry_key == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Number(value) => value.serialize(serializer),
            Self::String(value) => serializer.serialize_str(value),
            Self::Array(items) => {
                let mut sequence = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    sequence.serialize_element(item)?;
                }
                sequence.end()
            }
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ConfigValueVisitor;

        impl<'de> Visitor<'de> for ConfigValueVisitor {
            type Value = ConfigValue;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("any config value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(ConfigValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(ConfigValue::Number(serde_json::Number::from(value)))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                Ok(ConfigValue::Number(serde_json::Number::from(value)))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                serde_json::Number::from_f64(value)
                    .map(ConfigValue::Number)
                    .ok_or_else(|| E::custom("non-finite numbers are not representable"))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(ConfigValue::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(ConfigValue::String(value))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(ConfigValue::Null)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(ConfigValue::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                ConfigValue::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut sequence: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = sequence.next_element::<ConfigValue>()? {
                    items.push(item);
                }
                Ok(ConfigValue::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, ConfigValue)> = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, ConfigValue>()? {
                    entries.push((key, value));
                }

                if let [(key, ConfigValue::String(datetime))] = entries.as_slice() {
                    if key == TOML_DATETIME_KEY {
                        return Ok(ConfigValue::String(datetime.clone()));
                    }
                }

                Ok(ConfigValue::Object(entries))
            }
        }

        deserializer.deserialize_any(ConfigValueVisitor)
    }
}

/// One entry of a structural diff. `value: None` means the path exists in
/// the before-tree only and should be removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueDiff {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConfigValue>,
}

/// Recursively compares two value trees and emits one diff entry per leaf
/// whose value differs, plus one per key/element present on only one side.
/// Matching subtrees emit nothing.
pub fn diff_values(before: &ConfigValue, after: &ConfigValue) -> Vec<ValueDiff> {
    let mut diffs = Vec::new();
    diff_into(before, after, "", &mut diffs);
    diffs
}

fn diff_into(before: &ConfigValue, after: &ConfigValue, prefix: &str, diffs: &mut Vec<ValueDiff>) {
    match (before, after) {
        (ConfigValue::Object(before_entries), ConfigValue::Object(after_entries)) => {
            for (key, after_value) in after_entries {
                let child_path = join_key(prefix, key);
                match before.get(key) {
                    Some(before_value) => {
                        diff_into(before_value, after_value, &child_path, diffs);
                    }
                    None => diffs.push(ValueDiff {
                        path: child_path,
                        value: Some(after_value.clone()),
                    }),
                }
            }
            for (key, _) in before_entries {
                if after.get(key).is_none() {
                    diffs.push(ValueDiff {
                        path: join_key(prefix, key),
                        value: None,
                    });
                }
            }
        }
        (ConfigValue::Array(before_items), ConfigValue::Array(after_items)) => {
            let shared = before_items.len().min(after_items.len());
            for index in 0..shared {
                diff_into(
                    &before_items[index],
                    &after_items[index],
                    &join_index(prefix, index),
                    diffs,
                );
            }
            for (index, item) in after_items.iter().enumerate().skip(shared) {
                diffs.push(ValueDiff {
                    path: join_index(prefix, index),
                    value: Some(item.clone()),
                });
            }
            for index in shared..before_items.len() {
                diffs.push(ValueDiff {
                    path: join_index(prefix, index),
                    value: None,
                });
            }
        }
        (before_value, after_value) => {
            if before_value != after_value {
                diffs.push(ValueDiff {
                    path: prefix.to_string(),
                    value: Some(after_value.clone()),
                });
            }
        }
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn join_index(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

#[cfg(test)]
mod tests {
    use super::{ConfigValue, ValueDiff, diff_values};

    fn parse(text: &str) -> ConfigValue {
        serde_json::from_str(text).expect("test value should parse")
    }

    #[test]
    fn deserialized_objects_keep_document_key_order() {
        let value = parse(r#"{"zulu": 1, "alpha": 2, "mike": 3}"#);
        match value {
            ConfigValue::Object(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
                assert_eq!(keys, vec!["zulu", "alpha", "mike"]);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn serialization_round_trips_through_serde_json() {
        let original = parse(r#"{"a": [1, 2.5, "x"], "b": {"nested": null, "flag": true}}"#);
        let serialized = serde_json::to_string(&original).expect("value should serialize");
        assert_eq!(parse(&serialized), original);
    }

    #[test]
    fn diff_emits_one_entry_per_changed_leaf() {
        let before = parse(r#"{"a": {"b": 1, "c": 2}, "d": "same"}"#);
        let after = parse(r#"{"a": {"b": 10, "c": 2}, "d": "same"}"#);

        let diffs = diff_values(&before, &after);
        assert_eq!(
            diffs,
            vec![ValueDiff {
                path: "a.b".to_string(),
                value: Some(parse("10")),
            }]
        );
    }

    #[test]
    fn diff_reports_added_and_removed_keys() {
        let before = parse(r#"{"keep": 1, "drop": 2}"#);
        let after = parse(r#"{"keep": 1, "add": 3}"#);

        let diffs = diff_values(&before, &after);
        assert!(diffs.contains(&ValueDiff {
            path: "add".to_string(),
            value: Some(parse("3")),
        }));
        assert!(diffs.contains(&ValueDiff {
            path: "drop".to_string(),
            value: None,
        }));
        assert_eq!(diffs.len(), 2);
    }

    #[test]
    fn diff_walks_array_elements_by_index() {
        let before = parse(r#"{"list": [1, 2, 3]}"#);
        let after = parse(r#"{"list": [1, 99, 3, 4]}"#);

        let diffs = diff_values(&before, &after);
        assert_eq!(
            diffs,
            vec![
                ValueDiff {
                    path: "list[1]".to_string(),
                    value: Some(parse("99")),
                },
                ValueDiff {
                    path: "list[3]".to_string(),
                    value: Some(parse("4")),
                },
            ]
        );
    }

    #[test]
    fn diff_replaces_whole_subtree_on_type_change() {
        let before = parse(r#"{"setting": {"a": 1}}"#);
        let after = parse(r#"{"setting": 5}"#);

        let diffs = diff_values(&before, &after);
        assert_eq!(
            diffs,
            vec![ValueDiff {
                path: "setting".to_string(),
                value: Some(parse("5")),
            }]
        );
    }

    #[test]
    fn identical_trees_diff_to_nothing() {
        let value = parse(r#"{"a": [1, {"b": null}], "c": false}"#);
        assert!(diff_values(&value, &value).is_empty());
    }
}
