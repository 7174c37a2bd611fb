use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Price type of every entry produced from model definitions.
pub const TOKENS_TYPE: &str = "tokens";

/// Identity of a price entry across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PriceKey {
    pub model: String,
    pub channel_type: i64,
}

impl PriceKey {
    pub fn new(model: impl Into<String>, channel_type: i64) -> Self {
        Self {
            model: model.into(),
            channel_type,
        }
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.model, self.channel_type)
    }
}

/// One row of the merged price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPriceEntry {
    pub model: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub channel_type: i64,
    pub input: f64,
    pub output: f64,
    #[serde(default, skip_serializing_if = "ExtraRatios::is_empty")]
    pub extra_ratios: ExtraRatios,
}

impl ModelPriceEntry {
    pub fn key(&self) -> PriceKey {
        PriceKey::new(self.model.clone(), self.channel_type)
    }
}

/// Secondary ratios keyed by billing name, kept in insertion order.
///
/// Re-inserting a key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraRatios(Vec<(String, f64)>);

impl ExtraRatios {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn map_values(self, f: impl Fn(f64) -> f64) -> Self {
        Self(self.0.into_iter().map(|(k, v)| (k, f(v))).collect())
    }
}

impl Serialize for ExtraRatios {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtraRatios {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RatiosVisitor;

        impl<'de> Visitor<'de> for RatiosVisitor {
            type Value = ExtraRatios;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of ratio names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut ratios = ExtraRatios::new();
                while let Some((k, v)) = access.next_entry::<String, f64>()? {
                    ratios.insert(k, v);
                }
                Ok(ratios)
            }
        }

        deserializer.deserialize_map(RatiosVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_in_place() {
        let mut r = ExtraRatios::new();
        r.insert("cached_read_tokens", 0.5);
        r.insert("cached_tokens", 0.5);
        r.insert("cached_read_tokens", 0.25);
        let keys: Vec<_> = r.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["cached_read_tokens", "cached_tokens"]);
        assert_eq!(r.get("cached_read_tokens"), Some(0.25));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn serializes_in_field_order_without_empty_extras() {
        let entry = ModelPriceEntry {
            model: "gpt-4o".to_string(),
            kind: TOKENS_TYPE.to_string(),
            channel_type: 1,
            input: 1.25,
            output: 5.0,
            extra_ratios: ExtraRatios::new(),
        };
        let text = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            text,
            r#"{"model":"gpt-4o","type":"tokens","channel_type":1,"input":1.25,"output":5.0}"#
        );
    }

    #[test]
    fn round_trips_extra_ratios_order() {
        let value = json!({
            "model": "claude",
            "type": "tokens",
            "channel_type": 14,
            "input": 1.5,
            "output": 7.5,
            "extra_ratios": {"reasoning_tokens": 7.5, "cached_read_tokens": 0.15}
        });
        let entry: ModelPriceEntry = serde_json::from_value(value.clone()).unwrap();
        let keys: Vec<_> = entry.extra_ratios.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["reasoning_tokens", "cached_read_tokens"]);
        assert_eq!(serde_json::to_value(&entry).unwrap(), value);
    }

    #[test]
    fn key_display() {
        assert_eq!(PriceKey::new("m1", 25).to_string(), "m1@25");
    }
}
