//! Override-merge of freshly parsed prices onto a baseline price list.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::entry::{ModelPriceEntry, PriceKey};
use crate::error::{Result, SyncError};

/// A baseline row, kept verbatim.
///
/// `key` is `None` when the row's `model` is not a string or its
/// `channel_type` is not an integer; such rows never match a parsed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineEntry {
    pub key: Option<PriceKey>,
    pub raw: Value,
}

impl BaselineEntry {
    /// `model` is required; a missing `channel_type` reads as `0`.
    pub fn from_value(raw: Value) -> Result<Self> {
        let Some(model) = raw.get("model") else {
            return Err(SyncError::Baseline(format!("entry without model: {raw}")));
        };
        let channel_type = match raw.get("channel_type") {
            None | Some(Value::Null) => Some(0),
            Some(v) => v.as_i64(),
        };
        let key = match (model.as_str(), channel_type) {
            (Some(model), Some(channel_type)) => Some(PriceKey::new(model, channel_type)),
            _ => {
                tracing::warn!(row = %raw, "baseline row has no usable key, kept as-is");
                None
            }
        };
        Ok(Self { key, raw })
    }
}

/// Parse a baseline price list: a JSON array of objects.
pub fn parse_baseline(json: &str) -> Result<Vec<BaselineEntry>> {
    let value: Value = serde_json::from_str(json)?;
    baseline_from_value(value)
}

pub fn baseline_from_value(value: Value) -> Result<Vec<BaselineEntry>> {
    let Value::Array(items) = value else {
        return Err(SyncError::Baseline("expected a JSON array".into()));
    };
    items.into_iter().map(BaselineEntry::from_value).collect()
}

/// One row of a merged price list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PriceRecord {
    Parsed(ModelPriceEntry),
    Baseline(Value),
}

impl PriceRecord {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedCollection {
    pub records: Vec<PriceRecord>,
    #[serde(skip)]
    pub overridden: usize,
    #[serde(skip)]
    pub appended: usize,
}

impl MergedCollection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Two-space indented JSON; non-ASCII text is written as-is.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Replace the file at `path`, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::Io(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(path, self.to_json_pretty()?)
            .map_err(|e| SyncError::Io(format!("{}: {e}", path.display())))
    }
}

/// Collapse duplicate keys: the last value wins, at the first key's position.
pub fn dedup_fresh(fresh: Vec<ModelPriceEntry>) -> Vec<ModelPriceEntry> {
    let mut index: HashMap<PriceKey, usize> = HashMap::new();
    let mut unique: Vec<ModelPriceEntry> = Vec::with_capacity(fresh.len());

    for entry in fresh {
        let key = entry.key();
        if let Some(&i) = index.get(&key) {
            tracing::debug!(%key, "duplicate parsed key, later value kept");
            unique[i] = entry;
        } else {
            index.insert(key, unique.len());
            unique.push(entry);
        }
    }

    unique
}

/// Baseline order is kept; rows whose key was parsed are replaced whole.
/// Parsed rows with no baseline counterpart follow, in parsed order.
pub fn merge(baseline: Vec<BaselineEntry>, fresh: Vec<ModelPriceEntry>) -> MergedCollection {
    let fresh = dedup_fresh(fresh);
    let keys: Vec<PriceKey> = fresh.iter().map(ModelPriceEntry::key).collect();
    let lookup: HashMap<&PriceKey, &ModelPriceEntry> = keys.iter().zip(&fresh).collect();

    let mut merged = MergedCollection::default();
    let mut used: HashSet<&PriceKey> = HashSet::new();

    for base in baseline {
        match base.key.as_ref().and_then(|k| lookup.get_key_value(k)) {
            Some((&key, &entry)) => {
                tracing::debug!(%key, "baseline row overridden");
                merged.records.push(PriceRecord::Parsed(entry.clone()));
                merged.overridden += 1;
                used.insert(key);
            }
            None => merged.records.push(PriceRecord::Baseline(base.raw)),
        }
    }

    for (key, entry) in keys.iter().zip(&fresh) {
        if !used.contains(key) {
            merged.records.push(PriceRecord::Parsed(entry.clone()));
            merged.appended += 1;
        }
    }

    tracing::info!(
        total = merged.len(),
        overridden = merged.overridden,
        appended = merged.appended,
        "merged price list"
    );
    merged
}
