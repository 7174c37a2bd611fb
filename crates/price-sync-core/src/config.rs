use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::parser::ParseRules;
use crate::rate::RateScale;

/// A model-definition file and the channel type its prices belong to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSource {
    pub name: String,
    pub channel_type: i64,
}

/// Unit names routed into entry fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UnitRules {
    pub input: String,
    pub output: String,
    /// Unit name -> `extra_ratios` key.
    pub extra: BTreeMap<String, String>,
    /// Unit name -> second `extra_ratios` key written with the same ratio,
    /// for readers of older price files.
    pub legacy_aliases: BTreeMap<String, String>,
}

impl Default for UnitRules {
    fn default() -> Self {
        let extra = [
            ("textInput_cacheRead", "cached_read_tokens"),
            ("textInput_cacheWrite", "cached_write_tokens"),
            ("audioInput", "input_audio_tokens"),
            ("audioOutput", "output_audio_tokens"),
            ("reasoning", "reasoning_tokens"),
        ];
        Self {
            input: "textInput".to_string(),
            output: "textOutput".to_string(),
            extra: extra
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            legacy_aliases: BTreeMap::from([(
                "textInput_cacheRead".to_string(),
                "cached_tokens".to_string(),
            )]),
        }
    }
}

pub fn default_skip_types() -> BTreeSet<String> {
    ["image", "tts", "stt", "realtime"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_output() -> PathBuf {
    PathBuf::from("prices/prices.json")
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// URL of one provider's model definitions; `{provider}` is substituted.
    pub source_url_template: String,
    pub baseline_url: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub rates: RateScale,
    #[serde(default)]
    pub units: UnitRules,
    #[serde(default = "default_skip_types")]
    pub skip_types: BTreeSet<String>,
    pub providers: Vec<ProviderSource>,
}

impl SyncConfig {
    pub fn parse_rules(&self) -> ParseRules {
        ParseRules {
            units: self.units.clone(),
            skip_types: self.skip_types.clone(),
            scale: self.rates,
        }
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderSource> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Source URL for one provider, name percent-encoded.
    #[cfg(feature = "network")]
    pub fn source_url(&self, provider: &str) -> String {
        self.source_url_template
            .replace("{provider}", &urlencoding::encode(provider))
    }

    fn validate(&self) -> Result<()> {
        if !self.source_url_template.contains("{provider}") {
            return Err(SyncError::Config(
                "source_url_template must contain {provider}".into(),
            ));
        }
        if self.providers.is_empty() {
            return Err(SyncError::Config("no providers configured".into()));
        }
        let mut seen = HashSet::new();
        for p in &self.providers {
            if !seen.insert(p.name.as_str()) {
                return Err(SyncError::Config(format!("duplicate provider: {}", p.name)));
            }
        }
        for (name, value) in [
            ("rates.cny_per_usd", self.rates.cny_per_usd),
            ("rates.dollar_rate", self.rates.dollar_rate),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SyncError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }
}

/// Parse and validate a config from TOML.
pub fn parse_config(toml_str: &str) -> Result<SyncConfig> {
    let config: SyncConfig =
        toml::from_str(toml_str).map_err(|e| SyncError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<SyncConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SyncError::Io(format!("{}: {e}", path.display())))?;
    parse_config(&content)
}

/// The config shipped in `data/sync.toml`.
pub fn load_bundled_config() -> Result<SyncConfig> {
    parse_config(include_str!("../../../data/sync.toml"))
}

/// Path of the per-user config file, whether or not it exists.
#[cfg(feature = "network")]
pub fn user_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("price-sync").join("config.toml"))
}

/// Explicit path if given, else the user config if present, else bundled.
#[cfg(feature = "network")]
pub fn resolve_config(explicit: Option<&Path>) -> Result<SyncConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    if let Some(path) = user_config_path().filter(|p| p.exists()) {
        tracing::debug!(path = %path.display(), "using user config");
        return load_config(&path);
    }
    load_bundled_config()
}
