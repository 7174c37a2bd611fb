use std::path::Path;

use crate::cache;
use crate::config::SyncConfig;
use crate::entry::ModelPriceEntry;
use crate::error::{Result, SyncError};
use crate::fetch::{Fetched, SourceFetcher};
use crate::merge::{self, BaselineEntry, MergedCollection};
use crate::parser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Parsed { entries: usize, discarded: usize },
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReport {
    pub name: String,
    pub channel_type: i64,
    pub status: ProviderStatus,
}

/// Entries parsed from every reachable provider, in configured order.
#[derive(Debug, Clone, Default)]
pub struct FreshPrices {
    pub entries: Vec<ModelPriceEntry>,
    pub providers: Vec<ProviderReport>,
}

pub struct SyncReport {
    pub providers: Vec<ProviderReport>,
    pub fresh_count: usize,
    pub baseline_count: usize,
    pub merged: MergedCollection,
}

/// Fetch and parse each provider's model definitions. A provider that
/// cannot be fetched contributes nothing; the others still count.
pub async fn collect_fresh<F: SourceFetcher>(fetcher: &F, config: &SyncConfig) -> FreshPrices {
    let rules = config.parse_rules();
    let mut fresh = FreshPrices::default();

    for provider in &config.providers {
        let url = config.source_url(&provider.name);
        let status = match fetcher.fetch_text(&url).await {
            Ok(Fetched::Body(text)) => {
                let outcome = parser::parse_source(&text, provider.channel_type, &rules);
                tracing::info!(
                    provider = %provider.name,
                    entries = outcome.entries.len(),
                    discarded = outcome.discarded,
                    "parsed provider prices"
                );
                let status = ProviderStatus::Parsed {
                    entries: outcome.entries.len(),
                    discarded: outcome.discarded,
                };
                fresh.entries.extend(outcome.entries);
                status
            }
            Ok(Fetched::NotFound) => {
                tracing::info!(provider = %provider.name, %url, "no source file, skipping");
                ProviderStatus::NotFound
            }
            Err(e) => {
                tracing::warn!(provider = %provider.name, %url, error = %e, "fetch failed");
                ProviderStatus::Failed(e.to_string())
            }
        };
        fresh.providers.push(ProviderReport {
            name: provider.name.clone(),
            channel_type: provider.channel_type,
            status,
        });
    }

    fresh
}

/// Raw baseline text. Any failure here is fatal to the run.
pub async fn fetch_baseline<F: SourceFetcher>(fetcher: &F, url: &str) -> Result<String> {
    match fetcher.fetch_text(url).await? {
        Fetched::Body(text) => Ok(text),
        Fetched::NotFound => Err(SyncError::Baseline(format!("not found at {url}"))),
    }
}

/// Merge fresh prices onto the parsed baseline.
pub fn reconcile(fresh: FreshPrices, baseline: Vec<BaselineEntry>) -> SyncReport {
    let baseline_count = baseline.len();
    let fresh_count = fresh.entries.len();
    let merged = merge::merge(baseline, fresh.entries);

    SyncReport {
        providers: fresh.providers,
        fresh_count,
        baseline_count,
        merged,
    }
}

/// Full run. With `offline`, the baseline is read from `baseline_cache`
/// instead of the network; otherwise a fetched baseline that parses is
/// written there. `None` disables the cache.
pub async fn run<F: SourceFetcher>(
    fetcher: &F,
    config: &SyncConfig,
    baseline_cache: Option<&Path>,
    offline: bool,
) -> Result<SyncReport> {
    let fresh = collect_fresh(fetcher, config).await;

    let baseline = if offline {
        let path = baseline_cache
            .ok_or_else(|| SyncError::Io("no baseline cache location for an offline run".into()))?;
        merge::parse_baseline(&cache::load_cached_baseline(path)?)?
    } else {
        let text = fetch_baseline(fetcher, &config.baseline_url).await?;
        let baseline = merge::parse_baseline(&text)?;
        if let Some(path) = baseline_cache {
            if let Err(e) = cache::store_baseline(path, &text) {
                tracing::warn!(error = %e, "could not cache baseline");
            }
        }
        baseline
    };

    Ok(reconcile(fresh, baseline))
}
