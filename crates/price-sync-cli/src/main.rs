use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use price_sync_core::{
    cache,
    config::{self, SyncConfig},
    entry::ModelPriceEntry,
    fetch::HttpFetcher,
    merge::{self, MergedCollection},
    parser,
    sync::{self, ProviderStatus, SyncReport},
};
use tracing_subscriber::EnvFilter;

// ── Palette ──────────────────────────────────────────────────────────

fn s_header() -> Style { Style::new().color256(252).bold() }  // bright gray, bold
fn s_dim() -> Style    { Style::new().color256(248) }         // light gray
fn s_tree() -> Style   { Style::new().color256(245) }         // mid gray
fn s_hint() -> Style   { Style::new().color256(243) }         // soft gray
fn s_ok() -> Style     { Style::new().color256(114) }         // green
fn s_warm() -> Style   { Style::new().color256(214) }         // amber
fn s_err() -> Style    { Style::new().color256(167) }         // red

fn sep(width: usize) -> String {
    s_tree().apply_to("\u{2500}".repeat(width)).to_string()
}

// ── CLI Args ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "price-sync",
    about = "Reconcile LobeHub model prices with a baseline price list",
    version,
    after_help = "examples:\n  \
        price-sync sync                                  (fetch, merge, write prices/prices.json)\n  \
        price-sync sync --dry-run                        (show what would change)\n  \
        price-sync sync --offline                        (reuse the cached baseline)\n  \
        price-sync parse anthropic.ts --provider anthropic\n  \
        price-sync merge prices.json fresh.json -o merged.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Config file; defaults to the user config, then the bundled one.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every provider, merge onto the baseline, write the result.
    Sync {
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Use the cached baseline instead of downloading it.
        #[arg(long)]
        offline: bool,
        /// Report only; do not write the output file.
        #[arg(long)]
        dry_run: bool,
    },
    /// Parse a local model-definition file and print its entries.
    Parse {
        file: PathBuf,
        #[arg(long, conflicts_with = "provider")]
        channel_type: Option<i64>,
        /// Take the channel type from the configured provider.
        #[arg(long, short)]
        provider: Option<String>,
    },
    /// Merge a parsed price list onto a baseline file.
    Merge {
        baseline: PathBuf,
        fresh: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli).await
}

/// Only `sync` and `parse` load the config; `merge` works on local files alone.
async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Parse {
            file,
            channel_type,
            provider,
        }) => {
            let config = config::resolve_config(config_path)?;
            cmd_parse(&config, &file, channel_type, provider.as_deref())?;
        }
        Some(Commands::Merge {
            baseline,
            fresh,
            output,
        }) => {
            cmd_merge(&baseline, &fresh, output.as_deref())?;
        }
        Some(Commands::Sync {
            output,
            offline,
            dry_run,
        }) => {
            let config = config::resolve_config(config_path)?;
            cmd_sync(&config, output, offline, dry_run).await?;
        }
        None => {
            let config = config::resolve_config(config_path)?;
            cmd_sync(&config, None, false, false).await?;
        }
    }
    Ok(())
}

// ── Sync ─────────────────────────────────────────────────────────────

async fn cmd_sync(
    config: &SyncConfig,
    output: Option<PathBuf>,
    offline: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let term = Term::stderr();
    term.write_line(&format!(
        "{}",
        s_dim().apply_to(format!("fetching {} providers...", config.providers.len()))
    ))?;

    let fetcher = HttpFetcher::new(Duration::from_secs(config.timeout_secs))?;
    let baseline_cache = cache::baseline_cache_path();
    let report = sync::run(&fetcher, config, baseline_cache.as_deref(), offline)
        .await
        .context("price sync failed")?;

    print_report(&report);

    let path = output.unwrap_or_else(|| config.output.clone());
    if dry_run {
        println!(
            "  {}",
            s_hint().apply_to(format!("dry run, {} not written", path.display()))
        );
    } else {
        report.merged.write_json(&path)?;
        println!(
            "  {}",
            s_ok().apply_to(format!("wrote {} entries to {}", report.merged.len(), path.display()))
        );
    }
    if offline {
        if let Some(p) = &baseline_cache {
            println!("  {}", s_hint().apply_to(format!("baseline from {}", p.display())));
        }
    }
    println!();
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!();
    println!("{}", s_header().apply_to("providers"));
    println!("{}", sep(56));

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Provider").fg(Color::AnsiValue(243)),
        Cell::new("Channel").fg(Color::AnsiValue(243)),
        Cell::new("Entries").fg(Color::AnsiValue(243)),
        Cell::new("Discarded").fg(Color::AnsiValue(243)),
        Cell::new("Status").fg(Color::AnsiValue(243)),
    ]);

    for p in &report.providers {
        let (entries, discarded, status) = match &p.status {
            ProviderStatus::Parsed { entries, discarded } => (
                entries.to_string(),
                discarded.to_string(),
                Cell::new("ok").fg(Color::AnsiValue(114)),
            ),
            ProviderStatus::NotFound => (
                "-".to_string(),
                "-".to_string(),
                Cell::new("not found").fg(Color::AnsiValue(214)),
            ),
            ProviderStatus::Failed(reason) => (
                "-".to_string(),
                "-".to_string(),
                Cell::new(format!("failed: {reason}")).fg(Color::AnsiValue(167)),
            ),
        };
        table.add_row(vec![
            Cell::new(format!("  {}", p.name)).fg(Color::AnsiValue(252)),
            Cell::new(p.channel_type).fg(Color::AnsiValue(248)),
            Cell::new(entries).fg(Color::AnsiValue(248)),
            Cell::new(discarded).fg(Color::AnsiValue(248)),
            status,
        ]);
    }
    println!("{table}");
    println!("{}", sep(56));

    let failed = report
        .providers
        .iter()
        .filter(|p| matches!(p.status, ProviderStatus::Failed(_)))
        .count();
    println!(
        "  {}",
        s_dim().apply_to(format!(
            "parsed {}   baseline {}   overridden {}   added {}   total {}",
            report.fresh_count,
            report.baseline_count,
            report.merged.overridden,
            report.merged.appended,
            report.merged.len()
        ))
    );
    if failed > 0 {
        println!(
            "  {}",
            s_warm().apply_to(format!("{failed} provider(s) failed; baseline prices kept for them"))
        );
    }
}

// ── Parse ────────────────────────────────────────────────────────────

fn cmd_parse(
    config: &SyncConfig,
    file: &Path,
    channel_type: Option<i64>,
    provider: Option<&str>,
) -> anyhow::Result<()> {
    let channel_type = match (channel_type, provider) {
        (Some(ct), _) => ct,
        (None, Some(name)) => {
            config
                .provider(name)
                .ok_or_else(|| anyhow::anyhow!("provider '{name}' is not configured"))?
                .channel_type
        }
        (None, None) => anyhow::bail!("pass --channel-type or --provider"),
    };

    let source = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let outcome = parser::parse_source(&source, channel_type, &config.parse_rules());

    println!("{}", serde_json::to_string_pretty(&outcome.entries)?);
    eprintln!(
        "{}",
        s_hint().apply_to(format!(
            "{} entries, {} discarded",
            outcome.entries.len(),
            outcome.discarded
        ))
    );
    Ok(())
}

// ── Merge ────────────────────────────────────────────────────────────

fn cmd_merge(baseline: &Path, fresh: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let baseline_json = std::fs::read_to_string(baseline)
        .with_context(|| format!("cannot read {}", baseline.display()))?;
    let fresh_json = std::fs::read_to_string(fresh)
        .with_context(|| format!("cannot read {}", fresh.display()))?;

    let baseline = merge::parse_baseline(&baseline_json)?;
    let fresh: Vec<ModelPriceEntry> = serde_json::from_str(&fresh_json)
        .with_context(|| format!("{} is not a list of price entries", fresh.display()))?;
    let merged: MergedCollection = merge::merge(baseline, fresh);

    match output {
        Some(path) => {
            merged.write_json(path)?;
            eprintln!(
                "{}",
                s_ok().apply_to(format!("wrote {} entries to {}", merged.len(), path.display()))
            );
        }
        None => print!("{}", merged.to_json_pretty()?),
    }
    if merged.is_empty() {
        eprintln!("{}", s_err().apply_to("warning: merged price list is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("price-sync").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn merge_ignores_a_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let bad_config = dir.path().join("sync.toml");
        std::fs::write(&bad_config, "providers = \"not a table\"").unwrap();
        let baseline = dir.path().join("prices.json");
        std::fs::write(&baseline, r#"[{"model": "a", "channel_type": 1, "input": 9}]"#).unwrap();
        let fresh = dir.path().join("fresh.json");
        std::fs::write(
            &fresh,
            r#"[{"model": "a", "type": "tokens", "channel_type": 1, "input": 1, "output": 2}]"#,
        )
        .unwrap();
        let out = dir.path().join("merged.json");

        let args = cli(&[
            "-c",
            bad_config.to_str().unwrap(),
            "merge",
            baseline.to_str().unwrap(),
            fresh.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]);
        execute(args).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written[0]["input"], serde_json::json!(1.0));
    }

    #[tokio::test]
    async fn parse_still_requires_a_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let bad_config = dir.path().join("sync.toml");
        std::fs::write(&bad_config, "providers = \"not a table\"").unwrap();
        let source = dir.path().join("openai.ts");
        std::fs::write(&source, "export const models = [];").unwrap();

        let args = cli(&[
            "-c",
            bad_config.to_str().unwrap(),
            "parse",
            source.to_str().unwrap(),
            "--channel-type",
            "1",
        ]);
        assert!(execute(args).await.is_err());
    }
}
