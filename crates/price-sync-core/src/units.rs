use std::sync::LazyLock;

use regex::Regex;

use crate::block;
use crate::field;

static UNITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bunits\s*:\s*\[").expect("valid units regex"));

static PRICES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bprices\s*:\s*\{([^}]+)\}").expect("valid prices regex"));

// A tier key is a whole quoted word or a bare identifier, at the start of
// the table or right after a comma.
static TIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:^|,)\s*(?:'(\w+)'|"(\w+)"|([A-Za-z_]\w*))\s*:\s*(\d+(?:\.\d*)?|\.\d+)"#,
    )
    .expect("valid tier regex")
});

/// Cache-duration tiers, shortest first. The first one present wins.
pub const TTL_PREFERENCE: &[&str] = &["5m", "10m", "15m", "30m", "1h", "2h", "4h", "8h", "24h"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Fixed,
    Lookup,
    Other(String),
    Unspecified,
}

impl Strategy {
    fn from_field(value: Option<&str>) -> Self {
        match value {
            Some("fixed") => Self::Fixed,
            Some("lookup") => Self::Lookup,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Unspecified,
        }
    }
}

/// One priced unit, rate still in source currency per million tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingUnit {
    pub name: String,
    pub strategy: Strategy,
    pub rate: f64,
}

/// Body of the `units: [ ... ]` array, brackets excluded.
fn units_body(pricing_block: &str) -> Option<&str> {
    let m = UNITS_RE.find(pricing_block)?;
    let open = m.end() - 1;
    let close = block::matching_close(pricing_block, open, b'[', b']')?;
    Some(&pricing_block[open + 1..close])
}

/// Pricing units of a pricing block. Units without a name or without a
/// resolvable rate are dropped.
pub fn extract_units(pricing_block: &str) -> Vec<PricingUnit> {
    let Some(body) = units_body(pricing_block) else {
        return Vec::new();
    };

    block::extract_blocks(body)
        .into_iter()
        .filter_map(parse_unit)
        .collect()
}

fn parse_unit(unit_block: &str) -> Option<PricingUnit> {
    let name = field::string_field(unit_block, "name")?;
    let strategy = Strategy::from_field(field::string_field(unit_block, "strategy"));
    let rate = match strategy {
        Strategy::Lookup => lookup_rate(unit_block),
        _ => field::number_field(unit_block, "rate"),
    }?;

    Some(PricingUnit {
        name: name.to_string(),
        strategy,
        rate,
    })
}

/// Resolve a `prices: { tier: value, ... }` lookup table to one rate.
pub fn lookup_rate(unit_block: &str) -> Option<f64> {
    let body = PRICES_RE.captures(unit_block)?.get(1)?.as_str();
    let tiers: Vec<(&str, f64)> = TIER_RE
        .captures_iter(body)
        .filter_map(|c| {
            let key = c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3))?.as_str();
            let value = c.get(4)?.as_str().parse().ok()?;
            Some((key, value))
        })
        .collect();

    TTL_PREFERENCE
        .iter()
        .find_map(|ttl| tiers.iter().find(|(key, _)| key == ttl))
        .or_else(|| tiers.first())
        .map(|&(_, value)| value)
}
