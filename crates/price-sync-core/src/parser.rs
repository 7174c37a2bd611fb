//! Model definitions to price entries.

use std::collections::BTreeSet;
use std::fmt;

use crate::block;
use crate::config::{default_skip_types, UnitRules};
use crate::entry::{ExtraRatios, ModelPriceEntry, TOKENS_TYPE};
use crate::field;
use crate::pricing::PricingBlock;
use crate::rate::{round4, RateScale};

/// Everything the parser needs to know about the billing side.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseRules {
    pub units: UnitRules,
    /// Model `type` values that are not priced per token.
    pub skip_types: BTreeSet<String>,
    pub scale: RateScale,
}

impl Default for ParseRules {
    fn default() -> Self {
        Self {
            units: UnitRules::default(),
            skip_types: default_skip_types(),
            scale: RateScale::default(),
        }
    }
}

/// Why a model block produced no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingId,
    SkippedType(String),
    NoPricing,
    NoUnits,
    /// Input or output rate missing after all units were read.
    Incomplete,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => write!(f, "no id"),
            Self::SkippedType(t) => write!(f, "non-token type {t}"),
            Self::NoPricing => write!(f, "no pricing block"),
            Self::NoUnits => write!(f, "no priced units"),
            Self::Incomplete => write!(f, "missing input or output rate"),
        }
    }
}

/// Entries parsed from one provider source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub entries: Vec<ModelPriceEntry>,
    /// Priced models dropped for lacking an input or output rate.
    pub discarded: usize,
}

/// Build the price entry for one model block.
pub fn evaluate_model_block(
    model_block: &str,
    channel_type: i64,
    rules: &ParseRules,
) -> Result<ModelPriceEntry, Rejection> {
    let id = field::string_field(model_block, "id").ok_or(Rejection::MissingId)?;

    if let Some(kind) = field::string_field(model_block, "type") {
        if rules.skip_types.contains(kind) {
            return Err(Rejection::SkippedType(kind.to_string()));
        }
    }

    let pricing = PricingBlock::locate(model_block).ok_or(Rejection::NoPricing)?;
    let currency = pricing.currency();
    let units = pricing.units();
    if units.is_empty() {
        return Err(Rejection::NoUnits);
    }

    let mut input = None;
    let mut output = None;
    let mut extra_ratios = ExtraRatios::new();

    for unit in &units {
        let ratio = rules.scale.normalize(unit.rate, &currency);
        if unit.name == rules.units.input {
            input = Some(ratio);
        } else if unit.name == rules.units.output {
            output = Some(ratio);
        } else if let Some(key) = rules.units.extra.get(&unit.name) {
            extra_ratios.insert(key.as_str(), ratio);
            if let Some(alias) = rules.units.legacy_aliases.get(&unit.name) {
                extra_ratios.insert(alias.as_str(), ratio);
            }
        }
    }

    let (Some(input), Some(output)) = (input, output) else {
        return Err(Rejection::Incomplete);
    };

    Ok(ModelPriceEntry {
        model: id.to_string(),
        kind: TOKENS_TYPE.to_string(),
        channel_type,
        input: round4(input),
        output: round4(output),
        extra_ratios: extra_ratios.map_values(round4),
    })
}

/// Zero or one entry for a model block.
pub fn parse_model_block(
    model_block: &str,
    channel_type: i64,
    rules: &ParseRules,
) -> Option<ModelPriceEntry> {
    evaluate_model_block(model_block, channel_type, rules).ok()
}

/// Parse every top-level model block of a provider source file.
pub fn parse_source(source: &str, channel_type: i64, rules: &ParseRules) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for model_block in block::extract_blocks(source) {
        match evaluate_model_block(model_block, channel_type, rules) {
            Ok(entry) => outcome.entries.push(entry),
            Err(rejection) => {
                if rejection == Rejection::Incomplete {
                    outcome.discarded += 1;
                }
                tracing::debug!(
                    model = field::string_field(model_block, "id").unwrap_or("?"),
                    channel_type,
                    reason = %rejection,
                    "no price entry"
                );
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ParseRules {
        ParseRules::default()
    }

    #[test]
    fn minimal_block_yields_unit_ratios() {
        let block = "{id:'m1', pricing:{units:[{name:'textInput',rate:2},{name:'textOutput',rate:6}]}}";
        let entry = parse_model_block(block, 1, &rules()).unwrap();
        assert_eq!(entry.model, "m1");
        assert_eq!(entry.kind, "tokens");
        assert_eq!(entry.channel_type, 1);
        assert_eq!(entry.input, 1.0);
        assert_eq!(entry.output, 3.0);
        assert!(entry.extra_ratios.is_empty());
    }

    #[test]
    fn missing_id_is_rejected() {
        let block = "{ pricing: { units: [{ name: 'textInput', rate: 2 }, { name: 'textOutput', rate: 2 }] } }";
        assert_eq!(
            evaluate_model_block(block, 1, &rules()),
            Err(Rejection::MissingId)
        );
    }

    #[test]
    fn image_type_is_skipped_even_with_pricing() {
        let block = "{ id: 'dall-e-3', type: 'image', pricing: { units: [{ name: 'textInput', rate: 2 }, { name: 'textOutput', rate: 2 }] } }";
        assert_eq!(
            evaluate_model_block(block, 1, &rules()),
            Err(Rejection::SkippedType("image".to_string()))
        );
    }

    #[test]
    fn chat_type_is_kept() {
        let block = "{ id: 'gpt', type: 'chat', pricing: { units: [{ name: 'textInput', rate: 2 }, { name: 'textOutput', rate: 2 }] } }";
        assert!(parse_model_block(block, 1, &rules()).is_some());
    }

    #[test]
    fn input_only_is_incomplete() {
        let block = "{ id: 'm', pricing: { units: [{ name: 'textInput', rate: 2 }] } }";
        assert_eq!(
            evaluate_model_block(block, 1, &rules()),
            Err(Rejection::Incomplete)
        );
    }

    #[test]
    fn no_pricing_and_no_units() {
        assert_eq!(
            evaluate_model_block("{ id: 'embed' }", 1, &rules()),
            Err(Rejection::NoPricing)
        );
        assert_eq!(
            evaluate_model_block("{ id: 'm', pricing: { units: [] } }", 1, &rules()),
            Err(Rejection::NoUnits)
        );
    }

    #[test]
    fn extra_ratios_with_legacy_alias() {
        let block = "{
            id: 'claude-sonnet-4',
            pricing: {
                units: [
                    { name: 'textInput_cacheRead', rate: 0.3, strategy: 'fixed', unit: 'millionTokens' },
                    { name: 'textInput', rate: 3, strategy: 'fixed', unit: 'millionTokens' },
                    { name: 'textOutput', rate: 15, strategy: 'fixed', unit: 'millionTokens' },
                    {
                        lookup: { prices: { '1h': 6, '5m': 3.75 }, pricingParams: ['ttl'] },
                        name: 'textInput_cacheWrite',
                        strategy: 'lookup',
                        unit: 'millionTokens',
                    },
                    { name: 'imageGeneration', rate: 40 },
                ],
            },
        }";
        let entry = parse_model_block(block, 14, &rules()).unwrap();
        assert_eq!(entry.input, 1.5);
        assert_eq!(entry.output, 7.5);

        let extras: Vec<_> = entry.extra_ratios.iter().collect();
        assert_eq!(
            extras,
            vec![
                ("cached_read_tokens", 0.15),
                ("cached_tokens", 0.15),
                ("cached_write_tokens", 1.875),
            ]
        );
    }

    #[test]
    fn cny_prices_are_converted_and_rounded() {
        let block = "{ id: 'qwen-max', pricing: { currency: 'CNY', units: [
            { name: 'textInput', rate: 2.4 },
            { name: 'textOutput', rate: 9.6 },
        ] } }";
        let entry = parse_model_block(block, 17, &rules()).unwrap();
        // 2.4 / 7.3 / 1000 / 0.002 = 0.16438...
        assert_eq!(entry.input, 0.1644);
        assert_eq!(entry.output, 0.6575);
    }

    #[test]
    fn routing_follows_rules() {
        let mut rules = rules();
        rules.units.input = "prompt".to_string();
        rules.units.output = "completion".to_string();
        rules.units.legacy_aliases.clear();
        let block = "{ id: 'm', pricing: { units: [
            { name: 'prompt', rate: 1 },
            { name: 'completion', rate: 2 },
            { name: 'textInput_cacheRead', rate: 0.5 },
        ] } }";
        let entry = parse_model_block(block, 1, &rules).unwrap();
        assert_eq!(entry.input, 0.5);
        assert_eq!(entry.output, 1.0);
        assert_eq!(entry.extra_ratios.get("cached_read_tokens"), Some(0.25));
        assert_eq!(entry.extra_ratios.get("cached_tokens"), None);
    }

    #[test]
    fn parse_source_counts_discarded() {
        let source = "export const models = [
            { id: 'a', pricing: { units: [{ name: 'textInput', rate: 2 }, { name: 'textOutput', rate: 4 }] } },
            { id: 'b', pricing: { units: [{ name: 'textOutput', rate: 4 }] } },
            { id: 'c', type: 'tts', pricing: { units: [{ name: 'textInput', rate: 2 }] } },
            { id: 'd' },
        ];";
        let outcome = parse_source(source, 1, &rules());
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].model, "a");
        assert_eq!(outcome.discarded, 1);
    }
}
