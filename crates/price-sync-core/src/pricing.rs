use std::sync::LazyLock;

use regex::Regex;

use crate::block;
use crate::field;
use crate::rate::Currency;
use crate::units::{self, PricingUnit};

static PRICING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bpricing\s*:\s*\{").expect("valid pricing regex")
});

/// The `pricing: { ... }` sub-block of one model block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingBlock<'a> {
    text: &'a str,
}

impl<'a> PricingBlock<'a> {
    /// Find the first pricing sub-block. Models without token pricing
    /// (embeddings, images) have none, which is not an error.
    pub fn locate(model_block: &'a str) -> Option<Self> {
        let m = PRICING_RE.find(model_block)?;
        let text = block::block_at(model_block, m.end() - 1)?;
        Some(Self { text })
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Declared currency. Unmarked blocks are priced in USD.
    pub fn currency(&self) -> Currency {
        Currency::from_code(field::string_field(self.text, "currency"))
    }

    /// Pricing units with a resolvable rate, in source order.
    pub fn units(&self) -> Vec<PricingUnit> {
        units::extract_units(self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_pricing_sub_block_only() {
        let model = "{ id: 'm', pricing: { currency: 'CNY', units: [{ rate: 1 }] }, releasedAt: '2024' }";
        let pricing = PricingBlock::locate(model).unwrap();
        assert_eq!(pricing.text(), "{ currency: 'CNY', units: [{ rate: 1 }] }");
    }

    #[test]
    fn missing_pricing_is_none() {
        assert!(PricingBlock::locate("{ id: 'text-embedding-3-small' }").is_none());
    }

    #[test]
    fn pricing_without_object_is_none() {
        assert!(PricingBlock::locate("{ id: 'm', pricing: undefined }").is_none());
    }

    #[test]
    fn unclosed_pricing_is_none() {
        assert!(PricingBlock::locate("{ id: 'm', pricing: { units: [").is_none());
    }

    #[test]
    fn does_not_match_suffixed_key() {
        let model = "{ oldpricing: { a: 1 }, pricing: { currency: 'CNY' } }";
        let pricing = PricingBlock::locate(model).unwrap();
        assert_eq!(pricing.text(), "{ currency: 'CNY' }");
    }

    #[test]
    fn currency_defaults_to_usd() {
        let model = "{ pricing: { units: [] } }";
        assert_eq!(PricingBlock::locate(model).unwrap().currency(), Currency::Usd);

        let model = "{ pricing: { currency: 'CNY', units: [] } }";
        assert_eq!(PricingBlock::locate(model).unwrap().currency(), Currency::Cny);
    }
}
