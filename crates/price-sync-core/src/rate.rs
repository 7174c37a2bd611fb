//! Conversion of per-million-token prices into billing ratios.
//!
//! A ratio of `1.0` means `dollar_rate` USD per thousand tokens, the unit the
//! consuming billing system reads its price table in.

use serde::{Deserialize, Serialize};

/// USD per thousand tokens represented by ratio `1.0`.
pub const DEFAULT_DOLLAR_RATE: f64 = 0.002;

/// Approximate CNY per USD.
pub const DEFAULT_CNY_PER_USD: f64 = 7.3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Cny,
}

impl Currency {
    /// Only `CNY` is converted. Absent or unrecognised codes are read as USD.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some(c) if c.eq_ignore_ascii_case("CNY") => Self::Cny,
            _ => Self::Usd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateScale {
    #[serde(default = "default_cny_per_usd")]
    pub cny_per_usd: f64,
    #[serde(default = "default_dollar_rate")]
    pub dollar_rate: f64,
}

fn default_cny_per_usd() -> f64 {
    DEFAULT_CNY_PER_USD
}

fn default_dollar_rate() -> f64 {
    DEFAULT_DOLLAR_RATE
}

impl Default for RateScale {
    fn default() -> Self {
        Self {
            cny_per_usd: DEFAULT_CNY_PER_USD,
            dollar_rate: DEFAULT_DOLLAR_RATE,
        }
    }
}

impl RateScale {
    /// `$2.00/M` becomes `1.0` at the default dollar rate.
    pub fn usd_to_ratio(&self, usd_per_million: f64) -> f64 {
        usd_per_million / 1000.0 / self.dollar_rate
    }

    pub fn to_usd(&self, rate: f64, currency: &Currency) -> f64 {
        match currency {
            Currency::Usd => rate,
            Currency::Cny => rate / self.cny_per_usd,
        }
    }

    /// Per-million rate in `currency` to ratio.
    pub fn normalize(&self, rate: f64, currency: &Currency) -> f64 {
        self.usd_to_ratio(self.to_usd(rate, currency))
    }
}

/// Round half away from zero to four decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
