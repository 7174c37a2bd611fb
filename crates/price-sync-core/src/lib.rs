pub mod block;
pub mod config;
pub mod entry;
pub mod error;
pub mod field;
pub mod merge;
pub mod parser;
pub mod pricing;
pub mod rate;
pub mod units;

#[cfg(feature = "network")]
pub mod cache;
#[cfg(feature = "network")]
pub mod fetch;
#[cfg(feature = "network")]
pub mod sync;

pub use config::SyncConfig;
pub use entry::{ExtraRatios, ModelPriceEntry, PriceKey};
pub use error::SyncError;
pub use merge::{merge, MergedCollection, PriceRecord};
pub use parser::{parse_source, ParseOutcome, ParseRules};
