//! Quarterly technical-result (HFC) explanation report.
//!
//! Reads a contract-level CSV export, partitions it by market, flags the
//! contracts that drive most of each market's quarter-over-quarter change,
//! picks the dominant effects behind every change, and summarises each
//! market. [`output`] renders the resulting tables as one CSV per sheet.
//!
//! ```rust,ignore
//! use hfc_report::*;
//!
//! let cfg = ReportConfig::default();
//! let (records, _) = loader::load_and_clean("q2_input.csv", &cfg)?;
//! let report = build_market_report(
//!     &records,
//!     entry_type_filter(&cfg),
//!     &BuildOptions::from_config(&cfg),
//! );
//! output::write_report("out".as_ref(), &report)?;
//! ```

pub mod config;
pub mod effects;
pub mod error;
pub mod loader;
pub mod output;
pub mod ranking;
pub mod reports;
pub mod types;
pub mod util;

pub use config::{EffectField, RankConfig, ReportConfig, TieBreak};
pub use effects::classify;
pub use error::{ReportError, Result};
pub use ranking::{rank, Ranking};
pub use reports::{
    build_market_report, entry_type_filter, BuildOptions, MarketBundle, MarketReport, Period,
};
pub use types::{EffectEntry, MagnitudeField, RankedRecord, Record, TopFlag};
