//! Paginated history extraction.
//!
//! Extractors drive a venue page source across the analysis window in
//! fixed time chunks, deduplicate by record identity key, and re-filter
//! against the window bounds after traversal (venue boundary pages may
//! return out-of-range rows). Extraction is best-effort: a transport
//! failure aborts the remaining pagination and the partial result is
//! returned with `complete = false`.

pub mod bybit;
pub mod hyperliquid;
pub mod rate_limit;

pub use bybit::bybit_records;
pub use hyperliquid::{hyperliquid_fills, hyperliquid_funding};
pub use rate_limit::{FixedDelay, NoDelay, RateLimiter};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

use crate::domain::AnalysisWindow;

/// Extracted record sequence plus a completeness flag distinguishing
/// "no data" from "extraction aborted partway through the window".
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub complete: bool,
}

impl<T> Extraction<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse a venue decimal string, defaulting malformed values to zero.
pub(crate) fn parse_decimal(raw: &str) -> Decimal {
    Decimal::from_str(raw.trim()).unwrap_or_default()
}

/// Parse an epoch-millisecond string, defaulting malformed values to zero.
pub(crate) fn parse_ms(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or_default()
}

/// Epoch milliseconds to a naive UTC timestamp; out-of-range values
/// collapse to the epoch.
pub(crate) fn ms_to_naive(ms: i64) -> NaiveDateTime {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

/// Defensive client-side re-filter asserting `start <= ts <= end`,
/// logging how many boundary-page rows were dropped.
pub(crate) fn retain_in_window<T>(
    mut records: Vec<T>,
    window: &AnalysisWindow,
    time_of: impl Fn(&T) -> NaiveDateTime,
    label: &str,
) -> Vec<T> {
    let before = records.len();
    records.retain(|record| window.contains(time_of(record)));

    let removed = before - records.len();
    if removed > 0 {
        info!("Filtered out {} {} records outside date range", removed, label);
    }

    records
}
