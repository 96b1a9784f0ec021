use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{CarryError, Result};

/// Format accepted for window bounds, minute precision
pub const WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Time range and instrument set for one reconciliation run.
///
/// Bounds are timezone-naive and interpreted as UTC when converted to
/// epoch milliseconds for venue requests.
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Target coins, first occurrence wins on duplicates
    pub coins: Vec<String>,
}

impl AnalysisWindow {
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        coins: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        if end < start {
            return Err(CarryError::Validation(format!(
                "window end {} is before start {}",
                end, start
            )));
        }

        let mut deduped: Vec<String> = Vec::new();
        for coin in coins {
            let coin = coin.trim().to_string();
            if coin.is_empty() || deduped.contains(&coin) {
                continue;
            }
            deduped.push(coin);
        }

        Ok(Self {
            start,
            end,
            coins: deduped,
        })
    }

    /// Parse bounds from "YYYY-MM-DD HH:MM" strings.
    pub fn parse(
        start: &str,
        end: &str,
        coins: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        let start = NaiveDateTime::parse_from_str(start.trim(), WINDOW_FORMAT)
            .map_err(|e| CarryError::Validation(format!("invalid window start '{}': {}", start, e)))?;
        let end = NaiveDateTime::parse_from_str(end.trim(), WINDOW_FORMAT)
            .map_err(|e| CarryError::Validation(format!("invalid window end '{}': {}", end, e)))?;
        Self::new(start, end, coins)
    }

    pub fn start_ms(&self) -> i64 {
        self.start.and_utc().timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.and_utc().timestamp_millis()
    }

    /// Inclusive containment check used by the defensive client-side filter.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }

    pub fn duration_hours(&self) -> Decimal {
        Decimal::from((self.end - self.start).num_seconds()) / dec!(3600)
    }
}
