//! Full reconciliation run: extract both venues, reconstruct and price
//! each target instrument, and bundle the report.

use chrono::NaiveDateTime;
use tracing::info;

use crate::adapters::{BybitApi, HyperliquidApi};
use crate::collector::{
    bybit_records, hyperliquid_fills, hyperliquid_funding, Extraction, RateLimiter,
};
use crate::config::NotionalTable;
use crate::domain::{
    AnalysisWindow, BybitRecord, Fill, FundingEvent, PerformanceRecord, Totals,
};

use super::attribution::attribute;
use super::metrics::performance;
use super::position::reconstruct;

/// Everything one run produces: the per-instrument table, grand totals,
/// and the raw record sequences with their completeness flags.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub window: AnalysisWindow,
    pub rows: Vec<PerformanceRecord>,
    pub totals: Totals,
    pub hl_fills: Extraction<Fill>,
    pub hl_funding: Extraction<FundingEvent>,
    pub bybit: Extraction<BybitRecord>,
}

impl AnalysisReport {
    /// False when any venue extraction aborted before covering the window.
    pub fn is_complete(&self) -> bool {
        self.hl_fills.complete && self.hl_funding.complete && self.bybit.complete
    }
}

pub struct Analyzer<'a> {
    hyperliquid: &'a dyn HyperliquidApi,
    bybit: &'a dyn BybitApi,
    limiter: &'a dyn RateLimiter,
    notional: &'a NotionalTable,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        hyperliquid: &'a dyn HyperliquidApi,
        bybit: &'a dyn BybitApi,
        limiter: &'a dyn RateLimiter,
        notional: &'a NotionalTable,
    ) -> Self {
        Self {
            hyperliquid,
            bybit,
            limiter,
            notional,
        }
    }

    pub async fn run(&self, window: &AnalysisWindow) -> AnalysisReport {
        info!(
            "Analyzing performance from {} to {} for {} coins",
            window.start,
            window.end,
            window.coins.len()
        );

        // Extraction is sequential per venue and record kind; nothing is
        // fetched in parallel.
        let mut hl_fills = hyperliquid_fills(self.hyperliquid, self.limiter, window).await;
        let mut hl_funding = hyperliquid_funding(self.hyperliquid, self.limiter, window).await;
        let mut bybit = bybit_records(self.bybit, self.limiter, window).await;

        log_range("Hyperliquid fills", hl_fills.records.iter().map(|f| f.time));
        log_range(
            "Hyperliquid funding",
            hl_funding.records.iter().map(|f| f.time),
        );
        log_range("Bybit records", bybit.records.iter().map(|r| r.time));

        // Restrict the raw sequences to the target instrument set; the
        // filtered tables are also what the report emits.
        let bybit_symbols: Vec<String> = window
            .coins
            .iter()
            .map(|coin| format!("{}USDT", coin))
            .collect();
        hl_fills
            .records
            .retain(|fill| window.coins.contains(&fill.coin));
        hl_funding
            .records
            .retain(|event| window.coins.contains(&event.coin));
        bybit
            .records
            .retain(|record| bybit_symbols.contains(&record.symbol));

        info!(
            "After coin filtering: {} HL fills, {} HL funding, {} Bybit records",
            hl_fills.len(),
            hl_funding.len(),
            bybit.len()
        );

        let duration_hours = window.duration_hours();
        let mut rows = Vec::new();
        let mut totals = Totals::default();

        for coin in &window.coins {
            let symbol = format!("{}USDT", coin);

            let coin_fills: Vec<Fill> = hl_fills
                .records
                .iter()
                .filter(|fill| &fill.coin == coin)
                .cloned()
                .collect();
            let coin_funding: Vec<FundingEvent> = hl_funding
                .records
                .iter()
                .filter(|event| &event.coin == coin)
                .cloned()
                .collect();
            let coin_bybit: Vec<BybitRecord> = bybit
                .records
                .iter()
                .filter(|record| record.symbol == symbol)
                .cloned()
                .collect();

            if coin_fills.is_empty() && coin_funding.is_empty() && coin_bybit.is_empty() {
                info!("No data found for {}", coin);
                continue;
            }

            let summary = reconstruct(coin, &coin_fills, &coin_funding);
            let attribution = attribute(&summary, &coin_fills, &coin_funding, &coin_bybit);
            let record = performance(
                &summary,
                &attribution,
                self.notional.notional_for(coin),
                duration_hours,
            );

            info!(
                "{}: side={}, entry={:?}, exit={:?}, size={}",
                coin,
                record.side,
                record.entry_price,
                record.exit_price,
                record.position_size
            );
            info!(
                "{}: commission open={:.6}, close={:.6}, funding={:.6}, pnl={:.6}",
                coin,
                record.commission_open,
                record.commission_close,
                record.funding_total,
                record.realized_pnl
            );
            info!(
                "{}: pct={:.4}%, apr={:.4}%, apr_excl_comm={:.4}%, breakeven={:.2} days",
                coin,
                record.percentage,
                record.apr,
                record.apr_excl_commission,
                record.breakeven_days
            );

            totals.add(&record);
            rows.push(record);
        }

        info!(
            "Totals: commission open={:.6}, close={:.6}, funding={:.6}, pnl={:.6}",
            totals.commission_open, totals.commission_close, totals.funding, totals.realized_pnl
        );

        AnalysisReport {
            window: window.clone(),
            rows,
            totals,
            hl_fills,
            hl_funding,
            bybit,
        }
    }
}

fn log_range(label: &str, times: impl Iterator<Item = NaiveDateTime>) {
    let mut min: Option<NaiveDateTime> = None;
    let mut max: Option<NaiveDateTime> = None;
    let mut count = 0usize;

    for ts in times {
        min = Some(min.map_or(ts, |m| m.min(ts)));
        max = Some(max.map_or(ts, |m| m.max(ts)));
        count += 1;
    }

    if let (Some(min), Some(max)) = (min, max) {
        info!("{}: {} records spanning {} to {}", label, count, min, max);
    }
}
