//! Bybit history extraction: 7-day chunks, each walked through the
//! venue's `nextPageCursor` until exhausted.
//!
//! Three passes over the window, the way the venue's API is shaped:
//! symbol discovery from the unscoped execution list, per-symbol
//! executions (trades and funding rows), then closed-PnL rows. The
//! combined output is sorted by timestamp.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use tracing::{info, warn};

use crate::adapters::{BybitApi, BybitPage, RawBybitClosedPnl, RawBybitExecution};
use crate::domain::{AnalysisWindow, BybitRecord, BybitRecordKind};
use crate::error::Result;
use rust_decimal::Decimal;

use super::rate_limit::RateLimiter;
use super::{ms_to_naive, parse_decimal, parse_ms, retain_in_window, Extraction};

const CHUNK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Upper bound on cursor pages per chunk, against cursor loops on
/// unexpected API behavior.
const MAX_PAGES_PER_CHUNK: usize = 10_000;

pub async fn bybit_records(
    api: &dyn BybitApi,
    limiter: &dyn RateLimiter,
    window: &AnalysisWindow,
) -> Extraction<BybitRecord> {
    info!(
        "Extracting Bybit records from {} to {}",
        window.start, window.end
    );

    let chunks = window_chunks(window);
    let mut complete = true;

    // Pass 1: discover symbols with activity from the unscoped list.
    let mut symbols: BTreeSet<String> = BTreeSet::new();
    for &(start, end) in &chunks {
        walk_cursor(
            |cursor| async move { api.executions(start, end, None, cursor.as_deref()).await },
            limiter,
            &mut complete,
            |rows| {
                for row in rows {
                    if !row.symbol.is_empty() {
                        symbols.insert(row.symbol);
                    }
                }
            },
        )
        .await;
        limiter.acquire().await;
    }

    info!("Found {} unique symbols with trades", symbols.len());

    let mut records: Vec<BybitRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    // Pass 2: per-symbol executions become trade and funding records.
    for symbol in &symbols {
        for &(start, end) in &chunks {
            walk_cursor(
                |cursor| async move {
                    api.executions(start, end, Some(symbol.as_str()), cursor.as_deref())
                        .await
                },
                limiter,
                &mut complete,
                |rows| {
                    for row in &rows {
                        let record = normalize_execution(row);
                        if seen.insert(record.dedup_key()) {
                            records.push(record);
                        }
                    }
                },
            )
            .await;
            limiter.acquire().await;
        }
    }

    // Pass 3: closed-PnL rows, carried for realized-PnL reporting.
    for &(start, end) in &chunks {
        walk_cursor(
            |cursor| async move { api.closed_pnl(start, end, cursor.as_deref()).await },
            limiter,
            &mut complete,
            |rows| {
                for row in &rows {
                    let record = normalize_closed_pnl(row);
                    if seen.insert(record.dedup_key()) {
                        records.push(record);
                    }
                }
            },
        )
        .await;
        limiter.acquire().await;
    }

    records.sort_by_key(|record| record.time);

    let records = retain_in_window(records, window, |record: &BybitRecord| record.time, "Bybit");
    info!("Extracted {} Bybit records", records.len());

    Extraction { records, complete }
}

fn window_chunks(window: &AnalysisWindow) -> Vec<(i64, i64)> {
    let mut chunks = Vec::new();
    let end = window.end_ms();
    let mut start = window.start_ms();

    while start < end {
        let chunk_end = (start + CHUNK_MS).min(end);
        chunks.push((start, chunk_end));
        start = chunk_end + 1;
    }

    chunks
}

/// Walk one chunk's cursor chain. A transport failure aborts the walk
/// and clears the completeness flag; prior pages are kept.
async fn walk_cursor<T, F, Fut>(
    mut fetch: F,
    limiter: &dyn RateLimiter,
    complete: &mut bool,
    mut on_page: impl FnMut(Vec<T>),
) where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<BybitPage<T>>>,
{
    let mut cursor: Option<String> = None;

    for _ in 0..MAX_PAGES_PER_CHUNK {
        match fetch(cursor.take()).await {
            Ok(page) => {
                let next = page.next_cursor;
                on_page(page.list);

                match next {
                    Some(token) if !token.is_empty() => {
                        cursor = Some(token);
                        limiter.acquire().await;
                    }
                    _ => break,
                }
            }
            Err(e) => {
                warn!("Bybit request failed: {}", e);
                *complete = false;
                break;
            }
        }
    }
}

fn normalize_execution(raw: &RawBybitExecution) -> BybitRecord {
    let time = ms_to_naive(parse_ms(&raw.exec_time));
    let fee = parse_decimal(&raw.exec_fee);

    if raw.exec_type == "Funding" {
        // Bybit reports funding paid as a positive fee; flip the sign so
        // positive = received by the trader.
        BybitRecord {
            kind: BybitRecordKind::FundingFee,
            time,
            symbol: raw.symbol.clone(),
            amount: -fee,
            exec_id: raw.exec_id.clone(),
            order_id: String::new(),
            side: String::new(),
            quantity: Decimal::ZERO,
            price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    } else {
        BybitRecord {
            kind: BybitRecordKind::Trade,
            time,
            symbol: raw.symbol.clone(),
            amount: fee.abs(),
            exec_id: raw.exec_id.clone(),
            order_id: raw.order_id.clone(),
            side: raw.side.clone(),
            quantity: parse_decimal(&raw.exec_qty),
            price: parse_decimal(&raw.exec_price),
            realized_pnl: parse_decimal(&raw.closed_pnl),
        }
    }
}

fn normalize_closed_pnl(raw: &RawBybitClosedPnl) -> BybitRecord {
    BybitRecord {
        kind: BybitRecordKind::Commission,
        time: ms_to_naive(parse_ms(&raw.updated_time)),
        symbol: raw.symbol.clone(),
        amount: Decimal::ZERO,
        exec_id: raw.order_id.clone(),
        order_id: raw.order_id.clone(),
        side: raw.side.clone(),
        quantity: parse_decimal(&raw.qty),
        price: parse_decimal(&raw.avg_entry_price),
        realized_pnl: parse_decimal(&raw.closed_pnl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::rate_limit::NoDelay;
    use crate::error::CarryError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type ExecKey = (Option<String>, Option<String>);

    #[derive(Default)]
    struct MockBybit {
        executions: Mutex<HashMap<ExecKey, BybitPage<RawBybitExecution>>>,
        closed: Mutex<HashMap<Option<String>, BybitPage<RawBybitClosedPnl>>>,
        fail_scoped: bool,
    }

    impl MockBybit {
        fn exec_page(
            &self,
            symbol: Option<&str>,
            cursor: Option<&str>,
            list: Vec<RawBybitExecution>,
            next: Option<&str>,
        ) {
            self.executions.lock().unwrap().insert(
                (symbol.map(String::from), cursor.map(String::from)),
                BybitPage {
                    list,
                    next_cursor: next.map(String::from),
                },
            );
        }

        fn pnl_page(&self, cursor: Option<&str>, list: Vec<RawBybitClosedPnl>) {
            self.closed.lock().unwrap().insert(
                cursor.map(String::from),
                BybitPage {
                    list,
                    next_cursor: None,
                },
            );
        }
    }

    #[async_trait]
    impl BybitApi for MockBybit {
        async fn executions(
            &self,
            _start_ms: i64,
            _end_ms: i64,
            symbol: Option<&str>,
            cursor: Option<&str>,
        ) -> Result<BybitPage<RawBybitExecution>> {
            if self.fail_scoped && symbol.is_some() {
                return Err(CarryError::VenueApi("Bybit HTTP error: 502".to_string()));
            }
            Ok(self
                .executions
                .lock()
                .unwrap()
                .get(&(symbol.map(String::from), cursor.map(String::from)))
                .cloned()
                .unwrap_or_else(BybitPage::empty))
        }

        async fn closed_pnl(
            &self,
            _start_ms: i64,
            _end_ms: i64,
            cursor: Option<&str>,
        ) -> Result<BybitPage<RawBybitClosedPnl>> {
            Ok(self
                .closed
                .lock()
                .unwrap()
                .get(&cursor.map(String::from))
                .cloned()
                .unwrap_or_else(BybitPage::empty))
        }
    }

    fn window() -> AnalysisWindow {
        AnalysisWindow::parse("2025-08-21 00:00", "2025-08-23 00:00", []).unwrap()
    }

    fn exec(exec_id: &str, time_ms: i64, exec_type: &str, fee: &str) -> RawBybitExecution {
        RawBybitExecution {
            exec_time: time_ms.to_string(),
            symbol: "ENAUSDT".to_string(),
            exec_type: exec_type.to_string(),
            exec_fee: fee.to_string(),
            exec_id: exec_id.to_string(),
            order_id: format!("order-{}", exec_id),
            side: "Sell".to_string(),
            exec_qty: "10".to_string(),
            exec_price: "0.4".to_string(),
            closed_pnl: String::new(),
        }
    }

    fn t0() -> i64 {
        window().start_ms() + 60_000
    }

    #[tokio::test]
    async fn test_cursor_walk_and_normalization() {
        let mock = MockBybit::default();
        // discovery pass sees the symbol
        mock.exec_page(None, None, vec![exec("d1", t0(), "Trade", "0.2")], None);
        // scoped pass pages through a cursor
        mock.exec_page(
            Some("ENAUSDT"),
            None,
            vec![exec("e1", t0() + 1000, "Trade", "0.2")],
            Some("page2"),
        );
        mock.exec_page(
            Some("ENAUSDT"),
            Some("page2"),
            vec![exec("e2", t0(), "Funding", "0.05")],
            None,
        );

        let extraction = bybit_records(&mock, &NoDelay, &window()).await;
        assert!(extraction.complete);
        assert_eq!(extraction.len(), 2);

        // sorted by timestamp: funding row first
        let funding = &extraction.records[0];
        assert_eq!(funding.kind, BybitRecordKind::FundingFee);
        assert_eq!(funding.amount, dec!(-0.05));

        let trade = &extraction.records[1];
        assert_eq!(trade.kind, BybitRecordKind::Trade);
        assert_eq!(trade.amount, dec!(0.2));
        assert_eq!(trade.quantity, dec!(10));
    }

    #[tokio::test]
    async fn test_duplicate_exec_id_across_pages_collapses() {
        let mock = MockBybit::default();
        mock.exec_page(None, None, vec![exec("d1", t0(), "Trade", "0.2")], None);
        let dup = exec("e1", t0(), "Trade", "0.2");
        mock.exec_page(
            Some("ENAUSDT"),
            None,
            vec![dup.clone()],
            Some("page2"),
        );
        mock.exec_page(Some("ENAUSDT"), Some("page2"), vec![dup], None);

        let extraction = bybit_records(&mock, &NoDelay, &window()).await;
        assert_eq!(extraction.len(), 1);
    }

    #[tokio::test]
    async fn test_negative_fee_trade_kept_positive() {
        // maker rebates arrive as negative execFee; commissions stay unsigned here
        let mock = MockBybit::default();
        mock.exec_page(None, None, vec![exec("d1", t0(), "Trade", "-0.1")], None);
        mock.exec_page(
            Some("ENAUSDT"),
            None,
            vec![exec("e1", t0(), "Trade", "-0.1")],
            None,
        );

        let extraction = bybit_records(&mock, &NoDelay, &window()).await;
        assert_eq!(extraction.records[0].amount, dec!(0.1));
    }

    #[tokio::test]
    async fn test_closed_pnl_becomes_commission_record() {
        let mock = MockBybit::default();
        mock.pnl_page(
            None,
            vec![RawBybitClosedPnl {
                updated_time: t0().to_string(),
                symbol: "ENAUSDT".to_string(),
                order_id: "o9".to_string(),
                side: "Buy".to_string(),
                qty: "25".to_string(),
                avg_entry_price: "0.39".to_string(),
                closed_pnl: "1.7".to_string(),
            }],
        );

        let extraction = bybit_records(&mock, &NoDelay, &window()).await;
        assert_eq!(extraction.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.kind, BybitRecordKind::Commission);
        assert_eq!(record.amount, Decimal::ZERO);
        assert_eq!(record.realized_pnl, dec!(1.7));
        assert_eq!(record.price, dec!(0.39));
    }

    #[tokio::test]
    async fn test_scoped_failure_marks_incomplete_but_keeps_rest() {
        let mock = MockBybit {
            fail_scoped: true,
            ..MockBybit::default()
        };
        mock.exec_page(None, None, vec![exec("d1", t0(), "Trade", "0.2")], None);
        mock.pnl_page(
            None,
            vec![RawBybitClosedPnl {
                updated_time: t0().to_string(),
                symbol: "ENAUSDT".to_string(),
                order_id: "o9".to_string(),
                side: "Buy".to_string(),
                qty: "25".to_string(),
                avg_entry_price: "0.39".to_string(),
                closed_pnl: "1.7".to_string(),
            }],
        );

        let extraction = bybit_records(&mock, &NoDelay, &window()).await;
        assert!(!extraction.complete);
        // the closed-pnl pass still ran
        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.records[0].kind, BybitRecordKind::Commission);
    }
}
