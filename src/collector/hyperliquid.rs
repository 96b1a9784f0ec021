//! Hyperliquid history extraction: 24-hour chunks over the window,
//! one request per chunk, deduplicated on the venue's composite identity.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::adapters::{HyperliquidApi, RawHlFill, RawHlFunding};
use crate::domain::{AnalysisWindow, Fill, FillDirection, FundingEvent, VenueKind};

use super::rate_limit::RateLimiter;
use super::{ms_to_naive, parse_decimal, retain_in_window, Extraction};

const CHUNK_MS: i64 = 24 * 60 * 60 * 1000;

/// Extract fills for the window. Partial results are returned with
/// `complete = false` when a chunk request fails; nothing is retried.
pub async fn hyperliquid_fills(
    api: &dyn HyperliquidApi,
    limiter: &dyn RateLimiter,
    window: &AnalysisWindow,
) -> Extraction<Fill> {
    info!(
        "Extracting Hyperliquid fills from {} to {}",
        window.start, window.end
    );

    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut complete = true;

    let end = window.end_ms();
    let mut next_start = window.start_ms();

    while next_start < end {
        let batch_end = (next_start + CHUNK_MS).min(end);

        match api.user_fills(next_start, batch_end).await {
            Ok(batch) => {
                for raw in &batch {
                    if seen.insert(fill_key(raw)) {
                        records.push(normalize_fill(raw));
                    }
                }
            }
            Err(e) => {
                warn!("Hyperliquid fills request failed: {}", e);
                complete = false;
                break;
            }
        }

        next_start = batch_end + 1;
        limiter.acquire().await;
    }

    let records = retain_in_window(records, window, |fill: &Fill| fill.time, "Hyperliquid fill");
    info!("Extracted {} Hyperliquid fills", records.len());

    Extraction { records, complete }
}

/// Extract funding payments for the window; same traversal semantics as
/// [`hyperliquid_fills`].
pub async fn hyperliquid_funding(
    api: &dyn HyperliquidApi,
    limiter: &dyn RateLimiter,
    window: &AnalysisWindow,
) -> Extraction<FundingEvent> {
    info!(
        "Extracting Hyperliquid funding from {} to {}",
        window.start, window.end
    );

    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut complete = true;

    let end = window.end_ms();
    let mut next_start = window.start_ms();

    while next_start < end {
        let batch_end = (next_start + CHUNK_MS).min(end);

        match api.user_funding(next_start, batch_end).await {
            Ok(batch) => {
                for raw in &batch {
                    if seen.insert(funding_key(raw)) {
                        records.push(normalize_funding(raw));
                    }
                }
            }
            Err(e) => {
                warn!("Hyperliquid funding request failed: {}", e);
                complete = false;
                break;
            }
        }

        next_start = batch_end + 1;
        limiter.acquire().await;
    }

    let records = retain_in_window(
        records,
        window,
        |event: &FundingEvent| event.time,
        "Hyperliquid funding",
    );
    info!("Extracted {} Hyperliquid funding records", records.len());

    Extraction { records, complete }
}

/// Identity key over the raw payload: (time, coin, price, size, direction)
fn fill_key(raw: &RawHlFill) -> String {
    format!(
        "{}_{}_{}_{}_{}",
        raw.time, raw.coin, raw.px, raw.sz, raw.dir
    )
}

fn funding_key(raw: &RawHlFunding) -> String {
    format!(
        "{}_{}_{}_{}",
        raw.time, raw.delta.coin, raw.delta.szi, raw.delta.usdc
    )
}

fn normalize_fill(raw: &RawHlFill) -> Fill {
    let price = parse_decimal(&raw.px);
    let size = parse_decimal(&raw.sz);

    Fill {
        venue: VenueKind::Hyperliquid,
        coin: raw.coin.clone(),
        time: ms_to_naive(raw.time),
        direction: FillDirection::parse(&raw.dir),
        raw_direction: raw.dir.clone(),
        price,
        size,
        notional: price * size,
        fee: parse_decimal(&raw.fee),
        closed_pnl: parse_decimal(&raw.closed_pnl),
    }
}

fn normalize_funding(raw: &RawHlFunding) -> FundingEvent {
    FundingEvent {
        venue: VenueKind::Hyperliquid,
        coin: raw.delta.coin.clone(),
        time: ms_to_naive(raw.time),
        size: parse_decimal(&raw.delta.szi),
        payment: parse_decimal(&raw.delta.usdc),
        rate: parse_decimal(&raw.delta.funding_rate),
    }
}
