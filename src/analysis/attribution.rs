//! Commission and funding attribution.
//!
//! Sign convention: commissions are negative (costs paid), funding is
//! positive when received on net.

use rust_decimal::Decimal;

use crate::domain::{BybitRecord, BybitRecordKind, Fill, FundingEvent, PositionSummary};

#[derive(Debug, Clone, Default)]
pub struct Attribution {
    pub commission_open: Decimal,
    pub commission_close: Decimal,
    pub funding_total: Decimal,
}

impl Attribution {
    /// Absolute commission cost across both legs
    pub fn commission_cost(&self) -> Decimal {
        (self.commission_open + self.commission_close).abs()
    }
}

/// Attribute commissions and funding for one instrument.
///
/// Hyperliquid fees arrive positive (cost) and are negated. While the
/// position is open every Hyperliquid fee sits in the open bucket; once
/// closed the fees split by fill classification. Bybit's fee data does
/// not distinguish open/close legs, so its trade fees always land in the
/// open bucket.
pub fn attribute(
    summary: &PositionSummary,
    hl_fills: &[Fill],
    hl_funding: &[FundingEvent],
    bybit_records: &[BybitRecord],
) -> Attribution {
    let mut commission_open = Decimal::ZERO;
    let mut commission_close = Decimal::ZERO;

    if summary.is_open() {
        let fee_sum: Decimal = hl_fills.iter().map(|fill| fill.fee).sum();
        commission_open = -fee_sum;
    } else {
        let open_fees: Decimal = hl_fills
            .iter()
            .filter(|fill| fill.direction.is_open())
            .map(|fill| fill.fee)
            .sum();
        let close_fees: Decimal = hl_fills
            .iter()
            .filter(|fill| fill.direction.is_close())
            .map(|fill| fill.fee)
            .sum();
        commission_open = -open_fees;
        commission_close = -close_fees;
    }

    let bybit_trade_fees: Decimal = bybit_records
        .iter()
        .filter(|record| record.kind == BybitRecordKind::Trade)
        .map(|record| record.amount)
        .sum();
    if !bybit_trade_fees.is_zero() {
        commission_open += -bybit_trade_fees.abs();
    }

    let hl_funding_total: Decimal = hl_funding.iter().map(|event| event.payment).sum();
    let bybit_funding_total: Decimal = bybit_records
        .iter()
        .filter(|record| record.kind == BybitRecordKind::FundingFee)
        .map(|record| record.amount)
        .sum();

    Attribution {
        commission_open,
        commission_close,
        funding_total: hl_funding_total + bybit_funding_total,
    }
}
