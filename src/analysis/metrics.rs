//! Performance metric derivation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{PerformanceRecord, PositionSummary};

use super::attribution::Attribution;

/// Sentinel for commissions that funding income will never recover
pub const UNRECOVERABLE_DAYS: Decimal = dec!(999999);

const HOURS_PER_YEAR: Decimal = dec!(8760);

/// Derive the per-instrument performance record.
///
/// `notional` is the margin assumption the percentage return is computed
/// against; it comes from configuration, not from the fills.
pub fn performance(
    summary: &PositionSummary,
    attribution: &Attribution,
    notional: Decimal,
    duration_hours: Decimal,
) -> PerformanceRecord {
    let realized_pnl =
        attribution.commission_open + attribution.commission_close + attribution.funding_total;

    let percentage = percentage_of(realized_pnl, notional);
    let funding_percentage = percentage_of(attribution.funding_total, notional);

    PerformanceRecord {
        coin: summary.coin.clone(),
        side: summary.side_label(),
        entry_price: summary.entry_price,
        exit_price: summary.exit_price,
        position_size: summary.size(),
        commission_open: attribution.commission_open,
        commission_close: attribution.commission_close,
        funding_total: attribution.funding_total,
        realized_pnl,
        percentage,
        duration_hours,
        apr: annualize(percentage, duration_hours),
        apr_excl_commission: annualize(funding_percentage, duration_hours),
        breakeven_days: breakeven_days(
            attribution.commission_cost(),
            attribution.funding_total,
            duration_hours,
        ),
    }
}

fn percentage_of(amount: Decimal, notional: Decimal) -> Decimal {
    if notional.is_zero() {
        Decimal::ZERO
    } else {
        amount / notional * dec!(100)
    }
}

/// Linear extrapolation of the window's return to a yearly rate.
/// Zero duration or zero return yields zero rather than dividing.
fn annualize(percentage: Decimal, duration_hours: Decimal) -> Decimal {
    if duration_hours <= Decimal::ZERO || percentage.is_zero() {
        Decimal::ZERO
    } else {
        percentage / duration_hours * HOURS_PER_YEAR
    }
}

/// Days of funding income, at the window's observed rate, needed to
/// offset the commission cost.
pub fn breakeven_days(
    commission_cost: Decimal,
    funding_total: Decimal,
    duration_hours: Decimal,
) -> Decimal {
    if commission_cost.is_zero() {
        return Decimal::ZERO;
    }
    if funding_total <= Decimal::ZERO {
        return UNRECOVERABLE_DAYS;
    }
    if duration_hours <= Decimal::ZERO {
        // no observed rate to extrapolate from
        return Decimal::ZERO;
    }

    let funding_per_hour = funding_total / duration_hours;
    commission_cost / funding_per_hour / dec!(24)
}
