//! Net position reconstruction from directional fills.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::domain::{Fill, FundingEvent, PositionSide, PositionStatus, PositionSummary};

/// Net sizes at or below this magnitude classify a position as closed.
pub const CLOSE_EPSILON: Decimal = dec!(0.001);

/// Reconstruct one instrument's position from its fills within the window.
///
/// Order-independent: the signed sum and the weighted averages do not
/// depend on fill ordering. The only order-sensitive path is the closed
/// side tie-break (largest-magnitude fill, first seen wins on equal
/// sizes), which preserves the input ordering.
///
/// With no fills at all the position is assumed still open and the side
/// is inferred from the sign of the most recent funding event.
pub fn reconstruct(coin: &str, fills: &[Fill], funding: &[FundingEvent]) -> PositionSummary {
    if fills.is_empty() {
        let side = funding
            .iter()
            .max_by_key(|event| event.time)
            .map(|event| {
                if event.size > Decimal::ZERO {
                    PositionSide::Long
                } else {
                    PositionSide::Short
                }
            });

        return PositionSummary {
            coin: coin.to_string(),
            net_size: Decimal::ZERO,
            status: PositionStatus::Open,
            side,
            entry_price: None,
            exit_price: None,
            unknown_fills: 0,
        };
    }

    let mut net_size = Decimal::ZERO;
    let mut any_open = false;
    let mut any_close = false;
    let mut unknown_fills = 0usize;

    for fill in fills {
        if fill.direction.is_open() {
            any_open = true;
        } else if fill.direction.is_close() {
            any_close = true;
        } else {
            unknown_fills += 1;
            continue;
        }
        net_size += fill.direction.signed_delta(fill.size);
    }

    if unknown_fills > 0 {
        warn!(
            "{}: skipped {} fills with unrecognized direction tags",
            coin, unknown_fills
        );
    }

    let status = if net_size.abs() > CLOSE_EPSILON {
        PositionStatus::Open
    } else {
        PositionStatus::Closed
    };

    let side = match status {
        PositionStatus::Open => Some(if net_size > Decimal::ZERO {
            PositionSide::Long
        } else {
            PositionSide::Short
        }),
        // Net size carries no signal once flat; classify from the largest
        // individual fill instead.
        PositionStatus::Closed => largest_fill_side(fills),
    };

    let entry_price = if any_open {
        weighted_price(fills.iter().filter(|fill| fill.direction.is_open()))
    } else {
        None
    };

    // A partial close while still net-open never surfaces an exit price.
    let exit_price = if any_close && status == PositionStatus::Closed {
        weighted_price(fills.iter().filter(|fill| fill.direction.is_close()))
    } else {
        None
    };

    PositionSummary {
        coin: coin.to_string(),
        net_size,
        status,
        side,
        entry_price,
        exit_price,
        unknown_fills,
    }
}

fn largest_fill_side(fills: &[Fill]) -> Option<PositionSide> {
    let mut best: Option<&Fill> = None;
    for fill in fills {
        if fill.direction == crate::domain::FillDirection::Unknown {
            continue;
        }
        match best {
            Some(current) if fill.size.abs() <= current.size.abs() => {}
            _ => best = Some(fill),
        }
    }

    best.map(|fill| {
        if fill.direction.is_long() {
            PositionSide::Long
        } else {
            PositionSide::Short
        }
    })
}

/// Size-weighted average price; absent when total size is zero.
fn weighted_price<'a>(fills: impl Iterator<Item = &'a Fill>) -> Option<Decimal> {
    let mut total_size = Decimal::ZERO;
    let mut total_notional = Decimal::ZERO;

    for fill in fills {
        total_size += fill.size.abs();
        total_notional += fill.size.abs() * fill.price;
    }

    if total_size.is_zero() {
        None
    } else {
        Some(total_notional / total_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FillDirection;
    use chrono::NaiveDateTime;

    fn ts(minute: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 8, 21)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap()
    }

    fn fill(dir: &str, size: Decimal, price: Decimal) -> Fill {
        Fill {
            venue: crate::domain::VenueKind::Hyperliquid,
            coin: "ENA".to_string(),
            time: ts(0),
            direction: FillDirection::parse(dir),
            raw_direction: dir.to_string(),
            price,
            size,
            notional: price * size,
            fee: dec!(0.1),
            closed_pnl: Decimal::ZERO,
        }
    }

    fn funding(minute: u32, size: Decimal) -> FundingEvent {
        FundingEvent {
            venue: crate::domain::VenueKind::Hyperliquid,
            coin: "ENA".to_string(),
            time: ts(minute),
            size,
            payment: dec!(0.01),
            rate: dec!(0.0001),
        }
    }

    #[test]
    fn test_closed_position_detection() {
        let fills = vec![
            fill("Open Long", dec!(10), dec!(100)),
            fill("Close Long", dec!(10), dec!(110)),
        ];
        let summary = reconstruct("ENA", &fills, &[]);

        assert_eq!(summary.net_size, Decimal::ZERO);
        assert_eq!(summary.status, PositionStatus::Closed);
        assert_eq!(summary.side, Some(PositionSide::Long));
        assert_eq!(summary.side_label(), "Long (closed)");
        assert_eq!(summary.entry_price, Some(dec!(100)));
        assert_eq!(summary.exit_price, Some(dec!(110)));
    }

    #[test]
    fn test_open_position_detection() {
        let fills = vec![fill("Open Short", dec!(5), dec!(50))];
        let summary = reconstruct("ENA", &fills, &[]);

        assert_eq!(summary.net_size, dec!(-5));
        assert_eq!(summary.status, PositionStatus::Open);
        assert_eq!(summary.side, Some(PositionSide::Short));
        assert_eq!(summary.entry_price, Some(dec!(50)));
        assert_eq!(summary.exit_price, None);
    }

    #[test]
    fn test_reordering_fills_is_idempotent() {
        let mut fills = vec![
            fill("Open Long", dec!(4), dec!(100)),
            fill("Open Long", dec!(6), dec!(110)),
            fill("Close Long", dec!(10), dec!(120)),
        ];
        let forward = reconstruct("ENA", &fills, &[]);
        fills.reverse();
        let backward = reconstruct("ENA", &fills, &[]);

        assert_eq!(forward.net_size, backward.net_size);
        assert_eq!(forward.status, backward.status);
        assert_eq!(forward.entry_price, backward.entry_price);
        assert_eq!(forward.exit_price, backward.exit_price);
        // weighted entry: (4*100 + 6*110) / 10 = 106
        assert_eq!(forward.entry_price, Some(dec!(106)));
    }

    #[test]
    fn test_partial_close_has_no_exit_price() {
        let fills = vec![
            fill("Open Long", dec!(10), dec!(100)),
            fill("Close Long", dec!(4), dec!(105)),
        ];
        let summary = reconstruct("ENA", &fills, &[]);

        assert_eq!(summary.status, PositionStatus::Open);
        assert_eq!(summary.exit_price, None);
        assert_eq!(summary.entry_price, Some(dec!(100)));
    }

    #[test]
    fn test_closed_side_from_largest_fill_first_wins_ties() {
        // net ~0, two close fills tie the opens in magnitude; the first
        // largest fill in input order decides
        let fills = vec![
            fill("Open Short", dec!(10), dec!(100)),
            fill("Close Short", dec!(10), dec!(95)),
        ];
        let summary = reconstruct("ENA", &fills, &[]);

        assert_eq!(summary.status, PositionStatus::Closed);
        assert_eq!(summary.side, Some(PositionSide::Short));
    }

    #[test]
    fn test_unknown_fills_skipped_and_counted() {
        let fills = vec![
            fill("Open Long", dec!(5), dec!(100)),
            fill("Liquidation", dec!(50), dec!(90)),
        ];
        let summary = reconstruct("ENA", &fills, &[]);

        assert_eq!(summary.unknown_fills, 1);
        // the unknown fill moved neither the net size nor the averages
        assert_eq!(summary.net_size, dec!(5));
        assert_eq!(summary.entry_price, Some(dec!(100)));
    }

    #[test]
    fn test_no_fills_falls_back_to_funding_side() {
        let events = vec![funding(0, dec!(2)), funding(30, dec!(-3))];
        let summary = reconstruct("ENA", &[], &events);

        assert_eq!(summary.status, PositionStatus::Open);
        // most recent event is short
        assert_eq!(summary.side, Some(PositionSide::Short));
        assert_eq!(summary.entry_price, None);
    }

    #[test]
    fn test_no_fills_no_funding_has_no_side() {
        let summary = reconstruct("ENA", &[], &[]);
        assert_eq!(summary.side, None);
        assert_eq!(summary.side_label(), "");
    }

    #[test]
    fn test_epsilon_residual_counts_as_closed() {
        let fills = vec![
            fill("Open Long", dec!(10), dec!(100)),
            fill("Close Long", dec!(9.9995), dec!(110)),
        ];
        let summary = reconstruct("ENA", &fills, &[]);
        assert_eq!(summary.status, PositionStatus::Closed);
    }
}
