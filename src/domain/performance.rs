use rust_decimal::Decimal;
use serde::Serialize;

/// Per-instrument performance over the analysis window.
///
/// Commissions follow a single sign convention: negative = cost paid.
/// `funding_total` is positive when the trader received funding on net.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRecord {
    pub coin: String,
    pub side: String,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub position_size: Decimal,
    pub commission_open: Decimal,
    pub commission_close: Decimal,
    pub funding_total: Decimal,
    pub realized_pnl: Decimal,
    pub percentage: Decimal,
    pub duration_hours: Decimal,
    pub apr: Decimal,
    pub apr_excl_commission: Decimal,
    pub breakeven_days: Decimal,
}

/// Grand totals across all analyzed instruments
#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    pub commission_open: Decimal,
    pub commission_close: Decimal,
    pub funding: Decimal,
    pub realized_pnl: Decimal,
}

impl Totals {
    pub fn add(&mut self, record: &PerformanceRecord) {
        self.commission_open += record.commission_open;
        self.commission_close += record.commission_close;
        self.funding += record.funding_total;
        self.realized_pnl += record.realized_pnl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_totals_accumulate() {
        let record = PerformanceRecord {
            coin: "ENA".to_string(),
            side: "Short".to_string(),
            entry_price: Some(dec!(0.40)),
            exit_price: None,
            position_size: dec!(50),
            commission_open: dec!(-1.5),
            commission_close: dec!(-0.5),
            funding_total: dec!(4),
            realized_pnl: dec!(2),
            percentage: dec!(10),
            duration_hours: dec!(48),
            apr: dec!(1825),
            apr_excl_commission: dec!(3650),
            breakeven_days: dec!(1),
        };

        let mut totals = Totals::default();
        totals.add(&record);
        totals.add(&record);
        assert_eq!(totals.commission_open, dec!(-3));
        assert_eq!(totals.commission_close, dec!(-1));
        assert_eq!(totals.funding, dec!(8));
        assert_eq!(totals.realized_pnl, dec!(4));
    }
}
