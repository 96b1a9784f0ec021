//! Report emission: CSV files per record kind plus a stdout summary table.

use chrono::Utc;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::info;

use crate::analysis::AnalysisReport;
use crate::domain::{BybitRecord, Fill, FundingEvent, PerformanceRecord};
use crate::error::Result;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Write the summary and the three raw tables as one timestamped
    /// CSV set; returns the paths created.
    pub fn write(&self, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.out_dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");

        let mut paths = Vec::new();

        paths.push(self.write_csv(
            &format!("funding_analysis_{}_summary.csv", stamp),
            SUMMARY_HEADER,
            report.rows.iter().map(summary_row),
        )?);
        paths.push(self.write_csv(
            &format!("funding_analysis_{}_hyperliquid_fills.csv", stamp),
            FILLS_HEADER,
            report.hl_fills.records.iter().map(fill_row),
        )?);
        paths.push(self.write_csv(
            &format!("funding_analysis_{}_hyperliquid_funding.csv", stamp),
            FUNDING_HEADER,
            report.hl_funding.records.iter().map(funding_row),
        )?);
        paths.push(self.write_csv(
            &format!("funding_analysis_{}_bybit_records.csv", stamp),
            BYBIT_HEADER,
            report.bybit.records.iter().map(bybit_row),
        )?);

        for path in &paths {
            info!("Created {}", path.display());
        }

        Ok(paths)
    }

    fn write_csv(
        &self,
        filename: &str,
        header: &str,
        rows: impl Iterator<Item = String>,
    ) -> Result<PathBuf> {
        let path = self.out_dir.join(filename);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}", header)?;
        for row in rows {
            writeln!(writer, "{}", row)?;
        }
        writer.flush()?;

        Ok(path)
    }
}

const SUMMARY_HEADER: &str = "symbol,side,entry_price,exit_price,position_size,commission_open,commission_close,funding_total,realized_pnl,percentage,duration_hours,apr,apr_excl_commission,breakeven_days";

const FILLS_HEADER: &str = "venue,time,coin,dir,price,size,notional,fee,closed_pnl";

const FUNDING_HEADER: &str = "venue,time,coin,size,side,payment,rate";

const BYBIT_HEADER: &str = "type,time,symbol,amount,exec_id,order_id,side,quantity,price,realized_pnl";

fn summary_row(record: &PerformanceRecord) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        record.coin,
        record.side,
        opt_decimal(record.entry_price),
        opt_decimal(record.exit_price),
        record.position_size,
        record.commission_open,
        record.commission_close,
        record.funding_total,
        record.realized_pnl,
        record.percentage,
        record.duration_hours,
        record.apr,
        record.apr_excl_commission,
        record.breakeven_days,
    )
}

fn fill_row(fill: &Fill) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{}",
        fill.venue,
        fill.time.format(TIME_FORMAT),
        fill.coin,
        fill.raw_direction,
        fill.price,
        fill.size,
        fill.notional,
        fill.fee,
        fill.closed_pnl,
    )
}

fn funding_row(event: &FundingEvent) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        event.venue,
        event.time.format(TIME_FORMAT),
        event.coin,
        event.size,
        event.side_label(),
        event.payment,
        event.rate,
    )
}

fn bybit_row(record: &BybitRecord) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{}",
        record.kind,
        record.time.format(TIME_FORMAT),
        record.symbol,
        record.amount,
        record.exec_id,
        record.order_id,
        record.side,
        record.quantity,
        record.price,
        record.realized_pnl,
    )
}

fn opt_decimal(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "Exit")]
    exit: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Comm (Open)")]
    commission_open: String,
    #[tabled(rename = "Comm (Close)")]
    commission_close: String,
    #[tabled(rename = "Funding")]
    funding: String,
    #[tabled(rename = "PnL")]
    pnl: String,
    #[tabled(rename = "Pct")]
    percentage: String,
    #[tabled(rename = "APR")]
    apr: String,
    #[tabled(rename = "Breakeven (d)")]
    breakeven: String,
}

impl From<&PerformanceRecord> for SummaryRow {
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            symbol: record.coin.clone(),
            side: record.side.clone(),
            entry: opt_decimal(record.entry_price),
            exit: opt_decimal(record.exit_price),
            size: record.position_size.to_string(),
            commission_open: format!("{:.6}", record.commission_open),
            commission_close: format!("{:.6}", record.commission_close),
            funding: format!("{:.6}", record.funding_total),
            pnl: format!("{:.6}", record.realized_pnl),
            percentage: format!("{:.4}", record.percentage),
            apr: format!("{:.4}", record.apr),
            breakeven: format!("{:.2}", record.breakeven_days),
        }
    }
}

/// Render the summary table and totals to stdout.
pub fn print_summary(report: &AnalysisReport) {
    println!(
        "\nSummary {} to {}:",
        report.window.start.format(TIME_FORMAT),
        report.window.end.format(TIME_FORMAT)
    );

    if report.rows.is_empty() {
        println!("  (no instruments with data)");
        return;
    }

    let rows: Vec<SummaryRow> = report.rows.iter().map(SummaryRow::from).collect();
    println!("{}", Table::new(rows));

    println!("Totals:");
    println!("  Open commissions:  {:.6}", report.totals.commission_open);
    println!("  Close commissions: {:.6}", report.totals.commission_close);
    println!("  Funding:           {:.6}", report.totals.funding);
    println!("  Realized PnL:      {:.6}", report.totals.realized_pnl);
}
