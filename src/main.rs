use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use carry::adapters::{BybitClient, HyperliquidClient};
use carry::analysis::Analyzer;
use carry::cli::{Cli, Commands};
use carry::collector::FixedDelay;
use carry::config::AppConfig;
use carry::domain::AnalysisWindow;
use carry::error::Result;
use carry::report::{print_summary, ReportWriter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            start,
            end,
            coins,
            out,
        } => run_analyze(&cli.config, &start, &end, coins, out).await?,
    }

    Ok(())
}

async fn run_analyze(
    config_path: &str,
    start: &str,
    end: &str,
    coins: Option<Vec<String>>,
    out: Option<String>,
) -> Result<()> {
    let mut config = AppConfig::load_from(config_path)?;
    config.bybit.apply_env_credentials();

    let coins = coins.unwrap_or_else(|| config.analysis.coins.clone());
    let window = AnalysisWindow::parse(start, end, coins)?;
    if window.coins.is_empty() {
        warn!("No target coins configured; nothing to analyze");
        return Ok(());
    }

    info!(
        "Starting funding arbitrage analysis: {} to {}, coins: {}",
        window.start,
        window.end,
        window.coins.join(", ")
    );

    let hyperliquid = HyperliquidClient::new(&config.hyperliquid)?;
    let bybit = BybitClient::new(&config.bybit, config.extract.page_limit)?;
    let limiter = FixedDelay::from_millis(config.extract.page_delay_ms);

    let analyzer = Analyzer::new(&hyperliquid, &bybit, &limiter, &config.analysis.notional);
    let report = analyzer.run(&window).await;

    if !report.is_complete() {
        warn!("Extraction was incomplete; the report may be missing records");
    }

    print_summary(&report);

    let out_dir = out.unwrap_or(config.report.out_dir);
    let writer = ReportWriter::new(&out_dir);
    let paths = writer.write(&report)?;
    info!("Report written: {} files in {}", paths.len(), out_dir);

    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,carry=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
