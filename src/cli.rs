use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "carry")]
#[command(version = "0.1.0")]
#[command(about = "Funding-rate arbitrage PnL reconciliation across Hyperliquid and Bybit", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile fills and funding over a window and emit the report
    Analyze {
        /// Window start, "YYYY-MM-DD HH:MM" (UTC)
        #[arg(long)]
        start: String,
        /// Window end, "YYYY-MM-DD HH:MM" (UTC)
        #[arg(long)]
        end: String,
        /// Target coins, comma separated (defaults to the config list)
        #[arg(long, value_delimiter = ',')]
        coins: Option<Vec<String>>,
        /// Output directory for the CSV report (defaults to the config value)
        #[arg(long)]
        out: Option<String>,
    },
}
