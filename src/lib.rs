pub mod adapters;
pub mod analysis;
pub mod cli;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod report;

pub use analysis::{AnalysisReport, Analyzer};
pub use collector::{Extraction, FixedDelay, NoDelay, RateLimiter};
pub use config::{AppConfig, NotionalTable};
pub use domain::{
    AnalysisWindow, BybitRecord, BybitRecordKind, Fill, FillDirection, FundingEvent,
    PerformanceRecord, PositionSide, PositionStatus, PositionSummary, Totals, VenueKind,
};
pub use error::{CarryError, Result};
pub use report::ReportWriter;
