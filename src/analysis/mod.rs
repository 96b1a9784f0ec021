pub mod analyzer;
pub mod attribution;
pub mod metrics;
pub mod position;

pub use analyzer::{AnalysisReport, Analyzer};
pub use attribution::{attribute, Attribution};
pub use metrics::{breakeven_days, performance, UNRECOVERABLE_DAYS};
pub use position::{reconstruct, CLOSE_EPSILON};
