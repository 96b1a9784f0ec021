pub mod bybit;
pub mod hyperliquid;

pub use bybit::{
    BybitApi, BybitClient, BybitPage, RawBybitClosedPnl, RawBybitExecution,
};
pub use hyperliquid::{HyperliquidApi, HyperliquidClient, RawHlFill, RawHlFunding};
