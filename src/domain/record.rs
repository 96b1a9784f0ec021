use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Venue a record originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueKind {
    Hyperliquid,
    Bybit,
}

impl VenueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hyperliquid => "hyperliquid",
            Self::Bybit => "bybit",
        }
    }
}

impl std::fmt::Display for VenueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directional tag of a fill, decoded once at ingestion.
///
/// Venue tags like "Open Long" or "Close Short" are matched by substring,
/// case-insensitive, with "buy"/"sell" accepted as long/short synonyms.
/// Tags that match neither pattern decode to `Unknown` and are excluded
/// from position accounting (callers count them separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillDirection {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
    Unknown,
}

impl FillDirection {
    pub fn parse(raw: &str) -> Self {
        let tag = raw.to_ascii_lowercase();
        let long = tag.contains("long") || tag.contains("buy");
        let short = tag.contains("short") || tag.contains("sell");

        if tag.contains("open") {
            if long {
                Self::OpenLong
            } else if short {
                Self::OpenShort
            } else {
                Self::Unknown
            }
        } else if tag.contains("close") {
            if long {
                Self::CloseLong
            } else if short {
                Self::CloseShort
            } else {
                Self::Unknown
            }
        } else {
            Self::Unknown
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::OpenLong | Self::OpenShort)
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Self::CloseLong | Self::CloseShort)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Self::OpenLong | Self::CloseLong)
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Self::OpenShort | Self::CloseShort)
    }

    /// Contribution of a fill of `size` to the running signed position.
    ///
    /// Opening long and closing short add exposure; opening short and
    /// closing long remove it. Unknown tags contribute nothing.
    pub fn signed_delta(&self, size: Decimal) -> Decimal {
        match self {
            Self::OpenLong | Self::CloseShort => size,
            Self::OpenShort | Self::CloseLong => -size,
            Self::Unknown => Decimal::ZERO,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenLong => "Open Long",
            Self::OpenShort => "Open Short",
            Self::CloseLong => "Close Long",
            Self::CloseShort => "Close Short",
            Self::Unknown => "Unknown",
        }
    }
}

/// A single executed trade leg
#[derive(Debug, Clone, Serialize)]
pub struct Fill {
    pub venue: VenueKind,
    pub coin: String,
    pub time: NaiveDateTime,
    pub direction: FillDirection,
    /// Venue-native tag the direction was decoded from, kept for reporting
    pub raw_direction: String,
    pub price: Decimal,
    pub size: Decimal,
    /// price * size at execution
    pub notional: Decimal,
    /// Fee charged by the venue; positive = cost to the trader
    pub fee: Decimal,
    pub closed_pnl: Decimal,
}

/// A periodic funding payment tied to holding a position
#[derive(Debug, Clone, Serialize)]
pub struct FundingEvent {
    pub venue: VenueKind,
    pub coin: String,
    pub time: NaiveDateTime,
    /// Position size at funding time; sign indicates side
    pub size: Decimal,
    /// Positive = received by the trader
    pub payment: Decimal,
    pub rate: Decimal,
}

impl FundingEvent {
    pub fn side_label(&self) -> &'static str {
        if self.size > Decimal::ZERO {
            "Long"
        } else {
            "Short"
        }
    }
}

/// Kind of a combined Bybit history record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BybitRecordKind {
    Trade,
    FundingFee,
    Commission,
}

impl BybitRecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "TRADE",
            Self::FundingFee => "FUNDING_FEE",
            Self::Commission => "COMMISSION",
        }
    }
}

impl std::fmt::Display for BybitRecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of Bybit execution/funding/closed-PnL history.
///
/// Bybit's fee structure does not distinguish open/close legs, so trades,
/// funding fees and closed-PnL rows share one record shape the way the
/// venue's execution list returns them.
#[derive(Debug, Clone, Serialize)]
pub struct BybitRecord {
    pub kind: BybitRecordKind,
    pub time: NaiveDateTime,
    pub symbol: String,
    /// Trade rows: commission, kept positive. Funding rows: signed amount,
    /// positive = received. Commission (closed-PnL) rows: zero.
    pub amount: Decimal,
    pub exec_id: String,
    pub order_id: String,
    pub side: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub realized_pnl: Decimal,
}

impl BybitRecord {
    /// Identity key for deduplication across overlapping cursor pages.
    pub fn dedup_key(&self) -> String {
        if self.exec_id.is_empty() {
            format!(
                "{}_{}_{}",
                self.kind,
                self.time.and_utc().timestamp_millis(),
                self.symbol
            )
        } else {
            format!("{}_{}", self.kind, self.exec_id)
        }
    }
}
