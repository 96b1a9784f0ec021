use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Net exposure direction of a reconstructed position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "Long",
            Self::Short => "Short",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Net position reconstructed from one instrument's fills within the window
#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    pub coin: String,
    /// Signed sum of position-changing fills
    pub net_size: Decimal,
    pub status: PositionStatus,
    /// Absent when no fills and no funding exist to infer a side from
    pub side: Option<PositionSide>,
    /// Quantity-weighted average over opening fills; absent without opens
    pub entry_price: Option<Decimal>,
    /// Quantity-weighted average over closing fills; present only when the
    /// position ended closed
    pub exit_price: Option<Decimal>,
    /// Fills whose direction tag could not be decoded, excluded from
    /// accounting
    pub unknown_fills: usize,
}

impl PositionSummary {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn size(&self) -> Decimal {
        self.net_size.abs()
    }

    /// Human-readable side, e.g. "Long" or "Short (closed)"
    pub fn side_label(&self) -> String {
        match (self.side, self.status) {
            (Some(side), PositionStatus::Open) => side.to_string(),
            (Some(side), PositionStatus::Closed) => format!("{} (closed)", side),
            (None, _) => String::new(),
        }
    }
}
