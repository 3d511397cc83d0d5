use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV bar. Sequences are always oldest-first and immutable once
/// produced by a connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Account state at a single point in time. Never cached across cycles:
/// balance may have changed due to prior orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: i64,
    pub balance: f64,
    pub equity: f64,
}

/// Instrument class, derived from the symbol's naming convention. Used for
/// catalog presentation only, never for trading logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolCategory {
    Currency,
    Metal,
    Index,
    Equity,
    Other,
}

impl SymbolCategory {
    /// Classify a symbol by its naming convention: currency pairs end in a
    /// major currency code, metals contain XAU/XAG, indices and equities
    /// carry INDEX/STOCK markers.
    pub fn from_symbol(symbol: &str) -> Self {
        const CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CHF", "AUD", "CAD", "NZD"];

        if symbol.contains("XAU") || symbol.contains("XAG") {
            SymbolCategory::Metal
        } else if symbol.contains("INDEX") {
            SymbolCategory::Index
        } else if symbol.contains("STOCK") {
            SymbolCategory::Equity
        } else if CURRENCY_CODES.iter().any(|code| symbol.ends_with(code)) {
            SymbolCategory::Currency
        } else {
            SymbolCategory::Other
        }
    }
}

impl fmt::Display for SymbolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolCategory::Currency => "Currency",
            SymbolCategory::Metal => "Metal",
            SymbolCategory::Index => "Index",
            SymbolCategory::Equity => "Equity",
            SymbolCategory::Other => "Other",
        };
        write!(f, "{}", name)
    }
}

/// Catalog entry for a tradable instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDescriptor {
    pub symbol: String,
    pub description: String,
    pub category: SymbolCategory,
}

impl SymbolDescriptor {
    pub fn new(symbol: impl Into<String>, description: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let category = SymbolCategory::from_symbol(&symbol);
        Self {
            symbol,
            description: description.into(),
            category,
        }
    }
}

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// An order accepted by the backend. The ticket is backend-assigned and
/// unique within a connector session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub ticket: u64,
}

/// Trading signal derived from indicator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Candle duration. Ordered fallback lists of these drive the engine's
/// fetch logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        write!(f, "{}", name)
    }
}

/// Cumulative closed profit and loss magnitudes for a strategy run. Both
/// fields only grow within a run; reset when a new run starts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub profit: f64,
    pub loss: f64,
}

/// Engine lifecycle state. At most one run is active per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Idle,
    Running,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_symbol() {
        assert_eq!(
            SymbolCategory::from_symbol("EURUSD"),
            SymbolCategory::Currency
        );
        assert_eq!(SymbolCategory::from_symbol("XAUUSD"), SymbolCategory::Metal);
        assert_eq!(
            SymbolCategory::from_symbol("DE40INDEX"),
            SymbolCategory::Index
        );
        assert_eq!(
            SymbolCategory::from_symbol("AAPLSTOCK"),
            SymbolCategory::Equity
        );
        assert_eq!(SymbolCategory::from_symbol("BTCETH"), SymbolCategory::Other);
    }

    #[test]
    fn test_category_handles_non_ascii_symbols() {
        // Backend-supplied names are not guaranteed to be ASCII; a
        // multi-byte character near the end must not panic the classifier.
        assert_eq!(SymbolCategory::from_symbol("A€B"), SymbolCategory::Other);
        assert_eq!(SymbolCategory::from_symbol("€"), SymbolCategory::Other);
        assert_eq!(SymbolCategory::from_symbol(""), SymbolCategory::Other);
        assert_eq!(
            SymbolCategory::from_symbol("日経INDEX"),
            SymbolCategory::Index
        );
        assert_eq!(
            SymbolCategory::from_symbol("€URUSD"),
            SymbolCategory::Currency
        );
    }

    #[test]
    fn test_category_ordering_for_catalog_sort() {
        // Catalogs sort by (category, symbol); the enum order is the sort order.
        assert!(SymbolCategory::Currency < SymbolCategory::Metal);
        assert!(SymbolCategory::Metal < SymbolCategory::Index);
        assert!(SymbolCategory::Index < SymbolCategory::Equity);
        assert!(SymbolCategory::Equity < SymbolCategory::Other);
    }

    #[test]
    fn test_descriptor_derives_category() {
        let desc = SymbolDescriptor::new("XAGUSD", "Silver vs US Dollar");
        assert_eq!(desc.category, SymbolCategory::Metal);
    }

    #[test]
    fn test_timeframe_minutes() {
        assert_eq!(Timeframe::M1.minutes(), 1);
        assert_eq!(Timeframe::H4.minutes(), 240);
        assert_eq!(Timeframe::M5.to_string(), "M5");
    }
}
