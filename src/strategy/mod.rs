// Trading strategies: a closed set of signal generators the engine is
// generic over.

pub mod ma_cross;
pub mod rsi_threshold;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CalculationError;
use crate::models::{Candle, Signal};

pub use ma_cross::MaCrossStrategy;
pub use rsi_threshold::RsiThresholdStrategy;

/// Signal generator over a candle series.
///
/// Implementations are pure: the signal depends only on the candles passed
/// in, derived from the most recent indicator values.
pub trait Strategy: Send + Sync {
    /// Derive a trading signal from the series.
    fn evaluate(&self, candles: &[Candle]) -> Result<Signal, CalculationError>;

    /// Strategy name for logs and events.
    fn name(&self) -> &str;

    /// Minimum bars the indicator math needs before a signal is defined.
    fn min_candles(&self) -> usize;

    /// Configured stop-loss distance, in points.
    fn stop_loss_points(&self) -> f64;

    /// Configured take-profit distance, in points.
    fn take_profit_points(&self) -> f64;
}

/// The available strategy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MaCross,
    RsiThreshold,
}

impl StrategyKind {
    /// Instantiate the strategy for this kind with its default parameters.
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::MaCross => Box::new(MaCrossStrategy::default()),
            StrategyKind::RsiThreshold => Box::new(RsiThresholdStrategy::default()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::MaCross => write!(f, "ma_cross"),
            StrategyKind::RsiThreshold => write!(f, "rsi_threshold"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ma_cross" => Ok(StrategyKind::MaCross),
            "rsi_threshold" => Ok(StrategyKind::RsiThreshold),
            other => Err(format!(
                "unknown strategy '{}', expected ma_cross or rsi_threshold",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [StrategyKind::MaCross, StrategyKind::RsiThreshold] {
            let parsed: StrategyKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("macd".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_build_produces_matching_strategy() {
        assert_eq!(StrategyKind::MaCross.build().name(), "ma_cross");
        assert_eq!(StrategyKind::RsiThreshold.build().name(), "rsi_threshold");
    }
}
