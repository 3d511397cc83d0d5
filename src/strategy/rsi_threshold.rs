use crate::error::CalculationError;
use crate::indicators::rsi;
use crate::models::{Candle, Signal};
use crate::strategy::Strategy;

/// RSI threshold strategy.
///
/// Buy when the latest RSI drops under the oversold level, sell when it
/// rises over the overbought level, hold in between. The RSI series is
/// saturated on zero average loss, so the comparison never sees NaN.
#[derive(Debug, Clone)]
pub struct RsiThresholdStrategy {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub stop_loss_points: f64,
    pub take_profit_points: f64,
}

impl Default for RsiThresholdStrategy {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            stop_loss_points: 50.0,
            take_profit_points: 100.0,
        }
    }
}

impl Strategy for RsiThresholdStrategy {
    fn evaluate(&self, candles: &[Candle]) -> Result<Signal, CalculationError> {
        if candles.len() < self.min_candles() {
            return Err(CalculationError::InsufficientData {
                got: candles.len(),
                need: self.min_candles(),
            });
        }

        let series = rsi(candles, self.period);
        let last = match series.last() {
            Some(&Some(value)) => value,
            _ => {
                return Err(CalculationError::InsufficientData {
                    got: candles.len(),
                    need: self.min_candles(),
                })
            }
        };

        Ok(if last < self.oversold {
            Signal::Buy
        } else if last > self.overbought {
            Signal::Sell
        } else {
            Signal::Hold
        })
    }

    fn name(&self) -> &str {
        "rsi_threshold"
    }

    fn min_candles(&self) -> usize {
        self.period + 1
    }

    fn stop_loss_points(&self) -> f64 {
        self.stop_loss_points
    }

    fn take_profit_points(&self) -> f64 {
        self.take_profit_points
    }
}
