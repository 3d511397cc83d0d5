use crate::error::CalculationError;
use crate::indicators::sma;
use crate::models::{Candle, Signal};
use crate::strategy::Strategy;

/// Moving-average crossover strategy.
///
/// Buy while the fast average sits above the slow one, sell while it sits
/// below, hold otherwise. Only the most recent pair of averages matters.
#[derive(Debug, Clone)]
pub struct MaCrossStrategy {
    pub fast_window: usize,
    pub slow_window: usize,
    pub stop_loss_points: f64,
    pub take_profit_points: f64,
}

impl Default for MaCrossStrategy {
    fn default() -> Self {
        Self {
            fast_window: 9,
            slow_window: 21,
            stop_loss_points: 50.0,
            take_profit_points: 100.0,
        }
    }
}

impl Strategy for MaCrossStrategy {
    fn evaluate(&self, candles: &[Candle]) -> Result<Signal, CalculationError> {
        if candles.len() < self.min_candles() {
            return Err(CalculationError::InsufficientData {
                got: candles.len(),
                need: self.min_candles(),
            });
        }

        let fast = sma(candles, self.fast_window);
        let slow = sma(candles, self.slow_window);

        // Slice length >= slow_window guarantees both last values exist.
        let (fast_last, slow_last) = match (fast.last(), slow.last()) {
            (Some(&Some(f)), Some(&Some(s))) => (f, s),
            _ => {
                return Err(CalculationError::InsufficientData {
                    got: candles.len(),
                    need: self.min_candles(),
                })
            }
        };

        Ok(if fast_last > slow_last {
            Signal::Buy
        } else if fast_last < slow_last {
            Signal::Sell
        } else {
            Signal::Hold
        })
    }

    fn name(&self) -> &str {
        "ma_cross"
    }

    fn min_candles(&self) -> usize {
        self.slow_window
    }

    fn stop_loss_points(&self) -> f64 {
        self.stop_loss_points
    }

    fn take_profit_points(&self) -> f64 {
        self.take_profit_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::minutes(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: start + Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_uptrend_signals_buy() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let strategy = MaCrossStrategy::default();
        assert_eq!(strategy.evaluate(&candles_from_closes(&closes)).unwrap(), Signal::Buy);
    }

    #[test]
    fn test_downtrend_signals_sell() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let strategy = MaCrossStrategy::default();
        assert_eq!(strategy.evaluate(&candles_from_closes(&closes)).unwrap(), Signal::Sell);
    }

    #[test]
    fn test_flat_market_holds() {
        let strategy = MaCrossStrategy::default();
        assert_eq!(
            strategy.evaluate(&candles_from_closes(&[1.1; 30])).unwrap(),
            Signal::Hold
        );
    }

    #[test]
    fn test_insufficient_data_is_an_error() {
        let strategy = MaCrossStrategy::default();
        let result = strategy.evaluate(&candles_from_closes(&[1.0; 10]));
        assert!(matches!(
            result,
            Err(CalculationError::InsufficientData { got: 10, need: 21 })
        ));
    }
}
