use crate::error::CalculationError;
use serde::{Deserialize, Serialize};

/// Broker-defined sizing bounds and point scaling for a symbol.
///
/// `point_value` is the monetary value of one point per full lot: 10_000
/// for non-JPY-style pairs. Configurable per symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LotSpec {
    pub min_lot: f64,
    pub max_lot: f64,
    pub point_value: f64,
}

impl Default for LotSpec {
    fn default() -> Self {
        Self {
            min_lot: 0.01,
            max_lot: 100.0,
            point_value: 10_000.0,
        }
    }
}

impl LotSpec {
    /// Price offset equivalent to a stop distance in points.
    pub fn points_to_price(&self, points: f64) -> f64 {
        points / self.point_value
    }
}

/// Map (risk %, balance, stop-loss distance) to an order volume.
///
/// `risk = risk_percent / 100 * balance`, then
/// `lot = risk / (stop_loss_points * point_value)`, clamped to the broker's
/// `[min_lot, max_lot]` bounds. Clamping is part of the contract, not an
/// error.
pub fn lot_size(
    risk_percent: f64,
    balance: f64,
    stop_loss_points: f64,
    spec: &LotSpec,
) -> Result<f64, CalculationError> {
    if balance <= 0.0 {
        return Err(CalculationError::NonPositiveBalance(balance));
    }
    if stop_loss_points <= 0.0 {
        return Err(CalculationError::NonPositiveStopDistance(stop_loss_points));
    }

    let risk_amount = (risk_percent / 100.0) * balance;
    let lot = risk_amount / (stop_loss_points * spec.point_value);

    Ok(lot.clamp(spec.min_lot, spec.max_lot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_size_clamps_to_min() {
        // (0.01 * 10000) / (50 * 10000) = 0.0002, clamped up to 0.01.
        let lot = lot_size(1.0, 10_000.0, 50.0, &LotSpec::default()).unwrap();
        assert_eq!(lot, 0.01);
    }

    #[test]
    fn test_lot_size_clamps_to_max() {
        let spec = LotSpec {
            point_value: 1.0,
            ..LotSpec::default()
        };
        let lot = lot_size(50.0, 1_000_000.0, 1.0, &spec).unwrap();
        assert_eq!(lot, spec.max_lot);
    }

    #[test]
    fn test_lot_size_unclamped_value() {
        let spec = LotSpec {
            point_value: 10.0,
            ..LotSpec::default()
        };
        // risk = 200, divisor = 50 * 10 = 500 -> 0.4 lots
        let lot = lot_size(2.0, 10_000.0, 50.0, &spec).unwrap();
        assert!((lot - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_lot_size_monotone_in_balance() {
        let spec = LotSpec {
            point_value: 10.0,
            ..LotSpec::default()
        };
        let mut previous = 0.0;
        for balance in [1_000.0, 10_000.0, 50_000.0, 250_000.0] {
            let lot = lot_size(1.0, balance, 50.0, &spec).unwrap();
            assert!(lot >= previous, "larger balance must not shrink the lot");
            previous = lot;
        }
    }

    #[test]
    fn test_lot_size_monotone_in_stop_distance() {
        let spec = LotSpec {
            point_value: 10.0,
            ..LotSpec::default()
        };
        let mut previous = f64::MAX;
        for points in [10.0, 25.0, 50.0, 200.0] {
            let lot = lot_size(1.0, 10_000.0, points, &spec).unwrap();
            assert!(lot <= previous, "wider stop must not grow the lot");
            previous = lot;
        }
    }

    #[test]
    fn test_lot_size_rejects_bad_inputs() {
        let spec = LotSpec::default();
        assert!(matches!(
            lot_size(1.0, 0.0, 50.0, &spec),
            Err(CalculationError::NonPositiveBalance(_))
        ));
        assert!(matches!(
            lot_size(1.0, -100.0, 50.0, &spec),
            Err(CalculationError::NonPositiveBalance(_))
        ));
        assert!(matches!(
            lot_size(1.0, 10_000.0, 0.0, &spec),
            Err(CalculationError::NonPositiveStopDistance(_))
        ));
    }

    #[test]
    fn test_lot_size_within_bounds() {
        let spec = LotSpec::default();
        for risk in [0.1, 1.0, 5.0, 100.0] {
            for balance in [10.0, 10_000.0, 1_000_000_000.0] {
                for points in [0.1, 50.0, 10_000.0] {
                    let lot = lot_size(risk, balance, points, &spec).unwrap();
                    assert!(lot >= spec.min_lot && lot <= spec.max_lot);
                }
            }
        }
    }

    #[test]
    fn test_points_to_price() {
        let spec = LotSpec::default();
        assert!((spec.points_to_price(50.0) - 0.005).abs() < 1e-12);
    }
}
