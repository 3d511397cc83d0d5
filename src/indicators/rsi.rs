use crate::models::Candle;

/// Calculate a Relative Strength Index series over candle closes, per
/// Wilder's convention: rolling averages of positive deltas and of the
/// magnitude of negative deltas over `period`, `rs = avg_gain / avg_loss`,
/// `rsi = 100 - 100 / (1 + rs)`.
///
/// The output has the same length as the input; the first `period` entries
/// are `None` (a delta needs two bars, the average needs `period` deltas).
///
/// When `avg_loss` is zero the ratio is undefined. The policy here is
/// deterministic saturation: 100.0 when gains exist, 50.0 when the series
/// is flat over the window. NaN or infinity never appears in the output.
pub fn rsi(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if period == 0 || candles.len() <= period {
        return out;
    }

    // Per-bar gains and losses; index i holds the delta close[i] - close[i-1].
    let mut gains = vec![0.0; candles.len()];
    let mut losses = vec![0.0; candles.len()];
    for i in 1..candles.len() {
        let change = candles[i].close - candles[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = change.abs();
        }
    }

    let mut gain_sum: f64 = gains[1..=period].iter().sum();
    let mut loss_sum: f64 = losses[1..=period].iter().sum();

    for i in period..candles.len() {
        if i > period {
            gain_sum += gains[i] - gains[i - period];
            loss_sum += losses[i] - losses[i - period];
        }

        let avg_gain = gain_sum / period as f64;
        let avg_loss = loss_sum / period as f64;

        out[i] = Some(if avg_loss == 0.0 {
            if avg_gain > 0.0 {
                100.0
            } else {
                50.0
            }
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        });
    }

    out
}
