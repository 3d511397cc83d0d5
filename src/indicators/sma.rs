use crate::models::Candle;

/// Calculate a Simple Moving Average series over candle closes.
///
/// The output has the same length as the input; the first `window - 1`
/// entries are `None` because insufficient history exists there.
pub fn sma(candles: &[Candle], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if window == 0 || candles.len() < window {
        return out;
    }

    // Rolling sum over the trailing window.
    let mut sum: f64 = candles[..window].iter().map(|c| c.close).sum();
    out[window - 1] = Some(sum / window as f64);

    for i in window..candles.len() {
        sum += candles[i].close - candles[i - window].close;
        out[i] = Some(sum / window as f64);
    }

    out
}
