use thiserror::Error;

/// Backend unreachable or session-level failure. The only error kind that
/// terminates a strategy run.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not connected to the trading backend")]
    NotConnected,

    #[error("already connected to the trading backend")]
    AlreadyConnected,

    #[error("backend transport failure: {0}")]
    Transport(String),

    #[error("backend rejected the request: {0}")]
    Backend(String),
}

/// Candle fetch failed or returned insufficient bars. Non-fatal: the engine
/// tries the next fallback timeframe, then skips the cycle.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unknown or non-selectable symbol {0}")]
    UnknownSymbol(String),

    #[error("insufficient bars for {symbol}: got {got}, need {need}")]
    InsufficientBars {
        symbol: String,
        got: usize,
        need: usize,
    },

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Order rejected by the backend. Non-fatal: logged, cycle continues.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("symbol {0} is not tradable right now")]
    NotTradable(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("invalid order volume {0}")]
    InvalidVolume(f64),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Invalid inputs to risk or indicator math. Non-fatal: order placement is
/// skipped for the cycle.
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("balance must be positive, got {0}")]
    NonPositiveBalance(f64),

    #[error("stop-loss distance must be positive, got {0}")]
    NonPositiveStopDistance(f64),

    #[error("not enough data points: got {got}, need {need}")]
    InsufficientData { got: usize, need: usize },
}

/// `start()` called without its preconditions. Surfaced synchronously to the
/// caller; no state change.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("cannot start: not connected to the trading backend")]
    NotConnected,

    #[error("cannot start: no symbol selected")]
    NoSymbol,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_wraps_connection_error() {
        let err: DataError = ConnectionError::NotConnected.into();
        assert!(matches!(err, DataError::Connection(_)));
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let err = DataError::InsufficientBars {
            symbol: "EURUSD".to_string(),
            got: 10,
            need: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("EURUSD"));
        assert!(msg.contains("10"));
        assert!(msg.contains("100"));
    }
}
