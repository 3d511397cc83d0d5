// Technical indicators
//
// Pure functions over candle slices: same input always yields the same
// output series, no state retained between calls.

pub mod rsi;
pub mod sma;

pub use rsi::rsi;
pub use sma::sma;
