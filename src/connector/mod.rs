// Market backend abstraction.
//
// The engine only ever talks to a `MarketConnector`; whether that is the
// live terminal gateway or the in-memory simulator is decided at startup.

pub mod live;
pub mod sim;

use async_trait::async_trait;

use crate::error::{ConnectionError, DataError, OrderError};
use crate::models::{AccountSnapshot, Candle, Order, OrderSide, SymbolDescriptor, Timeframe};

pub use live::LiveConnector;
pub use sim::SimulatedConnector;

/// Parameters for a new order. Stop-loss and take-profit are absolute
/// prices, already derived from the entry direction.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

/// Abstraction over a trading backend.
///
/// All operations are potentially blocking (network or inter-process calls)
/// and must only run on the engine's worker while a strategy is active;
/// `is_connected` is the one cheap read intended for presentation code.
#[async_trait]
pub trait MarketConnector: Send + Sync {
    /// Establish the backend session. Connecting while already connected is
    /// a deterministic error (`ConnectionError::AlreadyConnected`).
    async fn connect(&self) -> Result<(), ConnectionError>;

    /// Tear down the backend session. Always safe: disconnecting while
    /// already disconnected succeeds as a no-op.
    async fn disconnect(&self) -> Result<(), ConnectionError>;

    /// Connection flag, readable without blocking.
    fn is_connected(&self) -> bool;

    /// Fresh account state. Fails when not connected.
    async fn account_snapshot(&self) -> Result<AccountSnapshot, ConnectionError>;

    /// Instrument catalog, ordered by (category, symbol) ascending.
    async fn available_symbols(&self) -> Result<Vec<SymbolDescriptor>, ConnectionError>;

    /// Fetch exactly `count` candles, oldest first. Fails on unknown symbol,
    /// fewer than `count` available bars, or a missing connection.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError>;

    /// Whether the backend currently accepts orders for `symbol`.
    async fn can_trade(&self, symbol: &str) -> Result<bool, DataError>;

    /// Submit an order. Fails when the symbol is not tradable or the backend
    /// rejects the request.
    async fn place_order(&self, request: OrderRequest) -> Result<Order, OrderError>;

    /// Cumulative closed (profit, loss) magnitudes for this session.
    async fn profit_loss(&self) -> Result<(f64, f64), ConnectionError>;
}
