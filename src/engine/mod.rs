// Strategy engine: the cyclic fetch -> indicators -> signal -> sizing ->
// order loop, run by a single worker task per engine.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::connector::{MarketConnector, OrderRequest};
use crate::error::{ConnectionError, DataError, OrderError, PreconditionError};
use crate::models::{Candle, OrderSide, Signal, Statistics, StrategyState, Timeframe};
use crate::risk::{lot_size, LotSpec};
use crate::strategy::{Strategy, StrategyKind};

/// Message severity for presentation-layer notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One-way notification from the engine to the presentation layer. The
/// presentation side owns no trading state; it only renders these.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Message { text: String, severity: Severity },
    Stats { profit: f64, loss: f64 },
}

/// Engine tuning knobs, normally filled in from `Settings`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Risk per order, percent of balance.
    pub risk_percent: f64,
    /// Candles requested per fetch.
    pub candle_count: usize,
    /// Ordered fallback list; the first timeframe yielding enough bars wins.
    pub timeframes: Vec<Timeframe>,
    /// Pause between cycles.
    pub poll_interval: Duration,
    /// Longer pause after a skipped cycle.
    pub backoff_interval: Duration,
    pub lot_spec: LotSpec,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_percent: 1.0,
            candle_count: 100,
            timeframes: vec![Timeframe::M1, Timeframe::M5, Timeframe::M15],
            poll_interval: Duration::from_secs(1),
            backoff_interval: Duration::from_secs(5),
            lot_spec: LotSpec::default(),
        }
    }
}

/// Owns the polling loop: pulls candles through a `MarketConnector`, feeds
/// them to the indicators, derives a signal, sizes and places orders, and
/// republishes running profit/loss statistics.
///
/// At most one worker is active per engine; `start` fully stops any
/// existing run before launching a new one.
pub struct StrategyEngine<C: MarketConnector + 'static> {
    connector: Arc<C>,
    config: EngineConfig,
    events: mpsc::UnboundedSender<EngineEvent>,
    stats: Arc<Mutex<Statistics>>,
    running: Arc<AtomicBool>,
    run: tokio::sync::Mutex<Option<RunHandle>>,
}

struct RunHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<C: MarketConnector + 'static> StrategyEngine<C> {
    /// Build an engine around a shared connector. Returns the engine and
    /// the event stream for the presentation layer.
    pub fn new(
        connector: Arc<C>,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                connector,
                config,
                events,
                stats: Arc::new(Mutex::new(Statistics::default())),
                running: Arc::new(AtomicBool::new(false)),
                run: tokio::sync::Mutex::new(None),
            },
            receiver,
        )
    }

    pub fn state(&self) -> StrategyState {
        if self.running.load(Ordering::SeqCst) {
            StrategyState::Running
        } else {
            StrategyState::Idle
        }
    }

    /// Snapshot of the current run's statistics.
    pub fn stats(&self) -> Statistics {
        *self.stats.lock().unwrap()
    }

    /// Start a strategy run. Requires a connected backend and a selected
    /// symbol; any existing run is fully stopped first and statistics are
    /// reset.
    pub async fn start(&self, symbol: &str, kind: StrategyKind) -> Result<(), PreconditionError> {
        if !self.connector.is_connected() {
            return Err(PreconditionError::NotConnected);
        }
        if symbol.trim().is_empty() {
            return Err(PreconditionError::NoSymbol);
        }

        self.stop().await;

        *self.stats.lock().unwrap() = Statistics::default();
        self.running.store(true, Ordering::SeqCst);

        let (cancel, cancel_rx) = watch::channel(false);
        let worker = Worker {
            connector: self.connector.clone(),
            config: self.config.clone(),
            symbol: symbol.to_string(),
            strategy: kind.build(),
            events: self.events.clone(),
            stats: self.stats.clone(),
            running: self.running.clone(),
        };

        tracing::info!(symbol, strategy = %kind, "starting strategy run");
        self.emit(
            Severity::Info,
            format!("strategy {} started on {}", kind, symbol),
        );

        let task = tokio::spawn(worker.run(cancel_rx));
        *self.run.lock().await = Some(RunHandle { cancel, task });
        Ok(())
    }

    /// Stop the active run, if any. Blocks until the worker has fully
    /// exited, so no stray cycle runs after this returns. Safe to call
    /// repeatedly and from any state.
    pub async fn stop(&self) {
        let handle = self.run.lock().await.take();
        if let Some(RunHandle { cancel, task }) = handle {
            let _ = cancel.send(true);
            if let Err(e) = task.await {
                tracing::error!("strategy worker panicked: {}", e);
            }
            tracing::info!("strategy run stopped");
            self.emit(Severity::Info, "strategy stopped".to_string());
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn emit(&self, severity: Severity, text: String) {
        let _ = self.events.send(EngineEvent::Message { text, severity });
    }
}

enum CycleStatus {
    Completed,
    Skipped,
}

struct Worker<C: MarketConnector> {
    connector: Arc<C>,
    config: EngineConfig,
    symbol: String,
    strategy: Box<dyn Strategy>,
    events: mpsc::UnboundedSender<EngineEvent>,
    stats: Arc<Mutex<Statistics>>,
    running: Arc<AtomicBool>,
}

impl<C: MarketConnector> Worker<C> {
    async fn run(self, mut cancel: watch::Receiver<bool>) {
        loop {
            if *cancel.borrow() {
                break;
            }

            let pause = match self.cycle().await {
                Ok(CycleStatus::Completed) => self.config.poll_interval,
                Ok(CycleStatus::Skipped) => self.config.backoff_interval,
                Err(e) => {
                    // Only a lost backend terminates the run.
                    tracing::error!(symbol = %self.symbol, "backend connection lost: {}", e);
                    self.emit(
                        Severity::Error,
                        format!("strategy halted, connection lost: {}", e),
                    );
                    break;
                }
            };

            // Cancellation latency is bounded by one pause.
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancel.changed() => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
    }

    /// One cycle of the loop. Data, order, and calculation failures are
    /// logged and degrade to a skipped cycle; connection failures bubble up
    /// and end the run.
    async fn cycle(&self) -> Result<CycleStatus, ConnectionError> {
        let candles = match self.fetch_with_fallback().await? {
            Some(candles) => candles,
            None => {
                tracing::warn!(
                    symbol = %self.symbol,
                    "no timeframe returned enough bars, skipping cycle"
                );
                self.emit(
                    Severity::Warning,
                    format!("no data for {}, cycle skipped", self.symbol),
                );
                return Ok(CycleStatus::Skipped);
            }
        };

        let signal = match self.strategy.evaluate(&candles) {
            Ok(signal) => signal,
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, "signal evaluation failed: {}", e);
                self.emit(Severity::Warning, format!("signal unavailable: {}", e));
                return Ok(CycleStatus::Skipped);
            }
        };
        tracing::debug!(symbol = %self.symbol, ?signal, "cycle signal");

        if signal != Signal::Hold {
            self.try_place_order(signal, &candles).await?;
        }

        let (profit, loss) = self.connector.profit_loss().await?;
        {
            let mut stats = self.stats.lock().unwrap();
            stats.profit = profit;
            stats.loss = loss;
        }
        let _ = self.events.send(EngineEvent::Stats { profit, loss });

        Ok(CycleStatus::Completed)
    }

    /// Walk the ordered timeframe fallback list; the first fetch returning
    /// at least the strategy's minimum bars wins.
    async fn fetch_with_fallback(&self) -> Result<Option<Vec<Candle>>, ConnectionError> {
        let need = self.strategy.min_candles();

        for &timeframe in &self.config.timeframes {
            match self
                .connector
                .fetch_candles(&self.symbol, timeframe, self.config.candle_count)
                .await
            {
                Ok(candles) if candles.len() >= need => {
                    tracing::debug!(symbol = %self.symbol, %timeframe, "candles fetched");
                    return Ok(Some(candles));
                }
                Ok(candles) => {
                    tracing::warn!(
                        symbol = %self.symbol,
                        %timeframe,
                        got = candles.len(),
                        need,
                        "not enough bars, trying next timeframe"
                    );
                }
                Err(DataError::Connection(e)) => return Err(e),
                Err(e) => {
                    tracing::warn!(symbol = %self.symbol, %timeframe, "fetch failed: {}", e);
                }
            }
        }

        Ok(None)
    }

    /// Size and submit one order for a non-hold signal. Rejections are
    /// logged and non-fatal; at most one order leaves per cycle.
    async fn try_place_order(
        &self,
        signal: Signal,
        candles: &[Candle],
    ) -> Result<(), ConnectionError> {
        let account = self.connector.account_snapshot().await?;

        let lot = match lot_size(
            self.config.risk_percent,
            account.balance,
            self.strategy.stop_loss_points(),
            &self.config.lot_spec,
        ) {
            Ok(lot) => lot,
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, "lot sizing failed: {}", e);
                self.emit(Severity::Warning, format!("order skipped: {}", e));
                return Ok(());
            }
        };

        let tradable = match self.connector.can_trade(&self.symbol).await {
            Ok(tradable) => tradable,
            Err(DataError::Connection(e)) => return Err(e),
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, "tradability check failed: {}", e);
                return Ok(());
            }
        };
        if !tradable {
            tracing::info!(symbol = %self.symbol, "symbol not tradable, order skipped");
            return Ok(());
        }

        let close = match candles.last() {
            Some(candle) => candle.close,
            None => return Ok(()),
        };
        let sl_offset = self.config.lot_spec.points_to_price(self.strategy.stop_loss_points());
        let tp_offset = self
            .config
            .lot_spec
            .points_to_price(self.strategy.take_profit_points());

        let (side, stop_loss, take_profit) = match signal {
            Signal::Buy => (OrderSide::Buy, close - sl_offset, close + tp_offset),
            Signal::Sell => (OrderSide::Sell, close + sl_offset, close - tp_offset),
            Signal::Hold => return Ok(()),
        };

        let request = OrderRequest {
            symbol: self.symbol.clone(),
            side,
            volume: lot,
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
        };

        match self.connector.place_order(request).await {
            Ok(order) => {
                tracing::info!(
                    symbol = %self.symbol,
                    side = %order.side,
                    volume = order.volume,
                    ticket = order.ticket,
                    price = order.entry_price,
                    "order placed"
                );
                self.emit(
                    Severity::Info,
                    format!(
                        "{} {:.2} {} @ {:.5} (ticket {})",
                        order.side, order.volume, order.symbol, order.entry_price, order.ticket
                    ),
                );
            }
            Err(OrderError::Connection(e)) => return Err(e),
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, "order rejected: {}", e);
                self.emit(Severity::Warning, format!("order rejected: {}", e));
            }
        }

        Ok(())
    }

    fn emit(&self, severity: Severity, text: String) {
        let _ = self.events.send(EngineEvent::Message { text, severity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::SimulatedConnector;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            poll_interval: Duration::from_millis(5),
            backoff_interval: Duration::from_millis(10),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_requires_connection() {
        let sim = Arc::new(SimulatedConnector::new(1));
        let (engine, _events) = StrategyEngine::new(sim, fast_config());

        let result = engine.start("EURUSD", StrategyKind::MaCross).await;
        assert!(matches!(result, Err(PreconditionError::NotConnected)));
        assert_eq!(engine.state(), StrategyState::Idle);
    }

    #[tokio::test]
    async fn test_start_requires_symbol() {
        let sim = Arc::new(SimulatedConnector::new(1));
        sim.connect().await.unwrap();
        let (engine, _events) = StrategyEngine::new(sim, fast_config());

        let result = engine.start("  ", StrategyKind::MaCross).await;
        assert!(matches!(result, Err(PreconditionError::NoSymbol)));
        assert_eq!(engine.state(), StrategyState::Idle);
    }

    #[tokio::test]
    async fn test_double_stop_is_idempotent() {
        let sim = Arc::new(SimulatedConnector::new(1));
        sim.connect().await.unwrap();
        let (engine, _events) = StrategyEngine::new(sim, fast_config());

        engine.start("EURUSD", StrategyKind::MaCross).await.unwrap();
        engine.stop().await;
        assert_eq!(engine.state(), StrategyState::Idle);
        engine.stop().await;
        assert_eq!(engine.state(), StrategyState::Idle);
    }

    #[tokio::test]
    async fn test_restart_keeps_single_worker() {
        let sim = Arc::new(SimulatedConnector::new(1));
        sim.connect().await.unwrap();
        let (engine, _events) = StrategyEngine::new(sim, fast_config());

        engine.start("EURUSD", StrategyKind::MaCross).await.unwrap();
        // Second start must fully replace the first run.
        engine.start("GBPUSD", StrategyKind::RsiThreshold).await.unwrap();
        assert_eq!(engine.state(), StrategyState::Running);

        engine.stop().await;
        assert_eq!(engine.state(), StrategyState::Idle);
    }

    #[tokio::test]
    async fn test_run_publishes_stats_events() {
        let sim = Arc::new(SimulatedConnector::new(9));
        sim.connect().await.unwrap();
        let (engine, mut events) = StrategyEngine::new(sim, fast_config());

        engine.start("EURUSD", StrategyKind::MaCross).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.stop().await;

        let mut saw_stats = false;
        while let Ok(event) = events.try_recv() {
            if let EngineEvent::Stats { profit, loss } = event {
                assert!(profit >= 0.0 && loss >= 0.0);
                saw_stats = true;
            }
        }
        assert!(saw_stats, "at least one completed cycle must publish stats");
    }

    #[tokio::test]
    async fn test_stats_reset_on_start() {
        let sim = Arc::new(SimulatedConnector::new(9));
        sim.connect().await.unwrap();
        let (engine, _events) = StrategyEngine::new(sim, fast_config());

        engine.start("EURUSD", StrategyKind::MaCross).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.stop().await;

        // Leftovers from the previous run must not leak into the next one.
        *engine.stats.lock().unwrap() = Statistics {
            profit: 42.0,
            loss: 7.0,
        };

        engine.start("EURUSD", StrategyKind::MaCross).await.unwrap();
        let stats = engine.stats();
        assert_eq!(stats.profit, 0.0);
        assert_eq!(stats.loss, 0.0);

        engine.stop().await;
        assert_eq!(engine.state(), StrategyState::Idle);
    }

    #[tokio::test]
    async fn test_halted_symbol_places_no_orders() {
        let sim = Arc::new(SimulatedConnector::new(9));
        sim.connect().await.unwrap();
        sim.set_tradable("EURUSD", false);
        let (engine, _events) = StrategyEngine::new(sim.clone(), fast_config());

        engine.start("EURUSD", StrategyKind::MaCross).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.stop().await;

        assert_eq!(sim.open_order_count(), 0);
    }
}
