use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::connector::{MarketConnector, OrderRequest};
use crate::error::{ConnectionError, DataError, OrderError};
use crate::models::{AccountSnapshot, Candle, Order, OrderSide, SymbolDescriptor, Timeframe};
use crate::risk::LotSpec;

const STARTING_BALANCE: f64 = 10_000.0;
const SIM_ACCOUNT_ID: i64 = 77_000_001;

/// In-memory synthetic backend: a fixed instrument catalog, a seeded
/// random-walk candle generator, and an order ledger with sequential
/// tickets. Used for dry runs and as the reference implementation in tests.
pub struct SimulatedConnector {
    connected: AtomicBool,
    state: Mutex<SimState>,
    catalog: Vec<SymbolDescriptor>,
}

struct SimState {
    rng: StdRng,
    balance: f64,
    equity: f64,
    profit: f64,
    loss: f64,
    next_ticket: u64,
    /// Open orders waiting for a stop or target to trigger.
    open_orders: Vec<Order>,
    /// Last generated close per symbol, the anchor for the next walk.
    last_price: HashMap<String, f64>,
    /// Symbols with trading suspended (empty by default; tests flip this).
    halted: Vec<String>,
    lot_spec: LotSpec,
}

impl SimulatedConnector {
    pub fn new(seed: u64) -> Self {
        let mut catalog = vec![
            SymbolDescriptor::new("EURUSD", "Euro vs US Dollar"),
            SymbolDescriptor::new("GBPUSD", "Great Britain Pound vs US Dollar"),
            SymbolDescriptor::new("USDJPY", "US Dollar vs Japanese Yen"),
            SymbolDescriptor::new("USDCHF", "US Dollar vs Swiss Franc"),
            SymbolDescriptor::new("AUDUSD", "Australian Dollar vs US Dollar"),
            SymbolDescriptor::new("NZDUSD", "New Zealand Dollar vs US Dollar"),
            SymbolDescriptor::new("USDCAD", "US Dollar vs Canadian Dollar"),
            SymbolDescriptor::new("EURGBP", "Euro vs Great Britain Pound"),
            SymbolDescriptor::new("XAUUSD", "Gold vs US Dollar"),
            SymbolDescriptor::new("DE40INDEX", "Germany 40 Index"),
            SymbolDescriptor::new("AAPLSTOCK", "Apple Inc."),
        ];
        catalog.sort_by(|a, b| (a.category, &a.symbol).cmp(&(b.category, &b.symbol)));

        Self {
            connected: AtomicBool::new(false),
            state: Mutex::new(SimState {
                rng: StdRng::seed_from_u64(seed),
                balance: STARTING_BALANCE,
                equity: STARTING_BALANCE,
                profit: 0.0,
                loss: 0.0,
                next_ticket: 1,
                open_orders: Vec::new(),
                last_price: HashMap::new(),
                halted: Vec::new(),
                lot_spec: LotSpec::default(),
            }),
            catalog,
        }
    }

    fn ensure_connected(&self) -> Result<(), ConnectionError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectionError::NotConnected)
        }
    }

    fn knows_symbol(&self, symbol: &str) -> bool {
        self.catalog.iter().any(|d| d.symbol == symbol)
    }

    /// Suspend or resume trading for a symbol. Connection-independent so
    /// tests can stage tradability before a run.
    pub fn set_tradable(&self, symbol: &str, tradable: bool) {
        let mut state = self.state.lock().unwrap();
        if tradable {
            state.halted.retain(|s| s != symbol);
        } else if !state.halted.iter().any(|s| s == symbol) {
            state.halted.push(symbol.to_string());
        }
    }

    /// Look up an accepted order by ticket.
    pub fn order(&self, ticket: u64) -> Option<Order> {
        let state = self.state.lock().unwrap();
        state.open_orders.iter().find(|o| o.ticket == ticket).cloned()
    }

    /// Number of orders currently open in the ledger.
    pub fn open_order_count(&self) -> usize {
        self.state.lock().unwrap().open_orders.len()
    }

    /// Close an open order at the current market price, realizing its
    /// profit or loss.
    pub fn close_order(&self, ticket: u64) -> Result<Order, OrderError> {
        self.ensure_connected()?;
        let mut state = self.state.lock().unwrap();

        let index = state
            .open_orders
            .iter()
            .position(|o| o.ticket == ticket)
            .ok_or_else(|| OrderError::Rejected(format!("unknown ticket {}", ticket)))?;
        let order = state.open_orders.remove(index);

        let exit = state
            .last_price
            .get(&order.symbol)
            .copied()
            .unwrap_or(order.entry_price);
        state.settle(&order, exit);
        Ok(order)
    }
}

impl SimState {
    /// Starting anchor price for a symbol's walk; JPY-style and index
    /// symbols live on very different scales than majors.
    fn anchor_price(symbol: &str) -> f64 {
        if symbol.ends_with("JPY") {
            150.0
        } else if symbol.contains("INDEX") || symbol.contains("STOCK") || symbol.contains("XAU") {
            2_000.0
        } else {
            1.1000
        }
    }

    /// Realize an order at `exit`, moving its result into the cumulative
    /// profit/loss magnitudes and the account balance.
    fn settle(&mut self, order: &Order, exit: f64) {
        let direction = match order.side {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        };
        let pnl = (exit - order.entry_price) * direction * order.volume * self.lot_spec.point_value;

        if pnl >= 0.0 {
            self.profit += pnl;
        } else {
            self.loss += pnl.abs();
        }
        self.balance += pnl;
        self.equity = self.balance;
    }

    /// Generate one random-walk candle around `price` and return the new
    /// close. Intrabar noise is kept small so OHLC stays consistent.
    fn next_candle(&mut self, price: f64, timestamp: chrono::DateTime<Utc>) -> (Candle, f64) {
        let drift = price * self.rng.gen_range(-0.0008..0.0008);
        let close = (price + drift).max(price * 0.5);

        let noise_pct = 0.002;
        let high = close * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = close * (1.0 - self.rng.gen_range(0.0..noise_pct));
        let open = (price).clamp(low, high);
        let volume = self.rng.gen_range(100.0..1_000.0);

        (
            Candle {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            },
            close,
        )
    }

    /// Trigger stops and targets against a freshly generated candle path.
    fn settle_triggered_orders(&mut self, symbol: &str, candles: &[Candle]) {
        let mut remaining = Vec::new();
        let open_orders = std::mem::take(&mut self.open_orders);

        for order in open_orders {
            if order.symbol != symbol {
                remaining.push(order);
                continue;
            }

            let mut exit = None;
            for candle in candles {
                exit = match order.side {
                    OrderSide::Buy => match (order.stop_loss, order.take_profit) {
                        (Some(sl), _) if candle.low <= sl => Some(sl),
                        (_, Some(tp)) if candle.high >= tp => Some(tp),
                        _ => None,
                    },
                    OrderSide::Sell => match (order.stop_loss, order.take_profit) {
                        (Some(sl), _) if candle.high >= sl => Some(sl),
                        (_, Some(tp)) if candle.low <= tp => Some(tp),
                        _ => None,
                    },
                };
                if exit.is_some() {
                    break;
                }
            }

            match exit {
                Some(price) => self.settle(&order, price),
                None => remaining.push(order),
            }
        }

        self.open_orders = remaining;
    }
}

impl Default for SimulatedConnector {
    fn default() -> Self {
        Self::new(42)
    }
}

#[async_trait]
impl MarketConnector for SimulatedConnector {
    async fn connect(&self) -> Result<(), ConnectionError> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(ConnectionError::AlreadyConnected);
        }
        tracing::info!("simulated backend connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectionError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            // Session state does not survive a disconnect.
            let mut state = self.state.lock().unwrap();
            state.open_orders.clear();
            state.last_price.clear();
            tracing::info!("simulated backend disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn account_snapshot(&self) -> Result<AccountSnapshot, ConnectionError> {
        self.ensure_connected()?;
        let state = self.state.lock().unwrap();
        Ok(AccountSnapshot {
            account_id: SIM_ACCOUNT_ID,
            balance: state.balance,
            equity: state.equity,
        })
    }

    async fn available_symbols(&self) -> Result<Vec<SymbolDescriptor>, ConnectionError> {
        self.ensure_connected()?;
        Ok(self.catalog.clone())
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        self.ensure_connected().map_err(DataError::from)?;
        if !self.knows_symbol(symbol) {
            return Err(DataError::UnknownSymbol(symbol.to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let mut price = state
            .last_price
            .get(symbol)
            .copied()
            .unwrap_or_else(|| SimState::anchor_price(symbol));

        let start = Utc::now() - Duration::minutes(timeframe.minutes() * count as i64);
        let mut candles = Vec::with_capacity(count);
        for i in 0..count {
            let timestamp = start + Duration::minutes(timeframe.minutes() * i as i64);
            let (candle, close) = state.next_candle(price, timestamp);
            candles.push(candle);
            price = close;
        }

        state.last_price.insert(symbol.to_string(), price);
        state.settle_triggered_orders(symbol, &candles);

        Ok(candles)
    }

    async fn can_trade(&self, symbol: &str) -> Result<bool, DataError> {
        self.ensure_connected().map_err(DataError::from)?;
        if !self.knows_symbol(symbol) {
            return Err(DataError::UnknownSymbol(symbol.to_string()));
        }
        let state = self.state.lock().unwrap();
        Ok(!state.halted.iter().any(|s| s == symbol))
    }

    async fn place_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
        match self.can_trade(&request.symbol).await {
            Ok(true) => {}
            Ok(false) => return Err(OrderError::NotTradable(request.symbol)),
            Err(DataError::Connection(e)) => return Err(OrderError::Connection(e)),
            Err(e) => return Err(OrderError::Rejected(e.to_string())),
        }
        if request.volume <= 0.0 {
            return Err(OrderError::InvalidVolume(request.volume));
        }

        let mut state = self.state.lock().unwrap();
        let entry_price = state
            .last_price
            .get(&request.symbol)
            .copied()
            .unwrap_or_else(|| SimState::anchor_price(&request.symbol));

        // Crude margin gate: the notional risked may not exceed equity.
        let exposure = request.volume * entry_price * state.lot_spec.point_value;
        if exposure > state.equity * 100.0 {
            return Err(OrderError::Rejected(format!(
                "insufficient margin for {:.2} lots",
                request.volume
            )));
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;

        let order = Order {
            symbol: request.symbol,
            side: request.side,
            volume: request.volume,
            entry_price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            ticket,
        };
        state.open_orders.push(order.clone());

        tracing::debug!(
            ticket,
            symbol = %order.symbol,
            side = %order.side,
            volume = order.volume,
            "simulated order accepted"
        );
        Ok(order)
    }

    async fn profit_loss(&self) -> Result<(f64, f64), ConnectionError> {
        self.ensure_connected()?;
        let state = self.state.lock().unwrap();
        Ok((state.profit, state.loss))
    }
}
