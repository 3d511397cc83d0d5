use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::connector::{MarketConnector, OrderRequest};
use crate::error::{ConnectionError, DataError, OrderError};
use crate::models::{AccountSnapshot, Candle, Order, OrderSide, SymbolDescriptor, Timeframe};

/// Connector to the live trading terminal through its local HTTP gateway.
///
/// Every operation delegates to the terminal; backend-reported failures are
/// wrapped into the matching error kind. The gateway speaks plain JSON and
/// is expected to answer in bounded time.
pub struct LiveConnector {
    client: Client,
    base_url: String,
    connected: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    account_id: i64,
    balance: f64,
    equity: f64,
}

#[derive(Debug, Deserialize)]
struct SymbolDto {
    symbol: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct CandleDto {
    /// Unix seconds, terminal convention.
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct TradableDto {
    tradable: bool,
}

#[derive(Debug, Serialize)]
struct OrderRequestDto<'a> {
    symbol: &'a str,
    side: &'a str,
    volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OrderDto {
    ticket: u64,
    entry_price: f64,
}

#[derive(Debug, Deserialize)]
struct ProfitLossDto {
    profit: f64,
    loss: f64,
}

impl LiveConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connected: AtomicBool::new(false),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ensure_connected(&self) -> Result<(), ConnectionError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectionError::NotConnected)
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<T, ConnectionError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectionError::Backend(format!("{}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    fn candle_from_dto(dto: CandleDto) -> Candle {
        let timestamp: DateTime<Utc> = Utc
            .timestamp_opt(dto.time, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Candle {
            timestamp,
            open: dto.open,
            high: dto.high,
            low: dto.low,
            close: dto.close,
            volume: dto.volume,
        }
    }
}

#[async_trait]
impl MarketConnector for LiveConnector {
    async fn connect(&self) -> Result<(), ConnectionError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(ConnectionError::AlreadyConnected);
        }

        let response = self
            .client
            .post(self.url("/session/connect"))
            .send()
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConnectionError::Backend(format!(
                "terminal refused session: {}",
                response.status()
            )));
        }

        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(gateway = %self.base_url, "terminal session established");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectionError> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Best effort: the local flag is already cleared either way.
        if let Err(e) = self.client.post(self.url("/session/disconnect")).send().await {
            tracing::warn!("terminal disconnect request failed: {}", e);
        }
        tracing::info!("terminal session closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn account_snapshot(&self) -> Result<AccountSnapshot, ConnectionError> {
        self.ensure_connected()?;
        let dto: AccountDto = self.get_json("/account").await?;
        Ok(AccountSnapshot {
            account_id: dto.account_id,
            balance: dto.balance,
            equity: dto.equity,
        })
    }

    async fn available_symbols(&self) -> Result<Vec<SymbolDescriptor>, ConnectionError> {
        self.ensure_connected()?;
        let dtos: Vec<SymbolDto> = self.get_json("/symbols").await?;

        let mut symbols: Vec<SymbolDescriptor> = dtos
            .into_iter()
            .map(|dto| SymbolDescriptor::new(dto.symbol, dto.description))
            .collect();
        symbols.sort_by(|a, b| (a.category, &a.symbol).cmp(&(b.category, &b.symbol)));
        Ok(symbols)
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        self.ensure_connected()?;

        let path = format!(
            "/candles?symbol={}&timeframe={}&count={}",
            symbol, timeframe, count
        );
        let dtos: Vec<CandleDto> = self.get_json(&path).await.map_err(|e| match e {
            ConnectionError::Backend(msg) if msg.contains("404") => {
                DataError::UnknownSymbol(symbol.to_string())
            }
            other => DataError::Connection(other),
        })?;

        if dtos.len() < count {
            return Err(DataError::InsufficientBars {
                symbol: symbol.to_string(),
                got: dtos.len(),
                need: count,
            });
        }

        let mut candles: Vec<Candle> =
            dtos.into_iter().map(Self::candle_from_dto).collect();
        candles.sort_by_key(|c| c.timestamp);
        candles.truncate(count);
        Ok(candles)
    }

    async fn can_trade(&self, symbol: &str) -> Result<bool, DataError> {
        self.ensure_connected()?;
        let path = format!("/symbols/{}/tradable", symbol);
        let dto: TradableDto = self.get_json(&path).await.map_err(|e| match e {
            ConnectionError::Backend(msg) if msg.contains("404") => {
                DataError::UnknownSymbol(symbol.to_string())
            }
            other => DataError::Connection(other),
        })?;
        Ok(dto.tradable)
    }

    async fn place_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
        self.ensure_connected()?;

        if request.volume <= 0.0 {
            return Err(OrderError::InvalidVolume(request.volume));
        }

        let side = match request.side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        let body = OrderRequestDto {
            symbol: &request.symbol,
            side,
            volume: request.volume,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
        };

        let response = self
            .client
            .post(self.url("/orders"))
            .json(&body)
            .send()
            .await
            .map_err(|e| OrderError::Connection(ConnectionError::Transport(e.to_string())))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() == 423 {
                OrderError::NotTradable(request.symbol)
            } else {
                OrderError::Rejected(format!("{}: {}", status, text))
            });
        }

        let dto: OrderDto = response
            .json()
            .await
            .map_err(|e| OrderError::Connection(ConnectionError::Transport(e.to_string())))?;

        Ok(Order {
            symbol: request.symbol,
            side: request.side,
            volume: request.volume,
            entry_price: dto.entry_price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            ticket: dto.ticket,
        })
    }

    async fn profit_loss(&self) -> Result<(f64, f64), ConnectionError> {
        self.ensure_connected()?;
        let dto: ProfitLossDto = self.get_json("/history/summary").await?;
        Ok((dto.profit, dto.loss))
    }
}
