use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::engine::EngineConfig;
use crate::models::Timeframe;
use crate::risk::LotSpec;
use crate::strategy::StrategyKind;

/// Runtime settings, layered from built-in defaults, an optional TOML file,
/// and `FXBOT_*` environment variables (highest precedence).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default symbol to trade.
    pub symbol: String,
    /// Default strategy kind.
    pub strategy: StrategyKind,
    /// Use the simulated backend instead of the live terminal.
    pub simulation: bool,
    /// Base URL of the live terminal gateway.
    pub terminal_url: String,
    /// Risk per order, percent of balance.
    pub risk_percent: f64,
    /// Candles requested per fetch.
    pub candle_count: usize,
    /// Ordered timeframe fallback list.
    pub timeframes: Vec<Timeframe>,
    /// Seconds between cycles.
    pub poll_interval_secs: u64,
    /// Seconds to back off after a skipped cycle.
    pub backoff_secs: u64,
    /// Broker lot bounds and point scaling.
    pub min_lot: f64,
    pub max_lot: f64,
    pub point_value: f64,
    /// Seed for the simulated backend's price walk.
    pub sim_seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            strategy: StrategyKind::MaCross,
            simulation: false,
            terminal_url: "http://127.0.0.1:8222".to_string(),
            risk_percent: 1.0,
            candle_count: 100,
            timeframes: vec![Timeframe::M1, Timeframe::M5, Timeframe::M15],
            poll_interval_secs: 1,
            backoff_secs: 5,
            min_lot: 0.01,
            max_lot: 100.0,
            point_value: 10_000.0,
            sim_seed: 42,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the config file if present, then
    /// environment overrides.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("FXBOT"))
            .build()?
            .try_deserialize()
    }

    /// Engine knobs derived from these settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            risk_percent: self.risk_percent,
            candle_count: self.candle_count,
            timeframes: self.timeframes.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            backoff_interval: Duration::from_secs(self.backoff_secs),
            lot_spec: LotSpec {
                min_lot: self.min_lot,
                max_lot: self.max_lot,
                point_value: self.point_value,
            },
        }
    }
}
