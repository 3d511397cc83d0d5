// Core modules
pub mod config;
pub mod connector;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod models;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use config::Settings;
pub use connector::{LiveConnector, MarketConnector, OrderRequest, SimulatedConnector};
pub use engine::{EngineConfig, EngineEvent, Severity, StrategyEngine};
pub use models::*;
pub use strategy::{Strategy, StrategyKind};
