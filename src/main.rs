use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use fxbot::config::Settings;
use fxbot::connector::{LiveConnector, MarketConnector, SimulatedConnector};
use fxbot::engine::{EngineEvent, Severity, StrategyEngine};
use fxbot::strategy::StrategyKind;

#[derive(Debug, Parser)]
#[command(name = "fxbot", about = "Strategy execution bot for a trading terminal backend")]
struct Cli {
    /// Config file path (TOML, optional)
    #[arg(long, default_value = "fxbot")]
    config: String,

    /// Run against the simulated backend instead of the live terminal
    #[arg(long)]
    simulate: bool,

    /// Symbol to trade, overriding the configured default
    #[arg(long)]
    symbol: Option<String>,

    /// Strategy kind (ma_cross | rsi_threshold), overriding the default
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Print the symbol catalog and exit
    #[arg(long)]
    list_symbols: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config).context("failed to load settings")?;
    if cli.simulate {
        settings.simulation = true;
    }
    if let Some(symbol) = cli.symbol {
        settings.symbol = symbol;
    }
    if let Some(strategy) = cli.strategy {
        settings.strategy = strategy;
    }

    tracing::info!(
        symbol = %settings.symbol,
        strategy = %settings.strategy,
        simulation = settings.simulation,
        "fxbot starting"
    );

    if settings.simulation {
        let connector = Arc::new(SimulatedConnector::new(settings.sim_seed));
        run(connector, settings, cli.list_symbols).await
    } else {
        let connector = Arc::new(LiveConnector::new(settings.terminal_url.clone()));
        run(connector, settings, cli.list_symbols).await
    }
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fxbot=info".into()),
        )
        .init();
}

async fn run<C: MarketConnector + 'static>(
    connector: Arc<C>,
    settings: Settings,
    list_symbols: bool,
) -> anyhow::Result<()> {
    connector.connect().await.context("backend connect failed")?;

    let account = connector.account_snapshot().await?;
    tracing::info!(
        account = account.account_id,
        balance = account.balance,
        equity = account.equity,
        "account ready"
    );

    if list_symbols {
        for descriptor in connector.available_symbols().await? {
            println!(
                "{:<12} {:<10} {}",
                descriptor.symbol, descriptor.category, descriptor.description
            );
        }
        connector.disconnect().await?;
        return Ok(());
    }

    let (engine, events) = StrategyEngine::new(connector.clone(), settings.engine_config());
    let renderer = tokio::spawn(render_events(events));

    engine
        .start(&settings.symbol, settings.strategy)
        .await
        .context("cannot start strategy")?;

    tracing::info!("running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("signal wait failed")?;

    tracing::info!("shutting down");
    engine.stop().await;
    connector.disconnect().await?;
    renderer.abort();

    let stats = engine.stats();
    tracing::info!(profit = stats.profit, loss = stats.loss, "session summary");
    Ok(())
}

/// Render engine notifications as log lines. Stands in for the graphical
/// front-end, which owns no trading state either way.
async fn render_events(mut events: tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Message { text, severity } => match severity {
                Severity::Info => tracing::info!("{}", text),
                Severity::Warning => tracing::warn!("{}", text),
                Severity::Error => tracing::error!("{}", text),
            },
            EngineEvent::Stats { profit, loss } => {
                tracing::info!(profit, loss, "statistics");
            }
        }
    }
}
