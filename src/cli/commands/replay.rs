//! Replay command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use trading_broker::PaperBroker;
use trading_config::ConfigStore;
use trading_core::traits::AccountProvider;
use trading_core::types::InstrumentSpec;
use trading_data::{load_csv, ReplayIndicatorProvider};
use trading_engine::{Collaborators, EngineSettings, Orchestrator, SessionSummary};
use trading_monitor::TracingEventSink;

use crate::cli::ReplayArgs;

pub async fn run(args: ReplayArgs, config_path: Option<&Path>) -> Result<()> {
    let mut store = ConfigStore::open(config_path).context("Failed to load configuration")?;
    let config = store.current().clone();

    let spec = config
        .engine
        .instrument(&args.instrument)
        .cloned()
        .unwrap_or_else(|| InstrumentSpec::forex_major(args.instrument.as_str()));
    let settings = single_instrument(config.engine_settings(), &spec);

    let bars = load_csv(&args.data)
        .with_context(|| format!("Failed to load bars from {}", args.data.display()))?;
    info!(instrument = %spec.symbol, bars = bars.len(), "Starting replay");

    let capital = args.capital.unwrap_or(config.replay.initial_balance);
    let broker = Arc::new(
        PaperBroker::new(capital, config.replay.leverage)
            .with_instrument(spec.clone())
            .with_slippage(config.replay.slippage_pips),
    );
    let provider = Arc::new(ReplayIndicatorProvider::new(config.replay.snapshot.clone())?);
    provider.add_feed(
        spec.symbol.as_str(),
        bars,
        spec.pip_size.to_f64().unwrap_or(0.0001),
    );

    // The last warm-up bar is revealed by the loop so its price reaches the broker
    provider.skip(&spec.symbol, config.replay.warmup().saturating_sub(1));

    let mut orchestrator = Orchestrator::new(
        settings,
        Collaborators {
            indicators: provider.clone(),
            account: broker.clone(),
            execution: broker.clone(),
            sink: Arc::new(TracingEventSink::new()),
        },
    )?;

    let mut summary = SessionSummary::new(capital);
    let mut bars_replayed = 0usize;
    while let Some(bar) = provider.advance(&spec.symbol) {
        broker.apply_bar(&spec.symbol, &bar);
        let report = orchestrator.tick(bar.datetime().unwrap_or_else(Utc::now)).await;
        summary.record(&report);
        bars_replayed += 1;

        if args.reload_every.is_some_and(|n| n > 0 && bars_replayed % n == 0) {
            match store.reload() {
                Ok(reloaded) => {
                    let settings = single_instrument(reloaded.engine_settings(), &spec);
                    if let Err(e) = orchestrator.apply_config(settings) {
                        warn!(error = %e, "Reloaded configuration not applied");
                    }
                }
                Err(e) => warn!(error = %e, "Configuration reload failed"),
            }
        }
    }

    summary.final_equity = broker.get_account_state().await?.equity;
    info!(
        bars = bars_replayed,
        open_positions = broker.open_count(),
        "Replay finished"
    );

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => println!("{}", summary.summary()),
    }

    Ok(())
}

/// Restrict the engine to the replayed instrument.
fn single_instrument(mut settings: EngineSettings, spec: &InstrumentSpec) -> EngineSettings {
    settings.engine.instruments = vec![spec.clone()];
    settings
}
