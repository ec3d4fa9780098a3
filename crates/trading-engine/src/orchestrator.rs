//! The per-bar orchestration pass.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use trading_core::{
    error::{BrokerError, DataError, TradingError},
    traits::{AccountProvider, ExecutionAdapter, IndicatorProvider},
    types::{AccountState, ClosedTrade, IndicatorSnapshot, InstrumentSpec, OrderRequest, Series, Signal},
};
use trading_positions::{broker_call, LimitCheck, PositionEvent, PositionManager};
use trading_risk::{RiskManager, StopSettings};
use trading_strategies::{ForcedSignalGenerator, RiskProfile, StrategySet};

use crate::config::EngineSettings;
use crate::events::{EngineEvent, EventSink};
use crate::report::TickReport;

/// External collaborators the orchestrator talks to.
pub struct Collaborators {
    pub indicators: Arc<dyn IndicatorProvider>,
    pub account: Arc<dyn AccountProvider>,
    pub execution: Arc<dyn ExecutionAdapter>,
    pub sink: Arc<dyn EventSink>,
}

/// Market context for one instrument during a tick.
struct Market<'a> {
    spec: &'a InstrumentSpec,
    snapshot: &'a IndicatorSnapshot,
    price: Decimal,
    now: DateTime<Utc>,
}

/// What became of one signal at the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Submitted,
    /// Never reached the broker or was refused
    Dropped,
    /// Outcome unknown
    TimedOut,
}

/// Drives strategies, the risk manager and the position manager once per bar.
///
/// All state lives here; a tick runs to completion before the next one starts.
pub struct Orchestrator {
    settings: EngineSettings,
    strategies: StrategySet,
    forced: ForcedSignalGenerator,
    risk: RiskManager,
    positions: PositionManager,
    indicators: Arc<dyn IndicatorProvider>,
    account: Arc<dyn AccountProvider>,
    execution: Arc<dyn ExecutionAdapter>,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Validate `settings` and build the engine.
    pub fn new(settings: EngineSettings, collaborators: Collaborators) -> Result<Self, TradingError> {
        settings.validate()?;
        let strategies = StrategySet::from_configs(settings.strategies.clone())?;
        let positions = PositionManager::new(settings.positions.clone())
            .with_call_timeout(settings.engine.call_timeout());

        info!(
            strategies = strategies.len(),
            instruments = settings.engine.instruments.len(),
            execution = collaborators.execution.name(),
            indicators = collaborators.indicators.name(),
            "Orchestrator ready"
        );

        Ok(Self {
            forced: ForcedSignalGenerator::new(settings.forced.clone()),
            risk: RiskManager::new(settings.risk.clone()),
            positions,
            strategies,
            settings,
            indicators: collaborators.indicators,
            account: collaborators.account,
            execution: collaborators.execution,
            sink: collaborators.sink,
        })
    }

    /// Replace the forced generator, e.g. with one on a fixed RNG.
    pub fn with_forced_generator(mut self, forced: ForcedSignalGenerator) -> Self {
        self.forced = forced;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    /// Swap in new settings between ticks. Invalid settings are rejected as a
    /// whole and the current ones stay in force.
    pub fn apply_config(&mut self, settings: EngineSettings) -> Result<(), TradingError> {
        let applied = settings.validate().and_then(|_| {
            self.strategies
                .reload(settings.strategies.clone())
                .map_err(|e| TradingError::ConfigurationInvalid(e.to_string()))
        });
        if let Err(error) = applied {
            warn!(%error, "Configuration rejected, keeping the previous one");
            self.sink.emit(&EngineEvent::ConfigRejected {
                reason: error.to_string(),
            });
            return Err(error);
        }

        self.risk.update_config(settings.risk.clone());
        self.positions.update_config(settings.positions.clone());
        self.positions
            .set_call_timeout(settings.engine.call_timeout());
        self.forced.update_config(settings.forced.clone());
        self.settings = settings;

        info!("Configuration applied");
        self.sink.emit(&EngineEvent::ConfigApplied);
        Ok(())
    }

    /// Operator action clearing a latched emergency stop.
    pub fn reset_emergency_stop(&mut self) {
        self.risk.reset_emergency_stop();
        self.sink.emit(&EngineEvent::EmergencyStopReset);
    }

    /// Run one orchestration pass for the bar closing at `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::new(now);
        let sink = Arc::clone(&self.sink);
        let timeout = self.settings.engine.call_timeout();

        let account = match broker_call(
            "get_account_state",
            timeout,
            self.account.get_account_state(),
        )
        .await
        {
            Ok(account) => account,
            Err(error) => {
                warn!(%error, "Account state unavailable, tick abandoned");
                report.record(
                    &*sink,
                    EngineEvent::TickAborted {
                        reason: format!("account state: {error}"),
                    },
                );
                return report;
            }
        };
        self.refresh_risk(&account, now, &mut report);

        if let Err(error) = self.reconcile(&mut report).await {
            warn!(%error, "Position list unavailable, tick abandoned");
            report.record(
                &*sink,
                EngineEvent::TickAborted {
                    reason: format!("position list: {error}"),
                },
            );
            return report;
        }

        let instruments = self.settings.engine.instruments.clone();
        for spec in &instruments {
            self.process_instrument(spec, now, &mut report).await;
        }

        debug!(
            events = report.events.len(),
            open = self.positions.total_count(),
            "Tick complete"
        );
        report
    }

    fn refresh_risk(&mut self, account: &AccountState, now: DateTime<Utc>, report: &mut TickReport) {
        if let Some(cause) = self.risk.refresh(account, now) {
            report.record(&*self.sink, EngineEvent::EmergencyStopActivated(cause));
        }
        self.risk.sync_open_positions(self.positions.total_count());
    }

    async fn reconcile(&mut self, report: &mut TickReport) -> Result<(), TradingError> {
        let sink = Arc::clone(&self.sink);
        let timeout = self.settings.engine.call_timeout();
        let listed = broker_call(
            "list_open_positions",
            timeout,
            self.execution.list_open_positions(),
        )
        .await?;

        let strategies = &self.strategies;
        let forced_name = self.settings.forced.strategy_name.as_str();
        let outcome = self
            .positions
            .reconcile(&listed, |tag| tag == forced_name || strategies.contains(tag));

        for id in outcome.adopted {
            let strategy = self
                .positions
                .get(&id)
                .map(|p| p.strategy.clone())
                .unwrap_or_default();
            report.record(&*sink, EngineEvent::PositionAdopted { id, strategy });
        }

        for position in outcome.vanished {
            let realized = match broker_call(
                "closed_position_profit",
                timeout,
                self.execution.closed_position_profit(position.id),
            )
            .await
            {
                Ok(profit) => profit,
                Err(error) => {
                    warn!(id = %position.id, %error, "Realized profit unavailable");
                    None
                }
            };
            self.close_out(PositionManager::settle(&position, realized), report);
        }

        self.risk.sync_open_positions(self.positions.total_count());
        Ok(())
    }

    fn close_out(&mut self, trade: ClosedTrade, report: &mut TickReport) {
        let sink = Arc::clone(&self.sink);
        self.risk.record_trade_result(trade.is_win());
        report.record(&*sink, EngineEvent::PositionClosed(trade.clone()));

        let state = self.risk.state();
        report.record(
            &*sink,
            EngineEvent::TradeResultRecorded {
                trade,
                consecutive_wins: state.consecutive_wins,
                consecutive_losses: state.consecutive_losses,
            },
        );
    }

    async fn process_instrument(
        &mut self,
        spec: &InstrumentSpec,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        let sink = Arc::clone(&self.sink);
        let timeout = self.settings.engine.call_timeout();
        let symbol = spec.symbol.as_str();
        let skip = |report: &mut TickReport, reason: String| {
            debug!(instrument = symbol, %reason, "Instrument skipped");
            report.record(
                &*sink,
                EngineEvent::InstrumentSkipped {
                    instrument: symbol.to_string(),
                    reason,
                },
            );
        };

        let snapshot = match data_call("get_snapshot", timeout, self.indicators.get_snapshot(symbol)).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                skip(report, error.to_string());
                return;
            }
        };
        let Some(price) = snapshot
            .current_price()
            .and_then(|p| Decimal::try_from(p).ok())
            .filter(|p| *p > Decimal::ZERO)
        else {
            skip(report, "no usable current price".to_string());
            return;
        };

        if let Some(atr) = snapshot.value(Series::Atr, 0) {
            self.risk.update_volatility_multiplier(symbol, atr);
        }

        // Existing positions first
        let hold_limits = self.hold_limits();
        let managed = self
            .positions
            .manage(spec, price, now, &hold_limits, self.execution.as_ref())
            .await;
        let closed_any = managed.closed_any();
        let action_failed = managed
            .events
            .iter()
            .any(|e| matches!(e, PositionEvent::ActionFailed { .. }));
        for event in managed.events {
            self.apply_position_event(event, report);
        }
        self.risk.sync_open_positions(self.positions.total_count());
        if action_failed {
            skip(report, "position management call failed".to_string());
            return;
        }

        if closed_any {
            match broker_call("get_account_state", timeout, self.account.get_account_state()).await {
                Ok(account) => self.refresh_risk(&account, now, report),
                Err(error) => {
                    skip(report, format!("account refresh: {error}"));
                    return;
                }
            }
        }

        let flat: Vec<String> = self
            .strategies
            .iter()
            .map(|e| e.config.name.clone())
            .filter(|name| self.positions.count_by_strategy_on(name, symbol) == 0)
            .collect();
        for name in &flat {
            self.strategies.notify_flat(name, symbol);
        }

        if let Err(block) = self.risk.check_gate() {
            debug!(instrument = symbol, %block, "New orders blocked");
            report.record(
                &*sink,
                EngineEvent::RiskGateBlocked {
                    instrument: symbol.to_string(),
                    block,
                },
            );
            return;
        }

        let market = Market {
            spec,
            snapshot: &snapshot,
            price,
            now,
        };

        // Evaluate and place one strategy at a time
        let mut placed_any = false;
        for name in self.strategies.enabled_names() {
            let Some((signal, profile)) = self.evaluate_strategy(&name, &snapshot, report) else {
                continue;
            };
            match self.place_order(signal, &profile, &market, report).await {
                Placement::Submitted => {
                    placed_any = true;
                    if !self.gate_open(symbol, report) {
                        return;
                    }
                }
                Placement::Dropped => self.strategies.notify_order_failed(&name, symbol),
                Placement::TimedOut => {
                    skip(report, "order submission timed out".to_string());
                    return;
                }
            }
        }

        if !placed_any {
            self.try_forced(&market, report).await;
        }
    }

    fn apply_position_event(&mut self, event: PositionEvent, report: &mut TickReport) {
        let sink = Arc::clone(&self.sink);
        match event {
            PositionEvent::StopTrailed {
                id,
                strategy,
                old_stop,
                new_stop,
            } => report.record(
                &*sink,
                EngineEvent::PositionModified {
                    id,
                    strategy,
                    old_stop,
                    new_stop,
                },
            ),
            PositionEvent::PartiallyClosed {
                id,
                strategy,
                closed_volume,
                remaining,
            } => report.record(
                &*sink,
                EngineEvent::PositionPartiallyClosed {
                    id,
                    strategy,
                    closed_volume,
                    remaining,
                },
            ),
            PositionEvent::PartialCloseMarked { id } => {
                debug!(%id, "Partial close skipped, position too small to split");
            }
            PositionEvent::Closed(trade) => self.close_out(trade, report),
            PositionEvent::ActionFailed { id, action, error } => report.record(
                &*sink,
                EngineEvent::PositionActionFailed { id, action, error },
            ),
        }
    }

    /// Maximum holding time per order tag.
    fn hold_limits(&self) -> HashMap<String, u64> {
        let mut limits: HashMap<String, u64> = self
            .strategies
            .iter()
            .filter_map(|e| {
                e.config
                    .max_hold_minutes
                    .map(|minutes| (e.config.name.clone(), minutes))
            })
            .collect();
        let forced = self.forced.config();
        if let Some(minutes) = forced.max_hold_minutes {
            limits.insert(forced.strategy_name.clone(), minutes);
        }
        limits
    }

    fn gate_open(&mut self, instrument: &str, report: &mut TickReport) -> bool {
        match self.risk.check_gate() {
            Ok(()) => true,
            Err(block) => {
                report.record(
                    &*self.sink,
                    EngineEvent::RiskGateBlocked {
                        instrument: instrument.to_string(),
                        block,
                    },
                );
                false
            }
        }
    }

    /// Evaluate one strategy; at most one signal.
    fn evaluate_strategy(
        &mut self,
        name: &str,
        snapshot: &IndicatorSnapshot,
        report: &mut TickReport,
    ) -> Option<(Signal, RiskProfile)> {
        let sink = Arc::clone(&self.sink);
        let skipped = |report: &mut TickReport, reason: String| {
            report.record(
                &*sink,
                EngineEvent::StrategySkipped {
                    strategy: name.to_string(),
                    instrument: snapshot.instrument.clone(),
                    reason,
                },
            );
        };

        let held = self.positions.count_by_strategy(name);
        let limits = self.positions.limits();
        let entry = self.strategies.get_mut(name)?;
        if let LimitCheck::Blocked { reason } =
            limits.check_strategy(name, held, entry.config.max_positions)
        {
            debug!(strategy = %name, %reason, "Strategy at position limit");
            return None;
        }

        let requirements = match entry.generator.requirements(&entry.config) {
            Ok(requirements) => requirements,
            Err(error) => {
                warn!(strategy = %name, %error, "Strategy misconfigured");
                skipped(report, error.to_string());
                return None;
            }
        };
        if let Err(error) = snapshot.ensure_history(&requirements) {
            skipped(report, error.to_string());
            return None;
        }

        match entry.generator.evaluate(snapshot, &entry.config) {
            Ok(Some(signal)) => {
                info!(
                    strategy = %name,
                    instrument = %signal.instrument,
                    side = %signal.side,
                    confidence = signal.confidence,
                    reason = %signal.reason,
                    "Signal generated"
                );
                report.record(&*sink, EngineEvent::SignalGenerated(signal.clone()));
                Some((signal, entry.config.risk_profile()))
            }
            Ok(None) => None,
            Err(error) => {
                warn!(strategy = %name, %error, "Strategy evaluation failed");
                skipped(report, error.to_string());
                None
            }
        }
    }

    /// The forced path, only when no rule-based order went out for the instrument.
    async fn try_forced(&mut self, market: &Market<'_>, report: &mut TickReport) {
        let config = self.forced.config();
        if !config.enabled {
            return;
        }
        let held = self.positions.count_by_strategy(&config.strategy_name);
        if self
            .positions
            .limits()
            .check_strategy(&config.strategy_name, held, config.max_positions)
            .is_blocked()
        {
            return;
        }
        let profile = config.risk_profile();

        let Some(signal) = self.forced.try_generate(market.snapshot, market.now) else {
            return;
        };
        info!(
            instrument = %signal.instrument,
            side = %signal.side,
            "Forced signal generated"
        );
        report.record(&*self.sink, EngineEvent::SignalGenerated(signal.clone()));

        if self.gate_open(&market.spec.symbol, report) {
            self.place_order(signal, &profile, market, report).await;
        }
    }

    /// Size, protect and submit one signal.
    async fn place_order(
        &mut self,
        signal: Signal,
        profile: &RiskProfile,
        market: &Market<'_>,
        report: &mut TickReport,
    ) -> Placement {
        let sink = Arc::clone(&self.sink);
        let spec = market.spec;
        let atr = market.snapshot.value(Series::Atr, 0).unwrap_or(0.0);
        let settings = StopSettings {
            base_pips: profile.stop_loss_pips,
            atr_multiplier: profile.atr_multiplier,
            risk_reward: profile.risk_reward,
        };

        let levels = match self
            .risk
            .protective_levels(signal.side, market.price, atr, &settings, spec)
        {
            Ok(levels) => levels,
            Err(error) => {
                warn!(strategy = %signal.strategy, %error, "Cannot place stops, signal dropped");
                report.record(
                    &*sink,
                    EngineEvent::InvalidRiskInputs {
                        strategy: signal.strategy,
                        instrument: spec.symbol.clone(),
                        error,
                        fallback_volume: None,
                    },
                );
                return Placement::Dropped;
            }
        };

        let volume = match self.risk.calculate_position_size(
            &signal.strategy,
            profile.base_risk_percent,
            signal.confidence,
            levels.stop_distance,
            signal.size_multiplier,
            spec,
        ) {
            Ok(sizing) => sizing.volume,
            Err(error) => {
                let fallback = self.risk.fallback_volume(spec);
                warn!(strategy = %signal.strategy, %error, %fallback, "Invalid sizing inputs, using minimum lot");
                report.record(
                    &*sink,
                    EngineEvent::InvalidRiskInputs {
                        strategy: signal.strategy.clone(),
                        instrument: spec.symbol.clone(),
                        error,
                        fallback_volume: Some(fallback),
                    },
                );
                fallback
            }
        };

        let request = OrderRequest::market(&spec.symbol, signal.side, volume, market.price)
            .with_stops(levels.stop_loss, levels.take_profit)
            .with_strategy(&signal.strategy)
            .with_comment(&self.settings.engine.order_comment);

        let timeout = self.settings.engine.call_timeout();
        match broker_call("submit_order", timeout, self.execution.submit_order(request.clone())).await {
            Ok(id) => {
                info!(
                    %id,
                    strategy = %request.strategy,
                    instrument = %request.instrument,
                    side = %request.side,
                    volume = %request.volume,
                    stop_loss = %request.stop_loss,
                    take_profit = %request.take_profit,
                    "Order submitted"
                );
                self.positions.track_opening(id, &request, market.now);
                self.risk.sync_open_positions(self.positions.total_count());
                report.record(
                    &*sink,
                    EngineEvent::OrderSubmitted {
                        id,
                        request,
                        confidence: signal.confidence,
                        forced: signal.forced,
                    },
                );
                Placement::Submitted
            }
            Err(error) => {
                warn!(strategy = %signal.strategy, %error, "Order failed");
                let placement = if matches!(error, BrokerError::Timeout { .. }) {
                    Placement::TimedOut
                } else {
                    Placement::Dropped
                };
                report.record(
                    &*sink,
                    EngineEvent::OrderFailed {
                        strategy: signal.strategy,
                        instrument: spec.symbol.clone(),
                        error,
                    },
                );
                placement
            }
        }
    }
}

/// Await an indicator call, mapping an elapsed deadline to [`DataError::Timeout`].
async fn data_call<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, DataError>
where
    F: Future<Output = Result<T, DataError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DataError::Timeout {
            operation: operation.to_string(),
            after_ms: limit.as_millis() as u64,
        }),
    }
}
