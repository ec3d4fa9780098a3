//! Position manager: owns the managed position set.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use trading_core::{
    error::BrokerError,
    traits::ExecutionAdapter,
    types::{
        BrokerPosition, CloseReason, ClosedTrade, InstrumentSpec, OrderRequest, Position,
        PositionId, PositionState,
    },
};

use crate::exits::{hold_expired, partial_close, PartialClose, PartialCloseConfig};
use crate::limits::ExposureLimits;
use crate::trailing::{next_stop, TrailingConfig};

/// Position management configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionManagerConfig {
    pub trailing: TrailingConfig,
    pub partial_close: PartialCloseConfig,
    #[serde(flatten)]
    pub limits: ExposureLimits,
}

impl PositionManagerConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.trailing.validate()?;
        self.partial_close.validate()?;
        if self.limits.max_positions_per_strategy == 0 {
            return Err("positions.max_positions_per_strategy must be at least 1".into());
        }
        Ok(())
    }
}

/// Something that happened to a managed position.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    StopTrailed {
        id: PositionId,
        strategy: String,
        old_stop: Decimal,
        new_stop: Decimal,
    },
    PartiallyClosed {
        id: PositionId,
        strategy: String,
        closed_volume: Decimal,
        remaining: Decimal,
    },
    /// Partial-close trigger reached on a position too small to split
    PartialCloseMarked { id: PositionId },
    Closed(ClosedTrade),
    ActionFailed {
        id: PositionId,
        action: &'static str,
        error: BrokerError,
    },
}

/// Events from one management pass.
#[derive(Debug, Default)]
pub struct ManageReport {
    pub events: Vec<PositionEvent>,
}

impl ManageReport {
    pub fn closed_trades(&self) -> impl Iterator<Item = &ClosedTrade> {
        self.events.iter().filter_map(|e| match e {
            PositionEvent::Closed(trade) => Some(trade),
            _ => None,
        })
    }

    pub fn closed_any(&self) -> bool {
        self.closed_trades().next().is_some()
    }
}

/// Outcome of matching the managed set against the broker's list.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Opening positions the broker now reports
    pub confirmed: Vec<PositionId>,
    /// Managed positions the broker no longer reports, removed from the set
    pub vanished: Vec<Position>,
    /// Broker positions taken over because their strategy tag is known
    pub adopted: Vec<PositionId>,
    /// Broker positions left alone
    pub ignored: Vec<PositionId>,
}

/// Await a broker call, mapping an elapsed deadline to [`BrokerError::Timeout`].
pub async fn broker_call<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, BrokerError>
where
    F: Future<Output = Result<T, BrokerError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BrokerError::Timeout {
            operation: operation.to_string(),
            after_ms: limit.as_millis() as u64,
        }),
    }
}

/// Supervises open positions: trailing stops, partial closes and time exits.
pub struct PositionManager {
    config: PositionManagerConfig,
    positions: HashMap<PositionId, Position>,
    call_timeout: Duration,
}

impl PositionManager {
    pub fn new(config: PositionManagerConfig) -> Self {
        Self {
            config,
            positions: HashMap::new(),
            call_timeout: Duration::from_secs(5),
        }
    }

    /// Deadline applied to every adapter call made while managing.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn set_call_timeout(&mut self, call_timeout: Duration) {
        self.call_timeout = call_timeout;
    }

    pub fn config(&self) -> &PositionManagerConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: PositionManagerConfig) {
        self.config = config;
    }

    pub fn limits(&self) -> &ExposureLimits {
        &self.config.limits
    }

    /// Register a just-submitted order as an Opening position.
    pub fn track_opening(&mut self, id: PositionId, request: &OrderRequest, now: DateTime<Utc>) {
        debug!(%id, strategy = %request.strategy, "Tracking new position");
        self.positions.insert(id, Position::opening(id, request, now));
    }

    pub fn get(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Positions held by `strategy`.
    pub fn count_by_strategy(&self, strategy: &str) -> usize {
        self.positions
            .values()
            .filter(|p| p.strategy == strategy)
            .count()
    }

    /// Positions held by `strategy` on `instrument`.
    pub fn count_by_strategy_on(&self, strategy: &str, instrument: &str) -> usize {
        self.positions
            .values()
            .filter(|p| p.strategy == strategy && p.instrument == instrument)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.positions.len()
    }

    /// Match the managed set against the broker's open positions.
    pub fn reconcile<F>(&mut self, broker: &[BrokerPosition], is_known_strategy: F) -> Reconciliation
    where
        F: Fn(&str) -> bool,
    {
        let mut outcome = Reconciliation::default();
        let reported: HashSet<PositionId> = broker.iter().map(|b| b.id).collect();

        let missing: Vec<PositionId> = self
            .positions
            .keys()
            .filter(|id| !reported.contains(id))
            .copied()
            .collect();
        for id in missing {
            if let Some(mut position) = self.positions.remove(&id) {
                position.state = PositionState::Closed;
                info!(%id, strategy = %position.strategy, "Position closed at broker");
                outcome.vanished.push(position);
            }
        }

        for report in broker {
            match self.positions.get_mut(&report.id) {
                Some(position) => {
                    position.sync_from(report);
                    if position.state == PositionState::Opening {
                        position.state = PositionState::Open;
                        outcome.confirmed.push(report.id);
                    }
                }
                None if is_known_strategy(&report.strategy) => {
                    info!(id = %report.id, strategy = %report.strategy, "Adopting broker position");
                    self.positions.insert(report.id, Position::adopted(report));
                    outcome.adopted.push(report.id);
                }
                None => {
                    debug!(id = %report.id, tag = %report.strategy, "Ignoring unmanaged broker position");
                    outcome.ignored.push(report.id);
                }
            }
        }

        outcome
    }

    /// Closed trade for a vanished position; falls back to the last reported profit.
    pub fn settle(position: &Position, realized: Option<Decimal>) -> ClosedTrade {
        ClosedTrade::from_position(
            position,
            realized.unwrap_or(position.last_profit),
            CloseReason::Broker,
        )
    }

    /// Apply time exits, partial closes and trailing stops to open positions on
    /// `instrument` at `price`.
    pub async fn manage(
        &mut self,
        instrument: &InstrumentSpec,
        price: Decimal,
        now: DateTime<Utc>,
        hold_limits: &HashMap<String, u64>,
        adapter: &dyn ExecutionAdapter,
    ) -> ManageReport {
        let mut report = ManageReport::default();
        let timeout = self.call_timeout;

        let mut ids: Vec<PositionId> = self
            .positions
            .values()
            .filter(|p| p.is_open() && p.instrument == instrument.symbol)
            .map(|p| p.id)
            .collect();
        ids.sort();

        for id in ids {
            let Some(position) = self.positions.get_mut(&id) else {
                continue;
            };
            let profit_pips = position.observe(price, instrument.pip_size);

            let max_hold = hold_limits.get(&position.strategy).copied();
            if hold_expired(position, now, max_hold) {
                position.state = PositionState::Closing;
                self.close_expired(id, instrument, price, adapter, timeout, &mut report)
                    .await;
                continue;
            }

            let decision = partial_close(position, profit_pips, instrument, &self.config.partial_close);
            match decision {
                PartialClose::Skip => {}
                PartialClose::MarkOnly => {
                    position.partially_closed = true;
                    report.events.push(PositionEvent::PartialCloseMarked { id });
                }
                PartialClose::Close { volume } => {
                    let result =
                        broker_call("close_position", timeout, adapter.close_position(id, Some(volume)))
                            .await;
                    let Some(position) = self.positions.get_mut(&id) else {
                        continue;
                    };
                    match result {
                        Ok(()) => {
                            position.volume -= volume;
                            position.partially_closed = true;
                            info!(%id, closed = %volume, remaining = %position.volume, "Partial close");
                            report.events.push(PositionEvent::PartiallyClosed {
                                id,
                                strategy: position.strategy.clone(),
                                closed_volume: volume,
                                remaining: position.volume,
                            });
                        }
                        Err(error) => {
                            warn!(%id, %error, "Partial close failed");
                            report.events.push(PositionEvent::ActionFailed {
                                id,
                                action: "partial_close",
                                error,
                            });
                        }
                    }
                }
            }

            let Some(position) = self.positions.get(&id) else {
                continue;
            };
            let Some(new_stop) = next_stop(position, price, instrument, &self.config.trailing) else {
                continue;
            };
            let take_profit = position.take_profit;
            let result = broker_call(
                "modify_position",
                timeout,
                adapter.modify_position(id, new_stop, take_profit),
            )
            .await;

            let Some(position) = self.positions.get_mut(&id) else {
                continue;
            };
            match result {
                Ok(()) => {
                    let old_stop = position.stop_loss;
                    position.stop_loss = new_stop;
                    position.trailing_active = true;
                    debug!(%id, %old_stop, %new_stop, "Stop trailed");
                    report.events.push(PositionEvent::StopTrailed {
                        id,
                        strategy: position.strategy.clone(),
                        old_stop,
                        new_stop,
                    });
                }
                Err(error) => {
                    warn!(%id, %error, "Stop modification failed");
                    report.events.push(PositionEvent::ActionFailed {
                        id,
                        action: "modify_position",
                        error,
                    });
                }
            }
        }

        report
    }

    async fn close_expired(
        &mut self,
        id: PositionId,
        instrument: &InstrumentSpec,
        price: Decimal,
        adapter: &dyn ExecutionAdapter,
        timeout: Duration,
        report: &mut ManageReport,
    ) {
        match broker_call("close_position", timeout, adapter.close_position(id, None)).await {
            Ok(()) => {
                let realized = broker_call(
                    "closed_position_profit",
                    timeout,
                    adapter.closed_position_profit(id),
                )
                .await
                .ok()
                .flatten();
                if let Some(position) = self.positions.remove(&id) {
                    let profit =
                        realized.unwrap_or_else(|| position.profit_money(price, instrument));
                    info!(%id, strategy = %position.strategy, %profit, "Time exit");
                    report.events.push(PositionEvent::Closed(ClosedTrade::from_position(
                        &position,
                        profit,
                        CloseReason::TimeExit,
                    )));
                }
            }
            Err(error) => {
                warn!(%id, %error, "Time exit close failed");
                if let Some(position) = self.positions.get_mut(&id) {
                    position.state = PositionState::Open;
                }
                report.events.push(PositionEvent::ActionFailed {
                    id,
                    action: "close_position",
                    error,
                });
            }
        }
    }
}
