//! Paper trading broker for replay and simulation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use trading_core::error::BrokerError;
use trading_core::traits::{AccountProvider, ExecutionAdapter};
use trading_core::types::{
    AccountState, Bar, BrokerPosition, InstrumentSpec, OrderRequest, PositionId, Side,
};

const RETCODE_INVALID_VOLUME: i32 = 10014;
const RETCODE_NO_QUOTES: i32 = 10021;

#[derive(Debug)]
struct PaperState {
    initial_balance: Decimal,
    balance: Decimal,
    leverage: Decimal,
    now: DateTime<Utc>,
    prices: HashMap<String, Decimal>,
    positions: HashMap<PositionId, BrokerPosition>,
    /// Profit already booked by partial closes of open positions
    booked: HashMap<PositionId, Decimal>,
    /// Total realized profit of fully closed positions
    closed: HashMap<PositionId, Decimal>,
}

/// Paper trading broker for simulation.
pub struct PaperBroker {
    state: Arc<Mutex<PaperState>>,
    instruments: HashMap<String, InstrumentSpec>,
    slippage_pips: Decimal,
}

impl PaperBroker {
    /// Create a new paper broker with initial capital.
    pub fn new(initial_balance: Decimal, leverage: Decimal) -> Self {
        Self {
            state: Arc::new(Mutex::new(PaperState {
                initial_balance,
                balance: initial_balance,
                leverage,
                now: DateTime::<Utc>::default(),
                prices: HashMap::new(),
                positions: HashMap::new(),
                booked: HashMap::new(),
                closed: HashMap::new(),
            })),
            instruments: HashMap::new(),
            slippage_pips: Decimal::ZERO,
        }
    }

    /// Make an instrument tradable.
    pub fn with_instrument(mut self, spec: InstrumentSpec) -> Self {
        self.instruments.insert(spec.symbol.clone(), spec);
        self
    }

    /// Adverse fill offset applied to market orders, in pips.
    pub fn with_slippage(mut self, slippage_pips: Decimal) -> Self {
        self.slippage_pips = slippage_pips;
        self
    }

    /// Mark `instrument` at `price`, closing positions whose stops are crossed.
    pub fn set_price(&self, instrument: &str, price: Decimal, now: DateTime<Utc>) -> Vec<PositionId> {
        self.apply_range(instrument, price, price, price, now)
    }

    /// Replay a bar: stops are checked against its range, then the position is
    /// marked at the close. A bar touching both stops is treated as a stop-out.
    pub fn apply_bar(&self, instrument: &str, bar: &Bar) -> Vec<PositionId> {
        let to_decimal = |v: f64| Decimal::try_from(v).unwrap_or(Decimal::ZERO);
        let now = bar.datetime().unwrap_or_else(|| self.state.lock().now);
        self.apply_range(
            instrument,
            to_decimal(bar.high),
            to_decimal(bar.low),
            to_decimal(bar.close),
            now,
        )
    }

    fn apply_range(
        &self,
        instrument: &str,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        now: DateTime<Utc>,
    ) -> Vec<PositionId> {
        let Some(spec) = self.instruments.get(instrument) else {
            return Vec::new();
        };
        let mut state = self.state.lock();
        state.now = now;
        if close > Decimal::ZERO {
            state.prices.insert(instrument.to_string(), close);
        }

        let hits: Vec<(PositionId, Decimal)> = state
            .positions
            .values()
            .filter(|p| p.instrument == instrument)
            .filter_map(|p| stop_hit(p, high, low).map(|level| (p.id, level)))
            .collect();

        let mut closed = Vec::with_capacity(hits.len());
        for (id, level) in hits {
            if let Some(realized) = state.close(id, level, spec) {
                info!(%id, %level, %realized, "Paper stop triggered");
                closed.push(id);
            }
        }
        closed
    }

    /// Settled balance.
    pub fn balance(&self) -> Decimal {
        self.state.lock().balance
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().positions.len()
    }

    fn spec(&self, instrument: &str) -> Result<&InstrumentSpec, BrokerError> {
        self.instruments
            .get(instrument)
            .ok_or_else(|| BrokerError::UnknownInstrument(instrument.to_string()))
    }
}

impl PaperState {
    fn floating(&self, position: &BrokerPosition, spec: &InstrumentSpec) -> Decimal {
        self.prices
            .get(&position.instrument)
            .map(|price| money(position, *price, spec))
            .unwrap_or(Decimal::ZERO)
    }

    fn account(&self, instruments: &HashMap<String, InstrumentSpec>) -> AccountState {
        let mut floating = Decimal::ZERO;
        let mut used_margin = Decimal::ZERO;
        for position in self.positions.values() {
            if let Some(spec) = instruments.get(&position.instrument) {
                floating += self.floating(position, spec);
                used_margin +=
                    spec.required_margin(position.volume, position.open_price, self.leverage);
            }
        }
        let equity = self.balance + floating;
        AccountState {
            balance: self.balance,
            equity,
            free_margin: equity - used_margin,
            leverage: self.leverage,
            initial_balance: self.initial_balance,
        }
    }

    /// Close `id` fully at `price`; returns the total realized profit.
    fn close(&mut self, id: PositionId, price: Decimal, spec: &InstrumentSpec) -> Option<Decimal> {
        let position = self.positions.remove(&id)?;
        let profit = money(&position, price, spec);
        self.balance += profit;
        let total = profit + self.booked.remove(&id).unwrap_or(Decimal::ZERO);
        self.closed.insert(id, total);
        Some(total)
    }
}

/// Money P/L of `position` at `price`.
fn money(position: &BrokerPosition, price: Decimal, spec: &InstrumentSpec) -> Decimal {
    spec.price_to_pips(price - position.open_price) * position.side.sign() * spec.pip_value
        * position.volume
}

/// Level at which a stop is crossed by a `[low, high]` range; stop-loss first.
fn stop_hit(position: &BrokerPosition, high: Decimal, low: Decimal) -> Option<Decimal> {
    let sl = position.stop_loss;
    let tp = position.take_profit;
    let has = |level: Decimal| level > Decimal::ZERO;
    match position.side {
        Side::Buy if has(sl) && low <= sl => Some(sl),
        Side::Buy if has(tp) && high >= tp => Some(tp),
        Side::Sell if has(sl) && high >= sl => Some(sl),
        Side::Sell if has(tp) && low <= tp => Some(tp),
        _ => None,
    }
}

/// Stops must sit on the right side of `price`, at least the broker minimum away.
fn check_stops(
    side: Side,
    price: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
    spec: &InstrumentSpec,
) -> Result<(), BrokerError> {
    let min = spec.min_stop_distance();
    let valid = |level: Decimal, below: bool| {
        level.is_zero()
            || if below {
                price - level >= min && level < price
            } else {
                level - price >= min && level > price
            }
    };
    let (sl_below, tp_below) = match side {
        Side::Buy => (true, false),
        Side::Sell => (false, true),
    };
    if !valid(stop_loss, sl_below) || !valid(take_profit, tp_below) {
        return Err(BrokerError::InvalidStops(format!(
            "{side} at {price}: sl {stop_loss}, tp {take_profit}, min distance {min}"
        )));
    }
    Ok(())
}

#[async_trait]
impl AccountProvider for PaperBroker {
    async fn get_account_state(&self) -> Result<AccountState, BrokerError> {
        Ok(self.state.lock().account(&self.instruments))
    }
}

#[async_trait]
impl ExecutionAdapter for PaperBroker {
    async fn submit_order(&self, request: OrderRequest) -> Result<PositionId, BrokerError> {
        let spec = self.spec(&request.instrument)?;

        if request.volume < spec.min_lot
            || request.volume > spec.max_lot
            || !spec.is_step_multiple(request.volume)
        {
            return Err(BrokerError::OrderRejected {
                code: RETCODE_INVALID_VOLUME,
                reason: format!("invalid volume {}", request.volume),
            });
        }

        let mut state = self.state.lock();
        let price = state
            .prices
            .get(&request.instrument)
            .copied()
            .ok_or_else(|| BrokerError::OrderRejected {
                code: RETCODE_NO_QUOTES,
                reason: format!("no price for {}", request.instrument),
            })?;
        check_stops(request.side, price, request.stop_loss, request.take_profit, spec)?;

        let fill = price + spec.pips_to_price(self.slippage_pips) * request.side.sign();
        let required = spec.required_margin(request.volume, fill, state.leverage);
        let available = state.account(&self.instruments).free_margin;
        if required > available {
            return Err(BrokerError::InsufficientMargin {
                required,
                available,
            });
        }

        let id = PositionId::new();
        let position = BrokerPosition {
            id,
            instrument: request.instrument.clone(),
            side: request.side,
            volume: request.volume,
            open_price: fill,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            open_time: state.now,
            profit: Decimal::ZERO,
            strategy: request.strategy.clone(),
        };
        debug!(%id, instrument = %request.instrument, side = %request.side, volume = %request.volume, %fill, comment = %request.comment, "Paper fill");
        state.positions.insert(id, position);
        Ok(id)
    }

    async fn modify_position(
        &self,
        id: PositionId,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        let (side, instrument) = state
            .positions
            .get(&id)
            .map(|p| (p.side, p.instrument.clone()))
            .ok_or_else(|| BrokerError::PositionNotFound(id.to_string()))?;
        let spec = self.spec(&instrument)?;
        if let Some(price) = state.prices.get(&instrument).copied() {
            check_stops(side, price, stop_loss, take_profit, spec)?;
        }
        if let Some(position) = state.positions.get_mut(&id) {
            position.stop_loss = stop_loss;
            position.take_profit = take_profit;
        }
        Ok(())
    }

    async fn close_position(
        &self,
        id: PositionId,
        volume: Option<Decimal>,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        let (instrument, open_volume) = state
            .positions
            .get(&id)
            .map(|p| (p.instrument.clone(), p.volume))
            .ok_or_else(|| BrokerError::PositionNotFound(id.to_string()))?;
        let spec = self.spec(&instrument)?;
        let price = state
            .prices
            .get(&instrument)
            .copied()
            .ok_or_else(|| BrokerError::OrderRejected {
                code: RETCODE_NO_QUOTES,
                reason: format!("no price for {instrument}"),
            })?;

        match volume {
            Some(part) if part < open_volume => {
                if part <= Decimal::ZERO
                    || !spec.is_step_multiple(part)
                    || open_volume - part < spec.min_lot
                {
                    return Err(BrokerError::OrderRejected {
                        code: RETCODE_INVALID_VOLUME,
                        reason: format!("cannot close {part} of {open_volume}"),
                    });
                }
                let Some(position) = state.positions.get_mut(&id) else {
                    return Err(BrokerError::PositionNotFound(id.to_string()));
                };
                position.volume -= part;
                let profit = money(position, price, spec) / position.volume * part;
                state.balance += profit;
                *state.booked.entry(id).or_insert(Decimal::ZERO) += profit;
                debug!(%id, %part, %profit, "Paper partial close");
            }
            _ => {
                if let Some(realized) = state.close(id, price, spec) {
                    debug!(%id, %realized, "Paper close");
                }
            }
        }
        Ok(())
    }

    async fn list_open_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        let state = self.state.lock();
        let mut positions: Vec<BrokerPosition> = state
            .positions
            .values()
            .map(|p| {
                let mut view = p.clone();
                if let Some(spec) = self.instruments.get(&p.instrument) {
                    view.profit = state.floating(p, spec);
                }
                view
            })
            .collect();
        positions.sort_by_key(|p| p.open_time);
        Ok(positions)
    }

    async fn closed_position_profit(&self, id: PositionId) -> Result<Option<Decimal>, BrokerError> {
        Ok(self.state.lock().closed.get(&id).copied())
    }

    fn name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
    }

    fn broker() -> PaperBroker {
        let broker = PaperBroker::new(dec!(10000), dec!(100))
            .with_instrument(InstrumentSpec::forex_major("EURUSD"));
        broker.set_price("EURUSD", dec!(1.25), t0());
        broker
    }

    fn long(volume: Decimal) -> OrderRequest {
        OrderRequest::market("EURUSD", Side::Buy, volume, dec!(1.25))
            .with_stops(dec!(1.248), dec!(1.254))
            .with_strategy("reversal")
    }

    #[tokio::test]
    async fn test_fill_reserves_margin() {
        let broker = broker();
        let id = broker.submit_order(long(dec!(0.5))).await.unwrap();

        let account = broker.get_account_state().await.unwrap();
        // 0.5 lots * 100k * 1.25 / 100
        assert_eq!(account.free_margin, dec!(9375));
        assert_eq!(account.equity, dec!(10000));

        let open = broker.list_open_positions().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, id);
        assert_eq!(open[0].strategy, "reversal");
        assert_eq!(open[0].open_time, t0());
    }

    #[tokio::test]
    async fn test_insufficient_margin() {
        let broker = broker();
        let err = broker
            .submit_order(OrderRequest::market("EURUSD", Side::Buy, dec!(10), dec!(1.25)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BrokerError::InsufficientMargin {
                required: dec!(12500),
                available: dec!(10000),
            }
        );
    }

    #[tokio::test]
    async fn test_rejects_bad_volume_and_stops() {
        let broker = broker();
        assert!(matches!(
            broker.submit_order(long(dec!(0.015))).await,
            Err(BrokerError::OrderRejected { code: RETCODE_INVALID_VOLUME, .. })
        ));

        let wrong_side = OrderRequest::market("EURUSD", Side::Sell, dec!(0.1), dec!(1.25))
            .with_stops(dec!(1.248), dec!(1.254));
        assert!(matches!(
            broker.submit_order(wrong_side).await,
            Err(BrokerError::InvalidStops(_))
        ));

        let unknown = OrderRequest::market("XAUUSD", Side::Buy, dec!(0.1), dec!(2000));
        assert!(matches!(
            broker.submit_order(unknown).await,
            Err(BrokerError::UnknownInstrument(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_loss_on_bar_range() {
        let broker = broker();
        let id = broker.submit_order(long(dec!(0.5))).await.unwrap();

        let bar = Bar::new(t0().timestamp_millis() + 3_600_000, 1.25, 1.2505, 1.2479, 1.2490, 0.0);
        let closed = broker.apply_bar("EURUSD", &bar);

        assert_eq!(closed, vec![id]);
        // -20 pips * $10 * 0.5 lots
        assert_eq!(broker.closed_position_profit(id).await.unwrap(), Some(dec!(-100)));
        assert_eq!(broker.balance(), dec!(9900));
        assert_eq!(broker.open_count(), 0);
    }

    #[tokio::test]
    async fn test_take_profit_on_price_update() {
        let broker = broker();
        let id = broker.submit_order(long(dec!(0.1))).await.unwrap();

        assert!(broker.set_price("EURUSD", dec!(1.2520), t0()).is_empty());
        let account = broker.get_account_state().await.unwrap();
        assert_eq!(account.equity, dec!(10020));

        assert_eq!(broker.set_price("EURUSD", dec!(1.2541), t0()), vec![id]);
        assert_eq!(broker.closed_position_profit(id).await.unwrap(), Some(dec!(40)));
    }

    #[tokio::test]
    async fn test_partial_then_full_close_books_total() {
        let broker = broker();
        let id = broker.submit_order(long(dec!(0.2))).await.unwrap();
        broker.set_price("EURUSD", dec!(1.2530), t0());

        broker.close_position(id, Some(dec!(0.1))).await.unwrap();
        assert_eq!(broker.balance(), dec!(10030));
        let open = broker.list_open_positions().await.unwrap();
        assert_eq!(open[0].volume, dec!(0.1));
        assert_eq!(open[0].profit, dec!(30));

        broker.close_position(id, None).await.unwrap();
        assert_eq!(broker.closed_position_profit(id).await.unwrap(), Some(dec!(60)));
        assert_eq!(broker.balance(), dec!(10060));
    }

    #[tokio::test]
    async fn test_modify_checks_stops() {
        let broker = broker();
        let id = broker.submit_order(long(dec!(0.1))).await.unwrap();

        broker
            .modify_position(id, dec!(1.249), dec!(1.254))
            .await
            .unwrap();
        assert_eq!(broker.list_open_positions().await.unwrap()[0].stop_loss, dec!(1.249));

        assert!(matches!(
            broker.modify_position(id, dec!(1.251), dec!(1.254)).await,
            Err(BrokerError::InvalidStops(_))
        ));
        assert!(matches!(
            broker.modify_position(PositionId::new(), dec!(1.249), dec!(1.254)).await,
            Err(BrokerError::PositionNotFound(_))
        ));
    }
}
