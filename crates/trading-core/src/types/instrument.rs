//! Instrument trading geometry.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Static trading properties of an instrument, as published by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Instrument symbol
    pub symbol: String,
    /// Price distance of one pip (e.g. 0.0001 for EURUSD)
    pub pip_size: Decimal,
    /// Money value of one pip for one lot
    pub pip_value: Decimal,
    /// Smallest tradable volume
    pub min_lot: Decimal,
    /// Largest volume the broker accepts per order
    pub max_lot: Decimal,
    /// Volume increment
    pub lot_step: Decimal,
    /// Units per lot, used for margin estimates
    pub contract_size: Decimal,
    /// Broker-enforced minimum distance between price and stops, in pips
    #[serde(default)]
    pub min_stop_distance_pips: Decimal,
    /// Decimal places of quoted prices
    pub price_digits: u32,
}

impl InstrumentSpec {
    /// Convert a price distance to pips.
    pub fn price_to_pips(&self, distance: Decimal) -> Decimal {
        if self.pip_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        distance / self.pip_size
    }

    /// Convert pips to a price distance.
    pub fn pips_to_price(&self, pips: Decimal) -> Decimal {
        pips * self.pip_size
    }

    /// Broker minimum stop distance as a price distance.
    pub fn min_stop_distance(&self) -> Decimal {
        self.pips_to_price(self.min_stop_distance_pips)
    }

    /// Round a volume down to the lot step.
    pub fn floor_volume(&self, volume: Decimal) -> Decimal {
        if self.lot_step <= Decimal::ZERO {
            return volume;
        }
        (volume / self.lot_step).floor() * self.lot_step
    }

    /// Whether `volume` is an exact multiple of the lot step.
    pub fn is_step_multiple(&self, volume: Decimal) -> bool {
        self.lot_step > Decimal::ZERO && (volume % self.lot_step).is_zero()
    }

    /// Round a price down onto the quote grid.
    pub fn floor_price(&self, price: Decimal) -> Decimal {
        price.round_dp_with_strategy(self.price_digits, RoundingStrategy::ToNegativeInfinity)
    }

    /// Round a price up onto the quote grid.
    pub fn ceil_price(&self, price: Decimal) -> Decimal {
        price.round_dp_with_strategy(self.price_digits, RoundingStrategy::ToPositiveInfinity)
    }

    /// Margin needed to open `volume` lots at `price` with the given leverage.
    pub fn required_margin(&self, volume: Decimal, price: Decimal, leverage: Decimal) -> Decimal {
        let notional = volume * self.contract_size * price;
        if leverage <= Decimal::ZERO {
            return notional;
        }
        notional / leverage
    }

    /// Check the lot geometry is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("instrument symbol must not be empty".into());
        }
        if self.pip_size <= Decimal::ZERO {
            return Err(format!("{}: pip_size must be positive", self.symbol));
        }
        if self.pip_value <= Decimal::ZERO {
            return Err(format!("{}: pip_value must be positive", self.symbol));
        }
        if self.lot_step <= Decimal::ZERO {
            return Err(format!("{}: lot_step must be positive", self.symbol));
        }
        if self.min_lot <= Decimal::ZERO || !self.is_step_multiple(self.min_lot) {
            return Err(format!(
                "{}: min_lot {} must be a positive multiple of lot_step {}",
                self.symbol, self.min_lot, self.lot_step
            ));
        }
        if self.max_lot < self.min_lot {
            return Err(format!("{}: max_lot must be >= min_lot", self.symbol));
        }
        if self.min_stop_distance_pips < Decimal::ZERO {
            return Err(format!(
                "{}: min_stop_distance_pips must not be negative",
                self.symbol
            ));
        }
        if self.contract_size <= Decimal::ZERO {
            return Err(format!("{}: contract_size must be positive", self.symbol));
        }
        Ok(())
    }

    /// A typical EURUSD spec, handy in tests and examples.
    pub fn forex_major(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            pip_size: Decimal::new(1, 4),
            pip_value: Decimal::TEN,
            min_lot: Decimal::new(1, 2),
            max_lot: Decimal::ONE_HUNDRED,
            lot_step: Decimal::new(1, 2),
            contract_size: Decimal::from(100_000),
            min_stop_distance_pips: Decimal::ZERO,
            price_digits: 5,
        }
    }
}
