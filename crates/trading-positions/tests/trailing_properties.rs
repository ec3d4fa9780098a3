//! Property tests for trailing stops.
//!
//! Feeds a favorable price path through `next_stop`, applying each accepted
//! stop, then a pullback from the peak:
//! 1. Each accepted stop is tighter than the one before
//! 2. A pullback never moves the stop

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trading_core::types::{InstrumentSpec, OrderRequest, Position, PositionId, Side};
use trading_positions::{next_stop, TrailingConfig};

const OPEN: Decimal = dec!(1.10000);

fn position(side: Side) -> Position {
    let stop = match side {
        Side::Buy => dec!(1.09800),
        Side::Sell => dec!(1.10200),
    };
    let request = OrderRequest::market("EURUSD", side, dec!(1), OPEN).with_stops(stop, Decimal::ZERO);
    Position::opening(PositionId::new(), &request, Utc::now())
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

/// Favorable steps in pips, zero allowed.
fn arb_path() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..40, 1..30)
}

fn price_after(side: Side, pips: u32, spec: &InstrumentSpec) -> Decimal {
    OPEN + spec.pips_to_price(Decimal::from(pips)) * side.sign()
}

proptest! {
    #[test]
    fn stop_only_tightens_then_holds_on_pullback(
        side in arb_side(),
        path in arb_path(),
        pullback in 1u32..100,
    ) {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let config = TrailingConfig::default();
        let mut pos = position(side);

        let mut travelled = 0u32;
        for step in path {
            travelled += step;
            let price = price_after(side, travelled, &spec);
            if let Some(stop) = next_stop(&pos, price, &spec, &config) {
                prop_assert!(side.is_tighter(stop, pos.stop_loss));
                pos.stop_loss = stop;
            }
        }

        let peak = price_after(side, travelled, &spec);
        let adverse = peak - spec.pips_to_price(Decimal::from(pullback)) * side.sign();
        prop_assert_eq!(next_stop(&pos, adverse, &spec, &config), None);
    }
}
