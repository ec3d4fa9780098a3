//! Property tests for position sizing.
//!
//! Uses proptest to verify:
//! 1. Monotonic confidence: more confidence never shrinks the position
//! 2. Volume bounds: every size is a lot-step multiple within [min_lot, max_safe_lot]
//! 3. Risk ceiling: money at risk never exceeds the single-trade cap

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trading_core::types::InstrumentSpec;
use trading_risk::{PositionSizer, RiskAdjustments, SizingRequest};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_equity() -> impl Strategy<Value = Decimal> {
    (100u64..10_000_000u64).prop_map(Decimal::from)
}

fn arb_base_risk() -> impl Strategy<Value = Decimal> {
    (1u32..1000u32).prop_map(|bp| Decimal::new(bp as i64, 2))
}

fn arb_stop_pips() -> impl Strategy<Value = Decimal> {
    (1u32..500u32).prop_map(Decimal::from)
}

fn arb_adjustments() -> impl Strategy<Value = RiskAdjustments> {
    (0u32..=10u32, 0u32..=10u32, prop_oneof![Just(dec!(0.7)), Just(dec!(1)), Just(dec!(1.3))]).prop_map(
        |(wins, losses, vol)| RiskAdjustments {
            win_multiplier: (Decimal::ONE + dec!(0.1) * Decimal::from(wins)).min(dec!(2)),
            loss_divisor: (Decimal::ONE + dec!(0.2) * Decimal::from(losses)).min(dec!(3)),
            volatility_multiplier: vol,
        },
    )
}

fn sizer() -> PositionSizer {
    PositionSizer::new(dec!(5), dec!(10), dec!(20))
}

fn request(
    equity: Decimal,
    base: Decimal,
    confidence: f64,
    stop_pips: Decimal,
    adjustments: RiskAdjustments,
) -> SizingRequest {
    SizingRequest {
        equity,
        base_risk_percent: base,
        confidence,
        stop_loss_distance: stop_pips * dec!(0.0001),
        size_multiplier: Decimal::ONE,
        adjustments,
    }
}

proptest! {
    /// For c1 < c2 with everything else fixed, size(c2) >= size(c1).
    #[test]
    fn size_is_monotonic_in_confidence(
        equity in arb_equity(),
        base in arb_base_risk(),
        stop in arb_stop_pips(),
        adj in arb_adjustments(),
        c1 in 0.0..100.0_f64,
        delta in 0.0..100.0_f64,
    ) {
        let c2 = (c1 + delta).min(100.0);
        let spec = InstrumentSpec::forex_major("EURUSD");
        let sizer = sizer();

        let low = sizer.calculate(&request(equity, base, c1, stop, adj), &spec).unwrap();
        let high = sizer.calculate(&request(equity, base, c2, stop, adj), &spec).unwrap();

        prop_assert!(high.volume >= low.volume);
        prop_assert!(high.risk_amount >= low.risk_amount);
    }

    /// Volume is a positive lot-step multiple within [min_lot, max_safe_lot].
    #[test]
    fn volume_within_bounds(
        equity in arb_equity(),
        base in arb_base_risk(),
        stop in arb_stop_pips(),
        adj in arb_adjustments(),
        confidence in 0.0..=100.0_f64,
    ) {
        let spec = InstrumentSpec::forex_major("EURUSD");
        let sizer = sizer();
        let sizing = sizer.calculate(&request(equity, base, confidence, stop, adj), &spec).unwrap();

        prop_assert!(sizing.volume > Decimal::ZERO);
        prop_assert!(sizing.volume >= spec.min_lot);
        prop_assert!(sizing.volume <= sizer.max_safe_lot(&spec));
        prop_assert!(spec.is_step_multiple(sizing.volume));
    }

    /// Money at risk stays under the hard per-trade ceiling.
    #[test]
    fn risk_under_single_trade_cap(
        equity in arb_equity(),
        base in arb_base_risk(),
        adj in arb_adjustments(),
        confidence in 0.0..=100.0_f64,
    ) {
        let sizer = PositionSizer::new(dec!(100), dec!(10), dec!(20));
        let amount = sizer.risk_amount(&request(equity, base, confidence, dec!(20), adj)).unwrap();
        prop_assert!(amount <= equity * dec!(0.10));
        prop_assert!(amount >= Decimal::ZERO);
    }
}
