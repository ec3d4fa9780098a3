//! Ordered strategy set and the built-in strategy catalogue.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use trading_core::error::StrategyError;

use crate::config::{StrategyConfig, StrategyKind};
use crate::generator::SignalGenerator;
use crate::{ExtremeReversal, GridRecovery, MomentumCrossover, NewsEvent, VolatilityBreakout};

/// Information about a built-in strategy kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Kind tag used in configuration
    pub kind: StrategyKind,
    /// Strategy description
    pub description: String,
    /// Default parameters as JSON
    pub default_params: serde_json::Value,
}

/// All built-in strategy kinds with their default parameters.
pub fn catalogue() -> Vec<StrategyInfo> {
    StrategyKind::ALL
        .iter()
        .map(|kind| StrategyInfo {
            kind: *kind,
            description: kind.description().to_string(),
            default_params: serde_json::to_value(kind.default_params())
                .unwrap_or(serde_json::Value::Null),
        })
        .collect()
}

/// Build a fresh generator for `kind`.
pub fn create_generator(kind: StrategyKind) -> Box<dyn SignalGenerator> {
    match kind {
        StrategyKind::ExtremeReversal => Box::new(ExtremeReversal::new()),
        StrategyKind::VolatilityBreakout => Box::new(VolatilityBreakout::new()),
        StrategyKind::MomentumCrossover => Box::new(MomentumCrossover::new()),
        StrategyKind::NewsEvent => Box::new(NewsEvent::new()),
        StrategyKind::GridRecovery => Box::new(GridRecovery::new()),
    }
}

/// Check a full strategy list: each config valid, names unique, and event
/// windows demanding more volatility than any generic breakout.
pub fn validate_strategies(configs: &[StrategyConfig]) -> Result<(), StrategyError> {
    let mut names = HashSet::new();
    for config in configs {
        config.validate()?;
        if !names.insert(config.name.as_str()) {
            return Err(StrategyError::InvalidConfig(format!(
                "duplicate strategy name '{}'",
                config.name
            )));
        }
    }

    let max_breakout = configs
        .iter()
        .filter(|c| c.kind() == StrategyKind::VolatilityBreakout)
        .filter_map(|c| c.params.breakout_ratio())
        .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.max(r))));

    if let Some(breakout) = max_breakout {
        for config in configs.iter().filter(|c| c.kind() == StrategyKind::NewsEvent) {
            let ratio = config.params.breakout_ratio().unwrap_or(0.0);
            if ratio <= breakout {
                return Err(StrategyError::InvalidConfig(format!(
                    "{}: news breakout_ratio {ratio} must exceed the volatility breakout ratio {breakout}",
                    config.name
                )));
            }
        }
    }

    Ok(())
}

/// A configured strategy with its generator.
pub struct StrategyEntry {
    pub config: StrategyConfig,
    pub generator: Box<dyn SignalGenerator>,
}

/// Strategies in evaluation order: priority ascending, then name.
#[derive(Default)]
pub struct StrategySet {
    entries: Vec<StrategyEntry>,
}

impl StrategySet {
    /// Validate and build a set from configuration.
    pub fn from_configs(configs: Vec<StrategyConfig>) -> Result<Self, StrategyError> {
        validate_strategies(&configs)?;
        let mut entries: Vec<StrategyEntry> = configs
            .into_iter()
            .map(|config| StrategyEntry {
                generator: create_generator(config.kind()),
                config,
            })
            .collect();
        sort_entries(&mut entries);
        info!(count = entries.len(), "Strategy set built");
        Ok(Self { entries })
    }

    /// Replace the configuration. Generators of strategies whose name and kind
    /// are unchanged keep their memory. On error the current set is untouched.
    pub fn reload(&mut self, configs: Vec<StrategyConfig>) -> Result<(), StrategyError> {
        validate_strategies(&configs)?;

        let mut previous: HashMap<String, StrategyEntry> = self
            .entries
            .drain(..)
            .map(|entry| (entry.config.name.clone(), entry))
            .collect();

        let mut entries = Vec::with_capacity(configs.len());
        for config in configs {
            let generator = match previous.remove(&config.name) {
                Some(old) if old.generator.kind() == config.kind() => {
                    debug!(strategy = %config.name, "Strategy state kept across reload");
                    old.generator
                }
                _ => create_generator(config.kind()),
            };
            entries.push(StrategyEntry { config, generator });
        }
        sort_entries(&mut entries);
        self.entries = entries;
        info!(count = self.entries.len(), "Strategy set reloaded");
        Ok(())
    }

    /// Enabled strategies in evaluation order.
    pub fn enabled_mut(&mut self) -> impl Iterator<Item = &mut StrategyEntry> {
        self.entries.iter_mut().filter(|e| e.config.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategyEntry> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&StrategyConfig> {
        self.entries
            .iter()
            .find(|e| e.config.name == name)
            .map(|e| &e.config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.config.name.as_str()).collect()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut StrategyEntry> {
        self.entries.iter_mut().find(|e| e.config.name == name)
    }

    /// Names of enabled strategies in evaluation order.
    pub fn enabled_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.config.enabled)
            .map(|e| e.config.name.clone())
            .collect()
    }

    /// Tell one strategy its last signal on `instrument` was not placed.
    pub fn notify_order_failed(&mut self, name: &str, instrument: &str) {
        if let Some(entry) = self.get_mut(name) {
            entry.generator.on_order_failed(instrument);
        }
    }

    /// Notify one strategy that it holds nothing on `instrument`.
    pub fn notify_flat(&mut self, name: &str, instrument: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.config.name == name) {
            entry.generator.on_flat(instrument);
        }
    }

    /// Reset every generator's memory.
    pub fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.generator.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sort_entries(entries: &mut [StrategyEntry]) {
    entries.sort_by(|a, b| {
        a.config
            .priority
            .cmp(&b.config.priority)
            .then_with(|| a.config.name.cmp(&b.config.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NewsEventParams, StrategyParams, VolatilityBreakoutParams};
    use chrono::Utc;
    use trading_core::types::{IndicatorSnapshot, Series};

    fn config(name: &str, kind: StrategyKind, priority: u32) -> StrategyConfig {
        StrategyConfig::new(name, kind.default_params()).with_priority(priority)
    }

    #[test]
    fn test_catalogue_lists_every_kind() {
        let entries = catalogue();
        assert_eq!(entries.len(), 5);
        assert!(entries
            .iter()
            .all(|e| e.default_params.get("kind").is_some()));
    }

    #[test]
    fn test_ordering_by_priority_then_name() {
        let set = StrategySet::from_configs(vec![
            config("zeta", StrategyKind::ExtremeReversal, 1),
            config("beta", StrategyKind::MomentumCrossover, 2),
            config("alpha", StrategyKind::GridRecovery, 2),
        ])
        .unwrap();
        assert_eq!(set.names(), vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = StrategySet::from_configs(vec![
            config("same", StrategyKind::ExtremeReversal, 1),
            config("same", StrategyKind::GridRecovery, 2),
        ]);
        assert!(matches!(result, Err(StrategyError::InvalidConfig(_))));
    }

    #[test]
    fn test_news_ratio_must_exceed_breakout() {
        let breakout = StrategyConfig::new(
            "breakout",
            StrategyParams::VolatilityBreakout(VolatilityBreakoutParams {
                breakout_ratio: 2.5,
                ..Default::default()
            }),
        );
        let news = StrategyConfig::new(
            "news",
            StrategyParams::NewsEvent(NewsEventParams {
                breakout_ratio: 2.0,
                ..Default::default()
            }),
        );
        assert!(validate_strategies(&[breakout, news]).is_err());
    }

    #[test]
    fn test_reload_keeps_state_for_unchanged_kind() {
        let mut set =
            StrategySet::from_configs(vec![config("grid", StrategyKind::GridRecovery, 1)]).unwrap();
        let snap = IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001)
            .with_series(Series::Close, vec![1.1000]);

        for entry in set.enabled_mut() {
            let _ = entry.generator.evaluate(&snap, &entry.config).unwrap();
        }

        // Same name and kind, new spacing: anchor survives, so a 25-pip move fires
        let mut updated = config("grid", StrategyKind::GridRecovery, 1);
        if let StrategyParams::GridRecovery(p) = &mut updated.params {
            p.spacing_pips = 25.0;
        }
        set.reload(vec![updated]).unwrap();

        let moved = IndicatorSnapshot::new("EURUSD", Utc::now(), 0.0001)
            .with_series(Series::Close, vec![1.0970]);
        let entry = set.enabled_mut().next().unwrap();
        let signal = entry.generator.evaluate(&moved, &entry.config).unwrap();
        assert!(signal.is_some());
    }

    #[test]
    fn test_failed_reload_keeps_previous_set() {
        let mut set =
            StrategySet::from_configs(vec![config("rsi", StrategyKind::ExtremeReversal, 1)]).unwrap();
        let mut bad = config("rsi", StrategyKind::ExtremeReversal, 1);
        bad.max_positions = 0;

        assert!(set.reload(vec![bad]).is_err());
        assert_eq!(set.names(), vec!["rsi"]);
        assert_eq!(set.get("rsi").map(|c| c.max_positions), Some(3));
    }

    #[test]
    fn test_disabled_strategies_are_skipped() {
        let mut disabled = config("off", StrategyKind::ExtremeReversal, 1);
        disabled.enabled = false;
        let mut set = StrategySet::from_configs(vec![
            disabled,
            config("on", StrategyKind::GridRecovery, 2),
        ])
        .unwrap();

        let enabled: Vec<_> = set.enabled_mut().map(|e| e.config.name.clone()).collect();
        assert_eq!(enabled, vec!["on".to_string()]);
        assert!(set.contains("off"));
    }
}
