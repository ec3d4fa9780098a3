//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use trading_config::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!("Validating built-in defaults and AUTOTRADER__ environment"),
    }

    match load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            let symbols: Vec<&str> = config.engine.instruments.iter().map(|i| i.symbol.as_str()).collect();
            println!("Instruments: {}", symbols.join(", "));
            println!("Max drawdown: {}%", config.risk.max_drawdown_pct);
            println!("Daily loss limit: {}%", config.risk.daily_loss_limit_pct);
            println!("Max positions: {}", config.risk.max_positions);
            for strategy in &config.strategies {
                println!(
                    "Strategy: {} ({}, priority {}, {})",
                    strategy.name,
                    strategy.kind(),
                    strategy.priority,
                    if strategy.enabled { "enabled" } else { "disabled" }
                );
            }
            println!("Forced signals: {}", if config.forced.enabled { "enabled" } else { "disabled" });
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
