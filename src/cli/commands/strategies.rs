//! List strategies command.

use anyhow::Result;
use trading_strategies::catalogue;

pub async fn run() -> Result<()> {
    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in catalogue() {
        println!("  {} ", info.kind);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  defaults: {}", info.default_params);
        println!();
    }

    println!("Configure instances with [[strategies]] tables; params.kind selects the strategy.");

    Ok(())
}
