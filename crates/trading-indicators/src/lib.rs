//! Technical indicators feeding the replay snapshot provider.
//!
//! - Moving averages (SMA, EMA)
//! - Momentum indicators (RSI, MACD)
//! - Volatility indicators (ATR, Bollinger Bands)
//! - Trend strength (ADX)
//!
//! Every indicator consumes oldest-first slices and returns values aligned to
//! the end of the input, oldest first.

pub mod momentum;
pub mod moving_average;
pub mod trend;
pub mod volatility;

pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::{Ema, Sma};
pub use trend::Adx;
pub use volatility::{Atr, BollingerBands, BollingerOutput};
