//! Error types for the trading engine.
//!
//! [`TradingError`] is the engine-level taxonomy. Each collaborator concern has its
//! own enum that converts into it, so call sites can stay specific while the
//! orchestrator reasons about recoverability in one place.

use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level trading engine error.
#[derive(Error, Debug)]
pub enum TradingError {
    /// Indicator or account data missing or stale. Skip the instrument for this tick.
    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] DataError),

    /// Degenerate sizing or stop inputs. Fall back to the minimum safe size.
    #[error("Invalid risk inputs: {0}")]
    InvalidRiskInputs(#[from] RiskInputError),

    #[error("Insufficient margin: required {required}, available {available}")]
    InsufficientMargin { required: Decimal, available: Decimal },

    #[error("Broker rejected request: {0}")]
    BrokerRejected(BrokerError),

    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("Emergency halt active: {reason}")]
    EmergencyHalt { reason: String },

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

impl TradingError {
    /// Recoverable conditions are handled locally and only surface as telemetry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TradingError::DataUnavailable(_)
                | TradingError::InvalidRiskInputs(_)
                | TradingError::InsufficientMargin { .. }
                | TradingError::BrokerRejected(_)
                | TradingError::Strategy(_)
        )
    }
}

impl From<BrokerError> for TradingError {
    fn from(error: BrokerError) -> Self {
        match error {
            BrokerError::InsufficientMargin {
                required,
                available,
            } => TradingError::InsufficientMargin {
                required,
                available,
            },
            other => TradingError::BrokerRejected(other),
        }
    }
}

/// Strategy-specific errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy {strategy} received parameters for {received}")]
    ParamsMismatch { strategy: String, received: String },

    #[error("Strategy not found: {0}")]
    NotFound(String),
}

/// Execution and account adapter errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("Order rejected ({code}): {reason}")]
    OrderRejected { code: i32, reason: String },

    #[error("Insufficient margin: required {required}, available {available}")]
    InsufficientMargin { required: Decimal, available: Decimal },

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Instrument not tradable: {0}")]
    UnknownInstrument(String),

    #[error("Invalid stops: {0}")]
    InvalidStops(String),

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Indicator and market data errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Insufficient history for {series}: need {required}, have {available}")]
    InsufficientHistory {
        series: String,
        required: usize,
        available: usize,
    },

    #[error("No data available for {0}")]
    NoDataAvailable(String),

    #[error("Stale data for {instrument}: last bar at {last_bar}")]
    Stale { instrument: String, last_bar: String },

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Rejected inputs at the sizing / stop calculation boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskInputError {
    #[error("pip value must be positive, got {0}")]
    NonPositivePipValue(Decimal),

    #[error("pip size must be positive, got {0}")]
    NonPositivePipSize(Decimal),

    #[error("confidence must be a finite value in [0, 100], got {0}")]
    InvalidConfidence(f64),

    #[error("stop distance must be positive, got {0}")]
    NonPositiveStopDistance(Decimal),

    #[error("equity must be positive, got {0}")]
    NonPositiveEquity(Decimal),

    #[error("{name} is not a finite number")]
    NonFinite { name: &'static str },

    #[error("entry price must be positive, got {0}")]
    NonPositivePrice(Decimal),
}

/// Result type alias for engine operations.
pub type TradingResult<T> = Result<T, TradingError>;
