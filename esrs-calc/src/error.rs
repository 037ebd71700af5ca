//! Error types for esrs-calc

use thiserror::Error;

/// Result type for calculation operations
pub type CalcResult<T> = std::result::Result<T, CalcError>;

/// Errors raised by the calculation layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// Activity value was negative or not a finite number
    #[error("Invalid activity value: {0}")]
    InvalidActivityValue(f64),

    /// Emission factor value was negative or not a finite number
    #[error("Invalid emission factor: {0}")]
    InvalidFactor(f64),

    /// Emission factor unit could not be parsed
    #[error("Unrecognized emission factor unit: {0}")]
    UnrecognizedUnit(String),

    /// Activity unit does not match the factor's denominator unit
    #[error("Unit mismatch: activity in '{activity}', factor per '{factor}'")]
    UnitMismatch { activity: String, factor: String },

    /// Gas amount was negative or not a finite number
    #[error("Invalid amount for {gas}: {amount}")]
    InvalidGasAmount { gas: String, amount: f64 },

    /// Unknown GWP version, sector or scope code
    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },

    /// Unknown gas identifier
    #[error("Unknown gas: {0}")]
    UnknownGas(String),

    /// Scope 3 category outside 1..=15
    #[error("Scope 3 category must be 1-15, got {0}")]
    InvalidScope3Category(u8),

    /// Data quality attribute outside its allowed range
    #[error("Invalid data quality: {0}")]
    InvalidDataQuality(String),

    /// Uncertainty percentage negative or not finite
    #[error("Invalid uncertainty: {0}")]
    InvalidUncertainty(f64),
}
