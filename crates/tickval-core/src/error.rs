use thiserror::Error;

/// Validation and contract errors exposed by `tickval-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid growth method '{value}', expected one of average, cagr, recent, manual")]
    InvalidGrowthMethod { value: String },
    #[error("invalid source '{value}', expected one of yahoo, edgar")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("rate '{field}' = {value} is outside the accepted range [{min}, {max}]")]
    RateOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("source_chain must contain at least one source")]
    EmptySourceChain,

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Errors raised by the valuation formulas.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValuationError {
    #[error("need at least {needed} years of free cash flow history, found {found}")]
    InsufficientHistory { needed: usize, found: usize },

    #[error("historical cash flows contain no usable year-over-year observation")]
    NoUsableObservation,

    #[error(
        "discount rate {discount_rate} must exceed terminal growth rate {terminal_growth_rate}"
    )]
    TerminalSpread {
        discount_rate: f64,
        terminal_growth_rate: f64,
    },

    #[error("projection horizon must be at least one year")]
    EmptyHorizon,

    #[error("shares outstanding must be positive, found {shares}")]
    InvalidShares { shares: f64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
