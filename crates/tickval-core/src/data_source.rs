use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{FinancialStatements, MarketSnapshot, ProviderId, Symbol};

/// Data endpoint type used for routing and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Current price, beta, market cap, shares outstanding.
    Market,
    /// Cash-flow, balance-sheet, and income-statement line items.
    Statements,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Statements => "statements",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub market: bool,
    pub statements: bool,
}

impl CapabilitySet {
    pub const fn new(market: bool, statements: bool) -> Self {
        Self { market, statements }
    }

    pub const fn full() -> Self {
        Self::new(true, true)
    }

    pub const fn statements_only() -> Self {
        Self::new(false, true)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Market => self.market,
            Endpoint::Statements => self.statements,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(2);
        if self.market {
            values.push("market");
        }
        if self.statements {
            values.push("statements");
        }
        values
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    UnsupportedEndpoint,
    Unavailable,
    RateLimited,
    InvalidRequest,
    /// The provider answered but the statements are missing the line items
    /// a valuation needs.
    IncompleteData,
    Internal,
}

/// Structured source error used by router fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by this source"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn incomplete_data(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::IncompleteData,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::IncompleteData => "source.incomplete_data",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for the market endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRequest {
    pub symbol: Symbol,
}

impl MarketRequest {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }
}

/// Request payload for the statements endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementsRequest {
    pub symbol: Symbol,
    /// Trailing fiscal years of cash flow wanted.
    pub years: usize,
}

impl StatementsRequest {
    pub fn new(symbol: Symbol, years: usize) -> Result<Self, SourceError> {
        if years == 0 {
            return Err(SourceError::invalid_request(
                "statements request must cover at least one fiscal year",
            ));
        }
        Ok(Self { symbol, years })
    }
}

/// Source adapter contract.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;
    fn capabilities(&self) -> CapabilitySet;

    fn market<'a>(
        &'a self,
        req: MarketRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketSnapshot, SourceError>> + Send + 'a>>;

    fn statements<'a>(
        &'a self,
        req: StatementsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FinancialStatements, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_request_rejects_zero_years() {
        let symbol = Symbol::parse("AAPL").expect("symbol");
        let err = StatementsRequest::new(symbol, 0).expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
    }

    #[test]
    fn capability_sets_report_supported_endpoints() {
        assert!(CapabilitySet::full().supports(Endpoint::Market));
        assert!(!CapabilitySet::statements_only().supports(Endpoint::Market));
        assert_eq!(
            CapabilitySet::statements_only().supported_endpoints(),
            vec!["statements"]
        );
    }
}
