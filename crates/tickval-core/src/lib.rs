//! Core contracts for tickval.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Provider adapters (Yahoo Finance, SEC EDGAR) and routing
//! - The DCF valuation formulas and report
//! - Response envelope and structured errors

pub mod adapters;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod routing;
pub mod source;
pub mod valuation;

pub use adapters::{EdgarAdapter, YahooAdapter};
pub use data_source::{
    CapabilitySet, DataSource, Endpoint, MarketRequest, SourceError, SourceErrorKind,
    StatementsRequest,
};
pub use domain::{
    validate_currency_code, BalanceSnapshot, CashflowYear, CompanyFinancials,
    FinancialStatements, IncomeSnapshot, MarketSnapshot, Symbol, UtcDateTime, FCF_HISTORY_YEARS,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{ValidationError, ValuationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
pub use routing::{RouteError, RouteFailure, RouteResult, RouteSuccess, SourceRouter, SourceRouterBuilder};
pub use source::ProviderId;
pub use valuation::{
    cost_of_equity, estimate_growth_rate, estimate_wacc, valuate, Assumptions, DiscountRate,
    FcfRow, GrowthEstimate, GrowthMethod, GrowthObservation, MarketComparison, ProjectedYear,
    ValuationReport, Verdict, WaccBreakdown, WaccInputs, DEFAULT_MARKET_RISK_PREMIUM,
    DEFAULT_PROJECTION_YEARS, DEFAULT_RISK_FREE_RATE, DEFAULT_TERMINAL_GROWTH_RATE,
};
