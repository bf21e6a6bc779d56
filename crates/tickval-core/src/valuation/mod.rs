//! Closed-form valuation formulas: growth estimation, WACC, and the
//! discounted-cash-flow model itself.

mod dcf;
mod growth;
mod wacc;

pub use dcf::{
    valuate, Assumptions, DiscountRate, FcfRow, MarketComparison, ProjectedYear, ValuationReport,
    Verdict, DEFAULT_MARKET_RISK_PREMIUM, DEFAULT_PROJECTION_YEARS, DEFAULT_RISK_FREE_RATE,
    DEFAULT_TERMINAL_GROWTH_RATE,
};
pub use growth::{
    estimate_growth_rate, GrowthEstimate, GrowthMethod, GrowthObservation, GROWTH_RATE_CAP,
    GROWTH_RATE_FLOOR,
};
pub use wacc::{
    cost_of_equity, estimate_wacc, WaccBreakdown, WaccInputs, DEFAULT_BETA, DEFAULT_COST_OF_DEBT,
    DEFAULT_TAX_RATE, WACC_FLOOR,
};
