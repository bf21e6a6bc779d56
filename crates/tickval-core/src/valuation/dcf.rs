use serde::{Deserialize, Serialize};

use crate::domain::models::validate_rate;
use crate::valuation::growth::{estimate_growth_rate, GrowthEstimate, GrowthMethod};
use crate::valuation::wacc::{estimate_wacc, WaccBreakdown, WaccInputs};
use crate::{CashflowYear, CompanyFinancials, Symbol, ValuationError};

pub const DEFAULT_PROJECTION_YEARS: usize = 10;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.04;
pub const DEFAULT_MARKET_RISK_PREMIUM: f64 = 0.06;
pub const DEFAULT_TERMINAL_GROWTH_RATE: f64 = 0.025;

/// Where the discount rate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRate {
    /// Estimate WACC from market data and statements.
    Auto,
    /// User-supplied rate as a fraction.
    Manual(f64),
}

/// Assumption set for one valuation run. Rates are fractions, not percents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    pub growth_method: GrowthMethod,
    pub discount_rate: DiscountRate,
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
    pub terminal_growth_rate: f64,
    pub projection_years: usize,
}

impl Assumptions {
    /// Validate an assumption set against the accepted input ranges.
    pub fn new(
        growth_method: GrowthMethod,
        discount_rate: DiscountRate,
        risk_free_rate: f64,
        market_risk_premium: f64,
        terminal_growth_rate: f64,
        projection_years: usize,
    ) -> Result<Self, ValuationError> {
        if projection_years == 0 {
            return Err(ValuationError::EmptyHorizon);
        }
        validate_rate("risk_free_rate", risk_free_rate, 0.0, 0.10)?;
        validate_rate("market_risk_premium", market_risk_premium, 0.0, 0.15)?;
        validate_rate("terminal_growth_rate", terminal_growth_rate, 0.0, 0.05)?;
        if let DiscountRate::Manual(rate) = discount_rate {
            validate_rate("discount_rate", rate, 0.01, 0.30)?;
        }

        Ok(Self {
            growth_method,
            discount_rate,
            risk_free_rate,
            market_risk_premium,
            terminal_growth_rate,
            projection_years,
        })
    }
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            growth_method: GrowthMethod::Average,
            discount_rate: DiscountRate::Auto,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            market_risk_premium: DEFAULT_MARKET_RISK_PREMIUM,
            terminal_growth_rate: DEFAULT_TERMINAL_GROWTH_RATE,
            projection_years: DEFAULT_PROJECTION_YEARS,
        }
    }
}

/// One projected year with its discounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedYear {
    pub year: u32,
    pub fcf: f64,
    pub discount_factor: f64,
    pub discounted_fcf: f64,
}

/// One historical fiscal year of the FCF derivation, for the breakdown view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FcfRow {
    pub fiscal_year: i32,
    pub operating_cash_flow: f64,
    pub capital_expenditure: f64,
    pub free_cash_flow: f64,
}

impl From<&CashflowYear> for FcfRow {
    fn from(year: &CashflowYear) -> Self {
        Self {
            fiscal_year: year.fiscal_year(),
            operating_cash_flow: year.operating_cash_flow,
            capital_expenditure: year.capital_expenditure,
            free_cash_flow: year.free_cash_flow(),
        }
    }
}

/// Valuation verdict against the current market price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Undervalued,
    Overvalued,
}

/// Comparison of intrinsic per-share value with the market price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketComparison {
    pub current_price: f64,
    /// (per_share_value - price) / price, as a percentage.
    pub premium_pct: f64,
    pub verdict: Verdict,
}

/// Full output of a valuation run, including the intermediates the
/// breakdown views render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub symbol: Symbol,
    pub currency: String,
    pub current_fcf: f64,
    pub growth: GrowthEstimate,
    pub discount_rate: f64,
    /// Present when the discount rate was auto-estimated.
    pub wacc: Option<WaccBreakdown>,
    pub terminal_growth_rate: f64,
    pub fcf_rows: Vec<FcfRow>,
    pub projections: Vec<ProjectedYear>,
    pub sum_discounted_fcf: f64,
    pub terminal_value: f64,
    pub discounted_terminal_value: f64,
    pub enterprise_value: f64,
    pub net_debt: f64,
    pub equity_value: f64,
    pub shares_outstanding: f64,
    pub per_share_value: f64,
    /// Absent when the quote had no usable current price.
    pub comparison: Option<MarketComparison>,
}

/// Run the discounted-cash-flow valuation over fetched company data.
pub fn valuate(
    company: &CompanyFinancials,
    assumptions: &Assumptions,
) -> Result<ValuationReport, ValuationError> {
    if assumptions.projection_years == 0 {
        return Err(ValuationError::EmptyHorizon);
    }

    let fcf_history = company.fcf_history();
    let current_fcf = *fcf_history
        .first()
        .ok_or(ValuationError::InsufficientHistory { needed: 1, found: 0 })?;

    let growth = estimate_growth_rate(&fcf_history, assumptions.growth_method)?;

    let (discount_rate, wacc) = match assumptions.discount_rate {
        DiscountRate::Manual(rate) => (rate, None),
        DiscountRate::Auto => {
            let breakdown = estimate_wacc(WaccInputs::from_company(
                company,
                assumptions.risk_free_rate,
                assumptions.market_risk_premium,
            ))?;
            (breakdown.wacc, Some(breakdown))
        }
    };

    if discount_rate <= assumptions.terminal_growth_rate {
        return Err(ValuationError::TerminalSpread {
            discount_rate,
            terminal_growth_rate: assumptions.terminal_growth_rate,
        });
    }

    let mut projections = Vec::with_capacity(assumptions.projection_years);
    for year in 1..=assumptions.projection_years as u32 {
        let fcf = current_fcf * (1.0 + growth.rate).powi(year as i32);
        let discount_factor = 1.0 / (1.0 + discount_rate).powi(year as i32);
        projections.push(ProjectedYear {
            year,
            fcf,
            discount_factor,
            discounted_fcf: fcf * discount_factor,
        });
    }

    let sum_discounted_fcf: f64 = projections.iter().map(|p| p.discounted_fcf).sum();

    let final_fcf = projections
        .last()
        .map(|p| p.fcf)
        .unwrap_or(current_fcf);
    let terminal_value = final_fcf * (1.0 + assumptions.terminal_growth_rate)
        / (discount_rate - assumptions.terminal_growth_rate);
    let discounted_terminal_value =
        terminal_value / (1.0 + discount_rate).powi(assumptions.projection_years as i32);

    let enterprise_value = sum_discounted_fcf + discounted_terminal_value;
    let net_debt = company.statements.balance.net_debt();
    let equity_value = enterprise_value - net_debt;

    let shares_outstanding = company
        .market
        .shares_outstanding
        .filter(|shares| *shares > 0.0)
        .ok_or(ValuationError::InvalidShares {
            shares: company.market.shares_outstanding.unwrap_or(0.0),
        })?;
    let per_share_value = equity_value / shares_outstanding;

    let comparison = company
        .market
        .price
        .filter(|price| *price > 0.0)
        .map(|current_price| {
            let premium_pct = (per_share_value - current_price) / current_price * 100.0;
            MarketComparison {
                current_price,
                premium_pct,
                verdict: if premium_pct > 0.0 {
                    Verdict::Undervalued
                } else {
                    Verdict::Overvalued
                },
            }
        });

    Ok(ValuationReport {
        symbol: company.market.symbol.clone(),
        currency: company.market.currency.clone(),
        current_fcf,
        growth,
        discount_rate,
        wacc,
        terminal_growth_rate: assumptions.terminal_growth_rate,
        fcf_rows: company.fcf_years().iter().map(FcfRow::from).collect(),
        projections,
        sum_discounted_fcf,
        terminal_value,
        discounted_terminal_value,
        enterprise_value,
        net_debt,
        equity_value,
        shares_outstanding,
        per_share_value,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BalanceSnapshot, FinancialStatements, IncomeSnapshot, MarketSnapshot, UtcDateTime,
    };

    fn company(price: Option<f64>, shares: Option<f64>) -> CompanyFinancials {
        let period = |input: &str| UtcDateTime::parse(input).expect("timestamp");
        let years = vec![
            CashflowYear::new(period("2024-12-31T00:00:00Z"), 121.0, 11.0).expect("year"),
            CashflowYear::new(period("2023-12-31T00:00:00Z"), 110.0, 10.0).expect("year"),
            CashflowYear::new(period("2022-12-31T00:00:00Z"), 100.0, 0.0).expect("year"),
        ];
        let market = MarketSnapshot::new(
            Symbol::parse("AAPL").expect("symbol"),
            price,
            Some(1.0),
            Some(2_000.0),
            shares,
            "USD",
            period("2024-12-31T00:00:00Z"),
        )
        .expect("market");
        let statements = FinancialStatements::new(
            years,
            BalanceSnapshot::new(Some(50.0), Some(20.0)).expect("balance"),
            IncomeSnapshot::default(),
        );
        CompanyFinancials::new(market, statements)
    }

    fn manual_assumptions(discount: f64, growth: f64) -> Assumptions {
        Assumptions::new(
            GrowthMethod::Manual(growth),
            DiscountRate::Manual(discount),
            DEFAULT_RISK_FREE_RATE,
            DEFAULT_MARKET_RISK_PREMIUM,
            DEFAULT_TERMINAL_GROWTH_RATE,
            DEFAULT_PROJECTION_YEARS,
        )
        .expect("assumptions")
    }

    #[test]
    fn projection_follows_compound_growth_year_over_year() {
        let report = valuate(&company(Some(100.0), Some(10.0)), &manual_assumptions(0.10, 0.05))
            .expect("must valuate");

        assert_eq!(report.projections.len(), 10);
        // FCF history head: 121 - 11 = 110.
        assert!((report.current_fcf - 110.0).abs() < 1e-9);
        for projected in &report.projections {
            let expected = 110.0 * 1.05_f64.powi(projected.year as i32);
            assert!((projected.fcf - expected).abs() < 1e-9);
            let factor = 1.0 / 1.10_f64.powi(projected.year as i32);
            assert!((projected.discount_factor - factor).abs() < 1e-12);
            assert!((projected.discounted_fcf - expected * factor).abs() < 1e-9);
        }
    }

    #[test]
    fn terminal_value_matches_perpetuity_formula() {
        let report = valuate(&company(Some(100.0), Some(10.0)), &manual_assumptions(0.10, 0.05))
            .expect("must valuate");

        let final_fcf = report.projections.last().expect("ten years").fcf;
        let expected_tv = final_fcf * 1.025 / (0.10 - 0.025);
        assert!((report.terminal_value - expected_tv).abs() < 1e-6);

        let expected_discounted = expected_tv / 1.10_f64.powi(10);
        assert!((report.discounted_terminal_value - expected_discounted).abs() < 1e-6);
    }

    #[test]
    fn enterprise_equity_and_per_share_chain_up() {
        let report = valuate(&company(Some(100.0), Some(10.0)), &manual_assumptions(0.10, 0.05))
            .expect("must valuate");

        let expected_ev = report.sum_discounted_fcf + report.discounted_terminal_value;
        assert!((report.enterprise_value - expected_ev).abs() < 1e-9);
        // Net debt: 50 - 20.
        assert!((report.net_debt - 30.0).abs() < 1e-12);
        assert!((report.equity_value - (expected_ev - 30.0)).abs() < 1e-9);
        assert!((report.per_share_value - report.equity_value / 10.0).abs() < 1e-9);
    }

    #[test]
    fn discount_rate_at_or_below_terminal_growth_is_rejected() {
        let err = valuate(&company(Some(100.0), Some(10.0)), &manual_assumptions(0.02, 0.05))
            .expect_err("must fail");
        assert!(matches!(err, ValuationError::TerminalSpread { .. }));
    }

    #[test]
    fn missing_price_skips_comparison_but_still_values() {
        let report = valuate(&company(None, Some(10.0)), &manual_assumptions(0.10, 0.05))
            .expect("must valuate");
        assert!(report.comparison.is_none());
        assert!(report.per_share_value.is_finite());
    }

    #[test]
    fn missing_shares_is_a_structured_error() {
        let err = valuate(&company(Some(100.0), None), &manual_assumptions(0.10, 0.05))
            .expect_err("must fail");
        assert!(matches!(err, ValuationError::InvalidShares { .. }));
    }

    #[test]
    fn undervalued_verdict_when_intrinsic_value_exceeds_price() {
        let report = valuate(&company(Some(1.0), Some(10.0)), &manual_assumptions(0.10, 0.05))
            .expect("must valuate");
        let comparison = report.comparison.expect("price available");
        assert_eq!(comparison.verdict, Verdict::Undervalued);
        assert!(comparison.premium_pct > 0.0);
    }

    #[test]
    fn auto_discount_rate_records_the_wacc_breakdown() {
        let assumptions = Assumptions::default();
        let report =
            valuate(&company(Some(100.0), Some(10.0)), &assumptions).expect("must valuate");
        let wacc = report.wacc.expect("auto mode keeps the breakdown");
        assert_eq!(report.discount_rate, wacc.wacc);
    }

    #[test]
    fn assumption_ranges_are_enforced() {
        let err = Assumptions::new(
            GrowthMethod::Average,
            DiscountRate::Manual(0.55),
            DEFAULT_RISK_FREE_RATE,
            DEFAULT_MARKET_RISK_PREMIUM,
            DEFAULT_TERMINAL_GROWTH_RATE,
            DEFAULT_PROJECTION_YEARS,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValuationError::Validation(_)));
    }
}
