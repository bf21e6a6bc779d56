use serde::{Deserialize, Serialize};

use crate::{CompanyFinancials, ValuationError};

/// Used when beta is missing from market data: assume the market.
pub const DEFAULT_BETA: f64 = 1.0;
/// Cost of debt assumed for a company with no reported debt servicing.
pub const DEFAULT_COST_OF_DEBT: f64 = 0.05;
/// Corporate tax rate assumed when the provider reports none.
pub const DEFAULT_TAX_RATE: f64 = 0.25;
/// Capital-structure weights assumed when both legs are unknown.
const FALLBACK_EQUITY_WEIGHT: f64 = 0.7;
const FALLBACK_DEBT_WEIGHT: f64 = 0.3;
/// Floor keeping the discount rate usable in the perpetuity formula.
pub const WACC_FLOOR: f64 = 0.01;

/// Inputs to the weighted-average-cost-of-capital estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaccInputs {
    pub beta: f64,
    pub market_cap: f64,
    pub total_debt: f64,
    pub interest_expense: f64,
    pub tax_rate: f64,
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
}

impl WaccInputs {
    /// Pull the WACC inputs out of fetched company data, substituting the
    /// documented defaults for anything the providers left blank.
    pub fn from_company(
        company: &CompanyFinancials,
        risk_free_rate: f64,
        market_risk_premium: f64,
    ) -> Self {
        Self {
            beta: company.market.beta.unwrap_or(DEFAULT_BETA),
            market_cap: company.market.market_cap.unwrap_or(0.0),
            total_debt: company.statements.balance.total_debt.unwrap_or(0.0),
            interest_expense: company.statements.income.interest_expense.unwrap_or(0.0),
            tax_rate: company.statements.income.tax_rate.unwrap_or(DEFAULT_TAX_RATE),
            risk_free_rate,
            market_risk_premium,
        }
    }
}

/// Every intermediate of the WACC estimate, kept for the breakdown view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaccBreakdown {
    pub inputs: WaccInputs,
    /// CAPM: risk-free rate + beta * market risk premium.
    pub cost_of_equity: f64,
    /// Interest expense / total debt, or the default when debt-free.
    pub cost_of_debt: f64,
    pub after_tax_cost_of_debt: f64,
    pub equity_weight: f64,
    pub debt_weight: f64,
    /// Final weighted rate, floored at [`WACC_FLOOR`].
    pub wacc: f64,
}

/// CAPM cost of equity. Kept as its own function so the GUI and tests can
/// reproduce it bit-for-bit.
pub fn cost_of_equity(risk_free_rate: f64, beta: f64, market_risk_premium: f64) -> f64 {
    risk_free_rate + beta * market_risk_premium
}

/// Weighted average cost of capital.
///
/// WACC = (E/V) * Re + (D/V) * Rd * (1 - Tc). For an all-equity company the
/// debt leg vanishes and the result is exactly the CAPM cost of equity.
pub fn estimate_wacc(inputs: WaccInputs) -> Result<WaccBreakdown, ValuationError> {
    let re = cost_of_equity(inputs.risk_free_rate, inputs.beta, inputs.market_risk_premium);

    let rd = if inputs.total_debt > 0.0 {
        inputs.interest_expense / inputs.total_debt
    } else {
        DEFAULT_COST_OF_DEBT
    };
    let after_tax_rd = rd * (1.0 - inputs.tax_rate);

    let capital = inputs.market_cap + inputs.total_debt;
    let (equity_weight, debt_weight) = if capital > 0.0 {
        (inputs.market_cap / capital, inputs.total_debt / capital)
    } else {
        (FALLBACK_EQUITY_WEIGHT, FALLBACK_DEBT_WEIGHT)
    };

    let wacc = equity_weight * re + debt_weight * after_tax_rd;

    if !wacc.is_finite() {
        return Err(ValuationError::NoUsableObservation);
    }

    Ok(WaccBreakdown {
        inputs,
        cost_of_equity: re,
        cost_of_debt: rd,
        after_tax_cost_of_debt: after_tax_rd,
        equity_weight,
        debt_weight,
        wacc: wacc.max(WACC_FLOOR),
    })
}
