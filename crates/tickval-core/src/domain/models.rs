use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// How many trailing fiscal years of cash flow feed the growth estimate.
pub const FCF_HISTORY_YEARS: usize = 5;

/// Market-side snapshot for a company: what the tape says right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    /// Last traded price per share. `None` when the quote is unavailable;
    /// the valuation still runs, only the market comparison is skipped.
    pub price: Option<f64>,
    pub beta: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub currency: String,
    pub as_of: UtcDateTime,
}

impl MarketSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        price: Option<f64>,
        beta: Option<f64>,
        market_cap: Option<f64>,
        shares_outstanding: Option<f64>,
        currency: impl AsRef<str>,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_optional_non_negative("price", price)?;
        validate_optional_finite("beta", beta)?;
        validate_optional_non_negative("market_cap", market_cap)?;
        validate_optional_non_negative("shares_outstanding", shares_outstanding)?;

        Ok(Self {
            symbol,
            price,
            beta,
            market_cap,
            shares_outstanding,
            currency: validate_currency_code(currency.as_ref())?,
            as_of,
        })
    }
}

/// One fiscal year of the cash-flow statement, reduced to the two lines
/// a DCF needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashflowYear {
    /// Statement period end.
    pub period_end: UtcDateTime,
    pub operating_cash_flow: f64,
    /// Capital expenditure as an outflow magnitude (always >= 0). Providers
    /// disagree on sign: Yahoo reports capex negative, XBRL reports the
    /// payment as positive.
    pub capital_expenditure: f64,
}

impl CashflowYear {
    pub fn new(
        period_end: UtcDateTime,
        operating_cash_flow: f64,
        capital_expenditure: f64,
    ) -> Result<Self, ValidationError> {
        validate_finite("operating_cash_flow", operating_cash_flow)?;
        validate_finite("capital_expenditure", capital_expenditure)?;

        Ok(Self {
            period_end,
            operating_cash_flow,
            capital_expenditure: capital_expenditure.abs(),
        })
    }

    /// FCF = operating cash flow - capital expenditures.
    pub fn free_cash_flow(&self) -> f64 {
        self.operating_cash_flow - self.capital_expenditure
    }

    pub fn fiscal_year(&self) -> i32 {
        self.period_end.year()
    }
}

/// Most-recent balance-sheet figures feeding net debt and the WACC weights.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
}

impl BalanceSnapshot {
    pub fn new(
        total_debt: Option<f64>,
        cash_and_equivalents: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_optional_non_negative("total_debt", total_debt)?;
        validate_optional_non_negative("cash_and_equivalents", cash_and_equivalents)?;

        Ok(Self {
            total_debt,
            cash_and_equivalents,
        })
    }

    /// Net debt = total debt - cash. Missing figures count as zero.
    pub fn net_debt(&self) -> f64 {
        self.total_debt.unwrap_or(0.0) - self.cash_and_equivalents.unwrap_or(0.0)
    }
}

/// Most-recent income-statement figures feeding the cost-of-debt leg.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IncomeSnapshot {
    /// Interest expense as a magnitude.
    pub interest_expense: Option<f64>,
    /// Effective tax rate as a fraction, when the provider reports one.
    pub tax_rate: Option<f64>,
}

impl IncomeSnapshot {
    pub fn new(
        interest_expense: Option<f64>,
        tax_rate: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_optional_finite("interest_expense", interest_expense)?;
        if let Some(rate) = tax_rate {
            validate_rate("tax_rate", rate, 0.0, 1.0)?;
        }

        Ok(Self {
            interest_expense: interest_expense.map(f64::abs),
            tax_rate,
        })
    }
}

/// Statement-side data for a company, newest fiscal year first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub cashflow_years: Vec<CashflowYear>,
    pub balance: BalanceSnapshot,
    pub income: IncomeSnapshot,
}

impl FinancialStatements {
    pub fn new(
        mut cashflow_years: Vec<CashflowYear>,
        balance: BalanceSnapshot,
        income: IncomeSnapshot,
    ) -> Self {
        cashflow_years.sort_by(|a, b| b.period_end.cmp(&a.period_end));
        Self {
            cashflow_years,
            balance,
            income,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cashflow_years.is_empty()
    }
}

/// Everything a valuation run needs for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFinancials {
    pub market: MarketSnapshot,
    pub statements: FinancialStatements,
}

impl CompanyFinancials {
    pub fn new(market: MarketSnapshot, statements: FinancialStatements) -> Self {
        Self { market, statements }
    }

    /// Trailing FCF history, newest first, capped at [`FCF_HISTORY_YEARS`].
    pub fn fcf_history(&self) -> Vec<f64> {
        self.statements
            .cashflow_years
            .iter()
            .take(FCF_HISTORY_YEARS)
            .map(CashflowYear::free_cash_flow)
            .collect()
    }

    /// The fiscal-year rows backing the FCF history, newest first.
    pub fn fcf_years(&self) -> &[CashflowYear] {
        let len = self.statements.cashflow_years.len().min(FCF_HISTORY_YEARS);
        &self.statements.cashflow_years[..len]
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

pub(crate) fn validate_rate(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < min || value > max {
        return Err(ValidationError::RateOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_finite(field, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(input: &str) -> UtcDateTime {
        UtcDateTime::parse(input).expect("timestamp")
    }

    #[test]
    fn validates_currency() {
        assert_eq!(
            validate_currency_code("usd").expect("must normalize"),
            "USD"
        );
        assert!(matches!(
            validate_currency_code("USDT"),
            Err(ValidationError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn capex_sign_is_normalized_to_outflow() {
        let yahoo_style = CashflowYear::new(period("2024-09-28T00:00:00Z"), 110_000.0, -25_000.0)
            .expect("must build");
        let xbrl_style = CashflowYear::new(period("2024-09-28T00:00:00Z"), 110_000.0, 25_000.0)
            .expect("must build");

        assert_eq!(yahoo_style.free_cash_flow(), 85_000.0);
        assert_eq!(yahoo_style.free_cash_flow(), xbrl_style.free_cash_flow());
    }

    #[test]
    fn statements_sort_newest_first() {
        let older = CashflowYear::new(period("2022-09-24T00:00:00Z"), 100.0, 10.0).expect("year");
        let newer = CashflowYear::new(period("2024-09-28T00:00:00Z"), 120.0, 10.0).expect("year");
        let statements = FinancialStatements::new(
            vec![older, newer],
            BalanceSnapshot::default(),
            IncomeSnapshot::default(),
        );

        assert_eq!(statements.cashflow_years[0].fiscal_year(), 2024);
        assert_eq!(statements.cashflow_years[1].fiscal_year(), 2022);
    }

    #[test]
    fn net_debt_treats_missing_fields_as_zero() {
        let balance = BalanceSnapshot::new(Some(500.0), None).expect("balance");
        assert_eq!(balance.net_debt(), 500.0);
        assert_eq!(BalanceSnapshot::default().net_debt(), 0.0);
    }

    #[test]
    fn rejects_negative_market_fields() {
        let symbol = Symbol::parse("AAPL").expect("symbol");
        let err = MarketSnapshot::new(
            symbol,
            Some(-5.0),
            None,
            None,
            None,
            "USD",
            period("2024-09-28T00:00:00Z"),
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { .. }));
    }

    #[test]
    fn fcf_history_caps_at_five_years() {
        let mut years = Vec::new();
        for offset in 0..7 {
            let ts = format!("20{:02}-12-31T00:00:00Z", 24 - offset);
            years.push(CashflowYear::new(period(&ts), 100.0 + offset as f64, 10.0).expect("year"));
        }
        let market = MarketSnapshot::new(
            Symbol::parse("MSFT").expect("symbol"),
            Some(100.0),
            Some(1.0),
            None,
            Some(1_000.0),
            "USD",
            period("2024-12-31T00:00:00Z"),
        )
        .expect("market");
        let company = CompanyFinancials::new(
            market,
            FinancialStatements::new(years, BalanceSnapshot::default(), IncomeSnapshot::default()),
        );

        assert_eq!(company.fcf_history().len(), FCF_HISTORY_YEARS);
    }
}
