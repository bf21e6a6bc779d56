// Shared fixtures for tickval behavior tests.
pub use std::sync::Arc;

pub use tickval_core::{
    valuate, Assumptions, BalanceSnapshot, CashflowYear, CompanyFinancials, DiscountRate,
    FinancialStatements, GrowthMethod, IncomeSnapshot, MarketSnapshot, ProviderId, Symbol,
    UtcDateTime,
};

/// A hand-built company with a clean 10%-a-year FCF history:
/// 100, 110, 121 (oldest to newest), net debt 30, 10 shares.
pub fn steady_grower(price: Option<f64>) -> CompanyFinancials {
    let period = |input: &str| UtcDateTime::parse(input).expect("timestamp");
    let years = vec![
        CashflowYear::new(period("2024-12-31T00:00:00Z"), 133.0, 12.0).expect("year"),
        CashflowYear::new(period("2023-12-31T00:00:00Z"), 121.0, 11.0).expect("year"),
        CashflowYear::new(period("2022-12-31T00:00:00Z"), 110.0, 10.0).expect("year"),
    ];

    let market = MarketSnapshot::new(
        Symbol::parse("TICK").expect("symbol"),
        price,
        Some(1.1),
        Some(5_000.0),
        Some(10.0),
        "USD",
        period("2024-12-31T00:00:00Z"),
    )
    .expect("market");

    let statements = FinancialStatements::new(
        years,
        BalanceSnapshot::new(Some(80.0), Some(50.0)).expect("balance"),
        IncomeSnapshot::new(Some(4.0), Some(0.25)).expect("income"),
    );

    CompanyFinancials::new(market, statements)
}

pub fn manual_assumptions(discount: f64, growth: f64) -> Assumptions {
    Assumptions::new(
        GrowthMethod::Manual(growth),
        DiscountRate::Manual(discount),
        0.04,
        0.06,
        0.025,
        10,
    )
    .expect("assumptions")
}
