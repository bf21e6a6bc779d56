use tickval_core::{
    valuate, Assumptions, DiscountRate, EnvelopeError, GrowthMethod, SourceRouter, Symbol,
};

use crate::cli::{GrowthMethodArg, ValueArgs};
use crate::commands::CommandResult;
use crate::error::CliError;

pub async fn run(args: &ValueArgs, router: &SourceRouter) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let assumptions = to_assumptions(args)?;

    match router.fetch_company(&symbol, tickval_core::FCF_HISTORY_YEARS).await {
        Ok(route) => {
            let report = valuate(&route.data, &assumptions)?;
            let data = serde_json::to_value(&report)?;

            Ok(CommandResult::ok(data, route.source_chain)
                .with_warnings(route.warnings)
                .with_latency(route.latency_ms))
        }
        Err(failure) => {
            let errors = failure.errors.iter().map(EnvelopeError::from).collect();
            Ok(CommandResult::ok(serde_json::Value::Null, failure.source_chain)
                .with_warnings(failure.warnings)
                .with_errors(errors)
                .with_latency(failure.latency_ms))
        }
    }
}

fn to_assumptions(args: &ValueArgs) -> Result<Assumptions, CliError> {
    let growth_method = match args.growth_method {
        GrowthMethodArg::Average => GrowthMethod::Average,
        GrowthMethodArg::Cagr => GrowthMethod::Cagr,
        GrowthMethodArg::Recent => GrowthMethod::Recent,
        GrowthMethodArg::Manual => {
            let rate = args.growth_rate.ok_or_else(|| {
                CliError::Command(String::from(
                    "--growth-rate is required with --growth-method manual",
                ))
            })?;
            GrowthMethod::Manual(rate / 100.0)
        }
    };

    let discount_rate = match args.discount_rate {
        Some(rate) => DiscountRate::Manual(rate / 100.0),
        None => DiscountRate::Auto,
    };

    Assumptions::new(
        growth_method,
        discount_rate,
        args.risk_free_rate / 100.0,
        args.market_risk_premium / 100.0,
        args.terminal_growth / 100.0,
        args.years,
    )
    .map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickval_core::SourceRouterBuilder;

    fn value_args(symbol: &str) -> ValueArgs {
        ValueArgs {
            symbol: symbol.to_owned(),
            growth_method: GrowthMethodArg::Average,
            growth_rate: None,
            discount_rate: None,
            risk_free_rate: 4.0,
            market_risk_premium: 6.0,
            terminal_growth: 2.5,
            years: 10,
        }
    }

    #[tokio::test]
    async fn mock_valuation_produces_a_report_payload() {
        let router = SourceRouterBuilder::new().with_mock_mode().build();
        let result = run(&value_args("AAPL"), &router).await.expect("must run");

        assert!(result.errors.is_empty());
        assert_eq!(result.data["symbol"], "AAPL");
        assert_eq!(result.data["projections"].as_array().expect("rows").len(), 10);
    }

    #[tokio::test]
    async fn manual_method_without_rate_is_a_command_error() {
        let router = SourceRouterBuilder::new().with_mock_mode().build();
        let mut args = value_args("AAPL");
        args.growth_method = GrowthMethodArg::Manual;

        let err = run(&args, &router).await.expect_err("must fail");
        assert!(matches!(err, CliError::Command(_)));
    }

    #[tokio::test]
    async fn invalid_symbol_is_a_validation_error() {
        let router = SourceRouterBuilder::new().with_mock_mode().build();
        let err = run(&value_args("123"), &router).await.expect_err("must fail");
        assert!(matches!(err, CliError::Validation(_)));
    }
}
