use serde::Serialize;

use tickval_core::{EnvelopeError, FcfRow, SourceRouter, Symbol};

use crate::cli::FcfArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct FcfResponseData {
    symbol: Symbol,
    rows: Vec<FcfRow>,
}

pub async fn run(args: &FcfArgs, router: &SourceRouter) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    match router.fetch_statements(&symbol, args.years).await {
        Ok(route) => {
            let rows = route
                .data
                .cashflow_years
                .iter()
                .map(FcfRow::from)
                .collect::<Vec<_>>();
            let data = serde_json::to_value(FcfResponseData { symbol, rows })?;

            Ok(CommandResult::ok(data, route.source_chain)
                .with_warnings(route.warnings)
                .with_latency(route.latency_ms))
        }
        Err(failure) => {
            let errors = failure.errors.iter().map(EnvelopeError::from).collect();
            Ok(
                CommandResult::ok(serde_json::Value::Null, failure.source_chain)
                    .with_warnings(failure.warnings)
                    .with_errors(errors)
                    .with_latency(failure.latency_ms),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickval_core::SourceRouterBuilder;

    #[tokio::test]
    async fn mock_fcf_returns_the_requested_years() {
        let router = SourceRouterBuilder::new().with_mock_mode().build();
        let args = FcfArgs {
            symbol: String::from("AAPL"),
            years: 4,
        };

        let result = run(&args, &router).await.expect("must run");
        assert!(result.errors.is_empty());
        assert_eq!(result.data["rows"].as_array().expect("rows").len(), 4);
    }
}
