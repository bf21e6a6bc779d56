use serde::Serialize;

use tickval_core::SourceRouter;

use crate::cli::SourcesArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SourceEntry {
    id: String,
    endpoints: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceEntry>,
}

pub fn run(args: &SourcesArgs, router: &SourceRouter) -> Result<CommandResult, CliError> {
    let mut source_chain = Vec::new();
    let sources = router
        .sources()
        .map(|adapter| {
            source_chain.push(adapter.id());
            SourceEntry {
                id: adapter.id().to_string(),
                endpoints: adapter.capabilities().supported_endpoints(),
                detail: args.verbose.then(|| detail_for(adapter.id().as_str())),
            }
        })
        .collect::<Vec<_>>();

    let data = serde_json::to_value(SourcesResponseData { sources })?;
    Ok(CommandResult::ok(data, source_chain))
}

fn detail_for(id: &str) -> &'static str {
    match id {
        "edgar" => "SEC XBRL company facts; annual 10-K statements, no quotes",
        "yahoo" => "Yahoo Finance quoteSummary; quotes plus statement fallback",
        _ => "unknown source",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickval_core::SourceRouterBuilder;

    #[test]
    fn lists_both_sources_with_their_endpoints() {
        let router = SourceRouterBuilder::new().with_mock_mode().build();
        let args = SourcesArgs { verbose: false };

        let result = run(&args, &router).expect("must run");
        let sources = result.data["sources"].as_array().expect("sources");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0]["id"], "edgar");
        assert_eq!(
            sources[0]["endpoints"],
            serde_json::json!(["statements"])
        );
        assert_eq!(sources[1]["id"], "yahoo");
    }
}
