mod fcf;
mod sources;
mod value;

use serde_json::Value;
use tickval_core::{Envelope, EnvelopeError, EnvelopeMeta, ProviderId, SourceRouterBuilder};
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            source_chain,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let mut builder = SourceRouterBuilder::new().with_timeout_ms(cli.timeout_ms);
    if cli.mock {
        builder = builder.with_mock_mode();
    }
    let router = builder.build();

    let command_result = match &cli.command {
        Command::Value(args) => value::run(args, &router).await?,
        Command::Fcf(args) => fcf::run(args, &router).await?,
        Command::Sources(args) => sources::run(args, &router)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        source_chain,
    } = command_result;

    let source_chain = if source_chain.is_empty() {
        ProviderId::ALL.to_vec()
    } else {
        source_chain
    };

    let request_id = format!("req-{}", Uuid::new_v4());
    let mut meta = EnvelopeMeta::new(request_id, source_chain, latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}
