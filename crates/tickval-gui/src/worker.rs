use crossbeam_channel::{Receiver, Sender};
use std::thread;

use tickval_core::{
    valuate, Assumptions, ProviderId, SourceRouterBuilder, Symbol, ValuationReport,
    FCF_HISTORY_YEARS,
};

/// Commands the form sends to the background worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Valuate {
        symbol: Symbol,
        assumptions: Assumptions,
    },
}

/// Events the worker pushes back to the form.
#[derive(Debug)]
pub enum WorkerEvent {
    Completed(Box<FetchedValuation>),
    Failed(String),
}

/// A finished run plus the provenance the form shows.
#[derive(Debug)]
pub struct FetchedValuation {
    pub report: ValuationReport,
    pub statements_source: ProviderId,
    pub warnings: Vec<String>,
}

/// Spawn the single background worker. It owns a tokio runtime so the form
/// thread never blocks on network I/O; exactly one valuation runs at a time
/// because commands are drained sequentially.
pub fn spawn_worker_thread(cmd_rx: Receiver<WorkerCommand>, event_tx: Sender<WorkerEvent>, mock: bool) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build worker runtime: {err}");
                let _ = event_tx.try_send(WorkerEvent::Failed(format!(
                    "worker startup failure: {err}"
                )));
                return;
            }
        };

        runtime.block_on(async move {
            let router = if mock {
                SourceRouterBuilder::new().with_mock_mode().build()
            } else {
                SourceRouterBuilder::new().build()
            };

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    WorkerCommand::Valuate {
                        symbol,
                        assumptions,
                    } => {
                        tracing::info!(symbol = %symbol, "starting valuation");
                        let event = match router.fetch_company(&symbol, FCF_HISTORY_YEARS).await {
                            Ok(route) => match valuate(&route.data, &assumptions) {
                                Ok(report) => WorkerEvent::Completed(Box::new(FetchedValuation {
                                    report,
                                    statements_source: route.statements_source,
                                    warnings: route.warnings,
                                })),
                                Err(err) => {
                                    tracing::warn!(symbol = %symbol, "valuation failed: {err}");
                                    WorkerEvent::Failed(err.to_string())
                                }
                            },
                            Err(failure) => {
                                let detail = failure
                                    .errors
                                    .last()
                                    .map(|route_error| route_error.error.message().to_owned())
                                    .unwrap_or_else(|| String::from("no data source responded"));
                                tracing::warn!(symbol = %symbol, "fetch failed: {detail}");
                                WorkerEvent::Failed(format!("could not fetch data: {detail}"))
                            }
                        };

                        if event_tx.send(event).is_err() {
                            // Form is gone; stop draining.
                            return;
                        }
                    }
                }
            }
        });
    });
}
