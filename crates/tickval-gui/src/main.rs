mod app;
mod format;
mod worker;

use clap::Parser;
use crossbeam_channel::bounded;

use crate::app::ValuationApp;
use crate::worker::{spawn_worker_thread, WorkerCommand, WorkerEvent};

/// Desktop DCF calculator.
#[derive(Debug, Parser)]
#[command(name = "tickval-gui", version, about = "Discounted cash flow calculator")]
struct Args {
    /// Serve deterministic offline data instead of calling providers.
    #[arg(long, default_value_t = false)]
    mock: bool,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<WorkerCommand>(1);
    let (event_tx, event_rx) = bounded::<WorkerEvent>(16);
    spawn_worker_thread(cmd_rx, event_tx, args.mock);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("DCF Calculator")
            .with_inner_size([1000.0, 820.0])
            .with_min_inner_size([760.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "tickval",
        options,
        Box::new(|_cc| Ok(Box::new(ValuationApp::new(cmd_tx, event_rx)))),
    )
}
