use crossbeam_channel::{Receiver, Sender, TrySendError};

use tickval_core::{
    Assumptions, DiscountRate, GrowthMethod, Symbol, Verdict, DEFAULT_PROJECTION_YEARS,
};

use crate::format;
use crate::worker::{FetchedValuation, WorkerCommand, WorkerEvent};

const UNDERVALUED_FILL: egui::Color32 = egui::Color32::from_rgb(120, 180, 120);
const OVERVALUED_FILL: egui::Color32 = egui::Color32::from_rgb(180, 120, 120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrowthChoice {
    Average,
    Cagr,
    Recent,
    Manual,
}

impl GrowthChoice {
    const ALL: [Self; 4] = [Self::Average, Self::Cagr, Self::Recent, Self::Manual];

    fn label(self) -> &'static str {
        match self {
            Self::Average => "Average (Last 5 Years)",
            Self::Cagr => "CAGR (5 Year)",
            Self::Recent => "Recent (Last 2 Years)",
            Self::Manual => "Manual Entry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaccMode {
    Auto,
    Manual,
}

impl WaccMode {
    fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto Calculate",
            Self::Manual => "Manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakdownTab {
    Fcf,
    Growth,
    Wacc,
    Steps,
    Assumptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BannerSeverity {
    Error,
    Info,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: BannerSeverity,
    message: String,
}

/// The main valuation form.
pub struct ValuationApp {
    cmd_tx: Sender<WorkerCommand>,
    event_rx: Receiver<WorkerEvent>,

    ticker_input: String,
    growth_choice: GrowthChoice,
    manual_growth_pct: f64,
    wacc_mode: WaccMode,
    discount_pct: f64,
    risk_free_pct: f64,
    market_risk_premium_pct: f64,
    terminal_growth_pct: f64,

    in_flight: bool,
    result: Option<FetchedValuation>,
    banner: Option<StatusBanner>,
    show_breakdown: bool,
    breakdown_tab: BreakdownTab,
}

impl ValuationApp {
    pub fn new(cmd_tx: Sender<WorkerCommand>, event_rx: Receiver<WorkerEvent>) -> Self {
        Self {
            cmd_tx,
            event_rx,
            ticker_input: String::new(),
            growth_choice: GrowthChoice::Average,
            manual_growth_pct: 5.0,
            wacc_mode: WaccMode::Auto,
            discount_pct: 10.0,
            risk_free_pct: 4.0,
            market_risk_premium_pct: 6.0,
            terminal_growth_pct: 2.5,
            in_flight: false,
            result: None,
            banner: None,
            show_breakdown: false,
            breakdown_tab: BreakdownTab::Fcf,
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                WorkerEvent::Completed(fetched) => {
                    self.in_flight = false;
                    self.banner = fetched.warnings.first().map(|warning| StatusBanner {
                        severity: BannerSeverity::Info,
                        message: warning.clone(),
                    });
                    self.result = Some(*fetched);
                }
                WorkerEvent::Failed(message) => {
                    self.in_flight = false;
                    self.result = None;
                    self.show_breakdown = false;
                    self.banner = Some(StatusBanner {
                        severity: BannerSeverity::Error,
                        message,
                    });
                }
            }
        }
    }

    fn dispatch_calculation(&mut self) {
        let symbol = match Symbol::parse(&self.ticker_input) {
            Ok(symbol) => symbol,
            Err(err) => {
                self.banner = Some(StatusBanner {
                    severity: BannerSeverity::Error,
                    message: format!("Please enter a valid ticker: {err}"),
                });
                return;
            }
        };

        let growth_method = match self.growth_choice {
            GrowthChoice::Average => GrowthMethod::Average,
            GrowthChoice::Cagr => GrowthMethod::Cagr,
            GrowthChoice::Recent => GrowthMethod::Recent,
            GrowthChoice::Manual => GrowthMethod::Manual(self.manual_growth_pct / 100.0),
        };
        let discount_rate = match self.wacc_mode {
            WaccMode::Auto => DiscountRate::Auto,
            WaccMode::Manual => DiscountRate::Manual(self.discount_pct / 100.0),
        };

        let assumptions = match Assumptions::new(
            growth_method,
            discount_rate,
            self.risk_free_pct / 100.0,
            self.market_risk_premium_pct / 100.0,
            self.terminal_growth_pct / 100.0,
            DEFAULT_PROJECTION_YEARS,
        ) {
            Ok(assumptions) => assumptions,
            Err(err) => {
                self.banner = Some(StatusBanner {
                    severity: BannerSeverity::Error,
                    message: err.to_string(),
                });
                return;
            }
        };

        match self.cmd_tx.try_send(WorkerCommand::Valuate {
            symbol,
            assumptions,
        }) {
            Ok(()) => {
                self.in_flight = true;
                self.banner = None;
                self.result = None;
                self.show_breakdown = false;
            }
            Err(TrySendError::Full(_)) => {
                self.banner = Some(StatusBanner {
                    severity: BannerSeverity::Error,
                    message: String::from("A calculation is already running"),
                });
            }
            Err(TrySendError::Disconnected(_)) => {
                self.banner = Some(StatusBanner {
                    severity: BannerSeverity::Error,
                    message: String::from("Background worker is not running; restart the app"),
                });
            }
        }
    }

    fn banner_ui(&self, ui: &mut egui::Ui) {
        let Some(banner) = &self.banner else {
            return;
        };
        let (fill, text) = match banner.severity {
            BannerSeverity::Error => (egui::Color32::from_rgb(90, 40, 40), "⚠"),
            BannerSeverity::Info => (egui::Color32::from_rgb(40, 60, 90), "ℹ"),
        };
        egui::Frame::new()
            .fill(fill)
            .corner_radius(egui::CornerRadius::same(4))
            .inner_margin(egui::Margin::symmetric(8, 6))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(text);
                    ui.label(&banner.message);
                });
            });
    }

    fn inputs_ui(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.strong("Ticker Symbol:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.ticker_input)
                        .hint_text("e.g. AAPL, MSFT, GOOGL")
                        .desired_width(160.0),
                );
            });
        });

        ui.group(|ui| {
            ui.label(egui::RichText::new("Assumptions").strong());
            egui::Grid::new("assumptions_grid")
                .num_columns(2)
                .spacing([16.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Growth Rate Method:");
                    egui::ComboBox::from_id_salt("growth_method_combo")
                        .selected_text(self.growth_choice.label())
                        .show_ui(ui, |ui| {
                            for choice in GrowthChoice::ALL {
                                ui.selectable_value(
                                    &mut self.growth_choice,
                                    choice,
                                    choice.label(),
                                );
                            }
                        });
                    ui.end_row();

                    if self.growth_choice == GrowthChoice::Manual {
                        ui.label("Manual Growth Rate:");
                        ui.add(
                            egui::DragValue::new(&mut self.manual_growth_pct)
                                .range(-20.0..=50.0)
                                .speed(0.1)
                                .suffix("%"),
                        );
                        ui.end_row();
                    }

                    ui.label("Discount Rate (WACC):");
                    ui.horizontal(|ui| {
                        egui::ComboBox::from_id_salt("wacc_mode_combo")
                            .selected_text(self.wacc_mode.label())
                            .show_ui(ui, |ui| {
                                ui.selectable_value(
                                    &mut self.wacc_mode,
                                    WaccMode::Auto,
                                    WaccMode::Auto.label(),
                                );
                                ui.selectable_value(
                                    &mut self.wacc_mode,
                                    WaccMode::Manual,
                                    WaccMode::Manual.label(),
                                );
                            });
                        ui.add_enabled(
                            self.wacc_mode == WaccMode::Manual,
                            egui::DragValue::new(&mut self.discount_pct)
                                .range(1.0..=30.0)
                                .speed(0.1)
                                .suffix("%"),
                        );
                    });
                    ui.end_row();

                    ui.label("Risk-Free Rate:");
                    ui.add_enabled(
                        self.wacc_mode == WaccMode::Auto,
                        egui::DragValue::new(&mut self.risk_free_pct)
                            .range(0.0..=10.0)
                            .speed(0.05)
                            .suffix("%"),
                    );
                    ui.end_row();

                    ui.label("Market Risk Premium:");
                    ui.add_enabled(
                        self.wacc_mode == WaccMode::Auto,
                        egui::DragValue::new(&mut self.market_risk_premium_pct)
                            .range(0.0..=15.0)
                            .speed(0.05)
                            .suffix("%"),
                    );
                    ui.end_row();

                    ui.label("Terminal Growth Rate:");
                    ui.add(
                        egui::DragValue::new(&mut self.terminal_growth_pct)
                            .range(0.0..=5.0)
                            .speed(0.05)
                            .suffix("%"),
                    );
                    ui.end_row();
                });
        });
    }

    fn results_ui(&mut self, ui: &mut egui::Ui) {
        let Some(fetched) = &self.result else {
            return;
        };
        let report = &fetched.report;

        ui.group(|ui| {
            ui.label(egui::RichText::new("Summary Metrics").strong());
            egui::Grid::new("summary_grid")
                .num_columns(2)
                .striped(true)
                .spacing([24.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Company");
                    ui.label(report.symbol.as_str());
                    ui.end_row();
                    ui.label("Current FCF");
                    ui.label(format::currency(report.current_fcf));
                    ui.end_row();
                    ui.label("Growth Rate");
                    ui.label(format::percent(report.growth.rate));
                    ui.end_row();
                    ui.label("Discount Rate (WACC)");
                    ui.label(format::percent(report.discount_rate));
                    ui.end_row();
                    ui.label("Terminal Growth Rate");
                    ui.label(format::percent(report.terminal_growth_rate));
                    ui.end_row();
                    ui.label("Shares Outstanding");
                    ui.label(format::count(report.shares_outstanding));
                    ui.end_row();
                    ui.label("Statements Source");
                    ui.label(fetched.statements_source.as_str());
                    ui.end_row();
                });
        });

        ui.group(|ui| {
            ui.label(egui::RichText::new("10-Year Projected Free Cash Flows").strong());
            egui::Grid::new("projections_grid")
                .num_columns(4)
                .striped(true)
                .spacing([24.0, 4.0])
                .show(ui, |ui| {
                    ui.strong("Year");
                    ui.strong("FCF");
                    ui.strong("Discount Factor");
                    ui.strong("Discounted FCF");
                    ui.end_row();

                    for projected in &report.projections {
                        ui.label(format!("Year {}", projected.year));
                        ui.label(format::currency(projected.fcf));
                        ui.label(format!("{:.4}", projected.discount_factor));
                        ui.label(format::currency(projected.discounted_fcf));
                        ui.end_row();
                    }

                    ui.strong("Total (Discounted FCF)");
                    ui.label("");
                    ui.label("");
                    ui.strong(format::currency(report.sum_discounted_fcf));
                    ui.end_row();
                });
        });

        ui.group(|ui| {
            ui.label(egui::RichText::new("Valuation & Comparison").strong());
            egui::Grid::new("valuation_grid")
                .num_columns(2)
                .striped(true)
                .spacing([24.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Terminal Value");
                    ui.label(format::currency(report.terminal_value));
                    ui.end_row();
                    ui.label("Discounted Terminal Value");
                    ui.label(format::currency(report.discounted_terminal_value));
                    ui.end_row();
                    ui.label("Enterprise Value");
                    ui.label(format::currency(report.enterprise_value));
                    ui.end_row();
                    ui.label("Net Debt");
                    ui.label(format::currency(report.net_debt));
                    ui.end_row();
                    ui.label("Equity Value");
                    ui.label(format::currency(report.equity_value));
                    ui.end_row();
                    ui.label("Value Per Share");
                    ui.label(format::currency(report.per_share_value));
                    ui.end_row();

                    match &report.comparison {
                        Some(comparison) => {
                            ui.label("Current Market Price");
                            ui.label(format::currency(comparison.current_price));
                            ui.end_row();
                            ui.label("Premium/(Discount)");
                            ui.label(format!("{:+.2}%", comparison.premium_pct));
                            ui.end_row();
                            ui.label("Assessment");
                            let (text, fill) = match comparison.verdict {
                                Verdict::Undervalued => (
                                    format!("UNDERVALUED by {:.2}%", comparison.premium_pct),
                                    UNDERVALUED_FILL,
                                ),
                                Verdict::Overvalued => (
                                    format!("OVERVALUED by {:.2}%", comparison.premium_pct.abs()),
                                    OVERVALUED_FILL,
                                ),
                            };
                            ui.label(
                                egui::RichText::new(text)
                                    .strong()
                                    .color(egui::Color32::BLACK)
                                    .background_color(fill),
                            );
                            ui.end_row();
                        }
                        None => {
                            ui.label("Assessment");
                            ui.label("Price data unavailable");
                            ui.end_row();
                        }
                    }
                });
        });

        if ui.button("Show Detailed Breakdown & Calculations").clicked() {
            self.show_breakdown = true;
        }
    }

    fn breakdown_window(&mut self, ctx: &egui::Context) {
        if self.result.is_none() {
            return;
        }

        let mut open = self.show_breakdown;
        egui::Window::new("Detailed Breakdown")
            .open(&mut open)
            .default_size([760.0, 520.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.breakdown_tab, BreakdownTab::Fcf, "FCF Calculation");
                    ui.selectable_value(&mut self.breakdown_tab, BreakdownTab::Growth, "Growth Rate");
                    ui.selectable_value(&mut self.breakdown_tab, BreakdownTab::Wacc, "WACC");
                    ui.selectable_value(&mut self.breakdown_tab, BreakdownTab::Steps, "DCF Steps");
                    ui.selectable_value(
                        &mut self.breakdown_tab,
                        BreakdownTab::Assumptions,
                        "Assumptions",
                    );
                });
                ui.separator();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    let Some(fetched) = &self.result else {
                        return;
                    };
                    match self.breakdown_tab {
                        BreakdownTab::Fcf => fcf_tab(ui, fetched),
                        BreakdownTab::Growth => growth_tab(ui, fetched),
                        BreakdownTab::Wacc => wacc_tab(ui, fetched),
                        BreakdownTab::Steps => steps_tab(ui, fetched),
                        BreakdownTab::Assumptions => assumptions_tab(ui, fetched),
                    }
                });
            });
        self.show_breakdown = open;
    }
}

impl eframe::App for ValuationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        if self.in_flight {
            // Keep polling the worker channel while a fetch is out.
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("Discounted Cash Flow Calculator");
                });
                ui.add_space(8.0);

                self.inputs_ui(ui);
                ui.add_space(6.0);

                let calculate = ui.add_enabled(
                    !self.in_flight,
                    egui::Button::new(egui::RichText::new("Calculate DCF").strong())
                        .min_size(egui::vec2(ui.available_width(), 32.0)),
                );
                if calculate.clicked() {
                    self.dispatch_calculation();
                }
                if self.in_flight {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Fetching financial data...");
                    });
                }

                ui.add_space(6.0);
                self.banner_ui(ui);
                ui.add_space(6.0);
                self.results_ui(ui);
            });
        });

        self.breakdown_window(ctx);
    }
}

fn fcf_tab(ui: &mut egui::Ui, fetched: &FetchedValuation) {
    ui.label(
        "FCF = Operating Cash Flow - Capital Expenditures. \
         The most recent year seeds the projection.",
    );
    ui.add_space(6.0);
    egui::Grid::new("fcf_breakdown_grid")
        .num_columns(4)
        .striped(true)
        .spacing([24.0, 4.0])
        .show(ui, |ui| {
            ui.strong("Fiscal Year");
            ui.strong("Operating CF");
            ui.strong("Capital Expenditures");
            ui.strong("FCF");
            ui.end_row();

            for row in &fetched.report.fcf_rows {
                ui.label(row.fiscal_year.to_string());
                ui.label(format::currency(row.operating_cash_flow));
                ui.label(format::currency(row.capital_expenditure));
                ui.label(format::currency(row.free_cash_flow));
                ui.end_row();
            }
        });
}

fn growth_tab(ui: &mut egui::Ui, fetched: &FetchedValuation) {
    let growth = &fetched.report.growth;
    ui.label(format!("Method: {}", growth.method));

    if growth.observations.is_empty() {
        ui.label("Manual rate; no historical observations used.");
    } else {
        ui.add_space(6.0);
        egui::Grid::new("growth_breakdown_grid")
            .num_columns(3)
            .striped(true)
            .spacing([24.0, 4.0])
            .show(ui, |ui| {
                ui.strong("FCF (Year N)");
                ui.strong("FCF (Year N-1)");
                ui.strong("Growth");
                ui.end_row();

                for observation in &growth.observations {
                    ui.label(format::currency(observation.current));
                    ui.label(format::currency(observation.previous));
                    ui.label(format::percent(observation.rate));
                    ui.end_row();
                }
            });
    }

    ui.add_space(6.0);
    ui.strong(format!("Final growth rate: {}", format::percent(growth.rate)));
    if growth.was_clamped() {
        ui.label(format!(
            "Raw estimate {} was clamped to the accepted band.",
            format::percent(growth.raw_rate)
        ));
    }
}

fn wacc_tab(ui: &mut egui::Ui, fetched: &FetchedValuation) {
    let Some(wacc) = &fetched.report.wacc else {
        ui.label(format!(
            "Manual discount rate: {}. No WACC estimate was made.",
            format::percent(fetched.report.discount_rate)
        ));
        return;
    };

    ui.label("WACC = (E/V x Re) + (D/V x Rd x (1 - Tc))");
    ui.add_space(6.0);
    egui::Grid::new("wacc_breakdown_grid")
        .num_columns(2)
        .striped(true)
        .spacing([24.0, 4.0])
        .show(ui, |ui| {
            ui.label("Beta");
            ui.label(format!("{:.2}", wacc.inputs.beta));
            ui.end_row();
            ui.label("Risk-Free Rate (Rf)");
            ui.label(format::percent(wacc.inputs.risk_free_rate));
            ui.end_row();
            ui.label("Market Risk Premium");
            ui.label(format::percent(wacc.inputs.market_risk_premium));
            ui.end_row();
            ui.label("Cost of Equity (Re = Rf + beta x MRP)");
            ui.label(format::percent(wacc.cost_of_equity));
            ui.end_row();
            ui.label("Market Cap (E)");
            ui.label(format::currency(wacc.inputs.market_cap));
            ui.end_row();
            ui.label("Total Debt (D)");
            ui.label(format::currency(wacc.inputs.total_debt));
            ui.end_row();
            ui.label("Interest Expense");
            ui.label(format::currency(wacc.inputs.interest_expense));
            ui.end_row();
            ui.label("Cost of Debt (Rd)");
            ui.label(format::percent(wacc.cost_of_debt));
            ui.end_row();
            ui.label("Tax Rate (Tc)");
            ui.label(format::percent(wacc.inputs.tax_rate));
            ui.end_row();
            ui.label("After-Tax Cost of Debt");
            ui.label(format::percent(wacc.after_tax_cost_of_debt));
            ui.end_row();
            ui.label("Equity Weight (E/V)");
            ui.label(format::percent(wacc.equity_weight));
            ui.end_row();
            ui.label("Debt Weight (D/V)");
            ui.label(format::percent(wacc.debt_weight));
            ui.end_row();
            ui.strong("WACC");
            ui.strong(format::percent(wacc.wacc));
            ui.end_row();
        });
}

fn steps_tab(ui: &mut egui::Ui, fetched: &FetchedValuation) {
    let report = &fetched.report;
    let final_fcf = report.projections.last().map(|p| p.fcf).unwrap_or(0.0);
    let steps: [(&str, String); 7] = [
        (
            "1. Project future FCFs",
            format!(
                "{} x (1 + {})^year for {} years",
                format::currency(report.current_fcf),
                format::percent(report.growth.rate),
                report.projections.len()
            ),
        ),
        (
            "2. Discount to present",
            format!("each year / (1 + {})^year", format::percent(report.discount_rate)),
        ),
        (
            "3. Sum discounted FCFs",
            format::currency(report.sum_discounted_fcf),
        ),
        (
            "4. Terminal value",
            format!(
                "({} x (1 + {})) / ({} - {}) = {}",
                format::currency(final_fcf),
                format::percent(report.terminal_growth_rate),
                format::percent(report.discount_rate),
                format::percent(report.terminal_growth_rate),
                format::currency(report.terminal_value)
            ),
        ),
        (
            "5. Discount terminal value",
            format::currency(report.discounted_terminal_value),
        ),
        (
            "6. Enterprise value",
            format!(
                "{} + {} = {}",
                format::currency(report.sum_discounted_fcf),
                format::currency(report.discounted_terminal_value),
                format::currency(report.enterprise_value)
            ),
        ),
        (
            "7. Equity value and per share",
            format!(
                "({} - {}) / {} = {}",
                format::currency(report.enterprise_value),
                format::currency(report.net_debt),
                format::count(report.shares_outstanding),
                format::currency(report.per_share_value)
            ),
        ),
    ];

    egui::Grid::new("steps_grid")
        .num_columns(2)
        .striped(true)
        .spacing([24.0, 6.0])
        .show(ui, |ui| {
            for (step, calculation) in steps {
                ui.strong(step);
                ui.label(calculation);
                ui.end_row();
            }
        });
}

fn assumptions_tab(ui: &mut egui::Ui, fetched: &FetchedValuation) {
    let report = &fetched.report;
    egui::Grid::new("assumptions_breakdown_grid")
        .num_columns(3)
        .striped(true)
        .spacing([24.0, 4.0])
        .show(ui, |ui| {
            ui.label("Growth Rate");
            ui.label(format::percent(report.growth.rate));
            ui.label("Applied to each year's FCF projection");
            ui.end_row();
            ui.label("Discount Rate (WACC)");
            ui.label(format::percent(report.discount_rate));
            ui.label("Used to discount future cash flows");
            ui.end_row();
            ui.label("Terminal Growth Rate");
            ui.label(format::percent(report.terminal_growth_rate));
            ui.label("Long-term growth after the projection period");
            ui.end_row();
            ui.label("Projection Period");
            ui.label(format!("{} years", report.projections.len()));
            ui.label("Explicit forecast horizon");
            ui.end_row();
            ui.label("Terminal Value Model");
            ui.label("Perpetuity Growth");
            ui.label("FCF x (1+g) / (WACC - g)");
            ui.end_row();
            ui.label("Statements Source");
            ui.label(fetched.statements_source.as_str());
            ui.label("SEC EDGAR preferred, Yahoo Finance fallback");
            ui.end_row();
            ui.label("Currency");
            ui.label(&report.currency);
            ui.label("All values in reporting currency");
            ui.end_row();
        });
}
