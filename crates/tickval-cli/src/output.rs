use serde_json::Value;

use tickval_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(envelope)?,
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    println!("generated_at: {}", envelope.meta.generated_at);
    println!(
        "sources     : {}",
        envelope
            .meta
            .source_chain
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    println!("latency_ms  : {}", envelope.meta.latency_ms);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    println!();
    if envelope.data.get("projections").is_some() {
        render_valuation(&envelope.data);
    } else if envelope.data.get("rows").is_some() {
        render_fcf(&envelope.data);
    } else {
        let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
        for line in pretty_data.lines() {
            println!("{line}");
        }
    }

    if !envelope.errors.is_empty() {
        println!();
        println!("errors:");
        for error in &envelope.errors {
            println!("  - {}: {}", error.code, error.message);
        }
    }

    Ok(())
}

fn render_valuation(data: &Value) {
    let pct = |value: &Value| -> String {
        value
            .as_f64()
            .map(|v| format!("{:.2}%", v * 100.0))
            .unwrap_or_else(|| String::from("n/a"))
    };

    println!("== {} ==", data["symbol"].as_str().unwrap_or("?"));
    println!("current FCF        : {}", money(&data["current_fcf"]));
    println!("growth rate        : {}", pct(&data["growth"]["rate"]));
    println!("discount rate      : {}", pct(&data["discount_rate"]));
    println!("terminal growth    : {}", pct(&data["terminal_growth_rate"]));
    println!(
        "shares outstanding : {}",
        count(&data["shares_outstanding"])
    );

    println!();
    println!("{:<6} {:>22} {:>16} {:>22}", "year", "fcf", "factor", "discounted");
    if let Some(rows) = data["projections"].as_array() {
        for row in rows {
            println!(
                "{:<6} {:>22} {:>16.4} {:>22}",
                row["year"],
                money(&row["fcf"]),
                row["discount_factor"].as_f64().unwrap_or(0.0),
                money(&row["discounted_fcf"]),
            );
        }
    }
    println!(
        "{:<6} {:>22} {:>16} {:>22}",
        "total",
        "",
        "",
        money(&data["sum_discounted_fcf"])
    );

    println!();
    println!("terminal value           : {}", money(&data["terminal_value"]));
    println!(
        "discounted terminal value: {}",
        money(&data["discounted_terminal_value"])
    );
    println!("enterprise value         : {}", money(&data["enterprise_value"]));
    println!("net debt                 : {}", money(&data["net_debt"]));
    println!("equity value             : {}", money(&data["equity_value"]));
    println!("value per share          : {}", money(&data["per_share_value"]));

    if let Some(comparison) = data.get("comparison").filter(|c| !c.is_null()) {
        let premium = comparison["premium_pct"].as_f64().unwrap_or(0.0);
        let verdict = if premium > 0.0 {
            format!("UNDERVALUED by {premium:.2}%")
        } else {
            format!("OVERVALUED by {:.2}%", premium.abs())
        };
        println!("current market price     : {}", money(&comparison["current_price"]));
        println!("assessment               : {verdict}");
    } else {
        println!("assessment               : price data unavailable");
    }
}

fn render_fcf(data: &Value) {
    println!("== {} free cash flow ==", data["symbol"].as_str().unwrap_or("?"));
    println!(
        "{:<6} {:>22} {:>22} {:>22}",
        "year", "operating cf", "capex", "fcf"
    );
    if let Some(rows) = data["rows"].as_array() {
        for row in rows {
            println!(
                "{:<6} {:>22} {:>22} {:>22}",
                row["fiscal_year"],
                money(&row["operating_cash_flow"]),
                money(&row["capital_expenditure"]),
                money(&row["free_cash_flow"]),
            );
        }
    }
}

fn money(value: &Value) -> String {
    match value.as_f64() {
        Some(v) => format_currency(v),
        None => String::from("n/a"),
    }
}

fn count(value: &Value) -> String {
    match value.as_f64() {
        Some(v) => group_thousands(&format!("{v:.0}")),
        None => String::from("n/a"),
    }
}

/// `$1,234,567.89`-style formatting; negatives keep the sign up front.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return String::from("n/a");
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let total_cents = (value.abs() * 100.0).round();
    let whole = format!("{:.0}", (total_cents / 100.0).trunc());
    let cents = (total_cents % 100.0) as u64;
    format!("{sign}${}.{cents:02}", group_thousands(&whole))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_currency_with_thousands_separators() {
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-42.5), "-$42.50");
        assert_eq!(format_currency(0.0), "$0.00");
    }

    #[test]
    fn non_finite_values_render_as_na() {
        assert_eq!(format_currency(f64::NAN), "n/a");
        assert_eq!(format_currency(f64::INFINITY), "n/a");
    }
}
