/// `$1,234,567.89`-style formatting; negatives keep the sign up front.
pub fn currency(value: f64) -> String {
    if !value.is_finite() {
        return String::from("N/A");
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let total_cents = (value.abs() * 100.0).round();
    let whole = format!("{:.0}", (total_cents / 100.0).trunc());
    let cents = (total_cents % 100.0) as u64;
    format!("{sign}${}.{cents:02}", group_thousands(&whole))
}

/// Fractional rate as a percent string: 0.0425 -> "4.25%".
pub fn percent(rate: f64) -> String {
    if !rate.is_finite() {
        return String::from("N/A");
    }
    format!("{:.2}%", rate * 100.0)
}

/// Whole-number count with thousands separators.
pub fn count(value: f64) -> String {
    if !value.is_finite() {
        return String::from("N/A");
    }
    group_thousands(&format!("{value:.0}"))
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
    fn groups_thousands() {
        assert_eq!(currency(96_995_000_000.0), "$96,995,000,000.00");
        assert_eq!(count(15_116_786_000.0), "15,116,786,000");
    }

    #[test]
    fn formats_rates_as_percent() {
        assert_eq!(percent(0.0425), "4.25%");
        assert_eq!(percent(f64::NAN), "N/A");
    }
}
