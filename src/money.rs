//! Price parsing and display.
//!
//! Prices arrive from admin forms and AI output as free text such as
//! `"2,500.00 $"` or `"$1,200"`. They are stored as REAL dollars.

/// Parse a display price by keeping only digits and the decimal point.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(round_cents)
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `2500.0` with symbol `$` renders as `2,500.00 $`.
pub fn format_price(amount: f64, symbol: &str) -> String {
    let cents = (round_cents(amount.abs()) * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    if symbol.is_empty() {
        format!("{}{}.{:02}", sign, grouped, frac)
    } else {
        format!("{}{}.{:02} {}", sign, grouped, frac, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_prices() {
        assert_eq!(parse_price("2,500.00 $"), Some(2500.0));
        assert_eq!(parse_price("$1,200"), Some(1200.0));
        assert_eq!(parse_price("99.99"), Some(99.99));
        assert_eq!(parse_price(" 499.00 $ "), Some(499.0));
    }

    #[test]
    fn rejects_prices_without_digits() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("$"), None);
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price("1.2.3"), None);
    }

    #[test]
    fn formats_with_thousands_separator() {
        assert_eq!(format_price(2500.0, "$"), "2,500.00 $");
        assert_eq!(format_price(1234567.891, "$"), "1,234,567.89 $");
        assert_eq!(format_price(5.5, "$"), "5.50 $");
        assert_eq!(format_price(0.0, ""), "0.00");
        assert_eq!(format_price(999.999, "$"), "1,000.00 $");
    }
}
