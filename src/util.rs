// Utility helpers for parsing, rounding and basic statistics.
//
// Cell-level cleanup of the CSV export lives here so the rest of the crate
// can work with typed values.
use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Characters stripped from both ends of a column header. Exports from the
/// source workbook sometimes wrap names in acute accents or quotes.
const HEADER_QUOTES: &[char] = &['´', '`', '\'', '"', '\u{feff}'];

/// Normalize a column header: strip stray quote characters and surrounding
/// whitespace, in any nesting order.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || HEADER_QUOTES.contains(&c))
        .to_string()
}

/// Parse a cell into `f64`, forgiving about the formatting issues common in
/// spreadsheet exports.
///
/// - Trims whitespace and strips thousands separators (`","`).
/// - Accepts exponent notation (`1.5E+06`) but rejects any other letter, so
///   `TRUE`, `n/a`, `NaN` and `inf` never count as numbers.
/// - Returns `None` for blank or unparseable input.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Base currency units -> millions, rounded to two decimals.
pub fn to_millions(v: f64) -> f64 {
    round2(v / 1_000_000.0)
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice so summaries never carry NaN.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Fiscal year and quarter for a reporting date. The fiscal year starts in
/// April; January already belongs to Q4 of the previous fiscal year.
pub fn fiscal_period(date: NaiveDate) -> (i32, &'static str) {
    const QUARTERS: [&str; 12] = [
        "Q4", "Q1", "Q1", "Q1", "Q2", "Q2", "Q2", "Q3", "Q3", "Q3", "Q4", "Q4",
    ];
    let month = date.month();
    let year = if month >= 4 { date.year() } else { date.year() - 1 };
    (year, QUARTERS[(month - 1) as usize])
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_lose_stray_quotes_and_padding() {
        assert_eq!(normalize_header(" ´Business Unit´ "), "Business Unit");
        assert_eq!(normalize_header("\"TUs\""), "TUs");
        assert_eq!(normalize_header("´ Contract TD"), "Contract TD");
        assert_eq!(normalize_header("Plain"), "Plain");
    }

    #[test]
    fn numeric_cells_reject_text_and_booleans() {
        assert_eq!(parse_f64_safe(Some(" -500,000 ")), Some(-500_000.0));
        assert_eq!(parse_f64_safe(Some("0")), Some(0.0));
        assert_eq!(parse_f64_safe(Some("TRUE")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn exponent_notation_is_numeric() {
        assert_eq!(parse_f64_safe(Some("1.5E+06")), Some(1_500_000.0));
        assert_eq!(parse_f64_safe(Some("-2.5e5")), Some(-250_000.0));
        assert_eq!(parse_f64_safe(Some("1e400")), None);
        assert_eq!(parse_f64_safe(Some("E")), None);
        assert_eq!(parse_f64_safe(Some("1.5E+06x")), None);
    }

    #[test]
    fn millions_round_to_two_places() {
        assert_eq!(to_millions(-500_000.0), -0.5);
        assert_eq!(to_millions(1_234_567.0), 1.23);
        assert_eq!(to_millions(0.0), 0.0);
    }

    #[test]
    fn fiscal_year_starts_in_april() {
        let d = |y, m| NaiveDate::from_ymd_opt(y, m, 15).unwrap();
        assert_eq!(fiscal_period(d(2025, 1)), (2024, "Q4"));
        assert_eq!(fiscal_period(d(2025, 3)), (2024, "Q1"));
        assert_eq!(fiscal_period(d(2025, 4)), (2025, "Q1"));
        assert_eq!(fiscal_period(d(2025, 7)), (2025, "Q2"));
        assert_eq!(fiscal_period(d(2025, 10)), (2025, "Q3"));
        assert_eq!(fiscal_period(d(2025, 12)), (2025, "Q4"));
    }

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.5, 2), "-0.50");
        assert_eq!(format_int(9855usize), "9,855");
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[1.0, 2.0, 3.0]), 2.0);
    }
}
