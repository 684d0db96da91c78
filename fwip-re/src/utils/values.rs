//! Typed interpretation of extracted field values
//!
//! Correction values arrive as free text. The analyzer compares them
//! numerically or by calendar distance when both sides of a comparison parse
//! cleanly, and falls back to string similarity when they don't, so these
//! parsers are deliberately forgiving about formatting but strict about
//! ambiguity.

use chrono::NaiveDate;

/// Parse a monetary amount from invoice text
///
/// Accepts currency symbols, codes, and grouping separators in either the
/// `1,234.56` or `1.234,56` convention. A lone separator followed by exactly
/// three digits is read as a thousands separator (`1,234` is 1234, not
/// 1.234); any other single separator is the decimal point.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            // Both present: the later one is the decimal separator
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            cleaned
                .chars()
                .filter(|c| *c != thousands)
                .map(|c| if c == decimal { '.' } else { c })
                .collect::<String>()
        }
        (Some(_), None) => resolve_single_separator(&cleaned, '.'),
        (None, Some(_)) => resolve_single_separator(&cleaned, ','),
        (None, None) => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Resolve a string containing only one kind of separator
fn resolve_single_separator(s: &str, sep: char) -> String {
    let count = s.matches(sep).count();
    if count > 1 {
        // Repeated separators can only be grouping: "1.234.567"
        return s.chars().filter(|c| *c != sep).collect();
    }

    let tail_digits = s
        .rsplit(sep)
        .next()
        .map(|tail| tail.chars().filter(|c| c.is_ascii_digit()).count())
        .unwrap_or(0);
    if tail_digits == 3 {
        // "1,234" style grouping
        s.chars().filter(|c| *c != sep).collect()
    } else {
        s.replace(sep, ".")
    }
}

/// Date formats seen across forwarder invoices, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parse a date from invoice text
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}
