// Parsing and formatting helpers.
//
// All "dirty" cell handling lives here so the engine can assume every
// numeric read yields a finite `f64`.
use num_format::{Locale, ToFormattedString};

use crate::types::CellValue;

/// Parse a string-like value into `f64` while being forgiving about the
/// formatting found in spreadsheet exports.
///
/// - Trims whitespace and a trailing `%`.
/// - Drops space-like thousands separators (`"1 234"`, NBSP, thin space).
/// - When both `,` and `.` appear, the last one is the decimal separator
///   (`"1.234,5"` and `"1,234.5"` are both `1234.5`). A lone `,` is decimal
///   (`"90,5"`); a separator repeated on its own groups thousands.
/// - Accepts a single `e`/`E` exponent and rejects any other letter.
/// - Returns `None` for anything that cannot be safely parsed or is not finite.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim_end();
    if s.is_empty() {
        return None;
    }
    let exponents = s.chars().filter(|c| matches!(c, 'e' | 'E')).count();
    if exponents > 1 || s.chars().any(|c| c.is_alphabetic() && !matches!(c, 'e' | 'E')) {
        return None;
    }
    let s: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{2009}' | '\u{202f}'))
        .collect();
    normalize_separators(&s).parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_separators(s: &str) -> String {
    match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() == 1 => s.replace(',', "."),
        (Some(_), None) => s.replace(',', ""),
        (None, Some(_)) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s.to_string(),
    }
}

/// Numeric value of a cell. Anything that is not a finite number reads as `0`.
pub fn coerce_number(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => parse_f64_safe(Some(s)).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Turns a raw CSV field into a cell: numeric-looking text becomes a number,
/// an empty field becomes [`CellValue::Empty`].
pub fn cell_from_field(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    match parse_f64_safe(Some(trimmed)) {
        Some(n) if !trimmed.ends_with('%') => CellValue::Number(n),
        _ => CellValue::Text(trimmed.to_string()),
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus thousands separators (e.g. `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
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
    // Used for counts in console messages (e.g. `1,024 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spreadsheet_numbers() {
        assert_eq!(parse_f64_safe(Some(" 85 ")), Some(85.0));
        assert_eq!(parse_f64_safe(Some("90,5")), Some(90.5));
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("1 234")), Some(1234.0));
        assert_eq!(parse_f64_safe(Some("1\u{a0}234,5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("72%")), Some(72.0));
        assert_eq!(parse_f64_safe(Some("-3")), Some(-3.0));
        assert_eq!(parse_f64_safe(Some("1.234,5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("1.234.567")), Some(1234567.0));
        assert_eq!(parse_f64_safe(Some("1,234,567")), Some(1234567.0));
    }

    #[test]
    fn accepts_one_exponent() {
        assert_eq!(parse_f64_safe(Some("1e5")), Some(100000.0));
        assert_eq!(parse_f64_safe(Some("2,5E-1")), Some(0.25));
        assert_eq!(parse_f64_safe(Some("1e5e2")), None);
        assert_eq!(parse_f64_safe(Some("1e400")), None);
        // Cyrillic "е" is a letter, not an exponent
        assert_eq!(parse_f64_safe(Some("1е5")), None);
        assert_eq!(cell_from_field("1e5"), CellValue::Number(100000.0));
    }

    #[test]
    fn rejects_text_and_non_finite() {
        assert_eq!(parse_f64_safe(None), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("нет данных")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(Some("%")), None);
    }

    #[test]
    fn coerces_cells_to_zero() {
        assert_eq!(coerce_number(&CellValue::Number(f64::NAN)), 0.0);
        assert_eq!(coerce_number(&CellValue::Empty), 0.0);
        assert_eq!(coerce_number(&CellValue::Bool(true)), 0.0);
        assert_eq!(coerce_number(&CellValue::Text("12,5".into())), 12.5);
    }

    #[test]
    fn csv_fields_become_cells() {
        assert_eq!(cell_from_field(""), CellValue::Empty);
        assert_eq!(cell_from_field("42"), CellValue::Number(42.0));
        assert_eq!(cell_from_field("ВСЕГО"), CellValue::Text("ВСЕГО".into()));
        assert_eq!(cell_from_field("55%"), CellValue::Text("55%".into()));
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
