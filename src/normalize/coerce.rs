// src/normalize/coerce.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tracing::trace;

use super::table::ColumnData;

/// Dots grouping the integer part in threes, e.g. `1.234` or `12.345.678,9`.
static DOT_THOUSANDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(\.\d{3})+(,\d*)?$").expect("thousands regex should parse")
});

/// Trim a cell and, for decimal-comma locales, turn `"1 234,5"` or
/// `"1.234,5"` into `"1234.5"`.
///
/// A dot is a thousands separator only where the dots split the integer
/// part into groups of three, with or without a decimal comma: `"1.234"`
/// and `"1.234,0"` both read as 1234. Any other dot stays a decimal point,
/// so `"1.5"` reads as 1.5.
pub fn clean_number(raw: &str, decimal_comma: bool) -> Cow<'_, str> {
    let trimmed = raw.trim();
    if !decimal_comma {
        return Cow::Borrowed(trimmed);
    }

    // thousands separators: plain, non-breaking and narrow spaces
    let mut cleaned: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if DOT_THOUSANDS_RE.is_match(&cleaned) {
        cleaned.retain(|c| c != '.');
    }
    if cleaned.contains(',') {
        cleaned = cleaned.replace(',', ".");
    }
    if cleaned == trimmed {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(cleaned)
    }
}

/// Parse one cell as a finite `f64`. `NaN`/`inf` spellings count as failures.
pub fn parse_number(raw: &str, decimal_comma: bool) -> Option<f64> {
    let cleaned = clean_number(raw, decimal_comma);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a column of cells.
///
/// A column is numeric as soon as one cell parses; the cells that don't
/// become missing values. With no parse at all the cells stay as text,
/// untouched.
pub fn coerce_numeric(cells: Vec<String>, decimal_comma: bool) -> ColumnData {
    let parsed: Vec<Option<f64>> = cells
        .iter()
        .map(|cell| {
            let v = parse_number(cell, decimal_comma);
            if v.is_none() && !cell.trim().is_empty() {
                trace!(cell = %cell, "cell is not numeric, treating as missing");
            }
            v
        })
        .collect();

    if parsed.iter().any(Option::is_some) {
        ColumnData::Numeric(parsed)
    } else {
        ColumnData::Text(cells)
    }
}
