//! Utility functions for formatting and common operations
//!
//! This module provides centralized Brazilian-locale formatting and parsing
//! for consistent display of quantities and currency values, plus the small
//! text helpers shared by the importers and the reconciliation engine.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::path::PathBuf;
use std::str::FromStr;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Padding, Style},
};
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::table::Cell;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "R$ " prefix (Brazilian Real)
    BRL,
    /// No currency symbol (for table cells)
    None,
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value using Brazilian locale conventions:
/// - Thousands separator: `.` (period)
/// - Decimal separator: `,` (comma)
///
/// # Arguments
/// * `value` - The decimal value to format
/// * `decimals` - Digits after the decimal separator (rounded half away from zero)
/// * `width` - Minimum width for padding (0 for no padding, right-aligned)
/// * `symbol` - Whether to include currency symbol
///
/// # Examples
/// ```
/// use ruptura::utils::{format_number_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_number_with_width(dec!(1234.5), 2, 0, CurrencySymbol::BRL),
///     "R$ 1.234,50"
/// );
///
/// assert_eq!(
///     format_number_with_width(dec!(1234), 3, 15, CurrencySymbol::None),
///     "      1.234,000"
/// );
/// ```
pub fn format_number_with_width(
    value: Decimal,
    decimals: u32,
    width: usize,
    symbol: CurrencySymbol,
) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let is_negative = rounded < Decimal::ZERO;
    let abs_value = rounded.abs();

    let formatted = format!("{:.*}", decimals as usize, abs_value);
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((int, frac)) => (int.to_string(), Some(frac.to_string())),
        None => (formatted.clone(), None),
    };

    // Add thousands separators (.) to integer part
    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec!['.', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::BRL => "R$ ",
        CurrencySymbol::None => "",
    };

    let result = match decimal_part {
        Some(frac) => format!("{}{}{},{}", prefix, sign, with_separators, frac),
        None => format!("{}{}{}", prefix, sign, with_separators),
    };

    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

// ============ Convenience functions ============

/// Format as Brazilian Real with symbol: "R$ 1.234,56"
///
/// # Examples
/// ```
/// use ruptura::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.5)), "R$ 1.234,50");
/// assert_eq!(format_currency(dec!(-500)), "R$ -500,00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_number_with_width(value, 2, 0, CurrencySymbol::BRL)
}

/// Format number only (no symbol) with the given number of decimals: "1.234,560"
pub fn format_decimal_br(value: Decimal, decimals: u32) -> String {
    format_number_with_width(value, decimals, 0, CurrencySymbol::None)
}

/// Integer rendering used for codes and counts: fraction dropped, no separators
pub fn format_integer(value: Decimal) -> String {
    value.trunc().normalize().to_string()
}

/// Parse a number written with Brazilian or plain conventions.
///
/// - `"1.234,56"` and `"R$ 1.234,56"` → `1234.56`
/// - `"12,5"` → `12.5`
/// - `"12.5"` (no comma) → `12.5`
///
/// Returns `None` for empty or unparseable input.
pub fn parse_decimal_br(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Normalize a product code for joins: text form, decimal suffix dropped,
/// leading zeros stripped. `"00123.0"` → `"123"`.
///
/// Idempotent: `normalize_code(normalize_code(x)) == normalize_code(x)`.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    let integral = trimmed.split('.').next().unwrap_or("");
    integral.trim_start_matches('0').to_string()
}

/// [`normalize_code`] applied to a cell
pub fn normalize_code_cell(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Number(d) => normalize_code(&d.trunc().normalize().to_string()),
        other => normalize_code(&other.as_text()),
    }
}

/// Lowercase and strip diacritics, so `"Código"` and `"CODIGO"` compare equal
pub fn fold_accents(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

static PLAIN_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// True for strings made only of ASCII digits (after trimming)
pub fn is_plain_digits(text: &str) -> bool {
    PLAIN_DIGITS.is_match(text.trim())
}

/// True when the text starts with a digit (product rows start with their code)
pub fn starts_with_digit(text: &str) -> bool {
    text.trim()
        .chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
}

/// Resolve a bundled resource path.
///
/// Looks next to the running executable first (packaged deployment), then
/// relative to the current directory (source tree). When neither exists the
/// current-directory candidate is returned so callers can report it.
pub fn resource_path(relative: &str) -> PathBuf {
    let cwd_candidate = std::env::current_dir()
        .map(|dir| dir.join(relative))
        .unwrap_or_else(|_| PathBuf::from(relative));

    let exe_candidate = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(relative)));

    if let Some(candidate) = exe_candidate {
        if candidate.exists() {
            debug!("Resource {} resolved next to executable: {:?}", relative, candidate);
            return candidate;
        }
    }

    debug!("Resource {} resolved from working directory: {:?}", relative, cwd_candidate);
    cwd_candidate
}

/// Borderless preview table: right-aligned columns separated by one space.
///
/// Rows shorter than the header are filled with blanks.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for row in rows {
        builder.push_record(row.iter().cloned());
    }

    let mut table = builder.build();
    table.with(Style::blank()).with(Padding::zero());
    table.modify(Columns::new(..), Alignment::right());
    table.to_string()
}

/// Cut `text` to at most `max` characters, ending with `marker` when cut.
///
/// The marker counts toward `max`: `truncate_with("abcdef", 5, "..")` is `"abc.."`.
pub fn truncate_with(text: &str, max: usize, marker: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(marker.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(marker);
    out
}
