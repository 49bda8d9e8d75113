//! Utility functions for formatting and common operations
//!
//! Rounding lives here and only here: engine values keep full precision and
//! are rounded when rendered.

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Round for presentation (banker's rounding, as `Decimal::round_dp`)
pub fn round_for_display(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value with `,` thousands separators and `.` as the
/// decimal separator, right-aligned to `width` (0 for no padding).
///
/// # Examples
/// ```
/// use basketperf::utils::format_number_with_width;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_number_with_width(dec!(1234.5678), 2, 0), "1,234.57");
/// assert_eq!(format_number_with_width(dec!(-100), 2, 10), "   -100.00");
/// ```
pub fn format_number_with_width(value: Decimal, decimals: u32, width: usize) -> String {
    let rounded = round_for_display(value, decimals);
    let is_negative = rounded < Decimal::ZERO;
    let formatted = format!("{:.*}", decimals as usize, rounded.abs());
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    // Add thousands separators (,) to integer part
    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let result = match decimal_part {
        Some(f) => format!("{}{}.{}", sign, with_separators, f),
        None => format!("{}{}", sign, with_separators),
    };

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format a plain number: "1,234.57"
pub fn format_number(value: Decimal, decimals: u32) -> String {
    format_number_with_width(value, decimals, 0)
}

/// Format a fractional return as a percentage: 0.0235 -> "2.35%"
///
/// # Examples
/// ```
/// use basketperf::utils::format_pct;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_pct(dec!(0.0235), 2), "2.35%");
/// assert_eq!(format_pct(dec!(-0.1), 1), "-10.0%");
/// ```
pub fn format_pct(value: Decimal, decimals: u32) -> String {
    format!("{}%", format_number(value * Decimal::ONE_HUNDRED, decimals))
}

/// Parse YYYY-MM-DD, YYYY-MM (last day of month), or YYYY (December 31)
pub fn parse_flexible_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(ym) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        let next_month = if ym.month() == 12 {
            NaiveDate::from_ymd_opt(ym.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(ym.year(), ym.month() + 1, 1)
        };
        if let Some(last_day) = next_month.and_then(|nm| nm.pred_opt()) {
            return Ok(last_day);
        }
    }

    if let Ok(year) = s.parse::<i32>() {
        if (1900..=2100).contains(&year) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, 12, 31) {
                return Ok(date);
            }
        }
    }

    Err(anyhow!("Invalid date '{}'. Use YYYY-MM-DD, YYYY-MM, or YYYY", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_number_basic() {
        assert_eq!(format_number(dec!(1234.56), 2), "1,234.56");
        assert_eq!(format_number(dec!(0.99), 2), "0.99");
        assert_eq!(format_number(dec!(1000000), 2), "1,000,000.00");
        assert_eq!(format_number(dec!(1234567), 0), "1,234,567");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(dec!(-1234.56), 2), "-1,234.56");
        assert_eq!(format_number(dec!(-0.01), 2), "-0.01");
    }

    #[test]
    fn test_negative_zero_after_rounding_has_no_sign() {
        assert_eq!(format_number(dec!(-0.0001), 2), "0.00");
    }

    #[test]
    fn test_format_with_width() {
        let result = format_number_with_width(dec!(100), 2, 10);
        assert_eq!(result.len(), 10);
        assert_eq!(result, "    100.00");

        // Already wider than requested, no padding added
        assert_eq!(format_number_with_width(dec!(1000000), 2, 5), "1,000,000.00");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(dec!(0.03), 2), "3.00%");
        assert_eq!(format_pct(dec!(0.123456), 4), "12.3456%");
        assert_eq!(format_pct(dec!(-0.005), 1), "-0.5%");
    }

    #[test]
    fn test_round_for_display_does_not_touch_precision_elsewhere() {
        let value = dec!(0.0123456789);
        assert_eq!(round_for_display(value, 4), dec!(0.0123));
        assert_eq!(value, dec!(0.0123456789));
    }

    #[test]
    fn test_parse_flexible_date() {
        assert_eq!(
            parse_flexible_date("2024-03-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(
            parse_flexible_date("2024-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            parse_flexible_date("2023").unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
        assert!(parse_flexible_date("March").is_err());
    }
}
