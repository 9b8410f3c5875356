//! Formatting helpers for terminal output
//!
//! Amounts are shown the way Slovenian forms print them: `.` groups
//! thousands, `,` separates decimals, and the euro sign follows the number.

use rust_decimal::Decimal;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Append " €"
    Eur,
    /// Bare number, for table cells
    None,
}

/// Core formatting function with full control over output.
///
/// # Examples
/// ```
/// use edavki::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234.56), 0, CurrencySymbol::Eur),
///     "1.234,56 €"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 15, CurrencySymbol::None),
///     "       1.234,00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = value.round_dp(2);
    // Sign of the rounded value, so -0.001 prints as 0,00
    let is_negative = rounded < Decimal::ZERO;
    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let digits: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if is_negative { "-" } else { "" };
    let suffix = match symbol {
        CurrencySymbol::Eur => " €",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{},{}{}", sign, grouped, decimal_part, suffix);

    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format as euro: "1.234,56 €"
///
/// # Examples
/// ```
/// use edavki::utils::format_eur;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_eur(dec!(1234.56)), "1.234,56 €");
/// assert_eq!(format_eur(dec!(-500)), "-500,00 €");
/// ```
pub fn format_eur(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::Eur)
}

/// Number only, "1.234,56"
pub fn format_decimal_si(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::None)
}
