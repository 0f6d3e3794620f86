use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

use crate::errors::NeedsbookError;

/// Largest amount a single need may carry (10^12); larger input is capped.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

fn normalize(input: &str) -> String {
    input.trim().replace(',', ".")
}

/// Parses a money amount, accepting either `,` or `.` as the decimal separator.
pub fn parse_amount(input: &str) -> Result<Decimal, NeedsbookError> {
    let normalized = normalize(input);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&normalized).map_err(|e| NeedsbookError::Parse(format!("{input}: {e}")))
}

/// Coerces free-form input into an amount between zero and [`MAX_AMOUNT`].
/// Anything that is not a number becomes zero, and so does a negative number.
pub fn coerce_amount(input: &str) -> Decimal {
    match parse_amount(input) {
        Ok(value) if value.is_sign_negative() => {
            warn!(input, "negative amount replaced by zero");
            Decimal::ZERO
        }
        Ok(value) if value > MAX_AMOUNT => {
            warn!(input, max = %MAX_AMOUNT, "amount capped");
            MAX_AMOUNT
        }
        Ok(value) => value,
        Err(e) => {
            warn!(input, error = %e, "non-numeric amount replaced by zero");
            Decimal::ZERO
        }
    }
}

pub fn format_amount(value: Decimal, decimal_sep: char) -> String {
    let text = format!("{:.2}", value);
    if decimal_sep == '.' {
        text
    } else {
        text.replace('.', &decimal_sep.to_string())
    }
}
