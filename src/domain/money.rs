use thiserror::Error;

/// Money is held as integer cents so balance arithmetic stays exact.
/// 1 unit = 100 cents, so 100.00 = 10_000 cents.
pub type Cents = i64;

pub const CENTS_PER_UNIT: Cents = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format")]
    InvalidFormat,

    #[error("amount is too large")]
    Overflow,
}

/// Format cents as a decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let per_unit = CENTS_PER_UNIT as u64;
    format!("{}{}.{:02}", sign, abs / per_unit, abs % per_unit)
}

/// Convert cents to units for display at the HTTP boundary.
pub fn cents_to_units(cents: Cents) -> f64 {
    cents as f64 / CENTS_PER_UNIT as f64
}

/// More whole digits than this cannot fit in `Cents`.
const MAX_WHOLE_DIGITS: i64 = 19;

/// Parse a decimal string into cents.
///
/// Accepts an optional sign, whole units, any number of fractional digits and
/// an optional exponent; digits past the second decimal place are truncated.
/// Example: "50.00" -> 5000, "12.5" -> 1250, ".05" -> 5, "0.019" -> 1,
/// "1.5e1" -> 1500
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let expanded;
    let digits = match digits.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => {
            expanded = expand_exponent(mantissa, exponent)?;
            expanded.as_str()
        }
        None => digits,
    };

    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: Cents = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    let mut fraction_cents: Cents = 0;
    let mut scale = CENTS_PER_UNIT / 10;
    for digit in fraction.bytes().take(2) {
        fraction_cents += Cents::from(digit - b'0') * scale;
        scale /= 10;
    }

    let cents = units
        .checked_mul(CENTS_PER_UNIT)
        .and_then(|c| c.checked_add(fraction_cents))
        .ok_or(ParseCentsError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}

/// Rewrite `mantissa` x 10^`exponent` as a plain unsigned decimal.
/// Example: ("1.5", "3") -> "1500", ("25", "-3") -> "0.025"
fn expand_exponent(mantissa: &str, exponent: &str) -> Result<String, ParseCentsError> {
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    let exponent: i64 = exponent
        .parse()
        .map_err(|_| ParseCentsError::InvalidFormat)?;

    let digits = format!("{}{}", whole, fraction);
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok("0".to_string());
    }

    // Position of the decimal point, counted in `significant` digits
    let leading_zeros = (digits.len() - significant.len()) as i64;
    let point = (whole.len() as i64 - leading_zeros).saturating_add(exponent);
    if point > MAX_WHOLE_DIGITS {
        return Err(ParseCentsError::Overflow);
    }
    // Everything falls below the second decimal place
    if point < -1 {
        return Ok("0".to_string());
    }

    Ok(if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), significant)
    } else if point as usize >= significant.len() {
        format!("{}{}", significant, "0".repeat(point as usize - significant.len()))
    } else {
        let (units, fraction) = significant.split_at(point as usize);
        format!("{}.{}", units, fraction)
    })
}
