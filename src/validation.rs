//! Field validators shared by request DTOs (used through `#[validate(custom = ...)]`).

use rust_decimal::Decimal;
use validator::ValidationError;

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

pub fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative_amount");
        err.message = Some("must be zero or positive".into());
        return Err(err);
    }
    Ok(())
}

/// Algerian phone numbers: 9 or 10 national digits, optionally written with a `+213`
/// or `00213` prefix. A mobile number may be written as its 9 digits without the leading `0`.
/// Spaces, dots and dashes are ignored.
pub fn algerian_phone(value: &str) -> Result<(), ValidationError> {
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();
    let subscriber = compact
        .strip_prefix("+213")
        .or_else(|| compact.strip_prefix("00213"))
        .or_else(|| compact.strip_prefix('0'));

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let valid = match subscriber {
        Some(rest) => (8..=9).contains(&rest.len()) && !rest.starts_with('0') && all_digits(rest),
        None => compact.len() == 9 && all_digits(&compact),
    };
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("must be an Algerian phone number, e.g. 0555 12 34 56".into());
        Err(err)
    }
}

pub fn known_wilaya(value: &str) -> Result<(), ValidationError> {
    if crate::wilaya::is_valid(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("wilaya");
        err.message = Some("unknown wilaya".into());
        Err(err)
    }
}
