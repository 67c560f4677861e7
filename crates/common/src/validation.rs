//! Input validation for values that leave the process
//!
//! Phone numbers are handed to the telephony backend and emails end up as
//! calendar attendees, so both are checked before any request is made.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").ok());

/// Type alias for validation results
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Normalizes a dialable phone number to `+<digits>` (E.164 shape).
///
/// Spaces, dashes, dots and parentheses are stripped. A number without a
/// leading `+` is assumed to already include its country code.
pub fn validate_phone_number(raw: &str) -> ValidationResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::field("phone_number", "phone number is required"));
    }

    let mut digits = String::with_capacity(trimmed.len());
    for (i, ch) in trimmed.chars().enumerate() {
        match ch {
            '0'..='9' => digits.push(ch),
            '+' if i == 0 => {}
            ' ' | '-' | '.' | '(' | ')' => {}
            other => {
                return Err(ValidationError::field(
                    "phone_number",
                    format!("unexpected character '{other}'"),
                ))
            }
        }
    }

    if !(8..=15).contains(&digits.len()) {
        return Err(ValidationError::field(
            "phone_number",
            format!("expected 8 to 15 digits, got {}", digits.len()),
        ));
    }
    if digits.starts_with('0') {
        return Err(ValidationError::field(
            "phone_number",
            "country code must not start with 0",
        ));
    }

    Ok(format!("+{digits}"))
}

/// Checks an email address is plausibly deliverable.
pub fn validate_email(raw: &str) -> ValidationResult<()> {
    let value = raw.trim();
    if EMAIL.as_ref().is_some_and(|re| re.is_match(value)) {
        Ok(())
    } else {
        Err(ValidationError::field("email", format!("'{value}' is not a valid email address")))
    }
}
