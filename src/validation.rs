//! Field-level checks applied to request bodies before they reach a service.

use crate::constants;
use crate::error::{ClinicError, Result};
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

// E.164: optional plus, no leading zero, up to 15 digits
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap());

static PASSWORD_CHARSET_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z\d]{8,}$").unwrap());

static TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());

fn invalid(field: &'static str, code: &'static str) -> ClinicError {
    ClinicError::Validation { field, code }
}

pub fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, constants::REQUIRED_FIELD));
    }
    Ok(())
}

pub fn length(field: &'static str, value: &str, min: usize, max: Option<usize>) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min || max.is_some_and(|max| len > max) {
        return Err(invalid(field, constants::INVALID_LENGTH));
    }
    Ok(())
}

/// Doctor and patient usernames
pub fn username(value: &str) -> Result<()> {
    required("username", value)?;
    length("username", value, 3, Some(20))
}

pub fn email(value: &str) -> Result<()> {
    required("email", value)?;
    if !EMAIL_REGEX.is_match(value.trim()) {
        return Err(invalid("email", constants::INVALID_EMAIL));
    }
    Ok(())
}

pub fn phone_number(value: &str) -> Result<()> {
    if !PHONE_REGEX.is_match(value.trim()) {
        return Err(invalid("phone_number", constants::INVALID_PHONE_NUMBER));
    }
    Ok(())
}

/// At least eight letters or digits, with at least one of each
pub fn password(field: &'static str, value: &str) -> Result<()> {
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !PASSWORD_CHARSET_REGEX.is_match(value) || !has_letter || !has_digit {
        return Err(invalid(field, constants::PASSWORD_TOO_SHORT));
    }
    Ok(())
}

pub fn passwords_match(password: &str, confirm_password: &str) -> Result<()> {
    if password != confirm_password {
        return Err(invalid("confirm_password", constants::PASSWORDS_DO_NOT_MATCH));
    }
    Ok(())
}

/// Parses `HH:MM` (24h) into a time of day
pub fn time_of_day(value: &str) -> Result<NaiveTime> {
    if !TIME_REGEX.is_match(value) {
        return Err(invalid("time", constants::INVALID_TIME_FORMAT));
    }
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| invalid("time", constants::INVALID_TIME_FORMAT))
}
