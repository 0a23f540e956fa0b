use chrono::{NaiveDate, NaiveTime};
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill out all required fields: {0} is missing.")]
    MissingField(&'static str),
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("{0} is not a valid date, expected YYYY-MM-DD.")]
    InvalidDate(String),
    #[error("{0} is not a valid time, expected HH:MM.")]
    InvalidTime(String),
    #[error("Consultation fee must be a non-negative amount.")]
    InvalidFee,
    #[error("{0} is not a valid doctor selection.")]
    InvalidDoctor(String),
}

/// Trim `value` and reject it if nothing is left.
pub fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

pub fn required_secret(
    field: &'static str,
    value: &Secret<String>,
) -> Result<(), ValidationError> {
    if value.expose_secret().trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub fn passwords_match(
    password: &Secret<String>,
    confirmation: &Secret<String>,
) -> Result<(), ValidationError> {
    if password.expose_secret() != confirmation.expose_secret() {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

// Browsers submit `HH:MM` from a time input, API clients may send seconds.
pub fn parse_time(value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime(value.to_string()))
}

pub fn parse_doctor_id(value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value).map_err(|_| ValidationError::InvalidDoctor(value.to_string()))
}

pub fn parse_fee(value: &str) -> Result<f64, ValidationError> {
    match value.parse::<f64>() {
        Ok(fee) if fee.is_finite() && fee >= 0.0 => Ok(fee),
        _ => Err(ValidationError::InvalidFee),
    }
}
