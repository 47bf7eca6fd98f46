//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> PayoutResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(PayoutError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a host ID is usable as a reference
pub fn validate_host_id(host_id: &str) -> PayoutResult<()> {
    if host_id.trim().is_empty() {
        return Err(PayoutError::Validation(
            "Host ID cannot be empty".to_string(),
        ));
    }

    if host_id.len() > 64 {
        return Err(PayoutError::Validation(
            "Host ID cannot exceed 64 characters".to_string(),
        ));
    }

    Ok(())
}

/// Strip the separators people commonly type into account numbers
pub fn normalize_account_number(account_number: &str) -> String {
    account_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Validate a wallet or bank account number
pub fn validate_account_number(account_number: &str) -> PayoutResult<()> {
    let digits = normalize_account_number(account_number);

    if digits.is_empty() {
        return Err(PayoutError::Validation(
            "Account number is required".to_string(),
        ));
    }

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PayoutError::Validation(
            "Account number can only contain digits".to_string(),
        ));
    }

    if !(4..=34).contains(&digits.len()) {
        return Err(PayoutError::Validation(
            "Account number must be between 4 and 34 digits".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a free-text operator input (reference, reason) is present
pub fn validate_required_text(field: &str, value: &str) -> PayoutResult<()> {
    if value.trim().is_empty() {
        return Err(PayoutError::Validation(format!("{} is required", field)));
    }

    if value.len() > 500 {
        return Err(PayoutError::Validation(format!(
            "{} cannot exceed 500 characters",
            field
        )));
    }

    Ok(())
}
