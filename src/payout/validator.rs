//! Payout request validation against the fee policy and recipient rules

use std::sync::Arc;

use crate::payout::fee::FeePolicy;
use crate::traits::PayoutRequestValidator;
use crate::types::*;
use crate::utils::validation::*;

/// Default request validator
///
/// Checks the amount against the method's bounds and that the recipient fields the
/// method needs are present. Never touches the provider or storage.
#[derive(Debug, Clone)]
pub struct PayoutValidator {
    fee_policy: Arc<FeePolicy>,
}

impl PayoutValidator {
    pub fn new(fee_policy: Arc<FeePolicy>) -> Self {
        Self { fee_policy }
    }

    fn validate_amount(&self, request: &PayoutRequest) -> PayoutResult<()> {
        validate_positive_amount(&request.amount)?;

        let (minimum, maximum) = self.fee_policy.bounds(&request.method);
        if request.amount < minimum {
            return Err(PayoutError::Validation(format!(
                "Minimum payout amount for {} is {}",
                request.method, minimum
            )));
        }
        if request.amount > maximum {
            return Err(PayoutError::Validation(format!(
                "Maximum payout amount for {} is {}",
                request.method, maximum
            )));
        }
        Ok(())
    }

    fn validate_recipient(&self, request: &PayoutRequest) -> PayoutResult<()> {
        let properties = &request.properties;

        match properties.account_number.as_deref() {
            Some(number) => validate_account_number(number)?,
            None => {
                return Err(PayoutError::Validation(format!(
                    "Account number is required for {}",
                    request.method
                )))
            }
        }

        if properties
            .account_name
            .as_deref()
            .is_none_or(|name| name.trim().is_empty())
        {
            return Err(PayoutError::Validation(format!(
                "Account name is required for {}",
                request.method
            )));
        }

        if request.method.requires_bank_code()
            && properties
                .bank_code
                .as_deref()
                .is_none_or(|code| code.trim().is_empty())
        {
            return Err(PayoutError::Validation(format!(
                "Bank code is required for {}",
                request.method
            )));
        }

        Ok(())
    }
}

impl PayoutRequestValidator for PayoutValidator {
    fn validate(&self, request: &PayoutRequest) -> PayoutResult<()> {
        validate_host_id(&request.host_id)?;
        self.validate_amount(request)?;
        self.validate_recipient(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn validator() -> PayoutValidator {
        PayoutValidator::new(Arc::new(FeePolicy::default()))
    }

    fn gcash(amount: i64) -> PayoutRequest {
        PayoutRequest::new(
            "host-1",
            BigDecimal::from(amount),
            PayoutMethod::Gcash,
            RecipientProperties::wallet("09171234567", "Juan Dela Cruz"),
        )
    }

    #[test]
    fn test_amount_below_minimum_cites_minimum() {
        let err = validator().validate(&gcash(50)).unwrap_err();
        assert!(matches!(err, PayoutError::Validation(_)));
        assert!(err.to_string().contains("Minimum payout amount for gcash is 100"));
    }

    #[test]
    fn test_amount_above_maximum_cites_maximum() {
        let err = validator().validate(&gcash(50_001)).unwrap_err();
        assert!(err.to_string().contains("Maximum payout amount for gcash is 50000"));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(validator().validate(&gcash(100)).is_ok());
        assert!(validator().validate(&gcash(50_000)).is_ok());
    }

    #[test]
    fn test_bank_transfer_requires_bank_code() {
        let request = PayoutRequest::new(
            "host-1",
            BigDecimal::from(5000),
            PayoutMethod::BankTransfer,
            RecipientProperties::wallet("001234567890", "Maria Santos"),
        );
        let err = validator().validate(&request).unwrap_err();
        assert!(err.to_string().contains("Bank code is required"));

        let request = PayoutRequest {
            properties: RecipientProperties::bank("BPI", "001234567890", "Maria Santos"),
            ..request
        };
        assert!(validator().validate(&request).is_ok());
    }

    #[test]
    fn test_missing_account_name() {
        let mut request = gcash(500);
        request.properties.account_name = Some("  ".to_string());
        let err = validator().validate(&request).unwrap_err();
        assert!(err.to_string().contains("Account name is required"));
    }

    #[test]
    fn test_missing_account_number() {
        let mut request = gcash(500);
        request.properties.account_number = None;
        assert!(validator().validate(&request).is_err());
    }

    #[test]
    fn test_non_positive_amount() {
        let request = PayoutRequest::new(
            "host-1",
            BigDecimal::from(0),
            PayoutMethod::Instapay,
            RecipientProperties::wallet("09171234567", "Juan Dela Cruz"),
        );
        let err = validator().validate(&request).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Amount must be positive");
    }
}
