//! Fee and limit calculation per payout method

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

use crate::config::{MethodPolicy, PayoutPolicyConfig};
use crate::types::{net_of_fee, PayoutMethod};

/// Fee breakdown for a prospective payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub method: PayoutMethod,
    /// Gross amount quoted
    pub amount: BigDecimal,
    /// Fee charged by the provider
    pub fee: BigDecimal,
    /// Amount the host receives
    pub net_amount: BigDecimal,
    /// Smallest accepted amount for the method
    pub minimum: BigDecimal,
    /// Largest accepted amount for the method
    pub maximum: BigDecimal,
}

/// Fee calculator built from an injected policy table
///
/// Methods without an entry in the table are priced with the default method's
/// policy instead of being refused, so new provider channels can be accepted before
/// the table is updated.
#[derive(Debug, Clone)]
pub struct FeePolicy {
    config: PayoutPolicyConfig,
    fallback: MethodPolicy,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::new(PayoutPolicyConfig::default())
    }
}

impl FeePolicy {
    pub fn new(config: PayoutPolicyConfig) -> Self {
        let fallback = config
            .methods
            .get(config.default_method.code())
            .cloned()
            .unwrap_or_else(|| MethodPolicy::flat(25, 100, 1_000_000));
        Self { config, fallback }
    }

    /// Operating currency
    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Policy applied to `method`
    pub fn policy_for(&self, method: &PayoutMethod) -> &MethodPolicy {
        self.config
            .methods
            .get(method.code())
            .unwrap_or(&self.fallback)
    }

    /// Fee charged for paying out `amount` through `method`
    pub fn fee(&self, method: &PayoutMethod, amount: &BigDecimal) -> BigDecimal {
        let policy = self.policy_for(method);
        let zero = BigDecimal::from(0);

        let fee = if policy.percentage_fee == zero {
            policy.fixed_fee.clone()
        } else {
            let variable = (amount * &policy.percentage_fee) / BigDecimal::from(100);
            (&policy.fixed_fee + variable).with_scale_round(2, RoundingMode::HalfUp)
        };

        if fee < zero {
            zero
        } else {
            fee
        }
    }

    /// Accepted amount range `(minimum, maximum)` for `method`
    pub fn bounds(&self, method: &PayoutMethod) -> (BigDecimal, BigDecimal) {
        let policy = self.policy_for(method);
        (policy.minimum.clone(), policy.maximum.clone())
    }

    /// Full breakdown for a prospective payout
    pub fn quote(&self, method: &PayoutMethod, amount: &BigDecimal) -> FeeQuote {
        let fee = self.fee(method, amount);
        let (minimum, maximum) = self.bounds(method);
        FeeQuote {
            method: method.clone(),
            amount: amount.clone(),
            net_amount: net_of_fee(amount, &fee),
            fee,
            minimum,
            maximum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_fee_table() {
        let policy = FeePolicy::default();
        let amount = BigDecimal::from(5000);

        assert_eq!(policy.fee(&PayoutMethod::Gcash, &amount), BigDecimal::from(15));
        assert_eq!(policy.fee(&PayoutMethod::Paymaya, &amount), BigDecimal::from(15));
        assert_eq!(policy.fee(&PayoutMethod::BankTransfer, &amount), BigDecimal::from(25));
        assert_eq!(policy.fee(&PayoutMethod::Instapay, &amount), BigDecimal::from(15));
        assert_eq!(policy.fee(&PayoutMethod::Pesonet, &amount), BigDecimal::from(30));
    }

    #[test]
    fn test_bounds_are_ordered_for_every_method() {
        let policy = FeePolicy::default();
        for method in PayoutMethod::KNOWN {
            let (min, max) = policy.bounds(&method);
            assert!(min <= max, "bounds inverted for {}", method);
        }
        assert_eq!(
            policy.bounds(&PayoutMethod::Instapay),
            (BigDecimal::from(1), BigDecimal::from(50_000))
        );
        assert_eq!(
            policy.bounds(&PayoutMethod::Pesonet),
            (BigDecimal::from(1), BigDecimal::from(1_000_000))
        );
    }

    #[test]
    fn test_unknown_method_uses_bank_transfer_policy() {
        let policy = FeePolicy::default();
        let method = PayoutMethod::Other("crypto".to_string());

        assert_eq!(policy.fee(&method, &BigDecimal::from(1000)), BigDecimal::from(25));
        assert_eq!(
            policy.bounds(&method),
            policy.bounds(&PayoutMethod::BankTransfer)
        );
    }

    #[test]
    fn test_percentage_component() {
        let mut config = PayoutPolicyConfig::default();
        config.methods.insert(
            "gcash".to_string(),
            MethodPolicy {
                fixed_fee: BigDecimal::from(10),
                percentage_fee: BigDecimal::from_str("1.5").unwrap(),
                minimum: BigDecimal::from(100),
                maximum: BigDecimal::from(50_000),
            },
        );
        let policy = FeePolicy::new(config);

        // 10 + 1.5% of 1234.56 = 10 + 18.5184
        let fee = policy.fee(&PayoutMethod::Gcash, &BigDecimal::from_str("1234.56").unwrap());
        assert_eq!(fee, BigDecimal::from_str("28.52").unwrap());
    }

    #[test]
    fn test_quote_net_amount() {
        let policy = FeePolicy::default();
        let quote = policy.quote(&PayoutMethod::BankTransfer, &BigDecimal::from(5000));

        assert_eq!(quote.fee, BigDecimal::from(25));
        assert_eq!(quote.net_amount, BigDecimal::from(4975));
        assert_eq!(quote.minimum, BigDecimal::from(100));
        assert_eq!(quote.maximum, BigDecimal::from(1_000_000));
    }
}
