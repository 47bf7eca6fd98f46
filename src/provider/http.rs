//! HTTP client for the disbursement provider.
//!
//! Requests are JSON bodies wrapped as `{"data": {"attributes": ...}}`, authenticated
//! with the secret key as the Basic auth username. Amounts travel in minor units.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    BankAccountValidation, BatchPayoutReceipt, ProviderError, ProviderListFilter, ProviderPayout,
    ProviderPayoutPage, ProviderRateLimiter, ProviderResult,
};
use crate::config::ProviderConfig;
use crate::traits::DisbursementProvider;
use crate::types::{Payout, PayoutMethod};
use crate::utils::validation::normalize_account_number;

/// Disbursement provider reached over HTTP.
///
/// Owns the request pacing: every call waits on the shared token bucket first.
pub struct HttpDisbursementProvider {
    client: Client,
    config: ProviderConfig,
    limiter: ProviderRateLimiter,
}

impl HttpDisbursementProvider {
    /// Create a provider client with the given configuration.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(ProviderError::transport(
                "Provider secret key not configured",
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        let limiter = ProviderRateLimiter::from_millis(config.request_interval_ms);

        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    /// Shared request pacer
    pub fn limiter(&self) -> &ProviderRateLimiter {
        &self.limiter
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request and decode a successful JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ProviderResult<T> {
        self.limiter.acquire().await;

        let response = request
            .basic_auth(&self.config.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| {
                warn!(operation, error = %e, "provider transport failure");
                ProviderError::transport(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            let err = error_from_body(status, &body);
            warn!(operation, status, error = %err, "provider rejected request");
            return Err(err);
        }

        debug!(operation, status, "provider request succeeded");
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::transport(format!("Malformed provider response: {}", e)))
    }
}

#[async_trait]
impl DisbursementProvider for HttpDisbursementProvider {
    async fn create_payout(&self, payout: &Payout) -> ProviderResult<ProviderPayout> {
        let body = Envelope {
            data: Attributes {
                attributes: payout_attributes(payout)?,
            },
        };
        let response: Envelope<Resource<PayoutAttributes>> = self
            .send(
                "create_payout",
                self.client.post(self.url("/payouts")).json(&body),
            )
            .await?;
        Ok(response.data.into())
    }

    async fn retrieve_payout(&self, provider_id: &str) -> ProviderResult<ProviderPayout> {
        let response: Envelope<Resource<PayoutAttributes>> = self
            .send(
                "retrieve_payout",
                self.client
                    .get(self.url(&format!("/payouts/{}", provider_id))),
            )
            .await?;
        Ok(response.data.into())
    }

    async fn list_payouts(&self, filter: &ProviderListFilter) -> ProviderResult<ProviderPayoutPage> {
        let response: Page<Resource<PayoutAttributes>> = self
            .send(
                "list_payouts",
                self.client
                    .get(self.url("/payouts"))
                    .query(&filter.query_pairs()),
            )
            .await?;
        Ok(ProviderPayoutPage {
            data: response.data.into_iter().map(Into::into).collect(),
            has_more: response.has_more,
        })
    }

    async fn create_batch_payout(&self, payouts: &[Payout]) -> ProviderResult<BatchPayoutReceipt> {
        let attributes = payouts
            .iter()
            .map(payout_attributes)
            .collect::<ProviderResult<Vec<_>>>()?;
        let body = Envelope {
            data: Attributes {
                attributes: BatchRequest {
                    payouts: attributes,
                },
            },
        };
        let response: Envelope<Resource<BatchAttributes>> = self
            .send(
                "create_batch_payout",
                self.client.post(self.url("/batch_payouts")).json(&body),
            )
            .await?;
        let resource = response.data;
        Ok(BatchPayoutReceipt {
            id: resource.id,
            status: resource.attributes.status,
            payouts: resource
                .attributes
                .payouts
                .into_iter()
                .map(Into::into)
                .collect(),
        })
    }

    async fn validate_bank_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> ProviderResult<BankAccountValidation> {
        let normalized = normalize_account_number(account_number);
        let body = Envelope {
            data: Attributes {
                attributes: AccountValidationRequest {
                    bank_code,
                    account_number: &normalized,
                },
            },
        };
        let response: Envelope<Attributes<AccountValidationAttributes>> = self
            .send(
                "validate_bank_account",
                self.client
                    .post(self.url("/account_validations"))
                    .json(&body),
            )
            .await?;
        Ok(BankAccountValidation {
            valid: response.data.attributes.valid,
            account_name: response.data.attributes.account_name,
        })
    }
}

/// Provider's channel name for a payout method
pub fn provider_method_type(method: &PayoutMethod) -> &str {
    match method {
        PayoutMethod::BankTransfer => "bank",
        other => other.code(),
    }
}

/// Convert a major-unit amount to integer minor units (x100, half-up)
pub fn to_minor_units(amount: &BigDecimal) -> ProviderResult<i64> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| {
            ProviderError::transport(format!("Amount {} cannot be sent to the provider", amount))
        })
}

/// Convert integer minor units back to a major-unit amount
pub fn from_minor_units(minor: i64) -> BigDecimal {
    BigDecimal::new(minor.into(), 2)
}

/// Translate a non-2xx response body into a provider error
pub fn error_from_body(status: u16, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .and_then(|first| first.detail.or(first.code));
    ProviderError::http(status, detail)
}

/// Wire attributes for creating a payout
pub fn payout_attributes(payout: &Payout) -> ProviderResult<PayoutRequestAttributes> {
    let properties = &payout.properties;
    Ok(PayoutRequestAttributes {
        amount: to_minor_units(&payout.amount)?,
        currency: payout.currency.clone(),
        description: format!("Host payout {}", payout.id),
        kind: provider_method_type(&payout.method).to_string(),
        properties: WireProperties {
            account_number: properties
                .account_number
                .as_deref()
                .map(normalize_account_number),
            account_name: properties.account_name.clone(),
            bank_code: properties.bank_code.clone(),
            account_type: properties.account_type.clone(),
        },
        metadata: PayoutMetadata {
            host_id: payout.host_id.clone(),
            payout_id: payout.id.clone(),
            booking_ids: payout.booking_ids.clone(),
        },
    })
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct Attributes<A> {
    attributes: A,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    id: String,
    attributes: A,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

/// Body attributes for `POST /payouts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutRequestAttributes {
    pub amount: i64,
    pub currency: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: WireProperties,
    pub metadata: PayoutMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

/// Reconciliation metadata attached to every created payout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutMetadata {
    pub host_id: String,
    pub payout_id: String,
    pub booking_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    payouts: Vec<PayoutRequestAttributes>,
}

#[derive(Debug, Serialize)]
struct AccountValidationRequest<'a> {
    bank_code: &'a str,
    account_number: &'a str,
}

#[derive(Debug, Deserialize)]
struct PayoutAttributes {
    amount: i64,
    #[serde(default)]
    currency: String,
    status: String,
    #[serde(default)]
    reference_number: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

impl From<Resource<PayoutAttributes>> for ProviderPayout {
    fn from(resource: Resource<PayoutAttributes>) -> Self {
        let attributes = resource.attributes;
        let payout_id = attributes
            .metadata
            .get("payout_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            id: resource.id,
            amount: from_minor_units(attributes.amount),
            currency: attributes.currency,
            status: attributes.status,
            reference_number: attributes.reference_number,
            payout_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchAttributes {
    status: String,
    #[serde(default)]
    payouts: Vec<Resource<PayoutAttributes>>,
}

#[derive(Debug, Deserialize)]
struct AccountValidationAttributes {
    valid: bool,
    #[serde(default)]
    account_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}
