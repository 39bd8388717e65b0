//! HTTP client for the external payment provider.
//!
//! The provider exposes two operations the order pipeline needs: create a payment for an amount
//! (returning a payment id and a checkout redirect URL), and fetch a payment's current status by
//! id. Webhooks from the provider carry only a payment id; the handler re-fetches the payment
//! through this client before reconciling, so a forged or stale payload can never inject state.
use std::sync::Arc;

use boba_order_engine::{
    db_types::Order,
    traits::{NewProviderPayment, PaymentProvider, PaymentProviderError, ProviderPayment},
};
use bos_common::Cents;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::config::PaymentApiConfig;

#[derive(Clone)]
pub struct PaymentApi {
    config: PaymentApiConfig,
    client: Arc<Client>,
}

impl PaymentApi {
    pub fn new(config: PaymentApiConfig) -> Result<Self, PaymentProviderError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| PaymentProviderError::RequestFailed(format!("Invalid API key: {e}")))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PaymentProviderError::RequestFailed(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct CreatePaymentRequest<'a> {
    amount: i64,
    currency: &'a str,
    description: String,
    redirect_url: &'a str,
    /// Echoed back on fetch; carries the back-reference to our order.
    metadata: PaymentMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct PaymentMetadata {
    order_number: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResource {
    id: String,
    amount: i64,
    status: String,
    #[serde(default)]
    checkout_url: Option<String>,
}

impl PaymentProvider for PaymentApi {
    async fn create_payment(
        &self,
        order: &Order,
        return_url: &str,
    ) -> Result<NewProviderPayment, PaymentProviderError> {
        let body = CreatePaymentRequest {
            amount: order.total.value(),
            currency: "USD",
            description: format!("Boba order {}", order.order_number),
            redirect_url: return_url,
            metadata: PaymentMetadata { order_number: order.order_number.as_str().to_string() },
        };
        trace!("💸️ Creating payment for order {} ({})", order.order_number, order.total);
        let response = self
            .client
            .post(self.url("/payments"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentProviderError::RequestFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PaymentProviderError::InvalidResponse(format!(
                "Payment creation returned {}",
                response.status()
            )));
        }
        let payment: PaymentResource =
            response.json().await.map_err(|e| PaymentProviderError::InvalidResponse(e.to_string()))?;
        let redirect_url = payment.checkout_url.ok_or_else(|| {
            PaymentProviderError::InvalidResponse("Payment resource is missing its checkout URL".to_string())
        })?;
        debug!("💸️ Payment [{}] created for order {}", payment.id, order.order_number);
        Ok(NewProviderPayment { payment_ref: payment.id, redirect_url })
    }

    async fn fetch_payment(&self, payment_ref: &str) -> Result<ProviderPayment, PaymentProviderError> {
        let response = self
            .client
            .get(self.url(&format!("/payments/{payment_ref}")))
            .send()
            .await
            .map_err(|e| PaymentProviderError::RequestFailed(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PaymentProviderError::PaymentNotFound(payment_ref.to_string()));
        }
        if !response.status().is_success() {
            return Err(PaymentProviderError::InvalidResponse(format!(
                "Payment fetch returned {}",
                response.status()
            )));
        }
        let payment: PaymentResource =
            response.json().await.map_err(|e| PaymentProviderError::InvalidResponse(e.to_string()))?;
        trace!("💸️ Provider reports payment [{}] as '{}'", payment.id, payment.status);
        Ok(ProviderPayment {
            payment_ref: payment.id,
            amount: Cents::from(payment.amount),
            status: payment.status.to_lowercase(),
        })
    }
}
