use bos_common::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Order, PaymentOutcome};

/// The external payment processor, reduced to the two operations the order pipeline needs.
/// Webhook authenticity is validated upstream; the engine only ever sees a payment id and
/// re-fetches the authoritative state through this trait.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// Create a payment for the order's total. Returns the provider's payment id and the URL to
    /// redirect the customer to.
    async fn create_payment(&self, order: &Order, return_url: &str)
        -> Result<NewProviderPayment, PaymentProviderError>;

    /// Fetch a payment's current status by id. Reconciliation always calls this rather than
    /// trusting a status carried in a webhook payload.
    async fn fetch_payment(&self, payment_ref: &str) -> Result<ProviderPayment, PaymentProviderError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProviderPayment {
    pub payment_ref: String,
    pub redirect_url: String,
}

/// A payment as the provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPayment {
    pub payment_ref: String,
    pub amount: Cents,
    /// The provider's own status vocabulary, lower-cased.
    pub status: String,
}

impl ProviderPayment {
    /// Normalize the provider's status string into the outcome vocabulary of the reconciliation
    /// state machine.
    pub fn outcome(&self) -> PaymentOutcome {
        match self.status.as_str() {
            "paid" => PaymentOutcome::Paid,
            "failed" | "canceled" | "cancelled" | "expired" => PaymentOutcome::Failed,
            _ => PaymentOutcome::Unknown,
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentProviderError {
    #[error("The payment provider could not be reached: {0}")]
    RequestFailed(String),
    #[error("The payment provider returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("The provider does not know payment {0}")]
    PaymentNotFound(String),
}

#[cfg(test)]
mod test {
    use super::*;

    fn payment(status: &str) -> ProviderPayment {
        ProviderPayment { payment_ref: "tr_123".into(), amount: Cents::from(950), status: status.into() }
    }

    #[test]
    fn status_normalization() {
        assert_eq!(payment("paid").outcome(), PaymentOutcome::Paid);
        assert_eq!(payment("failed").outcome(), PaymentOutcome::Failed);
        assert_eq!(payment("canceled").outcome(), PaymentOutcome::Failed);
        assert_eq!(payment("expired").outcome(), PaymentOutcome::Failed);
        assert_eq!(payment("open").outcome(), PaymentOutcome::Unknown);
        assert_eq!(payment("pending").outcome(), PaymentOutcome::Unknown);
        assert_eq!(payment("gibberish").outcome(), PaymentOutcome::Unknown);
    }
}
