//! Outbound integrations. Currently just the payment provider's REST API.
mod payment_api;

pub use payment_api::PaymentApi;
