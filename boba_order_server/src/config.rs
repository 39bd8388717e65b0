use std::env;

use bos_common::Secret;
use chrono::Duration;
use log::*;

const DEFAULT_BOS_HOST: &str = "127.0.0.1";
const DEFAULT_BOS_PORT: u16 = 8480;
const DEFAULT_GUEST_ORDER_LIMIT: usize = 5;
const DEFAULT_GUEST_ORDER_WINDOW: Duration = Duration::hours(1);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Payment provider REST endpoint and credentials.
    pub payment: PaymentApiConfig,
    /// Guest orders allowed per rolling window, per normalized email.
    pub guest_order_limit: usize,
    /// Width of the guest rate-limit window.
    pub guest_order_window: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct PaymentApiConfig {
    /// Base URL of the provider API, e.g. "https://api.payprovider.example/v2"
    pub api_url: String,
    pub api_key: Secret<String>,
    /// Where the provider redirects customers after they complete (or abandon) a payment.
    pub return_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BOS_HOST.to_string(),
            port: DEFAULT_BOS_PORT,
            database_url: String::default(),
            payment: PaymentApiConfig::default(),
            guest_order_limit: DEFAULT_GUEST_ORDER_LIMIT,
            guest_order_window: DEFAULT_GUEST_ORDER_WINDOW,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BOS_HOST").ok().unwrap_or_else(|| DEFAULT_BOS_HOST.into());
        let port = env::var("BOS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BOS_PORT. {e} Using the default, {DEFAULT_BOS_PORT}, instead."
                    );
                    DEFAULT_BOS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BOS_PORT);
        let database_url = env::var("BOS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BOS_DATABASE_URL is not set. Please set it to the URL for the store database.");
            String::default()
        });
        let payment = PaymentApiConfig::from_env_or_default();
        let guest_order_limit = env::var("BOS_GUEST_ORDER_LIMIT")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| {
                        error!("🪛️ BOS_GUEST_ORDER_LIMIT is not a valid count ({e}). Using the default.");
                        e
                    })
                    .ok()
            })
            .unwrap_or(DEFAULT_GUEST_ORDER_LIMIT);
        let guest_order_window = env::var("BOS_GUEST_ORDER_WINDOW_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| {
                        error!("🪛️ BOS_GUEST_ORDER_WINDOW_SECS is not a valid number of seconds ({e}). Using the default.");
                        e
                    })
                    .ok()
            })
            .map(Duration::seconds)
            .unwrap_or(DEFAULT_GUEST_ORDER_WINDOW);
        Self { host, port, database_url, payment, guest_order_limit, guest_order_window }
    }
}

impl PaymentApiConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = env::var("BOS_PAYMENT_API_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BOS_PAYMENT_API_URL is not set. Payment creation will fail until it is.");
            String::default()
        });
        let api_key = env::var("BOS_PAYMENT_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ BOS_PAYMENT_API_KEY is not set. Payment creation will fail until it is.");
            String::default()
        });
        let return_url = env::var("BOS_PAYMENT_RETURN_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ BOS_PAYMENT_RETURN_URL is not set. Customers will not be redirected back to the store.");
            String::default()
        });
        Self { api_url, api_key: Secret::new(api_key), return_url }
    }
}
