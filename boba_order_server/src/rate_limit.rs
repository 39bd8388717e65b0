//! Guest order throughput limiting.
//!
//! A shared, time-windowed counter keyed by normalized email. This is in-memory and per-process:
//! it blunts drive-by abuse on a single instance, but it is *not* a durability guarantee and not
//! a substitute for the per-order idempotency guard in reconciliation. Running multiple
//! instances divides its effectiveness accordingly; swap the map for an external counter store
//! with expiry if that matters to your deployment.
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use boba_order_engine::helpers::normalize_email;
use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::errors::ServerError;

pub struct GuestOrderLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl GuestOrderLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window, hits: Mutex::new(HashMap::new()) }
    }

    /// Record an order attempt for `email` and fail if the rolling window is already full.
    /// Rejected attempts are not recorded; a guest hammering the endpoint does not extend their
    /// own lockout.
    pub fn check(&self, email: &str) -> Result<(), ServerError> {
        self.check_at(email, Utc::now())
    }

    fn check_at(&self, email: &str, now: DateTime<Utc>) -> Result<(), ServerError> {
        let key = normalize_email(email);
        let mut hits = self.hits.lock().expect("rate limiter mutex poisoned");
        let entry = hits.entry(key).or_default();
        let horizon = now - self.window;
        while entry.front().is_some_and(|t| *t <= horizon) {
            entry.pop_front();
        }
        if entry.len() >= self.limit {
            debug!("💻️ Guest order rate limit hit for {email}");
            return Err(ServerError::RateLimited(format!(
                "At most {} orders per {} minutes are accepted per email address",
                self.limit,
                self.window.num_minutes()
            )));
        }
        entry.push_back(now);
        Ok(())
    }
}
