//! # Boba order server
//!
//! The HTTP face of the boba order engine. It is responsible for:
//! * accepting order-creation requests from the storefront and pricing them through the engine,
//! * serving pickup-slot availability,
//! * receiving payment-provider webhooks and reconciling them against order state,
//! * the admin surface for slot overrides and loyalty adjustments.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Identity
//! Session handling lives upstream; an identity-aware proxy forwards `X-User-Id` and
//! `X-Shop-Role` headers that this server treats as authenticated fact. Requests without them
//! are guest traffic.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod rate_limit;
pub mod routes;
pub mod server;
