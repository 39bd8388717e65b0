//! # Boba order engine public API
//!
//! The `shop_api` module exposes the programmatic API for the order engine. The API is modular,
//! so that clients can pick and choose the functionality they want; the storefront server wires
//! all of them, but an admin tool might only construct a [`slots_api::SlotApi`].
//!
//! * [`order_flow_api`] is the primary API for order creation and payment reconciliation.
//! * [`slots_api`] reads pickup-slot availability and applies administrative overrides.
//! * [`loyalty_api`] reads balances and ledger history and posts admin adjustments.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a
//! database backend that implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use boba_order_engine::{SlotApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements SlotManagement
//! let api = SlotApi::new(db);
//! let slots = api.day_availability(a_date).await?;
//! ```

pub mod loyalty_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod slots_api;
