//! Boba Order Engine
//!
//! The order lifecycle and loyalty engine behind the bubble-tea storefront. This library holds
//! the core logic for pricing and creating orders, allocating pickup time slots, reconciling
//! payment-provider outcomes and maintaining the loyalty points ledger. It is presentation- and
//! provider-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`traits`] and the SQLite backend). You should never
//!    need to access the database directly; use the public API instead. The exception is the
//!    data types used in the database, defined in [`db_types`], which are public.
//! 2. The engine public API ([`OrderFlowApi`], [`SlotApi`], [`LoyaltyApi`]). Backends implement
//!    the traits in [`traits`] in order to serve these APIs.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted
//! when certain actions occur within the engine — for example, when a payment settles, an
//! `OrderPaidEvent` is emitted. See [`events`].
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
mod shop_api;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits;
pub use shop_api::{loyalty_api::LoyaltyApi, order_flow_api::OrderFlowApi, order_objects, slots_api::SlotApi};
