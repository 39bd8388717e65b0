//! # Database management and control.
//!
//! This module defines the interface contracts of the order engine database *backends*.
//!
//! ## The order pipeline
//! The [`ShopDatabase`] trait carries the write side of the system: the atomic order creation
//! transaction, payment reconciliation and fulfilment progression. Everything money- or
//! points-shaped that mutates state goes through it, inside a single database transaction per
//! call.
//!
//! ## Traits
//! * [`ShopDatabase`] defines the highest level of behaviour for backends supporting the order
//!   engine.
//! * [`OrderManagement`] defines the behaviour for querying orders and store settings.
//! * [`SlotManagement`] defines the behaviour for pickup-slot availability and administrative
//!   overrides.
//! * [`LoyaltyManagement`] defines the behaviour for the loyalty ledger and its cached balances.
//! * [`PaymentProvider`] abstracts the external payment processor (create a payment, fetch a
//!   payment's current status).
mod loyalty_management;
mod order_management;
mod payment_provider;
mod shop_database;
mod slot_management;

mod data_objects;

pub use data_objects::{NewSlotOverride, PlacedOrder, ReconcileResult};
pub use loyalty_management::{LoyaltyApiError, LoyaltyManagement};
pub use order_management::OrderManagement;
pub use payment_provider::{NewProviderPayment, PaymentProvider, PaymentProviderError, ProviderPayment};
pub use shop_database::{OrderFlowError, ShopDatabase};
pub use slot_management::SlotManagement;
