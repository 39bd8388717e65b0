use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Order, OrderNumber, PaymentOutcome, PaymentStatus},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    helpers::{normalize_email, normalize_promo_code},
    order_objects::{NewOrderRequest, MAX_ITEM_QUANTITY},
    traits::{
        NewProviderPayment,
        OrderFlowError,
        PaymentProvider,
        PlacedOrder,
        ReconcileResult,
        ShopDatabase,
    },
};

/// `OrderFlowApi` is the primary API for handling order and payment flows: pricing and creating
/// orders, submitting them to the payment provider, and reconciling provider outcomes.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: ShopDatabase
{
    /// Submit a new order.
    ///
    /// The request is normalized (email casing, promo code casing) and sanity-checked here; the
    /// pricing, promo, slot and persistence work happens in a single atomic transaction in the
    /// backend. No price or discount supplied by a client ever reaches this function, by
    /// construction of [`NewOrderRequest`].
    pub async fn place_order(&self, mut req: NewOrderRequest) -> Result<PlacedOrder, OrderFlowError> {
        if req.items.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        if req.items.iter().any(|i| i.quantity < 1 || i.quantity > MAX_ITEM_QUANTITY) {
            return Err(OrderFlowError::InvalidQuantity(MAX_ITEM_QUANTITY));
        }
        if req.redeem_points > 0 && req.user_id.is_none() {
            return Err(OrderFlowError::GuestRedemption);
        }
        req.customer_email = normalize_email(&req.customer_email);
        req.promo_code = req.promo_code.as_deref().map(normalize_promo_code);
        let placed = self.db.create_order(req, Utc::now()).await?;
        debug!(
            "🧋📦️ Order {} created. {} item(s), total {}",
            placed.order.order_number,
            placed.items.len(),
            placed.order.total
        );
        Ok(placed)
    }

    /// Create a payment with the external provider for a freshly placed order and record the
    /// provider's payment id against it. Returns the redirect URL for the customer.
    pub async fn submit_for_payment<P: PaymentProvider>(
        &self,
        provider: &P,
        order: &Order,
        return_url: &str,
    ) -> Result<NewProviderPayment, OrderFlowError> {
        let payment = provider.create_payment(order, return_url).await?;
        self.db.attach_payment_ref(order.id, &payment.payment_ref).await?;
        debug!("🧋💸️ Order {} submitted for payment as [{}]", order.order_number, payment.payment_ref);
        Ok(payment)
    }

    /// Reconcile an externally reported payment outcome against order state.
    ///
    /// The heavy lifting (the already-terminal idempotency guard, status transitions and ledger
    /// effects) happens atomically in the backend; this method adds event hook dispatch once an
    /// outcome has durably committed.
    pub async fn reconcile(&self, payment_ref: &str, outcome: PaymentOutcome) -> Result<ReconcileResult, OrderFlowError> {
        let result = self.db.apply_payment_outcome(payment_ref, outcome, Utc::now()).await?;
        match &result {
            ReconcileResult::Applied { order } => {
                if order.payment_status == PaymentStatus::Paid {
                    info!("🧋💸️ Payment [{payment_ref}] settled. Order {} is paid", order.order_number);
                    self.call_order_paid_hook(order).await;
                } else {
                    info!("🧋💸️ Payment [{payment_ref}] failed. Order {} cancelled", order.order_number);
                    self.call_order_annulled_hook(order).await;
                }
            },
            ReconcileResult::AlreadyFinal { order } => {
                debug!(
                    "🧋💸️ Duplicate outcome for [{payment_ref}] ignored; order {} is already {}",
                    order.order_number, order.payment_status
                );
            },
            ReconcileResult::Ignored { order } => {
                debug!("🧋💸️ Outcome for [{payment_ref}] is not actionable; order {} unchanged", order.order_number);
            },
        }
        Ok(result)
    }

    /// Fetch the payment's current state from the provider by id and reconcile with that.
    /// Webhook handlers call this; the status string a webhook payload may carry is never used.
    pub async fn reconcile_with_provider<P: PaymentProvider>(
        &self,
        provider: &P,
        payment_ref: &str,
    ) -> Result<ReconcileResult, OrderFlowError> {
        let payment = provider.fetch_payment(payment_ref).await?;
        trace!("🧋💸️ Provider reports [{payment_ref}] as '{}'", payment.status);
        self.reconcile(&payment.payment_ref, payment.outcome()).await
    }

    /// Advance an order's fulfilment status one step (Paid → Preparing → Ready → Completed).
    pub async fn advance_fulfilment(&self, order_number: &OrderNumber) -> Result<Order, OrderFlowError> {
        let order = self.db.advance_fulfilment(order_number, Utc::now()).await?;
        info!("🧋📦️ Order {} is now {}", order.order_number, order.fulfilment_status);
        Ok(order)
    }

    /// Fetch an order and its line snapshots.
    pub async fn order_by_number(&self, order_number: &OrderNumber) -> Result<Option<PlacedOrder>, OrderFlowError> {
        self.db.fetch_order_by_number(order_number).await
    }

    /// All orders attributed to a user, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🧋📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🧋📦️ Notifying order annulled hook subscribers");
            let event = OrderAnnulledEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }
}
