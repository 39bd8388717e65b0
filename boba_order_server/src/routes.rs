//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the
//! current thread will stop that worker from processing new requests. Any long, non-cpu-bound
//! operation (I/O, database queries, calls to the payment provider) must be awaited, never
//! blocked on.
use std::str::FromStr;

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use boba_order_engine::{
    db_types::OrderNumber,
    helpers::normalize_email,
    order_objects::NewOrderRequest,
    traits::NewSlotOverride,
    LoyaltyApi,
    OrderFlowApi,
    SlotApi,
    SqliteDatabase,
};
use chrono::NaiveDate;
use log::*;
use serde_json::json;

use crate::{
    auth::AuthInfo,
    config::ServerConfig,
    data_objects::{
        BulkDisableRequest,
        BulkEnableRequest,
        JsonResponse,
        LoyaltyAdjustmentRequest,
        OrderCreatedResponse,
        OrderLookupParams,
        OrderRequest,
        PaymentWebhookPayload,
    },
    errors::ServerError,
    integrations::PaymentApi,
    rate_limit::GuestOrderLimiter,
};

// ----------------------------------------------   Health  ----------------------------------------------------

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Orders  ----------------------------------------------------

/// Route handler for order creation.
///
/// The body carries catalog references and contact details only; every price is recomputed
/// server-side, the promo code and slot are validated transactionally, and guests are subject
/// to the per-email rate limiter before anything is written. On success a payment is created
/// with the provider and the checkout redirect URL is returned alongside the computed totals.
#[post("/orders")]
pub async fn create_order(
    auth: AuthInfo,
    body: web::Json<OrderRequest>,
    orders_api: web::Data<OrderFlowApi<SqliteDatabase>>,
    provider: web::Data<PaymentApi>,
    limiter: web::Data<GuestOrderLimiter>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    debug!("💻️ POST order with {} item(s) from {}", body.items.len(), body.email);
    if auth.user_id.is_none() {
        limiter.check(&body.email)?;
    }
    let req = NewOrderRequest {
        items: body.items,
        promo_code: body.promo_code,
        pickup_at: body.pickup_at,
        customer_email: body.email,
        user_id: auth.user_id,
        redeem_points: body.redeem_points,
    };
    let placed = orders_api.place_order(req).await?;
    let payment = orders_api
        .submit_for_payment(provider.get_ref(), &placed.order, &config.payment.return_url)
        .await
        .map_err(|e| {
            error!("💻️ Order {} was created but payment submission failed. {e}", placed.order.order_number);
            e
        })?;
    let response = OrderCreatedResponse::from_placed_order(&placed, payment.redirect_url);
    Ok(HttpResponse::Ok().json(response))
}

/// Route handler for order status lookups.
///
/// Admins can fetch any order. Authenticated customers can fetch their own. Guest orders are
/// fetched with an `email` query parameter matching the order's contact address.
#[get("/orders/{order_number}")]
pub async fn order_by_number(
    auth: AuthInfo,
    path: web::Path<String>,
    params: web::Query<OrderLookupParams>,
    orders_api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    debug!("💻️ GET order {order_number}");
    let placed = orders_api
        .order_by_number(&order_number)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Order {order_number} does not exist")))?;
    let authorized = auth.is_admin() ||
        (placed.order.user_id.is_some() && placed.order.user_id == auth.user_id) ||
        (placed.order.user_id.is_none() &&
            params.email.as_deref().map(normalize_email).as_deref() == Some(placed.order.customer_email.as_str()));
    if !authorized {
        return Err(ServerError::InsufficientPermissions("This order belongs to someone else".to_string()));
    }
    Ok(HttpResponse::Ok().json(placed))
}

// ----------------------------------------------   Slots  ----------------------------------------------------

/// Route handler for slot availability.
///
/// Best-effort by design: if override metadata is unreachable the response degrades to default
/// capacities rather than failing the page. Order creation re-validates authoritatively.
#[get("/slots/{date}")]
pub async fn slots_for_date(
    path: web::Path<String>,
    slot_api: web::Data<SlotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let date = NaiveDate::from_str(&path.into_inner())
        .map_err(|e| ServerError::BadRequest(format!("Invalid date: {e}")))?;
    let slots = slot_api.day_availability(date).await?;
    Ok(HttpResponse::Ok().json(json!({ "date": date, "slots": slots })))
}

// ----------------------------------------------   Webhook  ----------------------------------------------------

/// Route handler for the payment provider's webhook.
///
/// The payload carries an opaque payment id and nothing else we trust. The handler fetches the
/// payment's current state from the provider and feeds it through the reconciliation state
/// machine; duplicate deliveries are absorbed by the already-terminal guard and acknowledged
/// with a 200 so the provider stops retrying.
#[post("/webhook/payment")]
pub async fn payment_webhook(
    body: web::Json<PaymentWebhookPayload>,
    orders_api: web::Data<OrderFlowApi<SqliteDatabase>>,
    provider: web::Data<PaymentApi>,
) -> Result<HttpResponse, ServerError> {
    let payment_ref = body.into_inner().id;
    debug!("💻️ Payment webhook for [{payment_ref}]");
    let result = orders_api.reconcile_with_provider(provider.get_ref(), &payment_ref).await?;
    let order = result.order();
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!(
        "Order {} is {}/{}",
        order.order_number, order.payment_status, order.fulfilment_status
    ))))
}

// ----------------------------------------------   Admin: slots  -----------------------------------------------

/// Set (or replace) the override for a single slot.
#[put("/api/slots/override")]
pub async fn set_slot_override(
    auth: AuthInfo,
    body: web::Json<NewSlotOverride>,
    slot_api: web::Data<SlotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    auth.require_admin()?;
    let stored = slot_api.set_override(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stored))
}

/// Clear the override for a single slot. Idempotent.
#[delete("/api/slots/override/{date}/{time}")]
pub async fn clear_slot_override(
    auth: AuthInfo,
    path: web::Path<(String, String)>,
    slot_api: web::Data<SlotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    auth.require_admin()?;
    let (date, time) = path.into_inner();
    let date = NaiveDate::from_str(&date).map_err(|e| ServerError::BadRequest(format!("Invalid date: {e}")))?;
    slot_api.clear_override(date, &time).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Override cleared for {date} {time}"))))
}

/// Disable a list of slots for a date, e.g. to absorb an unexpected rush. Idempotent.
#[post("/api/slots/disable")]
pub async fn disable_slots(
    auth: AuthInfo,
    body: web::Json<BulkDisableRequest>,
    slot_api: web::Data<SlotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    auth.require_admin()?;
    let req = body.into_inner();
    let n = slot_api.bulk_disable(req.date, &req.times, req.reason.as_deref()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{n} slot(s) disabled on {}", req.date))))
}

/// Clear all disabling overrides for a date. Idempotent.
#[post("/api/slots/enable")]
pub async fn enable_slots(
    auth: AuthInfo,
    body: web::Json<BulkEnableRequest>,
    slot_api: web::Data<SlotApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    auth.require_admin()?;
    let req = body.into_inner();
    let n = slot_api.bulk_enable(req.date).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{n} slot(s) re-enabled on {}", req.date))))
}

// ----------------------------------------------   Admin: loyalty  ---------------------------------------------

/// Post a free-form signed point adjustment to a user's ledger.
#[post("/api/loyalty/adjust")]
pub async fn adjust_loyalty(
    auth: AuthInfo,
    body: web::Json<LoyaltyAdjustmentRequest>,
    loyalty_api: web::Data<LoyaltyApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    auth.require_admin()?;
    let req = body.into_inner();
    let description = req.description.unwrap_or_else(|| "Manual adjustment".to_string());
    let account = loyalty_api.adjust(req.user_id, req.delta, &description).await?;
    Ok(HttpResponse::Ok().json(account))
}

/// Balance, tier and ledger history for a user.
#[get("/api/loyalty/{user_id}")]
pub async fn loyalty_account(
    auth: AuthInfo,
    path: web::Path<i64>,
    loyalty_api: web::Data<LoyaltyApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    auth.require_admin()?;
    let user_id = path.into_inner();
    let account = loyalty_api.account(user_id).await?;
    let history = loyalty_api.history(user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "account": account, "history": history })))
}

// ----------------------------------------------   Admin: fulfilment  ------------------------------------------

/// Advance an order one step along the fulfilment flow (Paid → Preparing → Ready → Completed).
#[post("/api/orders/{order_number}/advance")]
pub async fn advance_order(
    auth: AuthInfo,
    path: web::Path<String>,
    orders_api: web::Data<OrderFlowApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    auth.require_admin()?;
    let order_number = OrderNumber::from(path.into_inner());
    let order = orders_api.advance_fulfilment(&order_number).await?;
    Ok(HttpResponse::Ok().json(order))
}
