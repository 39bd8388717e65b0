use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use boba_order_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    LoyaltyApi,
    OrderFlowApi,
    SlotApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::PaymentApi,
    rate_limit::GuestOrderLimiter,
    routes::{
        adjust_loyalty,
        advance_order,
        clear_slot_override,
        create_order,
        disable_slots,
        enable_slots,
        health,
        loyalty_account,
        order_by_number,
        payment_webhook,
        set_slot_override,
        slots_for_date,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(100, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The stock event subscribers: structured log lines on terminal order outcomes. Outbound
/// notifications (email etc.) are a separate system that tails these logs' structured twin.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev| {
        Box::pin(async move {
            info!("🎉️ Order {} is paid and heads to the barista queue", ev.order.order_number);
        })
    });
    hooks.on_order_annulled(|ev| {
        Box::pin(async move {
            info!("🫗️ Order {} was cancelled after its payment fell through", ev.order.order_number);
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let payment_api = PaymentApi::new(config.payment.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not construct the payment API client: {e}")))?;
    let limiter = web::Data::new(GuestOrderLimiter::new(config.guest_order_limit, config.guest_order_window));
    let orders_api = web::Data::new(OrderFlowApi::new(db.clone(), producers));
    let slot_api = web::Data::new(SlotApi::new(db.clone()));
    let loyalty_api = web::Data::new(LoyaltyApi::new(db));
    let payment_api = web::Data::new(payment_api);
    let config_data = web::Data::new(config.clone());
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bos::access_log"))
            .app_data(orders_api.clone())
            .app_data(slot_api.clone())
            .app_data(loyalty_api.clone())
            .app_data(payment_api.clone())
            .app_data(limiter.clone())
            .app_data(config_data.clone())
            .service(health)
            .service(create_order)
            .service(order_by_number)
            .service(slots_for_date)
            .service(payment_webhook)
            .service(set_slot_override)
            .service(clear_slot_override)
            .service(disable_slots)
            .service(enable_slots)
            .service(adjust_loyalty)
            .service(loyalty_account)
            .service(advance_order)
    })
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Server bound to {}:{}", config.host, config.port);
    Ok(srv)
}
