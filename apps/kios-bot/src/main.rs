use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use teloxide::prelude::*;

mod bot;
mod config;
mod credentials;
pub mod models;
mod payment;
mod pricing;
mod services;
mod state;

use crate::config::{Config, SWEEP_INTERVAL_SECS};
use crate::payment::{PaymentGateway, QrisGateway};
use crate::services::{AdminNotifier, LicenseService, OrderService};
use crate::state::AppState;
use kios_db::repositories::{
    LicenseRepository, OrderRepository, PointsRepository, SessionRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    log::info!("Starting KIOS storefront bot...");

    let config = Config::from_env()?;
    let pool = kios_db::db::init_db().await?;

    let sessions = SessionRepository::new(pool.clone());
    let points = PointsRepository::new(pool.clone());
    let licenses = LicenseRepository::new(pool.clone());
    let order_repo = OrderRepository::new(pool);

    let gateway: Arc<dyn PaymentGateway> = Arc::new(QrisGateway::new(
        config.qris_api_url.clone(),
        config.qris_api_key.clone(),
        config.qris_merchant_code.clone(),
    ));

    let orders = OrderService::new(order_repo, gateway);
    let license_service = LicenseService::new(licenses, points.clone());

    let bot = Bot::new(config.bot_token.clone());
    let notifier = AdminNotifier::new(bot.clone(), config.admin_chat_id);

    let state = AppState {
        config,
        sessions,
        points,
        orders: orders.clone(),
        licenses: license_service,
        notifier,
    };

    // Timed-out orders are deleted in the background so a buyer who never
    // presses "Check Payment" does not leave rows pending forever.
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            orders.sweep_expired().await;
        }
    });

    let (_tx, rx) = tokio::sync::broadcast::channel(1);
    bot::run_bot(bot, rx, state).await;

    Ok(())
}
