use anyhow::{Context, Result};
use std::env;

/// How long a QR stays payable before the order is dropped.
pub const ORDER_TIMEOUT_SECS: i64 = 600;

/// Interval of the background sweep that deletes timed-out orders.
pub const SWEEP_INTERVAL_SECS: u64 = 20;

/// Points awarded per day when a purchase is redeemed into a free account.
pub const POINTS_PER_REDEEMED_DAY: i64 = 12;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_chat_id: i64,
    pub qris_api_url: String,
    pub qris_api_key: String,
    pub qris_merchant_code: String,
    pub welcome_image_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").context("BOT_TOKEN is not set")?;
        let admin_chat_id = env::var("ADMIN_CHAT_ID")
            .context("ADMIN_CHAT_ID is not set")?
            .parse::<i64>()
            .context("ADMIN_CHAT_ID must be a numeric chat id")?;
        let qris_api_url = env::var("QRIS_API_URL").context("QRIS_API_URL is not set")?;
        let qris_api_key = env::var("QRIS_API_KEY").context("QRIS_API_KEY is not set")?;
        let qris_merchant_code =
            env::var("QRIS_MERCHANT_CODE").context("QRIS_MERCHANT_CODE is not set")?;
        let welcome_image_url = env::var("WELCOME_IMAGE_URL").ok().filter(|v| !v.is_empty());

        Ok(Self {
            bot_token,
            admin_chat_id,
            qris_api_url,
            qris_api_key,
            qris_merchant_code,
            welcome_image_url,
        })
    }
}
