use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::error;

/// Pushes settlement summaries to the operator's chat. Delivery failures are
/// logged and swallowed; admin visibility never blocks a sale.
#[derive(Clone)]
pub struct AdminNotifier {
    bot: Bot,
    admin_chat_id: ChatId,
}

impl AdminNotifier {
    pub fn new(bot: Bot, admin_chat_id: i64) -> Self {
        Self {
            bot,
            admin_chat_id: ChatId(admin_chat_id),
        }
    }

    pub async fn notify(&self, text: &str) {
        if let Err(e) = self
            .bot
            .send_message(self.admin_chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
        {
            error!("Failed to notify admin: {}", e);
        }
    }
}
