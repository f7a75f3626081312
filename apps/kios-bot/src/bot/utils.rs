use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode};
use tracing::warn;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Send a photo with an HTML caption; if the photo is refused (bad URL, too
/// large, whatever Telegram dislikes today) deliver the same body as text.
pub async fn send_with_image(
    bot: &Bot,
    chat_id: ChatId,
    image_url: Option<&str>,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) {
    if let Some(url) = image_url {
        if let Ok(parsed) = url.parse() {
            let sent = bot
                .send_photo(chat_id, InputFile::url(parsed))
                .caption(text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard.clone())
                .await;
            match sent {
                Ok(_) => return,
                Err(e) => warn!("Photo send failed, falling back to text: {}", e),
            }
        }
    }

    if let Err(e) = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await
    {
        warn!("Text fallback send failed: {}", e);
    }
}

/// Edit in place without knowing whether the message carries a photo: caption
/// edit first, then text edit, then a brand-new message.
pub async fn edit_message_smart(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    image_url: Option<&str>,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) {
    let caption_edit = bot
        .edit_message_caption(chat_id, message_id)
        .caption(text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard.clone())
        .await;
    if caption_edit.is_ok() {
        return;
    }

    let text_edit = bot
        .edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard.clone())
        .await;
    if text_edit.is_ok() {
        return;
    }

    send_with_image(bot, chat_id, image_url, text, keyboard).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escaping() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn remaining_time_formats() {
        assert_eq!(format_remaining(599), "9m 59s");
        assert_eq!(format_remaining(60), "1m 0s");
        assert_eq!(format_remaining(0), "0m 0s");
        assert_eq!(format_remaining(-5), "0m 0s");
    }
}
