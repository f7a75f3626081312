use kios_db::models::order::KeyType;
use kios_db::models::session::{
    ExtendCredentialsData, ExtendDurationData, ManualInputData, MismatchOutcome, Session,
    SessionState,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::{error, info};

use crate::bot::keyboards::{extend_duration_keyboard, keytype_keyboard, main_menu, payment_keyboard};
use crate::bot::utils::{escape_html, format_remaining, send_with_image};
use crate::config::ORDER_TIMEOUT_SECS;
use crate::credentials;
use crate::pricing::format_rupiah;
use crate::AppState;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        return Ok(());
    };
    info!("Received message from {}: {:?}", chat_id, text);

    match text {
        t if t.starts_with("/start") => {
            if let Err(e) = state.sessions.clear(chat_id.0).await {
                error!("Failed to reset session on /start: {:?}", e);
            }
            let points = match state.points.get_or_create(chat_id.0).await {
                Ok(b) => b.points,
                Err(e) => {
                    error!("Failed to load points on /start: {:?}", e);
                    0
                }
            };
            let name = msg
                .from
                .as_ref()
                .map(|u| u.full_name())
                .unwrap_or_else(|| "there".to_string());
            let welcome = format!(
                "👋 <b>Welcome, {}!</b>\n\n\
                This is the KIOS account store.\n\
                ⭐ Your points: <b>{}</b>\n\n\
                Pick an option below to get started.",
                escape_html(&name),
                points
            );
            send_with_image(
                &bot,
                chat_id,
                state.config.welcome_image_url.as_deref(),
                &welcome,
                main_menu(),
            )
            .await;
        }
        "/menu" => {
            let _ = bot
                .send_message(chat_id, "📋 <b>Main Menu</b>\n\nWhat would you like to do?")
                .parse_mode(ParseMode::Html)
                .reply_markup(main_menu())
                .await;
        }
        "/points" => {
            let points = match state.points.get_or_create(chat_id.0).await {
                Ok(b) => b.points,
                Err(e) => {
                    error!("Failed to load points: {:?}", e);
                    let _ = bot
                        .send_message(chat_id, "❌ An error occurred. Please use /start.")
                        .await;
                    return Ok(());
                }
            };
            let _ = bot
                .send_message(
                    chat_id,
                    format!("⭐ <b>Your Points</b>\n\nBalance: <b>{}</b> points", points),
                )
                .parse_mode(ParseMode::Html)
                .reply_markup(main_menu())
                .await;
        }
        _ => {
            let session = match state.sessions.get(chat_id.0).await {
                Ok(s) => s,
                Err(e) => {
                    error!("Failed to load session: {:?}", e);
                    return Ok(());
                }
            };
            let Some(session) = session else {
                // No active flow; stray text is ignored.
                return Ok(());
            };
            match session.state {
                SessionState::WaitingManualInput => {
                    handle_manual_input(&bot, chat_id, &state, &session, text).await;
                }
                SessionState::WaitingExtendCredentials => {
                    handle_extend_credentials(&bot, chat_id, &state, &session, text).await;
                }
                SessionState::WaitingExtendDuration | SessionState::WaitingRedeemGame => {
                    // These steps advance by button press, not text.
                    let _ = bot
                        .send_message(chat_id, "Please use the buttons above to continue.")
                        .await;
                }
            }
        }
    }

    Ok(())
}

async fn handle_manual_input(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    session: &Session,
    text: &str,
) {
    let data: ManualInputData = match session.payload() {
        Ok(d) => d,
        Err(e) => {
            error!("Corrupt manual-input session payload: {:?}", e);
            let _ = state.sessions.clear(chat_id.0).await;
            let _ = bot
                .send_message(chat_id, "❌ An error occurred. Please use /start.")
                .await;
            return;
        }
    };

    let Some(creds) = credentials::parse_manual(text) else {
        let _ = bot
            .send_message(
                chat_id,
                "❌ <b>Invalid format.</b>\n\n\
                Send your credentials as <code>/username-password</code>, \
                for example <code>/alice-secret</code>.",
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keytype_keyboard(data.variant, data.duration_days))
            .await;
        return;
    };

    match state.licenses.username_taken(data.variant, &creds.username).await {
        Ok(true) => {
            let _ = bot
                .send_message(
                    chat_id,
                    format!(
                        "❌ Username <b>{}</b> is already taken. Try another one.",
                        escape_html(&creds.username)
                    ),
                )
                .parse_mode(ParseMode::Html)
                .await;
            return;
        }
        Ok(false) => {}
        Err(e) => {
            error!("Username check failed: {:?}", e);
            let _ = bot
                .send_message(chat_id, "❌ An error occurred. Please use /start.")
                .await;
            return;
        }
    }

    let amount = match crate::pricing::price_for(data.duration_days) {
        Some(a) => a,
        None => {
            error!("Session held an unpriced duration: {}", data.duration_days);
            let _ = state.sessions.clear(chat_id.0).await;
            let _ = bot
                .send_message(chat_id, "❌ An error occurred. Please use /start.")
                .await;
            return;
        }
    };

    match state
        .orders
        .create(
            chat_id.0,
            data.variant,
            data.duration_days,
            amount,
            KeyType::Manual,
            Some(&creds.username),
            Some(&creds.password),
        )
        .await
    {
        Ok((order, deposit)) => {
            let _ = state.sessions.clear(chat_id.0).await;
            let body = format!(
                "🧾 <b>Order {}</b>\n\n\
                🎮 Game: <b>{}</b>\n\
                👤 Username: <b>{}</b>\n\
                ⏱ Duration: <b>{} days</b>\n\
                💰 Amount: <b>{}</b>\n\n\
                Scan the QR to pay. The code expires in {}.",
                escape_html(&order.order_id),
                data.variant.display_name(),
                escape_html(&creds.username),
                data.duration_days,
                format_rupiah(amount),
                format_remaining(ORDER_TIMEOUT_SECS),
            );
            send_with_image(bot, chat_id, Some(&deposit.qr_url), &body, payment_keyboard(false))
                .await;
        }
        Err(e) => {
            error!("Payment creation failed: {:?}", e);
            let _ = bot
                .send_message(
                    chat_id,
                    "❌ Payment creation failed. Please try again in a moment.",
                )
                .reply_markup(keytype_keyboard(data.variant, data.duration_days))
                .await;
        }
    }
}

async fn handle_extend_credentials(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    session: &Session,
    text: &str,
) {
    let data: ExtendCredentialsData = match session.payload() {
        Ok(d) => d,
        Err(e) => {
            error!("Corrupt extend session payload: {:?}", e);
            let _ = state.sessions.clear(chat_id.0).await;
            let _ = bot
                .send_message(chat_id, "❌ An error occurred. Please use /start.")
                .await;
            return;
        }
    };

    let Some(creds) = credentials::parse_manual(text) else {
        // Format errors do not count as mismatches.
        let _ = bot
            .send_message(
                chat_id,
                "❌ <b>Invalid format.</b>\n\n\
                Send the account as <code>/username-password</code>.",
            )
            .parse_mode(ParseMode::Html)
            .await;
        return;
    };

    let found = match state
        .licenses
        .find_license(data.variant, &creds.username, &creds.password)
        .await
    {
        Ok(f) => f.is_some(),
        Err(e) => {
            error!("Credential lookup failed: {:?}", e);
            let _ = bot
                .send_message(chat_id, "❌ An error occurred. Please use /start.")
                .await;
            return;
        }
    };

    if !found {
        match session.record_mismatch() {
            MismatchOutcome::Retry(strikes) => {
                if let Err(e) = state.sessions.set_error_count(chat_id.0, strikes).await {
                    error!("Failed to persist strike count: {:?}", e);
                }
                let _ = bot
                    .send_message(
                        chat_id,
                        "❌ Account not found. Check the username and password and try again.",
                    )
                    .await;
            }
            MismatchOutcome::Reset => {
                let _ = state.sessions.clear(chat_id.0).await;
                let _ = bot
                    .send_message(
                        chat_id,
                        "❌ Too many failed attempts. Use /start to begin again.",
                    )
                    .reply_markup(main_menu())
                    .await;
            }
        }
        return;
    }

    let next = ExtendDurationData {
        variant: data.variant,
        username: creds.username.clone(),
        password: creds.password.clone(),
    };
    if let Err(e) = state
        .sessions
        .set(chat_id.0, SessionState::WaitingExtendDuration, &next)
        .await
    {
        error!("Failed to advance extend session: {:?}", e);
        let _ = bot
            .send_message(chat_id, "❌ An error occurred. Please use /start.")
            .await;
        return;
    }

    let _ = bot
        .send_message(
            chat_id,
            format!(
                "✅ Account <b>{}</b> verified.\n\nHow long do you want to extend it?",
                escape_html(&creds.username)
            ),
        )
        .parse_mode(ParseMode::Html)
        .reply_markup(extend_duration_keyboard())
        .await;
}
