use kios_db::models::order::{KeyType, PendingOrder};
use kios_db::models::session::{
    ExtendCredentialsData, ExtendDurationData, ManualInputData, RedeemGameData, SessionState,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};
use tracing::{error, info};

use crate::bot::keyboards::{
    back_to_menu, duration_keyboard, extend_game_keyboard, game_keyboard, keytype_keyboard,
    main_menu, payment_keyboard, redeem_game_keyboard, redeem_menu,
};
use crate::bot::utils::{edit_message_smart, escape_html, format_remaining, send_with_image};
use crate::config::{ORDER_TIMEOUT_SECS, POINTS_PER_REDEEMED_DAY};
use crate::models::action::CallbackAction;
use crate::pricing::{format_rupiah, points_needed_for, price_for};
use crate::services::license_service::RedeemOutcome;
use crate::services::CheckOutcome;
use crate::AppState;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!("Received callback: {:?}", q.data);
    let callback_id = q.id.clone();

    let Some(data) = q.data.as_deref() else {
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };
    let Some(action) = CallbackAction::parse(data) else {
        let _ = bot
            .answer_callback_query(callback_id)
            .text("Unknown action")
            .show_alert(true)
            .await;
        return Ok(());
    };
    let Some(msg) = q.message else {
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };
    let chat_id = msg.chat().id;
    let message_id = msg.id();
    let _ = bot.answer_callback_query(callback_id).await;

    let image = state.config.welcome_image_url.clone();
    let image = image.as_deref();

    match action {
        CallbackAction::MainMenu => {
            if let Err(e) = state.sessions.clear(chat_id.0).await {
                error!("Failed to clear session: {:?}", e);
            }
            let points = state
                .points
                .get_or_create(chat_id.0)
                .await
                .map(|b| b.points)
                .unwrap_or(0);
            let body = format!(
                "📋 <b>Main Menu</b>\n\n⭐ Your points: <b>{}</b>\n\nWhat would you like to do?",
                points
            );
            edit_message_smart(&bot, chat_id, message_id, image, &body, main_menu()).await;
        }

        CallbackAction::Help => {
            let body = "❓ <b>Help</b>\n\n\
                🛒 <b>Buy Account</b> creates a new game account for the duration you pick.\n\
                ⏳ <b>Extend Account</b> adds days to an account you already own.\n\
                ⭐ <b>My Points</b> shows your balance; every purchase earns points you can \
                trade for free days.\n\n\
                Payments are by QRIS. After scanning the QR, press \
                <b>Check Payment</b> to confirm.";
            edit_message_smart(&bot, chat_id, message_id, image, body, back_to_menu()).await;
        }

        CallbackAction::NewOrder => {
            edit_message_smart(
                &bot,
                chat_id,
                message_id,
                image,
                "🛒 <b>New Account</b>\n\nWhich game?",
                game_keyboard(),
            )
            .await;
        }

        CallbackAction::ChooseVariant(variant) => {
            let body = format!(
                "🎮 <b>{}</b>\n\nHow many days do you want?",
                variant.display_name()
            );
            edit_message_smart(&bot, chat_id, message_id, image, &body, duration_keyboard(variant))
                .await;
        }

        CallbackAction::ChooseDuration { variant, days } => {
            let Some(price) = price_for(days) else {
                let _ = bot
                    .send_message(chat_id, "❌ That duration is not on sale.")
                    .reply_markup(duration_keyboard(variant))
                    .await;
                return Ok(());
            };
            let body = format!(
                "🎮 <b>{}</b> for <b>{} days</b> — <b>{}</b>\n\n\
                Do you want a generated username or your own?",
                variant.display_name(),
                days,
                format_rupiah(price)
            );
            edit_message_smart(
                &bot,
                chat_id,
                message_id,
                image,
                &body,
                keytype_keyboard(variant, days),
            )
            .await;
        }

        CallbackAction::ChooseKeyType { variant, days, manual } => {
            let Some(amount) = price_for(days) else {
                let _ = bot
                    .send_message(chat_id, "❌ That duration is not on sale.")
                    .reply_markup(duration_keyboard(variant))
                    .await;
                return Ok(());
            };

            if manual {
                let payload = ManualInputData { variant, duration_days: days };
                if let Err(e) = state
                    .sessions
                    .set(chat_id.0, SessionState::WaitingManualInput, &payload)
                    .await
                {
                    error!("Failed to open manual-input session: {:?}", e);
                    let _ = bot
                        .send_message(chat_id, "❌ An error occurred. Please use /start.")
                        .await;
                    return Ok(());
                }
                let body = "✍️ <b>Your Own Username</b>\n\n\
                    Send your credentials as <code>/username-password</code>, \
                    for example <code>/alice-secret</code>.";
                edit_message_smart(&bot, chat_id, message_id, image, body, back_to_menu()).await;
                return Ok(());
            }

            match state
                .orders
                .create(chat_id.0, variant, days, amount, KeyType::Random, None, None)
                .await
            {
                Ok((order, deposit)) => {
                    let body = format!(
                        "🧾 <b>Order {}</b>\n\n\
                        🎮 Game: <b>{}</b>\n\
                        ⏱ Duration: <b>{} days</b>\n\
                        💰 Amount: <b>{}</b>\n\n\
                        Scan the QR to pay. The code expires in {}.",
                        escape_html(&order.order_id),
                        variant.display_name(),
                        days,
                        format_rupiah(amount),
                        format_remaining(ORDER_TIMEOUT_SECS),
                    );
                    send_with_image(&bot, chat_id, Some(&deposit.qr_url), &body, payment_keyboard(false))
                        .await;
                }
                Err(e) => {
                    error!("Payment creation failed: {:?}", e);
                    let _ = bot
                        .send_message(
                            chat_id,
                            "❌ Payment creation failed. Please try again in a moment.",
                        )
                        .reply_markup(keytype_keyboard(variant, days))
                        .await;
                }
            }
        }

        CallbackAction::ExtendUser => {
            edit_message_smart(
                &bot,
                chat_id,
                message_id,
                image,
                "⏳ <b>Extend Account</b>\n\nWhich game is the account for?",
                extend_game_keyboard(),
            )
            .await;
        }

        CallbackAction::ExtendType(variant) => {
            let payload = ExtendCredentialsData { variant };
            if let Err(e) = state
                .sessions
                .set(chat_id.0, SessionState::WaitingExtendCredentials, &payload)
                .await
            {
                error!("Failed to open extend session: {:?}", e);
                let _ = bot
                    .send_message(chat_id, "❌ An error occurred. Please use /start.")
                    .await;
                return Ok(());
            }
            let body = format!(
                "⏳ <b>{}</b>\n\n\
                Send the account to extend as <code>/username-password</code>.",
                variant.display_name()
            );
            edit_message_smart(&bot, chat_id, message_id, image, &body, back_to_menu()).await;
        }

        CallbackAction::ExtendDuration { days } => {
            let session = match state.sessions.get(chat_id.0).await {
                Ok(Some(s)) if s.state == SessionState::WaitingExtendDuration => s,
                Ok(_) => {
                    let _ = bot
                        .send_message(chat_id, "❌ No active extend flow. Use /start.")
                        .reply_markup(main_menu())
                        .await;
                    return Ok(());
                }
                Err(e) => {
                    error!("Failed to load session: {:?}", e);
                    return Ok(());
                }
            };
            let data: ExtendDurationData = match session.payload() {
                Ok(d) => d,
                Err(e) => {
                    error!("Corrupt extend-duration payload: {:?}", e);
                    let _ = state.sessions.clear(chat_id.0).await;
                    return Ok(());
                }
            };
            let Some(amount) = price_for(days) else {
                let _ = bot
                    .send_message(chat_id, "❌ That duration is not on sale.")
                    .reply_markup(crate::bot::keyboards::extend_duration_keyboard())
                    .await;
                return Ok(());
            };

            match state
                .orders
                .create(
                    chat_id.0,
                    data.variant,
                    days,
                    amount,
                    KeyType::Extend,
                    Some(&data.username),
                    Some(&data.password),
                )
                .await
            {
                Ok((order, deposit)) => {
                    let _ = state.sessions.clear(chat_id.0).await;
                    let body = format!(
                        "🧾 <b>Order {}</b>\n\n\
                        🎮 Game: <b>{}</b>\n\
                        👤 Account: <b>{}</b>\n\
                        ⏱ Extension: <b>{} days</b>\n\
                        💰 Amount: <b>{}</b>\n\n\
                        Scan the QR to pay. The code expires in {}.",
                        escape_html(&order.order_id),
                        data.variant.display_name(),
                        escape_html(&data.username),
                        days,
                        format_rupiah(amount),
                        format_remaining(ORDER_TIMEOUT_SECS),
                    );
                    send_with_image(&bot, chat_id, Some(&deposit.qr_url), &body, payment_keyboard(true))
                        .await;
                }
                Err(e) => {
                    error!("Payment creation failed: {:?}", e);
                    let _ = bot
                        .send_message(
                            chat_id,
                            "❌ Payment creation failed. Please try again in a moment.",
                        )
                        .reply_markup(crate::bot::keyboards::extend_duration_keyboard())
                        .await;
                }
            }
        }

        CallbackAction::RedeemPoints => {
            let points = state
                .points
                .get_or_create(chat_id.0)
                .await
                .map(|b| b.points)
                .unwrap_or(0);
            let body = format!(
                "⭐ <b>Your Points</b>\n\n\
                Balance: <b>{}</b> points\n\
                Rate: <b>{}</b> points per free day\n\n\
                Pick a duration to redeem:",
                points, POINTS_PER_REDEEMED_DAY
            );
            edit_message_smart(&bot, chat_id, message_id, image, &body, redeem_menu()).await;
        }

        CallbackAction::RedeemDuration { days } => {
            let needed = points_needed_for(days);
            let balance = match state.points.get_or_create(chat_id.0).await {
                Ok(b) => b,
                Err(e) => {
                    error!("Failed to load points: {:?}", e);
                    return Ok(());
                }
            };
            if !balance.can_afford(needed) {
                let body = format!(
                    "❌ <b>Not enough points.</b>\n\n\
                    You need <b>{}</b> but have <b>{}</b> — {} short.",
                    needed,
                    balance.points,
                    needed - balance.points
                );
                edit_message_smart(&bot, chat_id, message_id, image, &body, redeem_menu()).await;
                return Ok(());
            }
            let payload = RedeemGameData { duration_days: days, points_needed: needed };
            if let Err(e) = state
                .sessions
                .set(chat_id.0, SessionState::WaitingRedeemGame, &payload)
                .await
            {
                error!("Failed to open redeem session: {:?}", e);
                return Ok(());
            }
            let body = format!(
                "⭐ Redeeming <b>{} days</b> for <b>{}</b> points.\n\nWhich game?",
                days, needed
            );
            edit_message_smart(&bot, chat_id, message_id, image, &body, redeem_game_keyboard())
                .await;
        }

        CallbackAction::RedeemGame(variant) => {
            let session = match state.sessions.get(chat_id.0).await {
                Ok(Some(s)) if s.state == SessionState::WaitingRedeemGame => s,
                Ok(_) => {
                    let _ = bot
                        .send_message(chat_id, "❌ No active redemption. Use /start.")
                        .reply_markup(main_menu())
                        .await;
                    return Ok(());
                }
                Err(e) => {
                    error!("Failed to load session: {:?}", e);
                    return Ok(());
                }
            };
            let data: RedeemGameData = match session.payload() {
                Ok(d) => d,
                Err(e) => {
                    error!("Corrupt redeem payload: {:?}", e);
                    let _ = state.sessions.clear(chat_id.0).await;
                    return Ok(());
                }
            };

            match state
                .licenses
                .redeem(chat_id.0, variant, data.duration_days, data.points_needed)
                .await
            {
                Ok(RedeemOutcome::Redeemed { credentials, expires_at, remaining_points }) => {
                    let _ = state.sessions.clear(chat_id.0).await;
                    let body = format!(
                        "🎉 <b>Redemption complete!</b>\n\n\
                        🎮 Game: <b>{}</b>\n\
                        👤 Username: <code>{}</code>\n\
                        🔑 Password: <code>{}</code>\n\
                        📅 Expires: <b>{}</b>\n\
                        ⭐ Points left: <b>{}</b>",
                        variant.display_name(),
                        escape_html(&credentials.username),
                        escape_html(&credentials.password),
                        expires_at.format("%Y-%m-%d"),
                        remaining_points
                    );
                    let _ = bot
                        .send_message(chat_id, body)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(back_to_menu())
                        .await;

                    state
                        .notifier
                        .notify(&format!(
                            "⭐ <b>Redemption</b>\n\
                            Chat: <code>{}</code>\n\
                            Game: {}\n\
                            Username: <code>{}</code>\n\
                            Days: {}\n\
                            Points spent: {}",
                            chat_id.0,
                            variant.display_name(),
                            escape_html(&credentials.username),
                            data.duration_days,
                            data.points_needed
                        ))
                        .await;
                }
                Ok(RedeemOutcome::InsufficientPoints { have, needed }) => {
                    let body = format!(
                        "❌ <b>Not enough points.</b>\n\n\
                        You need <b>{}</b> but have <b>{}</b>.",
                        needed, have
                    );
                    let _ = bot
                        .send_message(chat_id, body)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(redeem_menu())
                        .await;
                }
                Ok(RedeemOutcome::UsernamePoolExhausted) => {
                    let _ = bot
                        .send_message(
                            chat_id,
                            "❌ Could not generate a free username right now. Try again later.",
                        )
                        .reply_markup(redeem_menu())
                        .await;
                }
                Err(e) => {
                    error!("Redemption failed: {:?}", e);
                    let _ = bot
                        .send_message(chat_id, "❌ An error occurred. Please use /start.")
                        .await;
                }
            }
        }

        CallbackAction::CheckPayment | CallbackAction::CheckExtend => {
            let extend = action == CallbackAction::CheckExtend;
            handle_check(&bot, chat_id, message_id, &state, extend).await;
        }

        CallbackAction::CancelOrder => {
            match state.orders.cancel_latest(chat_id.0).await {
                Ok(Some(order)) => {
                    let _ = state.sessions.clear(chat_id.0).await;
                    let body = format!(
                        "🚫 Order <b>{}</b> cancelled.",
                        escape_html(&order.order_id)
                    );
                    edit_message_smart(&bot, chat_id, message_id, image, &body, main_menu()).await;
                }
                Ok(None) => {
                    let _ = state.sessions.clear(chat_id.0).await;
                    edit_message_smart(
                        &bot,
                        chat_id,
                        message_id,
                        image,
                        "🚫 No pending order found.",
                        main_menu(),
                    )
                    .await;
                }
                Err(e) => {
                    error!("Cancel failed: {:?}", e);
                    let _ = bot
                        .send_message(chat_id, "❌ An error occurred. Please use /start.")
                        .await;
                }
            }
        }
    }

    Ok(())
}

async fn handle_check(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    state: &AppState,
    extend: bool,
) {
    match state.orders.check(chat_id.0).await {
        Ok(CheckOutcome::NoOrder) => {
            edit_message_smart(
                bot,
                chat_id,
                message_id,
                state.config.welcome_image_url.as_deref(),
                "ℹ️ No pending order found.",
                main_menu(),
            )
            .await;
        }
        Ok(CheckOutcome::Expired(order)) => {
            let _ = state.sessions.clear(chat_id.0).await;
            let body = format!(
                "⌛ Order <b>{}</b> expired before payment arrived.\n\n\
                Please start a new order.",
                escape_html(&order.order_id)
            );
            edit_message_smart(
                bot,
                chat_id,
                message_id,
                state.config.welcome_image_url.as_deref(),
                &body,
                main_menu(),
            )
            .await;
        }
        Ok(CheckOutcome::StillPending { order, remaining_secs }) => {
            let body = format!(
                "⏳ Order <b>{}</b> is still awaiting payment.\n\n\
                Time left: <b>{}</b>",
                escape_html(&order.order_id),
                format_remaining(remaining_secs)
            );
            edit_message_smart(
                bot,
                chat_id,
                message_id,
                state.config.welcome_image_url.as_deref(),
                &body,
                payment_keyboard(extend),
            )
            .await;
        }
        Ok(CheckOutcome::AlreadySettled) => {
            edit_message_smart(
                bot,
                chat_id,
                message_id,
                state.config.welcome_image_url.as_deref(),
                "✅ This order was already settled.",
                main_menu(),
            )
            .await;
        }
        Ok(CheckOutcome::Settled(order)) => {
            settle(bot, chat_id, state, &order).await;
        }
        Err(e) => {
            error!("Payment check failed: {:?}", e);
            let _ = bot
                .send_message(chat_id, "❌ An error occurred. Please use /start.")
                .await;
        }
    }
}

/// Deliver a paid order. Runs only for the check that won the settlement
/// claim, so a double tap cannot credit twice.
async fn settle(bot: &Bot, chat_id: ChatId, state: &AppState, order: &PendingOrder) {
    match order.key_type {
        KeyType::Extend => match state.licenses.apply_extend(order).await {
            Ok(ext) => {
                let body = format!(
                    "🎉 <b>Payment received!</b>\n\n\
                    👤 Account: <b>{}</b>\n\
                    📅 New expiry: <b>{}</b>\n\
                    ⭐ Points earned: <b>{}</b> (balance {})",
                    escape_html(order.manual_username.as_deref().unwrap_or("?")),
                    ext.new_expiry.format("%Y-%m-%d"),
                    ext.points_earned,
                    ext.new_point_balance
                );
                let _ = bot
                    .send_message(chat_id, body)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(back_to_menu())
                    .await;

                state
                    .notifier
                    .notify(&format!(
                        "⏳ <b>Extend settled</b>\n\
                        Order: <code>{}</code>\n\
                        Chat: <code>{}</code>\n\
                        Game: {}\n\
                        Account: <code>{}</code>\n\
                        Days: {}\n\
                        Amount: {}",
                        escape_html(&order.order_id),
                        order.chat_id,
                        order.variant.display_name(),
                        escape_html(order.manual_username.as_deref().unwrap_or("?")),
                        order.duration_days,
                        format_rupiah(order.amount)
                    ))
                    .await;
            }
            Err(e) => {
                error!("Extend settlement failed for {}: {:?}", order.order_id, e);
                settlement_failed(bot, chat_id, state, order).await;
            }
        },
        _ => match state.licenses.issue_purchase(order).await {
            Ok(issued) => {
                let body = format!(
                    "🎉 <b>Payment received!</b>\n\n\
                    🎮 Game: <b>{}</b>\n\
                    👤 Username: <code>{}</code>\n\
                    🔑 Password: <code>{}</code>\n\
                    📅 Expires: <b>{}</b>\n\
                    ⭐ Points earned: <b>{}</b> (balance {})",
                    order.variant.display_name(),
                    escape_html(&issued.credentials.username),
                    escape_html(&issued.credentials.password),
                    issued.expires_at.format("%Y-%m-%d"),
                    issued.points_earned,
                    issued.new_point_balance
                );
                let _ = bot
                    .send_message(chat_id, body)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(back_to_menu())
                    .await;

                state
                    .notifier
                    .notify(&format!(
                        "🛒 <b>Purchase settled</b>\n\
                        Order: <code>{}</code>\n\
                        Chat: <code>{}</code>\n\
                        Game: {}\n\
                        Username: <code>{}</code>\n\
                        Days: {}\n\
                        Amount: {}",
                        escape_html(&order.order_id),
                        order.chat_id,
                        order.variant.display_name(),
                        escape_html(&issued.credentials.username),
                        order.duration_days,
                        format_rupiah(order.amount)
                    ))
                    .await;
            }
            Err(e) => {
                error!("Purchase settlement failed for {}: {:?}", order.order_id, e);
                settlement_failed(bot, chat_id, state, order).await;
            }
        },
    }
}

async fn settlement_failed(bot: &Bot, chat_id: ChatId, state: &AppState, order: &PendingOrder) {
    let _ = bot
        .send_message(
            chat_id,
            format!(
                "⚠️ Your payment for order <b>{}</b> was received but delivery \
                failed. An admin has been notified and will sort it out.",
                escape_html(&order.order_id)
            ),
        )
        .parse_mode(ParseMode::Html)
        .await;

    state
        .notifier
        .notify(&format!(
            "🚨 <b>Settlement failure</b>\n\
            Order: <code>{}</code>\n\
            Chat: <code>{}</code>\n\
            Paid but undelivered. Manual follow-up needed.",
            escape_html(&order.order_id),
            order.chat_id
        ))
        .await;
}
