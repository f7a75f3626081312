use kios_db::models::variant::GameVariant;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::models::action::CallbackAction;
use crate::pricing::{points_needed_for, short_price, PRICE_TABLE};

const REDEEM_TIERS: [i32; 4] = [1, 2, 3, 7];

fn btn(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label.into(), action.encode())
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn("🛒 Buy Account", CallbackAction::NewOrder)],
        vec![btn("⏳ Extend Account", CallbackAction::ExtendUser)],
        vec![btn("⭐ My Points", CallbackAction::RedeemPoints)],
        vec![btn("❓ Help", CallbackAction::Help)],
    ])
}

pub fn back_to_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![btn("🔙 Main Menu", CallbackAction::MainMenu)]])
}

pub fn game_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(
            GameVariant::Classic.display_name(),
            CallbackAction::ChooseVariant(GameVariant::Classic),
        )],
        vec![btn(
            GameVariant::Max.display_name(),
            CallbackAction::ChooseVariant(GameVariant::Max),
        )],
        vec![btn("🔙 Main Menu", CallbackAction::MainMenu)],
    ])
}

/// Duration grid, two price buttons per row.
pub fn duration_keyboard(variant: GameVariant) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    for (days, price, _) in PRICE_TABLE {
        row.push(btn(
            format!("{}d - {}", days, short_price(price)),
            CallbackAction::ChooseDuration { variant, days },
        ));
        if row.len() == 2 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows.push(vec![btn("🔙 Back", CallbackAction::NewOrder)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn keytype_keyboard(variant: GameVariant, days: i32) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(
            "🎲 Random Username",
            CallbackAction::ChooseKeyType { variant, days, manual: false },
        )],
        vec![btn(
            "✍️ My Own Username",
            CallbackAction::ChooseKeyType { variant, days, manual: true },
        )],
        vec![btn("🔙 Back", CallbackAction::ChooseVariant(variant))],
    ])
}

pub fn extend_game_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(
            GameVariant::Classic.display_name(),
            CallbackAction::ExtendType(GameVariant::Classic),
        )],
        vec![btn(
            GameVariant::Max.display_name(),
            CallbackAction::ExtendType(GameVariant::Max),
        )],
        vec![btn("🔙 Main Menu", CallbackAction::MainMenu)],
    ])
}

pub fn extend_duration_keyboard() -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    for (days, price, _) in PRICE_TABLE {
        row.push(btn(
            format!("{}d - {}", days, short_price(price)),
            CallbackAction::ExtendDuration { days },
        ));
        if row.len() == 2 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows.push(vec![btn("🔙 Main Menu", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn redeem_menu() -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    for days in REDEEM_TIERS {
        rows.push(vec![btn(
            format!(
                "{} day{} - {} points",
                days,
                if days == 1 { "" } else { "s" },
                points_needed_for(days)
            ),
            CallbackAction::RedeemDuration { days },
        )]);
    }
    rows.push(vec![btn("🔙 Main Menu", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn redeem_game_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(
            GameVariant::Classic.display_name(),
            CallbackAction::RedeemGame(GameVariant::Classic),
        )],
        vec![btn(
            GameVariant::Max.display_name(),
            CallbackAction::RedeemGame(GameVariant::Max),
        )],
        vec![btn("🔙 Main Menu", CallbackAction::MainMenu)],
    ])
}

/// Check/cancel pair under a freshly issued QR.
pub fn payment_keyboard(extend: bool) -> InlineKeyboardMarkup {
    let check = if extend {
        CallbackAction::CheckExtend
    } else {
        CallbackAction::CheckPayment
    };
    InlineKeyboardMarkup::new(vec![
        vec![btn("✅ Check Payment", check)],
        vec![btn("❌ Cancel Order", CallbackAction::CancelOrder)],
    ])
}
