use kios_db::models::variant::GameVariant;

/// Inline-keyboard payloads, decoded once at the dispatch boundary. Anything
/// that fails to parse is answered with an "unknown action" toast instead of
/// falling through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    NewOrder,
    ExtendUser,
    RedeemPoints,
    Help,
    ChooseVariant(GameVariant),
    ChooseDuration { variant: GameVariant, days: i32 },
    ChooseKeyType { variant: GameVariant, days: i32, manual: bool },
    ExtendType(GameVariant),
    ExtendDuration { days: i32 },
    RedeemDuration { days: i32 },
    RedeemGame(GameVariant),
    CheckPayment,
    CheckExtend,
    CancelOrder,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "main_menu" => return Some(Self::MainMenu),
            "new_order" => return Some(Self::NewOrder),
            "extend_user" => return Some(Self::ExtendUser),
            "redeem_points" => return Some(Self::RedeemPoints),
            "help" => return Some(Self::Help),
            "check_payment" => return Some(Self::CheckPayment),
            "check_extend" => return Some(Self::CheckExtend),
            "cancel_order" => return Some(Self::CancelOrder),
            _ => {}
        }

        if let Some(rest) = data.strip_prefix("type_") {
            return GameVariant::parse(rest).map(Self::ChooseVariant);
        }
        if let Some(rest) = data.strip_prefix("duration_") {
            let (variant, days) = rest.split_once('_')?;
            return Some(Self::ChooseDuration {
                variant: GameVariant::parse(variant)?,
                days: days.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("keytype_") {
            let mut parts = rest.splitn(3, '_');
            let variant = GameVariant::parse(parts.next()?)?;
            let days: i32 = parts.next()?.parse().ok()?;
            let manual = match parts.next()? {
                "random" => false,
                "manual" => true,
                _ => return None,
            };
            return Some(Self::ChooseKeyType { variant, days, manual });
        }
        if let Some(rest) = data.strip_prefix("extend_type_") {
            return GameVariant::parse(rest).map(Self::ExtendType);
        }
        if let Some(rest) = data.strip_prefix("extend_duration_") {
            return Some(Self::ExtendDuration { days: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("redeem_") {
            if let Ok(days) = rest.parse::<i32>() {
                return Some(Self::RedeemDuration { days });
            }
            return GameVariant::parse(rest).map(Self::RedeemGame);
        }

        None
    }

    pub fn encode(&self) -> String {
        match self {
            Self::MainMenu => "main_menu".to_string(),
            Self::NewOrder => "new_order".to_string(),
            Self::ExtendUser => "extend_user".to_string(),
            Self::RedeemPoints => "redeem_points".to_string(),
            Self::Help => "help".to_string(),
            Self::ChooseVariant(v) => format!("type_{}", v.as_str()),
            Self::ChooseDuration { variant, days } => {
                format!("duration_{}_{}", variant.as_str(), days)
            }
            Self::ChooseKeyType { variant, days, manual } => format!(
                "keytype_{}_{}_{}",
                variant.as_str(),
                days,
                if *manual { "manual" } else { "random" }
            ),
            Self::ExtendType(v) => format!("extend_type_{}", v.as_str()),
            Self::ExtendDuration { days } => format!("extend_duration_{}", days),
            Self::RedeemDuration { days } => format!("redeem_{}", days),
            Self::RedeemGame(v) => format!("redeem_{}", v.as_str()),
            Self::CheckPayment => "check_payment".to_string(),
            Self::CheckExtend => "check_extend".to_string(),
            Self::CancelOrder => "cancel_order".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let actions = [
            CallbackAction::MainMenu,
            CallbackAction::NewOrder,
            CallbackAction::ExtendUser,
            CallbackAction::RedeemPoints,
            CallbackAction::Help,
            CallbackAction::ChooseVariant(GameVariant::Classic),
            CallbackAction::ChooseDuration { variant: GameVariant::Max, days: 30 },
            CallbackAction::ChooseKeyType { variant: GameVariant::Classic, days: 3, manual: true },
            CallbackAction::ChooseKeyType { variant: GameVariant::Max, days: 10, manual: false },
            CallbackAction::ExtendType(GameVariant::Max),
            CallbackAction::ExtendDuration { days: 15 },
            CallbackAction::RedeemDuration { days: 7 },
            CallbackAction::RedeemGame(GameVariant::Classic),
            CallbackAction::CheckPayment,
            CallbackAction::CheckExtend,
            CallbackAction::CancelOrder,
        ];
        for a in actions {
            assert_eq!(CallbackAction::parse(&a.encode()), Some(a));
        }
    }

    #[test]
    fn redeem_suffix_disambiguates_days_from_variant() {
        assert_eq!(
            CallbackAction::parse("redeem_7"),
            Some(CallbackAction::RedeemDuration { days: 7 })
        );
        assert_eq!(
            CallbackAction::parse("redeem_max"),
            Some(CallbackAction::RedeemGame(GameVariant::Max))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["", "noop", "duration_classic", "keytype_classic_3_extend", "redeem_ultra"] {
            assert_eq!(CallbackAction::parse(bad), None);
        }
    }
}
