use serde::{Deserialize, Serialize};

/// The two game editions the store sells keys for. Each edition keeps its
/// licenses in its own (structurally identical) table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    Classic,
    Max,
}

impl GameVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameVariant::Classic => "classic",
            GameVariant::Max => "max",
        }
    }

    /// License table for this edition. Static strings only; these are
    /// interpolated into SQL and must never come from user input.
    pub fn table(&self) -> &'static str {
        match self {
            GameVariant::Classic => "licenses_classic",
            GameVariant::Max => "licenses_max",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameVariant::Classic => "ARENA CLASSIC",
            GameVariant::Max => "ARENA MAX",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "classic" => Some(GameVariant::Classic),
            "max" => Some(GameVariant::Max),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        for v in [GameVariant::Classic, GameVariant::Max] {
            assert_eq!(GameVariant::parse(v.as_str()), Some(v));
        }
        assert_eq!(GameVariant::parse("ultra"), None);
    }
}
