// src/share/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the glucose trend as reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    None,
    RisingFast,
    Rising,
    RisingSlow,
    Flat,
    FallingSlow,
    Falling,
    FallingFast,
    NotComputable,
    OutOfRange,
}

impl Trend {
    /// Map the upstream's integer trend code. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        let t = match code {
            0 => Trend::None,
            1 => Trend::RisingFast,
            2 => Trend::Rising,
            3 => Trend::RisingSlow,
            4 => Trend::Flat,
            5 => Trend::FallingSlow,
            6 => Trend::Falling,
            7 => Trend::FallingFast,
            8 => Trend::NotComputable,
            9 => Trend::OutOfRange,
            _ => return None,
        };
        Some(t)
    }

    /// Map the upstream's string trend name (newer API revisions send these).
    pub fn from_share_name(name: &str) -> Option<Self> {
        let t = match name {
            "None" => Trend::None,
            "DoubleUp" => Trend::RisingFast,
            "SingleUp" => Trend::Rising,
            "FortyFiveUp" => Trend::RisingSlow,
            "Flat" => Trend::Flat,
            "FortyFiveDown" => Trend::FallingSlow,
            "SingleDown" => Trend::Falling,
            "DoubleDown" => Trend::FallingFast,
            "NotComputable" => Trend::NotComputable,
            "RateOutOfRange" => Trend::OutOfRange,
            _ => return None,
        };
        Some(t)
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Trend::None => "",
            Trend::RisingFast => "⇈",
            Trend::Rising => "↑",
            Trend::RisingSlow => "⇗",
            Trend::Flat => "→",
            Trend::FallingSlow => "⇘",
            Trend::Falling => "↓",
            Trend::FallingFast => "⇊",
            Trend::NotComputable | Trend::OutOfRange => "?",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Trend::None => "",
            Trend::RisingFast => "⏫",
            Trend::Rising => "⬆️",
            Trend::RisingSlow => "↗️",
            Trend::Flat => "➡️",
            Trend::FallingSlow => "↘️",
            Trend::Falling => "⬇️",
            Trend::FallingFast => "⏬",
            Trend::NotComputable | Trend::OutOfRange => "?",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::None => "no trend",
            Trend::RisingFast => "rising quickly",
            Trend::Rising => "rising",
            Trend::RisingSlow => "rising slowly",
            Trend::Flat => "steady",
            Trend::FallingSlow => "falling slowly",
            Trend::Falling => "falling",
            Trend::FallingFast => "falling quickly",
            Trend::NotComputable => "trend not computable",
            Trend::OutOfRange => "rate out of range",
        }
    }
}

/// One normalized glucose reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Wall time the sensor took the reading (not arrival time).
    pub time: DateTime<Utc>,
    /// Blood glucose in mg/dL.
    pub value: i32,
    pub trend: Trend,
    /// The record as received, for diagnostics only.
    pub raw: String,
}

/// Opaque session token issued by the Share service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
}

/// Identity and secret used to (re)authenticate.
#[derive(Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
