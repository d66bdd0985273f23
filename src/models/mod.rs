pub mod market;
pub mod stake;

pub use market::{Market, MarketStats, MarketStatus, NewMarket};
pub use stake::Stake;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One side of a binary market. Stored as a boolean (`true` = yes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "true" | "1" => Some(Side::Yes),
            "no" | "false" | "0" => Some(Side::No),
            _ => None,
        }
    }

    pub fn is_yes(self) -> bool {
        self == Side::Yes
    }
}

impl From<bool> for Side {
    fn from(choice: bool) -> Self {
        if choice {
            Side::Yes
        } else {
            Side::No
        }
    }
}

impl From<Side> for bool {
    fn from(side: Side) -> Self {
        side.is_yes()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}
