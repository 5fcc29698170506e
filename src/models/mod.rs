pub mod alert;
pub mod profile;
pub mod trade;

pub use alert::AlertRecord;
pub use profile::AccountProfile;
pub use trade::Trade;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Category — market topic
// ---------------------------------------------------------------------------

/// Topic bucket a market title is classified into.
///
/// Declaration order is classification priority order: when a title matches
/// keywords of several categories, the earliest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Politics,
    Crypto,
    Sports,
    TraditionalFinance,
    Other,
}

impl Category {
    /// Categories that carry a keyword set, in priority order.
    pub const PRIORITY: [Category; 4] = [
        Category::Politics,
        Category::Crypto,
        Category::Sports,
        Category::TraditionalFinance,
    ];

    pub const ALL: [Category; 5] = [
        Category::Politics,
        Category::Crypto,
        Category::Sports,
        Category::TraditionalFinance,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "politics",
            Category::Crypto => "crypto",
            Category::Sports => "sports",
            Category::TraditionalFinance => "traditional_finance",
            Category::Other => "other",
        }
    }

    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "politics" => Some(Category::Politics),
            "crypto" => Some(Category::Crypto),
            "sports" => Some(Category::Sports),
            "traditional_finance" | "tradfi" | "finance" => Some(Category::TraditionalFinance),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Crypto => "Crypto",
            Category::Sports => "Sports",
            Category::TraditionalFinance => "Traditional Finance",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
