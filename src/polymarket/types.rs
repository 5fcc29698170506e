use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Trade query (Data API — REST)
// ---------------------------------------------------------------------------

/// Query string for `GET /trades`.
#[derive(Debug, Clone, Serialize)]
pub struct TradesQuery {
    pub limit: u32,
    pub offset: u32,
    /// `CASH` makes `filterAmount` a USD floor.
    #[serde(rename = "filterType")]
    pub filter_type: &'static str,
    #[serde(rename = "filterAmount")]
    pub filter_amount: String,
    #[serde(rename = "takerOnly")]
    pub taker_only: bool,
}

// ---------------------------------------------------------------------------
// Activity query (Data API — REST)
// ---------------------------------------------------------------------------

/// Query string for `GET /activity`, oldest records first.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityQuery<'a> {
    pub user: &'a str,
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: &'static str,
    #[serde(rename = "sortDirection")]
    pub sort_direction: &'static str,
}

impl<'a> ActivityQuery<'a> {
    pub fn oldest_first(user: &'a str, limit: u32, offset: u32) -> Self {
        Self {
            user,
            limit,
            offset,
            sort_by: "TIMESTAMP",
            sort_direction: "ASC",
        }
    }
}

// ---------------------------------------------------------------------------
// User profile (Gamma API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiUserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub pseudonym: Option<String>,
}

impl ApiUserProfile {
    /// First non-empty human-readable name.
    pub fn best_name(&self) -> Option<String> {
        [&self.name, &self.display_name, &self.username, &self.pseudonym]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(String::from)
    }
}
