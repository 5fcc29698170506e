use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::types::ApiUserProfile;
use crate::errors::ProfilerError;
use crate::intelligence::profiler::DisplayNameSource;

const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// Gamma API client, used here as the user directory.
#[derive(Debug, Clone)]
pub struct GammaClient {
    http: Client,
    base_url: String,
}

impl GammaClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: GAMMA_API_BASE.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Look up a public profile by wallet address. `Ok(None)` when the
    /// address has no profile.
    pub async fn get_public_profile(
        &self,
        address: &str,
    ) -> Result<Option<ApiUserProfile>, ProfilerError> {
        let url = format!("{}/public-profile", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("address", address)])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: Value = resp.error_for_status()?.json().await?;
        parse_profile(body)
    }
}

/// The directory has answered both with a bare object and with a one-element
/// list over time; accept either.
fn parse_profile(body: Value) -> Result<Option<ApiUserProfile>, ProfilerError> {
    let obj = match body {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) | Value::Null => return Ok(None),
        other => other,
    };

    serde_json::from_value(obj)
        .map(Some)
        .map_err(|e| ProfilerError::Unexpected(e.to_string()))
}

#[async_trait]
impl DisplayNameSource for GammaClient {
    async fn display_name(&self, trader_id: &str) -> Result<Option<String>, ProfilerError> {
        Ok(self
            .get_public_profile(trader_id)
            .await?
            .and_then(|p| p.best_name()))
    }
}
